use tagged_nfa::equivalence::Config;
use tagged_nfa::{Automaton, Compiler, Equivalence, Parser};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [first, second] = args.as_slice() {
        compare(first, second);
        return;
    }

    println!("Tagged Automaton Compiler - Structure and Diff Demo");
    println!("===================================================");

    let test_patterns = vec![
        "ab",
        "a*",
        "a+?",
        "a|b",
        "[abc]",
        "[^abc]",
        "(a)(b)",
        "(ab)",
        "^abc$",
        "\\bword\\b",
        "(?:x|y){1,3}",
        "(a|b)*abb",
    ];

    for pattern in test_patterns {
        println!("\n=== Pattern: '{}' ===", pattern);
        if let Some(fa) = compile(pattern) {
            print!("{}", fa);
        }
    }

    let pairs = [("a[bc]", "a[b]"), ("(a)(b)", "(ab)"), ("^abc", "abc"), ("a|b", "[ab]"), ("(a)\\1", "aa")];
    for (first, second) in pairs {
        compare(first, second);
    }
}

fn compile(pattern: &str) -> Option<Automaton> {
    let ast = match Parser::new(pattern).parse() {
        Ok(ast) => ast,
        Err(e) => {
            println!("Failed to parse pattern: {}", e);
            return None;
        }
    };
    match Compiler::new().compile(&ast) {
        Ok(fa) => Some(fa),
        Err(e) => {
            println!("Failed to compile: {}", e);
            None
        }
    }
}

fn compare(first: &str, second: &str) {
    println!("\n=== '{}' vs '{}' ===", first, second);
    let (Some(a), Some(b)) = (compile(first), compile(second)) else {
        return;
    };
    match Equivalence::new(Config::new()).check(&a, &b) {
        Ok(c) if c.is_equivalent() => println!("equivalent ({} pairs explored)", c.explored()),
        Ok(c) => {
            println!("not equivalent ({} pairs explored):", c.explored());
            for m in c.mismatches() {
                println!("  {}", m);
            }
        }
        Err(e) => println!("cannot compare: {}", e),
    }
}
