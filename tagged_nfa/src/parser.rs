//! Regex parser: converts a pattern string into an annotated [`Ast`].
//!
//! Structure (groups, alternation, quantifiers, anchors, backreferences)
//! is parsed here. Anything that denotes a set of characters (bracket
//! classes, `.`, Perl classes, Unicode properties, hex escapes) is handed
//! to `regex-syntax` and converted into a [`Charset`].

use regex_syntax::hir::{Class, ClassUnicode, ClassUnicodeRange, HirKind};

use crate::ast::{Ast, Node};
use crate::charset::Charset;
use crate::leaf::{AssertionKind, Greediness, Leaf, NodePosition};
use crate::{Error, Result};

/// Parser configuration.
#[derive(Clone, Debug)]
pub struct Config {
    case_insensitive: bool,
    dot_matches_new_line: bool,
    nest_limit: u32,
}

impl Default for Config {
    fn default() -> Config {
        Config { case_insensitive: false, dot_matches_new_line: false, nest_limit: 250 }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Start with `(?i)` in effect.
    pub fn case_insensitive(mut self, yes: bool) -> Config {
        self.case_insensitive = yes;
        self
    }

    /// Start with `(?s)` in effect.
    pub fn dot_matches_new_line(mut self, yes: bool) -> Config {
        self.dot_matches_new_line = yes;
        self
    }

    /// Maximum group nesting depth.
    pub fn nest_limit(mut self, limit: u32) -> Config {
        self.nest_limit = limit;
        self
    }

    pub fn get_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn get_dot_matches_new_line(&self) -> bool {
        self.dot_matches_new_line
    }

    pub fn get_nest_limit(&self) -> u32 {
        self.nest_limit
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Flags {
    case_insensitive: bool,
    dot_matches_new_line: bool,
}

pub struct Parser {
    chars: Vec<char>,
    pos: usize,
    subpattern_count: u32,
    depth: u32,
    flags: Flags,
    config: Config,
}

impl Parser {
    pub fn new(pattern: &str) -> Self {
        Parser::with_config(pattern, Config::default())
    }

    pub fn with_config(pattern: &str, config: Config) -> Self {
        Parser {
            chars: pattern.chars().collect(),
            pos: 0,
            subpattern_count: 0,
            depth: 0,
            flags: Flags {
                case_insensitive: config.case_insensitive,
                dot_matches_new_line: config.dot_matches_new_line,
            },
            config,
        }
    }

    /// Parse the full pattern.
    pub fn parse(&mut self) -> Result<Ast> {
        let root = self.parse_alternation()?;
        if let Some(ch) = self.peek() {
            return Err(Error::parse(self.pos, format!("unexpected '{}'", ch)));
        }
        Ok(Ast {
            root,
            subpatterns: self.subpattern_count,
            pattern: self.chars.iter().collect(),
        })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.advance() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(Error::parse(self.pos - 1, format!("expected '{}', got '{}'", expected, c))),
            None => Err(Error::parse(self.pos, format!("expected '{}', got end of pattern", expected))),
        }
    }

    fn leaf(&self, leaf: Leaf, start: usize) -> Node {
        Node::Leaf { leaf, position: NodePosition::new(start, self.pos) }
    }

    /// Parse alternation: `a|b|c`
    fn parse_alternation(&mut self) -> Result<Node> {
        let mut branches = vec![self.parse_concat()?];
        while self.peek() == Some('|') {
            self.advance();
            branches.push(self.parse_concat()?);
        }
        if branches.len() == 1 {
            Ok(branches.remove(0))
        } else {
            Ok(Node::Alternation(branches))
        }
    }

    /// Parse concatenation: `abc`
    fn parse_concat(&mut self) -> Result<Node> {
        let start = self.pos;
        let mut nodes = Vec::new();
        while let Some(ch) = self.peek() {
            if ch == ')' || ch == '|' {
                break;
            }
            // flag groups and comments leave nothing to concatenate
            match self.parse_quantified()? {
                Node::Leaf { leaf: Leaf::Empty, .. } => {}
                node => nodes.push(node),
            }
        }
        match nodes.len() {
            0 => Ok(Node::empty(start)),
            1 => Ok(nodes.remove(0)),
            _ => Ok(Node::Concat(nodes)),
        }
    }

    /// Parse an atom followed by any number of quantifiers.
    fn parse_quantified(&mut self) -> Result<Node> {
        let start = self.pos;
        let mut node = self.parse_atom()?;
        loop {
            let (min, max) = match self.peek() {
                Some('*') => {
                    self.advance();
                    (0, None)
                }
                Some('+') => {
                    self.advance();
                    (1, None)
                }
                Some('?') => {
                    self.advance();
                    (0, Some(1))
                }
                Some('{') => match self.try_parse_braces()? {
                    Some(bounds) => bounds,
                    None => break,
                },
                _ => break,
            };
            let greediness = match self.peek() {
                Some('?') => {
                    self.advance();
                    Greediness::Lazy
                }
                Some('+') => {
                    self.advance();
                    Greediness::Possessive
                }
                _ => Greediness::Greedy,
            };
            node = Node::Repeat {
                node: Box::new(node),
                min,
                max,
                greediness,
                position: NodePosition::new(start, self.pos),
            };
        }
        Ok(node)
    }

    /// Parse `{n}`, `{n,}` or `{n,m}`. Anything else leaves the position
    /// untouched and the `{` is taken as a literal.
    fn try_parse_braces(&mut self) -> Result<Option<(u32, Option<u32>)>> {
        let save = self.pos;
        self.advance();
        let min = match self.parse_number() {
            Some(n) => n,
            None => {
                self.pos = save;
                return Ok(None);
            }
        };
        let max = if self.peek() == Some(',') {
            self.advance();
            if self.peek() == Some('}') {
                None
            } else {
                match self.parse_number() {
                    Some(m) => Some(m),
                    None => {
                        self.pos = save;
                        return Ok(None);
                    }
                }
            }
        } else {
            Some(min)
        };
        if self.peek() != Some('}') {
            self.pos = save;
            return Ok(None);
        }
        self.advance();
        if let Some(max) = max {
            if max < min {
                return Err(Error::parse(save, "numbers out of order in {} quantifier"));
            }
        }
        Ok(Some((min, max)))
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.advance();
        }
        if self.pos == start {
            return None;
        }
        let s: String = self.chars[start..self.pos].iter().collect();
        s.parse::<u32>().ok()
    }

    /// Parse a single atom (literal, class, group, anchor, etc.)
    fn parse_atom(&mut self) -> Result<Node> {
        let start = self.pos;
        match self.peek() {
            None => Err(Error::parse(start, "unexpected end of pattern")),
            Some('(') => self.parse_group(),
            Some('[') => {
                let end = self.scan_class_end()?;
                let src: String = self.chars[start..end].iter().collect();
                let charset = self.translate(&src, start)?;
                self.pos = end;
                Ok(self.leaf(Leaf::Charset(charset), start))
            }
            Some('.') => {
                self.advance();
                let charset = self.translate(".", start)?;
                Ok(self.leaf(Leaf::Charset(charset), start))
            }
            Some('^') => {
                self.advance();
                Ok(self.leaf(Leaf::Assertion(AssertionKind::Circumflex), start))
            }
            Some('$') => {
                self.advance();
                Ok(self.leaf(Leaf::Assertion(AssertionKind::Dollar), start))
            }
            Some('*') | Some('+') | Some('?') => {
                Err(Error::parse(start, "quantifier does not follow a repeatable item"))
            }
            Some('\\') => self.parse_escape(),
            Some(ch) => {
                self.advance();
                let charset = self.literal(ch, start)?;
                Ok(self.leaf(Leaf::Charset(charset), start))
            }
        }
    }

    /// Parse an escape sequence outside a class.
    fn parse_escape(&mut self) -> Result<Node> {
        let start = self.pos;
        self.advance();
        let ch = match self.advance() {
            Some(ch) => ch,
            None => return Err(Error::parse(start, "pattern ends with a lone '\\'")),
        };
        let assertion = match ch {
            'A' => Some(AssertionKind::StartOfString),
            'z' => Some(AssertionKind::EndOfString),
            'Z' => Some(AssertionKind::EndOfStringBeforeNewline),
            'b' => Some(AssertionKind::WordBoundary),
            'B' => Some(AssertionKind::NonWordBoundary),
            _ => None,
        };
        if let Some(kind) = assertion {
            return Ok(self.leaf(Leaf::Assertion(kind), start));
        }
        match ch {
            '1'..='9' => {
                let mut number = ch.to_digit(10).unwrap_or(0);
                while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
                    let next = number * 10 + d;
                    if next > self.subpattern_count {
                        break;
                    }
                    number = next;
                    self.advance();
                }
                Ok(self.leaf(Leaf::Backreference(number), start))
            }
            'g' => {
                let number = self.parse_g_reference(start)?;
                Ok(self.leaf(Leaf::Backreference(number), start))
            }
            '0' => Ok(self.leaf(Leaf::Charset(self.literal('\0', start)?), start)),
            ch if !ch.is_alphanumeric() => {
                let charset = self.literal(ch, start)?;
                Ok(self.leaf(Leaf::Charset(charset), start))
            }
            ch => {
                match ch {
                    'p' | 'P' | 'x' | 'u' | 'U' if self.peek() == Some('{') => {
                        while let Some(c) = self.advance() {
                            if c == '}' {
                                break;
                            }
                        }
                    }
                    'p' | 'P' => {
                        self.advance();
                    }
                    'x' => self.pos = (self.pos + 2).min(self.chars.len()),
                    'u' => self.pos = (self.pos + 4).min(self.chars.len()),
                    'U' => self.pos = (self.pos + 8).min(self.chars.len()),
                    _ => {}
                }
                let src: String = self.chars[start..self.pos].iter().collect();
                let charset = self.translate(&src, start)?;
                Ok(self.leaf(Leaf::Charset(charset), start))
            }
        }
    }

    /// `\gN`, `\g{N}` and relative `\g{-N}`.
    fn parse_g_reference(&mut self, start: usize) -> Result<u32> {
        let braced = self.peek() == Some('{');
        if braced {
            self.advance();
        }
        let negative = self.peek() == Some('-');
        if negative {
            self.advance();
        }
        let n = self
            .parse_number()
            .ok_or_else(|| Error::parse(start, "\\g must be followed by a group number"))?;
        if braced {
            self.expect('}')?;
        }
        if n == 0 {
            return Err(Error::parse(start, "\\g reference to group 0"));
        }
        if negative {
            if n > self.subpattern_count {
                return Err(Error::parse(start, "relative reference to a group that does not exist"));
            }
            Ok(self.subpattern_count + 1 - n)
        } else {
            Ok(n)
        }
    }

    /// Parse a group: `(...)`, `(?:...)`, `(?<name>...)`, `(?i)`, `(?#...)`.
    fn parse_group(&mut self) -> Result<Node> {
        let start = self.pos;
        self.advance();
        if self.depth >= self.config.nest_limit {
            return Err(Error::TooComplex(format!(
                "group nesting exceeds the limit of {}",
                self.config.nest_limit
            )));
        }

        let mut capture = true;
        if self.peek() == Some('?') {
            self.advance();
            match self.peek() {
                Some(':') => {
                    self.advance();
                    capture = false;
                }
                Some('#') => {
                    while let Some(c) = self.advance() {
                        if c == ')' {
                            return Ok(Node::empty(start));
                        }
                    }
                    return Err(Error::parse(start, "unterminated comment"));
                }
                Some('=') | Some('!') => {
                    return Err(Error::UnsupportedFeature("lookahead assertions".to_string()));
                }
                Some('<') if matches!(self.peek_at(1), Some('=') | Some('!')) => {
                    return Err(Error::UnsupportedFeature("lookbehind assertions".to_string()));
                }
                Some('<') | Some('\'') => {
                    let close = if self.advance() == Some('<') { '>' } else { '\'' };
                    self.skip_group_name(close, start)?;
                }
                Some('P') if self.peek_at(1) == Some('<') => {
                    self.advance();
                    self.advance();
                    self.skip_group_name('>', start)?;
                }
                Some('|') => {
                    return Err(Error::UnsupportedFeature("branch reset groups".to_string()));
                }
                _ => return self.parse_flags(start),
            }
        }

        let saved = self.flags;
        self.depth += 1;
        let number = if capture {
            self.subpattern_count += 1;
            Some(self.subpattern_count)
        } else {
            None
        };
        let inner = self.parse_alternation()?;
        self.expect(')')?;
        self.depth -= 1;
        self.flags = saved;

        Ok(match number {
            Some(number) => Node::Subpattern {
                number,
                node: Box::new(inner),
                position: NodePosition::new(start, self.pos),
            },
            None => Node::Group(Box::new(inner)),
        })
    }

    fn skip_group_name(&mut self, close: char, start: usize) -> Result<()> {
        let name_start = self.pos;
        while let Some(c) = self.peek() {
            if c == close {
                break;
            }
            if !(c.is_alphanumeric() || c == '_') {
                return Err(Error::parse(self.pos, "invalid character in group name"));
            }
            self.advance();
        }
        if self.pos == name_start {
            return Err(Error::parse(start, "empty group name"));
        }
        self.expect(close)
    }

    /// `(?flags)` changes flags for the rest of the enclosing group;
    /// `(?flags:...)` only inside the new group.
    fn parse_flags(&mut self, start: usize) -> Result<Node> {
        let mut flags = self.flags;
        let mut negate = false;
        loop {
            match self.advance() {
                Some('i') => flags.case_insensitive = !negate,
                Some('s') => flags.dot_matches_new_line = !negate,
                Some('-') if !negate => negate = true,
                Some(c @ ('m' | 'x' | 'U')) => {
                    return Err(Error::UnsupportedFeature(format!("inline flag '{}'", c)));
                }
                Some(')') => {
                    self.flags = flags;
                    return Ok(Node::empty(start));
                }
                Some(':') => {
                    let saved = self.flags;
                    self.flags = flags;
                    self.depth += 1;
                    let inner = self.parse_alternation()?;
                    self.expect(')')?;
                    self.depth -= 1;
                    self.flags = saved;
                    return Ok(Node::Group(Box::new(inner)));
                }
                Some(c) => return Err(Error::parse(self.pos - 1, format!("unknown group flag '{}'", c))),
                None => return Err(Error::parse(start, "unterminated group")),
            }
        }
    }

    /// Find the end (exclusive) of the bracket class starting at `self.pos`.
    fn scan_class_end(&self) -> Result<usize> {
        let start = self.pos;
        let len = self.chars.len();
        let mut i = start + 1;
        let mut depth = 1;
        let skip_class_prefix = |mut i: usize| {
            if i < len && self.chars[i] == '^' {
                i += 1;
            }
            if i < len && self.chars[i] == ']' {
                i += 1;
            }
            i
        };
        i = skip_class_prefix(i);
        while i < len {
            match self.chars[i] {
                '\\' => {
                    i += 2;
                    if i < len && self.chars[i] == '{' && matches!(self.chars[i - 1], 'p' | 'P' | 'x' | 'u' | 'U') {
                        while i < len && self.chars[i] != '}' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                '[' if i + 1 < len && self.chars[i + 1] == ':' => {
                    i += 2;
                    while i + 1 < len && !(self.chars[i] == ':' && self.chars[i + 1] == ']') {
                        i += 1;
                    }
                    i += 2;
                }
                '[' => {
                    depth += 1;
                    i = skip_class_prefix(i + 1);
                }
                ']' => {
                    depth -= 1;
                    i += 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => i += 1,
            }
        }
        Err(Error::parse(start, "unterminated character class"))
    }

    /// Let `regex-syntax` turn a class-denoting snippet into a charset.
    fn translate(&self, src: &str, at: usize) -> Result<Charset> {
        let hir = regex_syntax::ParserBuilder::new()
            .case_insensitive(self.flags.case_insensitive)
            .dot_matches_new_line(self.flags.dot_matches_new_line)
            .build()
            .parse(src)
            .map_err(|e| Error::parse(at, e.to_string()))?;
        match hir.kind() {
            HirKind::Class(Class::Unicode(class)) => Ok(Charset::from(class)),
            HirKind::Class(Class::Bytes(class)) => Ok(Charset::from(class)),
            HirKind::Literal(lit) => {
                let text = std::str::from_utf8(&lit.0)
                    .map_err(|_| Error::parse(at, "literal is not valid UTF-8"))?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Charset::from_char(ch)),
                    _ => Err(Error::parse(at, format!("'{}' does not denote a single character", src))),
                }
            }
            _ => Err(Error::UnsupportedFeature(format!("'{}' as a character class", src))),
        }
    }

    fn literal(&self, ch: char, at: usize) -> Result<Charset> {
        if !self.flags.case_insensitive {
            return Ok(Charset::from_char(ch));
        }
        let mut class = ClassUnicode::new(vec![ClassUnicodeRange::new(ch, ch)]);
        class
            .try_case_fold_simple()
            .map_err(|e| Error::parse(at, e.to_string()))?;
        Ok(Charset::from(&class))
    }
}
