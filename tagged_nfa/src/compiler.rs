use std::collections::{HashMap, VecDeque};

use crate::ast::{Ast, Node};
use crate::leaf::{Greediness, Leaf, NodePosition};
use crate::nfa::{Automaton, StateId};
use crate::transition::{Tag, Transition};
use crate::{Error, Result};

/// Compiler configuration.
#[derive(Clone, Debug)]
pub struct Config {
    size_limit: Option<usize>,
    path_limit: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config { size_limit: Some(10_000), path_limit: 10_000 }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Maximum number of states of the Thompson automaton. `None` means
    /// unlimited.
    pub fn size_limit(mut self, limit: Option<usize>) -> Config {
        self.size_limit = limit;
        self
    }

    /// Maximum number of zero-width paths enumerated from one state while
    /// merging.
    pub fn path_limit(mut self, limit: usize) -> Config {
        self.path_limit = limit;
        self
    }

    pub fn get_size_limit(&self) -> Option<usize> {
        self.size_limit
    }

    pub fn get_path_limit(&self) -> usize {
        self.path_limit
    }
}

/// Fragment of an automaton with start and end states
#[derive(Debug, Clone, Copy)]
struct Fragment {
    start: StateId,
    end: StateId,
}

/// Compiler that converts a parsed pattern into a merged tagged automaton
#[derive(Clone, Debug, Default)]
pub struct Compiler {
    config: Config,
}

impl Compiler {
    /// Create a new compiler
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Compile a tree into an automaton without epsilon transitions.
    pub fn compile(&self, ast: &Ast) -> Result<Automaton> {
        let thompson = self.build_thompson(ast)?;
        let merged = self.merge(&thompson)?;
        debug!(
            "compiled '{}': {} thompson states, {} merged states, {} transitions",
            ast.pattern,
            thompson.state_count(),
            merged.state_count(),
            merged.transitions().len()
        );
        Ok(merged)
    }

    /// Thompson construction. Subpattern boundaries become epsilon
    /// transitions carrying one tag each.
    pub fn build_thompson(&self, ast: &Ast) -> Result<Automaton> {
        let mut builder = Builder {
            fa: Automaton::new(),
            subpatterns: Vec::new(),
            greediness: Vec::new(),
            size_limit: self.config.size_limit,
        };
        let start = builder.state()?;
        let fragment = builder.compile_node(&ast.root)?;
        let end = builder.state()?;
        builder.connect(start, fragment.start);
        builder.connect(fragment.end, end);
        builder.fa.set_start(start);
        builder.fa.set_final(end);
        Ok(builder.fa)
    }

    /// Fold zero-width transitions into their consuming neighbours.
    ///
    /// The merged automaton has one state per Thompson state that has a
    /// consuming (or word boundary) transition, plus the start and the
    /// accepting state. A zero-width path walked before the first consumed
    /// character ends up in `merged_before`; every later one in the
    /// `merged_after` of the character preceding it.
    pub fn merge(&self, thompson: &Automaton) -> Result<Automaton> {
        let mut merged = Automaton::new();
        let mut map: HashMap<StateId, StateId> = HashMap::new();
        let mut queue: VecDeque<StateId> = VecDeque::new();

        let start = thompson.start();
        let m_start = merged.add_state();
        merged.set_start(m_start);
        map.insert(start, m_start);
        if thompson.is_final(start) {
            merged.set_final(m_start);
        }

        let pre_paths = self.zero_width_paths(thompson, start)?;
        for (pre, stop) in &pre_paths {
            if thompson.is_final(*stop) {
                match pre.iter().position(|t| t.is_unmerged_assert()) {
                    Some(at) => {
                        let to = target(&mut merged, &mut map, &mut queue, *stop);
                        let mut t = pre[at].clone();
                        t.from = m_start;
                        t.to = to;
                        pre[..at].iter().filter(|p| keep_merged(p)).for_each(|p| t.absorb_before(p));
                        pre[at + 1..].iter().filter(|p| keep_merged(p)).for_each(|p| t.absorb_after(p));
                        t.resolve_assertion_conflicts();
                        t.redirect_merged_transitions();
                        add_unique(&mut merged, t);
                    }
                    None => merged.set_final(m_start),
                }
            }
            self.emit(thompson, &mut merged, &mut map, &mut queue, m_start, pre, *stop)?;
        }

        while let Some(state) = queue.pop_front() {
            let from = map[&state];
            if thompson.is_final(state) {
                merged.set_final(from);
            }
            self.emit(thompson, &mut merged, &mut map, &mut queue, from, &[], state)?;
        }

        let loops: Vec<bool> = merged.transitions().iter().map(|t| merged.reaches(t.to, t.from)).collect();
        for (t, loops_back) in merged.transitions_mut().iter_mut().zip(loops) {
            t.loops_back = loops_back;
        }
        Ok(merged)
    }

    /// Add to `merged` every transition leaving `stop` that is not
    /// zero-width, with `pre` in front and each zero-width continuation
    /// behind it.
    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        thompson: &Automaton,
        merged: &mut Automaton,
        map: &mut HashMap<StateId, StateId>,
        queue: &mut VecDeque<StateId>,
        from: StateId,
        pre: &[&Transition],
        stop: StateId,
    ) -> Result<()> {
        for c in thompson.outgoing(stop).filter(|t| !is_zero_width(t)) {
            for (post, next) in self.zero_width_paths(thompson, c.to)? {
                let to = target(merged, map, queue, next);
                let mut t = Transition::new(from, to, c.leaf.clone())
                    .with_greediness(c.greediness)
                    .with_position(c.position)
                    .with_subpattern(c.subpattern);
                t.unite_tags(c);
                pre.iter().filter(|p| keep_merged(p)).for_each(|p| t.absorb_before(p));
                post.iter().filter(|p| keep_merged(p)).for_each(|p| t.absorb_after(p));
                t.resolve_assertion_conflicts();
                t.redirect_merged_transitions();
                add_unique(merged, t);
            }
        }
        Ok(())
    }

    /// Every simple zero-width path from `state` to a state that is
    /// accepting or has a non-zero-width outgoing transition, the empty
    /// path included.
    fn zero_width_paths<'a>(
        &self,
        fa: &'a Automaton,
        state: StateId,
    ) -> Result<Vec<(Vec<&'a Transition>, StateId)>> {
        let mut found = Vec::new();
        let mut stack: Vec<(StateId, Vec<&'a Transition>)> = vec![(state, Vec::new())];
        while let Some((current, path)) = stack.pop() {
            if fa.is_final(current) || fa.outgoing(current).any(|t| !is_zero_width(t)) {
                if found.len() >= self.config.path_limit {
                    return Err(Error::TooComplex(format!(
                        "more than {} zero-width paths leave state {}",
                        self.config.path_limit, state
                    )));
                }
                found.push((path.clone(), current));
            }
            for t in fa.outgoing(current).filter(|t| is_zero_width(t)) {
                let on_path = t.to == state || path.iter().any(|p| p.to == t.to);
                if !on_path {
                    let mut next = path.clone();
                    next.push(t);
                    stack.push((t.to, next));
                }
            }
        }
        // DFS pops in reverse; keep the order the paths were written in.
        found.reverse();
        Ok(found)
    }
}

fn is_zero_width(t: &Transition) -> bool {
    t.is_eps() || t.is_unmerged_assert()
}

/// Untagged epsilons carry no information once merged.
fn keep_merged(t: &Transition) -> bool {
    t.is_assert() || t.has_tags()
}

fn target(
    merged: &mut Automaton,
    map: &mut HashMap<StateId, StateId>,
    queue: &mut VecDeque<StateId>,
    state: StateId,
) -> StateId {
    *map.entry(state).or_insert_with(|| {
        queue.push_back(state);
        merged.add_state()
    })
}

fn add_unique(fa: &mut Automaton, t: Transition) {
    if !fa.outgoing(t.from).any(|existing| *existing == t) {
        fa.add_transition(t);
    }
}

struct Builder {
    fa: Automaton,
    /// Subpatterns enclosing the node being compiled, innermost last.
    subpatterns: Vec<u32>,
    /// Greediness of the enclosing quantifiers, innermost last.
    greediness: Vec<Greediness>,
    size_limit: Option<usize>,
}

impl Builder {
    fn state(&mut self) -> Result<StateId> {
        if let Some(limit) = self.size_limit {
            if self.fa.state_count() >= limit {
                return Err(Error::TooComplex(format!("automaton exceeds {} states", limit)));
            }
        }
        Ok(self.fa.add_state())
    }

    /// Connect two states with an epsilon transition
    fn connect(&mut self, from: StateId, to: StateId) {
        self.fa.add_transition(Transition::epsilon(from, to).with_subpattern(self.subpatterns.last().copied()));
    }

    fn compile_node(&mut self, node: &Node) -> Result<Fragment> {
        match node {
            Node::Leaf { leaf, position } => self.compile_leaf(leaf, *position),
            Node::Concat(nodes) => self.compile_concat(nodes),
            Node::Alternation(branches) => self.compile_alternation(branches),
            Node::Group(inner) => self.compile_node(inner),
            Node::Subpattern { number, node, position } => self.compile_subpattern(*number, node, *position),
            Node::Repeat { node, min, max, greediness, .. } => {
                self.greediness.push(*greediness);
                let fragment = self.compile_repeat(node, *min, *max);
                self.greediness.pop();
                fragment
            }
        }
    }

    fn compile_empty(&mut self) -> Result<Fragment> {
        let start = self.state()?;
        Ok(Fragment { start, end: start })
    }

    fn compile_leaf(&mut self, leaf: &Leaf, position: NodePosition) -> Result<Fragment> {
        let start = self.state()?;
        let end = self.state()?;
        let transition = Transition::new(start, end, leaf.clone())
            .with_position(position)
            .with_subpattern(self.subpatterns.last().copied())
            .with_greediness(self.greediness.last().copied().unwrap_or_default());
        self.fa.add_transition(transition);
        Ok(Fragment { start, end })
    }

    fn compile_concat(&mut self, nodes: &[Node]) -> Result<Fragment> {
        let mut result: Option<Fragment> = None;
        for node in nodes {
            let next = self.compile_node(node)?;
            result = Some(match result {
                Some(prev) => {
                    self.connect(prev.end, next.start);
                    Fragment { start: prev.start, end: next.end }
                }
                None => next,
            });
        }
        match result {
            Some(fragment) => Ok(fragment),
            None => self.compile_empty(),
        }
    }

    fn compile_alternation(&mut self, branches: &[Node]) -> Result<Fragment> {
        let start = self.state()?;
        let end = self.state()?;
        for branch in branches {
            let fragment = self.compile_node(branch)?;
            self.connect(start, fragment.start);
            self.connect(fragment.end, end);
        }
        Ok(Fragment { start, end })
    }

    fn compile_subpattern(&mut self, number: u32, node: &Node, position: NodePosition) -> Result<Fragment> {
        let start = self.state()?;
        let end = self.state()?;
        self.subpatterns.push(number);
        let inner = self.compile_node(node);
        self.subpatterns.pop();
        let inner = inner?;
        let enclosing = self.subpatterns.last().copied();
        self.fa.add_transition(
            Transition::epsilon(start, inner.start)
                .with_tag(Tag::open(number, position))
                .with_position(position)
                .with_subpattern(enclosing),
        );
        self.fa.add_transition(
            Transition::epsilon(inner.end, end)
                .with_tag(Tag::close(number, position))
                .with_position(position)
                .with_subpattern(enclosing),
        );
        Ok(Fragment { start, end })
    }

    /// Compile `node{min,max}` by unrolling the counted part and looping
    /// the unbounded one.
    fn compile_repeat(&mut self, node: &Node, min: u32, max: Option<u32>) -> Result<Fragment> {
        if max == Some(0) {
            return self.compile_empty();
        }

        // zero or more: one loop state that can skip or enter the body
        if min == 0 && max.is_none() {
            let hub = self.state()?;
            let end = self.state()?;
            let body = self.compile_node(node)?;
            self.connect(hub, body.start);
            self.connect(body.end, hub);
            self.connect(hub, end);
            return Ok(Fragment { start: hub, end });
        }

        let start = self.state()?;
        let mut current = start;
        let mut last: Option<Fragment> = None;
        for _ in 0..min {
            let copy = self.compile_node(node)?;
            self.connect(current, copy.start);
            current = copy.end;
            last = Some(copy);
        }

        match max {
            None => {
                // min > 0 here: the last mandatory copy may repeat
                if let Some(copy) = last {
                    self.connect(copy.end, copy.start);
                }
                Ok(Fragment { start, end: current })
            }
            Some(max) => {
                let end = self.state()?;
                for _ in min..max {
                    let copy = self.compile_node(node)?;
                    self.connect(current, end);
                    self.connect(current, copy.start);
                    current = copy.end;
                }
                self.connect(current, end);
                Ok(Fragment { start, end })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Charset;
    use crate::leaf::AssertionKind;
    use crate::parser::Parser;
    use crate::transition::TagKind;

    fn compile(pattern: &str) -> Automaton {
        let ast = Parser::new(pattern).parse().unwrap();
        Compiler::new().compile(&ast).unwrap()
    }

    fn from_start(fa: &Automaton) -> Vec<&Transition> {
        fa.outgoing(fa.start()).collect()
    }

    #[test]
    fn merged_automaton_has_no_epsilon() {
        for pattern in ["ab", "a|b", "(a|b)*c", "a{2,4}", "(?:x|)y?", "^a$", "\\bfoo\\b"] {
            let fa = compile(pattern);
            assert!(fa.transitions().iter().all(|t| !t.is_eps()), "{}", pattern);
            assert!(!fa.finals().is_empty(), "{}", pattern);
        }
    }

    #[test]
    fn literal_chain() {
        let fa = compile("ab");
        assert_eq!(fa.state_count(), 3);
        let first = from_start(&fa);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].leaf, Leaf::Charset(Charset::from_char('a')));
        assert!(first[0].merged_before.is_empty() && first[0].merged_after.is_empty());
    }

    #[test]
    fn empty_pattern_accepts_at_start() {
        let fa = compile("");
        assert!(fa.is_final(fa.start()));
        assert!(fa.transitions().is_empty());
    }

    #[test]
    fn anchors_are_merged_before_and_after() {
        let fa = compile("^a$");
        let t = from_start(&fa);
        assert_eq!(t.len(), 1);
        let kinds = |list: &[Transition]| list.iter().filter_map(|m| m.leaf.assertion()).collect::<Vec<_>>();
        assert_eq!(kinds(&t[0].merged_before), vec![AssertionKind::Circumflex]);
        assert_eq!(kinds(&t[0].merged_after), vec![AssertionKind::Dollar]);
        assert!(fa.is_final(t[0].to));
    }

    #[test]
    fn tags_land_on_neighbouring_characters() {
        let fa = compile("(a)(b)");
        let a = from_start(&fa)[0];
        assert_eq!(a.tag_set(), vec![(1, TagKind::Open), (1, TagKind::Close), (2, TagKind::Open)]);
        let b: Vec<&Transition> = fa.outgoing(a.to).collect();
        assert_eq!(b[0].tag_set(), vec![(2, TagKind::Close)]);

        let fa = compile("(ab)");
        let a = from_start(&fa)[0];
        assert_eq!(a.tag_set(), vec![(1, TagKind::Open)]);
    }

    #[test]
    fn star_loops_back() {
        let fa = compile("a*");
        assert!(fa.is_final(fa.start()));
        assert!(fa.transitions().iter().any(|t| t.loops_back));
        let fa = compile("ab");
        assert!(fa.transitions().iter().all(|t| !t.loops_back));
    }

    #[test]
    fn word_boundary_stays_standalone() {
        let fa = compile("\\ba");
        let t = from_start(&fa);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].leaf, Leaf::Assertion(AssertionKind::WordBoundary));
    }

    #[test]
    fn zero_width_only_pattern_is_standalone_assertion() {
        let fa = compile("^$");
        let t = from_start(&fa);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].leaf, Leaf::Assertion(AssertionKind::Circumflex));
        assert_eq!(t[0].merged_after[0].leaf, Leaf::Assertion(AssertionKind::Dollar));
        assert!(!fa.is_final(fa.start()));
    }

    #[test]
    fn greediness_is_recorded() {
        let fa = compile("a+?");
        assert!(fa.transitions().iter().all(|t| t.greediness == Greediness::Lazy));
    }

    #[test]
    fn size_limit_is_enforced() {
        let ast = Parser::new("a{1000}").parse().unwrap();
        let compiler = Compiler::with_config(Config::new().size_limit(Some(100)));
        assert!(matches!(compiler.compile(&ast), Err(Error::TooComplex(_))));
    }
}
