//! Engine adapter over embedded Scryer Prolog
//!
//! Every engine is a fresh `Machine` with the knowledge base consulted into
//! it, so engines from one provider never share mutable state. Goals are
//! written out as Prolog text and answers converted back into facade terms.

mod convert;

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use facade_term::{goal_variables, Bindings, Engine, Provider, Query, Term};
use scryer_prolog::{LeafAnswer, Machine, MachineBuilder, QueryState};
use serde::Deserialize;

use convert::{answer_bindings, from_scryer, program_text, query_text};

/// Module the knowledge base is consulted into
const KB_MODULE: &str = "kb";

/// Program text consulted into every engine
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    program: Arc<str>,
}

/// `{"facts": [...]}`
#[derive(Deserialize)]
struct FactFile {
    #[serde(default)]
    facts: Vec<Term>,
}

impl KnowledgeBase {
    /// Prolog source, clauses and directives as written.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            program: Arc::from(source.into()),
        }
    }

    /// One clause per fact. Fails on facts that are not callable.
    pub fn from_facts(facts: &[Term]) -> Result<Self> {
        if let Some(bad) = facts.iter().find(|f| f.indicator().is_none()) {
            bail!("fact is not callable: {}", bad);
        }
        Ok(Self::from_source(program_text(facts)))
    }

    /// Load a `.pl` source file, or a JSON fact file otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge base: {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("pl") | Some("pro") => Ok(Self::from_source(contents)),
            _ => {
                let file: FactFile = serde_json::from_str(&contents).with_context(|| {
                    format!("Failed to parse knowledge base: {}", path.display())
                })?;
                Self::from_facts(&file.facts)
            }
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Provider of isolated Scryer engines over one knowledge base
#[derive(Debug)]
pub struct ScryerProvider {
    kb: KnowledgeBase,
    engines: AtomicUsize,
}

impl ScryerProvider {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self {
            kb,
            engines: AtomicUsize::new(0),
        }
    }

    pub fn from_facts(facts: &[Term]) -> Result<Self> {
        Ok(Self::new(KnowledgeBase::from_facts(facts)?))
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Number of engines handed out so far
    pub fn engines_created(&self) -> usize {
        self.engines.load(Ordering::SeqCst)
    }
}

impl Provider for ScryerProvider {
    fn new_engine(&self) -> Result<Box<dyn Engine>> {
        let serial = self.engines.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(serial, "building scryer machine");

        let mut machine = MachineBuilder::default().build();
        machine.consult_module_string(KB_MODULE, self.kb.program());
        Ok(Box::new(ScryerEngine { machine }))
    }
}

/// One Scryer machine
pub struct ScryerEngine {
    machine: Machine,
}

impl Engine for ScryerEngine {
    fn query(&mut self, goals: &[Term]) -> Result<Box<dyn Query + '_>> {
        if goals.is_empty() {
            bail!("empty goal");
        }
        let text = query_text(goals);
        tracing::debug!(query = %text, "running scryer query");

        let mut query = ScryerQuery {
            vars: goal_variables(goals),
            answers: self.machine.run_query(text),
            lookahead: None,
            finished: false,
        };
        query.prefetch();
        Ok(Box::new(query))
    }
}

/// Cursor over a Scryer query's answers
///
/// One answer is pulled ahead so `has_more_solutions` never runs the
/// machine. An exception ends the answer stream.
pub struct ScryerQuery<'m> {
    vars: Vec<String>,
    answers: QueryState<'m>,
    lookahead: Option<Result<Bindings>>,
    finished: bool,
}

impl ScryerQuery<'_> {
    fn prefetch(&mut self) {
        if self.finished {
            self.lookahead = None;
            return;
        }

        let vars = &self.vars;
        self.lookahead = match self.answers.next() {
            None | Some(Ok(LeafAnswer::False)) => None,
            Some(Ok(LeafAnswer::True)) => Some(Ok(answer_bindings(vars, |_| None))),
            Some(Ok(LeafAnswer::LeafAnswer { bindings, .. })) => {
                Some(Ok(answer_bindings(vars, |v| bindings.get(v))))
            }
            Some(Ok(LeafAnswer::Exception(ball))) => Some(Err(anyhow!(
                "unhandled exception: {}",
                from_scryer(ball)
            ))),
            Some(Err(error)) => Some(Err(anyhow!("{}", from_scryer(error)))),
            #[allow(unreachable_patterns)]
            Some(Ok(other)) => Some(Err(anyhow!("unsupported answer: {:?}", other))),
        };
        self.finished = !matches!(self.lookahead, Some(Ok(_)));
    }
}

impl Query for ScryerQuery<'_> {
    fn has_more_solutions(&self) -> bool {
        self.lookahead.is_some()
    }

    fn next_solution(&mut self) -> Result<()> {
        self.next_variables_solution().map(|_| ())
    }

    fn next_variables_solution(&mut self) -> Result<Bindings> {
        let Some(current) = self.lookahead.take() else {
            bail!("no more solutions");
        };
        self.prefetch();
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::GoalTask;
    use tempfile::TempDir;

    fn parent(a: &str, b: &str) -> Term {
        Term::compound("parent", vec![Term::atom(a), Term::atom(b)])
    }

    fn family() -> ScryerProvider {
        ScryerProvider::from_facts(&[
            parent("tom", "bob"),
            parent("tom", "liz"),
            parent("bob", "ann"),
            parent("bob", "pat"),
            parent("pat", "jim"),
        ])
        .unwrap()
    }

    fn drain(provider: &ScryerProvider, goals: &[Term]) -> Result<Vec<Bindings>> {
        let mut engine = provider.new_engine()?;
        let mut query = engine.query(goals)?;
        let mut out = Vec::new();
        while query.has_more_solutions() {
            out.push(query.next_variables_solution()?);
        }
        Ok(out)
    }

    #[test]
    fn test_facts_in_order() {
        let provider = family();
        let goal = Term::compound("parent", vec![Term::atom("tom"), Term::var("X")]);
        let solutions = drain(&provider, &[goal]).unwrap();

        let xs: Vec<_> = solutions.iter().map(|b| b.get("X").unwrap().clone()).collect();
        assert_eq!(xs, vec![Term::atom("bob"), Term::atom("liz")]);
    }

    #[test]
    fn test_conjunction_joins() {
        let provider = family();
        let goals = vec![
            Term::compound("parent", vec![Term::var("G"), Term::var("P")]),
            Term::compound("parent", vec![Term::var("P"), Term::var("C")]),
        ];
        let solutions = drain(&provider, &goals).unwrap();

        let rendered: Vec<_> = solutions.iter().map(|b| b.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "G = tom, P = bob, C = ann",
                "G = tom, P = bob, C = pat",
                "G = bob, P = pat, C = jim",
            ]
        );
    }

    #[test]
    fn test_anonymous_goal_variables_are_distinct() {
        let provider = ScryerProvider::from_facts(&[Term::compound(
            "likes",
            vec![Term::atom("ann"), Term::atom("tea")],
        )])
        .unwrap();
        let goal = vec![Term::compound("likes", vec![Term::var("_"), Term::var("_")])];

        let buffer = GoalTask::new(Arc::new(provider), goal).unwrap().run().unwrap();
        assert_eq!(buffer, vec![Vec::<Term>::new()]);
    }

    #[test]
    fn test_no_answers_is_not_a_fault() {
        let provider = family();
        let goal = Term::compound("parent", vec![Term::atom("jim"), Term::var("X")]);
        assert!(drain(&provider, &[goal]).unwrap().is_empty());
    }

    #[test]
    fn test_thrown_ball_ends_stream() {
        let provider = family();
        let goals = vec![
            Term::compound("parent", vec![Term::atom("tom"), Term::var("X")]),
            Term::compound("throw", vec![Term::compound("oops", vec![Term::var("X")])]),
        ];
        let mut engine = provider.new_engine().unwrap();
        let mut query = engine.query(&goals).unwrap();

        assert!(query.has_more_solutions());
        let err = query.next_variables_solution().unwrap_err();
        assert!(err.to_string().contains("oops(bob)"));
        assert!(!query.has_more_solutions());
    }

    #[test]
    fn test_error_term_is_a_fault() {
        let provider = family();
        let mut engine = provider.new_engine().unwrap();
        let mut query = engine.query(&[Term::var("G")]).unwrap();

        let err = query.next_variables_solution().unwrap_err();
        assert!(err.to_string().contains("instantiation_error"));
    }

    fn count(engine: &mut dyn Engine, goals: &[Term]) -> usize {
        let mut query = engine.query(goals).unwrap();
        let mut n = 0;
        while query.has_more_solutions() {
            query.next_solution().unwrap();
            n += 1;
        }
        n
    }

    #[test]
    fn test_engines_are_isolated() {
        let provider = ScryerProvider::new(KnowledgeBase::default());
        let mark = vec![Term::compound("assertz", vec![Term::compound("seen", vec![Term::int(1)])])];
        let defined = vec![Term::compound(
            "current_predicate",
            vec![Term::compound("/", vec![Term::atom("seen"), Term::int(1)])],
        )];

        let mut first = provider.new_engine().unwrap();
        assert_eq!(count(first.as_mut(), &mark), 1);
        assert_eq!(count(first.as_mut(), &defined), 1);

        let mut second = provider.new_engine().unwrap();
        assert_eq!(count(second.as_mut(), &defined), 0);
        assert_eq!(provider.engines_created(), 2);
    }

    #[test]
    fn test_rules_from_source_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("family.pl");
        fs::write(
            &path,
            "parent(tom, bob).\nparent(bob, ann).\n\
             grandparent(X, Z) :- parent(X, Y), parent(Y, Z).\n",
        )
        .unwrap();

        let provider = ScryerProvider::new(KnowledgeBase::load(&path).unwrap());
        let goal = Term::compound("grandparent", vec![Term::var("Who"), Term::atom("ann")]);
        let solutions = drain(&provider, &[goal]).unwrap();
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].get("Who"), Some(&Term::atom("tom")));
    }

    #[test]
    fn test_json_fact_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kb.json");
        fs::write(
            &path,
            r#"{"facts": [{"compound": {"name": "n", "args": [{"int": 7}]}}]}"#,
        )
        .unwrap();

        let kb = KnowledgeBase::load(&path).unwrap();
        assert_eq!(kb.program(), "n(7).\n");
    }

    #[test]
    fn test_non_callable_fact_rejected() {
        assert!(KnowledgeBase::from_facts(&[Term::int(3)]).is_err());
    }
}
