//! Conversions between facade terms and Scryer answer terms

use facade_term::{Bindings, Term};
use scryer_prolog::Term as PlTerm;

/// Convert one answer term.
///
/// Integers outside `i64` and rationals come back as their decimal text.
pub(crate) fn from_scryer(term: PlTerm) -> Term {
    match term {
        PlTerm::Integer(value) => {
            let digits = value.to_string();
            digits.parse().map(Term::Int).unwrap_or(Term::Str(digits))
        }
        PlTerm::Rational(value) => Term::Str(value.to_string()),
        PlTerm::Float(value) => Term::Float(value),
        PlTerm::Atom(name) if name == "[]" => Term::List(Vec::new()),
        PlTerm::Atom(name) => Term::Atom(name),
        PlTerm::String(value) => Term::Str(value),
        PlTerm::List(items) => Term::List(items.into_iter().map(from_scryer).collect()),
        PlTerm::Compound(name, args) => {
            Term::compound(name, args.into_iter().map(from_scryer).collect())
        }
        PlTerm::Var(name) => Term::Var(name),
        #[allow(unreachable_patterns)]
        other => Term::Str(format!("{:?}", other)),
    }
}

/// Bindings for `vars` in that order. Variables the engine left unbound
/// map to themselves.
pub(crate) fn answer_bindings<'a>(
    vars: &[String],
    lookup: impl Fn(&str) -> Option<&'a PlTerm>,
) -> Bindings {
    vars.iter()
        .map(|var| {
            let value = lookup(var)
                .cloned()
                .map(from_scryer)
                .unwrap_or_else(|| Term::Var(var.clone()));
            (var.clone(), value)
        })
        .collect()
}

/// Query text for a conjunction: `g1, g2.`
pub(crate) fn query_text(goals: &[Term]) -> String {
    let body: Vec<String> = goals.iter().map(Term::to_string).collect();
    format!("{}.", body.join(", "))
}

/// Program text for a list of facts, one clause per line.
pub(crate) fn program_text(facts: &[Term]) -> String {
    facts.iter().map(|fact| format!("{}.\n", fact)).collect()
}
