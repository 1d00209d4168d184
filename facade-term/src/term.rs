use serde::{Deserialize, Serialize};
use std::fmt;

/// A logic term as exchanged with an engine.
///
/// The facade never inspects terms beyond collecting variable names and
/// rendering them; their meaning belongs to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    Atom(String),
    Int(i64),
    Float(f64),
    Str(String),
    Var(String),
    Compound { name: String, args: Vec<Term> },
    List(Vec<Term>),
}

/// Predicate indicator (`name/arity`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Indicator {
    pub name: String,
    pub arity: usize,
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn int(value: i64) -> Self {
        Term::Int(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Term::Str(value.into())
    }

    /// Build a compound term; zero arguments collapse to an atom.
    pub fn compound(name: impl Into<String>, args: Vec<Term>) -> Self {
        let name = name.into();
        if args.is_empty() {
            Term::Atom(name)
        } else {
            Term::Compound { name, args }
        }
    }

    pub fn list(items: Vec<Term>) -> Self {
        Term::List(items)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// Indicator of a callable term (atoms and compounds), `None` otherwise.
    pub fn indicator(&self) -> Option<Indicator> {
        match self {
            Term::Atom(name) => Some(Indicator {
                name: name.clone(),
                arity: 0,
            }),
            Term::Compound { name, args } => Some(Indicator {
                name: name.clone(),
                arity: args.len(),
            }),
            _ => None,
        }
    }

    /// Named variables in order of first appearance.
    ///
    /// Anonymous variables (`_`, `_Foo`) are skipped: engines never report
    /// bindings for them.
    pub fn variables(&self) -> Vec<String> {
        let mut seen = Vec::new();
        self.collect_variables(&mut seen);
        seen
    }

    pub(crate) fn collect_variables(&self, seen: &mut Vec<String>) {
        match self {
            Term::Var(name) => {
                if !name.starts_with('_') && !seen.iter().any(|v| v == name) {
                    seen.push(name.clone());
                }
            }
            Term::Compound { args, .. } | Term::List(args) => {
                for arg in args {
                    arg.collect_variables(seen);
                }
            }
            _ => {}
        }
    }
}

/// Named variables across a conjunction, in first-appearance order.
pub fn goal_variables(goals: &[Term]) -> Vec<String> {
    let mut seen = Vec::new();
    for goal in goals {
        goal.collect_variables(&mut seen);
    }
    seen
}

fn needs_quotes(atom: &str) -> bool {
    const SYMBOLIC: &str = "+-*/\\^<>=~:.?@#&$";

    if atom == "[]" || atom == "!" || atom == ";" || atom == "," {
        return atom == ",";
    }
    let mut chars = atom.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_ascii_lowercase() => !chars.all(|c| c.is_alphanumeric() || c == '_'),
        Some(c) if SYMBOLIC.contains(c) => !chars.all(|c| SYMBOLIC.contains(c)),
        Some(_) => true,
    }
}

fn write_atom(f: &mut fmt::Formatter<'_>, atom: &str) -> fmt::Result {
    if needs_quotes(atom) {
        write!(f, "'{}'", atom.replace('\\', "\\\\").replace('\'', "\\'"))
    } else {
        f.write_str(atom)
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Term]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(name) => write_atom(f, name),
            Term::Int(value) => write!(f, "{}", value),
            Term::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                write!(f, "{:.1}", value)
            }
            Term::Float(value) => write!(f, "{}", value),
            Term::Str(value) => write!(f, "{:?}", value),
            Term::Var(name) => f.write_str(name),
            Term::Compound { name, args } => {
                write_atom(f, name)?;
                f.write_str("(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Term::List(items) => {
                f.write_str("[")?;
                write_args(f, items)?;
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Int(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::Atom(value.to_string())
    }
}
