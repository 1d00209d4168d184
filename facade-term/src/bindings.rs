use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Term;

/// Variable bindings of one solution, in the order the engine reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings {
    vars: IndexMap<String, Term>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Term) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Term> {
        self.vars.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Bound values in variable order, dropping the names.
    pub fn into_values(self) -> Vec<Term> {
        self.vars.into_values().collect()
    }
}

impl FromIterator<(String, Term)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (String, Term)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.vars.is_empty() {
            return f.write_str("true");
        }
        for (i, (name, value)) in self.vars.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", name, value)?;
        }
        Ok(())
    }
}
