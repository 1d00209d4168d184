pub mod config;
pub mod iterate;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use prolog_facade::config::{self as facade_config, FacadeConfig};
use prolog_facade::{KnowledgeBase, ScryerProvider, Term};

/// Load the config named on the command line, or discover one.
pub fn load_config(path: Option<&Path>) -> Result<FacadeConfig> {
    match path {
        Some(path) => facade_config::load(path),
        None => facade_config::discover(),
    }
}

/// Build a Scryer provider from a knowledge base file (`.pl` or JSON facts).
pub fn load_provider(kb: &Path) -> Result<ScryerProvider> {
    Ok(ScryerProvider::new(KnowledgeBase::load(kb)?))
}

/// Parse a goal given as one JSON term or a JSON array of terms.
pub fn parse_goal(input: &str) -> Result<Vec<Term>> {
    let value: serde_json::Value = serde_json::from_str(input).context("Goal is not valid JSON")?;
    if value.is_array() {
        serde_json::from_value(value).context("Goal array must contain terms")
    } else {
        let term: Term = serde_json::from_value(value).context("Goal is not a term")?;
        Ok(vec![term])
    }
}
