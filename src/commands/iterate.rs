use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use prolog_facade::{Engine, Provider, SolutionIterator};

use super::{load_provider, parse_goal};

/// Pull solutions lazily, printing each as it arrives.
pub fn execute(kb: &Path, goal: &str, take: Option<usize>, skip: usize) -> Result<()> {
    let provider = load_provider(kb)?;
    let goals = parse_goal(goal)?;

    let mut engine: Box<dyn Engine> = provider.new_engine()?;
    let mut solutions = SolutionIterator::new(engine.query(&goals)?);

    for _ in 0..skip {
        if !solutions.has_next() {
            break;
        }
        solutions.skip_solution()?;
    }

    let mut shown = 0;
    while solutions.has_next() && take.map_or(true, |n| shown < n) {
        let bindings = solutions.next_bindings()?;
        println!("{}", bindings);
        shown += 1;
    }

    if shown == 0 {
        println!("{}", "false.".red());
    } else if solutions.has_next() {
        println!("{}", "... more solutions available".dimmed());
    }
    Ok(())
}
