use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use prolog_facade::config::FacadeConfig;
use prolog_facade::{goal_variables, Bindings, Executor, GoalTask, Outcome, Term};

use super::{load_provider, parse_goal};

/// Flags for `plq run`
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub run_async: bool,
    pub limit: Option<usize>,
    pub json: bool,
}

/// Solve the goal and print all solutions.
///
/// Exit code: 0 with solutions, 1 without, 2 when an async run faulted.
pub fn execute(kb: &Path, goal: &str, config: &FacadeConfig, options: RunOptions) -> Result<i32> {
    let provider = Arc::new(load_provider(kb)?);
    let goals = parse_goal(goal)?;
    let vars = goal_variables(&goals);

    let mut task = GoalTask::new(provider, goals)?;
    if let Some(limit) = options.limit {
        task = task.with_solution_limit(limit);
    }

    if !options.run_async {
        let solutions = task.run()?;
        print_solutions(&vars, &solutions, options.json)?;
        return Ok(if solutions.is_empty() { 1 } else { 0 });
    }

    let executor = Executor::from_config(config)?;
    let handle = executor.submit(task);
    let outcome = handle.await_outcome();
    let faults = handle.diagnostics();

    if options.json {
        let result = serde_json::json!({
            "handle": handle.id(),
            "state": outcome.state(),
            "solutions": outcome.solutions(),
            "faults": faults,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_solutions(&vars, outcome.solutions(), false)?;
        for fault in &faults {
            eprintln!("{} {}", "fault:".red().bold(), fault.message);
        }
    }

    Ok(match outcome {
        Outcome::Solutions(_) => 0,
        Outcome::Empty => 1,
        Outcome::Faulted(_) | Outcome::Cancelled => 2,
    })
}

fn print_solutions(vars: &[String], solutions: &[Vec<Term>], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(solutions)?);
        return Ok(());
    }

    if solutions.is_empty() {
        println!("{}", "false.".red());
        return Ok(());
    }

    for solution in solutions {
        println!("{}", render(vars, solution));
    }
    println!(
        "{}",
        format!("{} solution(s)", solutions.len()).green().bold()
    );
    Ok(())
}

/// `X = tom, Y = bob` for one solution
fn render(vars: &[String], values: &[Term]) -> String {
    let bindings: Bindings = vars.iter().cloned().zip(values.iter().cloned()).collect();
    bindings.to_string()
}
