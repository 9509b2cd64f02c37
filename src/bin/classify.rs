#[allow(dead_code)]
#[path = "../query.rs"]
mod query;

use std::{
    env,
    io::{self, BufRead, Write},
};

use anyhow::Result;
use query::process_query;

/// Prints the classification of each argument as a line of JSON. Without
/// arguments, classifies each line read from standard input instead.
fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        eprintln!("Usage: classify [QUERY]...\n       echo QUERY | classify");
        return Ok(());
    }

    let mut out = io::stdout().lock();
    if args.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            writeln!(out, "{}", serde_json::to_string(&process_query(&line))?)?;
        }
    } else {
        for arg in &args {
            writeln!(out, "{}", serde_json::to_string(&process_query(arg))?)?;
        }
    }
    Ok(())
}
