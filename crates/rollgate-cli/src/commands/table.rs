use std::fmt::Write as _;
use std::path::Path;

use rollgate_core::{Event, State, TransitionTable};

use crate::OutputFormat;

pub fn print_table(path: Option<&Path>, format: OutputFormat) -> anyhow::Result<()> {
    let table = super::load_config(path)?.table();
    match format {
        OutputFormat::Text => print!("{}", format_table(&table)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
    }
    Ok(())
}

pub fn trigger(path: Option<&Path>, state: State, event: Event) -> anyhow::Result<()> {
    let table = super::load_config(path)?.table();
    println!("{}", describe_trigger(&table, state, event));
    Ok(())
}

fn describe_trigger(table: &TransitionTable, state: State, event: Event) -> String {
    match table.lookup(state, event) {
        Some(next) => format!("{state} --{event}--> {next}"),
        None => format!("{state} --{event}--> {state} (no matching transition)"),
    }
}

fn format_table(table: &TransitionTable) -> String {
    let mut out = String::new();
    for (index, t) in table.transitions().iter().enumerate() {
        let _ = writeln!(
            out,
            "{index:>3}  {:<18} {:<16} {}",
            t.from.as_str(),
            t.event.as_str(),
            t.to.as_str()
        );
    }
    for note in table.lint() {
        let _ = writeln!(out, "note: {note}");
    }
    out
}
