//! Line-oriented trigger surface.
//!
//! One command per line: `annotate`, `prompt <text>`, `health`, `quit`.
//! End of input behaves like `quit`.

use std::io::BufRead;

use anyhow::Result;
use tracing::{info, warn};

use cellnote_core::{RunningApp, Task};

#[derive(Debug, PartialEq)]
pub enum Trigger {
    Submit(Task),
    Quit,
    Skip,
}

pub fn parse(line: &str) -> Result<Trigger, String> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command {
        "" => Ok(Trigger::Skip),
        "annotate" => Ok(Trigger::Submit(Task::auto_annotate())),
        // 空の prompt もそのまま投入し、ワーカー側で MalformedTask として報告する
        "prompt" => Ok(Trigger::Submit(Task::prompted(rest))),
        "health" => Ok(Trigger::Submit(Task::health_check())),
        "quit" | "exit" => Ok(Trigger::Quit),
        other => Err(format!("unknown command '{other}'")),
    }
}

/// Feed triggers to the app until `quit`, end of input, or the worker stops
/// accepting work. Always enqueues `quit` last. Returns how many tasks were submitted.
pub fn run<R: BufRead>(input: R, app: &RunningApp) -> Result<usize> {
    let mut submitted = 0;
    for line in input.lines() {
        if !app.lifecycle().accepts_triggers() {
            warn!(phase = %app.lifecycle().phase(), "worker no longer accepts triggers");
            return Ok(submitted);
        }
        match parse(&line?) {
            Ok(Trigger::Submit(task)) => {
                let id = app.submit(task)?;
                info!(task_id = %id, "task queued");
                submitted += 1;
            }
            Ok(Trigger::Quit) => break,
            Ok(Trigger::Skip) => {}
            Err(message) => warn!(%message, "ignoring trigger"),
        }
    }
    if app.lifecycle().accepts_triggers() {
        app.quit()?;
    }
    Ok(submitted)
}
