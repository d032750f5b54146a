//! Interactive terminal front end for a signed-in user's task list.
//!
//! Mirrors the controls of a task window: an entry line (`add`), checkboxes
//! (`check` / `uncheck`), a delete-selected button (`delete`) and the
//! completed-task filter (`filter`).

pub mod commands;
pub mod prompt;

pub use commands::{ParseError, ShellCommand, HELP};
pub use prompt::TerminalPrompter;

use crate::tasks::{TaskError, TaskId, TaskList};
use anyhow::Result;
use console::style;
use rustyline::error::ReadlineError;
use std::io::Write;

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run the read-eval loop until `quit`, Ctrl-C or end of input.
pub fn run(list: &mut TaskList) -> Result<()> {
    let mut editor = rustyline::DefaultEditor::new()?;
    let mut out = std::io::stdout();

    render(list, &mut out)?;
    writeln!(out, "{}", style("Type 'help' for commands.").dim())?;

    loop {
        let line = match editor.readline("taskgate> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }

        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "{}", style(e).yellow())?;
                continue;
            }
        };

        if execute(list, command, &mut out)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

/// What a command did to the list, before anything is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Changed,
    Unchanged,
    NoSuchTask(usize),
}

/// Apply one command and print its result. Recoverable task errors are
/// printed; storage failures are returned.
pub fn execute(list: &mut TaskList, command: ShellCommand, out: &mut dyn Write) -> Result<Flow> {
    let result = match command {
        ShellCommand::Help => {
            writeln!(out, "{HELP}")?;
            return Ok(Flow::Continue);
        }
        ShellCommand::Quit => return Ok(Flow::Quit),
        command => apply(list, command),
    };

    match result {
        Ok(outcome) => report(list, outcome, out)?,
        Err(TaskError::Storage(e)) => return Err(e),
        Err(e) => writeln!(out, "{}", style(e).red())?,
    }
    Ok(Flow::Continue)
}

/// Apply a single non-interactive command. Unlike [`execute`], any task
/// error (including an empty task or an unknown number) is returned so the
/// caller can exit non-zero.
pub fn execute_once(list: &mut TaskList, command: ShellCommand, out: &mut dyn Write) -> Result<()> {
    match command {
        ShellCommand::Help => writeln!(out, "{HELP}")?,
        ShellCommand::Quit => {}
        command => match apply(list, command)? {
            Outcome::NoSuchTask(n) => anyhow::bail!("No task number {n}"),
            outcome => report(list, outcome, out)?,
        },
    }
    Ok(())
}

fn apply(list: &mut TaskList, command: ShellCommand) -> Result<Outcome, TaskError> {
    match command {
        ShellCommand::Add(text) => list.add(&text).map(|_| Outcome::Changed),
        ShellCommand::Check(n) => set_visible(list, n, true),
        ShellCommand::Uncheck(n) => set_visible(list, n, false),
        ShellCommand::Delete => list.delete_selected().map(|removed| {
            tracing::debug!(removed, "delete command");
            Outcome::Changed
        }),
        ShellCommand::Filter => list.toggle_visibility_filter().map(|_| Outcome::Changed),
        ShellCommand::List => Ok(Outcome::Changed),
        ShellCommand::Help | ShellCommand::Quit => Ok(Outcome::Unchanged),
    }
}

fn report(list: &TaskList, outcome: Outcome, out: &mut dyn Write) -> Result<()> {
    match outcome {
        Outcome::Changed => render(list, out)?,
        Outcome::Unchanged => {}
        Outcome::NoSuchTask(n) => {
            writeln!(out, "{}", style(format!("No task number {n}")).yellow())?
        }
    }
    Ok(())
}

/// Print the title, the visible tasks and the filter control.
pub fn render(list: &TaskList, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", style(format!("{}'s Tasks", list.owner())).bold())?;

    let mut shown = 0usize;
    for (i, task) in list.visible().enumerate() {
        let line = if task.is_done() {
            format!("{:>3}. [x] {}", i + 1, style(task.text()).strikethrough().dim())
        } else {
            format!("{:>3}. [ ] {}", i + 1, task.text())
        };
        writeln!(out, "{line}")?;
        shown += 1;
    }
    if shown == 0 {
        writeln!(out, "{}", style("  (no tasks)").dim())?;
    }

    let hidden = list.len() - shown;
    let mut footer = format!("[{}]", list.filter_label());
    if hidden > 0 {
        footer.push_str(&format!(" {hidden} completed hidden"));
    }
    writeln!(out, "{}", style(footer).dim())?;
    Ok(())
}

/// Resolve a 1-based position in the visible list to a task id.
pub fn visible_id(list: &TaskList, n: usize) -> Option<TaskId> {
    n.checked_sub(1)
        .and_then(|i| list.visible().nth(i))
        .map(|t| t.id())
}

fn set_visible(list: &mut TaskList, n: usize, done: bool) -> Result<Outcome, TaskError> {
    match visible_id(list, n) {
        Some(id) => list.set_done(id, done).map(|()| Outcome::Changed),
        None => Ok(Outcome::NoSuchTask(n)),
    }
}
