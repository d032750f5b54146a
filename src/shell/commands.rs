//! Task shell command parsing.

/// One line typed into the task shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Add a task; the text may be blank and is validated by the list.
    Add(String),
    /// Mark the n-th visible task (1-based) as done.
    Check(usize),
    /// Mark the n-th visible task (1-based) as not done.
    Uncheck(usize),
    /// Delete every completed task.
    Delete,
    /// Flip the completed-task filter.
    Filter,
    List,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command '{0}'. Type 'help' for a list of commands.")]
    Unknown(String),
    #[error("'{0}' needs a task number")]
    MissingIndex(&'static str),
    #[error("'{0}' is not a task number")]
    BadIndex(String),
}

pub const HELP: &str = "\
Commands:
  add <text>     add a task
  check <n>      mark task n as done
  uncheck <n>    mark task n as not done
  delete         delete all completed tasks
  filter         show/hide completed tasks
  list           show tasks
  help           show this help
  quit           leave";

impl ShellCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "add" | "a" => Self::Add(rest.to_string()),
            "check" | "done" | "x" => Self::Check(parse_index("check", rest)?),
            "uncheck" | "undo" | "u" => Self::Uncheck(parse_index("uncheck", rest)?),
            "delete" | "del" | "d" => Self::Delete,
            "filter" | "f" => Self::Filter,
            "list" | "ls" | "l" => Self::List,
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return Err(ParseError::Unknown(word.to_string())),
        };
        Ok(Some(command))
    }
}

fn parse_index(command: &'static str, arg: &str) -> Result<usize, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::MissingIndex(command));
    }
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ParseError::BadIndex(arg.to_string())),
    }
}
