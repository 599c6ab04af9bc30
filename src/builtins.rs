// builtins.rs

use std::env;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

use crate::history::{HistoryStore, PersistError};
use crate::util::{expand_home, writeln_ignore_broken_pipe};

/// Commands handled inside the interpreter process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Cd,
    GetPath,
    SetPath,
    History,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Exit,
        Builtin::Cd,
        Builtin::GetPath,
        Builtin::SetPath,
        Builtin::History,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Cd => "cd",
            Builtin::GetPath => "getpath",
            Builtin::SetPath => "setpath",
            Builtin::History => "history",
        }
    }
}

/// What the loop should do after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("{0}: too many arguments")]
    TooManyArguments(&'static str),
    #[error("{0}: missing argument")]
    MissingArgument(&'static str),
    #[error("{0}: takes no arguments")]
    UnexpectedArguments(&'static str),
    #[error("cd: HOME not set")]
    HomeUnset,
    #[error("cd: {target}: {source}")]
    ChangeDir {
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("getpath: PATH not set")]
    PathUnset,
    #[error("history: {0}: numeric argument or -r/-w FILE expected")]
    HistoryUsage(String),
    #[error("history: {0}")]
    HistoryFile(#[from] PersistError),
}

/// Runs `builtin` with the full token list (`tokens[0]` is the name).
pub fn run_builtin(
    builtin: Builtin,
    tokens: &[String],
    history: &mut HistoryStore,
    out: &mut dyn Write,
) -> Result<Flow, BuiltinError> {
    let args = tokens.get(1..).unwrap_or_default();
    match builtin {
        Builtin::Exit => return Ok(Flow::Exit),
        Builtin::Cd => change_dir(args)?,
        Builtin::GetPath => {
            if !args.is_empty() {
                return Err(BuiltinError::UnexpectedArguments("getpath"));
            }
            let path = env::var("PATH").map_err(|_| BuiltinError::PathUnset)?;
            let _ = writeln_ignore_broken_pipe(out, format!("PATH: {}", path));
        }
        Builtin::SetPath => match args {
            [] => return Err(BuiltinError::MissingArgument("setpath")),
            [value] => {
                log::debug!("PATH set to {}", value);
                env::set_var("PATH", value);
            }
            _ => return Err(BuiltinError::TooManyArguments("setpath")),
        },
        Builtin::History => history_command(args, history, out)?,
    }
    Ok(Flow::Continue)
}

fn change_dir(args: &[String]) -> Result<(), BuiltinError> {
    let home = env::var("HOME").ok();
    let target = match args {
        [] => home.clone().ok_or(BuiltinError::HomeUnset)?,
        [dir] => expand_home(dir, home.as_deref()),
        _ => return Err(BuiltinError::TooManyArguments("cd")),
    };
    env::set_current_dir(&target).map_err(|source| BuiltinError::ChangeDir {
        target: args.first().cloned().unwrap_or_else(|| target.clone()),
        source,
    })
}

fn history_command(args: &[String], history: &mut HistoryStore, out: &mut dyn Write) -> Result<(), BuiltinError> {
    match args {
        [] => print_entries(history.render_all(), out),
        [flag, path] if flag == "-r" => {
            let accepted = history.load_from(Path::new(path))?;
            log::info!("read {} history lines from {}", accepted, path);
        }
        [flag, path] if flag == "-w" => {
            history.save_to(Path::new(path))?;
            log::info!("wrote history to {}", path);
        }
        [count] => {
            let count = count
                .parse::<usize>()
                .map_err(|_| BuiltinError::HistoryUsage(count.clone()))?;
            print_entries(history.render_last(count), out);
        }
        _ => return Err(BuiltinError::HistoryUsage(args.join(" "))),
    }
    Ok(())
}

fn print_entries<'a>(entries: impl Iterator<Item = (usize, &'a str)>, out: &mut dyn Write) {
    for (n, line) in entries {
        let _ = writeln_ignore_broken_pipe(out, format!("{:>5}  {}", n, line));
    }
}
