// repl.rs

use anyhow::Context;
use itertools::Itertools;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::ffi::OsString;
use std::io::{self, Write};
use thiserror::Error;

use crate::builtins::{run_builtin, Builtin, Flow};
use crate::completion::CommandCompleter;
use crate::config::ShellConfig;
use crate::executor::{ProcessRunner, Runner};
use crate::history::HistoryStore;
use crate::parser::tokenize;
use crate::recall::{self, Resolution};
use crate::util::writeln_ignore_broken_pipe;

const PROMPT: &str = "shell> ";

type LineEditor = Editor<CommandCompleter, DefaultHistory>;

/// Rejections made on the typed line before any recall or tokenizing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Line too long ({len} bytes, limit is {max})")]
    LineTooLong { len: usize, max: usize },
}

/// Interpreter state that survives between lines.
pub struct Shell<R: Runner> {
    history: HistoryStore,
    runner: R,
    max_line: usize,
}

impl<R: Runner> Shell<R> {
    pub fn new(config: &ShellConfig, runner: R) -> Self {
        Self {
            history: HistoryStore::new(config.history_size),
            runner,
            max_line: config.max_line,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    /// Handles one line as typed by the operator. Every failure is reported
    /// on `out`; only `exit` stops the loop.
    pub fn dispatch(&mut self, raw: &str, out: &mut dyn Write) -> Flow {
        if raw.len() > self.max_line {
            report(out, InputError::LineTooLong { len: raw.len(), max: self.max_line });
            return Flow::Continue;
        }
        match recall::resolve(raw, &self.history, self.max_line) {
            Ok(Resolution::NotRecall) => self.execute(raw, true, out),
            Ok(Resolution::Resolved(line)) => {
                log::debug!("{:?} recalled as {:?}", raw.trim(), line);
                let _ = writeln_ignore_broken_pipe(out, &line);
                self.execute(&line, false, out)
            }
            Err(e) => {
                report(out, e);
                Flow::Continue
            }
        }
    }

    fn execute(&mut self, line: &str, record: bool, out: &mut dyn Write) -> Flow {
        let tokens = tokenize(line);
        let Some(command) = tokens.first() else {
            return Flow::Continue;
        };
        let builtin = Builtin::from_name(command);
        if record && builtin != Some(Builtin::History) && self.history.append(line) {
            log::debug!("recorded #{}: {}", self.history.total_entered(), line);
        }
        match builtin {
            Some(b) => {
                log::debug!("builtin {} {}", b.name(), tokens[1..].iter().join(" "));
                run_builtin(b, &tokens, &mut self.history, out).unwrap_or_else(|e| {
                    report(out, e);
                    Flow::Continue
                })
            }
            None => {
                if let Err(e) = self.runner.run_external(&tokens) {
                    report(out, e);
                }
                Flow::Continue
            }
        }
    }
}

fn report(out: &mut dyn Write, err: impl std::fmt::Display) {
    let _ = writeln_ignore_broken_pipe(out, err.to_string());
}

/// Interactive loop: runs until `exit` or end of input, then persists
/// history and restores the original `PATH`.
pub fn start_repl(config: ShellConfig) -> anyhow::Result<()> {
    let original_path = std::env::var_os("PATH");
    if config.start_in_home {
        if let Some(home) = std::env::var_os("HOME") {
            if let Err(e) = std::env::set_current_dir(&home) {
                log::warn!("cannot change to {:?}: {}", home, e);
            }
        }
    }

    let mut shell = Shell::new(&config, ProcessRunner);
    preload_history(&mut shell, &config);

    let editor_config = Config::builder().completion_type(CompletionType::List).build();
    let mut rl: LineEditor = Editor::with_config(editor_config).context("failed to create line editor")?;
    rl.set_helper(Some(CommandCompleter));
    for (_, line) in shell.history().render_all() {
        remember_in_editor(&mut rl, line);
    }

    let mut stdout = io::stdout();
    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                remember_in_editor(&mut rl, &line);
                if shell.dispatch(&line, &mut stdout) == Flow::Exit {
                    break;
                }
                stdout.flush().ok();
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                shutdown(&shell, &config, original_path, &mut stdout);
                return Err(err).context("failed to read input");
            }
        }
    }
    shutdown(&shell, &config, original_path, &mut stdout);
    Ok(())
}

/// Adds a typed line to the editor's own arrow-key history. This is
/// separate from the numbered `HistoryStore`.
fn remember_in_editor(rl: &mut LineEditor, line: &str) {
    if !line.trim().is_empty() {
        let _ = rl.add_history_entry(line);
    }
}

/// Loads `HISTFILE` into the store through `append`. A missing file is
/// a fresh start, not an error.
fn preload_history<R: Runner>(shell: &mut Shell<R>, config: &ShellConfig) {
    let Some(path) = &config.history_file else {
        return;
    };
    match shell.history_mut().load_from(path) {
        Ok(n) => log::info!("loaded {} history lines from {}", n, path.display()),
        Err(e) if e.is_missing() => {}
        Err(e) => log::warn!("cannot read history: {}", e),
    }
}

fn shutdown<R: Runner>(shell: &Shell<R>, config: &ShellConfig, original_path: Option<OsString>, out: &mut dyn Write) {
    if let Some(path) = &config.history_file {
        match shell.history().save_to(path) {
            Ok(()) => log::info!("saved history to {}", path.display()),
            Err(e) => log::warn!("cannot write history: {}", e),
        }
    }
    if let Some(orig) = original_path {
        std::env::set_var("PATH", &orig);
        log::info!("PATH restored");
        let _ = writeln_ignore_broken_pipe(out, format!("Restored PATH: {}", orig.to_string_lossy()));
    }
}
