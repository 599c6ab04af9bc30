// completion.rs

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Helper};
use std::os::unix::fs::PermissionsExt;

use crate::builtins::Builtin;

/// Completes the command word against builtins and `PATH` executables.
#[derive(Default)]
pub struct CommandCompleter;

impl CommandCompleter {
    fn candidates(prefix: &str, path_var: Option<&str>) -> Vec<String> {
        let mut names: Vec<String> = Builtin::ALL
            .iter()
            .map(|b| b.name())
            .filter(|n| n.starts_with(prefix))
            .map(String::from)
            .collect();
        for dir in path_var.unwrap_or_default().split(':').filter(|d| !d.is_empty()) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                if !name.starts_with(prefix) {
                    continue;
                }
                let is_exec = entry
                    .metadata()
                    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
                    .unwrap_or(false);
                if is_exec {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        names.dedup();
        names
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let prefix = &line[..pos];
        let start = prefix.len() - prefix.trim_start().len();
        let word = &prefix[start..];
        // Only the command word is completed.
        if word.is_empty() || word.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let path_var = std::env::var("PATH").ok();
        let completions = Self::candidates(word, path_var.as_deref())
            .into_iter()
            .map(|n| Pair {
                display: n.clone(),
                replacement: format!("{} ", n),
            })
            .collect();
        Ok((start, completions))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {
    fn validate(&self, _ctx: &mut ValidationContext) -> Result<ValidationResult, ReadlineError> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Helper for CommandCompleter {}
