// config.rs

use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_HISTORY_SIZE: usize = 20;
pub const DEFAULT_MAX_LINE: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Runtime settings, read once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShellConfig {
    pub history_size: usize,
    pub history_file: Option<PathBuf>,
    pub max_line: usize,
    pub start_in_home: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            history_file: None,
            max_line: DEFAULT_MAX_LINE,
            start_in_home: true,
        }
    }
}

impl ShellConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            history_size: positive(&lookup, "HISTSIZE")?.unwrap_or(defaults.history_size),
            history_file: lookup("HISTFILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            max_line: positive(&lookup, "RSH_MAX_LINE")?.unwrap_or(defaults.max_line),
            start_in_home: lookup("RSH_KEEP_CWD").is_none(),
        })
    }
}

fn positive<F>(lookup: &F, var: &'static str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}
