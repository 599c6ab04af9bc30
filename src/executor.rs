// executor.rs

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, ForkResult};
use std::env;
use std::ffi::CString;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Exit status of a finished external command.
pub type ExitCode = i32;

/// Status reported when the child could not exec its program.
pub const EXEC_FAILED: ExitCode = 127;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{0}: command not found")]
    NotFound(String),
    #[error("{0}: argument contains a NUL byte")]
    InvalidArgument(String),
    #[error("fork failed: {0}")]
    Spawn(#[source] nix::Error),
    #[error("wait failed: {0}")]
    Wait(#[source] nix::Error),
}

/// Runs an argument vector as an external program, blocking until it ends.
pub trait Runner {
    fn run_external(&mut self, argv: &[String]) -> Result<ExitCode, ExecError>;
}

/// [`Runner`] backed by `fork`/`execvp`/`waitpid`.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run_external(&mut self, argv: &[String]) -> Result<ExitCode, ExecError> {
        let Some(program) = argv.first() else {
            return Ok(0);
        };
        let exec_path = find_program(program, env::var("PATH").ok().as_deref())
            .ok_or_else(|| ExecError::NotFound(program.clone()))?;

        let cmd = CString::new(exec_path.to_string_lossy().as_bytes())
            .map_err(|_| ExecError::InvalidArgument(program.clone()))?;
        let args = argv
            .iter()
            .map(|a| CString::new(a.as_str()).map_err(|_| ExecError::InvalidArgument(a.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        std::io::stdout().flush().ok();
        match unsafe { fork() }.map_err(ExecError::Spawn)? {
            ForkResult::Child => {
                // execvp only returns on failure.
                if let Some(e) = execvp(&cmd, &args).err() {
                    eprintln!("{}: {}", program, e);
                }
                unsafe { libc::_exit(EXEC_FAILED) }
            }
            ForkResult::Parent { child } => match waitpid(child, None).map_err(ExecError::Wait)? {
                WaitStatus::Exited(_, code) => {
                    log::debug!("{} exited with {}", program, code);
                    Ok(code)
                }
                WaitStatus::Signaled(_, signal, _) => {
                    log::warn!("{} terminated by {:?}", program, signal);
                    Ok(128 + signal as i32)
                }
                other => {
                    log::warn!("{} stopped waiting in state {:?}", program, other);
                    Ok(EXEC_FAILED)
                }
            },
        }
    }
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Locates `program` on `path_var`, or checks it directly when it already
/// contains a `/`.
pub fn find_program(program: &str, path_var: Option<&str>) -> Option<PathBuf> {
    if program.contains('/') {
        let direct = PathBuf::from(program);
        return is_executable(&direct).then_some(direct);
    }
    path_var?
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn make_exec(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 3\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn finds_executables_in_path_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        make_exec(first.path(), "tool", 0o644);
        let expected = make_exec(second.path(), "tool", 0o755);
        let path_var = format!("{}:{}", first.path().display(), second.path().display());
        assert_eq!(find_program("tool", Some(&path_var)), Some(expected));
        assert_eq!(find_program("missing", Some(&path_var)), None);
        assert_eq!(find_program("tool", None), None);
    }

    #[test]
    fn slash_paths_skip_the_search() {
        let dir = tempfile::tempdir().unwrap();
        let script = make_exec(dir.path(), "run.sh", 0o755);
        let as_str = script.to_string_lossy().to_string();
        assert_eq!(find_program(&as_str, None), Some(script));
        assert_eq!(find_program("./definitely-not-here", Some("/bin")), None);
    }

    #[test]
    fn missing_program_is_not_found() {
        let mut runner = ProcessRunner;
        let err = runner
            .run_external(&["no-such-program-for-recall-shell".to_string()])
            .unwrap_err();
        assert!(matches!(err, ExecError::NotFound(_)));
        assert_eq!(err.to_string(), "no-such-program-for-recall-shell: command not found");
    }

    #[test]
    #[serial]
    fn reports_child_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let script = make_exec(dir.path(), "three.sh", 0o755);
        let mut runner = ProcessRunner;
        let code = runner
            .run_external(&[script.to_string_lossy().to_string()])
            .unwrap();
        assert_eq!(code, 3);
    }

    #[test]
    #[serial]
    fn failed_exec_exits_with_127() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.sh");
        fs::write(&path, "#!/no/such/interpreter\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        let mut runner = ProcessRunner;
        let code = runner
            .run_external(&[path.to_string_lossy().to_string()])
            .unwrap();
        assert_eq!(code, EXEC_FAILED);
    }
}
