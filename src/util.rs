// util.rs

use std::io::{self, Write};

/// `writeln!` that treats a closed reader (`BrokenPipe`) as success.
pub fn writeln_ignore_broken_pipe<W: Write + ?Sized, S: AsRef<str>>(w: &mut W, s: S) -> io::Result<()> {
    match writeln!(w, "{}", s.as_ref()) {
        Err(ref e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Expands a leading `~` or `~/` against `home`.
pub fn expand_home(target: &str, home: Option<&str>) -> String {
    match home {
        Some(home) if target == "~" => home.to_string(),
        Some(home) if target.starts_with("~/") => format!("{}/{}", home.trim_end_matches('/'), &target[2..]),
        _ => target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_tilde_forms() {
        assert_eq!(expand_home("~", Some("/home/me")), "/home/me");
        assert_eq!(expand_home("~/src", Some("/home/me/")), "/home/me/src");
        assert_eq!(expand_home("~other", Some("/home/me")), "~other");
        assert_eq!(expand_home("~/src", None), "~/src");
    }

    #[test]
    fn writes_line_with_newline() {
        let mut out = Vec::new();
        writeln_ignore_broken_pipe(&mut out, "hello").unwrap();
        assert_eq!(out, b"hello\n");
    }
}
