use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use trxsh_core::prelude::*;

/// Lets the user choose one trashed record.
pub trait Picker {
    /// `None` when the user backs out without choosing.
    fn pick(&self, records: &[Record]) -> Result<Option<u64>>;
}

/// Picks through an external `fzf` process.
pub struct FzfPicker {
    program: PathBuf,
}

impl FzfPicker {
    pub fn locate() -> Result<Self> {
        let program = which::which("fzf").map_err(|_| CoreError::missing("fzf is not installed"))?;
        Ok(Self { program })
    }
}

impl Picker for FzfPicker {
    fn pick(&self, records: &[Record]) -> Result<Option<u64>> {
        if records.is_empty() {
            return Ok(None);
        }

        let mut child = Command::new(&self.program)
            .args(["--height", "40%", "--border"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| CoreError::io(&self.program, err))?;

        if let Some(mut stdin) = child.stdin.take() {
            for record in records {
                match writeln!(stdin, "{record}") {
                    Ok(()) => {}
                    // fzf quit before reading everything.
                    Err(err) if err.kind() == io::ErrorKind::BrokenPipe => break,
                    Err(err) => return Err(CoreError::io(&self.program, err)),
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|err| CoreError::io(&self.program, err))?;
        match output.status.code() {
            Some(0) => {}
            // No match, or the user pressed Esc / Ctrl-C.
            Some(1) | Some(130) => return Ok(None),
            _ => {
                return Err(CoreError::invalid_input(format!("fzf exited with {}", output.status)));
            }
        }

        let selection = String::from_utf8_lossy(&output.stdout);
        if selection.trim().is_empty() {
            return Ok(None);
        }
        parse_selection(&selection)
            .map(Some)
            .ok_or_else(|| CoreError::invalid_input(format!("invalid selection: {}", selection.trim())))
    }
}

/// Reads the id out of an `id: name -> path` line.
pub fn parse_selection(line: &str) -> Option<u64> {
    let (id, _) = line.trim().split_once(':')?;
    id.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_yields_the_id() {
        assert_eq!(parse_selection("12: notes.md -> /home/u/notes.md\n"), Some(12));
        assert_eq!(parse_selection("  3: a:b -> /x/a:b"), Some(3));
    }

    #[test]
    fn garbage_selection_is_rejected() {
        assert_eq!(parse_selection("notes.md"), None);
        assert_eq!(parse_selection("x: notes.md -> /a"), None);
    }
}
