use std::{
    io::{BufRead, BufReader, ErrorKind, Write},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use tracing::{debug, info, warn};

use crate::{config::ExifToolCommand, error::FinishError};

const READY_MARKER: &[u8] = b"{ready}";
const EXECUTE: &str = "-execute";

/// A request/response channel to something that writes metadata.
///
/// One command is in flight at a time: `submit` blocks until the other end
/// says it is ready again.
pub trait StampSession {
    fn submit(&mut self, args: &[String]) -> bool;
}

/// A single `exiftool -stay_open True -@ -` process fed one command at a time.
pub struct ExifTool {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    closed: bool,
}

fn launch_error(command: &ExifToolCommand, e: std::io::Error) -> FinishError {
    if e.kind() == ErrorKind::NotFound {
        FinishError::ToolNotFound {
            program: command.program.clone(),
        }
    } else {
        FinishError::ToolUnavailable(format!("{}: {}", command.program, e))
    }
}

impl ExifTool {
    /// Run `exiftool -ver`, failing if the tool is missing or unhappy.
    pub fn version(command: &ExifToolCommand) -> Result<String, FinishError> {
        let output = Command::new(&command.program)
            .args(&command.leading_args)
            .arg("-ver")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| launch_error(command, e))?;

        if !output.status.success() {
            return Err(FinishError::ToolUnavailable(format!(
                "`{} -ver` exited with {}",
                command.program, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }

    pub fn spawn(command: &ExifToolCommand) -> Result<ExifTool, FinishError> {
        let mut child = Command::new(&command.program)
            .args(&command.leading_args)
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| launch_error(command, e))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(FinishError::ToolUnavailable(
                "exiftool started without stdio pipes".to_owned(),
            ));
        };

        info!(pid = child.id(), program = %command.program, "exiftool session started");
        Ok(ExifTool {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            closed: false,
        })
    }

    /// Ask exiftool to leave stay-open mode, then kill it regardless.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(mut stdin) = self.stdin.take() {
            let shutdown = format!("-stay_open\nFalse\n{EXECUTE}\n");
            if let Err(e) = stdin
                .write_all(shutdown.as_bytes())
                .and_then(|_| stdin.flush())
            {
                debug!(error = %e, "could not send stay_open shutdown");
            }
        }
        if let Err(e) = self.child.kill() {
            debug!(error = %e, "could not kill exiftool");
        }
        let _ = self.child.wait();
        debug!("exiftool session closed");
    }

    fn read_until_ready(&mut self) -> bool {
        let mut line = Vec::new();
        loop {
            line.clear();
            match self.stdout.read_until(b'\n', &mut line) {
                Ok(0) => {
                    warn!("exiftool closed its output");
                    return false;
                }
                Ok(_) => {
                    if line
                        .windows(READY_MARKER.len())
                        .any(|window| window == READY_MARKER)
                    {
                        return true;
                    }
                    debug!(output = %String::from_utf8_lossy(&line).trim_end(), "exiftool");
                }
                Err(e) => {
                    warn!(error = %e, "could not read exiftool output");
                    return false;
                }
            }
        }
    }
}

impl StampSession for ExifTool {
    fn submit(&mut self, args: &[String]) -> bool {
        // arguments travel one per line
        if args.iter().any(|arg| arg.contains('\n') || arg.contains('\r')) {
            warn!(?args, "refusing argument containing a line break");
            return false;
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return false;
        };

        let mut command = String::new();
        for arg in args {
            command.push_str(arg);
            command.push('\n');
        }
        command.push_str(EXECUTE);
        command.push('\n');

        if let Err(e) = stdin
            .write_all(command.as_bytes())
            .and_then(|_| stdin.flush())
        {
            warn!(error = %e, "could not write to exiftool");
            return false;
        }

        self.read_until_ready()
    }
}

impl Drop for ExifTool {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Answers `-ver`, then acknowledges every `-execute` like exiftool does.
    const FAKE_EXIFTOOL: &str = r#"
if [ "$1" = "-ver" ]; then echo 12.76; exit 0; fi
while IFS= read -r line; do
  case "$line" in
    -execute) echo "{ready}" ;;
    *) echo "    1 image files updated" ;;
  esac
done
"#;

    /// Reads a single line and dies.
    const DYING_EXIFTOOL: &str = r#"
if [ "$1" = "-ver" ]; then echo 12.76; exit 0; fi
read -r line
exit 1
"#;

    fn sh(script: &str) -> ExifToolCommand {
        ExifToolCommand {
            program: "sh".to_owned(),
            leading_args: vec!["-c".to_owned(), script.to_owned(), "exiftool".to_owned()],
        }
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_version_probe() {
        assert_eq!(ExifTool::version(&sh(FAKE_EXIFTOOL)).unwrap(), "12.76");
    }

    #[test]
    fn test_version_probe_failure() {
        let err = ExifTool::version(&sh("exit 3")).unwrap_err();
        assert!(matches!(err, FinishError::ToolUnavailable(_)));
    }

    #[test]
    fn test_missing_tool_is_fatal() {
        let command = ExifToolCommand {
            program: "definitely-not-an-installed-exiftool".to_owned(),
            leading_args: Vec::new(),
        };
        assert!(matches!(
            ExifTool::version(&command),
            Err(FinishError::ToolNotFound { .. })
        ));
        assert!(matches!(
            ExifTool::spawn(&command),
            Err(FinishError::ToolNotFound { .. })
        ));
    }

    #[test]
    fn test_repeated_commands_share_one_process() {
        let mut exiftool = ExifTool::spawn(&sh(FAKE_EXIFTOOL)).unwrap();
        for i in 0..5 {
            assert!(exiftool.submit(&args(&[
                "-overwrite_original",
                "-DateTimeOriginal=2024:03:05 10:15:00",
                &format!("/out/IMG_{i}.JPG"),
            ])));
        }
        exiftool.close();
        assert!(!exiftool.submit(&args(&["/out/late.JPG"])));
    }

    #[test]
    fn test_dead_tool_reports_failure() {
        let mut exiftool = ExifTool::spawn(&sh(DYING_EXIFTOOL)).unwrap();
        assert!(!exiftool.submit(&args(&["-overwrite_original", "/out/IMG_0001.JPG"])));
        // closing a dead session must not panic or hang
        exiftool.close();
        exiftool.close();
    }

    #[test]
    fn test_line_breaks_are_refused_without_desync() {
        let mut exiftool = ExifTool::spawn(&sh(FAKE_EXIFTOOL)).unwrap();
        assert!(!exiftool.submit(&args(&["/out/bad\nname.JPG"])));
        assert!(exiftool.submit(&args(&["/out/good.JPG"])));
    }
}
