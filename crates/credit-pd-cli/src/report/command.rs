use std::io::Write;
use std::process::{Command, Stdio};

use credit_pd_core::commentary::{AnalysisPayload, CommentaryProvider, ProviderError};

/// Commentary from an external program: the payload is written to its stdin
/// as JSON and its stdout is taken as the commentary text.
#[derive(Debug, Clone)]
pub struct CommandCommentary {
    program: String,
    args: Vec<String>,
}

impl CommandCommentary {
    /// Split a command line on whitespace. No shell quoting is interpreted.
    pub fn parse(command_line: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or("--commentary-cmd is empty")?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl CommentaryProvider for CommandCommentary {
    fn analyse(&self, payload: &AnalysisPayload) -> Result<String, ProviderError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to start '{}': {}", self.program, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload.to_json()?.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("'{}' exited with {}: {}", self.program, output.status, stderr.trim()).into());
        }
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_program_and_args() {
        let c = CommandCommentary::parse("analyst --model small").unwrap();
        assert_eq!(c.program, "analyst");
        assert_eq!(c.args, vec!["--model", "small"]);
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(CommandCommentary::parse("   ").is_err());
    }

    #[test]
    fn test_missing_program_is_a_provider_error() {
        let c = CommandCommentary::parse("cpd-no-such-analyst-binary").unwrap();
        let err = c.analyse(&AnalysisPayload::default()).unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }
}
