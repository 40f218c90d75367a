//! Uniform wrapper for stage commands.

use crate::RenderRun;
use animatic_core::{ErrorDetails, ValidationStage};
use animatic_error::StageError;
use animatic_interface::{CommandOutput, Sandbox, SandboxCommand};

/// One-line failure message for a command that exited non-zero.
///
/// Prefers the last non-empty stderr line (where tracebacks put the
/// exception), then stdout, then the exit status.
pub fn failure_message(command: &str, output: &CommandOutput) -> String {
    let last_line = |text: &str| {
        text.lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    };
    last_line(&output.stderr)
        .or_else(|| last_line(&output.stdout))
        .unwrap_or_else(|| match output.exit_code {
            Some(code) => format!("`{}` exited with status {}", command, code),
            None => format!("`{}` was terminated by a signal", command),
        })
}

/// Run a command for a stage.
///
/// Output is recorded in the run log. A non-zero exit, a timeout or a
/// failure to launch becomes a [`StageError`] tagged with `stage`, carrying
/// clamped output and the exit code.
#[tracing::instrument(skip(sandbox, run, command), fields(stage = %stage, command = %command.program))]
pub async fn run_stage_command(
    sandbox: &dyn Sandbox,
    run: &mut RenderRun<'_>,
    stage: ValidationStage,
    command: SandboxCommand,
) -> Result<CommandOutput, StageError> {
    let display = command.display();
    let output = match sandbox.run(&command).await {
        Ok(output) => output,
        Err(e) => {
            return Err(run.fail(
                stage,
                ErrorDetails::builder(format!("`{}` could not run: {}", display, e.kind)),
            ));
        }
    };

    run.log_mut()
        .record_output(&display, &output.stdout, &output.stderr);
    tracing::debug!(
        exit_code = ?output.exit_code,
        duration_ms = output.duration_ms,
        "Stage command finished"
    );

    if output.success() {
        return Ok(output);
    }

    let details = ErrorDetails::builder(failure_message(&display, &output))
        .stderr(output.stderr.clone())
        .stdout(output.stdout.clone())
        .maybe_exit_code(output.exit_code);
    Err(run.fail(stage, details))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str, code: Option<i32>) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: code,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_message_prefers_last_stderr_line() {
        let out = output(
            "rendering",
            "Traceback (most recent call last):\n  File \"scene.py\"\nNameError: name 'Circel' is not defined\n\n",
            Some(1),
        );
        assert_eq!(
            failure_message("manim", &out),
            "NameError: name 'Circel' is not defined"
        );
    }

    #[test]
    fn test_message_falls_back_to_status() {
        assert_eq!(
            failure_message("latex --version", &output("", " \n", Some(127))),
            "`latex --version` exited with status 127"
        );
        assert!(failure_message("x", &output("", "", None)).contains("signal"));
        assert_eq!(failure_message("x", &output("only stdout\n", "", Some(2))), "only stdout");
    }
}
