//! Local shell - runs commands with `sh -c`

use crate::Shell;
use crate::capture;
use reconcile::{Bindings, CommandExecutor, CommandOutput, ExecFailure};
use std::process::{Command, Stdio};

/// Runs each command in a fresh `sh -c`
///
/// The child inherits this process's environment with the bindings added on
/// top.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalShell;

impl CommandExecutor for LocalShell {
    fn execute(&self, command: &str, bindings: &Bindings) -> CommandOutput {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .envs(bindings.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        match child {
            Ok(child) => capture::collect(child, None),
            Err(e) => CommandOutput::failed(
                ExecFailure::Transport(format!("failed to execute sh: {}", e)),
                "",
            ),
        }
    }
}

impl Shell for LocalShell {
    fn describe(&self) -> String {
        "local".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{BindingPrefix, Value, VarMap};

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        let vars: VarMap = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::known(*v)))
            .collect();
        Bindings::builder().with(BindingPrefix::Input, &vars).build()
    }

    #[test]
    fn test_bindings_reach_the_command() {
        let output = LocalShell.execute(
            r#"printf '%s|%s' "$INPUT_name" "$INPUT_quote""#,
            &bindings(&[("name", "disk one"), ("quote", "it's")]),
        );
        assert!(output.is_success());
        assert_eq!(output.stdout, "disk one|it's");
    }

    #[test]
    fn test_stdout_is_kept_verbatim() {
        let output = LocalShell.execute("echo value", &Bindings::default());
        assert_eq!(output.stdout, "value\n");
    }

    #[test]
    fn test_failure_keeps_combined_output() {
        let output =
            LocalShell.execute("echo partial; echo broken >&2; exit 4", &Bindings::default());
        assert_eq!(output.failure, Some(ExecFailure::Exit(4)));
        assert!(output.combined.contains("partial"));
        assert!(output.combined.contains("broken"));
    }

    #[test]
    fn test_parent_environment_is_inherited() {
        let output = LocalShell.execute("test -n \"$PATH\"", &Bindings::default());
        assert!(output.is_success());
    }
}
