use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use stackline_core::config::RunnerConfig;
use stackline_core::error::RunnerError;
use stackline_core::executor::scan_resource_ids;
use stackline_core::executor::traits::{ProgressSink, StackHandle, StackRunner, StackTarget};
use stackline_core::executor::types::{Direction, OperationSummary};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Classify a failed `spawn`.
///
/// A missing or non-executable binary breaks every unit and is fatal. Anything
/// else (fd or process limits, EAGAIN) is local to this unit.
fn spawn_error(binary: &str, e: std::io::Error) -> RunnerError {
    match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => {
            RunnerError::Spawn(format!("{binary}: {e}"))
        }
        _ => RunnerError::operation(format!("failed to start {binary}: {e}")),
    }
}

/// Lines of stderr kept for the error message of a failed operation.
const STDERR_TAIL_LINES: usize = 20;

/// Drives stacks through the `pulumi` CLI.
///
/// Every call is a child process with `kill_on_drop`, so a cancelled unit
/// takes its process down with it.
pub struct PulumiCliRunner {
    binary: String,
    extra_args: Vec<String>,
}

impl PulumiCliRunner {
    pub fn new(binary: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            extra_args,
        }
    }

    pub fn from_config(cfg: &RunnerConfig) -> Self {
        Self::new(cfg.binary.clone(), cfg.extra_args.clone())
    }

    fn command(&self, args: &[String], env: &BTreeMap<String, String>) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> RunnerError {
        spawn_error(&self.binary, e)
    }

    async fn operate(
        &self,
        direction: Direction,
        stack: &StackHandle,
        sink: &ProgressSink,
    ) -> Result<OperationSummary, RunnerError> {
        let args = operation_args(
            direction,
            stack.name(),
            stack.work_dir(),
            sink.is_structured(),
            &self.extra_args,
        );
        tracing::debug!(binary = %self.binary, args = ?args, "running stack operation");

        let started = Instant::now();
        let mut child = self
            .command(&args, &stack.env().snapshot())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
        let stderr = child.stderr.take().map(|s| BufReader::new(s).lines());
        let mut output = OperationOutput::default();

        if let (Some(mut out_lines), Some(mut err_lines)) = (stdout, stderr) {
            let mut out_done = false;
            let mut err_done = false;
            while !(out_done && err_done) {
                tokio::select! {
                    line = out_lines.next_line(), if !out_done => match line {
                        Ok(Some(line)) => output.stdout_line(&line, sink),
                        Ok(None) => out_done = true,
                        Err(e) => {
                            tracing::warn!(error = %e, "reading runner stdout failed");
                            out_done = true;
                        }
                    },
                    line = err_lines.next_line(), if !err_done => match line {
                        Ok(Some(line)) => output.stderr_line(&line, sink),
                        Ok(None) => err_done = true,
                        Err(e) => {
                            tracing::warn!(error = %e, "reading runner stderr failed");
                            err_done = true;
                        }
                    },
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| RunnerError::operation(format!("waiting for {} failed: {e}", self.binary)))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if status.success() {
            Ok(OperationSummary {
                changes: output.changes,
                duration_ms,
            })
        } else {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            Err(output.into_error(&format!(
                "{} {} exited with {}",
                self.binary,
                args.first().map(String::as_str).unwrap_or_default(),
                code
            )))
        }
    }
}

#[async_trait]
impl StackRunner for PulumiCliRunner {
    fn name(&self) -> &str {
        "pulumi"
    }

    async fn resolve_or_create(&self, target: &StackTarget) -> Result<StackHandle, RunnerError> {
        let args = select_args(target);
        tracing::debug!(binary = %self.binary, args = ?args, "selecting stack");

        let out = self
            .command(&args, &BTreeMap::new())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(RunnerError::Resolve {
                stack: target.qualified_name(),
                message: stderr.trim().to_string(),
            });
        }
        Ok(StackHandle::new(target))
    }

    async fn apply(
        &self,
        stack: &StackHandle,
        sink: &ProgressSink,
    ) -> Result<OperationSummary, RunnerError> {
        self.operate(Direction::Apply, stack, sink).await
    }

    async fn teardown(
        &self,
        stack: &StackHandle,
        sink: &ProgressSink,
    ) -> Result<OperationSummary, RunnerError> {
        self.operate(Direction::Teardown, stack, sink).await
    }
}

/// `stack select --create` so a missing stack is initialised on first use.
pub fn select_args(target: &StackTarget) -> Vec<String> {
    vec![
        "stack".into(),
        "select".into(),
        "--create".into(),
        "--non-interactive".into(),
        "--cwd".into(),
        target.work_dir.display().to_string(),
        target.qualified_name(),
    ]
}

pub fn operation_args(
    direction: Direction,
    stack: &str,
    work_dir: &Path,
    structured: bool,
    extra: &[String],
) -> Vec<String> {
    let subcommand = match direction {
        Direction::Apply => "up",
        Direction::Teardown => "destroy",
    };
    let mut args: Vec<String> = vec![
        subcommand.into(),
        "--yes".into(),
        "--skip-preview".into(),
        "--non-interactive".into(),
        "--stack".into(),
        stack.into(),
        "--cwd".into(),
        work_dir.display().to_string(),
    ];
    if structured {
        args.push("--json".into());
    }
    args.extend(extra.iter().cloned());
    args
}

/// What the runner learned from one operation's output.
#[derive(Debug, Default)]
struct OperationOutput {
    stderr_tail: VecDeque<String>,
    errors: Vec<String>,
    resources: BTreeSet<String>,
    changes: Vec<(String, u64)>,
}

impl OperationOutput {
    fn stdout_line(&mut self, line: &str, sink: &ProgressSink) {
        match serde_json::from_str::<Value>(line.trim()) {
            Ok(event @ Value::Object(_)) => {
                self.observe_event(&event);
                sink.event(event);
            }
            _ => {
                self.resources.extend(error_urns(line));
                sink.line(line);
            }
        }
    }

    fn stderr_line(&mut self, line: &str, sink: &ProgressSink) {
        self.resources.extend(scan_resource_ids(line));
        if self.stderr_tail.len() == STDERR_TAIL_LINES {
            self.stderr_tail.pop_front();
        }
        self.stderr_tail.push_back(line.to_string());
        sink.line(line);
    }

    /// Picks failed resources and the change summary out of engine events.
    fn observe_event(&mut self, event: &Value) {
        if let Some(diag) = event.get("diagnosticEvent") {
            if diag.get("severity").and_then(Value::as_str) == Some("error") {
                if let Some(urn) = diag.get("urn").and_then(Value::as_str) {
                    self.resources.insert(urn.to_string());
                }
                if let Some(msg) = diag.get("message").and_then(Value::as_str) {
                    self.errors.push(msg.trim().to_string());
                }
            }
        }
        if let Some(failed) = event.get("resOpFailedEvent") {
            if let Some(urn) = failed
                .pointer("/metadata/urn")
                .and_then(Value::as_str)
            {
                self.resources.insert(urn.to_string());
            }
        }
        if let Some(changes) = event.pointer("/summaryEvent/resourceChanges") {
            self.changes = parse_changes(changes);
        }
    }

    fn into_error(self, headline: &str) -> RunnerError {
        let mut message = headline.to_string();
        let detail: Vec<String> = if self.errors.is_empty() {
            self.stderr_tail.into_iter().collect()
        } else {
            self.errors
        };
        if !detail.is_empty() {
            message.push_str(":\n");
            message.push_str(&detail.join("\n"));
        }
        RunnerError::Operation {
            message,
            resources: self.resources.into_iter().collect(),
        }
    }
}

/// URNs on plain-text lines that report an error.
fn error_urns(line: &str) -> Vec<String> {
    if line.contains("error") {
        scan_resource_ids(line)
    } else {
        Vec::new()
    }
}

fn parse_changes(changes: &Value) -> Vec<(String, u64)> {
    changes
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(op, n)| n.as_u64().map(|n| (op.clone(), n)))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use stackline_core::executor::traits::SinkOutput;
    use stackline_core::executor::types::{ProgressMode, VertexId};
    use stackline_core::executor::UnitContext;
    use std::sync::{Arc, Mutex};

    fn sink(mode: ProgressMode) -> (ProgressSink, Arc<Mutex<Vec<String>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let unit = UnitContext::new(
            Arc::from("run"),
            Direction::Teardown,
            1,
            VertexId::new("app", "prod"),
        );
        (
            ProgressSink::new(mode, unit, SinkOutput::Buffer(buf.clone())),
            buf,
        )
    }

    #[test]
    fn select_args_create_missing_stacks() {
        let target = StackTarget::new(Some("acme"), "prod", "/src/app");
        assert_eq!(
            select_args(&target),
            vec![
                "stack",
                "select",
                "--create",
                "--non-interactive",
                "--cwd",
                "/src/app",
                "acme/prod"
            ]
        );
    }

    #[test]
    fn operation_args_per_direction() {
        let extra = vec!["--parallel".to_string(), "4".to_string()];
        assert_eq!(
            operation_args(Direction::Apply, "prod", Path::new("/src/app"), false, &extra),
            vec![
                "up",
                "--yes",
                "--skip-preview",
                "--non-interactive",
                "--stack",
                "prod",
                "--cwd",
                "/src/app",
                "--parallel",
                "4"
            ]
        );

        let args = operation_args(Direction::Teardown, "acme/prod", Path::new("/src/app"), true, &[]);
        assert_eq!(args[0], "destroy");
        assert_eq!(args.last().map(String::as_str), Some("--json"));
    }

    #[test]
    fn engine_events_feed_summary_and_resources() {
        let (sink, buf) = sink(ProgressMode::Structured);
        let mut output = OperationOutput::default();

        output.stdout_line(
            &json!({"diagnosticEvent": {
                "severity": "error",
                "urn": "urn:pulumi:prod::app::aws:s3/bucket:Bucket::logs",
                "message": "BucketNotEmpty\n"
            }})
            .to_string(),
            &sink,
        );
        output.stdout_line(
            &json!({"summaryEvent": {"resourceChanges": {"delete": 3, "same": 1}}}).to_string(),
            &sink,
        );

        assert_eq!(
            output.changes,
            vec![("delete".to_string(), 3), ("same".to_string(), 1)]
        );
        assert_eq!(buf.lock().unwrap().len(), 2);

        let err = output.into_error("pulumi destroy exited with 255");
        assert_eq!(
            err.resources(),
            ["urn:pulumi:prod::app::aws:s3/bucket:Bucket::logs".to_string()]
        );
        assert_eq!(err.to_string(), "pulumi destroy exited with 255:\nBucketNotEmpty");
    }

    #[test]
    fn plain_output_falls_back_to_stderr_tail() {
        let (sink, buf) = sink(ProgressMode::Plain);
        let mut output = OperationOutput::default();

        output.stdout_line("Destroying (prod):", &sink);
        output.stdout_line("  - aws:s3:Bucket logs deleting", &sink);
        output.stderr_line(
            "error: deleting urn:pulumi:prod::app::aws:s3/bucket:Bucket::logs: BucketNotEmpty",
            &sink,
        );

        assert_eq!(buf.lock().unwrap()[0], "[app:prod] Destroying (prod):");

        let err = output.into_error("pulumi destroy exited with 1");
        assert_eq!(
            err.resources(),
            ["urn:pulumi:prod::app::aws:s3/bucket:Bucket::logs".to_string()]
        );
        assert!(err.to_string().ends_with("BucketNotEmpty"));
    }

    #[test]
    fn stderr_tail_is_bounded() {
        let (sink, _) = sink(ProgressMode::Plain);
        let mut output = OperationOutput::default();
        for i in 0..50 {
            output.stderr_line(&format!("line {i}"), &sink);
        }
        assert_eq!(output.stderr_tail.len(), STDERR_TAIL_LINES);
        assert_eq!(output.stderr_tail.front().map(String::as_str), Some("line 30"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let runner = PulumiCliRunner::new("/nonexistent/stackline-test-pulumi", Vec::new());
        let target = StackTarget::new(None, "prod", std::env::temp_dir());

        let err = runner.resolve_or_create(&target).await.unwrap_err();
        assert!(err.is_fatal(), "{err:?}");
    }

    #[test]
    fn only_unusable_binaries_are_fatal() {
        let not_found = spawn_error("pulumi", std::io::Error::from(ErrorKind::NotFound));
        assert!(not_found.is_fatal());

        let denied = spawn_error("pulumi", std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(denied.is_fatal());

        // EMFILE
        let fd_limit = spawn_error("pulumi", std::io::Error::from_raw_os_error(24));
        assert!(!fd_limit.is_fatal(), "{fd_limit:?}");
        assert!(matches!(fd_limit, RunnerError::Operation { .. }));
        assert!(fd_limit.to_string().starts_with("failed to start pulumi:"));

        let would_block = spawn_error("pulumi", std::io::Error::from(ErrorKind::WouldBlock));
        assert!(!would_block.is_fatal());
    }
}
