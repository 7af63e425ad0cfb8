use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

use crate::error::RunnerError;
use crate::executor::context::UnitContext;
use crate::executor::env::StackEnv;
use crate::executor::types::{OperationSummary, ProgressMode};

/// Backend that brings stacks to their desired state or tears them down.
///
/// Implementations must tolerate concurrent calls for distinct stacks; the
/// engine never runs two operations on the same stack at once.
#[async_trait]
pub trait StackRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Select the stack, creating it when it does not exist yet.
    async fn resolve_or_create(&self, target: &StackTarget) -> Result<StackHandle, RunnerError>;

    async fn apply(
        &self,
        stack: &StackHandle,
        sink: &ProgressSink,
    ) -> Result<OperationSummary, RunnerError>;

    async fn teardown(
        &self,
        stack: &StackHandle,
        sink: &ProgressSink,
    ) -> Result<OperationSummary, RunnerError>;
}

/// What to resolve: stack name, optional org qualifier and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTarget {
    pub org: Option<String>,
    pub stack: String,
    pub work_dir: PathBuf,
}

impl StackTarget {
    pub fn new(org: Option<&str>, stack: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            org: org.map(str::to_string),
            stack: stack.into(),
            work_dir: work_dir.into(),
        }
    }

    /// `org/stack` when an org is set, otherwise the bare stack name.
    pub fn qualified_name(&self) -> String {
        match self.org.as_deref().filter(|o| !o.is_empty()) {
            Some(org) => format!("{org}/{}", self.stack),
            None => self.stack.clone(),
        }
    }
}

/// A resolved stack, ready for apply or teardown.
#[derive(Debug, Clone)]
pub struct StackHandle {
    name: String,
    work_dir: PathBuf,
    env: StackEnv,
}

impl StackHandle {
    pub fn new(target: &StackTarget) -> Self {
        Self {
            name: target.qualified_name(),
            work_dir: target.work_dir.clone(),
            env: StackEnv::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Environment the backend must run with. Holds the scoped overrides
    /// while an operation is in flight.
    pub fn env(&self) -> &StackEnv {
        &self.env
    }
}

/// Where a sink writes.
#[derive(Debug, Clone, Default)]
pub enum SinkOutput {
    #[default]
    Stdout,
    Buffer(Arc<Mutex<Vec<String>>>),
}

/// Progress channel handed to a runner for one operation.
///
/// Structured mode writes one JSON record per event or line, tagged with the
/// unit's context fields; plain mode writes `[project:stack] line`.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    mode: ProgressMode,
    unit: UnitContext,
    output: SinkOutput,
}

impl ProgressSink {
    pub fn new(mode: ProgressMode, unit: UnitContext, output: SinkOutput) -> Self {
        Self { mode, unit, output }
    }

    pub fn mode(&self) -> ProgressMode {
        self.mode
    }

    pub fn is_structured(&self) -> bool {
        self.mode == ProgressMode::Structured
    }

    pub fn unit(&self) -> &UnitContext {
        &self.unit
    }

    /// A machine-readable engine event from the backend.
    pub fn event(&self, event: Value) {
        match self.mode {
            ProgressMode::Structured => self.write(self.record("event", event)),
            ProgressMode::Plain => self.write(format!("[{}] {}", self.unit.vertex, event)),
        }
    }

    /// A line of human-readable backend output.
    pub fn line(&self, line: &str) {
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        match self.mode {
            ProgressMode::Structured => {
                self.write(self.record("message", Value::String(line.to_string())))
            }
            ProgressMode::Plain => self.write(format!("[{}] {}", self.unit.vertex, line)),
        }
    }

    fn record(&self, key: &str, payload: Value) -> String {
        let mut record = self.unit.fields();
        if let Value::Object(map) = &mut record {
            map.insert("ts".into(), Value::String(Local::now().to_rfc3339()));
            map.insert(key.into(), payload);
        }
        record.to_string()
    }

    fn write(&self, text: String) {
        match &self.output {
            SinkOutput::Stdout => write_line(&mut std::io::stdout().lock(), &text),
            SinkOutput::Buffer(buf) => {
                if let Ok(mut buf) = buf.lock() {
                    buf.push(text);
                }
            }
        }
    }
}

/// Write one line, dropping it if the reader has gone away (`| head`).
fn write_line(out: &mut impl Write, text: &str) {
    if let Err(e) = writeln!(out, "{text}") {
        tracing::debug!(error = %e, "dropped progress line");
    }
}
