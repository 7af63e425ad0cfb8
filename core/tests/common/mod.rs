#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stackline_core::api::{
    ExecutionEngine, ExecutionOpts, OperationSummary, Project, ProgressSink,
    RunnerError, SinkOutput, StackDefinition, StackHandle, StackRunner, StackTarget, VertexId,
};

/// One recorded runner call.
#[derive(Debug, Clone)]
pub struct Call {
    pub op: &'static str,
    pub vertex: VertexId,
    /// The handle's environment as seen while the call ran
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
enum Behavior {
    Fail(RunnerError),
    Panic,
    Delay(Duration),
}

/// Runner that records every call and can be told to fail, panic or stall
/// on chosen vertices.
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<Call>>,
    handles: Mutex<Vec<StackHandle>>,
    behaviors: HashMap<VertexId, Behavior>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, vertex: &str, error: RunnerError) -> Self {
        self.behaviors.insert(vid(vertex), Behavior::Fail(error));
        self
    }

    pub fn panic_on(mut self, vertex: &str) -> Self {
        self.behaviors.insert(vid(vertex), Behavior::Panic);
        self
    }

    pub fn delay(mut self, vertex: &str, delay: Duration) -> Self {
        self.behaviors.insert(vid(vertex), Behavior::Delay(delay));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Vertices in the order their apply/teardown call started.
    pub fn operated(&self) -> Vec<VertexId> {
        self.calls()
            .into_iter()
            .filter(|c| c.op != "resolve")
            .map(|c| c.vertex)
            .collect()
    }

    pub fn handles(&self) -> Vec<StackHandle> {
        self.handles.lock().unwrap().clone()
    }

    fn vertex_of(handle: &StackHandle) -> VertexId {
        let project = handle
            .work_dir()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stack = handle.name().rsplit('/').next().unwrap_or_default();
        VertexId::new(project, stack)
    }

    async fn operate(
        &self,
        op: &'static str,
        stack: &StackHandle,
        sink: &ProgressSink,
    ) -> Result<OperationSummary, RunnerError> {
        let vertex = Self::vertex_of(stack);
        self.calls.lock().unwrap().push(Call {
            op,
            vertex: vertex.clone(),
            env: stack.env().snapshot(),
        });
        sink.line(&format!("{op} {vertex}"));

        match self.behaviors.get(&vertex).cloned() {
            Some(Behavior::Fail(error)) => Err(error),
            Some(Behavior::Panic) => panic!("runner blew up on {vertex}"),
            Some(Behavior::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(OperationSummary::default())
            }
            None => {
                tokio::task::yield_now().await;
                Ok(OperationSummary::default())
            }
        }
    }
}

#[async_trait]
impl StackRunner for MockRunner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve_or_create(&self, target: &StackTarget) -> Result<StackHandle, RunnerError> {
        let handle = StackHandle::new(target);
        self.calls.lock().unwrap().push(Call {
            op: "resolve",
            vertex: Self::vertex_of(&handle),
            env: handle.env().snapshot(),
        });
        self.handles.lock().unwrap().push(handle.clone());
        Ok(handle)
    }

    async fn apply(
        &self,
        stack: &StackHandle,
        sink: &ProgressSink,
    ) -> Result<OperationSummary, RunnerError> {
        self.operate("apply", stack, sink).await
    }

    async fn teardown(
        &self,
        stack: &StackHandle,
        sink: &ProgressSink,
    ) -> Result<OperationSummary, RunnerError> {
        self.operate("teardown", stack, sink).await
    }
}

pub fn vid(s: &str) -> VertexId {
    VertexId::parse(s).expect("vertex ids in tests are project:stack")
}

pub fn vids(ids: &[&str]) -> Vec<VertexId> {
    ids.iter().map(|s| vid(s)).collect()
}

pub fn project(name: &str, stacks: &[&str], deps: &[&str]) -> Project {
    Project::new(name)
        .with_stacks(stacks.iter().copied())
        .depends_on(deps.iter().copied())
}

/// `db` and `cache` have no dependencies, `app` needs both, `web` needs `app`.
pub fn layered_projects() -> Vec<Project> {
    vec![
        project("web", &["prod"], &["app"]),
        project("app", &["prod"], &["db", "cache"]),
        project("db", &["prod"], &[]),
        project("cache", &["prod"], &[]),
    ]
}

pub fn project_with_env(name: &str, stack: StackDefinition, deps: &[&str]) -> Project {
    Project::new(name)
        .with_stack(stack)
        .depends_on(deps.iter().copied())
}

pub fn engine(runner: Arc<MockRunner>, opts: ExecutionOpts) -> (ExecutionEngine, Arc<Mutex<Vec<String>>>) {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let engine = ExecutionEngine::builder(runner)
        .opts(opts)
        .sink_output(SinkOutput::Buffer(buf.clone()))
        .build();
    (engine, buf)
}

pub fn opts() -> ExecutionOpts {
    ExecutionOpts {
        source_root: "/work".into(),
        ..ExecutionOpts::default()
    }
}

pub fn strict_opts() -> ExecutionOpts {
    ExecutionOpts {
        stop_on_failure: true,
        ..opts()
    }
}
