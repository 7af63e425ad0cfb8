use std::any::Any;
use std::future::Future;

use futures::stream::FuturesUnordered;
use futures::StreamExt;

use crate::error::RunnerError;

use super::types::VertexId;

/// Execute a single stage of units in parallel
///
/// Every vertex gets its own tokio task; the stage is not throttled, so
/// fan-out equals the stage width. Returns once every unit has finished.
/// A unit that panics is reported as [`RunnerError::Panicked`] instead of
/// taking the coordinator down with it.
///
/// # Arguments
///
/// * `vertices` - Vertices to execute in this stage
/// * `unit_fn` - Builds the future for a single vertex
///
/// # Returns
///
/// One `(vertex, outcome)` pair per vertex, in completion order
pub async fn execute_stage_parallel<F, Fut, T>(
    vertices: &[VertexId],
    unit_fn: F,
) -> Vec<(VertexId, Result<T, RunnerError>)>
where
    F: Fn(VertexId) -> Fut,
    Fut: Future<Output = Result<T, RunnerError>> + Send + 'static,
    T: Send + 'static,
{
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for vertex in vertices {
        let handle = tokio::spawn(unit_fn(vertex.clone()));
        let vertex = vertex.clone();

        futs.push(async move {
            let outcome = match handle.await {
                Ok(res) => res,
                Err(e) if e.is_panic() => Err(RunnerError::Panicked(panic_message(e.into_panic()))),
                Err(_) => Err(RunnerError::Cancelled),
            };
            (vertex, outcome)
        });
    }

    let mut results = Vec::with_capacity(vertices.len());
    while let Some(res) = futs.next().await {
        results.push(res);
    }

    results
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
