//! Parallel tool executor (§4.3). Submission order is preserved in the result
//! vector regardless of completion order, via a pre-allocated slot per call —
//! the same pattern the teacher's graph engine uses for branch results.

use std::collections::BTreeMap;

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};

use super::{execute, CancellationToken, ToolCall, ToolError, ToolRegistry};
use crate::value::SendableValue;

/// How the parallel executor reacts to a single call failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// Abort and return the first error encountered (by completion, not index).
    FailFast,
    /// Run every call to completion; return all results, failures included.
    CollectErrors,
    /// Run every call to completion; failures become a `None` slot, dropped from output.
    ContinueOnError,
}

/// Run `calls` concurrently against `registry`. Results are returned in the
/// same order as `calls`, regardless of completion order (S2).
///
/// Preflight: every `tool_name` must already be registered, checked before any
/// execution launches, so a missing tool can never leave sibling calls running.
pub async fn run_parallel(
    registry: &ToolRegistry,
    calls: &[ToolCall],
    strategy: ErrorStrategy,
    cancellation: &CancellationToken,
) -> Result<Vec<Option<Result<SendableValue, ToolError>>>, ToolError> {
    for call in calls {
        if !registry.contains(&call.tool_name) {
            return Err(ToolError::NotFound(call.tool_name.clone()));
        }
    }

    match strategy {
        ErrorStrategy::FailFast => run_fail_fast(registry, calls, cancellation).await,
        ErrorStrategy::CollectErrors => {
            let completed = run_all(registry, calls, cancellation).await;
            Ok(completed.into_iter().map(Some).collect())
        }
        ErrorStrategy::ContinueOnError => {
            let completed = run_all(registry, calls, cancellation).await;
            Ok(completed
                .into_iter()
                .map(|r| match r {
                    Ok(v) => Some(Ok(v)),
                    Err(_) => None,
                })
                .collect())
        }
    }
}

async fn run_all(
    registry: &ToolRegistry,
    calls: &[ToolCall],
    cancellation: &CancellationToken,
) -> Vec<Result<SendableValue, ToolError>> {
    let futures = calls
        .iter()
        .map(|call| async move { execute(registry, &call.tool_name, call.arguments.clone(), cancellation).await });
    join_all(futures).await
}

/// On first failure, returns immediately and drops the `FuturesUnordered`
/// set — every call still in flight is dropped mid-poll along with it, which
/// is how a plain (non-spawned) future is cancelled in structured concurrency.
async fn run_fail_fast(
    registry: &ToolRegistry,
    calls: &[ToolCall],
    cancellation: &CancellationToken,
) -> Result<Vec<Option<Result<SendableValue, ToolError>>>, ToolError> {
    let mut in_flight: FuturesUnordered<_> = calls
        .iter()
        .enumerate()
        .map(|(index, call)| async move {
            let result = execute(registry, &call.tool_name, call.arguments.clone(), cancellation).await;
            (index, result)
        })
        .collect();

    let mut slots: Vec<Option<Result<SendableValue, ToolError>>> = (0..calls.len()).map(|_| None).collect();
    while let Some((index, result)) = in_flight.next().await {
        match result {
            Ok(value) => slots[index] = Some(Ok(value)),
            Err(e) => return Err(e),
        }
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParameterType, Tool, ToolParameter, ToolSchema};
    use crate::value::SendableValue;
    use async_trait::async_trait;
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    struct DelayedTool {
        name: &'static str,
        delay_ms: u64,
        output: &'static str,
    }

    #[async_trait]
    impl Tool for DelayedTool {
        fn name(&self) -> &str {
            self.name
        }
        fn spec(&self) -> ToolSchema {
            ToolSchema {
                name: self.name.into(),
                description: "".into(),
                parameters: vec![],
            }
        }
        async fn call(&self, _args: BTreeMap<String, SendableValue>) -> Result<SendableValue, String> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(SendableValue::String(self.output.to_string()))
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: Uuid::new_v4(),
            provider_call_id: None,
            tool_name: name.to_string(),
            arguments: BTreeMap::new(),
        }
    }

    /// **Scenario**: S2 — three tools with delays 50ms/25ms/5ms, submitted
    /// first/second/third, still return results[0..2] = first/second/third.
    #[tokio::test]
    async fn parallel_results_preserve_submission_order_not_completion_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(DelayedTool {
            name: "slow",
            delay_ms: 50,
            output: "first",
        }));
        registry.register(Box::new(DelayedTool {
            name: "medium",
            delay_ms: 25,
            output: "second",
        }));
        registry.register(Box::new(DelayedTool {
            name: "fast",
            delay_ms: 5,
            output: "third",
        }));

        let calls = vec![call("slow"), call("medium"), call("fast")];
        let results = run_parallel(&registry, &calls, ErrorStrategy::FailFast, &CancellationToken::new())
            .await
            .unwrap();

        let texts: Vec<_> = results
            .into_iter()
            .map(|r| match r.unwrap().unwrap() {
                SendableValue::String(s) => s,
                _ => panic!("expected string"),
            })
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }
        fn spec(&self) -> ToolSchema {
            ToolSchema {
                name: "failing".into(),
                description: "".into(),
                parameters: vec![],
            }
        }
        async fn call(&self, _args: BTreeMap<String, SendableValue>) -> Result<SendableValue, String> {
            Err("boom".into())
        }
    }

    /// A missing tool must be rejected before anything launches, so a sibling
    /// that would otherwise run never gets the chance to.
    #[tokio::test]
    async fn preflight_rejects_missing_tool_before_launching_any_call() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(DelayedTool {
            name: "slow",
            delay_ms: 20,
            output: "first",
        }));

        let calls = vec![call("missing"), call("slow")];
        let err = run_parallel(&registry, &calls, ErrorStrategy::CollectErrors, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "missing"));
    }

    /// **Scenario**: S2 variant — fail-fast must not wait for the slow
    /// sibling to finish once the fast one fails.
    #[tokio::test]
    async fn fail_fast_returns_as_soon_as_the_first_call_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FailingTool));
        registry.register(Box::new(DelayedTool {
            name: "slow",
            delay_ms: 500,
            output: "first",
        }));

        let calls = vec![call("slow"), call("failing")];
        let started = Instant::now();
        let err = run_parallel(&registry, &calls, ErrorStrategy::FailFast, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
