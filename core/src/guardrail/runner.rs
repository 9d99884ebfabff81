//! Runs a set of guardrails sequentially or in parallel, short-circuiting on
//! the first tripwire when configured to.

use futures::future::join_all;

use super::{Guardrail, GuardrailResult, GuardrailRunnerConfiguration, ToolGuardrailData};
use crate::value::SendableValue;

/// A tripped guardrail, naming which one triggered among the set checked.
#[derive(Debug, Clone)]
pub struct TrippedGuardrail {
    pub triggering_guardrail: String,
    pub result: GuardrailResult,
}

pub struct GuardrailRunner {
    config: GuardrailRunnerConfiguration,
}

impl Default for GuardrailRunner {
    fn default() -> Self {
        Self {
            config: GuardrailRunnerConfiguration::default(),
        }
    }
}

impl GuardrailRunner {
    pub fn new(config: GuardrailRunnerConfiguration) -> Self {
        Self { config }
    }

    pub async fn run_input(&self, guardrails: &[Guardrail], input: &str) -> Option<TrippedGuardrail> {
        self.run(guardrails, |g| {
            let input = input.to_string();
            Box::pin(async move { g.check_text(&input).await })
        })
        .await
    }

    pub async fn run_output(&self, guardrails: &[Guardrail], output: &str) -> Option<TrippedGuardrail> {
        self.run_input(guardrails, output).await
    }

    pub async fn run_tool_input(
        &self,
        guardrails: &[Guardrail],
        data: &ToolGuardrailData,
    ) -> Option<TrippedGuardrail> {
        self.run(guardrails, |g| {
            let data = data.clone();
            Box::pin(async move { g.check_tool(&data).await })
        })
        .await
    }

    pub async fn run_tool_output(
        &self,
        guardrails: &[Guardrail],
        output: &SendableValue,
    ) -> Option<TrippedGuardrail> {
        self.run(guardrails, |g| {
            let output = output.clone();
            Box::pin(async move { g.check_value(&output).await })
        })
        .await
    }

    async fn run<'a, F>(&self, guardrails: &'a [Guardrail], check: F) -> Option<TrippedGuardrail>
    where
        F: Fn(&'a Guardrail) -> std::pin::Pin<Box<dyn std::future::Future<Output = GuardrailResult> + Send + 'a>>,
    {
        if guardrails.is_empty() {
            return None;
        }

        if self.config.run_in_parallel {
            let futures = guardrails.iter().map(|g| {
                let fut = check(g);
                async move { (g.name().to_string(), fut.await) }
            });
            let results = join_all(futures).await;
            results
                .into_iter()
                .find(|(_, result)| result.tripwire_triggered)
                .map(|(name, result)| {
                    tracing::warn!(guardrail = %name, "guardrail tripwire triggered");
                    TrippedGuardrail {
                        triggering_guardrail: name,
                        result,
                    }
                })
        } else {
            let mut first_tripped = None;
            for g in guardrails {
                let result = check(g).await;
                if result.tripwire_triggered {
                    tracing::warn!(guardrail = g.name(), "guardrail tripwire triggered");
                    let tripped = TrippedGuardrail {
                        triggering_guardrail: g.name().to_string(),
                        result,
                    };
                    if self.config.stop_on_first_tripwire {
                        return Some(tripped);
                    }
                    if first_tripped.is_none() {
                        first_tripped = Some(tripped);
                    }
                }
            }
            first_tripped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct StopOnQ(Arc<AtomicBool>);

    #[async_trait]
    impl super::super::GuardrailCheck for StopOnQ {
        fn name(&self) -> &str {
            "G"
        }
        async fn check_tool(&self, data: &ToolGuardrailData) -> GuardrailResult {
            self.0.store(true, Ordering::SeqCst);
            if data.arguments.get("q").and_then(|v| v.as_str()) == Some("stop") {
                GuardrailResult::trip("stop requested")
            } else {
                GuardrailResult::pass()
            }
        }
    }

    /// **Scenario**: S3 — input guardrail tripwires when args["q"] == "stop";
    /// the tool body must not run (verified at the call site via this spy flag).
    #[tokio::test]
    async fn tool_input_guardrail_trips_on_matching_argument() {
        let spy = Arc::new(AtomicBool::new(false));
        let guardrails: Vec<Guardrail> = vec![Arc::new(StopOnQ(spy.clone()))];
        let runner = GuardrailRunner::default();
        let data = ToolGuardrailData {
            tool_name: "t".into(),
            arguments: [("q".to_string(), SendableValue::String("stop".into()))]
                .into_iter()
                .collect(),
        };
        let tripped = runner.run_tool_input(&guardrails, &data).await;
        assert!(spy.load(Ordering::SeqCst));
        let tripped = tripped.unwrap();
        assert_eq!(tripped.triggering_guardrail, "G");
        assert!(tripped.result.tripwire_triggered);
    }

    #[tokio::test]
    async fn passing_guardrail_does_not_trip() {
        let spy = Arc::new(AtomicBool::new(false));
        let guardrails: Vec<Guardrail> = vec![Arc::new(StopOnQ(spy))];
        let runner = GuardrailRunner::default();
        let data = ToolGuardrailData {
            tool_name: "t".into(),
            arguments: [("q".to_string(), SendableValue::String("go".into()))]
                .into_iter()
                .collect(),
        };
        assert!(runner.run_tool_input(&guardrails, &data).await.is_none());
    }

    /// Sequential execution with `stop_on_first_tripwire: false` must still run
    /// every guardrail and report the first one that tripped, not silently
    /// swallow the result once the loop finishes.
    #[tokio::test]
    async fn sequential_non_stopping_run_reports_first_tripwire_after_checking_all() {
        let spy_a = Arc::new(AtomicBool::new(false));
        let spy_b = Arc::new(AtomicBool::new(false));
        let guardrails: Vec<Guardrail> = vec![Arc::new(StopOnQ(spy_a.clone())), Arc::new(StopOnQ(spy_b.clone()))];
        let runner = GuardrailRunner::new(GuardrailRunnerConfiguration {
            run_in_parallel: false,
            stop_on_first_tripwire: false,
        });
        let data = ToolGuardrailData {
            tool_name: "t".into(),
            arguments: [("q".to_string(), SendableValue::String("stop".into()))]
                .into_iter()
                .collect(),
        };
        let tripped = runner.run_tool_input(&guardrails, &data).await.unwrap();
        assert!(spy_a.load(Ordering::SeqCst));
        assert!(spy_b.load(Ordering::SeqCst));
        assert_eq!(tripped.triggering_guardrail, "G");
        assert!(tripped.result.tripwire_triggered);
    }
}
