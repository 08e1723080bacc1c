//! `sleep`: waits for a requested duration and reports the elapsed time.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use tool_config::ToolsConfig;
use tool_registry::{RegistryResult, Tool, ToolDescriptor, ToolError, ToolRegistry, ToolResult};
use tracing::debug;

use crate::names::SLEEP;

/// Sleeps for `duration` seconds, bounded by a configured maximum.
#[derive(Clone, Copy, Debug)]
pub struct Sleep {
    max_secs: f64,
}

#[derive(Deserialize)]
struct SleepArgs {
    duration: f64,
}

impl Sleep {
    /// Creates the tool accepting durations up to `max_secs`.
    #[must_use]
    pub fn new(max_secs: f64) -> Self {
        Self { max_secs }
    }

    fn validate(&self, seconds: f64) -> ToolResult<Duration> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ToolError::invalid_arguments(format!(
                "duration must be a non-negative number of seconds, got {seconds}"
            )));
        }
        if seconds > self.max_secs {
            return Err(ToolError::invalid_arguments(format!(
                "duration {seconds}s exceeds the maximum of {}s",
                self.max_secs
            )));
        }
        Duration::try_from_secs_f64(seconds)
            .map_err(|err| ToolError::invalid_arguments(err.to_string()))
    }
}

#[async_trait]
impl Tool for Sleep {
    async fn invoke(&self, arguments: Value) -> ToolResult<Value> {
        let args: SleepArgs = serde_json::from_value(arguments)?;
        let wait = self.validate(args.duration)?;

        let started = Instant::now();
        sleep(wait).await;
        let actual = started.elapsed().as_secs_f64();
        debug!(requested = args.duration, actual, "sleep finished");

        Ok(json!({
            "requested_duration": args.duration,
            "actual_duration": actual,
        }))
    }
}

pub(crate) fn register(registry: &mut ToolRegistry, config: &ToolsConfig) -> RegistryResult<()> {
    let descriptor = ToolDescriptor::new(SLEEP)?
        .with_description("Sleep for the given number of seconds and report the elapsed time.")
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "duration": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": config.delay_max_secs,
                    "description": "Seconds to wait."
                }
            },
            "required": ["duration"]
        }));
    registry.register_tool(descriptor, Sleep::new(config.delay_max_secs))
}

#[cfg(test)]
mod tests {
    use tool_primitives::ErrorKind;

    use super::*;

    fn seconds(out: &Value, key: &str) -> f64 {
        out[key].as_f64().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_returns_immediately() {
        let out = Sleep::new(60.0).invoke(json!({"duration": 0})).await.unwrap();
        assert!(seconds(&out, "requested_duration").abs() < f64::EPSILON);
        assert!(seconds(&out, "actual_duration") < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_requested_duration() {
        let out = Sleep::new(60.0)
            .invoke(json!({"duration": 2}))
            .await
            .unwrap();
        assert!((seconds(&out, "requested_duration") - 2.0).abs() < f64::EPSILON);
        let actual = seconds(&out, "actual_duration");
        assert!((2.0..2.1).contains(&actual), "actual = {actual}");
    }

    #[tokio::test(start_paused = true)]
    async fn fractional_seconds_are_accepted() {
        let out = Sleep::new(60.0)
            .invoke(json!({"duration": 0.25}))
            .await
            .unwrap();
        assert!(seconds(&out, "actual_duration") >= 0.25);
    }

    #[tokio::test]
    async fn negative_and_oversized_durations_are_rejected() {
        let tool = Sleep::new(5.0);
        for duration in [json!(-1), json!(5.5)] {
            let err = tool.invoke(json!({"duration": duration})).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        }
    }

    #[tokio::test]
    async fn non_numeric_duration_is_rejected() {
        let err = Sleep::new(5.0)
            .invoke(json!({"duration": "soon"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    }
}
