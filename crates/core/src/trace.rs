//! Run trace: an ordered audit log of the decisions made while extracting.
//!
//! The trace never drives control flow. Each step is also emitted as a
//! `tracing` debug event so the same decisions show up under `RUST_LOG=debug`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub name: String,
    pub decision: String,
    pub reason: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The trace shared by every component of one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub steps: Vec<TraceStep>,
    pub signals: BTreeMap<String, Value>,
    pub duration_ms: u64,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step without attached data.
    pub fn step(&mut self, name: &str, decision: impl Into<String>, reason: impl Into<String>) {
        self.push(name, decision.into(), reason.into(), None);
    }

    /// Appends a step carrying structured data.
    pub fn step_with(&mut self, name: &str, decision: impl Into<String>, reason: impl Into<String>, data: Value) {
        self.push(name, decision.into(), reason.into(), Some(data));
    }

    fn push(&mut self, name: &str, decision: String, reason: String, data: Option<Value>) {
        tracing::debug!(step = name, decision = %decision, reason = %reason, "trace");
        self.steps.push(TraceStep {
            name: name.to_string(),
            decision,
            reason,
            timestamp: chrono::Utc::now().timestamp_millis(),
            data,
        });
    }

    pub fn signal(&mut self, key: &str, value: impl Into<Value>) {
        self.signals.insert(key.to_string(), value.into());
    }

    /// Steps recorded under `name`, in order.
    pub fn steps_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TraceStep> + 'a {
        self.steps.iter().filter(move |step| step.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_steps_preserve_order() {
        let mut trace = Trace::new();
        trace.step("Parsing", "Success", "first");
        trace.step_with("Content Root", "main", "second", json!({"selector": "main"}));

        assert_eq!(trace.steps.len(), 2);
        assert_eq!(trace.steps[0].name, "Parsing");
        assert_eq!(trace.steps[1].data, Some(json!({"selector": "main"})));
        assert_eq!(trace.steps_named("Content Root").count(), 1);
    }

    #[test]
    fn test_serializes_duration_camel_case() {
        let mut trace = Trace::new();
        trace.signal("blockCount", 3);
        trace.duration_ms = 12;

        let value = serde_json::to_value(&trace).unwrap();
        assert_eq!(value["durationMs"], 12);
        assert_eq!(value["signals"]["blockCount"], 3);
    }
}
