//! Timing and cost metrics.
//!
//! The metrics record is mostly opaque: a handful of well-known fields get
//! typed accessors and everything else is kept verbatim in
//! [`Metrics::extra`], so a record survives a decode/encode round trip.
//!
//! Only the structural shape is checked. A well-known field holding an
//! unexpected type reads as absent instead of failing the whole record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::errors::{DecodeError, DecodeResult};

/// Metrics snapshot for one answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// End-to-end latency in milliseconds.
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub latency_ms: Option<f64>,
    /// 95th percentile latency in milliseconds.
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub p95_ms: Option<f64>,
    /// Tokens consumed.
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub tokens: Option<f64>,
    /// Total elapsed time reported by the pipeline.
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_elapsed_ms: Option<f64>,
    /// Number of pipeline steps executed.
    #[serde(
        default,
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub node_count: Option<u64>,
    /// Number of documents retrieved.
    #[serde(
        default,
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub retrieved_docs: Option<u64>,
    /// Whether the answer was served from cache.
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub cache_hit: Option<bool>,
    /// Estimated token count.
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub est_tokens: Option<f64>,
    /// Per-step execution history.
    #[serde(
        default,
        deserialize_with = "lenient::nodes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub node_history: Vec<NodeRecord>,
    /// Any other field, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Metrics {
    /// Create an empty metrics record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a metrics payload. The payload must be a JSON object.
    pub fn parse(payload: &str) -> DecodeResult<Metrics> {
        let value: JsonValue = serde_json::from_str(payload).map_err(DecodeError::Metrics)?;
        if !value.is_object() {
            return Err(DecodeError::Metrics(serde::de::Error::custom(
                "metrics payload must be a JSON object",
            )));
        }
        serde_json::from_value(value).map_err(DecodeError::Metrics)
    }

    /// Serialize to payload form.
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Set the latency.
    #[must_use]
    pub fn latency_ms(mut self, ms: f64) -> Self {
        self.latency_ms = Some(ms);
        self
    }

    /// Set the token count.
    #[must_use]
    pub fn tokens(mut self, tokens: f64) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Append a node to the history.
    #[must_use]
    pub fn node(mut self, node: NodeRecord) -> Self {
        self.node_history.push(node);
        self
    }

    /// Set an arbitrary extra field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Total elapsed time, summed from the node history when not reported.
    pub fn total_elapsed(&self) -> Option<f64> {
        if self.total_elapsed_ms.is_some() {
            return self.total_elapsed_ms;
        }
        if self.node_history.is_empty() {
            return None;
        }
        Some(
            self.node_history
                .iter()
                .filter_map(|n| n.elapsed_ms)
                .sum(),
        )
    }

    /// Nodes that did not report success.
    pub fn failed_nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.node_history.iter().filter(|n| !n.is_success())
    }
}

/// One executed step of the upstream pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Step name.
    #[serde(default, deserialize_with = "lenient::label")]
    pub node: String,
    /// Step status, `"success"` or `"error"` upstream. Empty when missing.
    #[serde(default, deserialize_with = "lenient::label")]
    pub status: String,
    /// Time spent in the step.
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub elapsed_ms: Option<f64>,
    /// Error message for failed steps.
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
    /// Step-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl NodeRecord {
    /// A successful step.
    pub fn success(node: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            node: node.into(),
            status: "success".to_string(),
            elapsed_ms: Some(elapsed_ms),
            error: None,
            extra: Map::new(),
        }
    }

    /// A failed step.
    pub fn failure(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            status: "error".to_string(),
            elapsed_ms: None,
            error: Some(error.into()),
            extra: Map::new(),
        }
    }

    /// Whether the step succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value as JsonValue;

    use super::NodeRecord;

    pub(super) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match JsonValue::deserialize(deserializer)? {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub(super) fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match JsonValue::deserialize(deserializer)? {
            JsonValue::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub(super) fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match JsonValue::deserialize(deserializer)? {
            JsonValue::Bool(b) => Some(b),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub(super) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match JsonValue::deserialize(deserializer)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    pub(super) fn label<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(text(deserializer)?.unwrap_or_default())
    }

    // Entries that are not objects are skipped.
    pub(super) fn nodes<'de, D>(deserializer: D) -> Result<Vec<NodeRecord>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match JsonValue::deserialize(deserializer)? {
            JsonValue::Array(items) => items
                .into_iter()
                .filter(JsonValue::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_pipeline_metrics() {
        let payload = r#"{
            "total_elapsed_ms": 812.4,
            "node_count": 2,
            "retrieved_docs": 4,
            "cache_hit": false,
            "est_tokens": 53.3,
            "node_history": [
                {"node": "retrieve", "status": "success", "elapsed_ms": 120.0, "doc_count": 4},
                {"node": "generate", "status": "error", "error": "timeout"}
            ]
        }"#;

        let metrics = Metrics::parse(payload).unwrap();
        assert_eq!(metrics.total_elapsed_ms, Some(812.4));
        assert_eq!(metrics.node_count, Some(2));
        assert_eq!(metrics.cache_hit, Some(false));
        assert_eq!(metrics.node_history.len(), 2);
        assert_eq!(metrics.node_history[0].extra["doc_count"], 4);

        let failed: Vec<_> = metrics.failed_nodes().map(|n| n.node.as_str()).collect();
        assert_eq!(failed, vec!["generate"]);
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let metrics = Metrics::parse(r#"{"latency_ms": 10, "model": "small"}"#).unwrap();
        assert_eq!(metrics.latency_ms, Some(10.0));
        assert_eq!(metrics.extra["model"], "small");
    }

    #[rstest]
    #[case("[1, 2]")]
    #[case("42")]
    #[case("\"text\"")]
    #[case("{not json")]
    fn test_parse_rejects_non_object(#[case] payload: &str) {
        let err = Metrics::parse(payload).unwrap_err();
        assert_eq!(err.kind(), "metrics");
    }

    #[rstest]
    #[case(r#"{"latency_ms": 5, "node_history": null}"#)]
    #[case(r#"{"tokens": "12"}"#)]
    #[case(r#"{"node_count": 2.0}"#)]
    #[case(r#"{"node_history": [{"node": "x"}]}"#)]
    #[case(r#"{"cache_hit": "yes", "p95_ms": [1], "retrieved_docs": -3}"#)]
    #[case(r#"{"node_history": [1, "two", {"node": 3, "status": null, "elapsed_ms": "7"}]}"#)]
    fn test_parse_tolerates_field_types(#[case] payload: &str) {
        assert!(Metrics::parse(payload).is_ok(), "rejected {payload}");
    }

    #[test]
    fn test_mismatched_fields_read_leniently() {
        let metrics = Metrics::parse(
            r#"{"latency_ms": 5, "tokens": "12", "node_count": 2.0, "cache_hit": "yes",
                "node_history": [{"node": "x"}, 7, {"node": "y", "status": "success", "elapsed_ms": "4.5"}]}"#,
        )
        .unwrap();

        assert_eq!(metrics.latency_ms, Some(5.0));
        assert_eq!(metrics.tokens, Some(12.0));
        assert_eq!(metrics.node_count, Some(2));
        assert_eq!(metrics.cache_hit, None);
        assert_eq!(metrics.node_history.len(), 2);
        assert_eq!(metrics.node_history[0].node, "x");
        assert!(!metrics.node_history[0].is_success());
        assert_eq!(metrics.node_history[1].elapsed_ms, Some(4.5));

        let null_history = Metrics::parse(r#"{"node_history": null}"#).unwrap();
        assert!(null_history.node_history.is_empty());
    }

    #[test]
    fn test_total_elapsed_fallback() {
        let metrics = Metrics::new()
            .node(NodeRecord::success("retrieve", 100.0))
            .node(NodeRecord::success("generate", 250.0))
            .node(NodeRecord::failure("rerank", "boom"));
        assert_eq!(metrics.total_elapsed(), Some(350.0));

        let reported = Metrics {
            total_elapsed_ms: Some(400.0),
            ..metrics
        };
        assert_eq!(reported.total_elapsed(), Some(400.0));
        assert_eq!(Metrics::new().total_elapsed(), None);
    }

    #[test]
    fn test_payload_round_trip() {
        let original = Metrics::new()
            .latency_ms(120.5)
            .tokens(42.0)
            .node(NodeRecord::success("classify_intent", 1.5))
            .field("node_count", 1u64)
            .field("model", "small");

        let parsed = Metrics::parse(&original.to_payload()).unwrap();
        // node_count lands in its typed slot after the round trip.
        assert_eq!(parsed.node_count, Some(1));
        assert_eq!(parsed.latency_ms, original.latency_ms);
        assert_eq!(parsed.node_history, original.node_history);
        assert_eq!(parsed.extra["model"], "small");
    }

    #[test]
    fn test_typed_round_trip_is_exact() {
        let original = Metrics::new()
            .latency_ms(3.25)
            .node(NodeRecord::failure("generate", "timeout"))
            .field("trace_id", "abc");
        assert_eq!(Metrics::parse(&original.to_payload()).unwrap(), original);
    }
}
