//! Citation types.
//!
//! A citations frame carries the full list of evidence used for the answer.
//! Each new list replaces the previous one.

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{DecodeError, DecodeResult};

/// One piece of retrieved evidence backing the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Identifier of the retrieved chunk.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Title of the source document.
    pub title: String,
    /// Excerpt of the source used as evidence.
    pub snippet: String,
    /// Retrieval score, if the upstream ranked the evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Citation {
    /// Create a citation without a score.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            snippet: snippet.into(),
            score: None,
        }
    }

    /// Set the retrieval score.
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Parse a citations payload (a JSON array).
    pub fn parse_list(payload: &str) -> DecodeResult<Vec<Citation>> {
        serde_json::from_str(payload).map_err(DecodeError::Citations)
    }

    /// Serialize a citation list to its payload form.
    pub fn to_payload(citations: &[Citation]) -> String {
        // Strings and floats always serialize.
        serde_json::to_string(citations).unwrap_or_else(|_| "[]".to_string())
    }
}

// Chunk ids are strings upstream, but numeric ids are accepted as-is.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}
