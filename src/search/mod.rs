pub mod enrich;
pub mod fusion;
pub mod service;

// Re-export key types for convenience
pub use enrich::ResultEnricher;
pub use fusion::RankFusion;
pub use service::SearchService;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Named attributes carried by every page row in the index.
///
/// Decoding is lenient: a missing field, a `null`, or a value of the wrong
/// JSON type all come out as `None` instead of failing the whole row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageAttributes {
    /// Grouping id of the issue this page belongs to
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent_issue_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_page_number")]
    pub page_number: Option<i64>,
    /// OCR text of the page (the BM25-indexed field)
    #[serde(default, deserialize_with = "lenient_string")]
    pub ocr_result: Option<String>,
    /// Object key of the page image in R2
    #[serde(default, deserialize_with = "lenient_object_ref")]
    pub r2_object_id: Option<String>,
}

impl PageAttributes {
    /// Object reference to sign, if the page has one.
    pub fn object_ref(&self) -> Option<&str> {
        self.r2_object_id.as_deref()
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_object_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.filter(|s| !s.trim().is_empty()))
}

fn lenient_page_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// One entry from a single candidate provider.
///
/// Rank is implicit: the entry's 1-based position in the provider's list.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub id: String,
    /// Provider-native score; not comparable across providers
    pub score: f64,
    pub attributes: PageAttributes,
}

impl CandidateResult {
    pub fn new(id: impl Into<String>, score: f64, attributes: PageAttributes) -> Self {
        Self {
            id: id.into(),
            score,
            attributes,
        }
    }
}

/// Which candidate lists contributed to a fused result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    Hybrid,
    VectorOnly,
    LexicalOnly,
}

/// A single result after reciprocal rank fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    pub id: String,
    /// Sum of 1/(k + rank) over the lists containing this id
    pub fused_score: f64,
    /// 1-based rank in the vector list, if present there
    pub vector_rank: Option<usize>,
    /// 1-based rank in the lexical list, if present there
    pub lexical_rank: Option<usize>,
    pub attributes: PageAttributes,
}

impl FusedResult {
    pub fn match_source(&self) -> MatchSource {
        match (self.vector_rank, self.lexical_rank) {
            (Some(_), Some(_)) => MatchSource::Hybrid,
            (None, Some(_)) => MatchSource::LexicalOnly,
            _ => MatchSource::VectorOnly,
        }
    }

    pub fn in_both(&self) -> bool {
        self.vector_rank.is_some() && self.lexical_rank.is_some()
    }
}

/// Final search row as returned over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub id: String,
    #[serde(flatten)]
    pub attributes: PageAttributes,
    /// Presigned image URL; null when the page has no object or signing failed
    pub image_url: Option<String>,
    /// Fused RRF score
    pub score: f64,
}

/// One page of an issue, as returned by the page listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    pub page_number: Option<i64>,
    pub image_url: Option<String>,
    pub ocr_result: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attributes_decode_complete_row() {
        let attrs: PageAttributes = serde_json::from_value(json!({
            "parent_issue_id": "issue-1",
            "page_number": 12,
            "ocr_result": "domes and tools",
            "r2_object_id": "pages/p1.jpg"
        }))
        .unwrap();
        assert_eq!(attrs.parent_issue_id.as_deref(), Some("issue-1"));
        assert_eq!(attrs.page_number, Some(12));
        assert_eq!(attrs.object_ref(), Some("pages/p1.jpg"));
    }

    #[test]
    fn test_attributes_missing_fields_are_none() {
        let attrs: PageAttributes = serde_json::from_value(json!({})).unwrap();
        assert_eq!(attrs, PageAttributes::default());
    }

    #[test]
    fn test_attributes_wrong_types_are_none() {
        let attrs: PageAttributes = serde_json::from_value(json!({
            "parent_issue_id": 7,
            "page_number": "twelve",
            "ocr_result": ["not", "text"],
            "r2_object_id": null
        }))
        .unwrap();
        assert_eq!(attrs, PageAttributes::default());
    }

    #[test]
    fn test_page_number_accepts_numeric_strings_and_whole_floats() {
        let a: PageAttributes = serde_json::from_value(json!({"page_number": "42"})).unwrap();
        let b: PageAttributes = serde_json::from_value(json!({"page_number": 42.0})).unwrap();
        let c: PageAttributes = serde_json::from_value(json!({"page_number": 42.5})).unwrap();
        assert_eq!(a.page_number, Some(42));
        assert_eq!(b.page_number, Some(42));
        assert_eq!(c.page_number, None);
    }

    #[test]
    fn test_blank_object_ref_is_absent() {
        let attrs: PageAttributes = serde_json::from_value(json!({"r2_object_id": "  "})).unwrap();
        assert_eq!(attrs.object_ref(), None);
    }

    #[test]
    fn test_enriched_result_wire_shape() {
        let row = EnrichedResult {
            id: "p1".into(),
            attributes: PageAttributes {
                parent_issue_id: Some("issue-1".into()),
                page_number: Some(3),
                ocr_result: None,
                r2_object_id: Some("p1.jpg".into()),
            },
            image_url: None,
            score: 0.5,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "p1",
                "parent_issue_id": "issue-1",
                "page_number": 3,
                "ocr_result": null,
                "r2_object_id": "p1.jpg",
                "image_url": null,
                "score": 0.5
            })
        );
    }
}
