//! Pure presentation of a [`ResultSet`].
//!
//! [`present`] is a stateless transform into a [`DisplayModel`]: header text,
//! formatted timestamps and scores, and the optional fields passed through
//! only when they exist. Result order is preserved as received. No I/O, no
//! panics — a hit with a missing or garbled timestamp renders instead of
//! crashing.

use chrono::{DateTime, Local};

use crate::models::ResultSet;

/// Display-ready rendering of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayModel {
    pub header: String,
    pub rows: Vec<DisplayRow>,
}

/// One rendered hit. String fields are already formatted; empty means
/// "render nothing".
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub title: Option<String>,
    pub role: Option<String>,
    pub timestamp: String,
    pub score: String,
    pub snippet: Option<String>,
    pub conversation_id: Option<String>,
    pub message_index: i64,
}

/// Transform a normalized result set into its display model.
pub fn present(set: &ResultSet) -> DisplayModel {
    let header = if set.ok {
        format_count(set.results.len())
    } else {
        "Search error".to_string()
    };

    let rows = set
        .results
        .iter()
        .map(|hit| DisplayRow {
            title: hit.title.clone(),
            role: hit.role.clone(),
            timestamp: format_timestamp(hit.timestamp.as_deref()),
            score: format_score(&hit.score),
            snippet: hit.snippet.clone(),
            conversation_id: hit.conversation_id.clone(),
            message_index: hit.message_index,
        })
        .collect();

    DisplayModel { header, rows }
}

fn format_count(n: usize) -> String {
    if n == 1 {
        "1 result".to_string()
    } else {
        format!("{} results", n)
    }
}

/// Local date-time for a parseable RFC 3339 stamp, the raw string for a
/// present-but-garbled one, empty for none.
fn format_timestamp(ts: Option<&str>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        Err(_) => ts.to_string(),
    }
}

/// Numbers render with three decimal places; anything else the backend sent
/// passes through as-is; absent renders empty.
fn format_score(score: &serde_json::Value) -> String {
    match score {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(v) => format!("{:.3}", v),
            None => n.to_string(),
        },
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchResult;
    use serde_json::json;

    fn hit(score: serde_json::Value, ts: Option<&str>) -> SearchResult {
        SearchResult {
            conversation_id: Some("c1".to_string()),
            message_index: 0,
            timestamp: ts.map(str::to_string),
            role: Some("user".to_string()),
            score,
            title: None,
            snippet: None,
        }
    }

    fn set_with(results: Vec<SearchResult>) -> ResultSet {
        ResultSet {
            ok: true,
            results,
            error: None,
        }
    }

    #[test]
    fn test_header_pluralization() {
        assert_eq!(present(&set_with(vec![])).header, "0 results");
        assert_eq!(
            present(&set_with(vec![hit(json!(1.0), None)])).header,
            "1 result"
        );
        assert_eq!(
            present(&set_with(vec![
                hit(json!(1.0), None),
                hit(json!(0.5), None)
            ]))
            .header,
            "2 results"
        );
    }

    #[test]
    fn test_header_on_error() {
        let set = ResultSet::rejected("index missing");
        let model = present(&set);
        assert_eq!(model.header, "Search error");
        assert!(model.rows.is_empty());
    }

    #[test]
    fn test_score_formatting() {
        assert_eq!(format_score(&json!(0.84231)), "0.842");
        assert_eq!(format_score(&json!(2)), "2.000");
        assert_eq!(format_score(&serde_json::Value::Null), "");
        assert_eq!(format_score(&json!("NaN")), "NaN");
    }

    #[test]
    fn test_timestamp_absent_renders_empty() {
        assert_eq!(format_timestamp(None), "");
    }

    #[test]
    fn test_timestamp_garbage_passes_through() {
        // A hit with an unparseable stamp must render, not crash.
        assert_eq!(format_timestamp(Some("not-a-date")), "not-a-date");
    }

    #[test]
    fn test_timestamp_rfc3339_formats() {
        // Exact output depends on the local timezone; shape is what matters.
        let rendered = format_timestamp(Some("2024-05-01T12:30:00Z"));
        assert_ne!(rendered, "2024-05-01T12:30:00Z");
        assert!(rendered.contains("2024-"));
        assert!(rendered.contains(':'));
        assert!(!rendered.contains('T'));
    }

    #[test]
    fn test_row_order_preserved() {
        let set = set_with(vec![
            SearchResult {
                message_index: 7,
                ..hit(json!(0.2), None)
            },
            SearchResult {
                message_index: 3,
                ..hit(json!(0.9), None)
            },
        ]);
        let model = present(&set);
        // Lower-scored first stays first: order is the backend's, never re-sorted.
        assert_eq!(model.rows[0].message_index, 7);
        assert_eq!(model.rows[1].message_index, 3);
    }

    #[test]
    fn test_optional_fields_only_when_present() {
        let mut h = hit(json!(0.5), Some("2024-05-01T12:30:00Z"));
        h.title = Some("Rust questions".to_string());
        let set = set_with(vec![h, hit(serde_json::Value::Null, None)]);
        let model = present(&set);
        assert_eq!(model.rows[0].title.as_deref(), Some("Rust questions"));
        assert!(model.rows[1].title.is_none());
        assert!(model.rows[1].snippet.is_none());
        assert_eq!(model.rows[1].timestamp, "");
        assert_eq!(model.rows[1].score, "");
    }
}
