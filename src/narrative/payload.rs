use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Text carried by one `streamGenerateContent` event payload, if any.
///
/// Parts of the first candidate are concatenated. Keep-alives, `[DONE]`,
/// finish-only chunks and malformed JSON yield nothing.
pub fn text_delta(data: &str) -> Option<String> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed stream payload");
            return None;
        }
    };

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_part() {
        let data = r#"{"candidates": [{"content": {"parts": [{"text": "Hello"}], "role": "model"}}]}"#;
        assert_eq!(text_delta(data), Some("Hello".into()));
    }

    #[test]
    fn test_multiple_parts_concatenate() {
        let data = r#"{"candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]}"#;
        assert_eq!(text_delta(data), Some("ab".into()));
    }

    #[test]
    fn test_chunk_without_text_is_skipped() {
        let data = r#"{"candidates": [{"finishReason": "STOP"}], "usageMetadata": {}}"#;
        assert_eq!(text_delta(data), None);
    }

    #[test]
    fn test_done_and_malformed_are_skipped() {
        assert_eq!(text_delta("[DONE]"), None);
        assert_eq!(text_delta("{not json"), None);
        assert_eq!(text_delta(""), None);
    }
}
