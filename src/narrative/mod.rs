pub mod client;
pub mod payload;
pub mod prompts;

pub use client::{NarrativeClient, NarrativeError};
pub use prompts::{chat_prompt, report_prompt, ChatRequest, ReportRequest};

use futures_util::stream::{self, BoxStream, StreamExt};
use metrics::counter;

const CHAT_FALLBACK: &str =
    "I'm having trouble connecting to my AI brain right now. Please try again later.";
const NO_BACKEND: &str = "No LLM backend is configured (set GENAI_API_KEY).";

/// What to emit when the LLM backend cannot finish a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Chat,
    Report,
}

impl Fallback {
    pub fn message(&self, error: Option<&NarrativeError>) -> String {
        match self {
            Fallback::Chat => CHAT_FALLBACK.to_string(),
            Fallback::Report => {
                let detail = error.map_or_else(|| NO_BACKEND.to_string(), |e| e.to_string());
                format!("## Error Generating Report\n\n**Technical Details:**\n{detail}")
            }
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Fallback::Chat => "chat",
            Fallback::Report => "report",
        }
    }
}

enum Narration {
    Connect(NarrativeClient, String),
    Streaming(BoxStream<'static, Result<String, NarrativeError>>),
}

fn degrade(fallback: Fallback, error: &NarrativeError) -> String {
    counter!("narrative_failures_total", "kind" => fallback.as_str()).increment(1);
    tracing::warn!(kind = fallback.as_str(), error = %error, "Narrative generation failed");
    fallback.message(Some(error))
}

/// Stream LLM text for `prompt`, degrading to the fallback message on any
/// failure. The stream never yields an error; once the fallback has been
/// emitted it ends.
pub fn narrate(
    client: Option<NarrativeClient>,
    prompt: String,
    fallback: Fallback,
) -> BoxStream<'static, String> {
    let Some(client) = client else {
        return stream::once(async move { fallback.message(None) }).boxed();
    };

    stream::unfold(Some(Narration::Connect(client, prompt)), move |state| async move {
        let mut state = state?;
        loop {
            match state {
                Narration::Connect(client, prompt) => match client.stream_text(&prompt).await {
                    Ok(chunks) => state = Narration::Streaming(chunks),
                    Err(e) => return Some((degrade(fallback, &e), None)),
                },
                Narration::Streaming(mut chunks) => {
                    return match chunks.next().await {
                        Some(Ok(text)) => Some((text, Some(Narration::Streaming(chunks)))),
                        Some(Err(e)) => Some((degrade(fallback, &e), None)),
                        None => None,
                    };
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Router;

    #[tokio::test]
    async fn test_without_client_emits_fallback_once() {
        let chunks: Vec<String> = narrate(None, "hi".into(), Fallback::Chat).collect().await;
        assert_eq!(chunks, vec![CHAT_FALLBACK.to_string()]);
    }

    #[tokio::test]
    async fn test_report_fallback_mentions_configuration() {
        let chunks: Vec<String> = narrate(None, "p".into(), Fallback::Report).collect().await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("## Error Generating Report"));
        assert!(chunks[0].contains("GENAI_API_KEY"));
    }

    fn event(text: &str) -> String {
        format!(
            "data: {{\"candidates\": [{{\"content\": {{\"parts\": [{{\"text\": \"{text}\"}}]}}}}]}}\r\n\r\n"
        )
    }

    /// Serve `app` on an ephemeral port and return a client pointed at it.
    async fn backend(app: Router) -> NarrativeClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        NarrativeClient::new(reqwest::Client::new(), "key", "stub")
            .with_base_url(format!("http://{addr}"))
    }

    #[tokio::test]
    async fn test_streams_text_deltas() {
        let body = format!("{}: keep-alive\n\n{}", event("Hel"), event("lo"));
        let app = Router::new().fallback(move || {
            let body = body.clone();
            async move { ([("content-type", "text/event-stream")], body) }
        });
        let client = backend(app).await;

        let chunks: Vec<String> = narrate(Some(client), "p".into(), Fallback::Chat).collect().await;
        assert_eq!(chunks, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn test_error_status_becomes_report_detail() {
        let app = Router::new()
            .fallback(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response() });
        let client = backend(app).await;

        let chunks: Vec<String> = narrate(Some(client), "p".into(), Fallback::Report).collect().await;
        assert_eq!(
            chunks,
            vec![
                "## Error Generating Report\n\n**Technical Details:**\n\
                 LLM backend returned 500 Internal Server Error: boom"
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_broken_stream_ends_with_fallback() {
        let app = Router::new().fallback(|| async {
            let first = event("Partial");
            let chunks = stream::once(async move { Ok::<_, std::io::Error>(first) }).chain(
                stream::once(async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err(std::io::Error::other("connection dropped"))
                }),
            );
            ([("content-type", "text/event-stream")], Body::from_stream(chunks))
        });
        let client = backend(app).await;

        let chunks: Vec<String> = narrate(Some(client), "p".into(), Fallback::Chat).collect().await;
        assert_eq!(
            chunks,
            vec!["Partial".to_string(), CHAT_FALLBACK.to_string()]
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_degrades() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = NarrativeClient::new(reqwest::Client::new(), "key", "m")
            .with_base_url("http://127.0.0.1:9");
        let chunks: Vec<String> = narrate(Some(client), "p".into(), Fallback::Chat).collect().await;
        assert_eq!(chunks, vec![CHAT_FALLBACK.to_string()]);
    }
}
