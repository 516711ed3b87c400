//! Vision-language client abstraction and the Gemini `generateContent`
//! implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::DiagnosisError;

/// Public Gemini REST endpoint root.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Vision-language model abstraction (allows mocking).
pub trait VisionClient: Send + Sync {
    /// Submit a prompt plus one base64-encoded image and return the
    /// model's free-text answer.
    fn describe_image(
        &self,
        prompt: &str,
        mime_type: &str,
        base64_image: &str,
    ) -> Result<String, DiagnosisError>;
}

/// HTTP client for the Gemini `generateContent` API.
///
/// `describe_image` must run on a thread where blocking is allowed; the
/// underlying blocking client is built per call for that reason.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(DEFAULT_GEMINI_ENDPOINT, api_key, model)
    }

    /// Base URL override; tests point this at a local stub server.
    pub fn with_base_url(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

// Request/response bodies for generateContent. The API accepts
// snake_case field names (protobuf JSON mapping), which keeps the
// serde derives plain.

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl VisionClient for GeminiClient {
    fn describe_image(
        &self,
        prompt: &str,
        mime_type: &str,
        base64_image: &str,
    ) -> Result<String, DiagnosisError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(prompt),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type,
                            data: base64_image,
                        }),
                    },
                ],
            }],
        };

        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| DiagnosisError::Http(e.to_string()))?;

        let response = client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                DiagnosisError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                DiagnosisError::Timeout
            } else {
                DiagnosisError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DiagnosisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| DiagnosisError::ResponseParsing(e.to_string()))?;

        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(DiagnosisError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Mock vision client for testing. Returns a configurable response and
/// records what it was asked.
pub struct MockVisionClient {
    response: String,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, String, String)>>,
}

impl MockVisionClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (prompt, mime_type, base64_image) of the most recent call.
    pub fn last_request(&self) -> Option<(String, String, String)> {
        self.last_request.lock().ok().and_then(|g| g.clone())
    }
}

impl VisionClient for MockVisionClient {
    fn describe_image(
        &self,
        prompt: &str,
        mime_type: &str,
        base64_image: &str,
    ) -> Result<String, DiagnosisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some((
                prompt.to_string(),
                mime_type.to_string(),
                base64_image.to_string(),
            ));
        }
        Ok(self.response.clone())
    }
}
