//! Gemini REST Backend
//!
//! Structured text and images via `models/{model}:generateContent`, video via
//! `models/{model}:predictLongRunning` plus operation polling. The API key is
//! read from the credential source on every request and sent as
//! `x-goog-api-key`; it never appears in logs or error messages.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{GenerativeBackend, ProviderConfig};
use crate::ai::credentials::{SharedCredentials, expose};
use crate::ai::schema::ResponseSchema;
use crate::ai::video::VideoOperation;
use crate::constants::network as net_constants;
use crate::types::{
    CopyError, ErrorClassifier, ImageRequest, InlineMedia, Result, ServiceError, VideoRequest,
};

/// Gemini API backend with call-time credential lookup
pub struct GeminiBackend {
    api_base: String,
    credentials: SharedCredentials,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("api_base", &self.api_base)
            .field("credentials", &"[REDACTED]")
            .finish()
    }
}

impl GeminiBackend {
    pub fn new(config: &ProviderConfig, credentials: SharedCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| CopyError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, model, method)
    }

    /// Send with the current key and decode a JSON success body
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let key = self.credentials.api_key()?;
        let response = request
            .header(net_constants::API_KEY_HEADER, expose(&key))
            .send()
            .await
            .map_err(|e| CopyError::from(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(decode_error(status.as_u16(), &headers, &body).into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| CopyError::from(e.without_url()))?;
        serde_json::from_str(&body).map_err(|e| {
            CopyError::malformed(format!(
                "unexpected response body: {} (preview: {}...)",
                e,
                body.chars().take(120).collect::<String>()
            ))
        })
    }

    async fn generate_content(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = self.model_url(model, "generateContent");
        self.send(self.client.post(&url).json(request)).await
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String> {
        let start = Instant::now();
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(prompt)])],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema.to_value()),
                image_config: None,
            }),
        };

        let response = self.generate_content(model, &request).await?;
        let text = response.text().ok_or_else(|| {
            CopyError::malformed(format!("no text in response ({})", response.describe_empty()))
        })?;

        debug!(
            model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Structured generation complete"
        );
        Ok(text)
    }

    async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
        request: &ImageRequest,
    ) -> Result<Option<InlineMedia>> {
        let mut parts = Vec::with_capacity(2);
        if let Some(reference) = &request.reference {
            parts.push(Part::inline(reference));
        }
        parts.push(Part::text(prompt));

        // Image models reject responseMimeType/responseSchema
        let body = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                image_config: Some(ImageConfig {
                    aspect_ratio: request.aspect_ratio.clone(),
                }),
            }),
        };

        let response = self.generate_content(model, &body).await?;
        match response.first_inline_data() {
            Some(data) => Ok(Some(data.decode()?)),
            None => {
                warn!(model, detail = %response.describe_empty(), "Image response carried no inline data");
                Ok(None)
            }
        }
    }

    async fn start_video(
        &self,
        model: &str,
        prompt: &str,
        request: &VideoRequest,
    ) -> Result<VideoOperation> {
        let url = self.model_url(model, "predictLongRunning");
        let body = PredictLongRunningRequest {
            instances: vec![VideoInstance {
                prompt: prompt.to_string(),
            }],
            parameters: VideoParameters {
                aspect_ratio: request.aspect_ratio.clone(),
                resolution: request.resolution.clone(),
                sample_count: request.count,
            },
        };

        let raw: OperationResponse = self.send(self.client.post(&url).json(&body)).await?;
        let operation = raw.into_operation();
        info!(operation = %operation.name, "Video generation started");
        Ok(operation)
    }

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation> {
        let url = format!("{}/{}", self.api_base, operation.name);
        let raw: OperationResponse = self.send(self.client.get(&url)).await?;
        Ok(raw.into_operation())
    }

    async fn download_video(&self, uri: &str) -> Result<InlineMedia> {
        let key = self.credentials.api_key()?;
        let mut url = url::Url::parse(uri)
            .map_err(|e| CopyError::malformed(format!("invalid video URI: {}", e)))?;
        url.query_pairs_mut().append_pair("key", expose(&key));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CopyError::from(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(decode_error(status.as_u16(), &headers, &body).into());
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .unwrap_or("video/mp4")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CopyError::from(e.without_url()))?;
        info!(bytes = bytes.len(), "Video downloaded");
        Ok(InlineMedia::new(mime_type, bytes.to_vec()))
    }
}

// =============================================================================
// Error Decoding
// =============================================================================

/// Decode an error response into a classified `ServiceError`
///
/// A recognized `ErrorInfo.reason` takes precedence over the coarse RPC
/// status, since invalid keys arrive as `INVALID_ARGUMENT`. The retry hint
/// comes from `RetryInfo.retryDelay` in the body, or the `Retry-After`
/// header when the body has none.
fn decode_error(status: u16, headers: &HeaderMap, body: &str) -> ServiceError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();

    let (code, message, hint) = match parsed {
        Some(ApiErrorBody { error }) => {
            let hint = error.details.iter().find_map(retry_info_delay);
            let reason = error
                .details
                .iter()
                .find_map(error_info_reason)
                .filter(|reason| ErrorClassifier::classify_code(reason).is_some());
            (reason.or(error.status), error.message, hint)
        }
        None => (
            None,
            body.chars().take(200).collect::<String>(),
            None,
        ),
    };

    let hint = hint.or_else(|| {
        headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    });

    let err = ServiceError::from_signals(Some(status), code, message);
    match hint {
        Some(delay) => err.retry_after(delay),
        None => err,
    }
}

fn retry_info_delay(detail: &Value) -> Option<Duration> {
    let kind = detail.get("@type")?.as_str()?;
    if !kind.ends_with("RetryInfo") {
        return None;
    }
    parse_duration(detail.get("retryDelay")?.as_str()?)
}

fn error_info_reason(detail: &Value) -> Option<String> {
    let kind = detail.get("@type")?.as_str()?;
    if !kind.ends_with("ErrorInfo") {
        return None;
    }
    detail.get("reason")?.as_str().map(str::to_string)
}

/// Parse a protobuf JSON duration such as `"30s"` or `"1.5s"`
fn parse_duration(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().strip_suffix('s')?.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

/// Map a numeric RPC status (as found in operation errors) to its name
fn rpc_code_name(code: i64) -> Option<&'static str> {
    match code {
        4 => Some("DEADLINE_EXCEEDED"),
        5 => Some("NOT_FOUND"),
        7 => Some("PERMISSION_DENIED"),
        8 => Some("RESOURCE_EXHAUSTED"),
        10 => Some("ABORTED"),
        13 => Some("INTERNAL"),
        14 => Some("UNAVAILABLE"),
        16 => Some("UNAUTHENTICATED"),
        _ => None,
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline(media: &InlineMedia) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: media.mime_type.clone(),
                data: media.to_base64(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    /// Base64-encoded payload
    data: String,
}

impl InlineData {
    fn decode(&self) -> Result<InlineMedia> {
        let bytes = BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| CopyError::malformed(format!("invalid inline data: {}", e)))?;
        Ok(InlineMedia::new(self.mime_type.clone(), bytes))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    /// Concatenated text parts of the first candidate
    fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// First part carrying inline data, scanning every part
    fn first_inline_data(&self) -> Option<&InlineData> {
        self.parts().find_map(|p| p.inline_data.as_ref())
    }

    fn describe_empty(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return format!("prompt blocked: {}", reason);
        }
        match self.candidates.first() {
            None => "no candidates".to_string(),
            Some(candidate) => format!(
                "finish reason: {}",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictLongRunningRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    aspect_ratio: String,
    resolution: String,
    sample_count: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    response: Option<Value>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

impl OperationResponse {
    fn into_operation(self) -> VideoOperation {
        if let Some(error) = self.error {
            let code = error.code.and_then(rpc_code_name).map(str::to_string);
            return VideoOperation::failed(
                self.name,
                ServiceError::from_signals(None, code, error.message),
            );
        }

        let uri = self.response.as_ref().and_then(|response| {
            response
                .pointer("/generateVideoResponse/generatedSamples/0/video/uri")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        VideoOperation {
            name: self.name,
            done: self.done,
            uri,
            error: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::schema::Field;
    use crate::types::ErrorCategory;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_decode_quota_error_with_retry_info() {
        let body = json!({
            "error": {
                "code": 429,
                "message": "You exceeded your current quota",
                "status": "RESOURCE_EXHAUSTED",
                "details": [
                    {"@type": "type.googleapis.com/google.rpc.QuotaFailure"},
                    {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "31s"}
                ]
            }
        })
        .to_string();

        let err = decode_error(429, &HeaderMap::new(), &body);
        assert_eq!(err.category, ErrorCategory::QuotaExceeded);
        assert_eq!(err.code.as_deref(), Some("RESOURCE_EXHAUSTED"));
        assert_eq!(err.retry_after, Some(Duration::from_secs(31)));
    }

    #[test]
    fn test_decode_invalid_key() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]
            }
        })
        .to_string();

        let err = decode_error(400, &HeaderMap::new(), &body);
        assert_eq!(err.category, ErrorCategory::NotFound);
        assert_eq!(err.code.as_deref(), Some("API_KEY_INVALID"));
    }

    #[test]
    fn test_decode_invalid_key_reason_survives_rewording() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "The provided credential is invalid.",
                "status": "INVALID_ARGUMENT",
                "details": [
                    {"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}
                ]
            }
        })
        .to_string();

        let err = decode_error(400, &HeaderMap::new(), &body);
        assert_eq!(err.category, ErrorCategory::NotFound);
    }

    #[test]
    fn test_decode_error_info_billing_reason() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "Request rejected.",
                "status": "FAILED_PRECONDITION",
                "details": [
                    {"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "BILLING_DISABLED"}
                ]
            }
        })
        .to_string();

        let err = decode_error(400, &HeaderMap::new(), &body);
        assert_eq!(err.category, ErrorCategory::PermissionDenied);
    }

    #[test]
    fn test_decode_unrecognized_reason_keeps_status() {
        let body = json!({
            "error": {
                "code": 429,
                "message": "Slow down.",
                "status": "RESOURCE_EXHAUSTED",
                "details": [
                    {"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "SOMETHING_NEW"}
                ]
            }
        })
        .to_string();

        let err = decode_error(429, &HeaderMap::new(), &body);
        assert_eq!(err.category, ErrorCategory::QuotaExceeded);
        assert_eq!(err.code.as_deref(), Some("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn test_decode_non_json_body_uses_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));

        let err = decode_error(503, &headers, "<html>Service Unavailable</html>");
        assert_eq!(err.category, ErrorCategory::Transient);
        assert_eq!(err.retry_after, Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("30"), None);
        assert_eq!(parse_duration("-1s"), None);
    }

    #[test]
    fn test_structured_request_shape() {
        let schema = ResponseSchema::object(vec![Field::string("headline", "Titular")]);
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text("hola")])],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(schema.to_value()),
                image_config: None,
            }),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hola");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(value["generationConfig"].get("imageConfig").is_none());
    }

    #[test]
    fn test_image_request_puts_reference_first() {
        let reference = InlineMedia::new("image/png", vec![1, 2, 3]);
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::inline(&reference), Part::text("logo")])],
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                image_config: Some(ImageConfig {
                    aspect_ratio: "1:1".into(),
                }),
            }),
        };

        let value = serde_json::to_value(&request).unwrap();
        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "AQID");
        assert_eq!(parts[1]["text"], "logo");
        assert_eq!(value["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
        assert!(value["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_inline_data_found_in_any_part() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Aquí tienes tu imagen"},
                    {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let media = response.first_inline_data().unwrap().decode().unwrap();
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.data, vec![1, 2, 3]);
        assert_eq!(response.text().as_deref(), Some("Aquí tienes tu imagen"));
    }

    #[test]
    fn test_blocked_prompt_description() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();

        assert!(response.text().is_none());
        assert!(response.first_inline_data().is_none());
        assert_eq!(response.describe_empty(), "prompt blocked: SAFETY");
    }

    #[test]
    fn test_operation_parsing() {
        let pending: OperationResponse =
            serde_json::from_value(json!({"name": "models/veo/operations/abc"})).unwrap();
        let op = pending.into_operation();
        assert!(!op.done);
        assert!(op.uri.is_none());

        let done: OperationResponse = serde_json::from_value(json!({
            "name": "models/veo/operations/abc",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"uri": "https://files.example/v1/video.mp4?alt=media"}}
            ]}}
        }))
        .unwrap();
        let op = done.into_operation();
        assert!(op.done);
        assert_eq!(op.uri.as_deref(), Some("https://files.example/v1/video.mp4?alt=media"));

        let failed: OperationResponse = serde_json::from_value(json!({
            "name": "models/veo/operations/abc",
            "done": true,
            "error": {"code": 8, "message": "Quota exceeded"}
        }))
        .unwrap();
        let op = failed.into_operation();
        assert_eq!(op.error.unwrap().category, ErrorCategory::QuotaExceeded);
    }

    #[test]
    fn test_video_parameters_shape() {
        let body = PredictLongRunningRequest {
            instances: vec![VideoInstance {
                prompt: "anuncio".into(),
            }],
            parameters: VideoParameters {
                aspect_ratio: "16:9".into(),
                resolution: "720p".into(),
                sample_count: 1,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["instances"][0]["prompt"], "anuncio");
        assert_eq!(value["parameters"]["aspectRatio"], "16:9");
        assert_eq!(value["parameters"]["sampleCount"], 1);
    }
}
