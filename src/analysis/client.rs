//! HTTP client for the remote vision-analysis service.
//!
//! Four stateless operations against the service's REST API. Every request
//! carries the configured bearer credential and the per-request timeout; HTTP
//! non-success and transport failures both surface as errors.

use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::api::{AnalysisApi, JobHandle};
use crate::config::AnalysisConfig;
use crate::error::{Result, VisionError};

/// Concrete [`AnalysisApi`] over HTTP.
pub struct AnalysisClient {
    http: reqwest::Client,
    config: AnalysisConfig,
}

impl AnalysisClient {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VisionError::transport("client construction", e))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }
}

// Wire shapes of the analysis service.

#[derive(Deserialize)]
struct UploadResponse {
    code: i64,
    data: Option<UploadData>,
}

#[derive(Deserialize)]
struct UploadData {
    id: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    bot_id: &'a str,
    user_id: &'a str,
    stream: bool,
    auto_save_history: bool,
    additional_messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    /// Stringified content-part array, per the service's object_string encoding.
    content: String,
    content_type: &'static str,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    Image { file_id: &'a str },
}

#[derive(Deserialize)]
struct ChatResponse {
    data: Option<ChatData>,
}

#[derive(Deserialize)]
struct ChatData {
    conversation_id: String,
    id: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    data: Option<StatusData>,
}

#[derive(Deserialize)]
struct StatusData {
    status: String,
}

#[derive(Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    data: Vec<MessageItem>,
}

#[derive(Deserialize)]
struct MessageItem {
    content: String,
}

async fn check_status(context: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        return Err(VisionError::status(context, status));
    }
    Ok(resp)
}

#[async_trait]
impl AnalysisApi for AnalysisClient {
    async fn upload_image(&self, bytes: &[u8]) -> Result<String> {
        let part = multipart::Part::bytes(bytes.to_vec())
            .file_name("snapshot.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| VisionError::transport("file upload", e))?;
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.url("/v1/files/upload"))
            .bearer_auth(&self.config.api_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VisionError::transport("file upload", e))?;
        let resp = check_status("file upload", resp).await?;

        let body: UploadResponse = resp
            .json()
            .await
            .map_err(|e| VisionError::decode("file upload", e.to_string()))?;

        if body.code != 0 {
            return Err(VisionError::api("file upload", format!("service code {}", body.code)));
        }
        match body.data {
            Some(UploadData { id }) if !id.is_empty() => {
                debug!(file_id = %id, "snapshot uploaded");
                Ok(id)
            }
            _ => Err(VisionError::api("file upload", "no file id in response")),
        }
    }

    async fn start_job(&self, file_id: &str, prompt: &str) -> Result<JobHandle> {
        let parts =
            vec![ContentPart::Text { text: prompt }, ContentPart::Image { file_id }];
        let content = serde_json::to_string(&parts)
            .map_err(|e| VisionError::decode("job request", e.to_string()))?;

        let request = ChatRequest {
            bot_id: &self.config.bot_id,
            user_id: &self.config.user_id,
            stream: false,
            auto_save_history: true,
            additional_messages: vec![ChatMessage {
                role: "user",
                content,
                content_type: "object_string",
            }],
        };

        let resp = self
            .http
            .post(self.url("/v3/chat"))
            .bearer_auth(&self.config.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| VisionError::transport("job start", e))?;
        let resp = check_status("job start", resp).await?;

        let body: ChatResponse =
            resp.json().await.map_err(|e| VisionError::decode("job start", e.to_string()))?;

        match body.data {
            Some(ChatData { conversation_id, id }) if !id.is_empty() => {
                debug!(chat_id = %id, "analysis job started");
                Ok(JobHandle { conversation_id, chat_id: id })
            }
            _ => Err(VisionError::api("job start", "no job id in response")),
        }
    }

    async fn poll_status(&self, job: &JobHandle) -> Result<String> {
        let resp = self
            .http
            .get(self.url("/v3/chat/retrieve"))
            .query(&[("conversation_id", &job.conversation_id), ("chat_id", &job.chat_id)])
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| VisionError::transport("status poll", e))?;
        let resp = check_status("status poll", resp).await?;

        let body: StatusResponse =
            resp.json().await.map_err(|e| VisionError::decode("status poll", e.to_string()))?;

        body.data
            .map(|d| d.status)
            .ok_or_else(|| VisionError::api("status poll", "no status in response"))
    }

    async fn fetch_result(&self, job: &JobHandle) -> Result<String> {
        let resp = self
            .http
            .get(self.url("/v3/chat/message/list"))
            .query(&[("conversation_id", &job.conversation_id), ("chat_id", &job.chat_id)])
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| VisionError::transport("result fetch", e))?;
        let resp = check_status("result fetch", resp).await?;

        let body: MessageListResponse =
            resp.json().await.map_err(|e| VisionError::decode("result fetch", e.to_string()))?;

        body.data
            .into_iter()
            .next()
            .map(|m| m.content)
            .ok_or_else(|| VisionError::api("result fetch", "empty message list"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_parts_use_the_object_string_shapes() {
        let parts = vec![
            ContentPart::Text { text: "identify this" },
            ContentPart::Image { file_id: "f1" },
        ];
        let encoded = serde_json::to_string(&parts).expect("serializable");
        assert_eq!(
            encoded,
            r#"[{"type":"text","text":"identify this"},{"type":"image","file_id":"f1"}]"#
        );
    }

    #[test]
    fn chat_request_embeds_content_as_a_string_field() {
        let request = ChatRequest {
            bot_id: "b",
            user_id: "u",
            stream: false,
            auto_save_history: true,
            additional_messages: vec![ChatMessage {
                role: "user",
                content: r#"[{"type":"text","text":"hi"}]"#.to_string(),
                content_type: "object_string",
            }],
        };
        let value = serde_json::to_value(&request).expect("serializable");
        let content = &value["additional_messages"][0]["content"];
        assert!(content.is_string(), "content must be a stringified array, got {content}");
        assert_eq!(value["additional_messages"][0]["content_type"], "object_string");
    }

    #[test]
    fn base_url_trailing_slash_is_tolerated() {
        let client = AnalysisClient::new(AnalysisConfig {
            base_url: "http://localhost:1234/".to_string(),
            ..AnalysisConfig::default()
        })
        .expect("client builds");
        assert_eq!(client.url("/v3/chat"), "http://localhost:1234/v3/chat");
    }
}
