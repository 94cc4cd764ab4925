use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// One line of the `/api/chat` NDJSON stream.
#[derive(Debug, Deserialize)]
pub struct ChatResponseChunk {
    #[serde(default)]
    pub message: Option<ChatResponseMessage>,
    #[serde(default)]
    pub done: bool,
    /// Ollama reports mid-stream failures in-band as `{"error": "..."}`.
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponseChunk {
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.content.as_deref())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelTag {
    pub name: String,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

pub mod models;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_wire_shape() {
        let request = ChatRequest {
            model: "qwen2.5:7b".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "be brief".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "hi".to_string(),
                },
            ],
            stream: true,
            options: ChatOptions { temperature: 0.7 },
        };

        let value = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(value["model"], "qwen2.5:7b");
        assert_eq!(value["stream"], true);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        let temperature = value["options"]["temperature"].as_f64().expect("temperature");
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn chunk_without_message_has_no_content() {
        let chunk: ChatResponseChunk =
            serde_json::from_str(r#"{"model":"m","done":true,"total_duration":12}"#)
                .expect("parse done chunk");
        assert!(chunk.done);
        assert_eq!(chunk.content(), None);
    }

    #[test]
    fn chunk_exposes_in_band_error() {
        let chunk: ChatResponseChunk =
            serde_json::from_str(r#"{"error":"model 'nope' not found"}"#).expect("parse error");
        assert_eq!(chunk.error.as_deref(), Some("model 'nope' not found"));
    }
}
