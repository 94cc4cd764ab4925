//! Ollama chat client.
//!
//! A chat request runs on its own task and reports back through a
//! [`ReplyStream`]: zero or more [`StreamMessage::Chunk`]s followed by exactly
//! one [`StreamMessage::End`] carrying either the full reply or a
//! [`BackendError`].

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use memchr::memchr;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::models::{fetch_models, sort_models};
use crate::api::{ChatOptions, ChatRequest, ChatResponseChunk, ModelTag};
use crate::core::message::Message;
use crate::utils::url::construct_api_url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5:7b";
pub const TEMPERATURE: f32 = 0.7;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);
/// Longest NDJSON line accepted before the stream is treated as malformed.
pub const MAX_LINE_BYTES: usize = 1 << 20;

const NOT_RUNNING_MESSAGE: &str = "❌ Ollama not running\nPlease start Ollama first:\n  macOS/Linux: ollama serve\n  Windows: Launch Ollama app";
const TIMEOUT_MESSAGE: &str = "❌ Request timeout\nModel may be loading. Try again in 30 seconds.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Nothing is listening at the configured address.
    Unavailable,
    /// The request did not complete within the request timeout.
    Timeout,
    /// Bad status, broken body, malformed stream, or an in-band error.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    kind: BackendErrorKind,
    detail: String,
}

impl BackendError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Unavailable,
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Timeout,
            detail: detail.into(),
        }
    }

    pub fn other(detail: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Other,
            detail: detail.into(),
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        // A connect timeout is both; treat it as "not running".
        if err.is_connect() {
            Self::unavailable(err.to_string())
        } else if err.is_timeout() {
            Self::timeout(err.to_string())
        } else {
            Self::other(err.to_string())
        }
    }

    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    /// Raw failure description, for logs.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Text shown to the user in place of a reply.
    pub fn user_message(&self) -> String {
        match self.kind {
            BackendErrorKind::Unavailable => NOT_RUNNING_MESSAGE.to_string(),
            BackendErrorKind::Timeout => TIMEOUT_MESSAGE.to_string(),
            BackendErrorKind::Other => format!("❌ AI error: {}", self.detail),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for BackendError {}

pub type ChatOutcome = Result<String, BackendError>;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Chunk(String),
    End(ChatOutcome),
}

/// Producing half of a [`ReplyStream`].
pub struct ReplySender {
    tx: mpsc::UnboundedSender<StreamMessage>,
}

impl ReplySender {
    /// Returns false once the consumer has gone away.
    pub fn chunk(&self, text: impl Into<String>) -> bool {
        self.tx.send(StreamMessage::Chunk(text.into())).is_ok()
    }

    pub fn finish(self, outcome: ChatOutcome) {
        let _ = self.tx.send(StreamMessage::End(outcome));
    }
}

/// Finite, single-use sequence of reply events.
///
/// Always ends with exactly one [`StreamMessage::End`]; if the producer
/// disappears without finishing, a synthetic failure is yielded instead.
pub struct ReplyStream {
    rx: mpsc::UnboundedReceiver<StreamMessage>,
    finished: bool,
}

impl ReplyStream {
    pub fn channel() -> (ReplySender, ReplyStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ReplySender { tx },
            ReplyStream {
                rx,
                finished: false,
            },
        )
    }

    /// Pre-filled stream, used by backend doubles.
    pub fn scripted<I, S>(chunks: I, outcome: ChatOutcome) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (sender, stream) = Self::channel();
        for chunk in chunks {
            sender.chunk(chunk);
        }
        sender.finish(outcome);
        stream
    }

    /// A stream that fails before producing anything.
    pub fn failed(error: BackendError) -> Self {
        Self::scripted(Vec::<String>::new(), Err(error))
    }
}

impl Stream for ReplyStream {
    type Item = StreamMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(StreamMessage::End(outcome))) => {
                this.finished = true;
                Poll::Ready(Some(StreamMessage::End(outcome)))
            }
            Poll::Ready(Some(chunk)) => Poll::Ready(Some(chunk)),
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(Some(StreamMessage::End(Err(BackendError::other(
                    "reply stream closed before completion",
                )))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Anything that can answer a chat turn.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Cheap liveness probe. Never fails; any problem reads as offline.
    async fn check_availability(&self) -> bool;

    /// Start a streamed reply to `messages` with `system_prompt` prepended.
    fn stream_chat(&self, messages: &[Message], system_prompt: &str) -> ReplyStream;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn check_availability(&self) -> bool {
        (**self).check_availability().await
    }

    fn stream_chat(&self, messages: &[Message], system_prompt: &str) -> ReplyStream {
        (**self).stream_chat(messages, system_prompt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            request_timeout: REQUEST_TIMEOUT,
            health_timeout: HEALTH_TIMEOUT,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL)
    }
}

pub struct OllamaClient {
    client: reqwest::Client,
    config: BackendConfig,
}

impl OllamaClient {
    pub fn new(config: BackendConfig) -> Result<Self, reqwest::Error> {
        // Per-read limits: a reply that keeps streaming never expires.
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .read_timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn build_request(&self, messages: &[Message], system_prompt: &str) -> ChatRequest {
        let mut api_messages = Vec::with_capacity(messages.len() + 1);
        api_messages.push(Message::system(system_prompt).to_api());
        api_messages.extend(messages.iter().map(Message::to_api));

        ChatRequest {
            model: self.config.model.clone(),
            messages: api_messages,
            stream: true,
            options: ChatOptions {
                temperature: TEMPERATURE,
            },
        }
    }

    pub async fn list_models(
        &self,
    ) -> Result<Vec<ModelTag>, Box<dyn std::error::Error + Send + Sync>> {
        let mut models = fetch_models(&self.client, &self.config.base_url).await?.models;
        sort_models(&mut models);
        Ok(models)
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn check_availability(&self) -> bool {
        let tags_url = construct_api_url(&self.config.base_url, "api/tags");
        match self
            .client
            .get(&tags_url)
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!(status = %response.status(), url = %tags_url, "Availability probe answered");
                response.status() == StatusCode::OK
            }
            Err(err) => {
                debug!(error = %err, url = %tags_url, "Availability probe failed");
                false
            }
        }
    }

    fn stream_chat(&self, messages: &[Message], system_prompt: &str) -> ReplyStream {
        let request = self.build_request(messages, system_prompt);
        let chat_url = construct_api_url(&self.config.base_url, "api/chat");
        let client = self.client.clone();
        let (sender, stream) = ReplyStream::channel();

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            url = %chat_url,
            "Starting chat stream"
        );

        tokio::spawn(async move {
            let outcome = run_chat_stream(&client, &chat_url, &request, &sender).await;
            match &outcome {
                Ok(reply) => debug!(chars = reply.chars().count(), "Chat stream finished"),
                Err(err) => warn!(kind = ?err.kind(), detail = %err.detail(), "Chat stream failed"),
            }
            sender.finish(outcome);
        });

        stream
    }
}

async fn run_chat_stream(
    client: &reqwest::Client,
    chat_url: &str,
    request: &ChatRequest,
    sender: &ReplySender,
) -> ChatOutcome {
    let response = client
        .post(chat_url)
        .json(request)
        .send()
        .await
        .map_err(|err| BackendError::from_reqwest(&err))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::other(describe_status(status, chat_url, &body)));
    }

    let mut decoder = NdjsonDecoder::default();
    let mut full_reply = String::new();
    let mut body = response.bytes_stream();

    while let Some(bytes) = body.next().await {
        let bytes = bytes.map_err(|err| BackendError::from_reqwest(&err))?;
        for chunk in decoder.push(&bytes)? {
            if !forward_chunk(&chunk, &mut full_reply, sender)? {
                debug!("Reply consumer dropped; abandoning stream");
                return Ok(full_reply);
            }
        }
    }

    if let Some(chunk) = decoder.finish()? {
        forward_chunk(&chunk, &mut full_reply, sender)?;
    }

    Ok(full_reply)
}

/// Returns false when the consumer is gone.
fn forward_chunk(
    chunk: &ChatResponseChunk,
    full_reply: &mut String,
    sender: &ReplySender,
) -> Result<bool, BackendError> {
    if let Some(error) = &chunk.error {
        return Err(BackendError::other(error.clone()));
    }
    match chunk.content() {
        Some(text) if !text.is_empty() => {
            full_reply.push_str(text);
            Ok(sender.chunk(text))
        }
        _ => Ok(true),
    }
}

fn describe_status(status: StatusCode, url: &str, body: &str) -> String {
    match extract_error_summary(body) {
        Some(summary) => format!("HTTP {status} for url: {url} ({summary})"),
        None => format!("HTTP {status} for url: {url}"),
    }
}

fn extract_error_summary(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
    let summary = value
        .get("error")
        .and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str().map(str::to_owned)),
            _ => None,
        })?;
    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Splits a byte stream into newline-delimited JSON objects.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    /// Feed transport bytes; returns every object completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<ChatResponseChunk>, BackendError> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let parsed = decode_line(&self.buffer[..newline_pos]);
            self.buffer.drain(..=newline_pos);
            if let Some(chunk) = parsed? {
                chunks.push(chunk);
            }
        }
        if self.buffer.len() > MAX_LINE_BYTES {
            return Err(BackendError::other(format!(
                "stream line exceeds {MAX_LINE_BYTES} bytes without a newline"
            )));
        }
        Ok(chunks)
    }

    /// Parse whatever is left once the transport closes.
    pub fn finish(self) -> Result<Option<ChatResponseChunk>, BackendError> {
        decode_line(&self.buffer)
    }
}

/// `None` for blank lines.
pub fn decode_line(line: &[u8]) -> Result<Option<ChatResponseChunk>, BackendError> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(line.trim_ascii())
        .map(Some)
        .map_err(|err| BackendError::other(format!("malformed stream line: {err}")))
}
