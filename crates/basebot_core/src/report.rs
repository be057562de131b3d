//! Delivery of unexpected errors to the bot owner

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::config::GeneralSettings;
use crate::error::{CoreError, Result};

/// Discord rejects messages longer than this
pub const MESSAGE_LIMIT: usize = 2000;

/// How long one webhook post may take before it is abandoned
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

const FENCE_OPEN: &str = "```\n";
const FENCE_CLOSE: &str = "\n```";

/// Somewhere error reports can be posted
#[async_trait]
pub trait ErrorSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Post one message of at most [`MESSAGE_LIMIT`] characters
    async fn send(&self, text: &str) -> Result<()>;
}

/// Posts reports to a Discord webhook
#[derive(Debug, Clone)]
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            timeout: WEBHOOK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn failed(&self, cause: reqwest::Error) -> CoreError {
        CoreError::ReportFailed {
            sink: self.name().to_string(),
            cause: Box::new(cause),
        }
    }
}

#[async_trait]
impl ErrorSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, text: &str) -> Result<()> {
        for chunk in split_message(text, MESSAGE_LIMIT) {
            self.client
                .post(&self.url)
                .timeout(self.timeout)
                .json(&json!({ "content": chunk }))
                .send()
                .await
                .map_err(|e| self.failed(e))?
                .error_for_status()
                .map_err(|e| self.failed(e))?;
        }
        Ok(())
    }
}

/// Sends formatted reports to an optional sink
///
/// Without a sink every report is a no-op. Delivery failures are logged and
/// swallowed so reporting can never raise a second error.
#[derive(Clone, Default)]
pub struct ErrorReporter {
    sink: Option<Arc<dyn ErrorSink>>,
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("sink", &self.sink.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

impl ErrorReporter {
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// A reporter that drops everything
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Webhook reporter if `ERROR_WEBHOOK_URL` is set
    pub fn from_settings(settings: &GeneralSettings) -> Self {
        match &settings.error_webhook_url {
            Some(url) => Self::new(Arc::new(WebhookSink::new(url.clone()))),
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Post a plain message
    pub async fn report(&self, text: &str) {
        let Some(sink) = &self.sink else {
            debug!("No error sink configured, dropping report");
            return;
        };
        for chunk in split_message(text, MESSAGE_LIMIT) {
            if let Err(e) = sink.send(&chunk).await {
                warn!("Failed to deliver error report via {}: {}", sink.name(), e);
                return;
            }
        }
    }

    /// Log an unexpected error and post it with its full cause chain
    pub async fn report_error(&self, context: Option<&str>, err: &(dyn std::error::Error + Send + Sync + 'static)) {
        match context {
            Some(context) => error!("Unhandled error in {}: {}", context, error_chain(err)),
            None => error!("Unhandled error: {}", error_chain(err)),
        }

        let Some(sink) = &self.sink else {
            return;
        };
        for message in format_unhandled(context, err) {
            if let Err(e) = sink.send(&message).await {
                warn!("Failed to deliver error report via {}: {}", sink.name(), e);
                return;
            }
        }
    }
}

/// Render an error and every `source()` below it, one per line
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\nCaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Report messages for an unexpected error
///
/// The first message starts with an "Unpredicted Error" header. The cause
/// chain is split across as many code blocks as needed to stay within
/// [`MESSAGE_LIMIT`].
pub fn format_unhandled(context: Option<&str>, err: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let header = match context {
        Some(context) => format!("Unpredicted Error in `{context}`:\n"),
        None => "Unpredicted Error:\n".to_string(),
    };
    let fence_len = FENCE_OPEN.len() + FENCE_CLOSE.len();
    let body_limit = MESSAGE_LIMIT - fence_len;

    // The header shares the first message, so the first piece is shorter
    let chain = error_chain(err);
    let first_limit = body_limit.saturating_sub(header.chars().count()).max(1);
    let mut pieces = split_message(&chain, first_limit).into_iter();
    let first = pieces.next().unwrap_or_default();
    let rest: String = pieces.collect::<Vec<_>>().join("\n");

    let mut messages = vec![format!("{header}{FENCE_OPEN}{first}{FENCE_CLOSE}")];
    if !rest.is_empty() {
        messages.extend(
            split_message(&rest, body_limit)
                .into_iter()
                .map(|piece| format!("{FENCE_OPEN}{piece}{FENCE_CLOSE}")),
        );
    }
    messages
}

/// Split `text` into pieces of at most `limit` characters
///
/// Prefers breaking at newlines; lines longer than `limit` are cut hard.
/// Always returns at least one piece.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };

        if current_len + needed <= limit {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            current_len += needed;
            continue;
        }

        if !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
        } else {
            let chars: Vec<char> = line.chars().collect();
            let mut chunks = chars.chunks(limit).peekable();
            while let Some(chunk) = chunks.next() {
                let piece: String = chunk.iter().collect();
                if chunks.peek().is_some() {
                    pieces.push(piece);
                } else {
                    current_len = chunk.len();
                    current = piece;
                }
            }
        }
    }

    if !current.is_empty() || pieces.is_empty() {
        pieces.push(current);
    }
    pieces
}
