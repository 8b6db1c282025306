//! Ask client.

use bytes::Bytes;
use futures::Stream;
use ragstream_streaming::{
    drive_with_config, AnswerState, StreamOutcome, StreamSink,
};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// A question for the answer service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskRequest {
    /// The question text.
    pub question: String,
    /// Whether the service should rerank retrieved evidence.
    pub use_rerank: bool,
    /// Number of evidence chunks to retrieve.
    pub top_k: u32,
}

impl AskRequest {
    /// Create a request with default retrieval settings.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            use_rerank: true,
            top_k: 4,
        }
    }

    /// Enable or disable reranking.
    #[must_use]
    pub fn use_rerank(mut self, enabled: bool) -> Self {
        self.use_rerank = enabled;
        self
    }

    /// Set the number of evidence chunks.
    #[must_use]
    pub fn top_k(mut self, k: u32) -> Self {
        self.top_k = k;
        self
    }
}

/// Client for the streaming ask endpoint.
#[derive(Clone)]
pub struct AskClient {
    client: Client,
    config: ClientConfig,
    endpoint: Url,
}

impl AskClient {
    /// Create a client from a config.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let endpoint = config.endpoint()?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Set custom HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a question and return the raw answer byte stream.
    pub async fn open(
        &self,
        request: &AskRequest,
    ) -> ClientResult<impl Stream<Item = Result<Bytes, reqwest::Error>>> {
        info!(
            url = %self.endpoint,
            question_len = request.question.len(),
            top_k = request.top_k,
            use_rerank = request.use_rerank,
            "Opening answer stream"
        );

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(request);
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(status = %status, "Received answer stream response");

        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(
                status = status_code,
                body_preview = %body.chars().take(500).collect::<String>(),
                "Answer service error"
            );
            return Err(ClientError::Http {
                status: status_code,
                body,
            });
        }

        Ok(response.bytes_stream())
    }

    /// Ask a question, dispatching the answer stream into `sink`.
    ///
    /// Cancelling `cancel` while the request is in flight or while the
    /// stream is being read returns [`StreamOutcome::Cancelled`].
    pub async fn ask<S>(
        &self,
        request: &AskRequest,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> ClientResult<StreamOutcome>
    where
        S: StreamSink + ?Sized,
    {
        let transport = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Ask cancelled before the stream opened");
                return Ok(StreamOutcome::Cancelled);
            }
            opened = self.open(request) => opened?,
        };

        let outcome =
            drive_with_config(transport, sink, cancel, self.config.parser.clone()).await?;
        info!(?outcome, "Answer stream finished");
        Ok(outcome)
    }

    /// Ask a question into a fresh [`AnswerState`].
    ///
    /// The state is reset first. On failure the partial answer is replaced
    /// with the configured error indicator before the error is returned;
    /// cancellation leaves the partial answer as it is.
    pub async fn ask_answer(
        &self,
        request: &AskRequest,
        state: &mut AnswerState,
        cancel: &CancellationToken,
    ) -> ClientResult<StreamOutcome> {
        state.reset();
        match self.ask(request, state, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                state.fail(&err, &self.config.error_prefix);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for AskClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AskClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("config", &self.config)
            .finish()
    }
}
