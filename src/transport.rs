//! Patch sources: file, stdin, or an HTTP generator endpoint
//!
//! Every source is opened into the same shape, a boxed stream of byte chunks,
//! so `StreamBuilder::send` never needs to know where patches come from.

use crate::tree::UiTree;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use url::Url;

pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generator returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Body POSTed to an HTTP generator
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tree: Option<UiTree>,
}

/// Where a patch stream comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSource {
    File(PathBuf),
    Stdin,
    Http(Url),
}

impl PatchSource {
    /// `-` is stdin, `http(s)://` is an endpoint, anything else a file path
    pub fn parse(source: &str) -> Result<Self, url::ParseError> {
        if source == "-" {
            return Ok(Self::Stdin);
        }
        if source.starts_with("http://") || source.starts_with("https://") {
            return Url::parse(source).map(Self::Http);
        }
        Ok(Self::File(PathBuf::from(source)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Open the source as a byte stream
    ///
    /// `request` is only sent to HTTP sources. A non-2xx response is an error
    /// carrying a preview of the body.
    pub async fn open(
        &self,
        client: &reqwest::Client,
        request: &GenerateRequest,
    ) -> Result<ByteStream, TransportError> {
        match self {
            Self::Stdin => Ok(ReaderStream::new(tokio::io::stdin())
                .map_err(TransportError::from)
                .boxed()),
            Self::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| TransportError::Open {
                        path: path.clone(),
                        source,
                    })?;
                Ok(ReaderStream::new(file).map_err(TransportError::from).boxed())
            }
            Self::Http(url) => {
                tracing::info!("Requesting patch stream from {}", url);
                let response = client.post(url.clone()).json(request).send().await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(TransportError::Status {
                        status: status.as_u16(),
                        body: crate::util::preview(&body),
                    });
                }
                Ok(response
                    .bytes_stream()
                    .map_err(TransportError::from)
                    .boxed())
            }
        }
    }
}

impl std::fmt::Display for PatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stdin => write!(f, "<stdin>"),
            Self::Http(url) => write!(f, "{}", url),
        }
    }
}

/// HTTP client for generator endpoints
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, TransportError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}
