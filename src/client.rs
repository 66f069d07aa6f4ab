use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::config::{DEFAULT_STREAM_THRESHOLD, PipelineConfig};
use crate::deadline::Deadline;
use crate::download::{self, DownloadInfo};
use crate::error::LiftError;

/// Remote side of the pipeline: the revision page and the bulk archive.
pub trait DatasetClient: Send + Sync {
    fn fetch_page(&self, url: &str, deadline: &Deadline) -> Result<String, LiftError>;
    fn download(
        &self,
        url: &str,
        destination: &Path,
        deadline: &Deadline,
    ) -> Result<DownloadInfo, LiftError>;
}

#[derive(Clone)]
pub struct HttpDatasetClient {
    client: Client,
    stream_threshold: u64,
}

impl HttpDatasetClient {
    pub fn new() -> Result<Self, LiftError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("liftmetrics/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LiftError::Network(err.to_string()))?,
        );

        // Per-request timeouts come from the caller's deadline.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()
            .map_err(|err| LiftError::Network(err.to_string()))?;

        Ok(Self {
            client,
            stream_threshold: DEFAULT_STREAM_THRESHOLD,
        })
    }

    /// Client honouring the configured streaming threshold.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, LiftError> {
        Ok(Self::new()?.with_stream_threshold(config.stream_threshold))
    }

    pub fn with_stream_threshold(mut self, bytes: u64) -> Self {
        self.stream_threshold = bytes;
        self
    }

    fn send(
        &self,
        request: RequestBuilder,
        deadline: &Deadline,
        operation: &str,
    ) -> Result<Response, LiftError> {
        deadline.check(operation)?;
        let request = match deadline.remaining() {
            Some(remaining) => request.timeout(remaining),
            None => request,
        };
        let response = request
            .send()
            .map_err(|err| request_error(err, operation))?;
        handle_status(response)
    }
}

impl DatasetClient for HttpDatasetClient {
    fn fetch_page(&self, url: &str, deadline: &Deadline) -> Result<String, LiftError> {
        let response = self.send(self.client.get(url), deadline, "fetch revision page")?;
        response
            .text()
            .map_err(|err| body_error(err, deadline, "read revision page"))
    }

    fn download(
        &self,
        url: &str,
        destination: &Path,
        deadline: &Deadline,
    ) -> Result<DownloadInfo, LiftError> {
        let mut response = self.send(self.client.get(url), deadline, "download archive")?;
        let content_length = response.content_length();

        match content_length {
            Some(length) if length > self.stream_threshold => {
                tracing::info!(bytes = length, "streaming large archive to disk");
                download::stream_to_file(&mut response, destination, content_length, deadline)
            }
            _ => {
                let body = response
                    .bytes()
                    .map_err(|err| body_error(err, deadline, "read archive body"))?;
                deadline.check("download archive")?;
                let info = DownloadInfo {
                    bytes_written: body.len() as u64,
                    content_length,
                    streamed: false,
                };
                info.verify()?;
                download::write_buffered(destination, &body)?;
                Ok(info)
            }
        }
    }
}

fn handle_status(response: Response) -> Result<Response, LiftError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .status()
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();
    Err(LiftError::HttpStatus { status, message })
}

/// An expired deadline wins over however reqwest chose to report the stall.
fn body_error(err: reqwest::Error, deadline: &Deadline, operation: &str) -> LiftError {
    match deadline.check(operation) {
        Err(stopped) => stopped,
        Ok(()) => request_error(err, operation),
    }
}

fn request_error(err: reqwest::Error, operation: &str) -> LiftError {
    if err.is_timeout() {
        LiftError::Timeout(format!("{operation}: {err}"))
    } else {
        LiftError::Network(format!("{operation}: {err}"))
    }
}
