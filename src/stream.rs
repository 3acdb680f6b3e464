use std::time::{Duration, Instant};

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::Result;
use crate::error::StreamError;
use crate::watcher::EventIntake;

const CORRELATION_HEADER: &str = "x-correlation-id";
const EVENTS_PATH: &str = "events";
const PREVIEW_LIMIT: usize = 256;
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Long-poll client for the runtime's `/events` endpoint.
#[derive(Debug, Clone)]
pub struct EventStream {
    http: reqwest::Client,
    endpoint: Url,
    max_backoff: Duration,
}

impl EventStream {
    /// Build a stream client for `base`, optionally pinned to an API version.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path or the HTTP client
    /// fails to build.
    pub fn new(
        base: &Url,
        api_version: Option<&str>,
        connect_timeout: Duration,
        max_backoff: Duration,
    ) -> Result<Self> {
        let endpoint = events_endpoint(base, api_version)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("rtevents/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| StreamError::Client { source: err })?;

        Ok(Self {
            http,
            endpoint,
            max_backoff,
        })
    }

    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issue one events request and feed every received payload to `intake`
    /// until the runtime closes the stream. Returns the number of payloads.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails, the runtime answers with a
    /// non-success status, or the body breaks off mid-stream.
    pub async fn send_request(&self, intake: &EventIntake) -> Result<usize> {
        let correlation_id = Uuid::now_v7().to_string();
        let started = Instant::now();
        let mut response = self
            .http
            .get(self.endpoint.clone())
            .header(CORRELATION_HEADER, &correlation_id)
            .send()
            .await
            .map_err(|err| {
                intake.health().mark_disconnected();
                StreamError::from(err)
            })?;

        let status = response.status();
        if !status.is_success() {
            intake.health().mark_disconnected();
            return Err(StreamError::Unhealthy { status }.into());
        }
        intake.health().mark_connected();
        debug!(%correlation_id, endpoint = %self.endpoint, "runtime event request sent");

        let mut lines = LineBuffer::default();
        let mut received = 0;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    lines.extend(&chunk);
                    while let Some(line) = lines.next_line() {
                        received += feed(intake, line);
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    intake.health().mark_disconnected();
                    return Err(StreamError::from(err).into());
                }
            }
        }
        if let Some(rest) = lines.finish() {
            received += feed(intake, rest);
        }

        intake.health().mark_disconnected();
        debug!(
            %correlation_id,
            received,
            elapsed_ms = started.elapsed().as_millis(),
            "runtime event stream ended"
        );
        Ok(received)
    }

    /// Keep the stream connected, reconnecting with exponential backoff.
    /// Never returns; cancel the task to stop it.
    pub async fn run(&self, intake: EventIntake) {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_multiplier(2.0)
            .with_randomization_factor(0.25)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build();

        loop {
            match self.send_request(&intake).await {
                Ok(received) => {
                    info!(received, "runtime event stream closed by peer");
                    if received > 0 {
                        backoff.reset();
                    }
                }
                Err(err) if err.is_retriable() => {
                    warn!(error = %err, endpoint = %self.endpoint, "runtime event stream failed");
                }
                Err(err) => {
                    // Not transient: back off the full interval.
                    error!(error = %err, endpoint = %self.endpoint, "runtime event stream rejected");
                    debug!(delay_ms = self.max_backoff.as_millis(), "reconnecting to runtime event stream");
                    sleep(self.max_backoff).await;
                    continue;
                }
            }
            let delay = backoff.next_backoff().unwrap_or(self.max_backoff);
            debug!(delay_ms = delay.as_millis(), "reconnecting to runtime event stream");
            sleep(delay).await;
        }
    }
}

fn events_endpoint(base: &Url, api_version: Option<&str>) -> std::result::Result<Url, StreamError> {
    if !matches!(base.scheme(), "http" | "https") {
        return Err(StreamError::Endpoint {
            message: format!("unsupported scheme `{}`", base.scheme()),
        });
    }
    let mut endpoint = base.clone();
    {
        let mut segments = endpoint.path_segments_mut().map_err(|()| StreamError::Endpoint {
            message: format!("{base} cannot be used as a base URL"),
        })?;
        segments.pop_if_empty();
        if let Some(version) = api_version.map(str::trim).filter(|v| !v.is_empty()) {
            segments.push(version.trim_matches('/'));
        }
        segments.push(EVENTS_PATH);
    }
    Ok(endpoint)
}

fn feed(intake: &EventIntake, line: Line) -> usize {
    let line = match line {
        Line::Complete(line) => line,
        Line::Oversized(len) => {
            error!(len, limit = MAX_LINE_BYTES, "runtime event exceeds size limit");
            intake.push(None);
            return 1;
        }
    };
    if line.iter().all(u8::is_ascii_whitespace) {
        return 0;
    }
    match serde_json::from_slice::<Value>(&line) {
        Ok(value) => intake.push(Some(value)),
        Err(err) => {
            error!(error = %err, payload = %preview(&line), "cannot parse runtime event");
            intake.push(None);
        }
    }
    1
}

fn preview(body: &[u8]) -> String {
    let end = body.len().min(PREVIEW_LIMIT);
    let mut preview = String::from_utf8_lossy(&body[..end]).to_string();
    if body.len() > PREVIEW_LIMIT {
        preview.push_str("...");
    }
    preview.replace('\n', "\\n")
}

/// One newline-delimited record taken off the wire.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Complete(Vec<u8>),
    /// A record longer than the limit; only its length is kept.
    Oversized(usize),
}

/// Splits a byte stream on `\n`, keeping partial lines between chunks.
#[derive(Debug)]
struct LineBuffer {
    buf: Vec<u8>,
    /// Bytes of `buf` already known to hold no newline.
    scanned: usize,
    /// Bytes thrown away from the current oversized line.
    discarded: usize,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    const fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            discarded: 0,
            limit,
        }
    }

    fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<Line> {
        let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buf.len();
            if self.buf.len() > self.limit {
                self.discarded += self.buf.len();
                self.buf.clear();
                self.scanned = 0;
            }
            return None;
        };
        let pos = self.scanned + offset;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        self.scanned = 0;
        Some(self.take(line))
    }

    fn finish(mut self) -> Option<Line> {
        if self.buf.is_empty() && self.discarded == 0 {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(self.take(rest))
    }

    fn take(&mut self, line: Vec<u8>) -> Line {
        let len = std::mem::take(&mut self.discarded) + line.len();
        if len > self.limit {
            Line::Oversized(len)
        } else {
            Line::Complete(line)
        }
    }
}
