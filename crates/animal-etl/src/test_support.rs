//! Test doubles shared by the unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::error::{EtlError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// One canned outcome for [`MockTransport`]
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Response(u16, Vec<u8>),
    TransportError,
}

impl Scripted {
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Scripted::Response(status, serde_json::to_vec(&body).unwrap())
    }

    pub(crate) fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    pub(crate) fn status(status: u16) -> Self {
        Scripted::Response(status, Vec::new())
    }

    pub(crate) fn raw(status: u16, body: &str) -> Self {
        Scripted::Response(status, body.as_bytes().to_vec())
    }
}

/// Replays scripted outcomes in order and records every request.
///
/// Once the script runs dry every further call is a transport error.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| {
                let query: Vec<String> = r.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
                if query.is_empty() {
                    r.url
                } else {
                    format!("{}?{}", r.url, query.join("&"))
                }
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();

        match next {
            Some(Scripted::Response(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Scripted::TransportError) | None => Err(EtlError::Transport {
                method: request.method.clone(),
                url: request.url.clone(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Captures events emitted on the current thread while alive
pub(crate) struct LogCapture {
    buffer: LogBuffer,
    _guard: DefaultGuard,
}

impl LogCapture {
    pub(crate) fn start() -> Self {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);

        Self {
            buffer,
            _guard: guard,
        }
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.0.lock().unwrap()).into_owned()
    }

    /// Number of captured lines at `level` ("INFO", "WARN", ...)
    pub(crate) fn count_level(&self, level: &str) -> usize {
        self.contents()
            .lines()
            .filter(|line| line.split_whitespace().next() == Some(level))
            .count()
    }

    pub(crate) fn lines_at(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.split_whitespace().next() == Some(level))
            .map(str::to_string)
            .collect()
    }
}
