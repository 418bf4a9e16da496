//! A scripted [`Transport`] that records every request it receives.
//!
//! Replies are queued per identifier and handed out in order, so a test can
//! script redirect chains and repeated requests without a network.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use async_trait::async_trait;
use gemget_core::{Response, Transport, TransportError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadBuf};
use url::Url;

enum Scripted {
    Reply {
        status: u8,
        meta: String,
        body: Vec<u8>,
    },
    /// Sends `prefix` and then never finishes the body.
    Stall { meta: String, prefix: Vec<u8> },
    /// Sends `prefix` and then fails the read.
    BrokenBody { meta: String, prefix: Vec<u8> },
    Unreachable,
}

/// One recorded call to [`Transport::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub host_override: Option<String>,
}

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<Request>>,
    // write halves of stalled bodies; kept open so the read side never sees EOF
    open_streams: Mutex<Vec<DuplexStream>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, url: &str, scripted: Scripted) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(scripted);
        self
    }

    /// Answers `url` with a complete response.
    pub fn reply(self, url: &str, status: u8, meta: &str, body: impl Into<Vec<u8>>) -> Self {
        self.push(
            url,
            Scripted::Reply {
                status,
                meta: meta.to_string(),
                body: body.into(),
            },
        )
    }

    /// Answers `url` with a redirect to `target`.
    pub fn redirect(self, url: &str, target: &str) -> Self {
        self.reply(url, 30, target, Vec::new())
    }

    /// Answers `url` with a success header whose body stalls after `prefix`.
    pub fn stall(self, url: &str, meta: &str, prefix: &[u8]) -> Self {
        self.push(
            url,
            Scripted::Stall {
                meta: meta.to_string(),
                prefix: prefix.to_vec(),
            },
        )
    }

    /// Answers `url` with a success header whose body fails after `prefix`.
    pub fn broken_body(self, url: &str, meta: &str, prefix: &[u8]) -> Self {
        self.push(
            url,
            Scripted::BrokenBody {
                meta: meta.to_string(),
                prefix: prefix.to_vec(),
            },
        )
    }

    /// Makes `url` fail at the transport level.
    pub fn unreachable(self, url: &str) -> Self {
        self.push(url, Scripted::Unreachable)
    }

    /// Identifiers requested so far, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(
        &self,
        url: &Url,
        host_override: Option<&str>,
    ) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(Request {
            url: url.to_string(),
            host_override: host_override.map(str::to_string),
        });

        let next = self
            .routes
            .lock()
            .unwrap()
            .get_mut(url.as_str())
            .and_then(VecDeque::pop_front);

        match next {
            Some(Scripted::Reply { status, meta, body }) => {
                Ok(Response::new(status, meta, Box::new(Cursor::new(body))))
            }
            Some(Scripted::Stall { meta, prefix }) => {
                let (mut server, client) = tokio::io::duplex(64 * 1024);
                server.write_all(&prefix).await.unwrap();
                self.open_streams.lock().unwrap().push(server);
                Ok(Response::new(20, meta, Box::new(client)))
            }
            Some(Scripted::BrokenBody { meta, prefix }) => {
                let body = Cursor::new(prefix).chain(FailingRead);
                Ok(Response::new(20, meta, Box::new(body)))
            }
            Some(Scripted::Unreachable) | None => Err(TransportError::Connect {
                address: format!("{}:1965", url.host_str().unwrap_or_default()),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        }
    }
}

struct FailingRead;

impl AsyncRead for FailingRead {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )))
    }
}
