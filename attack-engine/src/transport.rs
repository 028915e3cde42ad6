//! Default outbound transport
//!
//! Well-formed requests go through `reqwest`. Requests it refuses to build
//! (non-token verbs, header names or values with control or non-ASCII
//! bytes) are written verbatim over a plain TCP connection so the malformed
//! traffic actually reaches the target.

use crate::error::{AttackError, AttackResult};
use crate::traits::OutboundTransport;
use async_trait::async_trait;
use bytes::Bytes;
use mock_common::RequestSignature;
use reqwest::header::{HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

/// Upper bound on how much of a raw reply is read to find the status line
const MAX_STATUS_LINE: usize = 8 * 1024;

/// Resolve an outbound rule path to a URL; bare hosts default to `http://`
pub fn target_url(target: &str) -> AttackResult<Url> {
    let candidate = if target.contains("://") {
        target.to_string()
    } else {
        format!("http://{}", target)
    };
    Url::parse(&candidate)
        .map_err(|e| AttackError::send_failure(target, format!("invalid target: {}", e)))
}

/// True when `reqwest` cannot express the request as given
pub fn needs_raw_send(request: &RequestSignature) -> bool {
    reqwest::Method::from_bytes(request.method.as_bytes()).is_err()
        || request.headers.iter().any(|(name, value)| {
            HeaderName::from_bytes(name.as_bytes()).is_err() || HeaderValue::from_str(value).is_err()
        })
}

/// Serialise a request exactly as given, without validating any part of it
pub fn encode_raw_request(url: &Url, request: &RequestSignature) -> Vec<u8> {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut head = format!("{} {} HTTP/1.1\r\n", request.method, target);
    head.push_str(&format!("Host: {}\r\n", url.host_str().unwrap_or_default()));
    for (name, value) in &request.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    let body = request.body_str();
    if !body.is_empty() {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("Connection: close\r\n\r\n");

    let mut raw = head.into_bytes();
    raw.extend_from_slice(body.as_bytes());
    raw
}

/// Status code from the first line of a raw reply
pub fn parse_status_line(reply: &[u8]) -> Option<u16> {
    let line_end = reply.windows(2).position(|w| w == b"\r\n")?;
    let line = std::str::from_utf8(&reply[..line_end]).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Lets a shared body back a `Bytes` without copying it
struct SharedBody(Arc<str>);

impl AsRef<[u8]> for SharedBody {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// HTTP transport used by the scheduler outside of tests
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> AttackResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AttackError::send_failure("client", e))?;
        Ok(Self { client, timeout })
    }

    async fn send_http(&self, url: Url, request: &RequestSignature) -> AttackResult<u16> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| AttackError::send_failure(&request.path, e))?;

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(Bytes::from_owner(SharedBody(Arc::clone(body))));
        }

        match builder.send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) if e.is_timeout() => Err(AttackError::timeout(
                &format!("send to {}", request.path),
                self.timeout.as_millis() as u64,
            )),
            Err(e) => Err(AttackError::send_failure(&request.path, e)),
        }
    }

    async fn send_raw(&self, url: Url, request: &RequestSignature) -> AttackResult<u16> {
        if url.scheme() != "http" {
            return Err(AttackError::send_failure(
                &request.path,
                format!("raw send not supported over {}", url.scheme()),
            ));
        }
        let host = url
            .host_str()
            .ok_or_else(|| AttackError::send_failure(&request.path, "target has no host"))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let raw = encode_raw_request(&url, request);

        let exchange = async {
            let mut stream = TcpStream::connect((host, port)).await?;
            stream.write_all(&raw).await?;
            stream.flush().await?;

            let mut reply = Vec::new();
            let mut chunk = [0u8; 1024];
            while reply.len() < MAX_STATUS_LINE && !reply.windows(2).any(|w| w == b"\r\n") {
                let read = stream.read(&mut chunk).await?;
                if read == 0 {
                    break;
                }
                reply.extend_from_slice(&chunk[..read]);
            }
            Ok::<_, std::io::Error>(reply)
        };

        let reply = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                AttackError::timeout(
                    &format!("raw send to {}", request.path),
                    self.timeout.as_millis() as u64,
                )
            })?
            .map_err(|e| AttackError::send_failure(&request.path, e))?;

        parse_status_line(&reply).ok_or_else(|| {
            AttackError::send_failure(&request.path, "connection closed without a status line")
        })
    }
}

#[async_trait]
impl OutboundTransport for HttpTransport {
    async fn send(&self, request: &RequestSignature) -> AttackResult<u16> {
        let url = target_url(&request.path)?;
        if needs_raw_send(request) {
            debug!(method = %request.method, destination = %request.path, "Sending raw request");
            self.send_raw(url, request).await
        } else {
            self.send_http(url, request).await
        }
    }
}
