use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE, USER_AGENT};
use hyper::{HeaderMap, Method, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use parking_lot::Mutex;
use platform_wire::byte_body;
use platform_wire::drain::DrainBodyFuture;
use url::Url;

use crate::error::Error;
use crate::session::{CookieJar, NamedRequest, Reply, RequestBody, Session};
use crate::statistics::Statistics;

const MAX_REDIRECTS: usize = 10;
const DEFAULT_USER_AGENT: &str = concat!("loadtester/", env!("CARGO_PKG_VERSION"));

/// Plain HTTP client for smoke runs of a single virtual user.
///
/// Keeps its own cookies, follows redirects and times every named request.
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
    base_url: Url,
    jar: CookieJar,
    statistics: Arc<Mutex<Statistics>>,
}

impl HttpClient {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            base_url,
            jar: CookieJar::default(),
            statistics: Arc::new(Mutex::new(Statistics::default())),
        }
    }

    /// Same connection pool, cookies and statistics, different base URL.
    #[must_use]
    pub fn rebased(&self, base_url: Url) -> Self {
        Self {
            base_url,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    #[must_use]
    pub fn statistics(&self) -> Statistics {
        self.statistics.lock().clone()
    }

    pub async fn send_recv(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<(StatusCode, HeaderMap, Vec<u8>)> {
        let resp = self
            .client
            .request(request)
            .await
            .context("Failed to send request")?;
        let content_length: usize = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|hv| hv.to_str().ok())
            .and_then(|hv| hv.parse().ok())
            .unwrap_or(1024);
        let (parts, body) = resp.into_parts();
        let bytes: Vec<u8> = DrainBodyFuture::new(body, content_length)
            .await
            .context("Failed to read response body")?;
        Ok((parts.status, parts.headers, bytes))
    }

    fn build(
        &self,
        method: &Method,
        url: &Url,
        headers: &[(String, String)],
        body: &RequestBody,
    ) -> Result<Request<Full<Bytes>>> {
        let mut builder = Request::builder().method(method.clone()).uri(url.as_str());
        // a request's own agent replaces the default
        if !headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(USER_AGENT.as_str()))
        {
            builder = builder.header(USER_AGENT, DEFAULT_USER_AGENT);
        }
        if let Some(cookies) = self.jar.header(url) {
            builder = builder.header(COOKIE, cookies);
        }
        if let Some(content_type) = body.content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        for (key, value) in headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder
            .body(byte_body(body.to_bytes()))
            .with_context(|| format!("Failed to build {method} {url}"))
    }

    async fn exchange(&self, request: &NamedRequest, name: String) -> Result<Reply> {
        let mut url = self.resolve(&request.target)?;
        let mut method = request.method.clone();
        let mut body = request.body.clone();
        for _ in 0..=MAX_REDIRECTS {
            if url.scheme() != "http" {
                anyhow::bail!("Unsupported scheme in {url}, the smoke client speaks plain http");
            }
            let built = self.build(&method, &url, &request.headers, &body)?;
            let (status, headers, bytes) = self.send_recv(built).await?;
            self.jar.store(&url, headers.get_all(SET_COOKIE).iter());
            let location = headers.get(LOCATION).and_then(|hv| hv.to_str().ok());
            match location {
                Some(location) if status.is_redirection() => {
                    url = url
                        .join(location)
                        .with_context(|| format!("Bad redirect location {location}"))?;
                    let drops_body = status == StatusCode::SEE_OTHER
                        || (method == Method::POST
                            && matches!(
                                status,
                                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND
                            ));
                    if drops_body {
                        method = Method::GET;
                        body = RequestBody::Empty;
                    }
                }
                _ => return Ok(Reply::new(name, status, Bytes::from(bytes))),
            }
        }
        anyhow::bail!("Too many redirects for {name}")
    }
}

impl Session for HttpClient {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn send(&mut self, request: NamedRequest) -> crate::error::Result<Reply> {
        let name = request.stat_name();
        let (rtt, reply) = run_timed(self.exchange(&request, name.clone())).await;
        let success = reply
            .as_ref()
            .is_ok_and(|reply| reply.status.is_success() || reply.status.is_redirection());
        self.statistics.lock().record(&name, rtt, success);
        tracing::debug!(%name, method = %request.method, success, "request done");
        reply.map_err(|e| Error::Transport(format!("{e:#}")))
    }

    fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        self.jar.get(url, name)
    }
}

#[inline]
async fn run_timed<T, F: Future<Output = T>>(fut: F) -> (Duration, T) {
    let start = Instant::now();
    let res = fut.await;
    (start.elapsed(), res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers a single request and hands back its lowercased head lines.
    async fn capture_one() -> (Url, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            while !raw.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = stream.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..read]);
            }
            stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&raw)
                .lines()
                .map(str::to_lowercase)
                .collect()
        });
        (base, handle)
    }

    fn user_agents(lines: &[String]) -> Vec<&str> {
        lines
            .iter()
            .filter(|line| line.starts_with("user-agent:"))
            .map(String::as_str)
            .collect()
    }

    #[tokio::test]
    async fn request_agent_replaces_the_default() {
        let (base, captured) = capture_one().await;
        let mut client = HttpClient::new(base);

        let reply = client
            .send(NamedRequest::get("/hot").header("User-Agent", "MIT-Open: 0.1.0"))
            .await
            .unwrap();

        assert_eq!(reply.status, StatusCode::OK);
        let lines = captured.await.unwrap();
        assert_eq!(user_agents(&lines), vec!["user-agent: mit-open: 0.1.0"]);
    }

    #[tokio::test]
    async fn default_agent_is_sent_once() {
        let (base, captured) = capture_one().await;
        let mut client = HttpClient::new(base);

        client.send(NamedRequest::get("/")).await.unwrap();

        let lines = captured.await.unwrap();
        let expected = format!("user-agent: {DEFAULT_USER_AGENT}");
        assert_eq!(user_agents(&lines), vec![expected.as_str()]);
    }
}
