//! Network fetch capability
//!
//! HTTP error statuses come back as ordinary [`Response`]s; only transport
//! failures (DNS, refused connection, timeout) are errors. Callers decide
//! what a 404 means: install rejects it, fetch interception passes it through.

use crate::config::schema::NetworkConfig;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::http::{Method, Request, Response};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use ureq::{Agent, RequestBuilder};

/// Performs a request against the real network
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch a request, returning whatever the remote end answered
    async fn fetch(&self, request: &Request) -> ShellcacheResult<Response>;
}

/// Blocking ureq agent driven from the tokio blocking pool
#[derive(Clone)]
pub struct HttpNetwork {
    agent: Agent,
    user_agent: String,
}

impl HttpNetwork {
    /// Create a network client from config
    pub fn new(config: &NetworkConfig) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build();

        Self {
            agent: Agent::new_with_config(agent_config),
            user_agent: config.user_agent.clone(),
        }
    }

    fn send(&self, request: &Request) -> ShellcacheResult<Response> {
        let url = request.url.as_str();
        let result = match request.method {
            Method::Get => self.with_headers(self.agent.get(url), request).call(),
            Method::Head => self.with_headers(self.agent.head(url), request).call(),
            Method::Delete => self.with_headers(self.agent.delete(url), request).call(),
            Method::Options => self.with_headers(self.agent.options(url), request).call(),
            Method::Post => self
                .with_headers(self.agent.post(url), request)
                .send(&request.body[..]),
            Method::Put => self
                .with_headers(self.agent.put(url), request)
                .send(&request.body[..]),
            Method::Patch => self
                .with_headers(self.agent.patch(url), request)
                .send(&request.body[..]),
        };

        let mut response = result.map_err(|e| ShellcacheError::network(url, e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();

        // No size cap: the fallback must hand back the full body
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| ShellcacheError::network(url, e))?;

        debug!("{} {} -> {}", request.method, url, status);
        Ok(Response {
            status,
            headers,
            body,
        })
    }

    fn with_headers<B>(&self, mut builder: RequestBuilder<B>, request: &Request) -> RequestBuilder<B> {
        let mut has_user_agent = false;
        for (name, value) in &request.headers {
            has_user_agent |= name.eq_ignore_ascii_case("user-agent");
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !has_user_agent && !self.user_agent.is_empty() {
            builder = builder.header("User-Agent", self.user_agent.as_str());
        }
        builder
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> ShellcacheResult<Response> {
        let client = self.clone();
        let request = request.clone();
        let url = request.url.to_string();

        tokio::task::spawn_blocking(move || client.send(&request))
            .await
            .map_err(|e| ShellcacheError::network(url, format!("fetch task aborted: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use url::Url;

    /// Serve one HTTP response from a local listener, returning its base URL
    fn serve_once(status: u16, body: Vec<u8>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {} OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            )
            .unwrap();
            stream.write_all(&body).unwrap();
            stream.flush().unwrap();
        });

        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn unreachable_network() -> HttpNetwork {
        HttpNetwork::new(&NetworkConfig {
            timeout_secs: 2,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        // Port 1 is reserved (tcpmux) and never listening in test environments
        let url = Url::parse("http://127.0.0.1:1/index.html").unwrap();
        let err = unreachable_network()
            .fetch(&Request::get(url))
            .await
            .unwrap_err();

        assert!(err.is_network());
        assert!(err.to_string().contains("127.0.0.1:1"));
    }

    #[tokio::test]
    async fn large_body_returned_whole() {
        let body: Vec<u8> = (0..11 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let base = serve_once(200, body.clone());

        let network = HttpNetwork::new(&NetworkConfig {
            timeout_secs: 30,
            ..Default::default()
        });
        let response = network
            .fetch(&Request::get(base.join("model.bin").unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), body.len());
        assert!(response.body == body);
    }

    #[tokio::test]
    async fn error_status_is_a_response() {
        let base = serve_once(404, b"missing".to_vec());
        let response = HttpNetwork::new(&NetworkConfig::default())
            .fetch(&Request::get(base.join("nope").unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body, b"missing");
    }

    #[tokio::test]
    async fn refused_post_is_network_error() {
        let url = Url::parse("http://127.0.0.1:1/upload").unwrap();
        let request = Request::new(Method::Post, url).with_body("payload");
        let err = unreachable_network().fetch(&request).await.unwrap_err();
        assert!(err.is_network());
    }
}
