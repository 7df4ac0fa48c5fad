//! Network probes — HTTP GET and TCP connect.

use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http::header::{HOST, USER_AGENT};
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::debug;

use crate::probe::{Probe, ProbeFuture, ProbeResult};

/// Probe that passes when `GET http://{address}{path}` returns 2xx.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    pub address: String,
    pub path: String,
    pub timeout: Duration,
}

impl HttpProbe {
    pub fn new(address: &str, path: &str, timeout: Duration) -> Self {
        Self {
            address: address.to_string(),
            path: path.to_string(),
            timeout,
        }
    }
}

impl Probe for HttpProbe {
    fn describe(&self) -> String {
        format!("http://{}{}", self.address, self.path)
    }

    fn exec(&self) -> ProbeFuture<'_> {
        Box::pin(http_probe(&self.address, &self.path, self.timeout))
    }
}

/// Probe that passes when a TCP connection to `address` succeeds.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    pub address: String,
    pub timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: &str, timeout: Duration) -> Self {
        Self {
            address: address.to_string(),
            timeout,
        }
    }
}

impl Probe for TcpProbe {
    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }

    fn exec(&self) -> ProbeFuture<'_> {
        Box::pin(tcp_probe(&self.address, self.timeout))
    }
}

/// GET `http://{address}{path}` within `timeout`.
///
/// 2xx is `Healthy`, any other status is `Unhealthy`, and connection
/// errors or an elapsed timeout are `Failed`.
pub async fn http_probe(address: &str, path: &str, timeout: Duration) -> ProbeResult {
    let uri = format!("http://{address}{path}");
    match tokio::time::timeout(timeout, get_status(address, &uri)).await {
        Ok(Ok(status)) if status.is_success() => ProbeResult::Healthy,
        Ok(Ok(status)) => {
            debug!(%status, %uri, "http probe non-2xx");
            ProbeResult::Unhealthy
        }
        Ok(Err(reason)) => {
            debug!(%reason, %uri, "http probe failed");
            ProbeResult::Failed
        }
        Err(_) => {
            debug!(%uri, "http probe timed out");
            ProbeResult::Failed
        }
    }
}

/// Check that `address` accepts TCP connections within `timeout`.
pub async fn tcp_probe(address: &str, timeout: Duration) -> ProbeResult {
    match tokio::time::timeout(timeout, connect(address)).await {
        Ok(Ok(_)) => ProbeResult::Healthy,
        Ok(Err(reason)) => {
            debug!(%reason, %address, "tcp probe failed");
            ProbeResult::Failed
        }
        Err(_) => {
            debug!(%address, "tcp probe timed out");
            ProbeResult::Failed
        }
    }
}

async fn connect(address: &str) -> Result<TcpStream, String> {
    TcpStream::connect(address)
        .await
        .map_err(|e| format!("connect: {e}"))
}

/// Issue one GET over a fresh HTTP/1 connection and return the status.
async fn get_status(address: &str, uri: &str) -> Result<StatusCode, String> {
    let stream = connect(address).await?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| format!("handshake: {e}"))?;
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::get(uri)
        .header(HOST, address)
        .header(USER_AGENT, "rollgate-probe/0.1")
        .body(Empty::<Bytes>::new())
        .map_err(|e| format!("request: {e}"))?;
    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| format!("send: {e}"))?;
    Ok(resp.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the listen address.
    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!("{status_line}\r\ncontent-length: 0\r\n\r\n");
            let _ = socket.write_all(response.as_bytes()).await;
        });
        addr
    }

    #[tokio::test]
    async fn http_probe_2xx_is_healthy() {
        let addr = serve_once("HTTP/1.1 200 OK").await;
        let result = http_probe(&addr, "/healthz", Duration::from_secs(2)).await;
        assert_eq!(result, ProbeResult::Healthy);
    }

    #[tokio::test]
    async fn http_probe_5xx_is_unhealthy() {
        let addr = serve_once("HTTP/1.1 503 Service Unavailable").await;
        let probe = HttpProbe::new(&addr, "/ready", Duration::from_secs(2));
        assert_eq!(probe.exec().await, ProbeResult::Unhealthy);
    }

    #[tokio::test]
    async fn http_probe_to_closed_port_returns_failed() {
        let result = http_probe("127.0.0.1:1", "/healthz", Duration::from_millis(100)).await;
        assert_eq!(result, ProbeResult::Failed);
    }

    #[tokio::test]
    async fn silent_http_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let result = http_probe(&addr, "/healthz", Duration::from_millis(100)).await;
        assert_eq!(result, ProbeResult::Failed);
    }

    #[tokio::test]
    async fn tcp_probe_connects_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let probe = TcpProbe::new(&addr, Duration::from_secs(1));
        assert_eq!(probe.exec().await, ProbeResult::Healthy);
        assert_eq!(probe.describe(), format!("tcp://{addr}"));
    }

    #[tokio::test]
    async fn tcp_probe_to_closed_port_returns_failed() {
        let result = tcp_probe("127.0.0.1:1", Duration::from_millis(100)).await;
        assert_eq!(result, ProbeResult::Failed);
    }
}
