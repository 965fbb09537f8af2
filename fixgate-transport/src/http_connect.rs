/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! HTTP CONNECT tunnelling with optional Basic proxy authentication.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fixgate_core::error::TransportError;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// Upper bound on the proxy's response head.
const MAX_RESPONSE_HEAD: usize = 8 * 1024;

/// Builds the CONNECT request for `host:port`.
#[must_use]
pub fn connect_request(host: &str, port: u16, credentials: Option<(&str, &str)>) -> String {
    let authority = format!("{host}:{port}");
    let mut request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n");
    if let Some((user, pass)) = credentials {
        let token = STANDARD.encode(format!("{user}:{pass}"));
        request.push_str(&format!("Proxy-Authorization: Basic {token}\r\n"));
    }
    request.push_str("\r\n");
    request
}

/// Opens an HTTP CONNECT tunnel to `host:port` over `stream`.
///
/// The response head is read through a buffer. Bytes the proxy sent past the
/// blank line stay buffered in the returned reader, which is the tunnel.
///
/// # Errors
/// `TransportError::HttpConnect` if the proxy answers anything but 200, the
/// head is malformed or the proxy hangs up, `TransportError::Io` if the
/// stream breaks.
pub async fn tunnel<S>(
    stream: S,
    host: &str,
    port: u16,
    credentials: Option<(&str, &str)>,
) -> Result<BufReader<S>, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    stream
        .write_all(connect_request(host, port, credentials).as_bytes())
        .await?;
    stream.flush().await?;

    let mut head = Vec::with_capacity(256);
    while !head.ends_with(b"\r\n\r\n") {
        let room = MAX_RESPONSE_HEAD.saturating_sub(head.len());
        if room == 0 {
            return Err(TransportError::HttpConnect(
                "response head too large".to_string(),
            ));
        }
        let read = (&mut stream)
            .take(room as u64)
            .read_until(b'\n', &mut head)
            .await?;
        if read == 0 {
            return Err(TransportError::HttpConnect(
                "proxy closed the connection".to_string(),
            ));
        }
    }

    let status_line = head
        .split(|b| *b == b'\n')
        .next()
        .map(|line| String::from_utf8_lossy(line).trim_end().to_string())
        .unwrap_or_default();
    let mut parts = status_line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    let code = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") || code != "200" {
        return Err(TransportError::HttpConnect(format!(
            "proxy answered '{status_line}'"
        )));
    }

    debug!(
        target_host = host,
        target_port = port,
        buffered = stream.buffer().len(),
        "http connect tunnel established"
    );
    Ok(stream)
}
