/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Establishes the byte stream for a session.
//!
//! Order of operations: dial (socket buffers and keepalive set before
//! connecting), optional proxy tunnel, `TCP_NODELAY`, optional TLS. Every
//! stage runs under the session's connect timeout. A proxy is first tried as
//! SOCKS5; if that fails a fresh connection is opened for HTTP CONNECT.

use crate::stream::{AsyncStream, BoxedStream};
use crate::{http_connect, socks5, tls};
use fixgate_core::error::TransportError;
use fixgate_session::{ProxyConfig, SessionConfig};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tracing::{debug, info, warn};

/// How the stream reached the counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Straight TCP connection.
    Direct,
    /// Through a SOCKS5 proxy.
    Socks5,
    /// Through an HTTP CONNECT proxy.
    HttpConnect,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "direct",
            Self::Socks5 => "socks5",
            Self::HttpConnect => "http-connect",
        })
    }
}

/// An established stream plus how it was obtained.
pub struct Connection {
    /// The stream, TLS-wrapped when configured.
    pub stream: BoxedStream,
    /// Route taken to the counterparty.
    pub route: Route,
    /// Whether the stream is TLS.
    pub tls: bool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("route", &self.route)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

/// Dials a counterparty according to its session configuration.
#[derive(Debug, Clone)]
pub struct Connector {
    host: String,
    port: u16,
    tls: bool,
    proxy: Option<ProxyConfig>,
    stage_timeout: Duration,
    recv_buffer_size: u32,
    send_buffer_size: u32,
}

impl Connector {
    /// Creates a connector for the session's endpoint.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            tls: config.tls,
            proxy: config.proxy.clone(),
            stage_timeout: config.connect_timeout,
            recv_buffer_size: config.recv_buffer_size,
            send_buffer_size: config.send_buffer_size,
        }
    }

    /// Opens the stream.
    ///
    /// # Errors
    /// `TransportError::Timeout` if a stage stalls, `ProxyExhausted` if both
    /// tunnel kinds fail, otherwise the error of the failing stage.
    pub async fn connect(&self) -> Result<Connection, TransportError> {
        let (stream, route) = match &self.proxy {
            None => {
                let tcp = self.dial(&self.host, self.port).await?;
                tcp.set_nodelay(true)?;
                (self.secure(tcp).await?, Route::Direct)
            }
            Some(proxy) => self.tunnel(proxy).await?,
        };
        info!(
            host = %self.host,
            port = self.port,
            route = %route,
            tls = self.tls,
            "transport established"
        );
        Ok(Connection {
            stream,
            route,
            tls: self.tls,
        })
    }

    async fn dial(&self, host: &str, port: u16) -> Result<TcpStream, TransportError> {
        stage("dial", self.stage_timeout, async {
            let addr = lookup_host((host, port))
                .await
                .map_err(|e| TransportError::Connect {
                    addr: format!("{host}:{port}"),
                    reason: e.to_string(),
                })?
                .next()
                .ok_or_else(|| TransportError::Connect {
                    addr: format!("{host}:{port}"),
                    reason: "no address resolved".to_string(),
                })?;

            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            socket.set_recv_buffer_size(self.recv_buffer_size)?;
            socket.set_send_buffer_size(self.send_buffer_size)?;
            socket.set_keepalive(true)?;

            debug!(%addr, "dialling");
            socket
                .connect(addr)
                .await
                .map_err(|e| TransportError::Connect {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                })
        })
        .await
    }

    /// Wraps `stream` in TLS when configured.
    async fn secure<S>(&self, stream: S) -> Result<BoxedStream, TransportError>
    where
        S: AsyncStream + 'static,
    {
        if self.tls {
            Ok(Box::new(stage("tls", self.stage_timeout, tls::wrap(stream, &self.host)).await?))
        } else {
            Ok(Box::new(stream))
        }
    }

    async fn tunnel(&self, proxy: &ProxyConfig) -> Result<(BoxedStream, Route), TransportError> {
        let credentials = proxy.credentials();

        let socks5_error = match self.dial(&proxy.host, proxy.port).await {
            Ok(mut tcp) => {
                let handshake = socks5::handshake(&mut tcp, &self.host, self.port, credentials);
                match stage("socks5", self.stage_timeout, handshake).await {
                    Ok(()) => {
                        tcp.set_nodelay(true)?;
                        return Ok((self.secure(tcp).await?, Route::Socks5));
                    }
                    Err(e) => e,
                }
            }
            Err(e) => e,
        };
        warn!(
            proxy = %proxy.host,
            error = %socks5_error,
            "socks5 tunnel failed, trying http connect"
        );

        let http_error = match self.dial(&proxy.host, proxy.port).await {
            Ok(tcp) => {
                let tunnel = http_connect::tunnel(tcp, &self.host, self.port, credentials);
                match stage("http-connect", self.stage_timeout, tunnel).await {
                    Ok(stream) => {
                        stream.get_ref().set_nodelay(true)?;
                        return Ok((self.secure(stream).await?, Route::HttpConnect));
                    }
                    Err(e) => e,
                }
            }
            Err(e) => e,
        };

        Err(TransportError::ProxyExhausted {
            socks5: socks5_error.to_string(),
            http: http_error.to_string(),
        })
    }
}

async fn stage<T, F>(name: &'static str, limit: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout {
            stage: name,
            elapsed_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixgate_core::types::CompId;

    fn config(port: u16) -> SessionConfig {
        SessionConfig::new(
            "lp",
            "127.0.0.1",
            port,
            CompId::new("GW").unwrap(),
            CompId::new("LP").unwrap(),
        )
    }

    #[test]
    fn test_route_display() {
        assert_eq!(Route::Direct.to_string(), "direct");
        assert_eq!(Route::HttpConnect.to_string(), "http-connect");
    }

    #[tokio::test]
    async fn test_stage_timeout_names_stage() {
        let err = stage("socks5", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, TransportError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(
            err,
            TransportError::Timeout {
                stage: "socks5",
                elapsed_ms: 10
            }
        );
    }

    #[tokio::test]
    async fn test_direct_connection_refused() {
        // bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Connector::new(&config(port)).connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
