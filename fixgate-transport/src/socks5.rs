/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! SOCKS5 client handshake (RFC 1928 / RFC 1929).
//!
//! Offers "no auth" and, when credentials are configured, username/password.
//! IPv4 targets are sent as ATYP 1; anything else as a domain name.

use fixgate_core::error::TransportError;
use std::net::Ipv4Addr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

const VERSION: u8 = 0x05;
const METHOD_NONE: u8 = 0x00;
const METHOD_USER_PASS: u8 = 0x02;
const METHOD_UNACCEPTABLE: u8 = 0xFF;
const AUTH_VERSION: u8 = 0x01;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

fn fail(reason: impl Into<String>) -> TransportError {
    TransportError::Socks5(reason.into())
}

/// Runs the SOCKS5 handshake on `stream` and asks the proxy to CONNECT to
/// `host:port`. On success the stream carries the tunnelled bytes.
///
/// # Errors
/// `TransportError::Socks5` on any protocol failure or refusal,
/// `TransportError::Io` if the stream breaks.
pub async fn handshake<S>(
    stream: &mut S,
    host: &str,
    port: u16,
    credentials: Option<(&str, &str)>,
) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let greeting: &[u8] = if credentials.is_some() {
        &[VERSION, 2, METHOD_NONE, METHOD_USER_PASS]
    } else {
        &[VERSION, 1, METHOD_NONE]
    };
    stream.write_all(greeting).await?;

    let mut choice = [0u8; 2];
    stream.read_exact(&mut choice).await?;
    if choice[0] != VERSION {
        return Err(fail(format!("unexpected version {:#04x}", choice[0])));
    }
    match (choice[1], credentials) {
        (METHOD_NONE, _) => {}
        (METHOD_USER_PASS, Some((user, pass))) => authenticate(stream, user, pass).await?,
        (METHOD_UNACCEPTABLE, _) => return Err(fail("no acceptable authentication method")),
        (other, _) => return Err(fail(format!("unsupported method {other:#04x}"))),
    }

    let mut request = vec![VERSION, CMD_CONNECT, 0x00];
    match host.parse::<Ipv4Addr>() {
        Ok(ip) => {
            request.push(ATYP_IPV4);
            request.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            let name = host.as_bytes();
            let len = u8::try_from(name.len()).map_err(|_| fail("target host name too long"))?;
            request.push(ATYP_DOMAIN);
            request.push(len);
            request.extend_from_slice(name);
        }
    }
    request.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&request).await?;

    let mut reply = [0u8; 4];
    stream.read_exact(&mut reply).await?;
    if reply[0] != VERSION {
        return Err(fail(format!("unexpected reply version {:#04x}", reply[0])));
    }
    if reply[1] != 0x00 {
        return Err(fail(format!("connect refused with code {:#04x}", reply[1])));
    }
    let bound_len = match reply[3] {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => usize::from(stream.read_u8().await?),
        other => return Err(fail(format!("unknown address type {other:#04x}"))),
    };
    let mut bound = vec![0u8; bound_len + 2];
    stream.read_exact(&mut bound).await?;

    debug!(target_host = host, target_port = port, "socks5 tunnel established");
    Ok(())
}

async fn authenticate<S>(stream: &mut S, user: &str, pass: &str) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ulen = u8::try_from(user.len()).map_err(|_| fail("username too long"))?;
    let plen = u8::try_from(pass.len()).map_err(|_| fail("password too long"))?;

    let mut request = Vec::with_capacity(3 + user.len() + pass.len());
    request.push(AUTH_VERSION);
    request.push(ulen);
    request.extend_from_slice(user.as_bytes());
    request.push(plen);
    request.extend_from_slice(pass.as_bytes());
    stream.write_all(&request).await?;

    let mut status = [0u8; 2];
    stream.read_exact(&mut status).await?;
    if status[1] != 0x00 {
        return Err(fail("username/password rejected"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_handshake_with_credentials() {
        let (mut client, mut proxy) = duplex(256);
        let server = tokio::spawn(async move {
            let mut greeting = [0u8; 4];
            proxy.read_exact(&mut greeting).await.unwrap();
            assert_eq!(greeting, [5, 2, 0, 2]);
            proxy.write_all(&[5, 2]).await.unwrap();

            let mut auth = [0u8; 9];
            proxy.read_exact(&mut auth).await.unwrap();
            assert_eq!(&auth, b"\x01\x02ab\x04pass");
            proxy.write_all(&[1, 0]).await.unwrap();

            let mut connect = [0u8; 10];
            proxy.read_exact(&mut connect).await.unwrap();
            assert_eq!(connect, [5, 1, 0, 1, 10, 0, 0, 7, 0x26, 0x94]);
            proxy
                .write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0])
                .await
                .unwrap();
        });

        handshake(&mut client, "10.0.0.7", 9876, Some(("ab", "pass")))
            .await
            .unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_method_rejected() {
        let (mut client, mut proxy) = duplex(64);
        tokio::spawn(async move {
            let mut greeting = [0u8; 3];
            proxy.read_exact(&mut greeting).await.unwrap();
            proxy.write_all(&[5, 0xFF]).await.unwrap();
        });

        let err = handshake(&mut client, "10.0.0.7", 9876, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::Socks5("no acceptable authentication method".to_string())
        );
    }

    #[tokio::test]
    async fn test_handshake_connect_refused() {
        let (mut client, mut proxy) = duplex(64);
        tokio::spawn(async move {
            let mut greeting = [0u8; 3];
            proxy.read_exact(&mut greeting).await.unwrap();
            proxy.write_all(&[5, 0]).await.unwrap();
            let mut connect = [0u8; 10];
            proxy.read_exact(&mut connect).await.unwrap();
            proxy.write_all(&[5, 5, 0, 1]).await.unwrap();
        });

        assert!(matches!(
            handshake(&mut client, "10.0.0.7", 9876, None).await,
            Err(TransportError::Socks5(_))
        ));
    }
}
