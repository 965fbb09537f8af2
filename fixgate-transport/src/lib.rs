/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # FixGate Transport
//!
//! Network transport layer for the FixGate gateway.
//!
//! This crate provides:
//! - **Connector**: tuned TCP dialling with per-stage timeouts
//! - **Proxy tunnelling**: SOCKS5 with HTTP CONNECT fallback
//! - **TLS support**: rustls client with the ring provider
//! - **Codec**: Tokio codec for FIX message framing

pub mod codec;
pub mod connector;
pub mod http_connect;
pub mod socks5;
pub mod stream;
pub mod tls;

pub use codec::{CodecError, FixCodec};
pub use connector::{Connection, Connector, Route};
pub use stream::{AsyncStream, BoxedStream};
