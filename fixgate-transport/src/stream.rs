/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Type-erased byte stream handed to the session layer.

use tokio::io::{AsyncRead, AsyncWrite};

/// Anything the session can read FIX frames from and write them to.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// A plain TCP, tunnelled or TLS stream behind one type.
pub type BoxedStream = Box<dyn AsyncStream>;
