//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Byte transport beneath the Telnet protocol.
//!
//! Reads return whatever the socket has available up to the buffer capacity, so a
//! Telnet command may straddle two chunks. End of stream is reported as `None`
//! rather than as an error.

use crate::{Result, SessionError};
use bytes::BytesMut;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Open a TCP connection to `address`, giving up after `timeout`.
pub async fn connect(address: &str, timeout: Duration) -> Result<TcpStream> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
        .await
        .map_err(|_| {
            SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connection to {address} timed out"),
            ))
        })??;
    stream.set_nodelay(true)?;
    debug!(%address, "Connected");
    Ok(stream)
}

/// Split a stream into a chunk reader and a shareable writer.
pub fn split<S>(
    stream: S,
    capacity: usize,
) -> (TransportReader<ReadHalf<S>>, TransportWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite,
{
    let (reader, writer) = tokio::io::split(stream);
    (
        TransportReader::new(reader, capacity),
        TransportWriter::new(writer),
    )
}

/// Reading half of a transport.
#[derive(Debug)]
pub struct TransportReader<R> {
    inner: R,
    buffer: BytesMut,
    capacity: usize,
}

impl<R: AsyncRead + Unpin> TransportReader<R> {
    /// Wrap a reader, reading at most `capacity` bytes per call.
    pub fn new(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Read the next chunk, `None` at end of stream.
    ///
    /// Cancel safe: a chunk is either returned or left unread.
    pub async fn read_chunk(&mut self) -> Result<Option<BytesMut>> {
        self.buffer.reserve(self.capacity);
        let n = (&mut self.inner)
            .take(self.capacity as u64)
            .read_buf(&mut self.buffer)
            .await?;
        if n == 0 {
            trace!("End of stream");
            return Ok(None);
        }
        trace!(bytes = n, "Read chunk");
        Ok(Some(self.buffer.split()))
    }

    /// Read a single byte, `None` at end of stream.
    pub async fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.inner.read_u8().await {
            Ok(byte) => Ok(Some(byte)),
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}

/// Writing half of a transport, cloned by every task that sends to the peer.
#[derive(Debug)]
pub struct TransportWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for TransportWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<W: AsyncWrite + Unpin> TransportWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Write and flush `data`. Failures are fatal to the session.
    pub async fn write_bytes(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock().await;
        inner.write_all(data).await?;
        inner.flush().await?;
        trace!(bytes = data.len(), "Wrote chunk");
        Ok(())
    }

    /// Shut down the write direction.
    pub async fn close(&self) -> Result<()> {
        self.inner.lock().await.shutdown().await?;
        Ok(())
    }
}
