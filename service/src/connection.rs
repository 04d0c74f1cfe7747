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

//! Telnet connection: a transport driven through a negotiation engine.

use crate::Result;
use crate::transport::{TransportReader, TransportWriter};
use bytes::BytesMut;
use metrics::counter;
use teletty_telnetcodec::{Inbound, NegotiationEngine, Role, TelnetOption, WindowSize, escape_iac};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument, trace};

/// A Telnet connection
///
/// Owns the reading half of the transport and the session's negotiation state.
/// Protocol responses produced while decoding a chunk are written before the chunk's
/// application data is handed back, so the peer always sees negotiation replies in
/// stream order.
pub struct TelnetConnection<R, W> {
    reader: TransportReader<R>,
    writer: TransportWriter<W>,
    engine: NegotiationEngine,
}

impl<R, W> TelnetConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a connection negotiating as `role`.
    pub fn new(reader: TransportReader<R>, writer: TransportWriter<W>, role: Role) -> Self {
        Self {
            reader,
            writer,
            engine: NegotiationEngine::new(role),
        }
    }

    /// The negotiation engine.
    pub fn engine(&self) -> &NegotiationEngine {
        &self.engine
    }

    /// Check whether an option is currently enabled.
    pub fn is_enabled(&self, option: TelnetOption) -> bool {
        self.engine.is_enabled(option)
    }

    /// A handle for writing to the peer from another task.
    pub fn writer(&self) -> TransportWriter<W> {
        self.writer.clone()
    }

    /// Send this role's session-start option requests.
    #[instrument(skip(self), fields(server = self.engine.role().is_server()))]
    pub async fn request_options(&mut self) -> Result<()> {
        let requests = self.engine.initial_requests()?;
        debug!(bytes = requests.len(), "Requesting options");
        self.writer.write_bytes(&requests).await
    }

    /// Read the next raw chunk from the peer, `None` at end of stream.
    ///
    /// Cancel safe, so it can sit in a `select!` next to other event sources.
    pub async fn read_chunk(&mut self) -> Result<Option<BytesMut>> {
        let chunk = self.reader.read_chunk().await?;
        if let Some(chunk) = &chunk {
            counter!("teletty.bytes.inbound").increment(chunk.len() as u64);
        }
        Ok(chunk)
    }

    /// Decode a chunk, answer its negotiations and return its data and effects.
    pub async fn handle_chunk(&mut self, chunk: &[u8]) -> Result<Inbound> {
        let inbound = self.engine.process_inbound(chunk)?;
        if !inbound.responses.is_empty() {
            trace!(bytes = inbound.responses.len(), "Answering negotiation");
            self.write_raw(&inbound.responses).await?;
        }
        Ok(inbound)
    }

    /// Read until a chunk yields data or effects, `None` at end of stream.
    pub async fn read_message(&mut self) -> Result<Option<Inbound>> {
        while let Some(chunk) = self.read_chunk().await? {
            let inbound = self.handle_chunk(&chunk).await?;
            if !inbound.data.is_empty() || !inbound.effects.is_empty() {
                return Ok(Some(inbound));
            }
        }
        Ok(None)
    }

    /// Send application data, escaping IAC bytes.
    pub async fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.write_raw(&escape_iac(data)).await
    }

    /// Report a new window size. Returns `false` when NAWS is not in effect.
    pub async fn report_window_size(&mut self, size: WindowSize) -> Result<bool> {
        match self.engine.report_window_size(size)? {
            Some(report) => {
                debug!(%size, "Reporting window size");
                self.write_raw(&report).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Shut down the write direction.
    pub async fn close(&mut self) -> Result<()> {
        self.writer.close().await
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        counter!("teletty.bytes.outbound").increment(bytes.len() as u64);
        self.writer.write_bytes(bytes).await
    }
}

impl<R, W> std::fmt::Debug for TelnetConnection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetConnection")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
