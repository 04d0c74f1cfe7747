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

//! Telnet client
//!
//! [`ClientSession`] drives one connection from three event sources: the socket,
//! keystrokes and control events (interrupt and window resize). It is independent of
//! the real terminal so it can be tested over in-memory pipes. [`TelnetClient`] wires
//! it to the controlling terminal and the process's signals.

use crate::local_echo::LocalEcho;
use crate::transport::{self, split};
use crate::{ClientConfig, Result, SessionError, TelnetConnection};
use bytes::Bytes;
use std::io::Read;
use teletty_telnetcodec::{ClientResolver, ETX, Role, TelnetOption, WindowSize};
use teletty_terminal::{RawTerminal, default_terminal_type, window_size_of};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Printed when the server closes the connection
const CLOSED_NOTICE: &[u8] = b"\r\nConnection closed by foreign host.\r\n";

/// Out of band events for a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientControl {
    /// The user pressed the interrupt key
    Interrupt,
    /// The local terminal changed size
    Resize(WindowSize),
}

/// A client side Telnet session
pub struct ClientSession<R, W, O> {
    connection: TelnetConnection<R, W>,
    display: O,
    local_echo: LocalEcho,
}

impl<R, W, O> ClientSession<R, W, O>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
{
    /// Create a session showing server output on `display`.
    pub fn new(connection: TelnetConnection<R, W>, display: O) -> Self {
        Self {
            connection,
            display,
            local_echo: LocalEcho::new(),
        }
    }

    /// Run until the server closes the connection.
    #[instrument(name = "client", skip_all)]
    pub async fn run(
        mut self,
        mut keys: mpsc::Receiver<Bytes>,
        mut control: mpsc::Receiver<ClientControl>,
    ) -> Result<()> {
        self.connection.request_options().await?;
        let mut keys_open = true;
        let mut control_open = true;

        loop {
            select! {
                chunk = self.connection.read_chunk() => {
                    let Some(chunk) = chunk? else {
                        info!("Connection closed by foreign host");
                        self.show(CLOSED_NOTICE).await?;
                        return Ok(());
                    };
                    let inbound = self.connection.handle_chunk(&chunk).await?;
                    self.show(&inbound.data).await?;
                }
                key = keys.recv(), if keys_open => match key {
                    Some(input) => self.send_input(&input).await?,
                    None => {
                        debug!("Keyboard closed");
                        keys_open = false;
                    }
                },
                message = control.recv(), if control_open => match message {
                    Some(ClientControl::Interrupt) => self.connection.write_data(&[ETX]).await?,
                    Some(ClientControl::Resize(size)) => {
                        if !self.connection.report_window_size(size).await? {
                            debug!(%size, "Window size held until NAWS is enabled");
                        }
                    }
                    None => control_open = false,
                },
            }
        }
    }

    async fn send_input(&mut self, input: &[u8]) -> Result<()> {
        if !self.connection.is_enabled(TelnetOption::Echo) {
            let echo = self.local_echo.feed(input);
            self.show(&echo).await?;
        }
        self.connection.write_data(input).await
    }

    async fn show(&mut self, data: &[u8]) -> Result<()> {
        if !data.is_empty() {
            self.display.write_all(data).await?;
            self.display.flush().await?;
        }
        Ok(())
    }
}

impl<R, W, O> std::fmt::Debug for ClientSession<R, W, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("connection", &self.connection)
            .field("local_echo", &self.local_echo)
            .finish_non_exhaustive()
    }
}

/// Interactive Telnet client on the controlling terminal
#[derive(Debug, Clone)]
pub struct TelnetClient {
    config: ClientConfig,
}

impl TelnetClient {
    /// Create a client for `config`
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate().map_err(SessionError::Config)?;
        Ok(Self { config })
    }

    /// Connect and run an interactive session until the server closes it.
    pub async fn run(&self) -> Result<()> {
        let address = self.config.address();
        let mut stdout = tokio::io::stdout();

        stdout
            .write_all(format!("Trying {address}...\r\n").as_bytes())
            .await?;
        stdout.flush().await?;
        let stream = transport::connect(&address, self.config.connect_timeout).await?;
        stdout
            .write_all(format!("Connected to {address}.\r\n").as_bytes())
            .await?;
        stdout.flush().await?;

        let mut tty = RawTerminal::open()?;
        let size = tty.window_size().unwrap_or_default();
        let terminal_type = self.config.terminal_type.clone().unwrap_or_else(|| {
            default_terminal_type(std::env::var("TERM").ok().as_deref())
        });
        debug!(%terminal_type, %size, "Local terminal");

        let resolver = ClientResolver::new(&terminal_type, self.config.terminal_speed, size);
        let (reader, writer) = split(stream, self.config.read_buffer_size);
        let connection = TelnetConnection::new(reader, writer, Role::Client(resolver));

        let (key_tx, key_rx) = mpsc::channel(64);
        let keyboard = tty.try_clone_reader()?;
        tokio::task::spawn_blocking(move || read_keys(keyboard, &key_tx));

        let (control_tx, control_rx) = mpsc::channel(8);
        let size_source = tty.try_clone_reader()?;
        let signals = tokio::spawn(watch_signals(control_tx, size_source));

        let result = ClientSession::new(connection, stdout)
            .run(key_rx, control_rx)
            .await;

        signals.abort();
        tty.restore()?;
        result
    }
}

/// Forward raw keystrokes until the terminal or the session goes away.
fn read_keys(mut keyboard: std::fs::File, keys: &mpsc::Sender<Bytes>) {
    let mut buffer = [0u8; 1024];
    loop {
        match keyboard.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                if keys
                    .blocking_send(Bytes::copy_from_slice(&buffer[..n]))
                    .is_err()
                {
                    break;
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => {}
            Err(error) => {
                warn!("Keyboard read failed: {}", error);
                break;
            }
        }
    }
}

/// Turn SIGINT and SIGWINCH into control events.
async fn watch_signals(control: mpsc::Sender<ClientControl>, tty: std::fs::File) -> Result<()> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut window_change = signal(SignalKind::window_change())?;

    loop {
        let message = select! {
            Some(()) = interrupt.recv() => ClientControl::Interrupt,
            Some(()) = window_change.recv() => match window_size_of(&tty) {
                Ok(size) => ClientControl::Resize(size),
                Err(error) => {
                    warn!("Failed to read window size: {}", error);
                    continue;
                }
            },
            else => break,
        };
        if control.send(message).await.is_err() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{TransportReader, split};
    use std::time::Duration;
    use teletty_telnetcodec::{ClientResolver, consts};
    use tokio::io::{AsyncReadExt, DuplexStream, ReadHalf, duplex};
    use tokio::time::timeout;

    type Peer = (
        TransportReader<ReadHalf<DuplexStream>>,
        crate::transport::TransportWriter<tokio::io::WriteHalf<DuplexStream>>,
    );

    struct Harness {
        peer: Peer,
        display: DuplexStream,
        keys: mpsc::Sender<Bytes>,
        control: mpsc::Sender<ClientControl>,
        task: tokio::task::JoinHandle<Result<()>>,
    }

    fn start_client() -> Harness {
        let (near, far) = duplex(4096);
        let (reader, writer) = split(near, 1024);
        let peer = split(far, 1024);
        let connection =
            TelnetConnection::new(reader, writer, Role::Client(ClientResolver::default()));
        let (display, shown) = duplex(4096);
        let (keys, key_rx) = mpsc::channel(8);
        let (control, control_rx) = mpsc::channel(8);
        let task =
            tokio::spawn(ClientSession::new(connection, display).run(key_rx, control_rx));
        Harness {
            peer,
            display: shown,
            keys,
            control,
            task,
        }
    }

    /// Read from the peer until the received bytes end with `tail`.
    async fn read_until(
        reader: &mut TransportReader<ReadHalf<DuplexStream>>,
        tail: &[u8],
    ) -> Vec<u8> {
        let mut received = Vec::new();
        while !received.ends_with(tail) {
            let chunk = timeout(Duration::from_secs(5), reader.read_chunk())
                .await
                .expect("peer read timed out")
                .unwrap()
                .expect("client closed early");
            received.extend_from_slice(&chunk);
        }
        received
    }

    // ============================================================================
    // Client Session Tests
    // ============================================================================

    #[tokio::test]
    async fn test_server_output_reaches_display() {
        let mut harness = start_client();
        let (_, peer_writer) = &harness.peer;
        peer_writer.write_bytes(b"login: ").await.unwrap();
        peer_writer.close().await.unwrap();

        harness.task.await.unwrap().unwrap();
        let mut shown = Vec::new();
        harness.display.read_to_end(&mut shown).await.unwrap();
        assert!(shown.starts_with(b"login: "));
        assert!(shown.ends_with(CLOSED_NOTICE));
    }

    #[tokio::test]
    async fn test_keys_echo_locally_without_server_echo() {
        let mut harness = start_client();
        let (peer_reader, peer_writer) = &mut harness.peer;
        // The refused probe is answered after WONT ECHO has been applied.
        peer_writer
            .write_bytes(&[
                consts::IAC,
                consts::WONT,
                consts::option::ECHO,
                consts::IAC,
                consts::DO,
                200,
            ])
            .await
            .unwrap();
        read_until(peer_reader, &[consts::IAC, consts::WONT, 200]).await;

        harness.keys.send(Bytes::from_static(b"ls\r")).await.unwrap();
        read_until(peer_reader, b"ls\r").await;

        let mut shown = [0u8; 3];
        timeout(Duration::from_secs(5), harness.display.read_exact(&mut shown))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&shown, b"ls\n");
        harness.task.abort();
    }

    #[tokio::test]
    async fn test_keys_not_echoed_when_server_echoes() {
        let mut harness = start_client();
        let (peer_reader, peer_writer) = &mut harness.peer;
        // The client asks for remote echo up front, so nothing is echoed locally.
        harness.keys.send(Bytes::from_static(b"pw\r")).await.unwrap();
        read_until(peer_reader, b"pw\r").await;
        peer_writer.write_bytes(b"$ ").await.unwrap();

        let mut shown = [0u8; 2];
        timeout(Duration::from_secs(5), harness.display.read_exact(&mut shown))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&shown, b"$ ");
        harness.task.abort();
    }

    #[tokio::test]
    async fn test_interrupt_sends_etx() {
        let mut harness = start_client();
        harness.control.send(ClientControl::Interrupt).await.unwrap();
        let (peer_reader, _) = &mut harness.peer;
        read_until(peer_reader, &[ETX]).await;
        harness.task.abort();
    }

    #[tokio::test]
    async fn test_resize_reported_once_naws_enabled() {
        let mut harness = start_client();
        let (peer_reader, peer_writer) = &mut harness.peer;
        peer_writer
            .write_bytes(&[consts::IAC, consts::DO, consts::option::NAWS])
            .await
            .unwrap();
        harness
            .control
            .send(ClientControl::Resize(WindowSize::new(100, 40)))
            .await
            .unwrap();
        let report = [
            consts::IAC,
            consts::SB,
            consts::option::NAWS,
            0,
            100,
            0,
            40,
            consts::IAC,
            consts::SE,
        ];
        read_until(peer_reader, &report).await;
        harness.task.abort();
    }
}
