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

//! Pseudo-terminal hosting for server sessions.
//!
//! A [`PtyHost`] starts a program on a fresh pty and hands back a [`PtySession`], a
//! pair of channels to the workers that own the pty. Commands (input, resize, speed
//! changes and close) go in through the session and output arrives as [`PtyOutput`]
//! events. The native host runs its workers on Tokio's blocking pool since pty
//! descriptors only offer synchronous I/O.

use crate::result::{TerminalError, TerminalResult};
use bytes::Bytes;
use portable_pty::{ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use std::io::{Read, Write};
use teletty_telnetcodec::{TerminalSpeed, WindowSize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

/// Buffer size for reading from a pty.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Everything needed to start a program on a new pty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Program to run, looked up on `PATH`
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Value of `TERM` in the program's environment
    pub terminal_type: String,
    /// Initial window size
    pub size: WindowSize,
    /// Initial line speed, left at the system default when absent
    pub speed: Option<TerminalSpeed>,
}

impl SpawnRequest {
    /// Request with the default window size and speed.
    pub fn new(program: &str, terminal_type: &str) -> SpawnRequest {
        SpawnRequest {
            program: program.to_string(),
            args: Vec::new(),
            terminal_type: terminal_type.to_string(),
            size: WindowSize::default(),
            speed: None,
        }
    }
}

/// Instructions for the worker that owns a pty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PtyCommand {
    /// Write input to the program
    Write(Bytes),
    /// Change the window size
    Resize(WindowSize),
    /// Change the line speed
    Speed(TerminalSpeed),
    /// Stop the program and release the pty
    Close,
}

/// Events produced by a pty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PtyOutput {
    /// Output written by the program
    Data(Bytes),
    /// The program's side of the pty has closed; no further output follows
    Exited,
}

/// Handle on a running pty program.
///
/// Dropping the session closes the command channel, which stops the program.
#[derive(Debug)]
pub struct PtySession {
    commands: UnboundedSender<PtyCommand>,
    output: Option<UnboundedReceiver<PtyOutput>>,
}

/// Worker side of a [`PtySession`], used by hosts to serve a session.
#[derive(Debug)]
pub struct PtyEndpoint {
    /// Commands sent through the session
    pub commands: UnboundedReceiver<PtyCommand>,
    /// Sink for program output
    pub output: UnboundedSender<PtyOutput>,
}

impl PtySession {
    /// Create a connected session and endpoint.
    pub fn pair() -> (PtySession, PtyEndpoint) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        (
            PtySession {
                commands: command_tx,
                output: Some(output_rx),
            },
            PtyEndpoint {
                commands: command_rx,
                output: output_tx,
            },
        )
    }

    /// Send input to the program.
    pub fn write(&self, data: Bytes) -> TerminalResult<()> {
        self.send(PtyCommand::Write(data))
    }

    /// Resize the pty.
    pub fn set_size(&self, size: WindowSize) -> TerminalResult<()> {
        self.send(PtyCommand::Resize(size))
    }

    /// Change the pty's line speed.
    pub fn set_speed(&self, speed: TerminalSpeed) -> TerminalResult<()> {
        self.send(PtyCommand::Speed(speed))
    }

    /// Take the output stream. Only the first call returns it.
    pub fn take_output(&mut self) -> Option<UnboundedReceiver<PtyOutput>> {
        self.output.take()
    }

    /// Stop the program. Closing an already stopped session is not an error.
    pub fn close(&self) {
        let _ = self.commands.send(PtyCommand::Close);
    }

    /// Check whether the workers still accept commands.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: PtyCommand) -> TerminalResult<()> {
        self.commands
            .send(command)
            .map_err(|_| TerminalError::ChannelClosed)
    }
}

/// Something that can start programs on a pty.
pub trait PtyHost: Send + Sync + 'static {
    /// Start the requested program.
    fn open(&self, request: SpawnRequest) -> TerminalResult<PtySession>;
}

/// [`PtyHost`] backed by the operating system's pty devices.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativePtyHost;

impl PtyHost for NativePtyHost {
    fn open(&self, request: SpawnRequest) -> TerminalResult<PtySession> {
        let runtime = tokio::runtime::Handle::try_current()?;

        let pair = native_pty_system()
            .openpty(pty_size(request.size))
            .map_err(|e| TerminalError::Allocation(e.to_string()))?;

        let mut command = CommandBuilder::new(&request.program);
        command.args(&request.args);
        command.env("TERM", &request.terminal_type);
        let mut child = pair
            .slave
            .spawn_command(command)
            .map_err(|e| TerminalError::Spawn {
                program: request.program.clone(),
                reason: e.to_string(),
            })?;
        drop(pair.slave);

        let master = pair.master;
        let reader = master
            .try_clone_reader()
            .map_err(|e| TerminalError::Allocation(e.to_string()))?;
        let writer = master
            .take_writer()
            .map_err(|e| TerminalError::Allocation(e.to_string()))?;
        let killer = child.clone_killer();

        if let Some(speed) = request.speed {
            if let Err(error) = apply_speed(master.as_ref(), speed) {
                warn!("Failed to set pty speed {}: {}", speed, error);
            }
        }

        debug!(
            program = %request.program,
            terminal_type = %request.terminal_type,
            size = %request.size,
            pid = ?child.process_id(),
            "Spawned pty program"
        );

        let (session, endpoint) = PtySession::pair();
        runtime.spawn_blocking(move || read_loop(reader, &endpoint.output));
        runtime.spawn_blocking(move || command_loop(master, writer, killer, endpoint.commands));
        runtime.spawn_blocking(move || match child.wait() {
            Ok(status) => debug!(code = status.exit_code(), "Pty program exited"),
            Err(error) => warn!("Failed to wait for pty program: {}", error),
        });
        Ok(session)
    }
}

fn pty_size(size: WindowSize) -> PtySize {
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn read_loop(mut reader: Box<dyn Read + Send>, output: &UnboundedSender<PtyOutput>) {
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                trace!(bytes = n, "Read from pty");
                if output
                    .send(PtyOutput::Data(Bytes::copy_from_slice(&buffer[..n])))
                    .is_err()
                {
                    break;
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => {}
            // Linux reports EIO once the program's side of the pty is gone.
            Err(error) => {
                trace!("Pty reader stopped: {}", error);
                break;
            }
        }
    }
    let _ = output.send(PtyOutput::Exited);
}

fn command_loop(
    master: Box<dyn MasterPty + Send>,
    mut writer: Box<dyn Write + Send>,
    mut killer: Box<dyn ChildKiller + Send + Sync>,
    mut commands: UnboundedReceiver<PtyCommand>,
) {
    while let Some(command) = commands.blocking_recv() {
        match command {
            PtyCommand::Write(data) => {
                if let Err(error) = writer.write_all(&data).and_then(|()| writer.flush()) {
                    warn!("Failed to write to pty: {}", error);
                    break;
                }
            }
            PtyCommand::Resize(size) => {
                if let Err(error) = master.resize(pty_size(size)) {
                    warn!("Failed to resize pty to {}: {}", size, error);
                }
            }
            PtyCommand::Speed(speed) => {
                if let Err(error) = apply_speed(master.as_ref(), speed) {
                    warn!("Failed to set pty speed {}: {}", speed, error);
                }
            }
            PtyCommand::Close => break,
        }
    }
    if let Err(error) = killer.kill() {
        // Already exited.
        trace!("Kill after close: {}", error);
    }
    debug!("Pty released");
}

#[cfg(unix)]
fn apply_speed(master: &(dyn MasterPty + Send), speed: TerminalSpeed) -> TerminalResult<()> {
    use rustix::fd::BorrowedFd;

    let raw = master
        .as_raw_fd()
        .ok_or(TerminalError::Unsupported("pty without a file descriptor"))?;
    // SAFETY: the descriptor is owned by `master`, which outlives this borrow.
    let fd = unsafe { BorrowedFd::borrow_raw(raw) };
    crate::speed::set_baud_rate(fd, speed)
}

#[cfg(not(unix))]
fn apply_speed(_master: &(dyn MasterPty + Send), _speed: TerminalSpeed) -> TerminalResult<()> {
    Err(TerminalError::Unsupported("line speed on this platform"))
}
