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

//! Server side terminal session.

use crate::pty::{PtyHost, PtyOutput, PtySession, SpawnRequest};
use crate::result::{TerminalError, TerminalResult};
use bytes::Bytes;
use std::sync::Arc;
use teletty_telnetcodec::{TerminalSpeed, WindowSize};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

/// The pty a server session logs its client into.
///
/// Window size and line speed may be negotiated before or after the program starts.
/// Settings learnt beforehand are kept and applied at spawn time, later ones are sent
/// to the running pty. Only one program is ever started per session.
pub struct PtyTerminal {
    host: Arc<dyn PtyHost>,
    program: String,
    args: Vec<String>,
    terminal_type: Option<String>,
    size: WindowSize,
    speed: Option<TerminalSpeed>,
    session: Option<PtySession>,
}

impl PtyTerminal {
    /// Create a terminal that will run `program` on `host`.
    pub fn new(host: Arc<dyn PtyHost>, program: &str, args: &[String]) -> PtyTerminal {
        PtyTerminal {
            host,
            program: program.to_string(),
            args: args.to_vec(),
            terminal_type: None,
            size: WindowSize::default(),
            speed: None,
            session: None,
        }
    }

    /// Check whether the program has been started.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Terminal type the program was started with.
    pub fn terminal_type(&self) -> Option<&str> {
        self.terminal_type.as_deref()
    }

    /// Most recent window size.
    pub fn window_size(&self) -> WindowSize {
        self.size
    }

    /// Most recent line speed.
    pub fn speed(&self) -> Option<TerminalSpeed> {
        self.speed
    }

    /// Start the program with `TERM` set to `terminal_type`.
    ///
    /// Returns the program's output stream. Fails with
    /// [`TerminalError::AlreadyOpened`] if a program is already running.
    pub fn spawn(&mut self, terminal_type: &str) -> TerminalResult<UnboundedReceiver<PtyOutput>> {
        if self.session.is_some() {
            return Err(TerminalError::AlreadyOpened);
        }
        let request = SpawnRequest {
            program: self.program.clone(),
            args: self.args.clone(),
            terminal_type: terminal_type.to_string(),
            size: self.size,
            speed: self.speed,
        };
        let mut session = self.host.open(request)?;
        let output = session.take_output().ok_or(TerminalError::ChannelClosed)?;
        info!(
            program = %self.program,
            terminal_type,
            size = %self.size,
            "Terminal session started"
        );
        self.terminal_type = Some(terminal_type.to_string());
        self.session = Some(session);
        Ok(output)
    }

    /// Send input to the program.
    pub fn write(&self, data: Bytes) -> TerminalResult<()> {
        self.session
            .as_ref()
            .ok_or(TerminalError::NotOpened)?
            .write(data)
    }

    /// Record a new window size and apply it if the program is running.
    pub fn set_size(&mut self, size: WindowSize) -> TerminalResult<()> {
        self.size = size;
        match &self.session {
            Some(session) => session.set_size(size),
            None => {
                debug!(%size, "Window size kept for spawn");
                Ok(())
            }
        }
    }

    /// Record a new line speed and apply it if the program is running.
    pub fn set_speed(&mut self, speed: TerminalSpeed) -> TerminalResult<()> {
        self.speed = Some(speed);
        match &self.session {
            Some(session) => session.set_speed(speed),
            None => {
                debug!(%speed, "Line speed kept for spawn");
                Ok(())
            }
        }
    }

    /// Stop the program if one is running.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            debug!("Terminal session closed");
        }
    }
}

impl Drop for PtyTerminal {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PtyTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyTerminal")
            .field("program", &self.program)
            .field("terminal_type", &self.terminal_type)
            .field("size", &self.size)
            .field("speed", &self.speed)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::{PtyCommand, PtyEndpoint};
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Host that records requests and keeps the worker side for inspection.
    #[derive(Default)]
    struct RecordingHost {
        requests: Mutex<Vec<SpawnRequest>>,
        endpoints: Mutex<Vec<PtyEndpoint>>,
    }

    impl PtyHost for RecordingHost {
        fn open(&self, request: SpawnRequest) -> TerminalResult<PtySession> {
            let (session, endpoint) = PtySession::pair();
            self.requests.lock().unwrap().push(request);
            self.endpoints.lock().unwrap().push(endpoint);
            Ok(session)
        }
    }

    struct FailingHost;

    impl PtyHost for FailingHost {
        fn open(&self, request: SpawnRequest) -> TerminalResult<PtySession> {
            Err(TerminalError::Spawn {
                program: request.program,
                reason: "not found".to_string(),
            })
        }
    }

    fn terminal(host: &Arc<RecordingHost>) -> PtyTerminal {
        PtyTerminal::new(host.clone(), "login", &["-p".to_string()])
    }

    // ============================================================================
    // Pending Settings Tests
    // ============================================================================

    #[test]
    #[traced_test]
    fn test_settings_before_spawn_are_applied_at_spawn() {
        let host = Arc::new(RecordingHost::default());
        let mut terminal = terminal(&host);

        terminal.set_size(WindowSize::new(100, 40)).unwrap();
        terminal.set_speed(TerminalSpeed::new(9600, 4800)).unwrap();
        assert!(!terminal.is_open());

        terminal.spawn("xterm").unwrap();

        let requests = host.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].program, "login");
        assert_eq!(requests[0].args, vec!["-p".to_string()]);
        assert_eq!(requests[0].terminal_type, "xterm");
        assert_eq!(requests[0].size, WindowSize::new(100, 40));
        assert_eq!(requests[0].speed, Some(TerminalSpeed::new(9600, 4800)));
        assert_eq!(terminal.terminal_type(), Some("xterm"));
        assert!(logs_contain("Terminal session started"));
    }

    #[tokio::test]
    async fn test_settings_after_spawn_are_live() {
        let host = Arc::new(RecordingHost::default());
        let mut terminal = terminal(&host);
        terminal.spawn("vt100").unwrap();

        terminal.set_size(WindowSize::new(90, 30)).unwrap();
        terminal.set_speed(TerminalSpeed::new(2400, 2400)).unwrap();
        terminal.write(Bytes::from_static(b"id\r")).unwrap();

        let mut endpoint = host.endpoints.lock().unwrap().pop().unwrap();
        assert_eq!(
            endpoint.commands.recv().await,
            Some(PtyCommand::Resize(WindowSize::new(90, 30)))
        );
        assert_eq!(
            endpoint.commands.recv().await,
            Some(PtyCommand::Speed(TerminalSpeed::new(2400, 2400)))
        );
        assert_eq!(
            endpoint.commands.recv().await,
            Some(PtyCommand::Write(Bytes::from_static(b"id\r")))
        );
        assert_eq!(host.requests.lock().unwrap().len(), 1);
    }

    // ============================================================================
    // Lifecycle Tests
    // ============================================================================

    #[test]
    fn test_second_spawn_refused() {
        let host = Arc::new(RecordingHost::default());
        let mut terminal = terminal(&host);
        terminal.spawn("vt100").unwrap();

        assert!(matches!(
            terminal.spawn("xterm"),
            Err(TerminalError::AlreadyOpened)
        ));
        assert_eq!(terminal.terminal_type(), Some("vt100"));
        assert_eq!(host.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_write_before_spawn() {
        let host = Arc::new(RecordingHost::default());
        let terminal = terminal(&host);
        assert!(matches!(
            terminal.write(Bytes::from_static(b"x")),
            Err(TerminalError::NotOpened)
        ));
    }

    #[test]
    fn test_spawn_failure_leaves_terminal_closed() {
        let mut terminal = PtyTerminal::new(Arc::new(FailingHost), "login", &[]);
        assert!(matches!(
            terminal.spawn("vt100"),
            Err(TerminalError::Spawn { .. })
        ));
        assert!(!terminal.is_open());
        assert_eq!(terminal.terminal_type(), None);
    }

    #[tokio::test]
    async fn test_drop_closes_program() {
        let host = Arc::new(RecordingHost::default());
        let mut terminal = terminal(&host);
        terminal.spawn("vt100").unwrap();
        drop(terminal);

        let mut endpoint = host.endpoints.lock().unwrap().pop().unwrap();
        assert_eq!(endpoint.commands.recv().await, Some(PtyCommand::Close));
        assert_eq!(endpoint.commands.recv().await, None);
    }
}
