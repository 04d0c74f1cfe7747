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

//! Error types for Telnet sessions

use crate::types::SessionId;
use teletty_telnetcodec::TelnetCodecError;
use teletty_terminal::TerminalError;
use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session error types
#[derive(Debug, Error)]
pub enum SessionError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error from the negotiation engine
    #[error("Protocol error: {0}")]
    Protocol(#[from] TelnetCodecError),

    /// Error from the local terminal or the pty
    #[error("Terminal error: {0}")]
    Terminal(#[from] TerminalError),

    /// Session with the given ID was not found
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// Maximum number of sessions reached
    #[error("Maximum sessions ({0}) reached")]
    MaxSessionsReached(usize),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error with a message
    #[error("{0}")]
    Other(String),
}

impl SessionError {
    /// Check if the error is recoverable
    ///
    /// Recoverable errors end at most the session they occurred in; the process
    /// carries on serving or may retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SessionError::Io(_)
            | SessionError::ConnectionClosed
            | SessionError::MaxSessionsReached(_) => true,
            SessionError::Terminal(error) => !error.is_fatal(),
            _ => false,
        }
    }

    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            SessionError::SessionNotFound(_) | SessionError::ConnectionClosed | SessionError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_recoverable() {
        assert!(SessionError::ConnectionClosed.is_recoverable());
        assert!(SessionError::MaxSessionsReached(4).is_recoverable());
        assert!(SessionError::Terminal(TerminalError::Unsupported("speed")).is_recoverable());
        assert!(!SessionError::Terminal(TerminalError::ChannelClosed).is_recoverable());
        assert!(!SessionError::ServerNotRunning.is_recoverable());
        assert!(!SessionError::Config("port".into()).is_recoverable());
    }

    #[test]
    fn test_error_is_connection_error() {
        assert!(SessionError::SessionNotFound(SessionId::new(1)).is_connection_error());
        assert!(SessionError::ConnectionClosed.is_connection_error());
        assert!(!SessionError::ServerNotRunning.is_connection_error());
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::SessionNotFound(SessionId::new(42));
        assert_eq!(err.to_string(), "Session session-42 not found");

        let err = SessionError::MaxSessionsReached(1000);
        assert_eq!(err.to_string(), "Maximum sessions (1000) reached");

        let err = SessionError::Terminal(TerminalError::AlreadyOpened);
        assert_eq!(err.to_string(), "Terminal error: pty already opened");
    }

    #[test]
    fn test_error_from_io() {
        let err: SessionError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe").into();
        assert!(matches!(err, SessionError::Io(_)));
        assert!(err.is_connection_error());
    }
}
