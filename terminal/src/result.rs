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

//! Error types for the terminal layer

use thiserror::Error;

/// Result type for terminal operations
pub type TerminalResult<T> = std::result::Result<T, TerminalError>;

/// Terminal and pseudo-terminal error types
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from a tty, pty or child process handle
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A termios call on a terminal descriptor failed
    #[error("Terminal control failed: {0}")]
    Control(#[from] rustix::io::Errno),

    /// The operating system could not allocate a pseudo-terminal pair
    #[error("Failed to allocate pty: {0}")]
    Allocation(String),

    /// The login program could not be started on the pty
    #[error("Failed to spawn {program}: {reason}")]
    Spawn {
        /// Program that was being started
        program: String,
        /// Reason reported by the pty layer
        reason: String,
    },

    /// A process is already attached to this terminal session
    #[error("pty already opened")]
    AlreadyOpened,

    /// No process has been attached to this terminal session yet
    #[error("pty not opened")]
    NotOpened,

    /// The pty worker tasks have stopped
    #[error("pty channel closed")]
    ChannelClosed,

    /// Pty workers need a Tokio runtime to run on
    #[error("No async runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    /// The operation is not available for this terminal
    #[error("Unsupported: {0}")]
    Unsupported(&'static str),
}

impl TerminalError {
    /// Check whether the error ends the session that owns the terminal
    ///
    /// Spawn and allocation failures as well as closed workers are fatal, failures
    /// of individual control calls are not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TerminalError::Control(_) | TerminalError::Unsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no tty");
        let terminal_error: TerminalError = io_error.into();

        match terminal_error {
            TerminalError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_terminal_error_from_errno() {
        let terminal_error: TerminalError = rustix::io::Errno::NOTTY.into();
        assert!(matches!(terminal_error, TerminalError::Control(_)));
        assert!(!terminal_error.is_fatal());
    }

    #[test]
    fn test_terminal_error_display() {
        assert_eq!(TerminalError::AlreadyOpened.to_string(), "pty already opened");
        assert_eq!(TerminalError::NotOpened.to_string(), "pty not opened");
        let spawn = TerminalError::Spawn {
            program: "login".to_string(),
            reason: "No such file or directory".to_string(),
        };
        assert_eq!(
            spawn.to_string(),
            "Failed to spawn login: No such file or directory"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TerminalError::ChannelClosed.is_fatal());
        assert!(TerminalError::Allocation("out of ptys".into()).is_fatal());
        assert!(!TerminalError::Unsupported("speed").is_fatal());
    }

    #[test]
    fn test_error_propagation() {
        fn inner() -> TerminalResult<()> {
            Err(TerminalError::NotOpened)
        }

        fn outer() -> TerminalResult<u32> {
            inner()?;
            Ok(1)
        }

        assert!(matches!(outer(), Err(TerminalError::NotOpened)));
    }
}
