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

/// Result Type for Codec Operations
pub type TelnetCodecResult<T> = Result<T, TelnetCodecError>;

/// Errors raised while scanning, resolving or encoding Telnet commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetCodecError {
    /// An I/O error occurred while writing an encoded frame.
    IOError {
        /// The kind of I/O error that occurred
        kind: std::io::ErrorKind,
        /// Description of the operation that failed
        operation: String,
    },

    /// A frame that cannot take part in option negotiation was handed to a resolver.
    NegotiationError {
        /// Description of what went wrong during negotiation
        reason: String,
        /// The frame type that caused the error, if available
        frame_type: Option<String>,
    },

    /// A subnegotiation payload could not be decoded.
    SubnegotiationError {
        /// The telnet option being subnegotiated
        option: Option<u8>,
        /// Specific reason for the failure
        reason: SubnegotiationErrorKind,
    },
}

/// Specific kinds of subnegotiation errors with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubnegotiationErrorKind {
    /// Fewer (or more) bytes than the option's payload format requires.
    InsufficientData {
        /// Number of bytes required
        required: usize,
        /// Number of bytes available
        available: usize,
    },

    /// The leading IS/SEND byte is not one the option defines.
    InvalidCommand {
        /// The invalid command byte
        command: u8,
        /// Expected command bytes
        expected: Vec<u8>,
    },

    /// The payload text is not printable ASCII.
    InvalidText,

    /// A terminal speed payload is not of the form `"<transmit>,<receive>"`.
    InvalidSpeed {
        /// The offending payload, lossily decoded
        value: String,
    },
}

impl std::error::Error for TelnetCodecError {}

impl std::fmt::Display for TelnetCodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetCodecError::IOError { kind, operation } => {
                write!(f, "I/O error during {}: {:?}", operation, kind)
            }
            TelnetCodecError::NegotiationError { reason, frame_type } => {
                if let Some(ft) = frame_type {
                    write!(f, "Negotiation error ({}): {}", ft, reason)
                } else {
                    write!(f, "Negotiation error: {}", reason)
                }
            }
            TelnetCodecError::SubnegotiationError { option, reason } => {
                if let Some(opt) = option {
                    write!(f, "Subnegotiation error for option {}: {}", opt, reason)
                } else {
                    write!(f, "Subnegotiation error: {}", reason)
                }
            }
        }
    }
}

impl std::fmt::Display for SubnegotiationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubnegotiationErrorKind::InsufficientData {
                required,
                available,
            } => write!(
                f,
                "payload length mismatch (required: {}, available: {})",
                required, available
            ),
            SubnegotiationErrorKind::InvalidCommand { command, expected } => write!(
                f,
                "invalid command 0x{:02X} (expected one of: {:?})",
                command, expected
            ),
            SubnegotiationErrorKind::InvalidText => write!(f, "payload is not printable ASCII"),
            SubnegotiationErrorKind::InvalidSpeed { value } => {
                write!(f, "invalid terminal speed {:?}", value)
            }
        }
    }
}

impl From<std::io::Error> for TelnetCodecError {
    fn from(error: std::io::Error) -> Self {
        TelnetCodecError::IOError {
            kind: error.kind(),
            operation: error.to_string(),
        }
    }
}
