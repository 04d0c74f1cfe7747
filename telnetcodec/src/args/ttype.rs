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

//! Terminal Type
//!

use crate::{SubnegotiationErrorKind, TelnetCodecError, TelnetCodecResult, consts};
use bytes::{Buf, BufMut};

/// TERMINAL-TYPE subnegotiation payload.
///
/// The server asks with `SEND`, the client answers with `IS <name>`. Names travel in
/// upper case by convention.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminalTypeCommand {
    /// `IS <name>`
    Is(String),
    /// `SEND`
    Send,
}

impl TerminalTypeCommand {
    /// Returns the encoded length of this payload in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            TerminalTypeCommand::Is(name) => 1 + name.len(),
            TerminalTypeCommand::Send => 1,
        }
    }

    /// Encodes the payload (without the surrounding `IAC SB TTYPE` / `IAC SE`).
    pub fn encode<T: BufMut>(&self, dst: &mut T) -> TelnetCodecResult<usize> {
        match self {
            TerminalTypeCommand::Is(name) => {
                dst.put_u8(consts::IS);
                dst.put_slice(name.as_bytes());
            }
            TerminalTypeCommand::Send => dst.put_u8(consts::SEND),
        }
        Ok(self.encoded_len())
    }

    /// Decodes an unescaped TERMINAL-TYPE payload.
    pub fn decode<T: Buf>(src: &mut T) -> TelnetCodecResult<TerminalTypeCommand> {
        if !src.has_remaining() {
            return Err(TelnetCodecError::SubnegotiationError {
                option: Some(consts::option::TTYPE),
                reason: SubnegotiationErrorKind::InsufficientData {
                    required: 1,
                    available: 0,
                },
            });
        }
        match src.get_u8() {
            consts::IS => {
                let raw = src.copy_to_bytes(src.remaining());
                if !raw.iter().all(|byte| byte.is_ascii_graphic()) {
                    return Err(TelnetCodecError::SubnegotiationError {
                        option: Some(consts::option::TTYPE),
                        reason: SubnegotiationErrorKind::InvalidText,
                    });
                }
                Ok(TerminalTypeCommand::Is(
                    String::from_utf8_lossy(&raw).into_owned(),
                ))
            }
            consts::SEND => Ok(TerminalTypeCommand::Send),
            command => Err(TelnetCodecError::SubnegotiationError {
                option: Some(consts::option::TTYPE),
                reason: SubnegotiationErrorKind::InvalidCommand {
                    command,
                    expected: vec![consts::IS, consts::SEND],
                },
            }),
        }
    }
}

impl std::fmt::Display for TerminalTypeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalTypeCommand::Is(name) => write!(f, "IS {}", name),
            TerminalTypeCommand::Send => write!(f, "SEND"),
        }
    }
}
