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

//! Terminal Speed
//!

use crate::{SubnegotiationErrorKind, TelnetCodecError, TelnetCodecResult, consts};
use bytes::{Buf, BufMut};
use std::str::FromStr;

/// Line speed in bits per second, as carried by `IS "<transmit>,<receive>"`.
///
/// `transmit` is the terminal's output speed (ospeed) and `receive` its input speed
/// (ispeed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerminalSpeed {
    /// Output speed
    pub transmit: u32,
    /// Input speed
    pub receive: u32,
}

impl TerminalSpeed {
    /// Creates a speed pair.
    pub fn new(transmit: u32, receive: u32) -> Self {
        TerminalSpeed { transmit, receive }
    }
}

impl Default for TerminalSpeed {
    fn default() -> Self {
        TerminalSpeed::new(38400, 38400)
    }
}

impl std::fmt::Display for TerminalSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.transmit, self.receive)
    }
}

impl FromStr for TerminalSpeed {
    type Err = TelnetCodecError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || TelnetCodecError::SubnegotiationError {
            option: Some(consts::option::TSPEED),
            reason: SubnegotiationErrorKind::InvalidSpeed {
                value: value.to_string(),
            },
        };
        let (transmit, receive) = value.split_once(',').ok_or_else(invalid)?;
        Ok(TerminalSpeed {
            transmit: transmit.trim().parse().map_err(|_| invalid())?,
            receive: receive.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// TERMINAL-SPEED subnegotiation payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminalSpeedCommand {
    /// `IS "<transmit>,<receive>"`
    Is(TerminalSpeed),
    /// `SEND`
    Send,
}

impl TerminalSpeedCommand {
    /// Encodes the payload (without the surrounding `IAC SB TSPEED` / `IAC SE`).
    pub fn encode<T: BufMut>(&self, dst: &mut T) -> TelnetCodecResult<usize> {
        match self {
            TerminalSpeedCommand::Is(speed) => {
                let text = speed.to_string();
                dst.put_u8(consts::IS);
                dst.put_slice(text.as_bytes());
                Ok(1 + text.len())
            }
            TerminalSpeedCommand::Send => {
                dst.put_u8(consts::SEND);
                Ok(1)
            }
        }
    }

    /// Decodes an unescaped TERMINAL-SPEED payload.
    pub fn decode<T: Buf>(src: &mut T) -> TelnetCodecResult<TerminalSpeedCommand> {
        if !src.has_remaining() {
            return Err(TelnetCodecError::SubnegotiationError {
                option: Some(consts::option::TSPEED),
                reason: SubnegotiationErrorKind::InsufficientData {
                    required: 1,
                    available: 0,
                },
            });
        }
        match src.get_u8() {
            consts::IS => {
                let raw = src.copy_to_bytes(src.remaining());
                let text = std::str::from_utf8(&raw).map_err(|_| {
                    TelnetCodecError::SubnegotiationError {
                        option: Some(consts::option::TSPEED),
                        reason: SubnegotiationErrorKind::InvalidText,
                    }
                })?;
                Ok(TerminalSpeedCommand::Is(text.parse()?))
            }
            consts::SEND => Ok(TerminalSpeedCommand::Send),
            command => Err(TelnetCodecError::SubnegotiationError {
                option: Some(consts::option::TSPEED),
                reason: SubnegotiationErrorKind::InvalidCommand {
                    command,
                    expected: vec![consts::IS, consts::SEND],
                },
            }),
        }
    }
}

impl std::fmt::Display for TerminalSpeedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalSpeedCommand::Is(speed) => write!(f, "IS {}", speed),
            TerminalSpeedCommand::Send => write!(f, "SEND"),
        }
    }
}
