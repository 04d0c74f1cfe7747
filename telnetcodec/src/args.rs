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

use crate::TelnetOption;
use crate::args::naws::WindowSize;
use crate::args::tspeed::TerminalSpeedCommand;
use crate::args::ttype::TerminalTypeCommand;
use crate::consts;
use crate::result::TelnetCodecResult;
use bytes::{BufMut, BytesMut};
use std::fmt::Formatter;

pub mod naws;
pub mod tspeed;
pub mod ttype;

///
/// Telnet Subnegotiation Argument
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetArgument {
    /// A subnegotiation for the window size, in characters.
    NAWSWindowSize(WindowSize),
    /// A TERMINAL-TYPE request or answer.
    TerminalType(TerminalTypeCommand),
    /// A TERMINAL-SPEED request or answer.
    TerminalSpeed(TerminalSpeedCommand),
    /// A subnegotiation for an option without a payload parser.
    Unknown(TelnetOption, BytesMut),
}

impl TelnetArgument {
    /// Parses an unescaped subnegotiation payload for `option`.
    ///
    /// # Errors
    /// Returns a [`crate::TelnetCodecError::SubnegotiationError`] when the payload does not
    /// match the option's format, for instance a NAWS payload that is not four bytes.
    pub fn parse(option: TelnetOption, payload: &[u8]) -> TelnetCodecResult<TelnetArgument> {
        let mut src = payload;
        match option {
            TelnetOption::NAWS => Ok(TelnetArgument::NAWSWindowSize(WindowSize::decode(
                &mut src,
            )?)),
            TelnetOption::TerminalType => Ok(TelnetArgument::TerminalType(
                TerminalTypeCommand::decode(&mut src)?,
            )),
            TelnetOption::TerminalSpeed => Ok(TelnetArgument::TerminalSpeed(
                TerminalSpeedCommand::decode(&mut src)?,
            )),
            option => Ok(TelnetArgument::Unknown(option, BytesMut::from(payload))),
        }
    }

    /// The option this argument belongs to.
    pub fn option(&self) -> TelnetOption {
        match self {
            TelnetArgument::NAWSWindowSize(_) => TelnetOption::NAWS,
            TelnetArgument::TerminalType(_) => TelnetOption::TerminalType,
            TelnetArgument::TerminalSpeed(_) => TelnetOption::TerminalSpeed,
            TelnetArgument::Unknown(option, _) => *option,
        }
    }

    /// Encodes the payload bytes, escaping any `IAC` in opaque payloads.
    pub fn encode<T: BufMut>(&self, dst: &mut T) -> TelnetCodecResult<usize> {
        match self {
            TelnetArgument::NAWSWindowSize(size) => size.encode(dst),
            TelnetArgument::TerminalType(command) => command.encode(dst),
            TelnetArgument::TerminalSpeed(command) => command.encode(dst),
            TelnetArgument::Unknown(_, payload) => {
                let mut written = 0;
                for &byte in payload.iter() {
                    if byte == consts::IAC {
                        dst.put_u8(consts::IAC);
                        written += 1;
                    }
                    dst.put_u8(byte);
                    written += 1;
                }
                Ok(written)
            }
        }
    }
}

impl std::fmt::Display for TelnetArgument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetArgument::NAWSWindowSize(size) => write!(f, "NAWS {}", size),
            TelnetArgument::TerminalType(command) => write!(f, "TTYPE {}", command),
            TelnetArgument::TerminalSpeed(command) => write!(f, "TSPEED {}", command),
            TelnetArgument::Unknown(option, payload) => {
                write!(f, "{} [{} bytes]", option, payload.len())
            }
        }
    }
}
