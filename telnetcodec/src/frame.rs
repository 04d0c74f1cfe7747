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

use crate::{TelnetArgument, TelnetCodecResult, TelnetOption, consts};
use bytes::BufMut;
use std::borrow::Cow;

///
/// A single Telnet command or data byte, as received from or sent to the peer.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetFrame {
    /// A literal data byte. `0xFF` is doubled when encoded.
    Data(u8),
    /// `IAC NOP`
    NoOperation,
    /// `IAC DM`
    DataMark,
    /// `IAC BRK`
    Break,
    /// `IAC IP`
    InterruptProcess,
    /// `IAC AO`
    AbortOutput,
    /// `IAC AYT`
    AreYouThere,
    /// `IAC EC`
    EraseCharacter,
    /// `IAC EL`
    EraseLine,
    /// `IAC GA`
    GoAhead,
    /// `IAC DO <option>`
    Do(TelnetOption),
    /// `IAC DONT <option>`
    Dont(TelnetOption),
    /// `IAC WILL <option>`
    Will(TelnetOption),
    /// `IAC WONT <option>`
    Wont(TelnetOption),
    /// `IAC SB <option> <payload> IAC SE`
    Subnegotiate(TelnetArgument),
}

impl TelnetFrame {
    /// Maps an option-less command byte onto its frame.
    pub fn from_command(command: u8) -> Option<TelnetFrame> {
        match command {
            consts::NOP => Some(TelnetFrame::NoOperation),
            consts::DM => Some(TelnetFrame::DataMark),
            consts::BRK => Some(TelnetFrame::Break),
            consts::IP => Some(TelnetFrame::InterruptProcess),
            consts::AO => Some(TelnetFrame::AbortOutput),
            consts::AYT => Some(TelnetFrame::AreYouThere),
            consts::EC => Some(TelnetFrame::EraseCharacter),
            consts::EL => Some(TelnetFrame::EraseLine),
            consts::GA => Some(TelnetFrame::GoAhead),
            _ => None,
        }
    }

    /// Builds a negotiation frame from a verb byte and option.
    pub fn negotiation(verb: u8, option: TelnetOption) -> Option<TelnetFrame> {
        match verb {
            consts::DO => Some(TelnetFrame::Do(option)),
            consts::DONT => Some(TelnetFrame::Dont(option)),
            consts::WILL => Some(TelnetFrame::Will(option)),
            consts::WONT => Some(TelnetFrame::Wont(option)),
            _ => None,
        }
    }

    /// The option a negotiation or subnegotiation frame refers to.
    pub fn option(&self) -> Option<TelnetOption> {
        match self {
            TelnetFrame::Do(option)
            | TelnetFrame::Dont(option)
            | TelnetFrame::Will(option)
            | TelnetFrame::Wont(option) => Some(*option),
            TelnetFrame::Subnegotiate(argument) => Some(argument.option()),
            _ => None,
        }
    }

    /// Writes the wire form of this frame, returning the number of bytes written.
    pub fn encode<T: BufMut>(&self, dst: &mut T) -> TelnetCodecResult<usize> {
        let command = |dst: &mut T, command: u8| {
            dst.put_u8(consts::IAC);
            dst.put_u8(command);
            2
        };
        let negotiate = |dst: &mut T, verb: u8, option: &TelnetOption| {
            dst.put_u8(consts::IAC);
            dst.put_u8(verb);
            dst.put_u8(option.to_u8());
            3
        };
        Ok(match self {
            TelnetFrame::Data(consts::IAC) => command(dst, consts::IAC),
            TelnetFrame::Data(byte) => {
                dst.put_u8(*byte);
                1
            }
            TelnetFrame::NoOperation => command(dst, consts::NOP),
            TelnetFrame::DataMark => command(dst, consts::DM),
            TelnetFrame::Break => command(dst, consts::BRK),
            TelnetFrame::InterruptProcess => command(dst, consts::IP),
            TelnetFrame::AbortOutput => command(dst, consts::AO),
            TelnetFrame::AreYouThere => command(dst, consts::AYT),
            TelnetFrame::EraseCharacter => command(dst, consts::EC),
            TelnetFrame::EraseLine => command(dst, consts::EL),
            TelnetFrame::GoAhead => command(dst, consts::GA),
            TelnetFrame::Do(option) => negotiate(dst, consts::DO, option),
            TelnetFrame::Dont(option) => negotiate(dst, consts::DONT, option),
            TelnetFrame::Will(option) => negotiate(dst, consts::WILL, option),
            TelnetFrame::Wont(option) => negotiate(dst, consts::WONT, option),
            TelnetFrame::Subnegotiate(argument) => {
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SB);
                dst.put_u8(argument.option().to_u8());
                let payload = argument.encode(dst)?;
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SE);
                payload + 5
            }
        })
    }
}

impl std::fmt::Display for TelnetFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetFrame::Data(byte) => write!(f, "Data({:#04X})", byte),
            TelnetFrame::NoOperation => write!(f, "IAC NOP"),
            TelnetFrame::DataMark => write!(f, "IAC DM"),
            TelnetFrame::Break => write!(f, "IAC BRK"),
            TelnetFrame::InterruptProcess => write!(f, "IAC IP"),
            TelnetFrame::AbortOutput => write!(f, "IAC AO"),
            TelnetFrame::AreYouThere => write!(f, "IAC AYT"),
            TelnetFrame::EraseCharacter => write!(f, "IAC EC"),
            TelnetFrame::EraseLine => write!(f, "IAC EL"),
            TelnetFrame::GoAhead => write!(f, "IAC GA"),
            TelnetFrame::Do(option) => write!(f, "IAC DO {}", option),
            TelnetFrame::Dont(option) => write!(f, "IAC DONT {}", option),
            TelnetFrame::Will(option) => write!(f, "IAC WILL {}", option),
            TelnetFrame::Wont(option) => write!(f, "IAC WONT {}", option),
            TelnetFrame::Subnegotiate(argument) => write!(f, "IAC SB {} IAC SE", argument),
        }
    }
}

/// Doubles every `IAC` in outbound application data.
///
/// Borrows the input unchanged when it contains no `IAC`, which is the common case for
/// shell output and keystrokes.
pub fn escape_iac(data: &[u8]) -> Cow<'_, [u8]> {
    if !data.contains(&consts::IAC) {
        return Cow::Borrowed(data);
    }
    let mut escaped = Vec::with_capacity(data.len() + 8);
    for &byte in data {
        if byte == consts::IAC {
            escaped.push(consts::IAC);
        }
        escaped.push(byte);
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TerminalTypeCommand, WindowSize};
    use bytes::BytesMut;

    fn encoded(frame: TelnetFrame) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let written = frame.encode(&mut buf).unwrap();
        assert_eq!(written, buf.len());
        buf.to_vec()
    }

    #[test]
    fn test_encode_negotiation() {
        assert_eq!(encoded(TelnetFrame::Do(TelnetOption::Echo)), vec![255, 253, 1]);
        assert_eq!(
            encoded(TelnetFrame::Wont(TelnetOption::Unknown(99))),
            vec![255, 252, 99]
        );
    }

    #[test]
    fn test_encode_naws_subnegotiation() {
        let frame = TelnetFrame::Subnegotiate(TelnetArgument::NAWSWindowSize(WindowSize::new(
            80, 24,
        )));
        assert_eq!(encoded(frame), vec![255, 250, 31, 0, 80, 0, 24, 255, 240]);
    }

    #[test]
    fn test_encode_ttype_send() {
        let frame = TelnetFrame::Subnegotiate(TelnetArgument::TerminalType(
            TerminalTypeCommand::Send,
        ));
        assert_eq!(encoded(frame), vec![255, 250, 24, 1, 255, 240]);
    }

    #[test]
    fn test_encode_data_escapes_iac() {
        assert_eq!(encoded(TelnetFrame::Data(b'a')), vec![b'a']);
        assert_eq!(encoded(TelnetFrame::Data(0xFF)), vec![0xFF, 0xFF]);
    }

    #[test]
    fn test_command_and_negotiation_lookup() {
        assert_eq!(
            TelnetFrame::from_command(consts::AYT),
            Some(TelnetFrame::AreYouThere)
        );
        assert_eq!(TelnetFrame::from_command(consts::SB), None);
        assert_eq!(
            TelnetFrame::negotiation(consts::WILL, TelnetOption::NAWS),
            Some(TelnetFrame::Will(TelnetOption::NAWS))
        );
        assert_eq!(TelnetFrame::negotiation(consts::SE, TelnetOption::NAWS), None);
    }

    #[test]
    fn test_escape_iac() {
        assert!(matches!(escape_iac(b"plain"), Cow::Borrowed(_)));
        assert_eq!(escape_iac(&[1, 0xFF, 2]).as_ref(), &[1, 0xFF, 0xFF, 2]);
    }
}
