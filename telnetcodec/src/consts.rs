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

//! Telnet command grammar: the RFC 854 command bytes and option codes.

/// End of subnegotiation parameters.
pub const SE: u8 = 240;
/// No operation.
pub const NOP: u8 = 241;
/// The data stream portion of a Synch.
pub const DM: u8 = 242;
/// NVT character BRK.
pub const BRK: u8 = 243;
/// Interrupt Process.
pub const IP: u8 = 244;
/// Abort Output.
pub const AO: u8 = 245;
/// Are You There.
pub const AYT: u8 = 246;
/// Erase Character.
pub const EC: u8 = 247;
/// Erase Line.
pub const EL: u8 = 248;
/// Go Ahead.
pub const GA: u8 = 249;
/// Subnegotiation Begin.
pub const SB: u8 = 250;
/// Sender wants to begin performing an option.
pub const WILL: u8 = 251;
/// Sender refuses to perform an option.
pub const WONT: u8 = 252;
/// Sender asks the receiver to perform an option.
pub const DO: u8 = 253;
/// Sender demands the receiver stop performing an option.
pub const DONT: u8 = 254;
/// Interpret As Command.
pub const IAC: u8 = 255;

/// Subnegotiation qualifier: the payload carries a value.
pub const IS: u8 = 0;
/// Subnegotiation qualifier: the payload requests a value.
pub const SEND: u8 = 1;

/// Option codes negotiated by this workspace.
pub mod option {
    /// Echo [RFC857](https://tools.ietf.org/html/rfc857)
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead [RFC858](https://tools.ietf.org/html/rfc858)
    pub const SGA: u8 = 3;
    /// Terminal Type [RFC1091](https://tools.ietf.org/html/rfc1091)
    pub const TTYPE: u8 = 24;
    /// Negotiate About Window Size [RFC1073](https://tools.ietf.org/html/rfc1073)
    pub const NAWS: u8 = 31;
    /// Terminal Speed [RFC1079](https://tools.ietf.org/html/rfc1079)
    pub const TSPEED: u8 = 32;
}

/// Returns `true` if `command` is a negotiation verb that must be followed by an option byte.
///
/// `SB` also carries an option byte but opens a subnegotiation span and is handled separately.
pub const fn needs_option(command: u8) -> bool {
    matches!(command, WILL | WONT | DO | DONT)
}

/// Human readable name of a command byte, used in log output.
pub fn command_name(command: u8) -> &'static str {
    match command {
        SE => "SE",
        NOP => "NOP",
        DM => "DM",
        BRK => "BRK",
        IP => "IP",
        AO => "AO",
        AYT => "AYT",
        EC => "EC",
        EL => "EL",
        GA => "GA",
        SB => "SB",
        WILL => "WILL",
        WONT => "WONT",
        DO => "DO",
        DONT => "DONT",
        IAC => "IAC",
        _ => "UNKNOWN",
    }
}
