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

use crate::consts;
use std::collections::{HashMap, HashSet};
use tracing::debug;

///
/// [Telnet Terminal Options](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
///
/// The canonical option table shared by both session roles. Anything outside the
/// named variants is carried as [`TelnetOption::Unknown`] and is always refused.
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// [`consts::option::ECHO`] Telnet Echo Option [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// [`consts::option::SGA`] Suppress Go ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// [`consts::option::TTYPE`] Terminal Type [RFC1091](https://tools.ietf.org/html/rfc1091)
    TerminalType,
    /// [`consts::option::NAWS`] Negotiate About Window Size [RFC1073](https://tools.ietf.org/html/rfc1073)
    NAWS,
    /// [`consts::option::TSPEED`] Terminal Speed [RFC1079](https://tools.ietf.org/html/rfc1079)
    TerminalSpeed,
    /// Unknown Option
    Unknown(u8),
}

impl TelnetOption {
    /// Wire code of this option.
    pub fn to_u8(&self) -> u8 {
        match self {
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::TerminalType => consts::option::TTYPE,
            TelnetOption::NAWS => consts::option::NAWS,
            TelnetOption::TerminalSpeed => consts::option::TSPEED,
            TelnetOption::Unknown(byte) => *byte,
        }
    }

    /// Maps a wire code onto the option table, falling back to [`TelnetOption::Unknown`].
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::TTYPE => TelnetOption::TerminalType,
            consts::option::NAWS => TelnetOption::NAWS,
            consts::option::TSPEED => TelnetOption::TerminalSpeed,
            byte => TelnetOption::Unknown(byte),
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::Echo => write!(f, "Echo"),
            TelnetOption::SuppressGoAhead => write!(f, "SuppressGoAhead"),
            TelnetOption::TerminalType => write!(f, "TerminalType"),
            TelnetOption::NAWS => write!(f, "NAWS"),
            TelnetOption::TerminalSpeed => write!(f, "TerminalSpeed"),
            TelnetOption::Unknown(byte) => write!(f, "Unknown({})", byte),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        TelnetOption::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

/// Live option state of one Telnet session.
///
/// Holds the immutable set of options this endpoint is willing to negotiate and the
/// mutable enabled flag for each of them. Every option starts disabled, and an option
/// outside the supported set can never become enabled.
#[derive(Clone, Debug, Default)]
pub struct NegotiationState {
    supported: HashSet<TelnetOption>,
    enabled: HashMap<TelnetOption, bool>,
}

impl NegotiationState {
    /// Creates a state with every option disabled.
    pub fn new<I>(supported: I) -> NegotiationState
    where
        I: IntoIterator<Item = TelnetOption>,
    {
        NegotiationState {
            supported: supported.into_iter().collect(),
            enabled: HashMap::new(),
        }
    }

    /// Whether this endpoint negotiates `option` at all.
    pub fn is_supported(&self, option: TelnetOption) -> bool {
        self.supported.contains(&option)
    }

    /// Whether `option` is currently active for the session.
    pub fn is_enabled(&self, option: TelnetOption) -> bool {
        self.enabled.get(&option).copied().unwrap_or(false)
    }

    /// Records a new enabled state, returning `true` if the state changed.
    ///
    /// Requests to enable an unsupported option are ignored.
    pub fn set_enabled(&mut self, option: TelnetOption, enabled: bool) -> bool {
        if enabled && !self.is_supported(option) {
            debug!("Refusing to enable unsupported option {}", option);
            return false;
        }
        let previous = self.enabled.insert(option, enabled).unwrap_or(false);
        previous != enabled
    }

    /// Options currently enabled, in no particular order.
    pub fn enabled_options(&self) -> impl Iterator<Item = TelnetOption> + '_ {
        self.enabled
            .iter()
            .filter_map(|(option, enabled)| enabled.then_some(*option))
    }
}
