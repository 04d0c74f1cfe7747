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

//! Per-role negotiation policy.
//!
//! A [`Resolver`] turns one received [`TelnetFrame`] into a [`Resolution`]: the reply
//! to send, the option's new enabled state, any follow-up frames and the side effects
//! the session must apply. Resolvers never mutate state themselves; the
//! [`crate::NegotiationEngine`] applies the resolution and enforces idempotence.

use crate::{
    NegotiationState, TelnetArgument, TelnetFrame, TelnetOption, TerminalSpeed,
    TerminalSpeedCommand, TerminalTypeCommand, WindowSize,
};
use tracing::{debug, trace};

/// Options the client role negotiates.
pub const CLIENT_OPTIONS: [TelnetOption; 5] = [
    TelnetOption::Echo,
    TelnetOption::SuppressGoAhead,
    TelnetOption::TerminalType,
    TelnetOption::NAWS,
    TelnetOption::TerminalSpeed,
];

/// Options the server role negotiates.
pub const SERVER_OPTIONS: [TelnetOption; 5] = [
    TelnetOption::Echo,
    TelnetOption::SuppressGoAhead,
    TelnetOption::TerminalType,
    TelnetOption::NAWS,
    TelnetOption::TerminalSpeed,
];

/// End-of-text, what a terminal sends for Ctrl-C.
pub const ETX: u8 = 0x03;
/// Delete, the default erase character.
pub const DEL: u8 = 0x7F;
/// Negative acknowledge, the default line-kill character.
pub const NAK: u8 = 0x15;

/// Something the session must do as a consequence of a negotiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEffect {
    /// The peer reported its window size.
    WindowSize(WindowSize),
    /// The peer settled its terminal type. The name is ready to be used as `TERM`.
    TerminalType(String),
    /// The peer reported its line speed.
    TerminalSpeed(TerminalSpeed),
}

/// Outcome of resolving one received frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Negotiation reply. Dropped when `enabled` equals the current state.
    pub reply: Option<TelnetFrame>,
    /// New enabled state of the frame's option, or `None` to leave it untouched.
    ///
    /// With `None` the reply is always sent.
    pub enabled: Option<bool>,
    /// Frames sent after the reply regardless of state, e.g. subnegotiation requests.
    pub followups: Vec<TelnetFrame>,
    /// Side effects for the session.
    pub effects: Vec<SessionEffect>,
    /// Bytes injected into the application data at the command's position.
    pub data: Vec<u8>,
}

impl Resolution {
    /// Nothing to send, nothing changes.
    pub fn ignore() -> Resolution {
        Resolution::default()
    }

    /// Sends `frame`, subject to the idempotence rule once a state is attached.
    pub fn reply(frame: TelnetFrame) -> Resolution {
        Resolution {
            reply: Some(frame),
            ..Resolution::default()
        }
    }

    /// Changes the option state without replying.
    pub fn state(enabled: bool) -> Resolution {
        Resolution {
            enabled: Some(enabled),
            ..Resolution::default()
        }
    }

    /// Sets the new enabled state.
    pub fn with_state(mut self, enabled: bool) -> Resolution {
        self.enabled = Some(enabled);
        self
    }

    /// Appends a frame that is never suppressed.
    pub fn with_followup(mut self, frame: TelnetFrame) -> Resolution {
        self.followups.push(frame);
        self
    }

    /// Appends a session effect.
    pub fn with_effect(mut self, effect: SessionEffect) -> Resolution {
        self.effects.push(effect);
        self
    }

    /// Injects bytes into the application data.
    pub fn with_data(mut self, data: &[u8]) -> Resolution {
        self.data.extend_from_slice(data);
        self
    }
}

/// Negotiation policy of one session role.
pub trait Resolver {
    /// Options this role is willing to negotiate.
    fn supported_options(&self) -> &[TelnetOption];

    /// Requests sent when the session starts.
    fn initial_requests(&self) -> Vec<TelnetFrame>;

    /// Decides how to answer a received frame.
    fn resolve(&self, state: &NegotiationState, frame: &TelnetFrame) -> Resolution;
}

/// The answers both roles share for a plain negotiation verb.
fn negotiate(state: &NegotiationState, frame: &TelnetFrame) -> Resolution {
    match frame {
        TelnetFrame::Will(option) if state.is_supported(*option) => {
            Resolution::reply(TelnetFrame::Do(*option)).with_state(true)
        }
        TelnetFrame::Will(option) => Resolution::reply(TelnetFrame::Dont(*option)),
        TelnetFrame::Wont(_) => Resolution::state(false),
        TelnetFrame::Do(option) if state.is_supported(*option) => {
            Resolution::reply(TelnetFrame::Will(*option)).with_state(true)
        }
        TelnetFrame::Do(option) => Resolution::reply(TelnetFrame::Wont(*option)),
        TelnetFrame::Dont(option) => {
            Resolution::reply(TelnetFrame::Dont(*option)).with_state(false)
        }
        _ => Resolution::ignore(),
    }
}

/// Normalises a terminal name for the wire: trimmed, upper case, `VT100` when empty.
pub fn wire_terminal_type(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        String::from("VT100")
    } else {
        name.to_ascii_uppercase()
    }
}

///
/// Client side negotiation: reports the local terminal to the server.
///
#[derive(Clone, Debug)]
pub struct ClientResolver {
    terminal_type: String,
    terminal_speed: TerminalSpeed,
    window_size: WindowSize,
}

impl ClientResolver {
    /// Creates a client resolver reporting the given terminal.
    pub fn new(
        terminal_type: &str,
        terminal_speed: TerminalSpeed,
        window_size: WindowSize,
    ) -> ClientResolver {
        ClientResolver {
            terminal_type: wire_terminal_type(terminal_type),
            terminal_speed,
            window_size,
        }
    }

    /// Terminal type as sent on the wire.
    pub fn terminal_type(&self) -> &str {
        &self.terminal_type
    }

    /// Window size reported on the next `DO NAWS`.
    pub fn window_size(&self) -> WindowSize {
        self.window_size
    }

    /// Records a new local window size.
    pub fn set_window_size(&mut self, window_size: WindowSize) {
        self.window_size = window_size;
    }

    /// Frame carrying the current window size.
    pub fn window_size_frame(&self) -> TelnetFrame {
        TelnetFrame::Subnegotiate(TelnetArgument::NAWSWindowSize(self.window_size))
    }
}

impl Default for ClientResolver {
    fn default() -> Self {
        ClientResolver::new("VT100", TerminalSpeed::default(), WindowSize::default())
    }
}

impl Resolver for ClientResolver {
    fn supported_options(&self) -> &[TelnetOption] {
        &CLIENT_OPTIONS
    }

    fn initial_requests(&self) -> Vec<TelnetFrame> {
        vec![
            TelnetFrame::Do(TelnetOption::Echo),
            TelnetFrame::Do(TelnetOption::SuppressGoAhead),
            TelnetFrame::Will(TelnetOption::TerminalType),
            TelnetFrame::Will(TelnetOption::NAWS),
            TelnetFrame::Will(TelnetOption::TerminalSpeed),
        ]
    }

    fn resolve(&self, state: &NegotiationState, frame: &TelnetFrame) -> Resolution {
        match frame {
            // The client never echoes for the server.
            TelnetFrame::Do(TelnetOption::Echo) => {
                Resolution::reply(TelnetFrame::Wont(TelnetOption::Echo))
            }
            TelnetFrame::Do(TelnetOption::NAWS) => {
                negotiate(state, frame).with_followup(self.window_size_frame())
            }
            TelnetFrame::Subnegotiate(TelnetArgument::TerminalType(TerminalTypeCommand::Send)) => {
                Resolution::ignore().with_followup(TelnetFrame::Subnegotiate(
                    TelnetArgument::TerminalType(TerminalTypeCommand::Is(
                        self.terminal_type.clone(),
                    )),
                ))
            }
            TelnetFrame::Subnegotiate(TelnetArgument::TerminalSpeed(
                TerminalSpeedCommand::Send,
            )) => Resolution::ignore().with_followup(TelnetFrame::Subnegotiate(
                TelnetArgument::TerminalSpeed(TerminalSpeedCommand::Is(self.terminal_speed)),
            )),
            TelnetFrame::Subnegotiate(argument) => {
                debug!("Client ignoring subnegotiation {}", argument);
                Resolution::ignore()
            }
            TelnetFrame::Will(_)
            | TelnetFrame::Wont(_)
            | TelnetFrame::Do(_)
            | TelnetFrame::Dont(_) => negotiate(state, frame),
            other => {
                trace!("Client ignoring {}", other);
                Resolution::ignore()
            }
        }
    }
}

///
/// Server side negotiation: learns the remote terminal and drives the pty.
///
#[derive(Clone, Debug)]
pub struct ServerResolver {
    default_terminal_type: String,
}

impl ServerResolver {
    /// Creates a server resolver that falls back to `default_terminal_type` when the
    /// client declines TERMINAL-TYPE.
    pub fn new(default_terminal_type: &str) -> ServerResolver {
        ServerResolver {
            default_terminal_type: default_terminal_type.to_ascii_lowercase(),
        }
    }

    /// `TERM` value used when the client does not report one.
    pub fn default_terminal_type(&self) -> &str {
        &self.default_terminal_type
    }
}

impl Default for ServerResolver {
    fn default() -> Self {
        ServerResolver::new("vt100")
    }
}

impl Resolver for ServerResolver {
    fn supported_options(&self) -> &[TelnetOption] {
        &SERVER_OPTIONS
    }

    fn initial_requests(&self) -> Vec<TelnetFrame> {
        vec![
            TelnetFrame::Will(TelnetOption::Echo),
            TelnetFrame::Will(TelnetOption::SuppressGoAhead),
            TelnetFrame::Do(TelnetOption::TerminalType),
            TelnetFrame::Do(TelnetOption::NAWS),
            TelnetFrame::Do(TelnetOption::TerminalSpeed),
        ]
    }

    fn resolve(&self, state: &NegotiationState, frame: &TelnetFrame) -> Resolution {
        match frame {
            // Refuse to give up echo; the remote may have forgotten it.
            TelnetFrame::Wont(TelnetOption::Echo) => {
                Resolution::reply(TelnetFrame::Will(TelnetOption::Echo))
            }
            TelnetFrame::Wont(TelnetOption::TerminalType) => negotiate(state, frame).with_effect(
                SessionEffect::TerminalType(self.default_terminal_type.clone()),
            ),
            TelnetFrame::Will(TelnetOption::TerminalType) => negotiate(state, frame)
                .with_followup(TelnetFrame::Subnegotiate(TelnetArgument::TerminalType(
                    TerminalTypeCommand::Send,
                ))),
            TelnetFrame::Will(TelnetOption::TerminalSpeed) => negotiate(state, frame)
                .with_followup(TelnetFrame::Subnegotiate(TelnetArgument::TerminalSpeed(
                    TerminalSpeedCommand::Send,
                ))),
            TelnetFrame::Will(_)
            | TelnetFrame::Wont(_)
            | TelnetFrame::Do(_)
            | TelnetFrame::Dont(_) => negotiate(state, frame),
            TelnetFrame::Subnegotiate(TelnetArgument::NAWSWindowSize(size)) => {
                Resolution::ignore().with_effect(SessionEffect::WindowSize(*size))
            }
            TelnetFrame::Subnegotiate(TelnetArgument::TerminalType(TerminalTypeCommand::Is(
                name,
            ))) => {
                let name = name.trim();
                let term = if name.is_empty() {
                    self.default_terminal_type.clone()
                } else {
                    name.to_ascii_lowercase()
                };
                Resolution::ignore().with_effect(SessionEffect::TerminalType(term))
            }
            TelnetFrame::Subnegotiate(TelnetArgument::TerminalSpeed(
                TerminalSpeedCommand::Is(speed),
            )) => Resolution::ignore().with_effect(SessionEffect::TerminalSpeed(*speed)),
            TelnetFrame::Subnegotiate(argument) => {
                debug!("Server ignoring subnegotiation {}", argument);
                Resolution::ignore()
            }
            TelnetFrame::InterruptProcess | TelnetFrame::Break => {
                Resolution::ignore().with_data(&[ETX])
            }
            TelnetFrame::EraseCharacter => Resolution::ignore().with_data(&[DEL]),
            TelnetFrame::EraseLine => Resolution::ignore().with_data(&[NAK]),
            TelnetFrame::AreYouThere => b"\r\n[Yes]\r\n"
                .iter()
                .fold(Resolution::ignore(), |resolution, byte| {
                    resolution.with_followup(TelnetFrame::Data(*byte))
                }),
            other => {
                trace!("Server ignoring {}", other);
                Resolution::ignore()
            }
        }
    }
}

/// The two session roles, chosen once when a session is constructed.
#[derive(Clone, Debug)]
pub enum Role {
    /// Interactive client attached to a local terminal.
    Client(ClientResolver),
    /// Server attached to a pty running a login program.
    Server(ServerResolver),
}

impl Role {
    /// Whether this is the server role.
    pub fn is_server(&self) -> bool {
        matches!(self, Role::Server(_))
    }
}

impl Resolver for Role {
    fn supported_options(&self) -> &[TelnetOption] {
        match self {
            Role::Client(resolver) => resolver.supported_options(),
            Role::Server(resolver) => resolver.supported_options(),
        }
    }

    fn initial_requests(&self) -> Vec<TelnetFrame> {
        match self {
            Role::Client(resolver) => resolver.initial_requests(),
            Role::Server(resolver) => resolver.initial_requests(),
        }
    }

    fn resolve(&self, state: &NegotiationState, frame: &TelnetFrame) -> Resolution {
        match self {
            Role::Client(resolver) => resolver.resolve(state, frame),
            Role::Server(resolver) => resolver.resolve(state, frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_state() -> NegotiationState {
        NegotiationState::new(CLIENT_OPTIONS)
    }

    fn server_state() -> NegotiationState {
        NegotiationState::new(SERVER_OPTIONS)
    }

    // ============================================================================
    // Shared negotiation table
    // ============================================================================

    #[test]
    fn test_will_supported_replies_do() {
        let resolution = ServerResolver::default()
            .resolve(&server_state(), &TelnetFrame::Will(TelnetOption::NAWS));
        assert_eq!(resolution.reply, Some(TelnetFrame::Do(TelnetOption::NAWS)));
        assert_eq!(resolution.enabled, Some(true));
    }

    #[test]
    fn test_unsupported_options_are_refused() {
        let option = TelnetOption::Unknown(42);
        for role in [
            Role::Client(ClientResolver::default()),
            Role::Server(ServerResolver::default()),
        ] {
            let state = NegotiationState::new(role.supported_options().to_vec());
            let will = role.resolve(&state, &TelnetFrame::Will(option));
            assert_eq!(will.reply, Some(TelnetFrame::Dont(option)));
            assert_eq!(will.enabled, None);
            let does = role.resolve(&state, &TelnetFrame::Do(option));
            assert_eq!(does.reply, Some(TelnetFrame::Wont(option)));
            assert_eq!(does.enabled, None);
        }
    }

    #[test]
    fn test_dont_replies_dont_and_disables() {
        let resolution = ClientResolver::default()
            .resolve(&client_state(), &TelnetFrame::Dont(TelnetOption::NAWS));
        assert_eq!(resolution.reply, Some(TelnetFrame::Dont(TelnetOption::NAWS)));
        assert_eq!(resolution.enabled, Some(false));
    }

    #[test]
    fn test_wont_disables_without_reply() {
        let resolution = ClientResolver::default().resolve(
            &client_state(),
            &TelnetFrame::Wont(TelnetOption::SuppressGoAhead),
        );
        assert_eq!(resolution, Resolution::state(false));
    }

    // ============================================================================
    // Client role
    // ============================================================================

    #[test]
    fn test_client_refuses_to_echo() {
        let resolution = ClientResolver::default()
            .resolve(&client_state(), &TelnetFrame::Do(TelnetOption::Echo));
        assert_eq!(resolution.reply, Some(TelnetFrame::Wont(TelnetOption::Echo)));
        assert_eq!(resolution.enabled, None);
    }

    #[test]
    fn test_client_do_naws_reports_size() {
        let resolver = ClientResolver::new("xterm", TerminalSpeed::default(), WindowSize::new(120, 40));
        let resolution = resolver.resolve(&client_state(), &TelnetFrame::Do(TelnetOption::NAWS));
        assert_eq!(resolution.reply, Some(TelnetFrame::Will(TelnetOption::NAWS)));
        assert_eq!(
            resolution.followups,
            vec![TelnetFrame::Subnegotiate(TelnetArgument::NAWSWindowSize(
                WindowSize::new(120, 40)
            ))]
        );
    }

    #[test]
    fn test_client_answers_ttype_send_in_upper_case() {
        let resolver = ClientResolver::new("xterm-256color", TerminalSpeed::default(), WindowSize::default());
        let resolution = resolver.resolve(
            &client_state(),
            &TelnetFrame::Subnegotiate(TelnetArgument::TerminalType(TerminalTypeCommand::Send)),
        );
        assert_eq!(
            resolution.followups,
            vec![TelnetFrame::Subnegotiate(TelnetArgument::TerminalType(
                TerminalTypeCommand::Is("XTERM-256COLOR".into())
            ))]
        );
    }

    #[test]
    fn test_client_answers_tspeed_send() {
        let resolver = ClientResolver::default();
        let resolution = resolver.resolve(
            &client_state(),
            &TelnetFrame::Subnegotiate(TelnetArgument::TerminalSpeed(TerminalSpeedCommand::Send)),
        );
        assert_eq!(
            resolution.followups,
            vec![TelnetFrame::Subnegotiate(TelnetArgument::TerminalSpeed(
                TerminalSpeedCommand::Is(TerminalSpeed::new(38400, 38400))
            ))]
        );
    }

    #[test]
    fn test_wire_terminal_type() {
        assert_eq!(wire_terminal_type(" xterm "), "XTERM");
        assert_eq!(wire_terminal_type(""), "VT100");
    }

    // ============================================================================
    // Server role
    // ============================================================================

    #[test]
    fn test_server_reasserts_echo() {
        let resolution = ServerResolver::default()
            .resolve(&server_state(), &TelnetFrame::Wont(TelnetOption::Echo));
        assert_eq!(resolution.reply, Some(TelnetFrame::Will(TelnetOption::Echo)));
        assert_eq!(resolution.enabled, None);
    }

    #[test]
    fn test_server_requests_terminal_type() {
        let resolution = ServerResolver::default().resolve(
            &server_state(),
            &TelnetFrame::Will(TelnetOption::TerminalType),
        );
        assert_eq!(
            resolution.followups,
            vec![TelnetFrame::Subnegotiate(TelnetArgument::TerminalType(
                TerminalTypeCommand::Send
            ))]
        );
    }

    #[test]
    fn test_server_falls_back_to_default_type() {
        let resolution = ServerResolver::new("VT220").resolve(
            &server_state(),
            &TelnetFrame::Wont(TelnetOption::TerminalType),
        );
        assert_eq!(
            resolution.effects,
            vec![SessionEffect::TerminalType("vt220".into())]
        );
    }

    #[test]
    fn test_server_lowercases_reported_type() {
        let resolution = ServerResolver::default().resolve(
            &server_state(),
            &TelnetFrame::Subnegotiate(TelnetArgument::TerminalType(TerminalTypeCommand::Is(
                "XTERM".into(),
            ))),
        );
        assert_eq!(
            resolution.effects,
            vec![SessionEffect::TerminalType("xterm".into())]
        );
    }

    #[test]
    fn test_server_control_commands() {
        let resolver = ServerResolver::default();
        let state = server_state();
        assert_eq!(
            resolver.resolve(&state, &TelnetFrame::InterruptProcess).data,
            vec![ETX]
        );
        assert_eq!(
            resolver.resolve(&state, &TelnetFrame::EraseCharacter).data,
            vec![DEL]
        );
        let ayt = resolver.resolve(&state, &TelnetFrame::AreYouThere);
        assert_eq!(ayt.followups.len(), 9);
        assert!(resolver.resolve(&state, &TelnetFrame::NoOperation) == Resolution::ignore());
    }
}
