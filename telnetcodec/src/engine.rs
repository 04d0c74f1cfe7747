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

use crate::resolver::{Resolver, Role, SessionEffect};
use crate::{
    NegotiationState, TelnetArgument, TelnetCodecError, TelnetCodecResult, TelnetFrame,
    TelnetOption, WindowSize, consts,
};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::{debug, trace, warn};

/// Result of scanning one inbound buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inbound {
    /// Application data with every command and subnegotiation removed.
    pub data: BytesMut,
    /// Encoded replies that must reach the peer before `data` is delivered.
    pub responses: BytesMut,
    /// Side effects, in the order their commands appeared.
    pub effects: Vec<SessionEffect>,
}

impl Inbound {
    /// `true` when the buffer held nothing but commands that needed no reaction.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.responses.is_empty() && self.effects.is_empty()
    }
}

///
/// Telnet option negotiation engine.
///
/// Separates commands from application data in a raw inbound stream, resolves each
/// command through the session's [`Role`] and keeps the [`NegotiationState`]. Parser
/// state survives between calls, so a command split across two reads (including a
/// lone trailing `IAC`) completes on the next call.
///
/// # Example
/// ```
/// use teletty_telnetcodec::{NegotiationEngine, Role, ServerResolver, TelnetOption};
///
/// let mut engine = NegotiationEngine::new(Role::Server(ServerResolver::default()));
/// let inbound = engine.process_inbound(&[255, 251, 3, b'A', b'B']).unwrap();
/// assert_eq!(&inbound.data[..], b"AB");
/// assert_eq!(&inbound.responses[..], &[255, 253, 3]);
/// assert!(engine.is_enabled(TelnetOption::SuppressGoAhead));
/// ```
pub struct NegotiationEngine {
    role: Role,
    state: NegotiationState,
    decoder_state: DecoderState,
    decoder_buffer: BytesMut,
}

impl NegotiationEngine {
    /// Creates an engine for `role` with every option disabled.
    pub fn new(role: Role) -> NegotiationEngine {
        let state = NegotiationState::new(role.supported_options().iter().copied());
        NegotiationEngine {
            role,
            state,
            decoder_state: DecoderState::NormalData,
            decoder_buffer: BytesMut::new(),
        }
    }

    /// The session role.
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// The live option state.
    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    /// Whether `option` is currently enabled.
    pub fn is_enabled(&self, option: TelnetOption) -> bool {
        self.state.is_enabled(option)
    }

    /// `true` while a command or subnegotiation is waiting for more input.
    pub fn is_mid_command(&self) -> bool {
        self.decoder_state != DecoderState::NormalData
    }

    /// Encodes the role's session-start requests and marks each requested option enabled,
    /// so the peer's confirmation is absorbed by the idempotence rule.
    pub fn initial_requests(&mut self) -> TelnetCodecResult<BytesMut> {
        let mut dst = BytesMut::new();
        for frame in self.role.initial_requests() {
            if let Some(option) = frame.option() {
                self.state.set_enabled(option, true);
            }
            debug!("Requesting {}", frame);
            self.encode(frame, &mut dst)?;
        }
        Ok(dst)
    }

    /// Records a new local window size and, when NAWS is enabled, encodes the report.
    ///
    /// Only meaningful for the client role; the server returns `None`.
    pub fn report_window_size(&mut self, size: WindowSize) -> TelnetCodecResult<Option<BytesMut>> {
        let frame = match &mut self.role {
            Role::Client(resolver) => {
                resolver.set_window_size(size);
                resolver.window_size_frame()
            }
            Role::Server(_) => return Ok(None),
        };
        if !self.state.is_enabled(TelnetOption::NAWS) {
            trace!("NAWS not enabled, holding window size {}", size);
            return Ok(None);
        }
        let mut dst = BytesMut::new();
        self.encode(frame, &mut dst)?;
        Ok(Some(dst))
    }

    /// Scans one raw inbound buffer.
    ///
    /// Literal bytes are collected into [`Inbound::data`]. Every command is resolved
    /// and its replies are appended to [`Inbound::responses`]. Subnegotiation payloads
    /// never reach the data, and a malformed payload is logged and skipped.
    pub fn process_inbound(&mut self, raw: &[u8]) -> TelnetCodecResult<Inbound> {
        let mut inbound = Inbound {
            data: BytesMut::with_capacity(raw.len()),
            ..Inbound::default()
        };
        for &byte in raw {
            match (self.decoder_state, byte) {
                (DecoderState::NormalData, consts::IAC) => {
                    self.decoder_state = DecoderState::InterpretAsCommand;
                }
                (DecoderState::NormalData, _) => {
                    inbound.data.put_u8(byte);
                }
                (DecoderState::InterpretAsCommand, _) => {
                    self.interpret_command(byte, &mut inbound)?;
                }
                (DecoderState::Negotiate(verb), _) => {
                    self.decoder_state = DecoderState::NormalData;
                    if let Some(frame) = TelnetFrame::negotiation(verb, TelnetOption::from_u8(byte))
                    {
                        self.dispatch(frame, &mut inbound)?;
                    }
                }
                (DecoderState::Subnegotiate, _) => {
                    self.decoder_buffer.clear();
                    self.decoder_state = DecoderState::SubnegotiateArgument(byte);
                }
                (DecoderState::SubnegotiateArgument(option), consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateArgumentIAC(option);
                }
                (DecoderState::SubnegotiateArgument(_), _) => {
                    self.decoder_buffer.put_u8(byte);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateArgument(option);
                    self.decoder_buffer.put_u8(consts::IAC);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::SE) => {
                    self.decoder_state = DecoderState::NormalData;
                    self.finish_subnegotiation(option, &mut inbound)?;
                }
                (DecoderState::SubnegotiateArgumentIAC(option), _) => {
                    // Missing SE: drop the span and treat the byte as a fresh command.
                    warn!(
                        "Unterminated subnegotiation for {}, discarding {} bytes",
                        TelnetOption::from_u8(option),
                        self.decoder_buffer.len()
                    );
                    self.decoder_buffer.clear();
                    self.interpret_command(byte, &mut inbound)?;
                }
            }
        }
        Ok(inbound)
    }

    /// Handles the byte following an `IAC` outside a subnegotiation.
    fn interpret_command(&mut self, byte: u8, inbound: &mut Inbound) -> TelnetCodecResult<()> {
        self.decoder_state = DecoderState::NormalData;
        match byte {
            consts::IAC => inbound.data.put_u8(consts::IAC),
            consts::SB => self.decoder_state = DecoderState::Subnegotiate,
            consts::SE => warn!("Received SE outside of a subnegotiation"),
            verb if consts::needs_option(verb) => {
                self.decoder_state = DecoderState::Negotiate(verb);
            }
            command => match TelnetFrame::from_command(command) {
                Some(frame) => self.dispatch(frame, inbound)?,
                None => warn!("Received Unknown Command {:#X}", command),
            },
        }
        Ok(())
    }

    fn finish_subnegotiation(&mut self, option: u8, inbound: &mut Inbound) -> TelnetCodecResult<()> {
        let option = TelnetOption::from_u8(option);
        let payload = self.decoder_buffer.split();
        match TelnetArgument::parse(option, &payload) {
            Ok(argument) => self.dispatch(TelnetFrame::Subnegotiate(argument), inbound),
            Err(error) => {
                warn!("Skipping subnegotiation: {}", error);
                Ok(())
            }
        }
    }

    /// Resolves one frame and applies the outcome under the idempotence rule.
    fn dispatch(&mut self, frame: TelnetFrame, inbound: &mut Inbound) -> TelnetCodecResult<()> {
        trace!("Received {}", frame);
        let resolution = self.role.resolve(&self.state, &frame);

        let mut send_reply = true;
        if let (Some(option), Some(enabled)) = (frame.option(), resolution.enabled) {
            if self.state.is_enabled(option) == enabled {
                send_reply = false;
            } else {
                self.state.set_enabled(option, enabled);
                debug!(
                    "Option {} {}",
                    option,
                    if enabled { "enabled" } else { "disabled" }
                );
            }
        }
        if let Some(reply) = resolution.reply {
            if send_reply {
                trace!("Replying {}", reply);
                self.encode(reply, &mut inbound.responses)?;
            } else {
                trace!("Suppressing {}, state unchanged", reply);
            }
        }
        for followup in resolution.followups {
            self.encode(followup, &mut inbound.responses)?;
        }
        inbound.data.extend_from_slice(&resolution.data);
        inbound.effects.extend(resolution.effects);
        Ok(())
    }
}

impl Encoder<TelnetFrame> for NegotiationEngine {
    type Error = TelnetCodecError;

    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst)?;
        Ok(())
    }
}

impl std::fmt::Debug for NegotiationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiationEngine")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("decoder_state", &self.decoder_state)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DecoderState {
    NormalData,
    InterpretAsCommand,
    Negotiate(u8),
    Subnegotiate,
    SubnegotiateArgument(u8),
    SubnegotiateArgumentIAC(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{DO, DONT, IAC, SB, SE, WILL, WONT};
    use crate::{ClientResolver, ServerResolver, TerminalSpeed};
    use tracing_test::traced_test;

    const NAWS: u8 = consts::option::NAWS;
    const ECHO: u8 = consts::option::ECHO;
    const SGA: u8 = consts::option::SGA;
    const TTYPE: u8 = consts::option::TTYPE;
    const TSPEED: u8 = consts::option::TSPEED;

    fn server() -> NegotiationEngine {
        NegotiationEngine::new(Role::Server(ServerResolver::default()))
    }

    fn client() -> NegotiationEngine {
        NegotiationEngine::new(Role::Client(ClientResolver::new(
            "xterm",
            TerminalSpeed::default(),
            WindowSize::new(80, 24),
        )))
    }

    // ============================================================================
    // Data Stream Tests
    // ============================================================================

    #[test]
    fn test_plain_data_passes_through() {
        let mut engine = server();
        let inbound = engine.process_inbound(b"hello\r\n").unwrap();
        assert_eq!(&inbound.data[..], b"hello\r\n");
        assert!(inbound.responses.is_empty());
    }

    #[test]
    fn test_escaped_iac_is_literal_data() {
        let mut engine = server();
        let inbound = engine.process_inbound(&[b'a', IAC, IAC, b'b']).unwrap();
        assert_eq!(&inbound.data[..], &[b'a', 0xFF, b'b']);
    }

    #[test]
    fn test_will_then_data() {
        let mut engine = server();
        let inbound = engine
            .process_inbound(&[IAC, WILL, SGA, b'A', b'B'])
            .unwrap();
        assert_eq!(&inbound.responses[..], &[IAC, DO, SGA]);
        assert_eq!(&inbound.data[..], b"AB");
        assert!(engine.is_enabled(TelnetOption::SuppressGoAhead));
    }

    // ============================================================================
    // Split Sequence Tests
    // ============================================================================

    #[test]
    fn test_trailing_iac_waits_for_next_read() {
        let mut engine = server();
        let first = engine.process_inbound(&[b'x', IAC]).unwrap();
        assert_eq!(&first.data[..], b"x");
        assert!(first.responses.is_empty());
        assert!(engine.is_mid_command());

        let second = engine.process_inbound(&[WILL, NAWS, b'y']).unwrap();
        assert_eq!(&second.data[..], b"y");
        assert_eq!(&second.responses[..], &[IAC, DO, NAWS]);
        assert!(!engine.is_mid_command());
    }

    #[test]
    fn test_negotiation_split_before_option() {
        let mut engine = server();
        assert!(engine.process_inbound(&[IAC, DO]).unwrap().is_empty());
        let inbound = engine.process_inbound(&[SGA]).unwrap();
        assert_eq!(&inbound.responses[..], &[IAC, WILL, SGA]);
    }

    #[test]
    fn test_subnegotiation_split_across_reads() {
        let mut engine = server();
        let first = engine.process_inbound(&[IAC, SB, NAWS, 0, 100]).unwrap();
        assert!(first.is_empty());
        let second = engine
            .process_inbound(&[0, 30, IAC, SE, b'z'])
            .unwrap();
        assert_eq!(&second.data[..], b"z");
        assert_eq!(
            second.effects,
            vec![SessionEffect::WindowSize(WindowSize::new(100, 30))]
        );
    }

    #[test]
    fn test_split_iac_inside_subnegotiation() {
        let mut engine = server();
        engine.process_inbound(&[IAC, SB, NAWS, 0, 80, 0, 24, IAC]).unwrap();
        let inbound = engine.process_inbound(&[SE]).unwrap();
        assert_eq!(
            inbound.effects,
            vec![SessionEffect::WindowSize(WindowSize::new(80, 24))]
        );
    }

    // ============================================================================
    // Idempotence Tests
    // ============================================================================

    #[test]
    fn test_repeated_will_answered_once() {
        let mut engine = server();
        let first = engine.process_inbound(&[IAC, WILL, NAWS]).unwrap();
        assert_eq!(&first.responses[..], &[IAC, DO, NAWS]);
        let second = engine.process_inbound(&[IAC, WILL, NAWS]).unwrap();
        assert!(second.responses.is_empty());
    }

    #[test]
    fn test_repeated_dont_answered_once() {
        let mut engine = client();
        engine.initial_requests().unwrap();
        let first = engine.process_inbound(&[IAC, DONT, NAWS]).unwrap();
        assert_eq!(&first.responses[..], &[IAC, DONT, NAWS]);
        assert!(!engine.is_enabled(TelnetOption::NAWS));
        let second = engine.process_inbound(&[IAC, DONT, NAWS]).unwrap();
        assert!(second.responses.is_empty());
    }

    #[test]
    fn test_server_always_reasserts_echo() {
        let mut engine = server();
        engine.initial_requests().unwrap();
        for _ in 0..2 {
            let inbound = engine.process_inbound(&[IAC, WONT, ECHO]).unwrap();
            assert_eq!(&inbound.responses[..], &[IAC, WILL, ECHO]);
            assert!(engine.is_enabled(TelnetOption::Echo));
        }
    }

    #[test]
    fn test_unsupported_option_refused_every_time() {
        let mut engine = client();
        for _ in 0..2 {
            let inbound = engine.process_inbound(&[IAC, WILL, 200, IAC, DO, 200]).unwrap();
            assert_eq!(&inbound.responses[..], &[IAC, DONT, 200, IAC, WONT, 200]);
        }
        assert!(!engine.is_enabled(TelnetOption::Unknown(200)));
    }

    // ============================================================================
    // Session Start Tests
    // ============================================================================

    #[test]
    fn test_server_initial_requests() {
        let mut engine = server();
        let requests = engine.initial_requests().unwrap();
        assert_eq!(
            &requests[..],
            &[
                IAC, WILL, ECHO, IAC, WILL, SGA, IAC, DO, TTYPE, IAC, DO, NAWS, IAC, DO, TSPEED
            ]
        );
        assert!(engine.is_enabled(TelnetOption::Echo));
        assert!(engine.is_enabled(TelnetOption::TerminalSpeed));
    }

    #[test]
    fn test_confirmation_of_request_is_absorbed() {
        let mut engine = server();
        engine.initial_requests().unwrap();
        let inbound = engine
            .process_inbound(&[IAC, DO, ECHO, IAC, DO, SGA, IAC, WILL, NAWS])
            .unwrap();
        assert!(inbound.responses.is_empty());
    }

    #[test]
    fn test_server_asks_for_terminal_type_after_will() {
        let mut engine = server();
        engine.initial_requests().unwrap();
        let inbound = engine.process_inbound(&[IAC, WILL, TTYPE]).unwrap();
        assert_eq!(&inbound.responses[..], &[IAC, SB, TTYPE, 1, IAC, SE]);
    }

    #[test]
    fn test_client_answers_server_handshake() {
        let mut engine = client();
        engine.initial_requests().unwrap();
        let inbound = engine
            .process_inbound(&[IAC, DO, NAWS, IAC, SB, TTYPE, 1, IAC, SE])
            .unwrap();
        let mut expected = vec![IAC, SB, NAWS, 0, 80, 0, 24, IAC, SE];
        expected.extend_from_slice(&[IAC, SB, TTYPE, 0]);
        expected.extend_from_slice(b"XTERM");
        expected.extend_from_slice(&[IAC, SE]);
        assert_eq!(&inbound.responses[..], &expected[..]);
    }

    // ============================================================================
    // Window Size Reports
    // ============================================================================

    #[test]
    fn test_report_window_size_requires_naws() {
        let mut engine = client();
        assert_eq!(engine.report_window_size(WindowSize::new(100, 50)).unwrap(), None);
        engine.process_inbound(&[IAC, DO, NAWS]).unwrap();
        let report = engine
            .report_window_size(WindowSize::new(100, 50))
            .unwrap()
            .unwrap();
        assert_eq!(&report[..], &[IAC, SB, NAWS, 0, 100, 0, 50, IAC, SE]);
    }

    #[test]
    fn test_server_does_not_report_window_size() {
        let mut engine = server();
        engine.initial_requests().unwrap();
        assert_eq!(engine.report_window_size(WindowSize::default()).unwrap(), None);
    }

    // ============================================================================
    // Malformation Tests
    // ============================================================================

    #[test]
    #[traced_test]
    fn test_malformed_naws_is_skipped() {
        let mut engine = server();
        let inbound = engine
            .process_inbound(&[IAC, SB, NAWS, 0, 80, 0, IAC, SE, b'k'])
            .unwrap();
        assert!(inbound.effects.is_empty());
        assert_eq!(&inbound.data[..], b"k");
        assert!(logs_contain("Skipping subnegotiation"));
    }

    #[test]
    fn test_unterminated_subnegotiation_recovers() {
        let mut engine = server();
        let inbound = engine
            .process_inbound(&[IAC, SB, NAWS, 0, 80, IAC, WILL, NAWS, b'q'])
            .unwrap();
        assert!(inbound.effects.is_empty());
        assert_eq!(&inbound.responses[..], &[IAC, DO, NAWS]);
        assert_eq!(&inbound.data[..], b"q");
    }

    #[test]
    fn test_control_commands_inject_data() {
        let mut engine = server();
        let inbound = engine
            .process_inbound(&[b'a', IAC, consts::IP, b'b', IAC, consts::NOP])
            .unwrap();
        assert_eq!(&inbound.data[..], &[b'a', 0x03, b'b']);
    }
}
