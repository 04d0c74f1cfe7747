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

//! Echo suppression for pty output.
//!
//! A pty echoes everything written to it. When the client echoes its own input
//! (ECHO is not enabled on the server) that echo would show every keystroke twice.
//! The relay remembers what was written to the pty and drops the matching prefix of
//! the next output read.
//!
//! The match is a heuristic for line oriented shells:
//!
//! - CR and LF are interchangeable, and a CR LF pair on either side matches a single
//!   line ending on the other.
//! - A DEL (0x7F) met while comparing means the line is being edited; nothing from
//!   that pass is forwarded.
//! - After the first mismatch, or once the input is used up, everything else is new
//!   output and passes through untouched.
//!
//! The remembered input is cleared after every pass whatever the outcome.

use teletty_telnetcodec::DEL;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Reconciles pty output against recently written client input.
#[derive(Debug, Default)]
pub struct EchoRelay {
    echoed: Vec<u8>,
}

impl EchoRelay {
    /// Create an empty relay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember input that was written to the pty.
    pub fn record(&mut self, input: &[u8]) {
        self.echoed.extend_from_slice(input);
    }

    /// Input waiting to be matched.
    pub fn pending(&self) -> &[u8] {
        &self.echoed
    }

    /// Return the part of `output` that should reach the client.
    pub fn reconcile<'a>(&mut self, output: &'a [u8]) -> &'a [u8] {
        let echoed = std::mem::take(&mut self.echoed);
        if echoed.is_empty() {
            return output;
        }
        let (mut out, mut inp) = (0, 0);
        while out < output.len() && inp < echoed.len() {
            let (o, e) = (output[out], echoed[inp]);
            if o == DEL || e == DEL {
                return &[];
            }
            if o != e && !(is_line_end(o) && is_line_end(e)) {
                break;
            }
            out += 1;
            inp += 1;
            if o == CR && output.get(out) == Some(&LF) {
                out += 1;
            }
            if e == CR && echoed.get(inp) == Some(&LF) {
                inp += 1;
            }
        }
        &output[out..]
    }
}

fn is_line_end(byte: u8) -> bool {
    byte == CR || byte == LF
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconcile(echoed: &[u8], output: &[u8]) -> Vec<u8> {
        let mut relay = EchoRelay::new();
        relay.record(echoed);
        relay.reconcile(output).to_vec()
    }

    // ============================================================================
    // Matching Tests
    // ============================================================================

    #[test]
    fn test_command_echo_leaves_prompt() {
        assert_eq!(reconcile(b"ls\r", b"ls\r\n$ "), b"$ ");
    }

    #[test]
    fn test_exact_echo_forwards_nothing() {
        assert_eq!(reconcile(b"pwd", b"pwd"), b"");
    }

    #[test]
    fn test_line_feed_matches_carriage_return() {
        assert_eq!(reconcile(b"ls\n", b"ls\r\nfile\r\n"), b"file\r\n");
        assert_eq!(reconcile(b"ls\r\n", b"ls\r\n$ "), b"$ ");
        assert_eq!(reconcile(b"ls\r", b"ls\n$ "), b"$ ");
    }

    #[test]
    fn test_divergence_forwards_rest() {
        assert_eq!(reconcile(b"ls\r", b"lx: not found"), b"x: not found");
        assert_eq!(reconcile(b"q", b"hello"), b"hello");
    }

    #[test]
    fn test_partial_echo_across_reads() {
        // Input not yet echoed when the pass ends is forgotten.
        let mut relay = EchoRelay::new();
        relay.record(b"echo hi\r");
        assert_eq!(relay.reconcile(b"echo"), b"");
        assert!(relay.pending().is_empty());
        assert_eq!(relay.reconcile(b" hi\r\nhi\r\n$ "), b" hi\r\nhi\r\n$ ");
    }

    // ============================================================================
    // Line Editing Tests
    // ============================================================================

    #[test]
    fn test_delete_in_output_discards_pass() {
        assert_eq!(reconcile(b"lx", &[DEL, b'\x08', b' ', b'\x08']), b"");
        assert_eq!(reconcile(b"lx", b"l\x7fx"), b"");
    }

    #[test]
    fn test_delete_after_matched_prefix_discards_pass() {
        assert_eq!(reconcile(b"ab", b"a\x7f"), b"");
    }

    #[test]
    fn test_delete_after_echo_is_forwarded() {
        assert_eq!(
            reconcile(b"ls\r", b"ls\r\nfile\x7fname\r\n$ "),
            b"file\x7fname\r\n$ "
        );
        assert_eq!(reconcile(b"ls\r", b"lx\x7f"), b"x\x7f");
    }

    #[test]
    fn test_delete_in_input_discards_pass() {
        assert_eq!(reconcile(b"lx\x7f", b"lx\x08 \x08"), b"");
    }

    // ============================================================================
    // Pass Reset Tests
    // ============================================================================

    #[test]
    fn test_empty_buffer_forwards_everything() {
        let mut relay = EchoRelay::new();
        assert_eq!(relay.reconcile(b"login: "), b"login: ");
        assert_eq!(relay.reconcile(&[DEL]), &[DEL]);
    }

    #[test]
    fn test_buffer_reset_after_each_pass() {
        let mut relay = EchoRelay::new();
        relay.record(b"ab");
        assert_eq!(relay.reconcile(b"zz"), b"zz");
        assert!(relay.pending().is_empty());
        assert_eq!(relay.reconcile(b"ab"), b"ab");
    }

    #[test]
    fn test_record_accumulates_until_reconciled() {
        let mut relay = EchoRelay::new();
        relay.record(b"l");
        relay.record(b"s");
        relay.record(b"\r");
        assert_eq!(relay.pending(), b"ls\r");
        assert_eq!(relay.reconcile(b"ls\r\n"), b"");
    }
}
