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

//! Local echo for the client while the server is not echoing.

use teletty_telnetcodec::DEL;

/// Renders typed keystrokes on the local terminal.
///
/// Tracks the length of the current line so that DEL never erases past its start.
#[derive(Debug, Default)]
pub struct LocalEcho {
    line_len: usize,
}

impl LocalEcho {
    /// Create an echo at the start of a line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes to display for `input`.
    pub fn feed(&mut self, input: &[u8]) -> Vec<u8> {
        let mut display = Vec::with_capacity(input.len());
        for &byte in input {
            match byte {
                b'\r' | b'\n' => {
                    display.push(b'\n');
                    self.line_len = 0;
                }
                DEL => {
                    if self.line_len > 0 {
                        display.extend_from_slice(b"\x08 \x08");
                        self.line_len -= 1;
                    }
                }
                _ => {
                    display.push(byte);
                    self.line_len += 1;
                }
            }
        }
        display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_echoes() {
        let mut echo = LocalEcho::new();
        assert_eq!(echo.feed(b"ls -l"), b"ls -l");
    }

    #[test]
    fn test_line_end_prints_newline() {
        let mut echo = LocalEcho::new();
        assert_eq!(echo.feed(b"ls\r"), b"ls\n");
        assert_eq!(echo.feed(b"\n"), b"\n");
    }

    #[test]
    fn test_delete_erases_within_line() {
        let mut echo = LocalEcho::new();
        assert_eq!(echo.feed(b"ab"), b"ab");
        assert_eq!(echo.feed(&[DEL]), b"\x08 \x08");
        assert_eq!(echo.feed(&[DEL]), b"\x08 \x08");
        assert_eq!(echo.feed(&[DEL]), b"");
    }

    #[test]
    fn test_delete_stops_at_line_start() {
        let mut echo = LocalEcho::new();
        assert_eq!(echo.feed(b"a\r"), b"a\n");
        assert_eq!(echo.feed(&[DEL]), b"");
    }
}
