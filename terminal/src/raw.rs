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

//! Raw mode for the client's controlling terminal.

use crate::result::TerminalResult;
use rustix::fd::AsFd;
use rustix::termios::{self, InputModes, LocalModes, OptionalActions, SpecialCodeIndex, Termios};
use std::fs::File;
use teletty_telnetcodec::WindowSize;
use tracing::{debug, warn};

const CONTROLLING_TERMINAL: &str = "/dev/tty";

/// Terminal type used when the environment does not name one.
pub const DEFAULT_TERMINAL_TYPE: &str = "vt100";

/// The local terminal switched to raw mode for the lifetime of this value.
///
/// Keystrokes are delivered one byte at a time without line editing or local echo,
/// while `ISIG` stays on so that Ctrl-C still raises `SIGINT`. The original settings
/// are put back by [`RawTerminal::restore`] or on drop.
pub struct RawTerminal {
    tty: File,
    original: Termios,
    restored: bool,
}

impl RawTerminal {
    /// Open `/dev/tty` and switch it to raw mode.
    pub fn open() -> TerminalResult<RawTerminal> {
        let tty = File::options()
            .read(true)
            .write(true)
            .open(CONTROLLING_TERMINAL)?;
        RawTerminal::from_file(tty)
    }

    /// Switch an already opened terminal device to raw mode.
    pub fn from_file(tty: File) -> TerminalResult<RawTerminal> {
        let original = termios::tcgetattr(&tty)?;
        termios::tcsetattr(&tty, OptionalActions::Now, &raw_settings(&original))?;
        debug!("Terminal switched to raw mode");
        Ok(RawTerminal {
            tty,
            original,
            restored: false,
        })
    }

    /// Current window size of the terminal.
    pub fn window_size(&self) -> TerminalResult<WindowSize> {
        window_size_of(&self.tty)
    }

    /// A second handle on the terminal for a blocking keystroke reader.
    pub fn try_clone_reader(&self) -> TerminalResult<File> {
        Ok(self.tty.try_clone()?)
    }

    /// Put the original terminal settings back. Calling it again does nothing.
    pub fn restore(&mut self) -> TerminalResult<()> {
        if !self.restored {
            termios::tcsetattr(&self.tty, OptionalActions::Now, &self.original)?;
            self.restored = true;
            debug!("Terminal settings restored");
        }
        Ok(())
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(error) = self.restore() {
            warn!("Failed to restore terminal settings: {}", error);
        }
    }
}

impl std::fmt::Debug for RawTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawTerminal")
            .field("tty", &self.tty)
            .field("restored", &self.restored)
            .finish_non_exhaustive()
    }
}

/// Derive raw mode settings from the terminal's current ones.
pub fn raw_settings(original: &Termios) -> Termios {
    let mut settings = original.clone();
    settings.input_modes.remove(
        InputModes::ISTRIP
            | InputModes::INLCR
            | InputModes::ICRNL
            | InputModes::IGNCR
            | InputModes::IXOFF,
    );
    settings
        .local_modes
        .remove(LocalModes::ECHO | LocalModes::ICANON);
    settings.special_codes[SpecialCodeIndex::VMIN] = 1;
    settings.special_codes[SpecialCodeIndex::VTIME] = 0;
    settings
}

/// Window size of a terminal descriptor, 80x24 when the terminal reports none.
pub fn window_size_of<Fd: AsFd>(fd: Fd) -> TerminalResult<WindowSize> {
    let size = termios::tcgetwinsize(fd)?;
    if size.ws_col == 0 || size.ws_row == 0 {
        return Ok(WindowSize::default());
    }
    Ok(WindowSize::new(size.ws_col, size.ws_row))
}

/// Terminal type to announce for a `$TERM` value.
pub fn default_terminal_type(term: Option<&str>) -> String {
    match term.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_TERMINAL_TYPE.to_string(),
    }
}
