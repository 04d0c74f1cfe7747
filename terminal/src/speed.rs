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

//! Line speed control for terminal descriptors.

use crate::result::TerminalResult;
use rustix::fd::AsFd;
use rustix::termios::{self, OptionalActions};
use teletty_telnetcodec::TerminalSpeed;

/// Apply a negotiated line speed to a terminal descriptor.
///
/// The transmit rate becomes the output speed and the receive rate the input speed.
/// Platforms that only accept the standard rates reject anything else with an error,
/// which callers treat as non-fatal.
pub fn set_baud_rate<Fd: AsFd>(fd: Fd, speed: TerminalSpeed) -> TerminalResult<()> {
    let mut settings = termios::tcgetattr(&fd)?;
    settings.set_output_speed(speed.transmit)?;
    settings.set_input_speed(speed.receive)?;
    termios::tcsetattr(&fd, OptionalActions::Now, &settings)?;
    Ok(())
}

/// Read the current line speed of a terminal descriptor.
pub fn baud_rate_of<Fd: AsFd>(fd: Fd) -> TerminalResult<TerminalSpeed> {
    let settings = termios::tcgetattr(&fd)?;
    Ok(TerminalSpeed::new(
        settings.output_speed(),
        settings.input_speed(),
    ))
}
