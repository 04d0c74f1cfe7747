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

//! Negotiate About Window Size
//!

use crate::{SubnegotiationErrorKind, TelnetCodecError, TelnetCodecResult, consts};
use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, BufMut};

/// Terminal dimensions carried by a NAWS subnegotiation.
///
/// # Format
/// Four bytes, columns then rows, each a big-endian `u16`.
///
/// # Example
/// ```
/// use teletty_telnetcodec::WindowSize;
///
/// let size = WindowSize::new(80, 24);
/// assert_eq!(size.cols, 80);
/// assert_eq!(size.rows, 24);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSize {
    /// The number of columns (characters) in the terminal window
    pub cols: u16,
    /// The number of rows (lines) in the terminal window
    pub rows: u16,
}

impl WindowSize {
    /// Encoded payload length.
    pub const LEN: usize = 4;

    /// Creates a new `WindowSize` with the specified columns and rows.
    pub fn new(cols: u16, rows: u16) -> Self {
        WindowSize { cols, rows }
    }

    /// Returns the encoded length of this `WindowSize` in bytes.
    pub fn encoded_len(&self) -> usize {
        Self::LEN
    }

    /// Encodes the payload (without the surrounding `IAC SB NAWS` / `IAC SE`).
    ///
    /// A dimension whose low or high byte equals `IAC` is doubled on the wire, so the
    /// written length can exceed [`WindowSize::LEN`]. Returns the number of bytes written.
    pub fn encode<T: BufMut>(&self, dst: &mut T) -> TelnetCodecResult<usize> {
        let mut raw = [0u8; Self::LEN];
        let mut cursor = &mut raw[..];
        self.write(&mut cursor)?;
        let mut written = 0;
        for byte in raw {
            if byte == consts::IAC {
                dst.put_u8(consts::IAC);
                written += 1;
            }
            dst.put_u8(byte);
            written += 1;
        }
        Ok(written)
    }

    /// Writes the raw big-endian payload to a writer.
    pub fn write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<usize> {
        writer.write_u16::<BigEndian>(self.cols)?;
        writer.write_u16::<BigEndian>(self.rows)?;
        Ok(Self::LEN)
    }

    /// Decodes an unescaped NAWS payload.
    ///
    /// # Errors
    /// Returns [`SubnegotiationErrorKind::InsufficientData`] unless exactly four bytes remain.
    ///
    /// # Example
    /// ```
    /// use teletty_telnetcodec::WindowSize;
    ///
    /// let mut buf = &[0x00, 0x50, 0x00, 0x18][..];
    /// let size = WindowSize::decode(&mut buf).unwrap();
    /// assert_eq!(size, WindowSize::new(80, 24));
    /// ```
    pub fn decode<T: Buf>(src: &mut T) -> TelnetCodecResult<WindowSize> {
        if src.remaining() == Self::LEN {
            Ok(WindowSize {
                cols: src.get_u16(),
                rows: src.get_u16(),
            })
        } else {
            Err(TelnetCodecError::SubnegotiationError {
                option: Some(consts::option::NAWS),
                reason: SubnegotiationErrorKind::InsufficientData {
                    required: Self::LEN,
                    available: src.remaining(),
                },
            })
        }
    }
}

impl Default for WindowSize {
    /// The traditional 80x24 terminal, used until a real size is known.
    fn default() -> Self {
        WindowSize { cols: 80, rows: 24 }
    }
}

impl std::fmt::Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.cols, self.rows)
    }
}
