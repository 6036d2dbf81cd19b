//! Recovery of frames from the raw byte stream.
//!
//! The bus is noisy and we may start listening in the middle of a frame, so
//! [`FrameAssembler`] hunts for a start marker, collects bytes until the end
//! marker and only hands out frames whose length and checksum add up.

use arrayvec::ArrayVec;
use log::{debug, trace};

use crate::buffer::{Buffer, FRAME_CAPACITY};
use crate::{crc8, MARKER};

/// Smallest length byte that can describe a frame: itself, source,
/// destination, opcode and checksum.
const MIN_DECLARED_LEN: usize = 5;

/// A complete, checksum-valid frame including both markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame(ArrayVec<u8, FRAME_CAPACITY>);

impl RawFrame {
    /// Validate a complete frame given as bytes, markers included.
    ///
    /// Returns `None` if the markers, the length byte or the checksum are wrong.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let frame = Self(ArrayVec::try_from(bytes).ok()?);
        let len = frame.0.len();
        let well_formed = len > 2
            && frame.0[0] == MARKER
            && frame.0[len - 1] == MARKER
            && usize::from(frame.0[1]) + 2 == len;
        if well_formed && frame.checksum_valid() {
            Some(frame)
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Value of the length byte.
    pub fn declared_len(&self) -> u8 {
        self.0[1]
    }

    /// The checksum byte, second to last.
    pub fn checksum(&self) -> u8 {
        self.0[self.0.len() - 2]
    }

    /// Received-frame convention: cover everything after the start marker,
    /// excluding the checksum and the end marker.
    fn checksum_valid(&self) -> bool {
        let len = self.0.len();
        crc8(&self.0[1..len - 2]) == self.checksum()
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Byte-at-a-time frame assembler.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: Buffer,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: Buffer::new(),
        }
    }

    /// Number of bytes collected for the frame in progress.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one byte from the bus. Returns a frame when `byte` completed one
    /// with a valid checksum.
    pub fn feed(&mut self, byte: u8) -> Option<RawFrame> {
        if self.buffer.first() != Some(MARKER) {
            self.buffer.clear();
            if byte != MARKER {
                trace!("Dropping 0x{:02X} while looking for start of frame", byte);
                return None;
            }
        } else if byte == MARKER && self.buffer.len() == 1 {
            // End marker of the previous frame followed by our start marker,
            // keep a single one.
            return None;
        }

        if !self.buffer.push(byte) {
            debug!("Frame buffer overflow, resynchronizing");
            self.buffer.clear();
            return None;
        }

        let len = self.buffer.len();
        if len < 2 {
            return None;
        }
        let declared = usize::from(self.buffer.get(1)?);
        if declared < MIN_DECLARED_LEN || declared + 2 > FRAME_CAPACITY {
            debug!("Implausible frame length {}, resynchronizing", declared);
            self.buffer.clear();
            return None;
        }

        // There is no byte stuffing: markers inside the declared length are data.
        if len < declared + 2 {
            return None;
        }
        if byte != MARKER {
            debug!(
                "Packet incomplete: no end marker after {} declared bytes",
                declared
            );
            self.buffer.clear();
            return None;
        }

        let frame = RawFrame(self.buffer.take());
        if frame.checksum_valid() {
            Some(frame)
        } else {
            debug!(
                "CRC 0x{:02X} != packet CRC 0x{:02X}",
                crc8(&frame.0[1..len - 2]),
                frame.checksum()
            );
            None
        }
    }
}
