//! Construction of outgoing frames.

use arrayvec::ArrayVec;

use crate::buffer::FRAME_CAPACITY;
use crate::types::ClientId;
use crate::{address, crc8, MARKER};

// markers, length, source, destination, opcode, checksum
const OVERHEAD: usize = 7;

/// A complete frame, ready to be written to the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutFrame(ArrayVec<u8, FRAME_CAPACITY>);

impl OutFrame {
    /// Build a frame from its header fields and parameter bytes.
    ///
    /// Returns `None` if the parameters don't fit in a frame.
    ///
    /// ```
    /// use balboa_proto::OutFrame;
    /// let frame = OutFrame::try_new(0x10, 0xBF, 0x07, &[]).unwrap();
    /// assert_eq!(frame.as_bytes(), &[0x7E, 0x05, 0x10, 0xBF, 0x07, 0x5B, 0x7E]);
    /// ```
    pub fn try_new(source: u8, destination: u8, opcode: u8, params: &[u8]) -> Option<Self> {
        if params.len() + OVERHEAD > FRAME_CAPACITY {
            return None;
        }
        let mut data = ArrayVec::new();
        data.push(source);
        data.push(destination);
        data.push(opcode);
        data.try_extend_from_slice(params).ok()?;

        // length counts itself and the checksum
        data.insert(0, (data.len() + 2) as u8);
        data.push(crc8(&data));

        data.insert(0, MARKER);
        data.push(MARKER);
        Some(Self(data))
    }

    /// Frame from a registered client to the spa.
    pub(crate) fn from_client(id: ClientId, opcode: u8, params: &[u8]) -> Self {
        Self::try_new(*id, address::CLIENT_CLASS, opcode, params)
            .expect("BUG: Send buffer too small.")
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The source address byte.
    pub fn source(&self) -> u8 {
        self.0[2]
    }

    pub fn opcode(&self) -> u8 {
        self.0[4]
    }

    /// Parameter bytes following the opcode.
    pub fn params(&self) -> &[u8] {
        &self.0[5..self.0.len() - 2]
    }
}

impl AsRef<[u8]> for OutFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
