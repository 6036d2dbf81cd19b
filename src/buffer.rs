use arrayvec::ArrayVec;

/// Capacity of the receive buffer. Bus frames are far shorter than this.
pub const FRAME_CAPACITY: usize = 100;

/// Fixed-capacity byte buffer used while assembling a frame.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    data: ArrayVec<u8, FRAME_CAPACITY>,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer {
            data: ArrayVec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn first(&self) -> Option<u8> {
        self.data.first().copied()
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    /// Append a byte. Returns false, leaving the buffer untouched, if it is full.
    pub fn push(&mut self, byte: u8) -> bool {
        self.data.try_push(byte).is_ok()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Move the contents out, leaving the buffer empty.
    pub fn take(&mut self) -> ArrayVec<u8, FRAME_CAPACITY> {
        core::mem::take(&mut self.data)
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.data.as_ref()
    }
}
