//! Append-only buffer for emitted machine code.
//!
//! The instruction set has no branches or jumps, so the buffer is pure
//! append: no labels, no forward references, no patching.

/// A buffer of machine-code bytes under construction.
pub struct CodeBuffer {
    code: Vec<u8>,
}

impl CodeBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    /// Create a buffer with pre-allocated capacity (the compiler computes
    /// this from the instruction count and the worst-case template size).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
        }
    }

    /// Current number of emitted bytes.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Emit a single byte.
    pub fn emit_u8(&mut self, byte: u8) {
        self.code.push(byte);
    }

    /// Emit multiple bytes.
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// The emitted bytes (for inspection).
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Consume the buffer and return the raw bytes.
    pub fn into_code(self) -> Vec<u8> {
        self.code
    }
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit() {
        let mut buf = CodeBuffer::new();
        buf.emit_u8(0xC3);
        buf.emit_bytes(&[0x66, 0x0F]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.code(), &[0xC3, 0x66, 0x0F]);
        assert_eq!(buf.into_code(), vec![0xC3, 0x66, 0x0F]);
    }

    #[test]
    fn test_capacity_is_reserved() {
        let buf = CodeBuffer::with_capacity(64);
        assert!(buf.is_empty());
    }
}
