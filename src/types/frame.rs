//! Camera frame type.

use std::sync::Arc;

use crate::error::{Result, VisionError};

/// One complete encoded image delivered by the camera link.
///
/// A frame is only constructed once all declared bytes have been read, so it is
/// never partially populated. The buffer is immutable and shared zero-copy via
/// `Arc`, which makes cloning a snapshot for the analysis pipeline cheap.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Arc<[u8]>,
}

impl Frame {
    /// Validate and wrap a fully-read frame buffer.
    ///
    /// Rejects empty buffers and buffers above `max_len`; the receive loop
    /// treats both as a protocol violation to skip, not a fatal error.
    pub fn new(data: Vec<u8>, max_len: usize) -> Result<Self> {
        if data.is_empty() {
            return Err(VisionError::protocol_violation("zero-length frame"));
        }
        if data.len() > max_len {
            return Err(VisionError::protocol_violation(format!(
                "frame of {} bytes exceeds cap of {} bytes",
                data.len(),
                max_len
            )));
        }
        Ok(Self { data: data.into() })
    }

    /// The encoded image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Length of the encoded image in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: empty frames are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_FRAME_LEN;

    #[test]
    fn accepts_bounded_frames() {
        let frame = Frame::new(vec![0xFF, 0xD8, 0xFF], DEFAULT_MAX_FRAME_LEN).expect("valid frame");
        assert_eq!(frame.bytes(), &[0xFF, 0xD8, 0xFF]);
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
    }

    #[test]
    fn rejects_empty_frames() {
        let err = Frame::new(Vec::new(), DEFAULT_MAX_FRAME_LEN).unwrap_err();
        assert!(matches!(err, VisionError::Protocol { .. }));
    }

    #[test]
    fn rejects_oversized_frames() {
        let err = Frame::new(vec![0u8; 11], 10).unwrap_err();
        assert!(matches!(err, VisionError::Protocol { .. }));
    }

    #[test]
    fn clone_shares_the_buffer() {
        let frame = Frame::new(vec![1, 2, 3], DEFAULT_MAX_FRAME_LEN).expect("valid frame");
        let copy = frame.clone();
        assert_eq!(frame.bytes().as_ptr(), copy.bytes().as_ptr());
    }
}
