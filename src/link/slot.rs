//! Single-slot latest-frame cell bridging the receiver and its consumer.

use std::sync::{Mutex, PoisonError};

use crate::types::Frame;

/// At-most-one-frame buffer with last-write-wins semantics.
///
/// The receiver deposits each completed frame; a newer frame replaces an
/// unconsumed older one (freshness over completeness). The producer never
/// blocks on a slow consumer and frames never accumulate.
#[derive(Debug, Default)]
pub(crate) struct FrameSlot {
    inner: Mutex<Option<Frame>>,
}

impl FrameSlot {
    /// Deposit a frame, dropping any unconsumed predecessor.
    ///
    /// Returns true when an unconsumed frame was replaced.
    pub(crate) fn put(&self, frame: Frame) -> bool {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        slot.replace(frame).is_some()
    }

    /// Atomically remove and return the buffered frame, if any.
    pub(crate) fn take(&self) -> Option<Frame> {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_FRAME_LEN;

    fn frame(byte: u8) -> Frame {
        Frame::new(vec![byte], DEFAULT_MAX_FRAME_LEN).expect("valid frame")
    }

    #[test]
    fn take_on_empty_slot_is_none() {
        let slot = FrameSlot::default();
        assert!(slot.take().is_none());
    }

    #[test]
    fn delivers_a_frame_exactly_once() {
        let slot = FrameSlot::default();
        assert!(!slot.put(frame(1)));
        assert_eq!(slot.take().expect("frame buffered").bytes(), &[1]);
        assert!(slot.take().is_none());
    }

    #[test]
    fn newer_frame_replaces_unconsumed_one() {
        let slot = FrameSlot::default();
        slot.put(frame(1));
        assert!(slot.put(frame(2)));
        assert_eq!(slot.take().expect("frame buffered").bytes(), &[2]);
        assert!(slot.take().is_none());
    }
}
