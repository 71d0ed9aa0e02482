//! Latest-value hand-off between a detector thread and the frame loop.
//!
//! The detector runs at its own cadence and publishes whole
//! [`DetectorFrame`]s; the simulation reads the most recent one once per
//! frame. Frames are swapped under a lock, so a reader never sees half of an
//! update. A detector that stops or fails leaves the reader with
//! [`DetectorFrame::Absent`], which the adapter treats as neutral input.
//!
//! ```ignore
//! let channel = DetectorChannel::new();
//! let producer = channel.clone();
//! std::thread::spawn(move || loop {
//!     producer.publish(detect());
//! });
//! let sim = Simulation::from_preset(Preset::ShapeMorph, 7)?.with_detector(channel);
//! ```

use crate::influence::DetectorFrame;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Health of the external detector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DetectorStatus {
    /// Nothing published yet.
    #[default]
    Waiting,
    Active,
    /// Stopped, e.g. camera permission revoked. Never fatal.
    Unavailable(String),
}

#[derive(Debug, Default)]
struct Slot {
    frame: DetectorFrame,
    sequence: u64,
    status: DetectorStatus,
}

/// Clone-able handle to a single-producer, single-consumer snapshot slot.
#[derive(Clone, Debug, Default)]
pub struct DetectorChannel {
    slot: Arc<Mutex<Slot>>,
}

impl DetectorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot.
    pub fn publish(&self, frame: DetectorFrame) {
        let Ok(mut slot) = self.slot.lock() else {
            warn!("detector channel poisoned, dropping frame");
            return;
        };
        if slot.status != DetectorStatus::Active {
            info!("detector active");
            slot.status = DetectorStatus::Active;
        }
        slot.frame = frame;
        slot.sequence = slot.sequence.wrapping_add(1);
    }

    /// Record that the detector stopped. The last frame is replaced by
    /// [`DetectorFrame::Absent`].
    pub fn mark_unavailable(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "detector unavailable, falling back to neutral influence");
        if let Ok(mut slot) = self.slot.lock() {
            slot.frame = DetectorFrame::Absent;
            slot.sequence = slot.sequence.wrapping_add(1);
            slot.status = DetectorStatus::Unavailable(reason);
        }
    }

    /// Most recent frame and its sequence number. A poisoned lock reads as
    /// absent.
    pub fn latest(&self) -> (DetectorFrame, u64) {
        match self.slot.lock() {
            Ok(slot) => (slot.frame, slot.sequence),
            Err(_) => (DetectorFrame::Absent, 0),
        }
    }

    pub fn status(&self) -> DetectorStatus {
        match self.slot.lock() {
            Ok(slot) => slot.status.clone(),
            Err(_) => DetectorStatus::Unavailable("detector channel poisoned".into()),
        }
    }
}
