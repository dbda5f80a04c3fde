use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use canvas_core::{CanvasDevice, CanvasError, Result};

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// CPU "device". It owns nothing but an identity and a removal flag.
#[derive(Debug)]
pub struct SoftwareDevice {
    id: u64,
    lost: AtomicBool,
}

impl SoftwareDevice {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed),
            lost: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Simulates device removal. Every later operation on the device fails
    /// with [`CanvasError::DeviceLost`].
    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }

    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.is_lost() {
            Err(CanvasError::DeviceLost(format!(
                "software device {} was removed",
                self.id
            )))
        } else {
            Ok(())
        }
    }
}

impl CanvasDevice for SoftwareDevice {}
