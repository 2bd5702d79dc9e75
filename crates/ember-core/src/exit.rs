// SPDX-License-Identifier: CEPL-1.0
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide "stop ticking" flag, threaded explicitly through the engine.
///
/// Clones share the same flag. It is atomic because driver callbacks (the
/// Vulkan debug messenger) may report from threads other than the main loop.
#[derive(Clone, Debug, Default)]
pub struct ExitSignal(Arc<AtomicBool>);

impl ExitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
