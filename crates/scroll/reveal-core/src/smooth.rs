//! Smooth-scroll proxy: a virtual scroll offset that eases toward the native one.
//!
//! At most one proxy is live per process. The handle is owned by the
//! application root and passed to whatever needs the virtual offset; `stop`
//! consumes it, so a handle cannot be stopped twice.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SmoothScrollConfig;
use crate::error::RevealError;
use crate::ids::ElementId;

static LIVE: AtomicBool = AtomicBool::new(false);

/// Whether a smooth-scroll proxy is currently live anywhere in the process.
pub fn is_active() -> bool {
    LIVE.load(Ordering::Acquire)
}

#[derive(Debug)]
pub struct SmoothScrollHandle {
    wrapper: ElementId,
    content: ElementId,
    config: SmoothScrollConfig,
    offset: f32,
    target: f32,
}

impl SmoothScrollHandle {
    /// Start the proxy. With `strict` set a second start panics; otherwise it
    /// logs and returns [`RevealError::SmoothScrollActive`].
    pub fn start(
        wrapper: ElementId,
        content: ElementId,
        config: SmoothScrollConfig,
        strict: bool,
    ) -> Result<Self, RevealError> {
        if LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            if strict {
                panic!("smooth scroll started twice without stop()");
            }
            log::warn!("smooth scroll already active; ignoring start()");
            return Err(RevealError::SmoothScrollActive);
        }
        log::debug!(
            "smooth scroll started (smooth={}, effects={})",
            config.smooth,
            config.effects
        );
        Ok(Self {
            wrapper,
            content,
            config,
            offset: 0.0,
            target: 0.0,
        })
    }

    pub fn stop(self) {
        log::debug!("smooth scroll stopped");
        drop(self);
    }

    pub fn wrapper(&self) -> ElementId {
        self.wrapper
    }

    pub fn content(&self) -> ElementId {
        self.content
    }

    pub fn config(&self) -> &SmoothScrollConfig {
        &self.config
    }

    pub fn effects_enabled(&self) -> bool {
        self.config.effects
    }

    /// Virtual offset every trigger zone is measured against.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Snap both offsets (e.g. when taking over an already-scrolled page).
    pub fn jump_to(&mut self, native: f32) {
        self.offset = native;
        self.target = native;
    }

    pub fn set_target(&mut self, native: f32) {
        self.target = native;
    }

    /// Ease the virtual offset toward the native offset over `dt` seconds.
    pub fn step(&mut self, dt: f32) -> f32 {
        if self.config.smooth <= 0.0 {
            self.offset = self.target;
            return self.offset;
        }
        // ~98% of the gap closes within `smooth` seconds
        let alpha = 1.0 - (-4.0 * dt / self.config.smooth).exp();
        self.offset += (self.target - self.offset) * alpha;
        if (self.target - self.offset).abs() < 0.1 {
            self.offset = self.target;
        }
        self.offset
    }
}

impl Drop for SmoothScrollHandle {
    fn drop(&mut self) {
        LIVE.store(false, Ordering::Release);
    }
}
