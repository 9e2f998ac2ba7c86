//! Rendering surface the orchestrator prepares before each reload

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// The element a renderer draws into
pub trait RenderSurface: Send + Sync {
    /// Remove everything the previous renderer left behind
    fn clear(&self);

    /// Show or hide the loading indicator
    fn set_loading(&self, loading: bool);
}

/// Surface without a display; records what was asked of it
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    clears: AtomicUsize,
    loading: AtomicBool,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}

impl RenderSurface for HeadlessSurface {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }
}
