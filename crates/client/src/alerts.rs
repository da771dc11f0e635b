//! Dismissible error banner with auto-clear.
//!
//! Network-unavailable and server-fault errors surface as a banner that
//! auto-clears after a configured delay or on explicit dismissal. Inline
//! errors (validation, server rejections next to a control) and login
//! redirects are routed by the caller; this module only owns the banner.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use crate::api::{ApiError, ErrorSurface};

/// Shared banner state.
///
/// Cheaply cloneable via `Arc`; every clone shows and observes the same
/// banner.
#[derive(Clone)]
pub struct AlertBanner {
    inner: Arc<BannerInner>,
}

struct BannerInner {
    message: watch::Sender<Option<String>>,
    dismiss_after: Duration,
    // Showing a new banner invalidates the previous auto-clear timer.
    generation: AtomicU64,
}

impl AlertBanner {
    /// Create a banner that auto-clears after `dismiss_after`.
    #[must_use]
    pub fn new(dismiss_after: Duration) -> Self {
        let (message, _) = watch::channel(None);
        Self {
            inner: Arc::new(BannerInner {
                message,
                dismiss_after,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Show a message and schedule its auto-clear.
    ///
    /// Must be called from within a tokio runtime.
    pub fn show(&self, message: impl Into<String>) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.message.send_replace(Some(message.into()));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.dismiss_after).await;
            // Only clear if nothing newer was shown in the meantime.
            if inner.generation.load(Ordering::SeqCst) == generation {
                inner.message.send_replace(None);
            }
        });
    }

    /// Route an API error to its surface. Banner-surface errors are shown
    /// here; the caller handles inline display and login redirects.
    /// Returns the surface so no error goes unhandled.
    pub fn publish(&self, err: &ApiError) -> ErrorSurface {
        let surface = err.surface();
        if surface == ErrorSurface::Banner {
            self.show(err.user_message());
        }
        surface
    }

    /// Dismiss the banner immediately.
    pub fn dismiss(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.message.send_replace(None);
    }

    /// The currently visible message, if any.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.inner.message.borrow().clone()
    }

    /// Subscribe to banner changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.inner.message.subscribe()
    }
}
