//! Graceful shutdown coordination using cancellation tokens.
//!
//! Ctrl+C triggers the global controller; each channel run watches a child
//! token and stops after the page it is processing.

use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;

/// Global shutdown controller instance
static GLOBAL_SHUTDOWN: OnceLock<ShutdownController> = OnceLock::new();

/// Controller for coordinating graceful shutdown across tasks.
#[derive(Clone)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Trigger shutdown, notifying all waiting tasks.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Create a child token that will be cancelled when this controller
    /// is triggered, but can also be cancelled independently.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Set the global shutdown controller.
/// Should be called once at startup.
pub fn set_global(controller: ShutdownController) {
    let _ = GLOBAL_SHUTDOWN.set(controller);
}

/// Get the global shutdown controller.
/// Returns a default (never-triggered) controller if not set.
pub fn global() -> ShutdownController {
    GLOBAL_SHUTDOWN
        .get()
        .cloned()
        .unwrap_or_else(ShutdownController::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_cancels_children() {
        let controller = ShutdownController::new();
        let child = controller.child_token();
        assert!(!controller.is_triggered());
        assert!(!child.is_cancelled());

        controller.trigger();
        assert!(controller.is_triggered());
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_cancelled_child_leaves_parent_running() {
        let controller = ShutdownController::new();
        let child = controller.child_token();
        child.cancel();
        assert!(!controller.is_triggered());
    }
}
