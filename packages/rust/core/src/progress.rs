//! Progress notifications shown while a turn runs.

use tracing::debug;

use scholarbot_shared::Result;

/// Displays a transient status line (a spinner, an edited chat message, ...).
pub trait ProgressSink: Send + Sync {
    fn notify(&self, text: &str) -> Result<()>;
}

/// No-op progress sink for headless/test usage.
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn notify(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Deliver `text`, trying up to `attempts` times.
///
/// Failures never reach the caller; the last one is logged at debug level.
/// Returns whether the notification got through.
pub fn notify_best_effort(sink: &dyn ProgressSink, text: &str, attempts: u32) -> bool {
    let mut last_error = None;
    for _ in 0..attempts.max(1) {
        match sink.notify(text) {
            Ok(()) => return true,
            Err(e) => last_error = Some(e),
        }
    }
    if let Some(e) = last_error {
        debug!(error = %e, text, "progress notification dropped");
    }
    false
}
