use tracing::warn;

/// Receives diagnostics from failed operations.
///
/// Called on error paths only, right before the error is returned.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

impl<F> Notifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, message: &str) {
        self(message)
    }
}

/// Default notifier, forwards to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!(target: "graph_poster::notify", "{}", message);
    }
}
