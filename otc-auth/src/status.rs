//! Progress reporting seam between the token chain and the user

/// Anything that can surface validation progress while a flow is running.
///
/// The production implementation is the callback listener, which relays the
/// status to the still-open browser tab via its polling endpoint. Tests use
/// an in-memory recorder.
pub trait StatusReporter: Send + Sync {
    /// Record a status ("pending", "success", "failed") with a
    /// human-readable message.
    fn report(&self, status: &str, message: &str);
}
