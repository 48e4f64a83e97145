//! Best-effort side steps (log capture, cleanup) whose failure must never
//! change a run's outcome.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Await `fut`; on error log it under `what` and return `None`
pub async fn best_effort<T, E, Fut>(what: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(step = what, error = %e, "Best-effort step failed, continuing");
            None
        }
    }
}
