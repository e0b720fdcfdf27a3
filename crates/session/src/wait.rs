//! Generic quiescence wait over a polled change counter.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

/// How often the counter is sampled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Resolves once `poll` has reported no change for `idle`, or
/// unconditionally once `max` has elapsed.
///
/// `poll` returns a monotonic counter (e.g. a DOM mutation count); two
/// equal readings bracket a silent window. The `max` cap guarantees the
/// wait terminates even on a page that never goes quiet.
pub async fn wait_for_quiescence<F, Fut, E>(
    mut poll: F,
    idle: Duration,
    max: Duration,
) -> Result<(), E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64, E>>,
{
    let start = Instant::now();
    let mut last = poll().await?;
    let mut last_change = Instant::now();

    loop {
        if last_change.elapsed() >= idle || start.elapsed() >= max {
            return Ok(());
        }
        sleep(POLL_INTERVAL).await;
        let current = poll().await?;
        if current != last {
            last = current;
            last_change = Instant::now();
        }
    }
}
