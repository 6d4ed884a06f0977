// Graceful shutdown module
// Waits for in-flight connections after the listener has been closed

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::logger;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until `active` drops to zero or `timeout` elapses.
///
/// Returns the number of connections still open when it gave up.
pub async fn drain_connections(active: &AtomicUsize, timeout: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let remaining = active.load(Ordering::SeqCst);
        if remaining == 0 {
            return 0;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown timeout after {}s, abandoning {remaining} connection(s)",
                timeout.as_secs()
            ));
            return remaining;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_returns_immediately_when_idle() {
        let active = AtomicUsize::new(0);
        assert_eq!(drain_connections(&active, Duration::from_secs(5)).await, 0);
    }

    #[tokio::test]
    async fn test_waits_for_last_connection() {
        let active = Arc::new(AtomicUsize::new(2));
        let closer = Arc::clone(&active);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.fetch_sub(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.fetch_sub(1, Ordering::SeqCst);
        });

        assert_eq!(drain_connections(&active, Duration::from_secs(5)).await, 0);
    }

    #[tokio::test]
    async fn test_gives_up_at_deadline() {
        let active = AtomicUsize::new(3);
        assert_eq!(drain_connections(&active, Duration::from_millis(10)).await, 3);
    }
}
