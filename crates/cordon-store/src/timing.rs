//! Timing-safe operation envelope
//!
//! Every label-dependent storage path returns through this wrapper: the
//! operation's wall-clock time is measured and padded up to a fixed
//! floor, so a MAC denial, a genuinely absent record, and slow crypto
//! are indistinguishable by latency. Errors still propagate: padding
//! delays the return, it never swallows the result.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Run `op` and pad its completion to at least `floor`.
///
/// The inner result (success or failure) is returned unchanged after the
/// padding delay. A zero floor disables padding.
pub async fn shielded<T, F>(floor: Duration, op: F) -> T
where
    F: Future<Output = T>,
{
    let started = Instant::now();
    let result = op.await;
    let elapsed = started.elapsed();
    if elapsed < floor {
        tokio::time::sleep(floor - elapsed).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use cordon_core::{CordonError, Result};

    #[tokio::test(start_paused = true)]
    async fn fast_success_is_padded_to_the_floor() {
        let floor = Duration::from_millis(100);
        let started = Instant::now();
        let value: Result<u32> = shielded(floor, async { Ok(7) }).await;
        assert_eq!(value.unwrap(), 7);
        assert!(started.elapsed() >= floor);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_failure_is_padded_and_still_propagates() {
        let floor = Duration::from_millis(100);
        let started = Instant::now();
        let value: Result<u32> =
            shielded(floor, async { Err(CordonError::mac_deny_read("denied")) }).await;
        assert!(value.is_err());
        assert!(started.elapsed() >= floor);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_operations_are_not_padded_further() {
        let floor = Duration::from_millis(100);
        let started = Instant::now();
        let _: Result<()> = shielded(floor, async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            Ok(())
        })
        .await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_floor_disables_padding() {
        let started = Instant::now();
        let _: Result<()> = shielded(Duration::ZERO, async { Ok(()) }).await;
        assert!(started.elapsed() < Duration::from_millis(1));
    }
}
