//! Bounded Poll Integration Tests
//!
//! Exercises the poll driver under paused tokio time; delays advance
//! instantly but elapsed time is still observable.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use attestor::core::{poll, PollPolicy};

fn uid_policy() -> PollPolicy {
    PollPolicy {
        max_attempts: 4,
        delay_ms: 10_000,
        backoff_multiplier: 1.0,
        max_delay_ms: 60_000,
    }
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_returns_none_after_all_attempts() {
    let calls = AtomicU32::new(0);
    let start = tokio::time::Instant::now();

    let result: Result<Option<u32>, String> = poll(&uid_policy(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    })
    .await;

    assert_eq!(result, Ok(None));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    // One fixed delay before each of the four attempts
    assert_eq!(start.elapsed(), Duration::from_secs(40));
}

#[tokio::test(start_paused = true)]
async fn test_first_success_stops_the_poll() {
    let responses = Mutex::new(vec![Ok(None), Ok(Some(5u32))].into_iter());
    let calls = AtomicU32::new(0);
    let start = tokio::time::Instant::now();

    let result: Result<Option<u32>, String> = poll(&uid_policy(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        responses.lock().unwrap().next().unwrap_or(Ok(None))
    })
    .await;

    assert_eq!(result, Ok(Some(5)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_error_aborts_without_further_attempts() {
    let responses = Mutex::new(
        vec![
            Ok(None),
            Err("boom".to_string()),
            Ok(Some(5u32)),
        ]
        .into_iter(),
    );
    let calls = AtomicU32::new(0);

    let result = poll(&uid_policy(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        responses.lock().unwrap().next().unwrap_or(Ok(None))
    })
    .await;

    assert_eq!(result, Err("boom".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_accumulate() {
    let policy = PollPolicy {
        max_attempts: 3,
        delay_ms: 1_000,
        backoff_multiplier: 2.0,
        max_delay_ms: 10_000,
    };

    let start = tokio::time::Instant::now();
    let result: Result<Option<u32>, String> = poll(&policy, || async { Ok(None) }).await;

    assert_eq!(result, Ok(None));
    // 1s + 2s + 4s
    assert_eq!(start.elapsed(), Duration::from_secs(7));
}
