use super::*;
use std::cell::Cell;

#[tokio::test(start_paused = true)]
async fn run_returns_first_success_without_sleeping() {
    let calls = Cell::new(0_u32);
    let started = tokio::time::Instant::now();

    let result: Result<u32, String> = RetryPolicy::default()
        .run("test", |attempt| {
            calls.set(calls.get() + 1);
            async move { Ok(attempt) }
        })
        .await;

    assert_eq!(result, Ok(1));
    assert_eq!(calls.get(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn run_succeeds_after_four_failures() {
    let calls = Cell::new(0_u32);
    let started = tokio::time::Instant::now();

    let result: Result<&str, String> = RetryPolicy::new(5, Duration::from_millis(1000))
        .run("test", |attempt| {
            calls.set(calls.get() + 1);
            async move { if attempt < 5 { Err(format!("fail {attempt}")) } else { Ok("payload") } }
        })
        .await;

    assert_eq!(result, Ok("payload"));
    assert_eq!(calls.get(), 5);
    assert_eq!(started.elapsed(), Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn run_stops_after_max_attempts_with_last_error() {
    let calls = Cell::new(0_u32);

    let result: Result<(), String> = RetryPolicy::new(5, Duration::from_millis(1000))
        .run("test", |attempt| {
            calls.set(calls.get() + 1);
            async move { Err(format!("fail {attempt}")) }
        })
        .await;

    assert_eq!(result, Err("fail 5".to_owned()));
    assert_eq!(calls.get(), 5);
}

#[tokio::test(start_paused = true)]
async fn zero_attempts_still_tries_once() {
    let calls = Cell::new(0_u32);
    let result: Result<(), String> = RetryPolicy::new(0, Duration::from_secs(1))
        .run("test", |_| {
            calls.set(calls.get() + 1);
            async { Err("nope".to_owned()) }
        })
        .await;
    assert!(result.is_err());
    assert_eq!(calls.get(), 1);
}

#[test]
fn backoff_doubles_up_to_cap_and_resets() {
    let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10));
    let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 10, 10]);

    backoff.reset();
    assert_eq!(backoff.next_delay(), Duration::from_secs(1));
}

#[test]
fn backoff_max_below_min_is_clamped() {
    let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(1));
    assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    assert_eq!(backoff.next_delay(), Duration::from_secs(5));
}
