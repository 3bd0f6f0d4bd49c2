//! Concurrent admission against a single limiter

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use steadfast::resilience::{Admission, ExecutionError, RateLimiter, Task};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_callers_never_overdraw() {
    // Slow refill so the only permits available are the seeded one plus a
    // handful of ticks
    let limiter: Arc<RateLimiter<(), ()>> = Arc::new(RateLimiter::new(50, 1).unwrap());
    let granted = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..32 {
        let limiter = Arc::clone(&limiter);
        let granted = Arc::clone(&granted);
        handles.push(tokio::spawn(async move {
            for _ in 0..200 {
                match limiter.try_acquire() {
                    Admission::Granted => {
                        granted.fetch_add(1, Ordering::SeqCst);
                    }
                    Admission::Rejected { wait } => {
                        assert!(wait <= Duration::from_secs(1));
                    }
                    Admission::Closed => unreachable!("limiter never closed"),
                }
                let available = limiter.available_permits();
                assert!((0.0..=50.0).contains(&available));
                tokio::task::yield_now().await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    // One seeded permit, plus at most one per elapsed second
    assert!(granted.load(Ordering::SeqCst) >= 1);
    assert!(granted.load(Ordering::SeqCst) <= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_execute_runs_each_granted_task_once() {
    let limiter: Arc<RateLimiter<usize, String>> = Arc::new(RateLimiter::new(100, 1000).unwrap());
    let runs = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..64 {
        let limiter = Arc::clone(&limiter);
        let runs = Arc::clone(&runs);
        handles.push(tokio::spawn(async move {
            let task = Task::new(move || {
                let runs = Arc::clone(&runs);
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(i)
                }
            });
            limiter.execute(task).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ExecutionError::Rejected { .. }) => {}
            Err(e) => panic!("unexpected failure: {}", e),
        }
    }

    assert_eq!(runs.load(Ordering::SeqCst), succeeded);
    assert!(succeeded >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_races_with_callers() {
    let limiter: Arc<RateLimiter<(), ()>> = Arc::new(RateLimiter::new(1000, 1000).unwrap());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let limiter = Arc::clone(&limiter);
        handles.push(tokio::spawn(async move {
            let mut saw_closed = false;
            for _ in 0..500 {
                match limiter.try_acquire() {
                    Admission::Closed => saw_closed = true,
                    _ => assert!(!saw_closed, "granted after observing close"),
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::time::sleep(Duration::from_millis(5)).await;
    limiter.close();

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(limiter.try_acquire(), Admission::Closed);
}
