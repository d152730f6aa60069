use crate::cache::entry::CacheEntry;
use crate::cache::{validate_key, CacheMetrics, SweepTask};
use crate::error::CacheError;
use crate::resource::{AsyncResource, ReadError, ResourceState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::debug;

// CMD TO RUN TESTS W/ CLEAR DEBUG OUTPUT
// $ RUST_LOG=trace cargo test unit -- --nocapture --test-threads=1

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expires_at_deadline() {
        let now = Instant::now();
        let ttl = Duration::from_millis(100);
        let entry = CacheEntry::new(AsyncResource::<u32, String>::ready(1), ttl, now);

        assert!(!entry.is_expired(now + Duration::from_millis(99)));
        assert!(entry.is_expired(now + ttl));
        assert!(entry.is_expired(now + Duration::from_millis(101)));
    }

    #[test]
    fn test_entry_touch_slides_deadline() {
        let now = Instant::now();
        let ttl = Duration::from_millis(100);
        let mut entry = CacheEntry::new(AsyncResource::<u32, String>::ready(1), ttl, now);

        entry.touch(ttl, now + Duration::from_millis(50));

        assert_eq!(entry.expires_at, Some(now + Duration::from_millis(150)));
        assert!(!entry.is_expired(now + Duration::from_millis(120)));
    }

    #[test]
    fn test_entry_with_unrepresentable_deadline_never_expires() {
        let now = Instant::now();
        let mut entry =
            CacheEntry::new(AsyncResource::<u32, String>::ready(1), Duration::MAX, now);

        assert_eq!(entry.expires_at, None);
        assert!(!entry.is_expired(now + Duration::from_secs(3600 * 24 * 365)));

        entry.touch(Duration::from_millis(10), now);
        assert!(entry.is_expired(now + Duration::from_millis(10)));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("pikachu").is_ok());
        assert!(validate_key("Mr. Mime").is_ok());

        for (key, expected) in [
            ("", "key is empty"),
            ("   ", "key is blank"),
            ("pika\tchu", "key contains control characters"),
            ("bulbasaur\n", "key contains control characters"),
        ] {
            match validate_key(key) {
                Err(CacheError::InvalidKey { key: rejected, reason }) => {
                    assert_eq!(rejected, key);
                    assert_eq!(reason, expected);
                }
                other => panic!("expected InvalidKey for {:?}, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn test_metrics_report() {
        let mut metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_evictions(3);
        metrics.record_invalidations(1);

        assert_eq!(
            metrics.report(),
            "Hits: 2, Misses: 1, Evictions: 3, Invalidations: 1"
        );
    }

    #[test]
    fn test_settled_constructors() {
        let ready = AsyncResource::<&str, String>::ready("pikachu");
        let failed = AsyncResource::<&str, String>::failed("boom".to_string());

        assert_eq!(ready.read(), Ok("pikachu"));
        assert_eq!(failed.read(), Err(ReadError::Failed("boom".to_string())));
        assert_eq!(failed.state(), ResourceState::Rejected("boom".to_string()));
        assert!(!ready.ptr_eq(&failed));
        assert!(ready.ptr_eq(&ready.clone()));
    }

    #[test]
    fn test_read_error_display() {
        assert_eq!(
            ReadError::<String>::Pending.to_string(),
            "resource is still pending"
        );
        assert_eq!(
            ReadError::Failed("not found".to_string()).to_string(),
            "resource failed: not found"
        );
    }

    #[test]
    fn test_dropped_operation_reads_abandoned() {
        init_tracing();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let resource = runtime.block_on(async {
            AsyncResource::spawn(std::future::pending::<Result<u32, String>>())
        });
        assert_eq!(resource.read(), Err(ReadError::Pending));

        // Shutting the runtime down drops the operation with it.
        drop(runtime);

        assert_eq!(resource.read(), Err(ReadError::Abandoned));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_stop_is_final() {
        init_tracing();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let task = SweepTask::start(&Handle::current(), Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(35)).await;
        let before = ticks.load(Ordering::SeqCst);
        debug!("ticks before stop: {}", before);
        assert!(before >= 3);

        task.stop().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_ends_when_target_is_gone() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let _task = SweepTask::start(&Handle::current(), Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_with_oversized_period_stops_cleanly() {
        init_tracing();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let task = SweepTask::start(&Handle::current(), Duration::MAX, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        // Joins without a panic surfacing from the loop.
        task.stop().await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sweep_task_never_fires() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let task = SweepTask::start(&Handle::current(), Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        drop(task);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
