//! Tests for the locks subsystem.

use super::*;
use crate::error::StorageError;
use chrono::Utc;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const FAST_RETRY: Duration = Duration::from_millis(20);

fn fast_lock(dir: &std::path::Path) -> StaleLock {
    StaleLock::new(dir)
        .with_retry_interval(FAST_RETRY)
        .with_default_timeout(Some(Duration::from_millis(200)))
}

fn write_heartbeat(lock: &StaleLock, age: chrono::Duration, owner_id: u32) {
    let meta = LockMetadata {
        timestamp: Utc::now() - age,
        owner_id,
        owner: "ghost@elsewhere".to_string(),
    };
    fs::write(lock.data_path(), meta.to_json().unwrap()).unwrap();
}

#[test]
fn test_lock_metadata_creation() {
    let meta = LockMetadata::new();

    assert!(!meta.owner.is_empty());
    assert_eq!(meta.owner_id, std::process::id());
    assert!(meta.age().num_seconds() < 5);
    assert!(!meta.is_stale(Duration::from_secs(60)));
}

#[test]
fn test_lock_metadata_serialization() {
    let meta = LockMetadata::new();
    let json = meta.to_json().unwrap();

    assert!(json.contains("\"timestamp\""));
    assert!(json.contains("\"owner_id\""));

    let parsed: LockMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, meta);
}

#[test]
fn test_lock_metadata_staleness() {
    let mut meta = LockMetadata::new();
    meta.timestamp = Utc::now() - chrono::Duration::minutes(11);
    assert!(meta.is_stale(Duration::from_secs(600)));
    assert!(meta.age_string().starts_with("11m"));

    // A clock running ahead must not make a live holder look stale.
    meta.timestamp = Utc::now() + chrono::Duration::minutes(5);
    assert!(!meta.is_stale(Duration::from_secs(1)));
}

#[test]
fn test_read_missing_or_corrupt_metadata_is_none() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(LOCK_DATA_FILE_NAME);

    assert!(LockMetadata::read(&path).unwrap().is_none());

    fs::write(&path, "{ not json").unwrap();
    assert!(LockMetadata::read(&path).unwrap().is_none());
}

#[test]
fn test_acquire_writes_heartbeat_and_release_removes_it() {
    let temp_dir = TempDir::new().unwrap();
    let mut lock = fast_lock(temp_dir.path());

    lock.acquire().unwrap();
    assert!(lock.is_held());
    assert!(lock.lock_path().exists());

    let meta = LockMetadata::read(lock.data_path()).unwrap().unwrap();
    assert_eq!(meta.owner_id, std::process::id());

    lock.release().unwrap();
    assert!(!lock.is_held());
    assert!(!lock.data_path().exists());
}

#[test]
fn test_second_holder_times_out() {
    let temp_dir = TempDir::new().unwrap();
    let mut first = fast_lock(temp_dir.path());
    let mut second = fast_lock(temp_dir.path());

    first.acquire().unwrap();

    let timeout = Duration::from_millis(200);
    let started = Instant::now();
    let err = second.acquire_with_timeout(Some(timeout)).unwrap_err();
    let elapsed = started.elapsed();

    match err {
        StorageError::LockTimeout { path, timeout: t } => {
            assert_eq!(path, first.lock_path());
            assert_eq!(t, timeout);
        }
        other => panic!("expected LockTimeout, got {other:?}"),
    }
    assert!(elapsed >= timeout, "timed out early after {elapsed:?}");
    // The final sleep is clamped to the deadline, so at most one retry
    // interval of overshoot plus scheduling slack.
    let late = timeout + FAST_RETRY + Duration::from_millis(100);
    assert!(elapsed < late, "timed out late after {elapsed:?}");
    assert!(!second.is_held());

    // The failed attempt must not disturb the holder's heartbeat.
    assert!(first.data_path().exists());
}

#[test]
fn test_release_lets_next_holder_in() {
    let temp_dir = TempDir::new().unwrap();
    let mut first = fast_lock(temp_dir.path());
    let mut second = fast_lock(temp_dir.path());

    first.acquire().unwrap();
    first.release().unwrap();

    second.acquire().unwrap();
    assert!(second.is_held());
}

#[test]
fn test_release_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let mut lock = fast_lock(temp_dir.path());

    lock.release().unwrap();

    lock.acquire().unwrap();
    lock.release().unwrap();
    lock.release().unwrap();
    assert!(!lock.is_held());
}

#[test]
fn test_acquire_when_already_held_is_noop() {
    let temp_dir = TempDir::new().unwrap();
    let mut lock = fast_lock(temp_dir.path());

    lock.acquire().unwrap();
    let before = LockMetadata::read(lock.data_path()).unwrap();
    lock.acquire_with_timeout(Some(Duration::ZERO)).unwrap();
    let after = LockMetadata::read(lock.data_path()).unwrap();

    assert_eq!(before, after);
}

#[test]
fn test_guard_releases_on_drop() {
    let temp_dir = TempDir::new().unwrap();
    let mut lock = fast_lock(temp_dir.path());

    {
        let guard = lock.lock().unwrap();
        assert!(guard.path().ends_with(LOCK_FILE_NAME));
        let mut other = fast_lock(temp_dir.path());
        assert!(
            other
                .acquire_with_timeout(Some(Duration::from_millis(50)))
                .unwrap_err()
                .is_lock_timeout()
        );
    }

    assert!(!lock.is_held());
    let mut other = fast_lock(temp_dir.path());
    other.acquire().unwrap();
}

#[test]
fn test_guard_releases_on_error_path() {
    fn critical_section(lock: &mut StaleLock) -> crate::error::Result<()> {
        let _guard = lock.lock()?;
        Err(StorageError::InstallFailure("boom".to_string()))
    }

    let temp_dir = TempDir::new().unwrap();
    let mut lock = fast_lock(temp_dir.path());

    assert!(critical_section(&mut lock).is_err());
    assert!(!lock.is_held());
    assert!(!lock.data_path().exists());
}

#[test]
fn test_dropping_lock_releases_it() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut lock = fast_lock(temp_dir.path());
        lock.acquire().unwrap();
    }

    let mut other = fast_lock(temp_dir.path());
    other.acquire().unwrap();
}

#[test]
fn test_stale_heartbeat_is_reclaimed_from_live_handle() {
    let temp_dir = TempDir::new().unwrap();
    let mut crashed = fast_lock(temp_dir.path());
    crashed.acquire().unwrap();

    // The holder hung: its handle is still locked but the heartbeat aged out.
    write_heartbeat(&crashed, chrono::Duration::minutes(30), 4_000_001);

    let mut next = fast_lock(temp_dir.path());
    let started = Instant::now();
    next.acquire_with_timeout(Some(Duration::from_secs(2))).unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));

    let meta = LockMetadata::read(next.data_path()).unwrap().unwrap();
    assert_eq!(meta.owner_id, std::process::id());

    // The pre-empted holder must not erase the new heartbeat.
    crashed.release().unwrap();
    assert_eq!(LockMetadata::read(next.data_path()).unwrap(), Some(meta));
}

#[test]
fn test_unlocked_handle_without_heartbeat_is_taken() {
    let temp_dir = TempDir::new().unwrap();
    let mut lock = fast_lock(temp_dir.path());

    // Crash between creating the handle and writing metadata.
    fs::write(lock.lock_path(), b"").unwrap();

    lock.acquire_with_timeout(Some(Duration::ZERO)).unwrap();
    assert!(lock.is_held());
}

#[test]
fn test_locked_handle_without_heartbeat_is_not_reclaimed() {
    let temp_dir = TempDir::new().unwrap();
    let mut holder = fast_lock(temp_dir.path());
    holder.acquire().unwrap();

    // A live holder between locking and writing, or between deleting its
    // heartbeat and unlocking, looks like this.
    fs::remove_file(holder.data_path()).unwrap();
    let before = fs::metadata(holder.lock_path()).unwrap();

    let mut waiter = fast_lock(temp_dir.path()).with_stale_threshold(Duration::ZERO);
    let err = waiter
        .acquire_with_timeout(Some(Duration::from_millis(100)))
        .unwrap_err();
    assert!(err.is_lock_timeout(), "{err:?}");
    assert!(!waiter.is_held());

    let after = fs::metadata(holder.lock_path()).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        assert_eq!(before.ino(), after.ino(), "holder's handle was replaced");
    }
    #[cfg(not(unix))]
    let _ = (before, after);
}

#[test]
fn test_gate_file_survives_release_and_clear() {
    let temp_dir = TempDir::new().unwrap();
    let gate = temp_dir.path().join(LOCK_GATE_FILE_NAME);
    let mut lock = fast_lock(temp_dir.path());

    lock.acquire().unwrap();
    lock.release().unwrap();
    assert!(gate.exists());

    lock.acquire().unwrap();
    clear_lock(temp_dir.path()).unwrap();
    assert!(gate.exists());
}

#[test]
fn test_fresh_foreign_heartbeat_blocks_until_stale() {
    let temp_dir = TempDir::new().unwrap();
    let mut holder = fast_lock(temp_dir.path());
    holder.acquire().unwrap();
    write_heartbeat(&holder, chrono::Duration::seconds(1), 4_000_002);

    let mut waiter = fast_lock(temp_dir.path()).with_stale_threshold(Duration::from_secs(60));
    assert!(
        waiter
            .acquire_with_timeout(Some(Duration::from_millis(100)))
            .unwrap_err()
            .is_lock_timeout()
    );

    let mut impatient = fast_lock(temp_dir.path()).with_stale_threshold(Duration::ZERO);
    impatient
        .acquire_with_timeout(Some(Duration::from_secs(1)))
        .unwrap();
}

#[test]
fn test_filesystem_errors_propagate() {
    let temp_dir = TempDir::new().unwrap();
    let not_a_dir = temp_dir.path().join("plain-file");
    fs::write(&not_a_dir, b"x").unwrap();

    let mut lock = fast_lock(&not_a_dir);
    let err = lock.acquire().unwrap_err();

    assert!(matches!(err, StorageError::Filesystem { .. }), "{err:?}");
}

#[test]
fn test_mutual_exclusion_across_handles() {
    let temp_dir = TempDir::new().unwrap();
    let dir = Arc::new(temp_dir.path().to_path_buf());
    let inside = Arc::new(AtomicUsize::new(0));
    let entered = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dir = Arc::clone(&dir);
            let inside = Arc::clone(&inside);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let mut lock = StaleLock::new(dir.as_path())
                    .with_retry_interval(Duration::from_millis(5))
                    .with_default_timeout(None);
                for _ in 0..5 {
                    let _guard = lock.lock().unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    thread::sleep(Duration::from_millis(2));
                    entered.fetch_add(1, Ordering::SeqCst);
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(entered.load(Ordering::SeqCst), 20);
}

#[test]
fn test_handoffs_under_heavy_contention() {
    const WAITERS: usize = 16;
    const ROUNDS: usize = 15;

    let temp_dir = TempDir::new().unwrap();
    let dir = Arc::new(temp_dir.path().to_path_buf());
    let inside = Arc::new(AtomicUsize::new(0));
    let entered = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..WAITERS)
        .map(|_| {
            let dir = Arc::clone(&dir);
            let inside = Arc::clone(&inside);
            let entered = Arc::clone(&entered);
            let overlaps = Arc::clone(&overlaps);
            let errors = Arc::clone(&errors);
            thread::spawn(move || {
                let mut lock = StaleLock::new(dir.as_path())
                    .with_retry_interval(Duration::from_millis(1))
                    .with_default_timeout(None);
                for _ in 0..ROUNDS {
                    match lock.lock() {
                        Ok(guard) => {
                            if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                                overlaps.fetch_add(1, Ordering::SeqCst);
                            }
                            thread::yield_now();
                            entered.fetch_add(1, Ordering::SeqCst);
                            inside.fetch_sub(1, Ordering::SeqCst);
                            if guard.release().is_err() {
                                errors.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                        Err(_) => {
                            errors.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(overlaps.load(Ordering::SeqCst), 0, "critical sections overlapped");
    assert_eq!(errors.load(Ordering::SeqCst), 0, "acquire or release failed");
    assert_eq!(entered.load(Ordering::SeqCst), WAITERS * ROUNDS);
}

#[test]
fn test_inspect_and_clear_lock() {
    let temp_dir = TempDir::new().unwrap();
    assert!(
        inspect_lock(temp_dir.path(), DEFAULT_STALE_THRESHOLD)
            .unwrap()
            .is_none()
    );

    let mut lock = fast_lock(temp_dir.path());
    lock.acquire().unwrap();

    let info = inspect_lock(temp_dir.path(), DEFAULT_STALE_THRESHOLD)
        .unwrap()
        .unwrap();
    assert!(!info.is_stale);
    assert_eq!(info.metadata.as_ref().unwrap().owner_id, std::process::id());
    assert!(info.to_string().contains("pid:"));

    let cleared = clear_lock(temp_dir.path()).unwrap();
    assert!(cleared.is_some());
    assert!(!temp_dir.path().join(LOCK_FILE_NAME).exists());
    assert!(!temp_dir.path().join(LOCK_DATA_FILE_NAME).exists());
}

#[test]
fn test_inspect_ignores_released_handle() {
    let temp_dir = TempDir::new().unwrap();
    let mut lock = fast_lock(temp_dir.path());
    lock.acquire().unwrap();
    lock.release().unwrap();

    assert!(lock.lock_path().exists());
    assert!(
        inspect_lock(temp_dir.path(), DEFAULT_STALE_THRESHOLD)
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_inspect_reports_locked_handle_without_heartbeat_as_live() {
    let temp_dir = TempDir::new().unwrap();
    let mut lock = fast_lock(temp_dir.path());
    lock.acquire().unwrap();
    fs::remove_file(lock.data_path()).unwrap();

    let info = inspect_lock(temp_dir.path(), Duration::ZERO)
        .unwrap()
        .unwrap();
    assert!(!info.is_stale);
    assert!(info.metadata.is_none());
    assert!(info.to_string().contains("no heartbeat"));
}
