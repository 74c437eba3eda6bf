//! End-to-end tests for the settle watcher against a real file system.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use dngwatch_settle_watcher::{SettleWatcher, StableFileReceiver, WatchConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const QUIET: Duration = Duration::from_millis(300);
const POLL: Duration = Duration::from_millis(50);
const WAIT: Duration = Duration::from_secs(10);

fn config(root: &Path) -> WatchConfig {
    WatchConfig::new([root])
        .with_quiescence_period(QUIET)
        .with_poll_interval(POLL)
}

fn append(path: &Path, data: &[u8]) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(data).unwrap();
    file.sync_all().unwrap();
}

async fn next(rx: &mut StableFileReceiver) -> dngwatch_settle_watcher::StableFile {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a stable file")
        .expect("subscription closed")
}

async fn assert_quiet(rx: &mut StableFileReceiver, window: Duration) {
    if let Ok(Some(extra)) = tokio::time::timeout(window, rx.recv()).await {
        panic!("unexpected notification for {}", extra.path.display());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_file_reported_once() {
    let temp_dir = TempDir::new().unwrap();
    let watcher = SettleWatcher::new(config(temp_dir.path())).unwrap();
    let mut rx = watcher.subscribe();
    watcher.start().await.unwrap();

    let path = temp_dir.path().join("a.txt");
    let written_at = Instant::now();
    append(&path, b"hello");

    let stable = next(&mut rx).await;
    assert_eq!(stable.path, path);
    assert!(written_at.elapsed() >= QUIET);

    assert_quiet(&mut rx, QUIET * 3).await;
    assert_eq!(watcher.stats().emitted, 1);
    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_existing_files_seeded_by_scan() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("card/DCIM");
    fs::create_dir_all(&nested).unwrap();
    File::create(nested.join("IMG_0001.CR3")).unwrap();

    let watcher = SettleWatcher::new(config(temp_dir.path())).unwrap();
    let mut rx = watcher.subscribe();
    let summary = watcher.start().await.unwrap();
    assert_eq!(summary.files_seeded, 1);

    let stable = next(&mut rx).await;
    assert_eq!(stable.path, nested.join("IMG_0001.CR3"));
    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_continuous_writes_hold_back_report() {
    let temp_dir = TempDir::new().unwrap();
    let watcher = SettleWatcher::new(config(temp_dir.path())).unwrap();
    let mut rx = watcher.subscribe();
    watcher.start().await.unwrap();

    let path = temp_dir.path().join("big.raw");
    for _ in 0..12 {
        append(&path, &[0u8; 1024]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err(), "reported while still being written");
    }
    let last_write = Instant::now();

    let stable = next(&mut rx).await;
    assert_eq!(stable.path, path);
    assert!(last_write.elapsed() + Duration::from_millis(50) >= QUIET);
    assert!(stable.touches > 1);
    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_subscribers_receive_same_path() {
    let temp_dir = TempDir::new().unwrap();
    let watcher = SettleWatcher::new(config(temp_dir.path())).unwrap();
    let mut first = watcher.subscribe();
    let mut second = watcher.subscribe();
    watcher.start().await.unwrap();

    let path = temp_dir.path().join("shared.txt");
    append(&path, b"data");

    assert_eq!(next(&mut first).await.path, path);
    assert_eq!(next(&mut second).await.path, path);
    assert_quiet(&mut first, QUIET * 2).await;
    assert_quiet(&mut second, Duration::from_millis(10)).await;
    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_removed_file_never_reported() {
    let temp_dir = TempDir::new().unwrap();
    let watcher = SettleWatcher::new(config(temp_dir.path())).unwrap();
    let mut rx = watcher.subscribe();
    watcher.start().await.unwrap();

    let path = temp_dir.path().join("partial.tmp");
    append(&path, b"half");
    fs::remove_file(&path).unwrap();

    assert_quiet(&mut rx, QUIET * 4).await;
    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_files_renamed_into_place_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let watcher = SettleWatcher::new(config(temp_dir.path())).unwrap();
    let mut rx = watcher.subscribe();
    watcher.start().await.unwrap();

    // Write under a temporary name, then rename, the way rsync finishes a copy.
    let partial = temp_dir.path().join(".IMG_0001.CR3.abc123");
    let finished = temp_dir.path().join("IMG_0001.CR3");
    append(&partial, b"raw");
    fs::rename(&partial, &finished).unwrap();

    let staged = outside.path().join("IMG_0002.CR3");
    append(&staged, b"raw");
    let moved_in = temp_dir.path().join("IMG_0002.CR3");
    fs::rename(&staged, &moved_in).unwrap();

    let mut delivered = vec![next(&mut rx).await.path, next(&mut rx).await.path];
    delivered.sort();
    assert_eq!(delivered, vec![finished, moved_in]);

    assert_quiet(&mut rx, QUIET * 3).await;
    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_subdirectory_is_watched() {
    let temp_dir = TempDir::new().unwrap();
    let watcher = SettleWatcher::new(config(temp_dir.path())).unwrap();
    let mut rx = watcher.subscribe();
    watcher.start().await.unwrap();

    let subdir = temp_dir.path().join("import");
    fs::create_dir(&subdir).unwrap();
    // Give the backend a moment to register the new directory.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let path = subdir.join("IMG_0002.CR3");
    append(&path, b"raw");

    let stable = next(&mut rx).await;
    assert_eq!(stable.path, path);
    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nothing_delivered_after_stop() {
    let temp_dir = TempDir::new().unwrap();
    let watcher = SettleWatcher::new(config(temp_dir.path())).unwrap();
    let mut rx = watcher.subscribe();
    watcher.start().await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), watcher.stop())
        .await
        .unwrap()
        .unwrap();
    append(&temp_dir.path().join("late.txt"), b"too late");

    let result = tokio::time::timeout(QUIET * 3, rx.recv()).await;
    assert!(matches!(result, Ok(None)));
    assert!(!watcher.is_running().await);
}
