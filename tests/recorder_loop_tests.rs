// Integration tests for the recorder loop
//
// Control commands and captured blocks arrive on separate channels; these
// tests check that the loop serializes them onto the controller correctly.

use anyhow::Result;
use field_recorder::recording::LogIndicator;
use field_recorder::{
    Blinker, DeviceClock, MemoryStorage, RecorderHandle, RecorderLoop, RecorderSettings,
    RecordingController, Storage, WavHeaderFields,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

type Controller = RecordingController<MemoryStorage>;

fn spawn_loop(storage: &MemoryStorage) -> (RecorderHandle, mpsc::Sender<Vec<u8>>, JoinHandle<Controller>) {
    let controller =
        RecordingController::new(RecorderSettings::default(), storage.clone(), DeviceClock::default());
    let (block_tx, block_rx) = mpsc::channel(8);

    let (recorder_loop, handle) = RecorderLoop::new(
        controller,
        block_rx,
        Blinker::new(Box::new(LogIndicator::default())),
        Duration::from_millis(10),
    );

    (handle, block_tx, tokio::spawn(recorder_loop.run()))
}

/// Wait until the loop has counted `samples` samples
async fn wait_for_samples(handle: &RecorderHandle, samples: u64) -> Result<()> {
    timeout(Duration::from_secs(5), async {
        loop {
            if handle.status().await?.total_samples >= samples {
                return Ok::<_, anyhow::Error>(());
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await?
}

/// Wait until the loop has taken every queued block off the channel
async fn wait_until_drained(block_tx: &mpsc::Sender<Vec<u8>>) -> Result<()> {
    timeout(Duration::from_secs(5), async {
        while block_tx.capacity() < block_tx.max_capacity() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn test_loop_records_blocks_between_start_and_stop() -> Result<()> {
    let storage = MemoryStorage::new();
    let (handle, block_tx, task) = spawn_loop(&storage);

    handle.start().await?;
    assert!(handle.status().await?.is_recording);

    for _ in 0..3 {
        block_tx.send(vec![9u8; 1024]).await?;
    }
    wait_for_samples(&handle, 768).await?;

    let summary = handle.stop().await?.expect("recording was active");
    assert_eq!(summary.data_byte_count, 3 * 1024);
    assert!(!handle.status().await?.is_recording);

    let bytes = storage.contents(&summary.file_name).expect("file exists");
    assert_eq!(bytes.len(), 44 + 3 * 1024);
    assert_eq!(WavHeaderFields::parse(&bytes)?.data_byte_count, 3 * 1024);

    drop(handle);
    let controller = task.await?;
    assert!(!controller.is_recording());
    Ok(())
}

#[tokio::test]
async fn test_blocks_while_idle_are_discarded() -> Result<()> {
    let storage = MemoryStorage::new();
    let (handle, block_tx, _task) = spawn_loop(&storage);

    for _ in 0..4 {
        block_tx.send(vec![1u8; 1024]).await?;
    }
    wait_until_drained(&block_tx).await?;

    handle.start().await?;
    let status = handle.status().await?;
    assert!(status.is_recording);
    assert_eq!(status.total_samples, 0);
    // Only the placeholder header has been written
    assert_eq!(storage.list()?[0].size_bytes, 44);
    Ok(())
}

#[tokio::test]
async fn test_repeated_commands_are_idempotent() -> Result<()> {
    let storage = MemoryStorage::new();
    let (handle, _block_tx, _task) = spawn_loop(&storage);

    assert!(handle.stop().await?.is_none());
    handle.start().await?;
    handle.start().await?;
    assert!(handle.stop().await?.is_some());
    assert!(handle.stop().await?.is_none());

    assert_eq!(storage.stats().creates, 1);
    Ok(())
}

#[tokio::test]
async fn test_dropping_all_handles_finalizes_recording() -> Result<()> {
    let storage = MemoryStorage::new();
    let (handle, block_tx, task) = spawn_loop(&storage);

    handle.start().await?;
    block_tx.send(vec![2u8; 1024]).await?;
    wait_for_samples(&handle, 256).await?;
    let file_name = handle.status().await?.file_name.expect("recording has a name");

    drop(handle);
    let controller = timeout(Duration::from_secs(5), task).await??;
    assert!(!controller.is_recording());

    let bytes = storage.contents(&file_name).expect("file exists");
    assert_eq!(WavHeaderFields::parse(&bytes)?.data_byte_count, 1024);
    Ok(())
}

#[tokio::test]
async fn test_failed_start_is_reported_and_loop_survives() -> Result<()> {
    let storage = MemoryStorage::new();
    let (handle, _block_tx, _task) = spawn_loop(&storage);

    storage.fail_creates(true);
    assert!(handle.start().await.is_err());
    assert!(!handle.status().await?.is_recording);

    storage.fail_creates(false);
    handle.start().await?;
    assert!(handle.status().await?.is_recording);
    Ok(())
}

#[tokio::test]
async fn test_closed_capture_keeps_commands_working() -> Result<()> {
    let storage = MemoryStorage::new();
    let (handle, block_tx, _task) = spawn_loop(&storage);

    drop(block_tx);

    handle.start().await?;
    let summary = handle.stop().await?.expect("recording was active");
    assert_eq!(summary.data_byte_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_loop_on_dedicated_thread_records_and_finalizes() -> Result<()> {
    let storage = MemoryStorage::new();
    let controller =
        RecordingController::new(RecorderSettings::default(), storage.clone(), DeviceClock::default());
    let (block_tx, block_rx) = mpsc::channel(8);
    let (recorder_loop, handle) = RecorderLoop::new(
        controller,
        block_rx,
        Blinker::new(Box::new(LogIndicator::default())),
        Duration::from_millis(10),
    );
    let thread = recorder_loop.spawn_on_thread()?;

    handle.start().await?;
    block_tx.send(vec![4u8; 1024]).await?;
    wait_for_samples(&handle, 256).await?;
    let file_name = handle.status().await?.file_name.expect("recording has a name");

    drop(handle);
    let controller = tokio::task::spawn_blocking(move || thread.join())
        .await?
        .map_err(|_| anyhow::anyhow!("recorder thread panicked"))??;
    assert!(!controller.is_recording());

    let bytes = storage.contents(&file_name).expect("file exists");
    assert_eq!(WavHeaderFields::parse(&bytes)?.data_byte_count, 1024);
    Ok(())
}
