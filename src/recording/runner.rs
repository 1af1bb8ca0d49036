use std::io;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::controller::RecordingController;
use super::error::RecorderError;
use super::indicator::Blinker;
use super::stats::{RecorderStatus, RecordingSummary};
use crate::storage::Storage;

/// Requests handed to the recorder loop
#[derive(Debug)]
pub enum RecorderCommand {
    Start(oneshot::Sender<Result<(), RecorderError>>),
    Stop(oneshot::Sender<Result<Option<RecordingSummary>, RecorderError>>),
    Status(oneshot::Sender<RecorderStatus>),
    SetTime(i64, oneshot::Sender<Result<(), RecorderError>>),
}

/// Cloneable control surface for the recorder loop
///
/// Every call is executed by the loop itself, in arrival order, so the
/// controller is never touched from two places at once.
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    commands: mpsc::Sender<RecorderCommand>,
}

impl RecorderHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RecorderCommand,
    ) -> Result<T, RecorderError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| RecorderError::LoopStopped)?;
        reply_rx.await.map_err(|_| RecorderError::LoopStopped)
    }

    pub async fn start(&self) -> Result<(), RecorderError> {
        self.request(RecorderCommand::Start).await?
    }

    pub async fn stop(&self) -> Result<Option<RecordingSummary>, RecorderError> {
        self.request(RecorderCommand::Stop).await?
    }

    pub async fn status(&self) -> Result<RecorderStatus, RecorderError> {
        self.request(RecorderCommand::Status).await
    }

    pub async fn set_time(&self, epoch_secs: i64) -> Result<(), RecorderError> {
        self.request(|reply| RecorderCommand::SetTime(epoch_secs, reply)).await?
    }
}

/// The single execution context that owns the recording controller
///
/// Multiplexes control commands, captured blocks and the indicator timer.
pub struct RecorderLoop<S: Storage> {
    controller: RecordingController<S>,
    commands: mpsc::Receiver<RecorderCommand>,
    blocks: mpsc::Receiver<Vec<u8>>,
    blinker: Blinker,
    blink_interval: Duration,
}

impl<S: Storage> RecorderLoop<S> {
    /// Build the loop and the handle used to control it
    pub fn new(
        controller: RecordingController<S>,
        blocks: mpsc::Receiver<Vec<u8>>,
        blinker: Blinker,
        blink_interval: Duration,
    ) -> (Self, RecorderHandle) {
        let (commands_tx, commands) = mpsc::channel(16);

        let recorder_loop = Self {
            controller,
            commands,
            blocks,
            blinker,
            blink_interval,
        };

        (recorder_loop, RecorderHandle { commands: commands_tx })
    }

    /// Run the loop on a dedicated thread with its own single-threaded runtime
    ///
    /// Storage writes are blocking; on this thread they stall only the
    /// recorder, never the runtime serving HTTP.
    pub fn spawn_on_thread(
        self,
    ) -> io::Result<thread::JoinHandle<io::Result<RecordingController<S>>>> {
        thread::Builder::new()
            .name("recorder".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()?;
                Ok(runtime.block_on(self.run()))
            })
    }

    /// Run until every [`RecorderHandle`] is dropped
    ///
    /// An open recording is finalized before returning. The controller is
    /// handed back so the caller can inspect its final state.
    pub async fn run(mut self) -> RecordingController<S> {
        info!("Recorder loop started");

        let mut blink = tokio::time::interval(self.blink_interval);
        blink.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut capture_open = true;

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },

                block = self.blocks.recv(), if capture_open => match block {
                    Some(mut block) => self.handle_block(&mut block),
                    None => {
                        warn!("Capture source closed, no more audio will arrive");
                        capture_open = false;
                    }
                },

                _ = blink.tick() => self.blinker.on_tick(self.controller.is_recording()),
            }
        }

        if self.controller.is_recording() {
            if let Err(e) = self.controller.stop() {
                error!("Failed to finalize recording on shutdown: {}", e);
            }
        }
        self.blinker.on_tick(false);

        info!("Recorder loop stopped");
        self.controller
    }

    fn handle_command(&mut self, command: RecorderCommand) {
        // A dropped reply receiver just means the requester stopped waiting
        match command {
            RecorderCommand::Start(reply) => {
                let _ = reply.send(self.controller.start());
            }
            RecorderCommand::Stop(reply) => {
                let result = self.controller.stop();
                self.blinker.on_tick(false);
                let _ = reply.send(result);
            }
            RecorderCommand::Status(reply) => {
                let _ = reply.send(self.controller.status());
            }
            RecorderCommand::SetTime(epoch_secs, reply) => {
                let _ = reply.send(self.controller.set_time(epoch_secs));
            }
        }
    }

    fn handle_block(&mut self, block: &mut [u8]) {
        if !self.controller.is_recording() {
            // Nobody is recording; the block is dropped like an unread
            // hardware buffer would be
            debug!("Discarding {} byte block while idle", block.len());
            return;
        }

        if let Err(e) = self.controller.append_block(block) {
            error!("Failed to append audio block: {}", e);
        }
    }
}
