use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

use super::messages::{EventReceiver, LookupReceiver, PlaybackCommand, QueueStatus};
use super::queue::PlaybackQueue;
use super::source::AudioEditionSource;
use crate::domain::{AudioEdition, PlayableItem};
use crate::error::{AppError, AudioError};
use crate::output::{AudioOutput, OutputEventReceiver, OutputEventSender};

pub const DEFAULT_TICK: Duration = Duration::from_millis(250);

/// Owns one [`PlaybackQueue`] and serializes everything that touches it:
/// commands, lookup completions, output events and progress ticks.
pub struct PlaybackEngine<S, O> {
    queue: PlaybackQueue<S, O>,
    rx_cmd: mpsc::Receiver<PlaybackCommand>,
    rx_lookup: LookupReceiver,
    rx_output: OutputEventReceiver,
}

impl<S: AudioEditionSource, O: AudioOutput> PlaybackEngine<S, O> {
    pub fn new(
        source: Arc<S>,
        edition: watch::Receiver<AudioEdition>,
        output: O,
        rx_output: OutputEventReceiver,
    ) -> (Self, PlaybackHandle) {
        let (tx_cmd, rx_cmd) = mpsc::channel(64);
        let (queue, rx_lookup) = PlaybackQueue::new(source, edition, output);
        let engine = Self {
            queue,
            rx_cmd,
            rx_lookup,
            rx_output,
        };
        (engine, PlaybackHandle { tx: tx_cmd })
    }

    /// Runs until every [`PlaybackHandle`] is dropped.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(DEFAULT_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.rx_cmd.recv() => {
                    let Some(cmd) = cmd else { break };
                    self.handle(cmd);
                }
                Some(outcome) = self.rx_lookup.recv() => self.queue.on_lookup(outcome),
                Some(evt) = self.rx_output.recv() => self.queue.on_output(evt),
                _ = ticker.tick() => self.queue.tick(),
            }
        }

        self.queue.release();
        tracing::info!("playback engine stopped");
    }

    fn handle(&mut self, cmd: PlaybackCommand) {
        match cmd {
            PlaybackCommand::SetQueue {
                items,
                repeat,
                events,
            } => self.queue.set_queue(items, repeat, events),
            PlaybackCommand::Play => self.queue.play(),
            PlaybackCommand::Pause => self.queue.pause(),
            PlaybackCommand::Resume => self.queue.resume(),
            PlaybackCommand::Stop => self.queue.stop(),
            PlaybackCommand::Next => self.queue.next(),
            PlaybackCommand::Prev => self.queue.prev(),
            PlaybackCommand::SetRepeatCount(n) => self.queue.set_repeat_count(n),
            PlaybackCommand::Status { reply } => {
                let _ = reply.send(self.queue.status());
            }
        }
    }
}

/// Cloneable control surface of a running [`PlaybackEngine`].
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    tx: mpsc::Sender<PlaybackCommand>,
}

impl PlaybackHandle {
    async fn send(&self, cmd: PlaybackCommand) -> Result<(), AppError> {
        self.tx.send(cmd).await.map_err(|_| AppError::EngineClosed)
    }

    /// Replaces the session and returns the receiver of its events.
    pub async fn set_queue(
        &self,
        items: Vec<PlayableItem>,
        repeat: u32,
    ) -> Result<EventReceiver, AppError> {
        let (events, rx) = mpsc::unbounded_channel();
        self.send(PlaybackCommand::SetQueue {
            items,
            repeat,
            events,
        })
        .await?;
        Ok(rx)
    }

    pub async fn play(&self) -> Result<(), AppError> {
        self.send(PlaybackCommand::Play).await
    }

    pub async fn pause(&self) -> Result<(), AppError> {
        self.send(PlaybackCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), AppError> {
        self.send(PlaybackCommand::Resume).await
    }

    pub async fn stop(&self) -> Result<(), AppError> {
        self.send(PlaybackCommand::Stop).await
    }

    pub async fn next(&self) -> Result<(), AppError> {
        self.send(PlaybackCommand::Next).await
    }

    pub async fn prev(&self) -> Result<(), AppError> {
        self.send(PlaybackCommand::Prev).await
    }

    pub async fn set_repeat_count(&self, count: u32) -> Result<(), AppError> {
        self.send(PlaybackCommand::SetRepeatCount(count)).await
    }

    pub async fn status(&self) -> Result<QueueStatus, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(PlaybackCommand::Status { reply }).await?;
        rx.await.map_err(|_| AppError::EngineClosed)
    }
}

/// Starts the engine on its own thread with a current-thread runtime, so
/// outputs that must stay on one thread (the rodio stream) can be used.
///
/// `make_output` runs on that thread; its error is returned here.
pub async fn spawn_playback_engine<S, O, F>(
    source: Arc<S>,
    edition: watch::Receiver<AudioEdition>,
    make_output: F,
) -> Result<PlaybackHandle, AppError>
where
    S: AudioEditionSource,
    O: AudioOutput + 'static,
    F: FnOnce(OutputEventSender) -> Result<O, AudioError> + Send + 'static,
{
    let (tx_ready, rx_ready) = oneshot::channel::<Result<PlaybackHandle, AppError>>();

    std::thread::Builder::new()
        .name("playback-engine".to_owned())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx_ready.send(Err(AppError::Io(e)));
                    return;
                }
            };
            let local = tokio::task::LocalSet::new();
            local.block_on(&rt, async move {
                let (tx_output, rx_output) = mpsc::unbounded_channel();
                let output = match make_output(tx_output) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::error!(err = %e, "failed to open audio output");
                        let _ = tx_ready.send(Err(AppError::Audio(e)));
                        return;
                    }
                };
                let (engine, handle) = PlaybackEngine::new(source, edition, output, rx_output);
                if tx_ready.send(Ok(handle)).is_err() {
                    return;
                }
                tracing::info!("playback engine started");
                engine.run().await;
            });
        })?;

    rx_ready.await.map_err(|_| AppError::EngineClosed)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::output::NullOutput;
    use crate::playback::{PlaybackEvent, PlaybackState, ProgressReason};

    struct UrlSource;

    impl AudioEditionSource for UrlSource {
        async fn lookup_audio(
            &self,
            chapter: u32,
            verse: u32,
            edition: AudioEdition,
        ) -> Result<Option<String>, ApiError> {
            Ok(Some(format!("https://cdn.example/{edition}/{chapter}/{verse}.mp3")))
        }
    }

    fn start() -> PlaybackHandle {
        let (_tx_edition, rx_edition) = watch::channel(AudioEdition::default());
        let (tx_out, rx_out) = mpsc::unbounded_channel();
        let output = NullOutput::new(tx_out, Duration::from_secs(3));
        let (engine, handle) = PlaybackEngine::new(Arc::new(UrlSource), rx_edition, output, rx_out);
        tokio::spawn(engine.run());
        handle
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reflects_commands() {
        let handle = start();
        let _events = handle
            .set_queue(vec![PlayableItem::new(1, 1), PlayableItem::new(1, 2)], 3)
            .await
            .expect("set queue");

        let status = handle.status().await.expect("status");
        assert_eq!(status.state, PlaybackState::Idle);
        assert_eq!(status.len, 2);
        assert_eq!(status.repeat.total(), 3);

        handle.play().await.expect("play");
        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = handle.status().await.expect("status");
        assert_eq!(status.state, PlaybackState::Playing);
        assert_eq!(status.cursor, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_report_position() {
        let handle = start();
        let mut events = handle
            .set_queue(vec![PlayableItem::new(1, 1)], 1)
            .await
            .expect("set queue");
        handle.play().await.expect("play");

        let mut last_tick = None;
        while let Some(evt) = events.recv().await {
            match evt {
                PlaybackEvent::Progress {
                    reason: ProgressReason::Tick,
                    position,
                    ..
                } => last_tick = position,
                PlaybackEvent::Ended { .. } => break,
                _ => {}
            }
        }
        let pos = last_tick.expect("at least one tick");
        assert_eq!(pos.duration_ms, Some(3000));
        assert!(pos.position_ms <= 3000);
    }

    #[tokio::test]
    async fn test_handle_errors_once_engine_is_gone() {
        let (_tx_edition, rx_edition) = watch::channel(AudioEdition::default());
        let (tx_out, rx_out) = mpsc::unbounded_channel();
        let output = NullOutput::new(tx_out, Duration::from_secs(1));
        let (engine, handle) = PlaybackEngine::new(Arc::new(UrlSource), rx_edition, output, rx_out);
        drop(engine);
        assert!(matches!(handle.play().await, Err(AppError::EngineClosed)));
    }

    #[tokio::test]
    async fn test_spawned_engine_reports_output_failure() {
        let (_tx_edition, rx_edition) = watch::channel(AudioEdition::default());
        let res = spawn_playback_engine(Arc::new(UrlSource), rx_edition, |_tx| {
            Err::<NullOutput, _>(AudioError::OutputStream("no device".into()))
        })
        .await;
        assert!(matches!(res, Err(AppError::Audio(_))));
    }

    #[tokio::test]
    async fn test_spawned_engine_runs_on_its_own_thread() {
        let (_tx_edition, rx_edition) = watch::channel(AudioEdition::default());
        let handle = spawn_playback_engine(Arc::new(UrlSource), rx_edition, |tx| {
            Ok(NullOutput::new(tx, Duration::from_millis(10)))
        })
        .await
        .expect("engine");
        let mut events = handle
            .set_queue(vec![PlayableItem::new(1, 1)], 1)
            .await
            .expect("set queue");
        handle.play().await.expect("play");

        loop {
            match events.recv().await.expect("event") {
                PlaybackEvent::Ended { .. } => break,
                _ => continue,
            }
        }
    }
}
