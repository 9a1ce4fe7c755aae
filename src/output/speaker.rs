use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::task::JoinHandle;

use super::download::download_to_path;
use super::{
    AudioOutput, LoadId, OutputEvent, OutputEventKind, OutputEventSender, PlaybackPosition,
};
use crate::error::AudioError;

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub retries: u32,
    pub backoff_ms: u64,
    pub backoff_max_ms: u64,
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff_ms: 250,
            backoff_max_ms: 2000,
            timeout_secs: 30,
        }
    }
}

struct ActiveSink {
    sink: Arc<Sink>,
    end_cancel: Arc<AtomicBool>,
}

impl ActiveSink {
    fn stop(self) {
        self.end_cancel.store(true, Ordering::Relaxed);
        self.sink.stop();
    }
}

/// State shared with the in-flight load task.
#[derive(Default)]
struct Slot {
    load_id: u64,
    paused: bool,
    active: Option<ActiveSink>,
    duration_ms: Option<u64>,
    file: Option<NamedTempFile>,
}

impl Slot {
    fn clear(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(load_id = self.load_id, "stopping current sink");
            active.stop();
        }
        self.duration_ms = None;
        self.file = None;
    }
}

/// Speaker output: downloads each verse recitation to a temp file, decodes
/// it and plays it through a rodio [`Sink`].
///
/// Holds the OS output stream, so it has to stay on the thread that opened it.
pub struct RodioOutput {
    _stream: OutputStream,
    mixer: Mixer,
    http: reqwest::Client,
    cfg: DownloadConfig,
    tx_evt: OutputEventSender,
    slot: Arc<Mutex<Slot>>,
    loading: Option<JoinHandle<()>>,
}

impl RodioOutput {
    pub fn open(tx_evt: OutputEventSender, cfg: DownloadConfig) -> Result<Self, AudioError> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| AudioError::OutputStream(e.to_string()))?;
        let mixer = stream.mixer().clone();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| AudioError::OutputStream(format!("http client: {e}")))?;

        tracing::info!("audio output opened");
        Ok(Self {
            _stream: stream,
            mixer,
            http,
            cfg,
            tx_evt,
            slot: Arc::new(Mutex::new(Slot::default())),
            loading: None,
        })
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        lock(&self.slot)
    }

    fn abort_loading(&mut self) {
        if let Some(task) = self.loading.take() {
            task.abort();
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, url: &str) -> LoadId {
        self.abort_loading();

        let load_id = {
            let mut slot = self.slot();
            slot.clear();
            slot.load_id = slot.load_id.wrapping_add(1).max(1);
            slot.paused = true;
            slot.load_id
        };

        let task = LoadTask {
            load_id,
            url: url.to_owned(),
            http: self.http.clone(),
            cfg: self.cfg.clone(),
            mixer: self.mixer.clone(),
            slot: Arc::clone(&self.slot),
            tx_evt: self.tx_evt.clone(),
        };
        self.loading = Some(tokio::spawn(task.run()));
        LoadId(load_id)
    }

    fn play(&mut self) {
        let mut slot = self.slot();
        slot.paused = false;
        if let Some(active) = slot.active.as_ref() {
            active.sink.play();
        }
    }

    fn pause(&mut self) {
        let mut slot = self.slot();
        slot.paused = true;
        if let Some(active) = slot.active.as_ref() {
            active.sink.pause();
        }
    }

    fn rewind(&mut self) {
        let mut slot = self.slot();
        slot.paused = true;
        if let Some(active) = slot.active.as_ref() {
            active.sink.pause();
            if let Err(e) = active.sink.try_seek(Duration::ZERO) {
                tracing::warn!(err = %e, "rewind failed");
            }
        }
    }

    fn release(&mut self) {
        self.abort_loading();
        let mut slot = self.slot();
        slot.clear();
        // Outdates any load task that already finished its download.
        slot.load_id = slot.load_id.wrapping_add(1).max(1);
    }

    fn position(&self) -> Option<PlaybackPosition> {
        let slot = self.slot();
        let active = slot.active.as_ref()?;
        Some(PlaybackPosition {
            position_ms: active.sink.get_pos().as_millis() as u64,
            duration_ms: slot.duration_ms,
        })
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.release();
    }
}

struct LoadTask {
    load_id: u64,
    url: String,
    http: reqwest::Client,
    cfg: DownloadConfig,
    mixer: Mixer,
    slot: Arc<Mutex<Slot>>,
    tx_evt: OutputEventSender,
}

impl LoadTask {
    async fn run(self) {
        let kind = match self.fetch_and_attach().await {
            Ok(Some(duration_ms)) => OutputEventKind::Started { duration_ms },
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(load_id = self.load_id, url = %self.url, err = %e, "audio load failed");
                OutputEventKind::Failed(e.to_string())
            }
        };
        let _ = self.tx_evt.send(OutputEvent {
            load_id: LoadId(self.load_id),
            kind,
        });
    }

    /// `Ok(None)` means the load was superseded while in flight.
    async fn fetch_and_attach(&self) -> Result<Option<Option<u64>>, AudioError> {
        let file = NamedTempFile::new().map_err(|source| AudioError::OpenFile { source })?;
        download_to_path(
            &self.http,
            file.path(),
            &self.url,
            self.cfg.retries,
            self.cfg.backoff_ms,
            self.cfg.backoff_max_ms,
        )
        .await?;

        let path = file.path().to_owned();
        let mixer = self.mixer.clone();
        let url = self.url.clone();
        let (sink, duration_ms) =
            tokio::task::spawn_blocking(move || build_sink(&mixer, &path, &url))
                .await
                .map_err(|e| AudioError::OutputStream(format!("decode task: {e}")))??;

        let mut slot = lock(&self.slot);
        if slot.load_id != self.load_id {
            sink.stop();
            return Ok(None);
        }

        let sink = Arc::new(sink);
        if !slot.paused {
            sink.play();
        }
        let end_cancel = spawn_end_check(self.load_id, Arc::clone(&sink), self.tx_evt.clone())?;
        slot.active = Some(ActiveSink { sink, end_cancel });
        slot.duration_ms = duration_ms;
        slot.file = Some(file);
        tracing::debug!(load_id = self.load_id, ?duration_ms, "audio ready");
        Ok(Some(duration_ms))
    }
}

/// Builds a paused sink for the downloaded file.
fn build_sink(mixer: &Mixer, path: &Path, url: &str) -> Result<(Sink, Option<u64>), AudioError> {
    let file = File::open(path).map_err(|source| AudioError::OpenFile { source })?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
        url: url.to_owned(),
        source: Box::new(e),
    })?;
    let duration_ms = decoder.total_duration().map(|d| d.as_millis() as u64);

    let sink = Sink::connect_new(mixer);
    sink.pause();
    sink.append(decoder);
    Ok((sink, duration_ms))
}

fn spawn_end_check(
    load_id: u64,
    sink: Arc<Sink>,
    tx_evt: OutputEventSender,
) -> Result<Arc<AtomicBool>, AudioError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_end = Arc::clone(&cancel);

    thread::Builder::new()
        .name(format!("audio-end-check-{load_id}"))
        .spawn(move || {
            sink.sleep_until_end();
            if cancel_end.load(Ordering::Relaxed) {
                tracing::debug!(load_id, "end check cancelled");
                return;
            }
            tracing::debug!(load_id, "item finished");
            let _ = tx_evt.send(OutputEvent {
                load_id: LoadId(load_id),
                kind: OutputEventKind::Ended,
            });
        })
        .map_err(|source| AudioError::Thread { source })?;

    Ok(cancel)
}
