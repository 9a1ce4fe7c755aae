use qasas_player::domain::{AudioEdition, PlayableItem};
use qasas_player::error::ApiError;
use qasas_player::output::{NullOutput, OutputEventSender};
use qasas_player::playback::{
    AudioEditionSource, EventReceiver, PlaybackEngine, PlaybackEvent, PlaybackHandle,
    PlaybackState, ProgressReason,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const VERSE: Duration = Duration::from_secs(2);

#[derive(Default)]
struct ScriptedSource {
    failing: HashSet<u32>,
    /// Verses whose lookup takes this long.
    slow: Option<(u32, Duration)>,
}

impl AudioEditionSource for ScriptedSource {
    async fn lookup_audio(
        &self,
        chapter: u32,
        verse: u32,
        edition: AudioEdition,
    ) -> Result<Option<String>, ApiError> {
        if let Some((slow, delay)) = self.slow
            && slow == verse
        {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&verse) {
            return Err(ApiError::Status {
                status: 500,
                url: format!("ayah/{chapter}:{verse}/{edition}"),
            });
        }
        Ok(Some(format!("https://cdn.example/{edition}/{chapter}/{verse}.mp3")))
    }
}

fn start(
    source: ScriptedSource,
    output: impl FnOnce(OutputEventSender) -> NullOutput,
) -> PlaybackHandle {
    let (_tx_edition, rx_edition) = watch::channel(AudioEdition::default());
    let (tx_out, rx_out) = mpsc::unbounded_channel();
    let (engine, handle) = PlaybackEngine::new(Arc::new(source), rx_edition, output(tx_out), rx_out);
    tokio::spawn(engine.run());
    handle
}

fn silent(tx: OutputEventSender) -> NullOutput {
    NullOutput::new(tx, VERSE)
}

fn items(verses: &[u32]) -> Vec<PlayableItem> {
    verses.iter().map(|v| PlayableItem::new(12, *v)).collect()
}

/// Item-start indices up to and including the session's end.
async fn run_to_end(events: &mut EventReceiver) -> (Vec<usize>, usize) {
    let mut started = Vec::new();
    let mut ended = 0;
    while let Some(evt) = events.recv().await {
        match evt {
            PlaybackEvent::Progress {
                index: Some(i),
                reason: ProgressReason::ItemStarted,
                ..
            } => started.push(i),
            PlaybackEvent::Ended { .. } => {
                ended += 1;
                break;
            }
            _ => {}
        }
    }
    (started, ended)
}

#[tokio::test(start_paused = true)]
async fn three_verses_twice_then_one_end() {
    let handle = start(ScriptedSource::default(), silent);
    let mut events = handle.set_queue(items(&[1, 2, 3]), 2).await.expect("set queue");
    handle.play().await.expect("play");

    let (started, ended) = run_to_end(&mut events).await;
    assert_eq!(started, vec![0, 1, 2, 0, 1, 2]);
    assert_eq!(ended, 1);

    // No second end arrives later.
    tokio::time::sleep(VERSE * 10).await;
    assert!(events.try_recv().is_err());
    let status = handle.status().await.expect("status");
    assert_eq!(status.state, PlaybackState::Ended);
    assert_eq!(status.cursor, None);
}

#[tokio::test(start_paused = true)]
async fn repeat_count_of_n_plays_n_cycles() {
    for n in [1u32, 3] {
        let handle = start(ScriptedSource::default(), silent);
        let mut events = handle.set_queue(items(&[1, 2]), n).await.expect("set queue");
        handle.play().await.expect("play");
        let (started, ended) = run_to_end(&mut events).await;
        assert_eq!(started.len(), 2 * n as usize);
        assert_eq!(ended, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn failing_verse_is_skipped() {
    let source = ScriptedSource {
        failing: HashSet::from([2]),
        ..ScriptedSource::default()
    };
    let handle = start(source, silent);
    let mut events = handle.set_queue(items(&[1, 2, 3]), 1).await.expect("set queue");
    handle.play().await.expect("play");

    let (started, ended) = run_to_end(&mut events).await;
    assert_eq!(started, vec![0, 2]);
    assert_eq!(ended, 1);
}

#[tokio::test(start_paused = true)]
async fn output_refusing_a_url_is_skipped() {
    let handle = start(ScriptedSource::default(), |tx| {
        NullOutput::new(tx, VERSE).fail_url("https://cdn.example/ar.alafasy/12/1.mp3")
    });
    let mut events = handle.set_queue(items(&[1, 2]), 1).await.expect("set queue");
    handle.play().await.expect("play");

    // Verse 1 is handed to the output, refused, then verse 2 plays.
    let (started, ended) = run_to_end(&mut events).await;
    assert_eq!(started, vec![0, 1]);
    assert_eq!(ended, 1);
}

#[tokio::test(start_paused = true)]
async fn replacing_the_queue_silences_a_pending_lookup() {
    let source = ScriptedSource {
        slow: Some((1, Duration::from_secs(5))),
        ..ScriptedSource::default()
    };
    let handle = start(source, silent);
    let mut old = handle.set_queue(items(&[1, 2]), 1).await.expect("set queue");
    handle.play().await.expect("play");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.status().await.expect("status").state, PlaybackState::Loading);

    let mut new = handle.set_queue(items(&[7, 8]), 1).await.expect("set queue");
    tokio::time::sleep(Duration::from_secs(10)).await;

    let mut seen = Vec::new();
    while let Some(evt) = old.recv().await {
        seen.push(evt);
    }
    assert!(seen.iter().all(|e| matches!(
        e,
        PlaybackEvent::Progress {
            index: None,
            reason: ProgressReason::Stopped,
            ..
        }
    )));
    assert!(new.try_recv().is_err());
    let status = handle.status().await.expect("status");
    assert_eq!(status.state, PlaybackState::Idle);
    assert_eq!(status.len, 2);
}

#[tokio::test(start_paused = true)]
async fn stop_midway_then_play_restarts_all_cycles() {
    let handle = start(ScriptedSource::default(), silent);
    let mut events = handle.set_queue(items(&[1, 2, 3]), 2).await.expect("set queue");
    handle.play().await.expect("play");

    // Into the second verse of the first cycle.
    tokio::time::sleep(VERSE + VERSE / 2).await;
    handle.stop().await.expect("stop");
    let status = handle.status().await.expect("status");
    assert_eq!(status.cursor, None);
    assert_eq!((status.repeat.remaining(), status.repeat.completed()), (2, 0));
    while events.try_recv().is_ok() {}

    handle.play().await.expect("play");
    let (started, ended) = run_to_end(&mut events).await;
    assert_eq!(started, vec![0, 1, 2, 0, 1, 2]);
    assert_eq!(ended, 1);
}

#[tokio::test(start_paused = true)]
async fn pause_holds_the_item_until_resume() {
    let handle = start(ScriptedSource::default(), silent);
    let mut events = handle.set_queue(items(&[1, 2]), 1).await.expect("set queue");
    handle.play().await.expect("play");
    tokio::time::sleep(VERSE / 2).await;

    handle.pause().await.expect("pause");
    handle.pause().await.expect("pause");
    tokio::time::sleep(VERSE * 5).await;
    let status = handle.status().await.expect("status");
    assert_eq!(status.state, PlaybackState::Paused);
    assert_eq!(status.cursor, Some(0));

    handle.resume().await.expect("resume");
    let (started, ended) = run_to_end(&mut events).await;
    assert_eq!(started, vec![0, 1]);
    assert_eq!(ended, 1);
}

#[tokio::test(start_paused = true)]
async fn empty_queue_stays_silent() {
    let handle = start(ScriptedSource::default(), silent);
    let mut events = handle.set_queue(Vec::new(), 3).await.expect("set queue");
    handle.play().await.expect("play");
    handle.next().await.expect("next");
    handle.stop().await.expect("stop");
    tokio::time::sleep(VERSE).await;

    assert!(events.try_recv().is_err());
    assert_eq!(handle.status().await.expect("status").state, PlaybackState::Idle);
}
