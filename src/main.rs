use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use qasas_player::alquran::{AlQuranClient, AlQuranClientConfig};
use qasas_player::cli::{Cli, Command};
use qasas_player::domain::{AudioEdition, Passage, RECITERS, StoryPosition, Verse};
use qasas_player::error::AppError;
use qasas_player::logging::{self, LogConfig};
use qasas_player::output::{DownloadConfig, NullOutput, RodioOutput};
use qasas_player::passage::{LocalTextStore, PassageResolver};
use qasas_player::playback::{PlaybackHandle, PlaybackState, spawn_playback_engine};
use qasas_player::selection::{SelectionController, SelectionOrigin, SelectionView};
use qasas_player::settings::{SettingsStore, load_settings};
use qasas_player::status::{self, StatusTracker};

/// Per-verse duration of the silent output.
const NO_AUDIO_VERSE: Duration = Duration::from_secs(3);

const HELP: &str = "p: play | Enter: pause/resume | s: stop | n: next | b: previous | r N: repeat | e ID: reciter | q: quit";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut cfg = AlQuranClientConfig::default();
    if let Some(v) = cli.data_dir.clone() {
        cfg.data_dir = v;
    }
    if let Some(v) = cli.api_base.clone() {
        cfg.api_base = v;
    }

    let _log_guard = logging::init(
        &cfg.data_dir,
        LogConfig {
            dir: cli.log_dir.clone(),
            filter: cli.log_filter.clone(),
        },
    );
    tracing::info!(data_dir = %cfg.data_dir.display(), "qasas starting");

    match cli.command {
        Command::Editions => {
            let current = load_settings(&cfg.data_dir).audio_edition;
            for r in RECITERS {
                let mark = if r.id == current.as_str() { '*' } else { ' ' };
                println!("{mark} {:<24} {}", r.id, r.name);
            }
            Ok(())
        }
        Command::Text { chapter, from, to } => {
            let passage = Passage::new(chapter, from, to)?;
            let editions = load_settings(&cfg.data_dir).editions();
            let client = AlQuranClient::new(cfg.clone())?;
            let resolver = PassageResolver::new(LocalTextStore::new(cfg.text_dir()), client);
            print_verses(&resolver.resolve(&passage, &editions).await);
            Ok(())
        }
        Command::Play {
            chapter,
            from,
            to,
            repeat,
            edition,
        } => {
            let passage = Passage::new(chapter, from, to)?;
            run_play(cfg, cli.no_audio, passage, repeat, edition).await
        }
    }
}

async fn run_play(
    cfg: AlQuranClientConfig,
    no_audio: bool,
    passage: Passage,
    repeat: Option<u32>,
    edition: Option<String>,
) -> Result<(), AppError> {
    let mut settings = SettingsStore::open(&cfg.data_dir);
    if repeat.is_some() || edition.is_some() {
        let res = settings.update(|s| {
            if let Some(n) = repeat {
                s.repeat = n;
            }
            if let Some(e) = edition {
                s.audio_edition = AudioEdition::new(e);
            }
        });
        if let Err(e) = res {
            tracing::warn!(err = %e, "failed to persist settings");
        }
    }
    if !settings.get().audio_edition.is_known() {
        tracing::warn!(edition = %settings.get().audio_edition, "unknown audio edition");
    }

    let client = AlQuranClient::new(cfg.clone())?;
    let source = Arc::new(client.clone());
    let handle = if no_audio {
        tracing::info!("audio disabled, using silent output");
        spawn_playback_engine(source, settings.audio_edition(), |tx| {
            Ok(NullOutput::new(tx, NO_AUDIO_VERSE))
        })
        .await?
    } else {
        spawn_playback_engine(source, settings.audio_edition(), |tx| {
            RodioOutput::open(tx, DownloadConfig::default())
        })
        .await?
    };

    let resolver = PassageResolver::new(LocalTextStore::new(cfg.text_dir()), client);
    let mut controller = SelectionController::new(resolver, handle, settings);

    let position = StoryPosition::new(1, passage);
    println!("{}", status::position_info(&position));
    println!("{}", status::PREPARING);
    let Some(view) = controller.select(position, SelectionOrigin::DeepLink).await? else {
        return Ok(());
    };
    let mut session = Session::show(view);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_key(&mut controller, line.trim()).await? {
                    KeyOutcome::Continue => {}
                    KeyOutcome::Reselected(view) => session = Session::show(view),
                    KeyOutcome::Quit => break,
                }
            }
            Some(evt) = session.view.events.recv() => {
                let update = session.tracker.apply(&evt);
                if update.clear {
                    println!("\n>");
                }
                if let Some(n) = update.highlight
                    && let Some(v) = session.view.verses.iter().find(|v| v.number == n)
                {
                    println!("\n> {} {}", v.number, v.text);
                }
                print!("\r{}\x1b[K", update.line);
                let _ = std::io::stdout().flush();
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.playback().stop().await?;
    println!();
    tracing::info!("qasas exiting");
    Ok(())
}

struct Session {
    view: SelectionView,
    tracker: StatusTracker,
}

impl Session {
    fn show(view: SelectionView) -> Self {
        print_verses(&view.verses);
        println!("{}", status::ready(view.verses.len()));
        let tracker = StatusTracker::new(view.verses.iter().map(|v| v.number).collect());
        Self { view, tracker }
    }
}

enum KeyOutcome {
    Continue,
    Reselected(SelectionView),
    Quit,
}

async fn handle_key(
    controller: &mut SelectionController<LocalTextStore, AlQuranClient>,
    key: &str,
) -> Result<KeyOutcome, AppError> {
    let playback: &PlaybackHandle = controller.playback();
    match key.split_once(' ').unwrap_or((key, "")) {
        ("q", _) => return Ok(KeyOutcome::Quit),
        ("p", _) => playback.play().await?,
        ("", _) => match playback.status().await?.state {
            PlaybackState::Playing => playback.pause().await?,
            PlaybackState::Paused => playback.resume().await?,
            _ => playback.play().await?,
        },
        ("s", _) => playback.stop().await?,
        ("n", _) => playback.next().await?,
        ("b", _) => playback.prev().await?,
        ("r", n) => match n.trim().parse::<u32>() {
            Ok(n) => controller.change_repeat(n).await?,
            Err(_) => println!("\nrepeat needs a number"),
        },
        ("e", id) if !id.trim().is_empty() => {
            let edition = AudioEdition::new(id.trim());
            println!("\n{}", edition.display_name());
            if let Some(view) = controller.change_audio_edition(edition).await? {
                return Ok(KeyOutcome::Reselected(view));
            }
        }
        _ => println!("\n{HELP}"),
    }
    Ok(KeyOutcome::Continue)
}

fn print_verses(verses: &[Verse]) {
    for v in verses {
        println!("{:>4}  {}", v.number, v.text);
    }
}
