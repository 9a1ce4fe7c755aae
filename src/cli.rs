use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "qasas",
    version,
    about = "Recite Quran story passages verse by verse in the terminal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Data directory (defaults to the platform data_local_dir)
    #[arg(long, env = "QASAS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log directory (defaults to `{data_dir}/logs`)
    #[arg(long, env = "QASAS_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log filter, same syntax as RUST_LOG
    #[arg(long, env = "RUST_LOG")]
    pub log_filter: Option<String>,

    /// alquran.cloud API base URL
    #[arg(long, env = "QASAS_API_BASE")]
    pub api_base: Option<String>,

    /// Play silently with a fixed per-verse duration instead of the sound card
    #[arg(long, env = "QASAS_NO_AUDIO")]
    pub no_audio: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Select a passage and control its recitation from the keyboard
    Play {
        chapter: u32,
        from: u32,
        to: u32,

        /// Cycles to play (saved as the new default)
        #[arg(long)]
        repeat: Option<u32>,

        /// Audio edition, e.g. ar.husary (saved as the new default)
        #[arg(long)]
        edition: Option<String>,
    },

    /// Print the text of a passage
    Text { chapter: u32, from: u32, to: u32 },

    /// List the known reciters
    Editions,
}
