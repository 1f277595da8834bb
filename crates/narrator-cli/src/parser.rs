//! Root CLI parser and global options.

use std::path::PathBuf;

use clap::Parser;
use narrator_core::SettingsUpdate;

use crate::commands::Commands;

/// Read text aloud with word-level highlighting.
#[derive(Parser, Debug)]
#[command(name = "narrator")]
#[command(about = "Read text aloud with word-level highlighting")]
#[command(version)]
pub struct Cli {
    /// JSON settings file
    #[arg(long, global = true, env = "NARRATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Speaking rate multiplier (0.5-2.0)
    #[arg(long, global = true)]
    pub rate: Option<f32>,

    /// Voice index for multi-speaker models
    #[arg(long, global = true)]
    pub speaker: Option<i32>,

    /// Output volume (0.0-1.0)
    #[arg(long, global = true)]
    pub volume: Option<f32>,

    /// Utterances synthesized ahead of playback
    #[arg(long, global = true)]
    pub lookahead: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Command-line overrides as a partial settings update.
    pub fn settings_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            speaker_id: self.speaker,
            rate: self.rate,
            volume: self.volume,
            max_lookahead: self.lookahead,
            ..SettingsUpdate::default()
        }
    }
}
