//! Subcommand definitions.

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show how a text is split into utterances
    Segment {
        /// Text file to read, or "-" for stdin
        input: String,
        /// Print utterances as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the estimated word schedule for a text and audio length
    Schedule {
        /// Text of a single utterance
        text: String,
        /// Audio length in seconds
        #[arg(short, long)]
        duration: f64,
        /// Highlight lead time in seconds (defaults to the configured value)
        #[arg(long)]
        lead_time: Option<f64>,
    },

    /// List the pages of a form-feed separated text file
    Pages {
        /// Text file to read
        file: PathBuf,
    },

    /// Read a text aloud with live highlighting
    Speak {
        /// Text file to read, or "-" for stdin
        input: String,
        /// Speak only this page (0-based) of a paginated file
        #[arg(short, long)]
        page: Option<usize>,
        /// Directory holding model.onnx, tokens.txt and espeak-ng-data/
        #[arg(long, env = "NARRATOR_MODEL_DIR")]
        model_dir: Option<PathBuf>,
    },
}
