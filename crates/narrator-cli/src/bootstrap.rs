//! CLI bootstrap: settings resolution and logging.
//!
//! Settings come from defaults, then the optional JSON file, then the
//! command-line overrides, and are validated once at the end.

use narrator_core::{SpeechSettings, validate_settings};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;
use crate::parser::Cli;

/// Build the validated settings for this invocation.
pub fn resolve_settings(cli: &Cli) -> Result<SpeechSettings, CliError> {
    let mut settings = match &cli.config {
        Some(path) => SpeechSettings::load(path)?,
        None => SpeechSettings::with_defaults(),
    };
    settings.merge(&cli.settings_update());
    validate_settings(&settings)?;

    tracing::debug!(
        rate = settings.rate,
        volume = settings.volume,
        speaker_id = settings.speaker_id,
        max_lookahead = settings.max_lookahead,
        "resolved speech settings"
    );
    Ok(settings)
}

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
