//! `narrator speak`: read a text aloud with live terminal highlighting.
//!
//! Needs the `sherpa` and `rodio` features. Without them the command
//! reports that audio support was not compiled in.

use std::path::Path;

use anyhow::Result;
use narrator_core::SpeechSettings;

#[cfg(not(all(feature = "sherpa", feature = "rodio")))]
pub async fn execute(
    _settings: SpeechSettings,
    _input: &str,
    _page: Option<usize>,
    _model_dir: Option<&Path>,
) -> Result<()> {
    Err(crate::error::CliError::Unsupported(
        "narrator was built without audio support; rebuild with --features sherpa,rodio"
            .to_string(),
    )
    .into())
}

#[cfg(all(feature = "sherpa", feature = "rodio"))]
pub async fn execute(
    settings: SpeechSettings,
    input: &str,
    page: Option<usize>,
    model_dir: Option<&Path>,
) -> Result<()> {
    use std::sync::Arc;

    use narrator_core::{SpeechEvent, TextFilePageSource};
    use narrator_voice::audio_local::LocalAudioSink;
    use narrator_voice::backend::sherpa_tts::SherpaTtsBackend;
    use narrator_voice::{HighlightObserver, SpeechSession, forward_until_terminal};

    use crate::error::CliError;
    use crate::presentation::TerminalHighlighter;
    use crate::utils::input::read_input;

    let model_dir = model_dir.ok_or_else(|| {
        CliError::Arguments("--model-dir or NARRATOR_MODEL_DIR is required".to_string())
    })?;
    let text = read_input(input)?;

    let backend = SherpaTtsBackend::load(model_dir).map_err(CliError::from)?;
    let sink = LocalAudioSink::open(settings.volume).map_err(CliError::from)?;
    let (session, mut events) =
        SpeechSession::new(settings, Arc::new(backend), Arc::new(sink)).map_err(CliError::from)?;

    let queued = match page {
        Some(index) => {
            let mut source = TextFilePageSource::from_text(&text);
            session.speak_page(&mut source, index)
        }
        None => session.speak(&text, None),
    }
    .map_err(CliError::from)?;
    tracing::info!(utterances = queued, "speaking");

    let mut observer = HighlightObserver::new(TerminalHighlighter::stdout());
    let outcome = tokio::select! {
        event = forward_until_terminal(&mut events, &mut observer) => event,
        _ = tokio::signal::ctrl_c() => {
            session.stop_speaking();
            println!();
            println!("Stopped.");
            return Ok(());
        }
    };

    match outcome {
        Some(SpeechEvent::Error(message)) => Err(CliError::Speech(message).into()),
        Some(SpeechEvent::NothingToSpeak) => {
            println!("Nothing to speak.");
            Ok(())
        }
        _ => Ok(()),
    }
}
