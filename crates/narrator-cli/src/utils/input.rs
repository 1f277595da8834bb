//! Reading document text from files or stdin.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Read the whole input. `"-"` reads stdin.
///
/// # Errors
///
/// Returns an error if the file or stdin cannot be read as UTF-8.
pub fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read text from stdin")?;
        return Ok(text);
    }

    let path = Path::new(input);
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
