use anyhow::{Context, Result};
use rh_core::fuzzing::FuzzSummary;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes the persisted run output to `path`, pretty-printed.
pub fn write_summary(summary: &FuzzSummary, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)
        .with_context(|| format!("failed to write summary to {}", path.display()))?;
    Ok(())
}

/// Loads a previously recorded run, e.g. for `--replay-patterns`.
pub fn load_summary(path: impl AsRef<Path>) -> Result<FuzzSummary> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let summary: FuzzSummary =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(summary)
}
