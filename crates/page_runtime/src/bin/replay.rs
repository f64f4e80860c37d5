use anyhow::{Context as _, Result, anyhow};
use log::info;
use page_runtime::RuntimeConfig;
use page_runtime::replay::{load_batches, replay};
use std::env;
use std::path::PathBuf;

#[expect(clippy::print_stdout, reason = "the report on stdout is the tool's output")]
pub fn main() -> Result<()> {
    env_logger::init();

    let path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: trellis-replay <recording.jsonl>"))?;
    let config = RuntimeConfig::from_env();
    let batches = load_batches(&path)?;
    info!("replaying {} batches from {}", batches.len(), path.display());

    let report = replay(batches, &config)?;
    let output = serde_json::to_string_pretty(&report.to_json()).context("serializing the replay report")?;
    println!("{output}");
    Ok(())
}
