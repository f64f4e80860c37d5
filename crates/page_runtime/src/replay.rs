//! Offline replay of recorded action batches against headless documents.
//!
//! A recording is a JSON-lines file: one wire-format batch per line. Blank
//! lines and lines starting with `#` are skipped.

use crate::config::RuntimeConfig;
use crate::index::ElementIndex;
use crate::pump::ActionPump;
use crate::telemetry::PumpCounters;
use actions::{ActionBatch, HookEvent, PageId, decode_batch};
use anyhow::{Context as _, Result};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use vdom::headless::HeadlessKit;

/// Parse every batch in `text`.
///
/// # Errors
/// Returns the first line that does not decode, with its line number.
pub fn parse_batches(text: &str) -> Result<Vec<ActionBatch>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(number, line)| decode_batch(line).with_context(|| format!("line {}", number + 1)))
        .collect()
}

/// Read and parse a recording.
///
/// # Errors
/// Returns an error if the file cannot be read or a line does not decode.
pub fn load_batches(path: &Path) -> Result<Vec<ActionBatch>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_batches(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Result of a replay: the final tree of every page plus what was observed
/// along the way.
#[derive(Debug)]
pub struct ReplayReport {
    pub trees: BTreeMap<PageId, Value>,
    pub hooks: Vec<HookEvent>,
    pub counters: PumpCounters,
    pub constructed: usize,
    pub live: usize,
}

impl ReplayReport {
    pub fn to_json(&self) -> Value {
        let mut pages = Map::new();
        for (page, tree) in &self.trees {
            pages.insert(page.0.to_string(), tree.clone());
        }
        let hooks: Vec<Value> = self
            .hooks
            .iter()
            .map(|event| json!({"page": event.page, "hook": event.hook, "element": event.element}))
            .collect();
        json!({
            "pages": pages,
            "hooks": hooks,
            "applied": self.counters.applied_total,
            "dropped": self.counters.dropped_total,
            "errors": self.counters.errors_total,
            "constructed": self.constructed,
            "live": self.live,
        })
    }
}

/// Apply `batches` in order, creating one headless document per page on
/// first use.
///
/// # Errors
/// Returns an error if a document cannot be constructed.
pub fn replay(batches: Vec<ActionBatch>, config: &RuntimeConfig) -> Result<ReplayReport> {
    let kit = HeadlessKit::new();
    let index = ElementIndex::new();
    let mut pump = ActionPump::new(config).with_index(index);

    for batch in batches {
        if pump.document(batch.page).is_none() {
            let document = kit
                .document(batch.page, config.document_options())
                .with_context(|| format!("creating {}", batch.page))?;
            pump.register(document);
        }
        pump.enqueue_batch(batch);
        pump.run_until_blocked();
    }

    let mut pages: Vec<PageId> = pump.pages().collect();
    pages.sort_unstable();
    let trees = pages
        .into_iter()
        .filter_map(|page| pump.document(page).map(|document| (page, document.to_json_value())))
        .collect();
    Ok(ReplayReport {
        trees,
        hooks: kit.sink.events(),
        counters: pump.counters(),
        constructed: kit.host.total_constructed(),
        live: kit.host.live(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap freely")]
mod tests {
    use super::*;
    use std::io::Write as _;

    const RECORDING: &str = r#"
# a page with one text node
{"page":1,"actions":[{"kind":"add","targetId":1,"parentId":-2,"tagName":"text","attributes":{"value":"hi"},"hooks":["mounted"]}]}

{"page":1,"actions":[{"kind":"updateStyle","targetId":1,"styles":{"color":"red"}}]}
"#;

    #[test]
    fn recordings_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RECORDING.as_bytes()).unwrap();
        let batches = load_batches(file.path()).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].page, PageId(1));
    }

    #[test]
    fn bad_lines_report_their_number() {
        let err = parse_batches("\n{\"page\":1,\"actions\":[{\"kind\":\"explode\"}]}").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn missing_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_batches(&dir.path().join("absent.jsonl")).unwrap_err();
        assert!(format!("{err:#}").contains("absent.jsonl"));
    }

    #[test]
    fn replay_builds_the_final_tree() {
        let batches = parse_batches(RECORDING).unwrap();
        let report = replay(batches, &RuntimeConfig::default()).unwrap();
        let tree = &report.trees[&PageId(1)];
        let text = &tree["children"][0]["children"][0];
        assert_eq!(text["attrs"]["value"], "hi");
        assert_eq!(text["styles"]["color"], "red");
        assert_eq!(report.hooks.len(), 1);
        assert_eq!(report.counters.applied_total, 2);
        assert_eq!(report.to_json()["pages"]["1"]["tag"], "document");
    }
}
