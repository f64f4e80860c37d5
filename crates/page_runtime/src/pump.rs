//! Ordered hand-off of Change Actions to the documents they address.
//!
//! All pages share one FIFO. The head is applied only once its page has a
//! registered document with a bound window; until then the whole queue waits,
//! so actions are never dropped or reordered while a page is being set up.

use crate::config::RuntimeConfig;
use crate::index::ElementIndex;
use crate::scheduler::SliceScheduler;
use crate::telemetry::{PumpCounters, maybe_emit, pump_counters_json};
use actions::{ActionBatch, ChangeAction, PageId, ProtocolError, decode_batch};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::info_span;
use vdom::{ApplyError, Document, apply};

/// What one call to [`ActionPump::run_slice`] did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SliceOutcome {
    /// Actions taken off the queue and run, including ones that dropped a
    /// reference or failed.
    pub applied: usize,
    /// References that did not resolve and were skipped.
    pub dropped: u64,
    pub errors: Vec<(PageId, ApplyError)>,
    /// Page whose readiness the queue is waiting on.
    pub blocked_on: Option<PageId>,
    /// The time budget or the action cap ended the slice early.
    pub spilled: bool,
    pub remaining: usize,
}

pub struct ActionPump {
    queue: VecDeque<(PageId, ChangeAction)>,
    documents: HashMap<PageId, Document>,
    scheduler: SliceScheduler,
    counters: PumpCounters,
    index: Option<ElementIndex>,
    telemetry_enabled: bool,
}

impl ActionPump {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            queue: VecDeque::new(),
            documents: HashMap::new(),
            scheduler: SliceScheduler::new(config.slice_budget(), config.slice_max_actions),
            counters: PumpCounters::default(),
            index: None,
            telemetry_enabled: config.telemetry_enabled,
        }
    }

    /// Mirror every document touched by a slice into `index`.
    #[must_use]
    pub fn with_index(mut self, index: ElementIndex) -> Self {
        self.index = Some(index);
        self
    }

    // ============================
    // Documents
    // ============================

    /// Take ownership of `document`. A document already registered for the
    /// same page is returned.
    pub fn register(&mut self, document: Document) -> Option<Document> {
        let page = document.page();
        debug!(target: "trellis::runtime", "{page} registered (ready: {})", document.is_ready());
        if let Some(index) = &self.index {
            index.refresh(page, document.snapshot());
        }
        self.documents.insert(page, document)
    }

    /// Unregister `page`. Queued actions for it stay queued and block the
    /// queue until a document for that page is registered again.
    pub fn remove(&mut self, page: PageId) -> Option<Document> {
        if let Some(index) = &self.index {
            index.forget(page);
        }
        self.documents.remove(&page)
    }

    pub fn document(&self, page: PageId) -> Option<&Document> {
        self.documents.get(&page)
    }

    pub fn document_mut(&mut self, page: PageId) -> Option<&mut Document> {
        self.documents.get_mut(&page)
    }

    pub fn pages(&self) -> impl Iterator<Item = PageId> + '_ {
        self.documents.keys().copied()
    }

    pub fn is_ready(&self, page: PageId) -> bool {
        self.documents.get(&page).is_some_and(Document::is_ready)
    }

    // ============================
    // Queue
    // ============================

    pub fn enqueue(&mut self, page: PageId, actions: impl IntoIterator<Item = ChangeAction>) {
        self.queue.extend(actions.into_iter().map(|action| (page, action)));
    }

    pub fn enqueue_batch(&mut self, batch: ActionBatch) {
        self.enqueue(batch.page, batch.actions);
    }

    /// Decode a wire batch and queue it. A batch that does not decode is
    /// rejected as a whole.
    pub fn enqueue_encoded(&mut self, text: &str) -> Result<(), ProtocolError> {
        let batch = decode_batch(text)?;
        self.enqueue_batch(batch);
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// True when the head of the queue can be applied now.
    pub fn has_ready_work(&self) -> bool {
        self.queue.front().is_some_and(|(page, _)| self.is_ready(*page))
    }

    /// Page the queue is waiting on, if the head is not ready.
    pub fn blocked_on(&self) -> Option<PageId> {
        self.queue
            .front()
            .map(|(page, _)| *page)
            .filter(|page| !self.is_ready(*page))
    }

    // ============================
    // Slices
    // ============================

    /// Apply queued actions in order until the queue drains, the head page is
    /// not ready, or the slice budget runs out.
    pub fn run_slice(&mut self) -> SliceOutcome {
        let _span = info_span!("pump.slice", pending = self.queue.len()).entered();
        self.scheduler.begin_slice();
        let mut outcome = SliceOutcome::default();
        let mut touched = BTreeSet::new();

        while let Some(page) = self.queue.front().map(|(page, _)| *page) {
            let Some(document) = self.documents.get_mut(&page).filter(|document| document.is_ready()) else {
                outcome.blocked_on = Some(page);
                break;
            };
            if !self.scheduler.allow() {
                outcome.spilled = true;
                break;
            }
            let Some((_, action)) = self.queue.pop_front() else {
                break;
            };
            let dropped_before = document.stats().dropped;
            if let Err(err) = apply(document, action) {
                warn!(target: "trellis::runtime", "{page}: {err}");
                outcome.errors.push((page, err));
            }
            outcome.dropped += document.stats().dropped - dropped_before;
            outcome.applied += 1;
            self.scheduler.record();
            touched.insert(page);
        }
        outcome.remaining = self.queue.len();

        for page in touched {
            self.refresh_index(page);
        }
        self.record(&outcome);
        outcome
    }

    /// Mirror the current tree of `page` into the index, if one is attached.
    pub fn refresh_index(&self, page: PageId) {
        if let (Some(index), Some(document)) = (&self.index, self.documents.get(&page)) {
            index.refresh(page, document.snapshot());
        }
    }

    /// Run slices until the queue drains or blocks.
    pub fn run_until_blocked(&mut self) -> Vec<SliceOutcome> {
        let mut outcomes = Vec::new();
        while self.has_ready_work() {
            outcomes.push(self.run_slice());
        }
        outcomes
    }

    fn record(&mut self, outcome: &SliceOutcome) {
        let elapsed_us = u64::try_from(self.scheduler.elapsed().as_micros()).unwrap_or(u64::MAX);
        let applied = outcome.applied as u64;
        let counters = &mut self.counters;
        counters.applied_last = applied;
        counters.applied_total = counters.applied_total.saturating_add(applied);
        counters.dropped_last = outcome.dropped;
        counters.dropped_total = counters.dropped_total.saturating_add(outcome.dropped);
        counters.errors_total = counters.errors_total.saturating_add(outcome.errors.len() as u64);
        counters.slices_total = counters.slices_total.saturating_add(1);
        counters.blocked_slices += u64::from(outcome.blocked_on.is_some());
        counters.spillover_slices += u64::from(outcome.spilled);
        counters.slice_time_last_us = elapsed_us;
        counters.slice_time_total_us = counters.slice_time_total_us.saturating_add(elapsed_us);
        counters.pending = outcome.remaining as u64;
        maybe_emit(self.telemetry_enabled, &pump_counters_json(counters));
    }

    pub const fn counters(&self) -> PumpCounters {
        self.counters
    }
}
