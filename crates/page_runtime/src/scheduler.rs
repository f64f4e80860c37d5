use std::time::{Duration, Instant};

/// Bounds one pump slice by elapsed time and by action count, so a long batch
/// cannot starve the host loop.
pub struct SliceScheduler {
    budget: Duration,
    max_actions: usize,
    slice_start: Option<Instant>,
    applied: usize,
    /// Slices cut short by the budget or the action cap.
    exhausted_count: u64,
}

impl SliceScheduler {
    pub fn new(budget: Duration, max_actions: usize) -> Self {
        Self {
            budget,
            max_actions: max_actions.max(1),
            slice_start: None,
            applied: 0,
            exhausted_count: 0,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn max_actions(&self) -> usize {
        self.max_actions
    }

    pub fn begin_slice(&mut self) {
        self.begin_slice_at(Instant::now());
    }

    pub fn begin_slice_at(&mut self, now: Instant) {
        self.slice_start = Some(now);
        self.applied = 0;
    }

    /// True while the current slice may apply another action.
    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    pub fn allow_at(&mut self, now: Instant) -> bool {
        let within_time = self
            .slice_start
            .is_none_or(|start| self.applied == 0 || now.duration_since(start) < self.budget);
        let allowed = within_time && self.applied < self.max_actions;
        if !allowed {
            self.exhausted_count = self.exhausted_count.saturating_add(1);
        }
        allowed
    }

    pub fn record(&mut self) {
        self.applied += 1;
    }

    /// Actions applied in the current slice.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Time since the current slice began.
    pub fn elapsed(&self) -> Duration {
        self.slice_start.map_or(Duration::ZERO, |start| start.elapsed())
    }

    pub fn exhausted(&self) -> u64 {
        self.exhausted_count
    }
}
