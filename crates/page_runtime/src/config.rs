//! Runtime configuration for the rendering thread.
//!
//! Controls how much work one pump slice may do and how new documents are
//! set up. Configuration can be loaded from environment variables or
//! constructed programmatically.

use core::time::Duration;
use std::env;
use vdom::{DocumentOptions, TypeChangeRule};

/// Runtime configuration for the action pump and the documents it drives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Time budget of one slice in milliseconds
    pub slice_budget_ms: u64,
    /// Upper bound on actions applied in one slice
    pub slice_max_actions: usize,
    /// Rows realized in a freshly created recyclable container
    pub recycler_window: usize,
    /// Attribute keys whose presence in an update implies a type change
    pub type_change_keys: Vec<String>,
    /// Whether to emit pump counters after every slice
    pub telemetry_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(8, 256, 12, vec!["type".to_owned()], false)
    }
}

impl RuntimeConfig {
    /// Construct a new `RuntimeConfig` with explicit values.
    ///
    /// # Arguments
    ///
    /// * `slice_budget_ms` - Slice time budget in milliseconds (minimum 1ms)
    /// * `slice_max_actions` - Actions per slice (minimum 1)
    /// * `recycler_window` - Initial visible rows of a recyclable container
    /// * `type_change_keys` - Attribute keys that trigger a type change
    /// * `telemetry_enabled` - Whether to emit pump counters
    #[inline]
    #[must_use]
    pub fn new(
        slice_budget_ms: u64,
        slice_max_actions: usize,
        recycler_window: usize,
        type_change_keys: Vec<String>,
        telemetry_enabled: bool,
    ) -> Self {
        Self {
            slice_budget_ms: slice_budget_ms.max(1),
            slice_max_actions: slice_max_actions.max(1),
            recycler_window,
            type_change_keys,
            telemetry_enabled,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `TRELLIS_SLICE_BUDGET_MS`: Slice budget in milliseconds (default: 8)
    /// - `TRELLIS_SLICE_MAX_ACTIONS`: Actions per slice (default: 256)
    /// - `TRELLIS_RECYCLER_WINDOW`: Initial visible rows (default: 12)
    /// - `TRELLIS_TYPE_CHANGE_KEYS`: Comma-separated keys (default: `type`)
    /// - `TRELLIS_TELEMETRY`: Set to "1" to enable telemetry (default: disabled)
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Self::from_env`], reading values through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let slice_budget_ms = lookup("TRELLIS_SLICE_BUDGET_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(defaults.slice_budget_ms);
        let slice_max_actions = lookup("TRELLIS_SLICE_MAX_ACTIONS")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(defaults.slice_max_actions);
        let recycler_window = lookup("TRELLIS_RECYCLER_WINDOW")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(defaults.recycler_window);
        let type_change_keys = lookup("TRELLIS_TYPE_CHANGE_KEYS").map_or(defaults.type_change_keys, |val| {
            val.split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_owned)
                .collect()
        });
        let telemetry_enabled = lookup("TRELLIS_TELEMETRY").as_deref() == Some("1");
        Self::new(
            slice_budget_ms,
            slice_max_actions,
            recycler_window,
            type_change_keys,
            telemetry_enabled,
        )
    }

    /// Get the slice budget as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn slice_budget(&self) -> Duration {
        Duration::from_millis(self.slice_budget_ms)
    }

    /// Options every document created under this configuration uses.
    #[must_use]
    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            recycler_window: self.recycler_window,
            type_change: TypeChangeRule::keys(self.type_change_keys.iter().cloned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = RuntimeConfig::from_lookup(|_| None);
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.slice_budget(), Duration::from_millis(8));
        assert_eq!(config.type_change_keys, vec!["type".to_owned()]);
    }

    #[test]
    fn environment_values_are_parsed_and_clamped() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[
            ("TRELLIS_SLICE_BUDGET_MS", "0"),
            ("TRELLIS_SLICE_MAX_ACTIONS", " 32 "),
            ("TRELLIS_RECYCLER_WINDOW", "not a number"),
            ("TRELLIS_TYPE_CHANGE_KEYS", "type, mode,,"),
            ("TRELLIS_TELEMETRY", "1"),
        ]));
        assert_eq!(config.slice_budget_ms, 1);
        assert_eq!(config.slice_max_actions, 32);
        assert_eq!(config.recycler_window, 12);
        assert_eq!(config.type_change_keys, vec!["type".to_owned(), "mode".to_owned()]);
        assert!(config.telemetry_enabled);
    }

    #[test]
    fn document_options_follow_the_config() {
        let config = RuntimeConfig::new(4, 0, 3, vec!["mode".to_owned()], false);
        assert_eq!(config.slice_max_actions, 1);
        let options = config.document_options();
        assert_eq!(options.recycler_window, 3);
        let mut delta = actions::AttrMap::new();
        delta.insert("mode", "grid");
        assert!(options.type_change.implies_type_change("stack", &delta));
    }
}
