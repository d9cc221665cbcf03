//! Dynamic metric label derivation from interface description text.
//!
//! Operators tag interfaces with free-text markers like
//! `CORE-LINK [tag1] [customer=acme]`. The registry scans those descriptions
//! and assigns every distinct label name a dense, append-only slot index, so
//! that each metric series using dynamic labels carries the same label arity
//! no matter which device or interface a sample came from. Devices missing a
//! label read back as an empty string at that label's slot.
//!
//! Slot assignment is process-wide and never revoked: a reader always sees a
//! prefix of the eventual schema, never a renumbering.

use std::collections::HashMap;
use std::sync::RwLock;

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;

/// Default extraction pattern: `[name]` or `[name=value]` tokens.
///
/// Group 1 captures the label name, group 2 the optional `=value` suffix.
pub const DEFAULT_DESCRIPTION_PATTERN: &str = r"\[([^=\]]+)(=[^\]]+)?\]";

static DEFAULT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(DEFAULT_DESCRIPTION_PATTERN).expect("default description pattern is valid")
});

/// Valid label identifiers. Anything else found in free text is noise and is
/// dropped without error.
static LABEL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("label name pattern is valid"));

#[derive(Default)]
struct SchemaTable {
    /// Label names in slot order. Append-only.
    names: Vec<String>,
    /// Name -> slot index.
    slots: HashMap<String, usize>,
    /// Device addr -> interface -> slot -> value.
    values: HashMap<String, HashMap<String, HashMap<usize, String>>>,
}

impl SchemaTable {
    fn slot_for(&mut self, name: &str) -> usize {
        if let Some(&slot) = self.slots.get(name) {
            return slot;
        }
        let slot = self.names.len();
        self.names.push(name.to_string());
        self.slots.insert(name.to_string(), slot);
        slot
    }
}

/// Process-wide registry of dynamically discovered metric labels.
///
/// `observe_descriptions` is the single writer path; `label_names` and
/// `values_for` read a consistent snapshot. The schema only ever grows, so a
/// value vector fetched now stays valid against any earlier `label_names`
/// snapshot of the same or shorter length.
pub struct LabelRegistry {
    pattern: Regex,
    table: RwLock<SchemaTable>,
}

impl LabelRegistry {
    /// Registry with the default `[name]` / `[name=value]` pattern.
    pub fn new() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
            table: RwLock::new(SchemaTable::default()),
        }
    }

    /// Registry with a configured extraction pattern.
    ///
    /// The pattern must expose the label name as capture group 1 and may
    /// expose an `=value` suffix as capture group 2.
    pub fn with_pattern(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|source| ConfigError::LabelPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::with_regex(pattern))
    }

    /// Registry with an already-compiled extraction pattern (the config
    /// layer compiles overrides at load time).
    pub fn with_regex(pattern: Regex) -> Self {
        Self {
            pattern,
            table: RwLock::new(SchemaTable::default()),
        }
    }

    /// Scans interface descriptions from one device and records their labels.
    ///
    /// A match without an `=value` suffix is recorded with the value `"1"`
    /// (presence flag); one with a suffix keeps the literal value. Captured
    /// names failing identifier validation are skipped silently, since
    /// descriptions are free text. Names are case-normalized to lowercase.
    pub fn observe_descriptions(&self, device: &str, interfaces: &[(String, String)]) {
        let mut table = self.table.write().expect("label table lock poisoned");
        for (interface, description) in interfaces {
            for captures in self.pattern.captures_iter(description) {
                let Some(raw_name) = captures.get(1) else {
                    continue;
                };
                let raw_name = raw_name.as_str();
                if !LABEL_NAME.is_match(raw_name) {
                    trace!("{device} {interface}: dropping non-identifier label {raw_name:?}");
                    continue;
                }
                let name = raw_name.to_ascii_lowercase();
                let value = match captures.get(2) {
                    Some(suffix) => suffix.as_str()[1..].to_string(),
                    None => "1".to_string(),
                };

                let slot = table.slot_for(&name);
                table
                    .values
                    .entry(device.to_string())
                    .or_default()
                    .entry(interface.clone())
                    .or_default()
                    .insert(slot, value);
            }
        }
    }

    /// All known label names in slot order.
    ///
    /// Called once per dynamic metric at descriptor-registration time to fix
    /// the series' label arity; slot order never changes afterwards.
    pub fn label_names(&self) -> Vec<String> {
        self.table
            .read()
            .expect("label table lock poisoned")
            .names
            .clone()
    }

    /// One value per known slot for a device/interface pair.
    ///
    /// Slots this pair never populated yield the empty string. The vector
    /// length equals `label_names().len()` at the time of the call; callers
    /// combining vectors fetched at different times must re-fetch
    /// `label_names` since the schema may have grown in between.
    pub fn values_for(&self, device: &str, interface: &str) -> Vec<String> {
        let table = self.table.read().expect("label table lock poisoned");
        let mut values = vec![String::new(); table.names.len()];
        if let Some(slots) = table
            .values
            .get(device)
            .and_then(|interfaces| interfaces.get(interface))
        {
            for (&slot, value) in slots {
                values[slot] = value.clone();
            }
        }
        values
    }
}

impl Default for LabelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
