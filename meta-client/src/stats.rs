//! Parsed broker statistics

use crate::address::BrokerAddress;
use std::collections::HashMap;

/// Field every stats reply ends with, echoing the request's item filter
pub const ITEM_FIELD: &str = "item";

/// Value of the `item` field when the request carried no filter
pub const NO_ITEM: &str = "null";

/// Stats of every broker that answered, keyed by broker address
pub type StatsResultMap = HashMap<BrokerAddress, StatsResult>;

/// One broker's stats reply as ordered `name -> value` pairs.
///
/// Values are kept exactly as the broker sent them, numbers included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsResult {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl StatsResult {
    /// Parse a `\r\n` delimited block of `key value` lines.
    ///
    /// Empty lines are skipped, a key without value maps to `""`, and a
    /// repeated key keeps its first position but takes the last value.
    pub fn parse(body: &str) -> Self {
        let mut result = Self::default();

        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (line, ""),
            };
            result.insert(key, value);
        }

        result
    }

    fn insert(&mut self, key: &str, value: &str) {
        match self.index.get(key) {
            Some(&pos) => self.entries[pos].1 = value.to_string(),
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), value.to_string()));
            }
        }
    }

    /// Value reported for `key`, if the broker sent it
    pub fn value(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    /// All pairs in the order the broker sent them
    pub fn all_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// The item filter echoed by the broker, `"null"` for unfiltered requests
    pub fn item(&self) -> Option<&str> {
        self.value(ITEM_FIELD)
    }

    /// Number of distinct fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the reply carried no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the fields as an unordered map
    pub fn to_map(&self) -> HashMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}
