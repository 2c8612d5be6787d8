use std::collections::{HashMap, HashSet};

use crate::value::Value;

/// Named arguments handed to one method call.
///
/// Every lookup is recorded so the evaluator can report options the method
/// never read once it returns; that is how a mistyped `--flag` surfaces.
#[derive(Debug, Default, Clone)]
pub struct Options {
    values: HashMap<String, Value>,
    accessed: HashSet<String>,
}

impl Options {
    pub fn new(values: HashMap<String, Value>) -> Self {
        Self {
            values,
            accessed: HashSet::new(),
        }
    }

    /// Look up an option, marking it as consumed.
    pub fn get(&mut self, name: &str) -> Option<&Value> {
        self.accessed.insert(name.to_string());
        self.values.get(name)
    }

    /// Check for an option, marking it as consumed.
    pub fn contains(&mut self, name: &str) -> bool {
        self.accessed.insert(name.to_string());
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Supplied option names that were never looked up, sorted.
    pub fn unused(&self) -> Vec<String> {
        let mut unused: Vec<String> = self
            .values
            .keys()
            .filter(|name| !self.accessed.contains(*name))
            .cloned()
            .collect();

        unused.sort();
        unused
    }
}

#[cfg(test)]
mod options_tests {
    use super::*;

    fn options(pairs: &[(&str, i64)]) -> Options {
        Options::new(
            pairs
                .iter()
                .map(|(name, n)| (name.to_string(), Value::Int(*n)))
                .collect(),
        )
    }

    #[test]
    fn test_untouched_options_are_unused() {
        let opts = options(&[("limit", 3), ("sep", 1)]);

        assert_eq!(opts.unused(), vec!["limit".to_string(), "sep".to_string()]);
    }

    #[test]
    fn test_get_and_contains_mark_consumed() {
        let mut opts = options(&[("limit", 3), ("sep", 1), ("verbose", 0)]);

        assert_eq!(opts.get("limit"), Some(&Value::Int(3)));
        assert!(opts.contains("verbose"));

        assert_eq!(opts.unused(), vec!["sep".to_string()]);
    }

    #[test]
    fn test_missing_lookup_is_harmless() {
        let mut opts = options(&[("limit", 3)]);

        assert_eq!(opts.get("other"), None);
        assert!(!opts.contains("another"));
        assert_eq!(opts.unused(), vec!["limit".to_string()]);
    }
}
