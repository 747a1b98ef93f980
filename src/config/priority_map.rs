//! Priority → ALM label mapping.
//!
//! Keys are either a single priority (`"7"`) or an inclusive range
//! (`"4-6"`). Together the keys must cover priorities 1 through 10, each
//! exactly once.

use std::collections::BTreeMap;

use thiserror::Error;

/// Lowest task priority.
pub const MIN_PRIORITY: u8 = 1;
/// Highest task priority.
pub const MAX_PRIORITY: u8 = 10;

/// Reasons a priority map is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriorityMapError {
    /// The key is neither an integer nor an integer range.
    #[error("invalid priority key {0:?}: expected \"n\" or \"lo-hi\"")]
    InvalidKey(String),

    /// A range key whose low bound is not below its high bound.
    #[error("invalid range key {0:?}: low bound must be less than high bound")]
    InvalidRange(String),

    /// A key covering a priority outside 1..=10.
    #[error("priority key {key:?} covers {value}, outside 1-10")]
    OutOfDomain {
        /// The offending key.
        key: String,
        /// The out-of-range priority it covers.
        value: u32,
    },

    /// A priority covered by more than one key.
    #[error("duplicate priority mapping for priority {0}")]
    Duplicate(u8),

    /// A priority covered by no key.
    #[error("incomplete priority mapping: priority {0} is not mapped")]
    Missing(u8),
}

/// A validated priority map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityMap {
    labels: BTreeMap<u8, String>,
}

impl PriorityMap {
    /// Validates a raw map and expands it to one label per priority.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: a malformed or inverted key, a
    /// priority outside 1..=10, a priority covered twice, or the lowest
    /// priority left uncovered.
    pub fn parse(raw: &BTreeMap<String, String>) -> Result<Self, PriorityMapError> {
        let mut labels = BTreeMap::new();

        for (key, label) in raw {
            let (lo, hi) = parse_key(key)?;
            for value in lo..=hi {
                let priority = u8::try_from(value)
                    .ok()
                    .filter(|p| (MIN_PRIORITY..=MAX_PRIORITY).contains(p))
                    .ok_or_else(|| PriorityMapError::OutOfDomain {
                        key: key.clone(),
                        value,
                    })?;
                if labels.insert(priority, label.clone()).is_some() {
                    return Err(PriorityMapError::Duplicate(priority));
                }
            }
        }

        let covered = |p: &u8| labels.contains_key(p);
        if let Some(missing) = (MIN_PRIORITY..=MAX_PRIORITY).find(|p| !covered(p)) {
            return Err(PriorityMapError::Missing(missing));
        }

        Ok(Self { labels })
    }

    /// Returns the label for a priority, clamping into 1..=10.
    #[must_use]
    pub fn label_for(&self, priority: u8) -> &str {
        let clamped = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        self.labels.get(&clamped).map_or("", String::as_str)
    }

    /// Iterates `(priority, label)` pairs in ascending priority order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.labels.iter().map(|(p, l)| (*p, l.as_str()))
    }
}

/// Parses `"n"` into `(n, n)` and `"lo-hi"` into `(lo, hi)` with `lo < hi`.
fn parse_key(key: &str) -> Result<(u32, u32), PriorityMapError> {
    let number = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|_| PriorityMapError::InvalidKey(key.to_string()))
    };

    if let Some((lo, hi)) = key.split_once('-') {
        let (lo, hi) = (number(lo)?, number(hi)?);
        if lo >= hi {
            return Err(PriorityMapError::InvalidRange(key.to_string()));
        }
        Ok((lo, hi))
    } else {
        let n = number(key)?;
        Ok((n, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn parse(pairs: &[(&str, &str)]) -> Result<PriorityMap, PriorityMapError> {
        PriorityMap::parse(&raw(pairs))
    }

    fn covered(map: &PriorityMap) -> Vec<u8> {
        map.iter().map(|(p, _)| p).collect()
    }

    #[test]
    fn accepts_ranges_and_singles_covering_domain() {
        let map = parse(&[
            ("1-3", "Low"),
            ("4-6", "Medium"),
            ("7-8", "High"),
            ("9", "Critical"),
            ("10", "Blocker"),
        ])
        .unwrap();

        assert_eq!(covered(&map), (1..=10).collect::<Vec<u8>>());
        assert_eq!(map.label_for(2), "Low");
        assert_eq!(map.label_for(6), "Medium");
        assert_eq!(map.label_for(9), "Critical");
        assert_eq!(map.label_for(10), "Blocker");
    }

    #[test]
    fn accepts_single_full_range() {
        let map = parse(&[("1-10", "Normal")]).unwrap();
        assert_eq!(covered(&map).len(), 10);
        assert!(map.iter().all(|(_, label)| label == "Normal"));
    }

    #[test]
    fn label_for_clamps_out_of_range_priorities() {
        let map = parse(&[("1-5", "Low"), ("6-10", "High")]).unwrap();
        assert_eq!(map.label_for(0), "Low");
        assert_eq!(map.label_for(42), "High");
    }

    #[test]
    fn rejects_inverted_range() {
        let err = parse(&[("5-1", "Low"), ("6-10", "High")]).unwrap_err();
        assert_eq!(err, PriorityMapError::InvalidRange("5-1".to_string()));
    }

    #[test]
    fn rejects_degenerate_range() {
        let err = parse(&[("1-1", "Low"), ("2-10", "High")]).unwrap_err();
        assert_eq!(err, PriorityMapError::InvalidRange("1-1".to_string()));
    }

    #[test]
    fn rejects_gap_naming_first_missing_priority() {
        let err = parse(&[("1-3", "Low"), ("6-10", "High")]).unwrap_err();
        assert_eq!(err, PriorityMapError::Missing(4));
    }

    #[test]
    fn rejects_overlap() {
        let err = parse(&[("1-5", "Low"), ("5-10", "High")]).unwrap_err();
        assert_eq!(err, PriorityMapError::Duplicate(5));
        assert!(err.to_string().contains("duplicate priority mapping"));
    }

    #[test]
    fn rejects_non_numeric_key() {
        let err = parse(&[("high", "High")]).unwrap_err();
        assert_eq!(err, PriorityMapError::InvalidKey("high".to_string()));
    }

    #[test]
    fn rejects_priority_outside_domain() {
        let err = parse(&[("0-10", "Any")]).unwrap_err();
        let expected = PriorityMapError::OutOfDomain {
            key: "0-10".to_string(),
            value: 0,
        };
        assert_eq!(err, expected);
    }

    #[test]
    fn rejects_empty_map() {
        let err = PriorityMap::parse(&BTreeMap::new()).unwrap_err();
        assert_eq!(err, PriorityMapError::Missing(1));
    }
}
