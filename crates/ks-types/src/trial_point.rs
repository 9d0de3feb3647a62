use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable assignment of values to decision variables, keyed by
/// variable name.
///
/// Equality and hashing are by content, using the bit pattern of each value
/// (with `-0.0` treated as `0.0`), so points can be used as map keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialPoint {
    values: BTreeMap<String, f64>,
}

impl TrialPoint {
    pub fn new(values: BTreeMap<String, f64>) -> Self {
        Self { values }
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn canonical_bits(value: f64) -> u64 {
        if value == 0.0 {
            0.0f64.to_bits()
        } else {
            value.to_bits()
        }
    }
}

impl PartialEq for TrialPoint {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|((ka, va), (kb, vb))| {
                    ka == kb && Self::canonical_bits(*va) == Self::canonical_bits(*vb)
                })
    }
}

impl Eq for TrialPoint {}

impl Hash for TrialPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.len().hash(state);
        for (name, value) in &self.values {
            name.hash(state);
            Self::canonical_bits(*value).hash(state);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for TrialPoint {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl fmt::Display for TrialPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_by_content() {
        let a: TrialPoint = [("x", 1.0), ("y", 2.0)].into_iter().collect();
        let b: TrialPoint = [("y", 2.0), ("x", 1.0)].into_iter().collect();
        let c: TrialPoint = [("x", 1.0), ("y", 2.5)].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn signed_zero_hashes_equal() {
        let a: TrialPoint = [("x", 0.0)].into_iter().collect();
        let b: TrialPoint = [("x", -0.0)].into_iter().collect();
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn display_lists_values_by_name() {
        let p: TrialPoint = [("y", 2.0), ("x", 0.5)].into_iter().collect();
        assert_eq!(p.to_string(), "{x=0.5, y=2}");
    }

    #[test]
    fn accessors() {
        let p: TrialPoint = [("x", 0.25)].into_iter().collect();
        assert_eq!(p.value("x"), Some(0.25));
        assert_eq!(p.value("z"), None);
        assert_eq!(p.len(), 1);
        assert!(!p.is_empty());
        assert!(TrialPoint::default().is_empty());
    }
}
