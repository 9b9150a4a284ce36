//! Ordered name → value collections.
//!
//! Engine variables are addressed by name, but the order in which they are
//! listed matters: it fixes the candidate-vector layout and the positional
//! pairing of exported values. [`NamedValues`] keeps insertion order and
//! (de)serializes as a map in that order.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Insertion-ordered list of `(name, value)` pairs with unique names.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValues<V> {
    entries: Vec<(String, V)>,
}

/// Output-variable name → parsed value for one evaluation.
pub type OutputRecord = NamedValues<f64>;

impl<V> Default for NamedValues<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> NamedValues<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
        }
    }

    /// Sets `name` to `value`, keeping the original position of an existing name.
    pub fn insert(&mut self, name: impl Into<String>, value: V) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn as_slice(&self) -> &[(String, V)] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<(String, V)> {
        self.entries
    }
}

impl<V> FromIterator<(String, V)> for NamedValues<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.insert(name, value);
        }
        values
    }
}

impl<'a, V: Copy> FromIterator<(&'a str, V)> for NamedValues<V> {
    fn from_iter<I: IntoIterator<Item = (&'a str, V)>>(iter: I) -> Self {
        iter.into_iter().map(|(n, v)| (n.to_string(), v)).collect()
    }
}

impl<V: Serialize> Serialize for NamedValues<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for NamedValues<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = NamedValues<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of variable names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut values = NamedValues::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, V>()? {
                    if values.contains(&name) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate variable {name:?}"
                        )));
                    }
                    values.entries.push((name, value));
                }
                Ok(values)
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut values: NamedValues<f64> = [("b", 1.0), ("a", 2.0)].into_iter().collect();
        values.insert("b", 3.0);
        values.insert("c", 4.0);
        assert_eq!(values.names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(values.get("b"), Some(&3.0));
        assert!(values.get("z").is_none());
    }

    #[test]
    fn test_json_preserves_order() {
        let json = r#"{"zeta": 1.0, "alpha": 2.0, "T[3]": 468.0}"#;
        let values: NamedValues<f64> = serde_json::from_str(json).unwrap();
        assert_eq!(values.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "T[3]"]);
        assert_eq!(
            serde_json::to_string(&values).unwrap(),
            r#"{"zeta":1.0,"alpha":2.0,"T[3]":468.0}"#
        );
    }

    #[test]
    fn test_toml_preserves_order() {
        let doc = "zeta = 1.0\nalpha = 2.5\n\"m_dot[9]\" = 0.0226\n";
        let values: NamedValues<f64> = toml::from_str(doc).unwrap();
        assert_eq!(values.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "m_dot[9]"]);
    }

    #[test]
    fn test_rejects_duplicates() {
        let json = r#"{"a": 1.0, "a": 2.0}"#;
        assert!(serde_json::from_str::<NamedValues<f64>>(json).is_err());
    }
}
