use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// A value stored under one key of a [`ShapedRecord`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    /// `[latitude, longitude]`
    Position([f64; 2]),
    Group(FieldMap),
    Sequence(Vec<String>),
}

/// Insertion-ordered string map used for nested groups such as `created`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub fn insert(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(name, _)| name == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Open, insertion-ordered output record for one shaped element.
///
/// Arbitrary OSM tag keys become top-level fields, so the record is a
/// key/value list rather than a fixed struct. Re-inserting a key replaces
/// its value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl ShapedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: FieldValue) {
        *self.slot_mut(key, || FieldValue::Text(String::new())) = value;
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn group(&self, key: &str) -> Option<&FieldMap> {
        match self.get(key)? {
            FieldValue::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Nested group under `key`, created on first use. A slot holding any
    /// other kind of value is replaced by an empty group.
    pub fn group_mut(&mut self, key: &str) -> &mut FieldMap {
        let slot = self.slot_mut(key, || FieldValue::Group(FieldMap::default()));
        if !matches!(slot, FieldValue::Group(_)) {
            *slot = FieldValue::Group(FieldMap::default());
        }
        let FieldValue::Group(group) = slot else {
            unreachable!("slot holds a group")
        };
        group
    }

    /// String sequence under `key`, created on first use.
    pub fn sequence_mut(&mut self, key: &str) -> &mut Vec<String> {
        let slot = self.slot_mut(key, || FieldValue::Sequence(Vec::new()));
        if !matches!(slot, FieldValue::Sequence(_)) {
            *slot = FieldValue::Sequence(Vec::new());
        }
        let FieldValue::Sequence(items) = slot else {
            unreachable!("slot holds a sequence")
        };
        items
    }

    fn slot_mut(&mut self, key: &str, init: impl FnOnce() -> FieldValue) -> &mut FieldValue {
        let index = match self.fields.iter().position(|(name, _)| name == key) {
            Some(index) => index,
            None => {
                self.fields.push((key.to_string(), init()));
                self.fields.len() - 1
            }
        };
        &mut self.fields[index].1
    }
}

impl Serialize for ShapedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
