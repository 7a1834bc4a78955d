use crate::value::AttributeValue;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Name of the mandatory identifier column, always first in the header row.
pub const IDENTIFIER_COLUMN: &str = "external_id";

/// One normalized update: an identifier plus the attributes to set, in
/// source column order. Rows whose attribute list is empty carry no update
/// and are dropped before batching.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    pub external_id: String,
    attributes: Vec<(String, AttributeValue)>,
}

impl AttributeRecord {
    pub fn new(external_id: impl Into<String>) -> Self {
        AttributeRecord {
            external_id: external_id.into(),
            attributes: Vec::new(),
        }
    }

    pub fn push_attribute(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.attributes.push((name.into(), value));
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn attributes(&self) -> &[(String, AttributeValue)] {
        &self.attributes
    }
}

impl Serialize for AttributeRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + 1))?;
        map.serialize_entry(IDENTIFIER_COLUMN, &self.external_id)?;
        for (name, value) in &self.attributes {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
