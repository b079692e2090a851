use crate::types::Type;

/// One field of a structured message type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtoField {
    pub name: String,
    pub number: u32,
    pub ty: Type,
}

/// A structured message type.
///
/// `fields` is `None` for opaque messages whose layout is unknown to the
/// analyzer: their payload can still be moved around as bytes but never
/// parsed or printed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtoType {
    pub name: String,
    pub fields: Option<Vec<ProtoField>>,
    /// Marks the synthetic `key`/`value` message backing a map field.
    pub is_map_entry: bool,
}

impl ProtoType {
    pub fn new(name: impl Into<String>, fields: Vec<ProtoField>) -> Self {
        Self { name: name.into(), fields: Some(fields), is_map_entry: false }
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: None, is_map_entry: false }
    }

    pub fn map_entry(name: impl Into<String>, key: Type, value: Type) -> Self {
        Self {
            name: name.into(),
            fields: Some(vec![
                ProtoField { name: "key".into(), number: 1, ty: key },
                ProtoField { name: "value".into(), number: 2, ty: value },
            ]),
            is_map_entry: true,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.fields.is_none()
    }

    pub fn field(&self, name: &str) -> Option<&ProtoField> {
        self.fields.as_ref()?.iter().find(|f| f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&ProtoField> {
        self.fields.as_ref()?.iter().find(|f| f.number == number)
    }

    pub fn map_key(&self) -> Option<&ProtoField> {
        if self.is_map_entry { self.field_by_number(1) } else { None }
    }

    pub fn map_value(&self) -> Option<&ProtoField> {
        if self.is_map_entry { self.field_by_number(2) } else { None }
    }
}
