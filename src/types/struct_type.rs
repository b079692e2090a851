use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    /// Anonymous fields have no name.
    pub name: Option<String>,
    pub ty: Type,
}

impl StructField {
    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        Self { name: Some(name.into()), ty }
    }

    pub fn anonymous(ty: Type) -> Self {
        Self { name: None, ty }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructType {
    pub fields: Vec<StructField>,
}

impl StructType {
    pub fn new(fields: Vec<StructField>) -> Self {
        Self { fields }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Case-insensitive lookup; `Err(())` when the name matches several fields.
    pub fn find_field(&self, name: &str) -> Result<Option<(usize, &StructField)>, ()> {
        let mut found = None;
        for (idx, field) in self.fields.iter().enumerate() {
            if field.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)) {
                if found.is_some() {
                    return Err(());
                }
                found = Some((idx, field));
            }
        }
        Ok(found)
    }
}
