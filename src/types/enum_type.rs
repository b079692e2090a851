/// Definition of a named enum: an ordered list of `(name, number)` pairs.
///
/// Two definitions with the same name but different value lists are
/// *equivalent* but not *equal*; casts between them check that the value
/// exists in the target definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<(String, i32)>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, values: &[(&str, i32)]) -> Self {
        Self {
            name: name.into(),
            values: values.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        }
    }

    pub fn find_name(&self, number: i32) -> Option<&str> {
        self.values.iter().find(|(_, v)| *v == number).map(|(n, _)| n.as_str())
    }

    pub fn find_number(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn is_valid_number(&self, number: i64) -> bool {
        i32::try_from(number).ok().and_then(|n| self.find_name(n)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_by_name_and_number() {
        let e = EnumType::new("color", &[("RED", 0), ("GREEN", 1)]);
        assert_eq!(e.find_name(1), Some("GREEN"));
        assert_eq!(e.find_number("RED"), Some(0));
        assert!(e.is_valid_number(0));
        assert!(!e.is_valid_number(300));
        assert!(!e.is_valid_number(i64::MAX));
    }
}
