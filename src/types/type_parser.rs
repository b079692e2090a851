use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    analyzer::AnalyzerError,
    types::{StructField, Type, TypeKind},
};

static TYPE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?P<ident>`[^`]+`|[A-Za-z_][A-Za-z0-9_.]*)|(?P<punct>[<>,]))").expect("static regex")
});

#[derive(Debug, Clone, PartialEq)]
enum TypeToken {
    Ident(String),
    Open,
    Close,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<TypeToken>, AnalyzerError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while !rest.trim_start().is_empty() {
        let caps = TYPE_TOKEN
            .captures(rest)
            .ok_or_else(|| AnalyzerError::sql(format!("Invalid type name: {}", text.trim())))?;
        if let Some(ident) = caps.name("ident") {
            tokens.push(TypeToken::Ident(ident.as_str().trim_matches('`').to_string()));
        } else if let Some(p) = caps.name("punct") {
            tokens.push(match p.as_str() {
                "<" => TypeToken::Open,
                ">" => TypeToken::Close,
                _ => TypeToken::Comma,
            });
        }
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }
    Ok(tokens)
}

/// Recursive-descent reader over the token list.
struct TypeReader<'a> {
    text: &'a str,
    tokens: Vec<TypeToken>,
    pos: usize,
    lookup: &'a dyn Fn(&str) -> Option<Type>,
}

impl<'a> TypeReader<'a> {
    fn error(&self) -> AnalyzerError {
        AnalyzerError::sql(format!("Invalid type name: {}", self.text.trim()))
    }

    fn peek(&self) -> Option<&TypeToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<TypeToken> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, token: TypeToken) -> Result<(), AnalyzerError> {
        if self.next() == Some(token) { Ok(()) } else { Err(self.error()) }
    }

    fn read_type(&mut self) -> Result<Type, AnalyzerError> {
        let Some(TypeToken::Ident(name)) = self.next() else {
            return Err(self.error());
        };
        match name.to_ascii_uppercase().as_str() {
            "ARRAY" => {
                self.expect(TypeToken::Open)?;
                let element = self.read_type()?;
                self.expect(TypeToken::Close)?;
                if element.kind() == TypeKind::Array {
                    return Err(AnalyzerError::sql("Arrays of arrays are not supported"));
                }
                Ok(Type::array(element))
            }
            "STRUCT" => {
                self.expect(TypeToken::Open)?;
                let mut fields = Vec::new();
                if self.peek() == Some(&TypeToken::Close) {
                    self.pos += 1;
                    return Ok(Type::struct_of(fields));
                }
                loop {
                    fields.push(self.read_field()?);
                    match self.next() {
                        Some(TypeToken::Comma) => continue,
                        Some(TypeToken::Close) => break,
                        _ => return Err(self.error()),
                    }
                }
                Ok(Type::struct_of(fields))
            }
            _ => match TypeKind::from_simple_name(&name).and_then(Type::simple) {
                Some(ty) => Ok(ty),
                None => (self.lookup)(&name).ok_or_else(|| AnalyzerError::type_not_found(&name)),
            },
        }
    }

    fn read_field(&mut self) -> Result<StructField, AnalyzerError> {
        // `name TYPE` when two identifiers follow each other, else anonymous
        if let (Some(TypeToken::Ident(name)), Some(TypeToken::Ident(_))) =
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1))
        {
            let name = name.clone();
            self.pos += 1;
            return Ok(StructField::named(name, self.read_type()?));
        }
        Ok(StructField::anonymous(self.read_type()?))
    }
}

impl Type {
    /// Parses a type name in SQL syntax (`INT64`, `ARRAY<STRING>`,
    /// `STRUCT<a INT64, b ARRAY<DATE>>`). Names that are not built-in are
    /// handed to `lookup` (enum, proto and extended types from a catalog).
    pub fn parse(text: &str, lookup: &dyn Fn(&str) -> Option<Type>) -> Result<Type, AnalyzerError> {
        let tokens = tokenize(text)?;
        let mut reader = TypeReader { text, tokens, pos: 0, lookup };
        let ty = reader.read_type()?;
        if reader.pos != reader.tokens.len() {
            return Err(reader.error());
        }
        Ok(ty)
    }

    /// [`Type::parse`] without named types.
    pub fn parse_builtin(text: &str) -> Result<Type, AnalyzerError> {
        Self::parse(text, &|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnumType;

    #[test]
    fn parses_nested_struct_and_array() {
        let ty = Type::parse_builtin("array<STRUCT<a INT64, b ARRAY<date>, STRING>>").unwrap();
        assert_eq!(ty.debug_string(), "ARRAY<STRUCT<a INT64, b ARRAY<DATE>, STRING>>");
    }

    #[test]
    fn resolves_named_types_through_lookup() {
        let color = Type::enum_of(EnumType::new("color", &[("RED", 0)]));
        let lookup = |name: &str| (name == "color").then(|| color.clone());
        assert_eq!(Type::parse("ARRAY<color>", &lookup).unwrap(), Type::array(color.clone()));
        let err = Type::parse("shape", &lookup).unwrap_err();
        assert!(err.to_string().contains("shape"));
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(Type::parse_builtin("ARRAY<INT64").is_err());
        assert!(Type::parse_builtin("STRUCT<a INT64,>").is_err());
        assert!(Type::parse_builtin("INT64 INT64").is_err());
        assert!(Type::parse_builtin("ARRAY<ARRAY<INT64>>").is_err());
        assert_eq!(Type::parse_builtin("STRUCT<>").unwrap(), Type::struct_of(vec![]));
    }
}
