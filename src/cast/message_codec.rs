//! Payload codec for structured message values.
//!
//! A payload is the UTF-8 JSON encoding of an object keyed by field name.
//! The text form is a whitespace separated list of `field: value` pairs,
//! e.g. `id: 5 name: "x" color: RED`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value as Json};

use crate::{
    analyzer::{AnalyzerError, truncate_literal},
    cast::{convert, temporal},
    types::{ProtoType, Type, TypeKind, Value, ValueData},
};

static TEXT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*:\s*(?:"(?P<quoted>(?:[^"\\]|\\.)*)"|(?P<bare>[^\s"]+))"#)
        .expect("static regex")
});

/// Encodes message values as JSON objects, not the protobuf wire format.
/// PROTO to BYTES casts hand this JSON text out unchanged, and BYTES to
/// PROTO casts expect it back.
pub struct MessageCodec;

impl MessageCodec {
    /// Encodes `(field, value)` pairs; NULL values leave the field unset.
    pub fn encode(proto: &ProtoType, fields: &[(&str, &Value)]) -> Result<Vec<u8>, AnalyzerError> {
        let mut object = Map::new();
        for (name, value) in fields {
            if proto.field(name).is_none() {
                return Err(AnalyzerError::eval(format!("Field {name} does not exist in PROTO<{}>", proto.name)));
            }
            if !value.is_null() {
                object.insert((*name).to_string(), Self::value_to_json(value));
            }
        }
        serde_json::to_vec(&Json::Object(object)).map_err(|e| AnalyzerError::eval(e.to_string()))
    }

    fn decode(proto: &ProtoType, payload: &[u8]) -> Result<Map<String, Json>, AnalyzerError> {
        let invalid = || {
            AnalyzerError::eval(format!(
                "Invalid cast to string from type PROTO<{}>: {}",
                proto.name,
                truncate_literal(&format!("b'{}'", String::from_utf8_lossy(payload)))
            ))
        };
        match serde_json::from_slice::<Json>(payload) {
            Ok(Json::Object(map)) => Ok(map),
            _ => Err(invalid()),
        }
    }

    /// JSON form of a field value.
    pub fn value_to_json(value: &Value) -> Json {
        let Some(data) = value.data() else {
            return Json::Null;
        };
        match data {
            ValueData::Bool(b) => Json::Bool(*b),
            ValueData::Int32(v) => Json::from(*v),
            ValueData::Int64(v) => Json::from(*v),
            ValueData::Uint32(v) => Json::from(*v),
            ValueData::Uint64(v) => Json::from(*v),
            ValueData::Enum(v) => Json::from(*v),
            ValueData::Float(v) => Number::from_f64(f64::from(v.0))
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(convert::render_float(v.0))),
            ValueData::Double(v) => Number::from_f64(v.0)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(convert::render_double(v.0))),
            ValueData::Numeric(d) | ValueData::BigNumeric(d) => Json::String(d.normalize().to_string()),
            ValueData::String(s) => Json::String(s.clone()),
            ValueData::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
            ValueData::Date(d) => Json::String(temporal::format_date(*d)),
            ValueData::Time(t) => Json::String(temporal::format_time(*t, temporal::TimestampPrecision::Nanos)),
            ValueData::Datetime(t) => {
                Json::String(temporal::format_datetime(*t, temporal::TimestampPrecision::Nanos))
            }
            ValueData::Timestamp(t) => Json::String(t.to_rfc3339()),
            ValueData::Json(j) => match j {
                crate::types::JsonValue::Validated(v) => v.clone(),
                crate::types::JsonValue::Unparsed(s) => Json::String(s.clone()),
            },
            ValueData::Proto(p) => serde_json::from_slice(p).unwrap_or(Json::Null),
            ValueData::Array(items) | ValueData::Struct(items) => {
                Json::Array(items.iter().map(Self::value_to_json).collect())
            }
            ValueData::Extended(s) => Json::String(s.clone()),
        }
    }

    /// Parses text format into a payload for `proto`.
    pub fn parse_text(proto: &ProtoType, text: &str) -> Result<Vec<u8>, AnalyzerError> {
        let Some(fields) = &proto.fields else {
            return Err(AnalyzerError::eval(format!(
                "Invalid cast from string to opaque proto type PROTO<{}>",
                proto.name
            )));
        };
        let bad = |detail: &str| {
            AnalyzerError::eval(format!(
                "Invalid PROTO<{}> value: {} ({detail})",
                proto.name,
                truncate_literal(text)
            ))
        };
        let mut object = Map::new();
        let mut rest = text;
        while !rest.trim().is_empty() {
            let caps = TEXT_FIELD.captures(rest).ok_or_else(|| bad("malformed field"))?;
            let name = &caps["name"];
            let field = fields.iter().find(|f| f.name == name).ok_or_else(|| bad("unknown field"))?;
            let json = match (caps.name("quoted"), caps.name("bare")) {
                (Some(q), _) => {
                    let unescaped = q.as_str().replace("\\\"", "\"").replace("\\\\", "\\");
                    match field.ty.kind() {
                        TypeKind::String | TypeKind::Bytes => Json::String(unescaped),
                        _ => return Err(bad("quoted value for non-string field")),
                    }
                }
                (None, Some(b)) => Self::bare_to_json(&field.ty, b.as_str()).ok_or_else(|| bad("bad value"))?,
                (None, None) => return Err(bad("missing value")),
            };
            object.insert(name.to_string(), json);
            rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
        }
        serde_json::to_vec(&Json::Object(object)).map_err(|e| AnalyzerError::eval(e.to_string()))
    }

    fn bare_to_json(ty: &Type, token: &str) -> Option<Json> {
        match ty {
            Type::Enum(e) => e.find_number(token).map(Json::from),
            Type::Int32 | Type::Int64 | Type::Uint32 | Type::Uint64 | Type::Float | Type::Double | Type::Bool => {
                convert::string_to(token, ty.kind()).ok().map(|v| Self::value_to_json(&v))
            }
            _ => None,
        }
    }

    /// Prints a payload in text format, fields in declaration order.
    pub fn print_text(proto: &ProtoType, payload: &[u8]) -> Result<String, AnalyzerError> {
        let Some(fields) = &proto.fields else {
            return Err(AnalyzerError::eval(format!(
                "Invalid cast from opaque proto type PROTO<{}> to string",
                proto.name
            )));
        };
        let object = Self::decode(proto, payload)?;
        let mut parts = Vec::new();
        for field in fields {
            let Some(json) = object.get(&field.name) else {
                continue;
            };
            let rendered = match (&field.ty, json) {
                (Type::Enum(e), Json::Number(n)) => n
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .and_then(|v| e.find_name(v))
                    .map(str::to_string)
                    .unwrap_or_else(|| n.to_string()),
                (_, Json::String(s)) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
                (_, other) => other.to_string(),
            };
            parts.push(format!("{}: {}", field.name, rendered));
        }
        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumType, ProtoField};

    fn person() -> ProtoType {
        ProtoType::new(
            "Person",
            vec![
                ProtoField { name: "id".into(), number: 1, ty: Type::Int64 },
                ProtoField { name: "name".into(), number: 2, ty: Type::String },
                ProtoField {
                    name: "color".into(),
                    number: 3,
                    ty: Type::enum_of(EnumType::new("color", &[("RED", 0), ("BLUE", 1)])),
                },
            ],
        )
    }

    #[test]
    fn text_format_survives_parse_and_print() {
        let p = person();
        let payload = MessageCodec::parse_text(&p, r#"id: 5 name: "a \"b\"" color: BLUE"#).unwrap();
        assert_eq!(MessageCodec::print_text(&p, &payload).unwrap(), r#"id: 5 name: "a \"b\"" color: BLUE"#);
    }

    #[test]
    fn payloads_are_json_objects() {
        let p = person();
        let payload = MessageCodec::parse_text(&p, "id: 5 color: BLUE").unwrap();
        let json: Json = serde_json::from_slice(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 5, "color": 1 }));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_values() {
        let p = person();
        assert!(MessageCodec::parse_text(&p, "age: 3").is_err());
        assert!(MessageCodec::parse_text(&p, "id: abc").is_err());
        assert!(MessageCodec::parse_text(&p, "color: GREEN").is_err());
        assert!(MessageCodec::print_text(&p, b"\x00garbage").is_err());
    }

    #[test]
    fn opaque_messages_cannot_be_printed() {
        let p = ProtoType::opaque("Blob");
        assert!(MessageCodec::print_text(&p, b"{}").unwrap_err().to_string().contains("opaque"));
        assert!(MessageCodec::parse_text(&p, "").is_err());
    }
}
