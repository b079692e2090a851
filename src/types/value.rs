use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;

use crate::types::{Type, TypeKind};

/// JSON payload. `Unparsed` keeps the original text when validation was
/// switched off by the language options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonValue {
    Validated(serde_json::Value),
    Unparsed(String),
}

impl JsonValue {
    pub fn to_json_string(&self) -> String {
        match self {
            JsonValue::Validated(v) => v.to_string(),
            JsonValue::Unparsed(s) => s.clone(),
        }
    }

    pub fn is_validated(&self) -> bool {
        matches!(self, JsonValue::Validated(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueData {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    Numeric(Decimal),
    BigNumeric(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Time(NaiveTime),
    Datetime(NaiveDateTime),
    Json(JsonValue),
    /// Enum number; the name comes from the type's definition.
    Enum(i32),
    /// Encoded message payload.
    Proto(Vec<u8>),
    Array(Vec<Value>),
    Struct(Vec<Value>),
    /// Opaque textual representation of an extended value.
    Extended(String),
}

impl ValueData {
    pub fn kind(&self) -> TypeKind {
        match self {
            ValueData::Bool(_) => TypeKind::Bool,
            ValueData::Int32(_) => TypeKind::Int32,
            ValueData::Int64(_) => TypeKind::Int64,
            ValueData::Uint32(_) => TypeKind::Uint32,
            ValueData::Uint64(_) => TypeKind::Uint64,
            ValueData::Float(_) => TypeKind::Float,
            ValueData::Double(_) => TypeKind::Double,
            ValueData::Numeric(_) => TypeKind::Numeric,
            ValueData::BigNumeric(_) => TypeKind::BigNumeric,
            ValueData::String(_) => TypeKind::String,
            ValueData::Bytes(_) => TypeKind::Bytes,
            ValueData::Date(_) => TypeKind::Date,
            ValueData::Timestamp(_) => TypeKind::Timestamp,
            ValueData::Time(_) => TypeKind::Time,
            ValueData::Datetime(_) => TypeKind::Datetime,
            ValueData::Json(_) => TypeKind::Json,
            ValueData::Enum(_) => TypeKind::Enum,
            ValueData::Proto(_) => TypeKind::Proto,
            ValueData::Array(_) => TypeKind::Array,
            ValueData::Struct(_) => TypeKind::Struct,
            ValueData::Extended(_) => TypeKind::Extended,
        }
    }
}

/// A typed SQL value: NULL of some type, or a payload whose kind agrees
/// with the type.
///
/// # Panics
///
/// Every constructor panics when the payload disagrees with the type
/// (wrong kind, array element of another type, struct arity mismatch).
/// Such values can only come from a bug in the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    ty: Type,
    data: Option<ValueData>,
}

impl Value {
    pub fn new(ty: Type, data: ValueData) -> Self {
        assert_eq!(
            ty.kind(),
            data.kind(),
            "value payload {:?} does not match type {}",
            data.kind(),
            ty
        );
        match (&ty, &data) {
            (Type::Array(element), ValueData::Array(items)) => {
                for item in items {
                    assert!(item.ty() == element.as_ref(), "array element of type {} in {}", item.ty(), ty);
                }
            }
            (Type::Struct(st), ValueData::Struct(fields)) => {
                assert_eq!(st.num_fields(), fields.len(), "struct arity mismatch for {}", ty);
                for (f, v) in st.fields.iter().zip(fields) {
                    assert!(&f.ty == v.ty(), "struct field of type {} in {}", v.ty(), ty);
                }
            }
            _ => {}
        }
        Self { ty, data: Some(data) }
    }

    pub fn null(ty: Type) -> Self {
        Self { ty, data: None }
    }

    pub fn bool(v: bool) -> Self {
        Self::new(Type::Bool, ValueData::Bool(v))
    }

    pub fn int32(v: i32) -> Self {
        Self::new(Type::Int32, ValueData::Int32(v))
    }

    pub fn int64(v: i64) -> Self {
        Self::new(Type::Int64, ValueData::Int64(v))
    }

    pub fn uint32(v: u32) -> Self {
        Self::new(Type::Uint32, ValueData::Uint32(v))
    }

    pub fn uint64(v: u64) -> Self {
        Self::new(Type::Uint64, ValueData::Uint64(v))
    }

    pub fn float(v: f32) -> Self {
        Self::new(Type::Float, ValueData::Float(OrderedFloat(v)))
    }

    pub fn double(v: f64) -> Self {
        Self::new(Type::Double, ValueData::Double(OrderedFloat(v)))
    }

    pub fn numeric(v: Decimal) -> Self {
        Self::new(Type::Numeric, ValueData::Numeric(v))
    }

    pub fn bignumeric(v: Decimal) -> Self {
        Self::new(Type::BigNumeric, ValueData::BigNumeric(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::new(Type::String, ValueData::String(v.into()))
    }

    pub fn bytes(v: impl Into<Vec<u8>>) -> Self {
        Self::new(Type::Bytes, ValueData::Bytes(v.into()))
    }

    pub fn date(v: NaiveDate) -> Self {
        Self::new(Type::Date, ValueData::Date(v))
    }

    pub fn timestamp(v: DateTime<Utc>) -> Self {
        Self::new(Type::Timestamp, ValueData::Timestamp(v))
    }

    pub fn time(v: NaiveTime) -> Self {
        Self::new(Type::Time, ValueData::Time(v))
    }

    pub fn datetime(v: NaiveDateTime) -> Self {
        Self::new(Type::Datetime, ValueData::Datetime(v))
    }

    pub fn json(v: serde_json::Value) -> Self {
        Self::new(Type::Json, ValueData::Json(JsonValue::Validated(v)))
    }

    pub fn json_unparsed(text: impl Into<String>) -> Self {
        Self::new(Type::Json, ValueData::Json(JsonValue::Unparsed(text.into())))
    }

    pub fn enum_value(ty: Type, number: i32) -> Self {
        Self::new(ty, ValueData::Enum(number))
    }

    pub fn proto(ty: Type, payload: Vec<u8>) -> Self {
        Self::new(ty, ValueData::Proto(payload))
    }

    pub fn array(ty: Type, items: Vec<Value>) -> Self {
        Self::new(ty, ValueData::Array(items))
    }

    pub fn struct_value(ty: Type, fields: Vec<Value>) -> Self {
        Self::new(ty, ValueData::Struct(fields))
    }

    pub fn extended(ty: Type, repr: impl Into<String>) -> Self {
        Self::new(ty, ValueData::Extended(repr.into()))
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn kind(&self) -> TypeKind {
        self.ty.kind()
    }

    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    pub fn data(&self) -> Option<&ValueData> {
        self.data.as_ref()
    }

    pub fn into_parts(self) -> (Type, Option<ValueData>) {
        (self.ty, self.data)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.data.as_ref()? {
            ValueData::Int32(v) => Some(i64::from(*v)),
            ValueData::Int64(v) => Some(*v),
            ValueData::Uint32(v) => Some(i64::from(*v)),
            ValueData::Uint64(v) => i64::try_from(*v).ok(),
            ValueData::Enum(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.data.as_ref()? {
            ValueData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data.as_ref()? {
            ValueData::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// SQL literal rendering, used in error messages and debug output.
    pub fn debug_string(&self) -> String {
        let Some(data) = &self.data else {
            return "NULL".to_string();
        };
        match data {
            ValueData::Bool(b) => b.to_string(),
            ValueData::Int32(v) => v.to_string(),
            ValueData::Int64(v) => v.to_string(),
            ValueData::Uint32(v) => v.to_string(),
            ValueData::Uint64(v) => v.to_string(),
            ValueData::Float(v) => v.to_string(),
            ValueData::Double(v) => v.to_string(),
            ValueData::Numeric(d) => format!("NUMERIC '{}'", d.normalize()),
            ValueData::BigNumeric(d) => format!("BIGNUMERIC '{}'", d.normalize()),
            ValueData::String(s) => format!("'{}'", s.replace('\'', "\\'")),
            ValueData::Bytes(b) => format!("b'{}'", String::from_utf8_lossy(b)),
            ValueData::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
            ValueData::Timestamp(t) => format!("TIMESTAMP '{}'", t.format("%Y-%m-%d %H:%M:%S%.f+00")),
            ValueData::Time(t) => format!("TIME '{}'", t.format("%H:%M:%S%.f")),
            ValueData::Datetime(t) => format!("DATETIME '{}'", t.format("%Y-%m-%d %H:%M:%S%.f")),
            ValueData::Json(j) => format!("JSON '{}'", j.to_json_string()),
            ValueData::Enum(n) => match self.ty.as_enum().and_then(|e| e.find_name(*n)) {
                Some(name) => format!("'{name}'"),
                None => n.to_string(),
            },
            ValueData::Proto(bytes) => format!("{} b'{}'", self.ty, String::from_utf8_lossy(bytes)),
            ValueData::Array(items) => {
                let items: Vec<String> = items.iter().map(Value::debug_string).collect();
                format!("[{}]", items.join(", "))
            }
            ValueData::Struct(fields) => {
                let fields: Vec<String> = fields.iter().map(Value::debug_string).collect();
                format!("({})", fields.join(", "))
            }
            ValueData::Extended(repr) => repr.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructField;

    #[test]
    fn null_keeps_type() {
        let v = Value::null(Type::array(Type::Int64));
        assert!(v.is_null());
        assert_eq!(v.kind(), TypeKind::Array);
        assert_eq!(v.debug_string(), "NULL");
    }

    #[test]
    fn renders_nested_literals() {
        let st = Type::struct_of(vec![StructField::named("a", Type::Int64), StructField::anonymous(Type::String)]);
        let v = Value::struct_value(st, vec![Value::int64(1), Value::string("x")]);
        assert_eq!(v.debug_string(), "(1, 'x')");
        let arr = Value::array(Type::array(Type::Int64), vec![Value::int64(1), Value::null(Type::Int64)]);
        assert_eq!(arr.debug_string(), "[1, NULL]");
    }

    #[test]
    #[should_panic(expected = "does not match type")]
    fn mismatched_payload_panics() {
        let _ = Value::new(Type::Int32, ValueData::Int64(1));
    }

    #[test]
    #[should_panic(expected = "array element")]
    fn mismatched_array_element_panics() {
        let _ = Value::array(Type::array(Type::Int64), vec![Value::int32(1)]);
    }
}
