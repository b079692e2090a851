use chrono::FixedOffset;

use crate::{
    analyzer::{AnalyzerError, truncate_literal},
    cast::{
        Coercer, ConversionEvaluator, ConversionFn, FindConversionOptions, InputArgument, MessageCodec, classify,
        convert,
        temporal::{self, TimestampPrecision},
    },
    catalog::Catalog,
    types::{LanguageFeature, LanguageOptions, Type, TypeKind, Value, ValueData},
};

/// How a cast treats coercion validation and extended types.
#[derive(Clone, Copy)]
pub enum CastValidation<'a> {
    /// Checks structural coercibility before casting NULL or ARRAY values;
    /// extended conversions come from the catalog.
    Validated { catalog: Option<&'a dyn Catalog> },
    /// Trusts the caller; extended conversions use the supplied function.
    Unvalidated { extended_conversion: Option<&'a ConversionFn> },
}

/// Casts `value` to `to`, validating structural coercions and looking up
/// extended-type conversions in `catalog`.
pub fn cast_value(
    value: &Value,
    to: &Type,
    default_zone: FixedOffset,
    language: &LanguageOptions,
    catalog: Option<&dyn Catalog>,
) -> Result<Value, AnalyzerError> {
    CastContext { default_zone, language, validation: CastValidation::Validated { catalog } }.cast(value, to)
}

/// Like [`cast_value`] but skips coercion validation; extended types use
/// `extended_conversion` directly.
pub fn cast_value_without_type_validation(
    value: &Value,
    to: &Type,
    default_zone: FixedOffset,
    language: &LanguageOptions,
    extended_conversion: Option<&ConversionFn>,
) -> Result<Value, AnalyzerError> {
    CastContext { default_zone, language, validation: CastValidation::Unvalidated { extended_conversion } }
        .cast(value, to)
}

struct CastContext<'a> {
    default_zone: FixedOffset,
    language: &'a LanguageOptions,
    validation: CastValidation<'a>,
}

impl CastContext<'_> {
    fn precision(&self) -> TimestampPrecision {
        TimestampPrecision::from_options(self.language)
    }

    fn cast(&self, value: &Value, to: &Type) -> Result<Value, AnalyzerError> {
        if value.ty() == to {
            return Ok(value.clone());
        }
        if value.kind() == TypeKind::Extended || to.kind() == TypeKind::Extended {
            return self.cast_extended(value, to);
        }
        if self.language.supports(LanguageFeature::ProtoMaps) && is_map_entry_cast(value.ty(), to) {
            return self.cast_map_entry(value, to);
        }
        if classify(value.kind(), to.kind()).is_none() {
            return Err(AnalyzerError::unsupported_cast(value.ty(), to));
        }
        let Some(data) = value.data() else {
            if !value.ty().is_simple() && value.kind() == to.kind() {
                self.validate_coercion(value, to)?;
            }
            return Ok(Value::null(to.clone()));
        };
        self.cast_non_null(value, data, to)
    }

    fn validate_coercion(&self, value: &Value, to: &Type) -> Result<(), AnalyzerError> {
        let CastValidation::Validated { catalog } = self.validation else {
            return Ok(());
        };
        let coercer = Coercer::new(self.language, catalog);
        if coercer.coerces_to(&InputArgument::literal(value.clone()), to, true) {
            Ok(())
        } else {
            Err(AnalyzerError::unsupported_cast(value.ty(), to))
        }
    }

    fn cast_extended(&self, value: &Value, to: &Type) -> Result<Value, AnalyzerError> {
        match self.validation {
            CastValidation::Validated { catalog } => {
                let catalog = catalog.ok_or_else(|| {
                    AnalyzerError::FailedPrecondition(
                        "Attempt to cast a Value of extended type without providing a Catalog".into(),
                    )
                })?;
                let conversion = catalog.find_conversion(value.ty(), to, &FindConversionOptions::explicit())?;
                conversion.eval(value)
            }
            CastValidation::Unvalidated { extended_conversion } => {
                let function = extended_conversion.ok_or_else(|| {
                    AnalyzerError::FailedPrecondition(
                        "Attempt to cast a Value of extended type without providing an extended conversion function"
                            .into(),
                    )
                })?;
                ConversionEvaluator::new(value.ty().clone(), to.clone(), function.clone())?.eval(value)
            }
        }
    }

    /// Two-field STRUCT into a map-entry message: cast key and value to the
    /// entry's field types and encode them.
    fn cast_map_entry(&self, value: &Value, to: &Type) -> Result<Value, AnalyzerError> {
        let proto = to.as_proto().ok_or_else(|| AnalyzerError::unsupported_cast(value.ty(), to))?;
        let (Some(key_field), Some(value_field)) = (proto.map_key(), proto.map_value()) else {
            return Err(AnalyzerError::unsupported_cast(value.ty(), to));
        };
        let Some(ValueData::Struct(fields)) = value.data() else {
            return Ok(Value::null(to.clone()));
        };
        let key = self.cast(&fields[0], &key_field.ty)?;
        let val = self.cast(&fields[1], &value_field.ty)?;
        let payload = MessageCodec::encode(proto, &[("key", &key), ("value", &val)])?;
        Ok(Value::proto(to.clone(), payload))
    }

    fn cast_non_null(&self, value: &Value, data: &ValueData, to: &Type) -> Result<Value, AnalyzerError> {
        use TypeKind as K;
        let from = value.kind();
        let to_kind = to.kind();
        let zone = self.default_zone;

        match (data, to_kind) {
            (ValueData::Bool(b), K::Int32 | K::Int64 | K::Uint32 | K::Uint64 | K::String) => {
                convert::integer_to(i128::from(*b), from, to_kind)
            }

            (ValueData::Int32(v), K::Bool | K::Int64 | K::Uint32 | K::Uint64 | K::Float | K::Double | K::Numeric | K::BigNumeric | K::String) => {
                convert::integer_to(i128::from(*v), from, to_kind)
            }
            (ValueData::Int64(v), K::Bool | K::Int32 | K::Uint32 | K::Uint64 | K::Float | K::Double | K::Numeric | K::BigNumeric | K::String) => {
                convert::integer_to(i128::from(*v), from, to_kind)
            }
            (ValueData::Uint32(v), K::Bool | K::Int32 | K::Int64 | K::Uint64 | K::Float | K::Double | K::Numeric | K::BigNumeric | K::String) => {
                convert::integer_to(i128::from(*v), from, to_kind)
            }
            (ValueData::Uint64(v), K::Bool | K::Int32 | K::Int64 | K::Uint32 | K::Float | K::Double | K::Numeric | K::BigNumeric | K::String) => {
                convert::integer_to(i128::from(*v), from, to_kind)
            }
            (ValueData::Int32(v), K::Enum) => integer_to_enum(i128::from(*v), to),
            (ValueData::Int64(v), K::Enum) => integer_to_enum(i128::from(*v), to),
            (ValueData::Uint32(v), K::Enum) => integer_to_enum(i128::from(*v), to),
            (ValueData::Uint64(v), K::Enum) => integer_to_enum(i128::from(*v), to),

            (ValueData::Float(v), K::Int32 | K::Int64 | K::Uint32 | K::Uint64 | K::Double | K::Numeric | K::BigNumeric | K::String) => {
                convert::float_to(f64::from(v.0), from, to_kind)
            }
            (ValueData::Double(v), K::Int32 | K::Int64 | K::Uint32 | K::Uint64 | K::Float | K::Numeric | K::BigNumeric | K::String) => {
                convert::float_to(v.0, from, to_kind)
            }
            (ValueData::Numeric(d), K::Int32 | K::Int64 | K::Uint32 | K::Uint64 | K::Float | K::Double | K::BigNumeric | K::String)
            | (ValueData::BigNumeric(d), K::Int32 | K::Int64 | K::Uint32 | K::Uint64 | K::Float | K::Double | K::Numeric | K::String) => {
                convert::decimal_to(*d, from, to_kind)
            }

            (ValueData::String(s), K::Bool | K::Int32 | K::Int64 | K::Uint32 | K::Uint64 | K::Float | K::Double | K::Numeric | K::BigNumeric) => {
                convert::string_to(s, to_kind)
            }
            (ValueData::String(s), K::Bytes) => Ok(Value::bytes(s.as_bytes())),
            (ValueData::String(s), K::Date) => temporal::parse_date(s).map(Value::date),
            (ValueData::String(s), K::Time) => temporal::parse_time(s, self.precision()).map(Value::time),
            (ValueData::String(s), K::Datetime) => temporal::parse_datetime(s, self.precision()).map(Value::datetime),
            (ValueData::String(s), K::Timestamp) => {
                temporal::parse_timestamp(s, zone, self.precision()).map(Value::timestamp)
            }
            (ValueData::String(s), K::Enum) => {
                let def = to.as_enum().ok_or_else(|| AnalyzerError::unsupported_cast(value.ty(), to))?;
                def.find_number(s).map(|n| Value::enum_value(to.clone(), n)).ok_or_else(|| {
                    AnalyzerError::eval(format!(
                        "Out of range cast of string '{}' to enum type {}",
                        truncate_literal(s),
                        to.debug_string()
                    ))
                })
            }
            (ValueData::String(s), K::Proto) => {
                let proto = to.as_proto().ok_or_else(|| AnalyzerError::unsupported_cast(value.ty(), to))?;
                MessageCodec::parse_text(proto, s).map(|payload| Value::proto(to.clone(), payload))
            }
            (ValueData::String(s), K::Json) => self.string_to_json(s),

            (ValueData::Bytes(b), K::String) => convert::bytes_to_string(b),
            // raw reinterpretation, no validation
            // payload bytes are the codec's JSON text, see MessageCodec
            (ValueData::Bytes(b), K::Proto) => Ok(Value::proto(to.clone(), b.clone())),

            (ValueData::Date(d), K::Datetime) => Ok(Value::datetime(temporal::date_to_datetime(*d))),
            (ValueData::Date(d), K::Timestamp) => temporal::date_to_timestamp(*d, zone).map(Value::timestamp),
            (ValueData::Date(d), K::String) => Ok(Value::string(temporal::format_date(*d))),

            (ValueData::Timestamp(t), K::Date) => temporal::timestamp_to_date(*t, zone).map(Value::date),
            (ValueData::Timestamp(t), K::Datetime) => temporal::timestamp_to_datetime(*t, zone).map(Value::datetime),
            (ValueData::Timestamp(t), K::Time) => Ok(Value::time(temporal::timestamp_to_time(*t, zone))),
            (ValueData::Timestamp(t), K::String) => {
                Ok(Value::string(temporal::format_timestamp(*t, zone, self.precision())))
            }

            (ValueData::Time(t), K::String) => Ok(Value::string(temporal::format_time(*t, self.precision()))),

            (ValueData::Datetime(dt), K::Date) => Ok(Value::date(dt.date())),
            (ValueData::Datetime(dt), K::Time) => Ok(Value::time(dt.time())),
            (ValueData::Datetime(dt), K::Timestamp) => temporal::datetime_to_timestamp(*dt, zone).map(Value::timestamp),
            (ValueData::Datetime(dt), K::String) => Ok(Value::string(temporal::format_datetime(*dt, self.precision()))),

            (ValueData::Json(j), K::String) => Ok(Value::string(j.to_json_string())),

            (ValueData::Enum(n), K::String) => {
                let name = value.ty().as_enum().and_then(|e| e.find_name(*n)).ok_or_else(|| {
                    AnalyzerError::eval(format!("Invalid enum value {n} for {}", value.ty().debug_string()))
                })?;
                Ok(Value::string(name))
            }
            (ValueData::Enum(n), K::Int32 | K::Int64 | K::Uint32 | K::Uint64) => {
                convert::integer_to(i128::from(*n), from, to_kind)
            }
            (ValueData::Enum(n), K::Enum) => {
                if !value.ty().equivalent(to) {
                    return Err(AnalyzerError::sql(format!(
                        "Invalid enum cast from {} to {}",
                        value.ty().debug_string(),
                        to.debug_string()
                    )));
                }
                match to.as_enum() {
                    Some(def) if def.find_name(*n).is_some() => Ok(Value::enum_value(to.clone(), *n)),
                    _ => Err(AnalyzerError::eval(format!(
                        "Out of range enum value {n} when converting enum type {} to a different definition of the same enum",
                        to.debug_string()
                    ))),
                }
            }

            (ValueData::Proto(payload), K::String) => {
                let proto = value.ty().as_proto().ok_or_else(|| AnalyzerError::unsupported_cast(value.ty(), to))?;
                MessageCodec::print_text(proto, payload).map(Value::string)
            }
            (ValueData::Proto(payload), K::Bytes) => Ok(Value::bytes(payload.clone())),
            (ValueData::Proto(payload), K::Proto) => {
                if !value.ty().equivalent(to) {
                    return Err(AnalyzerError::sql(format!(
                        "Invalid proto cast from {} to {}",
                        value.ty().debug_string(),
                        to.debug_string()
                    )));
                }
                Ok(Value::proto(to.clone(), payload.clone()))
            }

            (ValueData::Array(items), K::Array) => {
                self.validate_coercion(value, to)?;
                let element = to.element_type().ok_or_else(|| AnalyzerError::unsupported_cast(value.ty(), to))?;
                let mut casted = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_null() {
                        casted.push(Value::null(element.clone()));
                    } else {
                        casted.push(self.cast(item, element)?);
                    }
                }
                Ok(Value::array(to.clone(), casted))
            }

            (ValueData::Struct(fields), K::Struct) => {
                let target = to.as_struct().ok_or_else(|| AnalyzerError::unsupported_cast(value.ty(), to))?;
                if fields.len() != target.num_fields() {
                    return Err(AnalyzerError::unsupported_cast(value.ty(), to));
                }
                let casted = fields
                    .iter()
                    .zip(&target.fields)
                    .map(|(v, f)| self.cast(v, &f.ty))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::struct_value(to.clone(), casted))
            }

            _ => Err(AnalyzerError::unimplemented(format!(
                "Unimplemented cast from {} to {}",
                value.ty().debug_string(),
                to.debug_string()
            ))),
        }
    }

    fn string_to_json(&self, text: &str) -> Result<Value, AnalyzerError> {
        if self.language.supports(LanguageFeature::JsonNoValidation) {
            return Ok(Value::json_unparsed(text));
        }
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(v) => Ok(Value::json(v)),
            Err(_) if self.language.supports(LanguageFeature::JsonLegacyParse) => {
                // legacy documents may use single-quoted strings
                serde_json::from_str::<serde_json::Value>(&text.replace('\'', "\""))
                    .map(Value::json)
                    .map_err(|e| AnalyzerError::eval(e.to_string()))
            }
            Err(e) => Err(AnalyzerError::eval(e.to_string())),
        }
    }
}

fn integer_to_enum(v: i128, to: &Type) -> Result<Value, AnalyzerError> {
    let out_of_range = || {
        AnalyzerError::eval(format!("Out of range cast of integer {v} to enum type {}", to.debug_string()))
    };
    let def = to.as_enum().ok_or_else(out_of_range)?;
    let n = i32::try_from(v).map_err(|_| out_of_range())?;
    def.find_name(n).ok_or_else(out_of_range)?;
    Ok(Value::enum_value(to.clone(), n))
}

fn is_map_entry_cast(from: &Type, to: &Type) -> bool {
    from.as_struct().is_some_and(|s| s.num_fields() == 2) && to.as_proto().is_some_and(|p| p.is_map_entry)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Offset, Utc};

    use super::*;
    use crate::{
        analyzer::ErrorClass,
        cast::{CastClass, Conversion, cast_table},
        catalog::SimpleCatalog,
        types::{EnumType, ProtoField, ProtoType, StructField},
    };

    fn utc() -> FixedOffset {
        Utc.fix()
    }

    fn cast(v: &Value, to: &Type) -> Result<Value, AnalyzerError> {
        cast_value(v, to, utc(), &LanguageOptions::maximum(), None)
    }

    fn byte_enum() -> Type {
        let values: Vec<(String, i32)> = (0..=255).map(|i| (format!("V{i}"), i)).collect();
        Type::enum_of(EnumType { name: "byte".into(), values })
    }

    fn person() -> Type {
        Type::proto_of(ProtoType::new(
            "Person",
            vec![ProtoField { name: "id".into(), number: 1, ty: Type::Int64 }],
        ))
    }

    /// A representative non-NULL value for every kind.
    fn sample(kind: TypeKind) -> Value {
        use chrono::{NaiveDate, NaiveTime};
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        match kind {
            TypeKind::Bool => Value::bool(true),
            TypeKind::Int32 => Value::int32(1),
            TypeKind::Int64 => Value::int64(1),
            TypeKind::Uint32 => Value::uint32(1),
            TypeKind::Uint64 => Value::uint64(1),
            TypeKind::Float => Value::float(1.0),
            TypeKind::Double => Value::double(1.0),
            TypeKind::Numeric => Value::numeric(1.into()),
            TypeKind::BigNumeric => Value::bignumeric(1.into()),
            TypeKind::String => Value::string("1"),
            TypeKind::Bytes => Value::bytes(b"{\"id\":1}".to_vec()),
            TypeKind::Date => Value::date(date),
            TypeKind::Timestamp => Value::timestamp(date.and_time(NaiveTime::MIN).and_utc()),
            TypeKind::Time => Value::time(NaiveTime::from_hms_opt(1, 2, 3).unwrap()),
            TypeKind::Datetime => Value::datetime(date.and_time(NaiveTime::MIN)),
            TypeKind::Json => Value::json(serde_json::json!({"a": 1})),
            TypeKind::Enum => Value::enum_value(byte_enum(), 1),
            TypeKind::Proto => Value::proto(person(), b"{\"id\":1}".to_vec()),
            TypeKind::Array => Value::array(Type::array(Type::Int64), vec![Value::int64(1)]),
            TypeKind::Struct => Value::struct_value(
                Type::struct_of(vec![StructField::anonymous(Type::Int64)]),
                vec![Value::int64(1)],
            ),
            TypeKind::Extended => Value::extended(Type::extended("MONEY"), "1"),
        }
    }

    /// A target type of the given kind, distinct from the sample's type
    /// where the kind allows it.
    fn target(kind: TypeKind) -> Type {
        match kind {
            TypeKind::Enum => byte_enum(),
            TypeKind::Proto => person(),
            TypeKind::Array => Type::array(Type::Double),
            TypeKind::Struct => Type::struct_of(vec![StructField::named("x", Type::Double)]),
            TypeKind::Extended => Type::extended("MONEY"),
            simple => Type::simple(simple).unwrap(),
        }
    }

    #[test]
    fn every_lattice_pair_is_implemented() {
        for &(from, to) in cast_table().keys() {
            if from == TypeKind::Extended || to == TypeKind::Extended {
                continue;
            }
            let value = sample(from);
            let result = cast(&value, &target(to));
            if let Err(e) = &result {
                assert_ne!(e.class(), ErrorClass::Unimplemented, "{from} -> {to}: {e}");
            }
        }
    }

    #[test]
    fn identity_returns_the_same_value() {
        for kind in TypeKind::ALL {
            let v = sample(kind);
            assert_eq!(cast(&v, v.ty()).unwrap(), v);
        }
    }

    #[test]
    fn null_is_preserved_for_legal_pairs() {
        for &(from, to) in cast_table().keys() {
            if from == TypeKind::Extended || to == TypeKind::Extended {
                continue;
            }
            let null = Value::null(sample(from).ty().clone());
            let to_ty = target(to);
            assert_eq!(cast(&null, &to_ty).unwrap(), Value::null(to_ty.clone()), "{from} -> {to}");
        }
    }

    #[test]
    fn string_integer_round_trip() {
        let n = cast(&Value::string("123"), &Type::Int64).unwrap();
        assert_eq!(n, Value::int64(123));
        assert_eq!(cast(&n, &Type::String).unwrap(), Value::string("123"));
    }

    #[test]
    fn overflow_is_a_dynamic_error() {
        let err = cast(&Value::int64(300), &byte_enum()).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Dynamic);
        assert!(err.to_string().contains("300"));

        let small = Type::enum_of(EnumType::new("small", &[("A", 0)]));
        let err = cast(&Value::uint64(u64::MAX), &small).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Dynamic);

        let err = cast(&Value::int64(i64::from(i32::MAX) + 1), &Type::Int32).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Dynamic);
        assert!(err.to_string().contains("2147483648"));
    }

    #[test]
    fn struct_arity_mismatch_is_static() {
        let two = Type::struct_of(vec![StructField::anonymous(Type::Int64), StructField::anonymous(Type::Int64)]);
        let three = Type::struct_of(vec![
            StructField::anonymous(Type::Int64),
            StructField::anonymous(Type::Int64),
            StructField::anonymous(Type::Int64),
        ]);
        let v = Value::struct_value(two.clone(), vec![Value::int64(1), Value::int64(2)]);
        assert_eq!(cast(&v, &three).unwrap_err().class(), ErrorClass::Static);
        assert_eq!(cast(&Value::null(two), &three).unwrap_err().class(), ErrorClass::Static);
    }

    #[test]
    fn unsupported_kind_pair_is_static() {
        let err = cast(&Value::bool(true), &Type::Date).unwrap_err();
        assert!(matches!(err, AnalyzerError::UnsupportedCast { .. }));
        assert_eq!(err.to_string(), "Unsupported cast from BOOL to DATE");
    }

    #[test]
    fn null_struct_of_array_of_struct_follows_coercion() {
        let inner = |ty: Type| Type::struct_of(vec![StructField::named("a", ty)]);
        let outer = |ty: Type| Type::struct_of(vec![StructField::named("xs", Type::array(inner(ty)))]);

        let from = outer(Type::Int32);
        let widened = outer(Type::Int64);
        assert_eq!(cast(&Value::null(from.clone()), &widened).unwrap(), Value::null(widened));

        let narrowed = outer(Type::Bool);
        assert!(cast(&Value::null(outer(Type::Date)), &narrowed).is_err());

        // unvalidated casts skip the structural check
        let unvalidated = cast_value_without_type_validation(
            &Value::null(outer(Type::Date)),
            &narrowed,
            utc(),
            &LanguageOptions::maximum(),
            None,
        )
        .unwrap();
        assert!(unvalidated.is_null());

        let arity = Type::struct_of(vec![
            StructField::named("xs", Type::array(inner(Type::Int32))),
            StructField::named("y", Type::Int64),
        ]);
        assert!(cast(&Value::null(from), &arity).is_err());
    }

    #[test]
    fn array_elements_cast_with_null_passthrough() {
        let v = Value::array(Type::array(Type::Int32), vec![Value::int32(1), Value::null(Type::Int32)]);
        let out = cast(&v, &Type::array(Type::Int64)).unwrap();
        assert_eq!(out, Value::array(Type::array(Type::Int64), vec![Value::int64(1), Value::null(Type::Int64)]));
    }

    #[test]
    fn enum_definitions_must_be_equivalent() {
        let a = Type::enum_of(EnumType::new("color", &[("RED", 0), ("BLUE", 1)]));
        let b = Type::enum_of(EnumType::new("color", &[("RED", 0)]));
        let other = Type::enum_of(EnumType::new("shape", &[("RED", 0)]));
        assert_eq!(cast(&Value::enum_value(a.clone(), 0), &b).unwrap(), Value::enum_value(b.clone(), 0));
        assert_eq!(cast(&Value::enum_value(a.clone(), 1), &b).unwrap_err().class(), ErrorClass::Dynamic);
        assert_eq!(cast(&Value::enum_value(a, 0), &other).unwrap_err().class(), ErrorClass::Static);
    }

    #[test]
    fn map_entry_cast_encodes_key_and_value() {
        let entry = Type::proto_of(ProtoType::map_entry("Entry", Type::String, Type::Int64));
        let st = Type::struct_of(vec![StructField::anonymous(Type::String), StructField::anonymous(Type::Int32)]);
        let v = Value::struct_value(st, vec![Value::string("k"), Value::int32(7)]);
        let out = cast(&v, &entry).unwrap();
        let text = cast(&out, &Type::String).unwrap();
        assert_eq!(text, Value::string("key: \"k\" value: 7"));

        let without = LanguageOptions::new();
        assert!(cast_value(&v, &entry, utc(), &without, None).is_err());
    }

    #[test]
    fn json_validation_is_configurable() {
        assert!(cast(&Value::string("{bad"), &Type::Json).is_err());
        let lax = LanguageOptions::new().enable(LanguageFeature::JsonNoValidation);
        let v = cast_value(&Value::string("{bad"), &Type::Json, utc(), &lax, None).unwrap();
        assert_eq!(v, Value::json_unparsed("{bad"));
        let legacy = LanguageOptions::new().enable(LanguageFeature::JsonLegacyParse);
        let v = cast_value(&Value::string("{'a': 1}"), &Type::Json, utc(), &legacy, None).unwrap();
        assert!(matches!(v.data(), Some(ValueData::Json(j)) if j.is_validated()));
    }

    #[test]
    fn extended_casts_need_a_catalog_or_function() {
        let money = Type::extended("MONEY");
        let v = Value::extended(money.clone(), "$5");
        let err = cast(&v, &Type::String).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Misuse);

        let f: ConversionFn = Arc::new(|v: &Value| Ok(Value::string(v.debug_string())));
        let lang = LanguageOptions::new();
        let out = cast_value_without_type_validation(&v, &Type::String, utc(), &lang, Some(&f)).unwrap();
        assert_eq!(out, Value::string("$5"));

        let mut catalog = SimpleCatalog::new("c");
        catalog.add_conversion(Conversion::new(money, Type::String, f, CastClass::Explicit).unwrap());
        let out = cast_value(&v, &Type::String, utc(), &lang, Some(&catalog)).unwrap();
        assert_eq!(out, Value::string("$5"));
        assert!(cast_value(&v, &Type::Int64, utc(), &lang, Some(&catalog)).is_err());
    }

    #[test]
    fn temporal_casts_use_default_zone() {
        let zone = FixedOffset::east_opt(3600).unwrap();
        let lang = LanguageOptions::new();
        let ts = cast_value(&Value::string("2020-01-01 00:30:00"), &Type::Timestamp, zone, &lang, None).unwrap();
        let s = cast_value(&ts, &Type::String, utc(), &lang, None).unwrap();
        assert_eq!(s, Value::string("2019-12-31 23:30:00+00"));
        let d = cast_value(&ts, &Type::Date, zone, &lang, None).unwrap();
        assert_eq!(cast_value(&d, &Type::String, zone, &lang, None).unwrap(), Value::string("2020-01-01"));
    }
}
