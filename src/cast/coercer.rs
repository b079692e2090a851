use chrono::{FixedOffset, Offset, Utc};

use crate::{
    cast::{ArgumentKind, CastClass, FindConversionOptions, InputArgument, cast_value_without_type_validation, classify},
    catalog::Catalog,
    types::{LanguageFeature, LanguageOptions, Type, TypeKind, ValueData},
};

/// Decides whether an argument may become a given type. Pure: the answer
/// depends only on the argument, the target and the session configuration.
pub struct Coercer<'a> {
    language: &'a LanguageOptions,
    catalog: Option<&'a dyn Catalog>,
}

impl<'a> Coercer<'a> {
    pub fn new(language: &'a LanguageOptions, catalog: Option<&'a dyn Catalog>) -> Self {
        Self { language, catalog }
    }

    pub fn coerces_to(&self, arg: &InputArgument, to: &Type, explicit: bool) -> bool {
        if &arg.ty == to || arg.kind == ArgumentKind::UntypedNull {
            return true;
        }
        if matches!(arg.kind, ArgumentKind::Parameter { untyped: true }) {
            return to.is_simple();
        }
        if arg.ty.kind() == TypeKind::Extended || to.kind() == TypeKind::Extended {
            return self.extended_coerces_to(arg, to, explicit);
        }
        match (&arg.ty, to) {
            (Type::Array(_), Type::Array(_)) => self.array_coerces_to(arg, to, explicit),
            (Type::Struct(_), Type::Struct(_)) => self.struct_coerces_to(arg, to, explicit),
            (Type::Enum(_), Type::Enum(_)) | (Type::Proto(_), Type::Proto(_)) => {
                // exact equality was handled above
                explicit && arg.ty.equivalent(to)
            }
            _ => self.kind_coerces_to(arg, to, explicit),
        }
    }

    /// Coercions decided by the cast lattice alone (plus the literal value
    /// check).
    fn kind_coerces_to(&self, arg: &InputArgument, to: &Type, explicit: bool) -> bool {
        let Some(entry) = classify(arg.ty.kind(), to.kind()) else {
            return false;
        };
        if !to.is_simple() && !matches!(to.kind(), TypeKind::Enum | TypeKind::Proto) {
            return false;
        }
        if explicit {
            return entry.class.supports_explicit_cast();
        }
        if arg.ty.kind().is_integer()
            && to.kind() == TypeKind::Enum
            && !self.language.supports(LanguageFeature::IntegerToEnumCoercion)
        {
            return false;
        }
        match &arg.kind {
            ArgumentKind::Literal(value) => {
                entry.class.supports_literal_coercion()
                    && (entry.class == CastClass::Implicit || self.literal_converts(value, to))
            }
            ArgumentKind::Parameter { .. } => entry.class.supports_parameter_coercion(),
            ArgumentKind::Expression => entry.class.supports_implicit_coercion(),
            ArgumentKind::UntypedNull => true,
        }
    }

    /// A literal coerces only if its value actually survives the cast,
    /// e.g. `3000000000` does not coerce to INT32.
    fn literal_converts(&self, value: &crate::types::Value, to: &Type) -> bool {
        if value.is_null() {
            return true;
        }
        let utc: FixedOffset = Utc.fix();
        cast_value_without_type_validation(value, to, utc, self.language, None).is_ok()
    }

    fn array_coerces_to(&self, arg: &InputArgument, to: &Type, explicit: bool) -> bool {
        let (Some(from_elem), Some(to_elem)) = (arg.ty.element_type(), to.element_type()) else {
            return false;
        };
        if explicit && !matches!(arg.kind, ArgumentKind::Literal(_) | ArgumentKind::Parameter { .. }) {
            if self.language.supports(LanguageFeature::CastDifferentArrayTypes) {
                return self.coerces_to(&InputArgument::expression(from_elem.clone()), to_elem, true);
            }
            return from_elem.equivalent(to_elem);
        }
        match &arg.kind {
            ArgumentKind::Literal(value) => match value.data() {
                Some(ValueData::Array(items)) => {
                    let typed_null = arg.child(from_elem, None);
                    self.coerces_to(&typed_null, to_elem, explicit)
                        && items.iter().all(|item| self.coerces_to(&arg.child(from_elem, Some(item)), to_elem, explicit))
                }
                _ => self.coerces_to(&arg.child(from_elem, None), to_elem, explicit),
            },
            ArgumentKind::Parameter { .. } => self.coerces_to(&arg.child(from_elem, None), to_elem, explicit),
            _ => false,
        }
    }

    fn struct_coerces_to(&self, arg: &InputArgument, to: &Type, explicit: bool) -> bool {
        let (Some(from_st), Some(to_st)) = (arg.ty.as_struct(), to.as_struct()) else {
            return false;
        };
        if from_st.num_fields() != to_st.num_fields() {
            return false;
        }
        let field_values = match arg.literal_value().and_then(|v| v.data()) {
            Some(ValueData::Struct(values)) => Some(values),
            _ => None,
        };
        from_st.fields.iter().zip(&to_st.fields).enumerate().all(|(idx, (from_f, to_f))| {
            let value = field_values.and_then(|vals| vals.get(idx));
            self.coerces_to(&arg.child(&from_f.ty, value), &to_f.ty, explicit)
        })
    }

    fn extended_coerces_to(&self, arg: &InputArgument, to: &Type, explicit: bool) -> bool {
        let Some(catalog) = self.catalog else {
            return false;
        };
        let options = FindConversionOptions { is_explicit: explicit, source_kind: arg.source_kind() };
        catalog
            .find_conversion(&arg.ty, to, &options)
            .map(|conversion| conversion.is_match(&options))
            .unwrap_or(false)
    }

    /// Cheapest type every argument implicitly coerces to: the argument
    /// types themselves first, then the simple kinds. Untyped arguments
    /// accept anything; with only untyped arguments the answer is INT64.
    pub fn common_supertype(&self, args: &[InputArgument]) -> Option<Type> {
        let typed: Vec<&InputArgument> = args.iter().filter(|a| !a.is_untyped()).collect();
        if typed.is_empty() {
            return Some(Type::Int64);
        }
        let mut candidates: Vec<Type> = Vec::new();
        for a in &typed {
            if !candidates.contains(&a.ty) {
                candidates.push(a.ty.clone());
            }
        }
        for kind in TypeKind::ALL {
            if let Some(ty) = Type::simple(kind)
                && !candidates.contains(&ty)
            {
                candidates.push(ty);
            }
        }
        let mut best: Option<(u32, Type)> = None;
        for candidate in candidates {
            if !typed.iter().all(|a| self.coerces_to(a, &candidate, false)) {
                continue;
            }
            let cost: u32 = typed.iter().map(|a| TypeKind::coercion_cost(candidate.kind(), a.ty.kind())).sum();
            if best.as_ref().is_none_or(|(c, _)| cost < *c) {
                best = Some((cost, candidate));
            }
        }
        best.map(|(_, ty)| ty)
    }
}
