use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Optional language behaviors. Anything not listed in a
/// [`LanguageOptions`] is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LanguageFeature {
    /// TIMESTAMP/TIME/DATETIME carry nanoseconds instead of microseconds.
    TimestampNanos,
    /// STRING -> JSON keeps the text without parsing it.
    JsonNoValidation,
    /// Accept non-standard JSON (single quotes, trailing commas) when parsing.
    JsonLegacyParse,
    /// Two-field STRUCT casts into map-entry messages.
    ProtoMaps,
    /// Explicit casts between arrays of different element types.
    CastDifferentArrayTypes,
    /// Non-explicit integer -> enum coercion.
    IntegerToEnumCoercion,
    /// Unqualified column names must not be shadowed by range variables.
    StrictNameResolution,
    /// Duplicate output column names in one scope are allowed (ambiguous on use).
    AllowDuplicateColumnNames,
    /// `GROUP BY 1` and `GROUP BY alias`.
    GroupByOrdinal,
    WithRecursive,
    /// Warn when an expression calls a deprecated function.
    DeprecationWarnings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductMode {
    #[default]
    Internal,
    /// Restricts the visible type set to the portable subset.
    External,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOptions {
    features: BTreeSet<LanguageFeature>,
    pub product_mode: ProductMode,
}

impl LanguageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every feature switched on.
    pub fn maximum() -> Self {
        Self::with_features(&[
            LanguageFeature::TimestampNanos,
            LanguageFeature::ProtoMaps,
            LanguageFeature::CastDifferentArrayTypes,
            LanguageFeature::IntegerToEnumCoercion,
            LanguageFeature::AllowDuplicateColumnNames,
            LanguageFeature::GroupByOrdinal,
            LanguageFeature::WithRecursive,
            LanguageFeature::DeprecationWarnings,
        ])
    }

    pub fn with_features(features: &[LanguageFeature]) -> Self {
        Self { features: features.iter().copied().collect(), product_mode: ProductMode::Internal }
    }

    pub fn enable(mut self, feature: LanguageFeature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn disable(mut self, feature: LanguageFeature) -> Self {
        self.features.remove(&feature);
        self
    }

    pub fn external(mut self) -> Self {
        self.product_mode = ProductMode::External;
        self
    }

    pub fn supports(&self, feature: LanguageFeature) -> bool {
        self.features.contains(&feature)
    }

    pub fn features(&self) -> impl Iterator<Item = LanguageFeature> + '_ {
        self.features.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_toggles_features() {
        let opts = LanguageOptions::new().enable(LanguageFeature::ProtoMaps);
        assert!(opts.supports(LanguageFeature::ProtoMaps));
        assert!(!opts.disable(LanguageFeature::ProtoMaps).supports(LanguageFeature::ProtoMaps));
        assert!(!LanguageOptions::maximum().supports(LanguageFeature::JsonNoValidation));
    }
}
