use std::fmt;

use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionMode {
    Scalar,
    Aggregate,
    /// Window-only functions such as ROW_NUMBER; always need OVER.
    Analytic,
}

/// Extra requirement on the type bound to `ANY` arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgumentConstraint {
    #[default]
    None,
    Equality,
    Ordering,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureArgument {
    Fixed(Type),
    /// Templated argument; all `Any` positions share one type.
    Any,
    /// An array whose element type is the shared `Any` type.
    ArrayOfAny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureResult {
    Fixed(Type),
    Any,
    ArrayOfAny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub arguments: Vec<SignatureArgument>,
    /// The last argument may repeat any number of times (including zero).
    pub repeated_last: bool,
    pub result: SignatureResult,
}

impl FunctionSignature {
    pub fn new(arguments: Vec<SignatureArgument>, result: SignatureResult) -> Self {
        Self { arguments, repeated_last: false, result }
    }

    pub fn fixed(arguments: &[Type], result: Type) -> Self {
        Self::new(arguments.iter().cloned().map(SignatureArgument::Fixed).collect(), SignatureResult::Fixed(result))
    }

    pub fn repeated(mut self) -> Self {
        self.repeated_last = true;
        self
    }

    /// Declared argument for position `idx` of a call with `count` arguments,
    /// or `None` when the arity does not fit.
    pub fn argument_for(&self, idx: usize, count: usize) -> Option<&SignatureArgument> {
        if !self.accepts_arity(count) {
            return None;
        }
        if idx < self.arguments.len() {
            self.arguments.get(idx)
        } else if self.repeated_last {
            self.arguments.last()
        } else {
            None
        }
    }

    pub fn accepts_arity(&self, count: usize) -> bool {
        if self.repeated_last {
            count + 1 >= self.arguments.len()
        } else {
            count == self.arguments.len()
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self
            .arguments
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let text = match a {
                    SignatureArgument::Fixed(t) => t.debug_string(),
                    SignatureArgument::Any => "ANY".to_string(),
                    SignatureArgument::ArrayOfAny => "ARRAY<ANY>".to_string(),
                };
                if self.repeated_last && i + 1 == self.arguments.len() { format!("[{text}, ...]") } else { text }
            })
            .collect();
        write!(f, "({})", args.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub mode: FunctionMode,
    pub signatures: Vec<FunctionSignature>,
    pub constraint: ArgumentConstraint,
    pub deprecated: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, mode: FunctionMode, signatures: Vec<FunctionSignature>) -> Self {
        Self { name: name.into(), mode, signatures, constraint: ArgumentConstraint::None, deprecated: false }
    }

    pub fn scalar(name: impl Into<String>, signatures: Vec<FunctionSignature>) -> Self {
        Self::new(name, FunctionMode::Scalar, signatures)
    }

    pub fn aggregate(name: impl Into<String>, signatures: Vec<FunctionSignature>) -> Self {
        Self::new(name, FunctionMode::Aggregate, signatures)
    }

    pub fn analytic(name: impl Into<String>, signatures: Vec<FunctionSignature>) -> Self {
        Self::new(name, FunctionMode::Analytic, signatures)
    }

    pub fn with_constraint(mut self, constraint: ArgumentConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Internal operator functions are named `$op`.
    pub fn is_operator(&self) -> bool {
        self.name.starts_with('$')
    }

    /// Name shown in error messages.
    pub fn sql_name(&self) -> String {
        match self.name.as_str() {
            "$add" => "operator +".into(),
            "$subtract" => "operator -".into(),
            "$multiply" => "operator *".into(),
            "$divide" => "operator /".into(),
            "$unary_minus" => "operator unary -".into(),
            "$equal" => "operator =".into(),
            "$not_equal" => "operator !=".into(),
            "$less" => "operator <".into(),
            "$less_or_equal" => "operator <=".into(),
            "$greater" => "operator >".into(),
            "$greater_or_equal" => "operator >=".into(),
            "$like" => "operator LIKE".into(),
            "$in" => "operator IN".into(),
            "$between" => "operator BETWEEN".into(),
            "$is_null" => "operator IS NULL".into(),
            "$and" => "operator AND".into(),
            "$or" => "operator OR".into(),
            "$not" => "operator NOT".into(),
            "$concat_op" => "operator ||".into(),
            "$count_star" => "COUNT(*)".into(),
            other => other.to_uppercase(),
        }
    }

    pub fn supported_signatures(&self) -> String {
        let name = self.sql_name();
        self.signatures.iter().map(|s| format!("{name}{s}")).collect::<Vec<_>>().join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_signatures_accept_variable_arity() {
        let sig = FunctionSignature::fixed(&[Type::String], Type::String).repeated();
        assert!(sig.accepts_arity(0));
        assert!(sig.accepts_arity(3));
        assert_eq!(sig.argument_for(2, 3), Some(&SignatureArgument::Fixed(Type::String)));
        let fixed = FunctionSignature::fixed(&[Type::Int64, Type::Int64], Type::Int64);
        assert!(!fixed.accepts_arity(1));
        assert_eq!(fixed.argument_for(0, 1), None);
    }

    #[test]
    fn signatures_render_for_messages() {
        let f = Function::scalar("concat", vec![FunctionSignature::fixed(&[Type::String], Type::String).repeated()]);
        assert_eq!(f.supported_signatures(), "CONCAT([STRING, ...])");
        let add = Function::scalar("$add", vec![FunctionSignature::fixed(&[Type::Int64, Type::Int64], Type::Int64)]);
        assert_eq!(add.supported_signatures(), "operator +(INT64, INT64)");
    }
}
