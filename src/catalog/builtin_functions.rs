//! Operators and the core function library every [`SimpleCatalog`] starts
//! with.
//!
//! [`SimpleCatalog`]: crate::catalog::SimpleCatalog

use crate::{
    catalog::{ArgumentConstraint, Function, FunctionSignature, SignatureArgument as Arg, SignatureResult},
    types::Type,
};

fn binary(types: &[Type]) -> Vec<FunctionSignature> {
    types.iter().map(|t| FunctionSignature::fixed(&[t.clone(), t.clone()], t.clone())).collect()
}

fn unary(types: &[Type]) -> Vec<FunctionSignature> {
    types.iter().map(|t| FunctionSignature::fixed(std::slice::from_ref(t), t.clone())).collect()
}

fn any_to(n: usize, result: Type) -> FunctionSignature {
    FunctionSignature::new(vec![Arg::Any; n], SignatureResult::Fixed(result))
}

fn any_to_any(n: usize) -> FunctionSignature {
    FunctionSignature::new(vec![Arg::Any; n], SignatureResult::Any)
}

fn comparison(name: &str, constraint: ArgumentConstraint) -> Function {
    Function::scalar(name, vec![any_to(2, Type::Bool)]).with_constraint(constraint)
}

pub fn builtin_functions() -> Vec<Function> {
    // decimals before DOUBLE so equal-cost matches keep the exact type
    let arithmetic = [Type::Int64, Type::Uint64, Type::Numeric, Type::BigNumeric, Type::Double];
    let mut add = binary(&arithmetic);
    add.push(FunctionSignature::fixed(&[Type::Date, Type::Int64], Type::Date));
    let mut subtract = binary(&arithmetic);
    subtract.push(FunctionSignature::fixed(&[Type::Date, Type::Int64], Type::Date));

    vec![
        // operators
        Function::scalar("$add", add),
        Function::scalar("$subtract", subtract),
        Function::scalar("$multiply", binary(&arithmetic)),
        Function::scalar("$divide", binary(&[Type::Numeric, Type::BigNumeric, Type::Double])),
        Function::scalar("$unary_minus", unary(&[Type::Int64, Type::Double, Type::Numeric, Type::BigNumeric])),
        comparison("$equal", ArgumentConstraint::Equality),
        comparison("$not_equal", ArgumentConstraint::Equality),
        comparison("$less", ArgumentConstraint::Ordering),
        comparison("$less_or_equal", ArgumentConstraint::Ordering),
        comparison("$greater", ArgumentConstraint::Ordering),
        comparison("$greater_or_equal", ArgumentConstraint::Ordering),
        Function::scalar("$between", vec![any_to(3, Type::Bool)]).with_constraint(ArgumentConstraint::Ordering),
        Function::scalar("$in", vec![any_to(2, Type::Bool).repeated()]).with_constraint(ArgumentConstraint::Equality),
        Function::scalar("$is_null", vec![any_to(1, Type::Bool)]),
        Function::scalar(
            "$like",
            vec![
                FunctionSignature::fixed(&[Type::String, Type::String], Type::Bool),
                FunctionSignature::fixed(&[Type::Bytes, Type::Bytes], Type::Bool),
            ],
        ),
        Function::scalar("$and", vec![FunctionSignature::fixed(&[Type::Bool, Type::Bool], Type::Bool).repeated()]),
        Function::scalar("$or", vec![FunctionSignature::fixed(&[Type::Bool, Type::Bool], Type::Bool).repeated()]),
        Function::scalar("$not", vec![FunctionSignature::fixed(&[Type::Bool], Type::Bool)]),
        Function::scalar(
            "$concat_op",
            vec![
                FunctionSignature::fixed(&[Type::String, Type::String], Type::String),
                FunctionSignature::fixed(&[Type::Bytes, Type::Bytes], Type::Bytes),
            ],
        ),
        // scalar functions
        Function::scalar(
            "concat",
            vec![
                FunctionSignature::fixed(&[Type::String], Type::String).repeated(),
                FunctionSignature::fixed(&[Type::Bytes], Type::Bytes).repeated(),
            ],
        ),
        Function::scalar(
            "length",
            vec![
                FunctionSignature::fixed(&[Type::String], Type::Int64),
                FunctionSignature::fixed(&[Type::Bytes], Type::Int64),
            ],
        ),
        Function::scalar("upper", unary(&[Type::String, Type::Bytes])),
        Function::scalar("lower", unary(&[Type::String, Type::Bytes])),
        Function::scalar("abs", unary(&[Type::Int64, Type::Uint64, Type::Double, Type::Numeric, Type::BigNumeric])),
        Function::scalar("coalesce", vec![any_to_any(1).repeated()]),
        Function::scalar("ifnull", vec![any_to_any(2)]),
        Function::scalar(
            "if",
            vec![FunctionSignature::new(vec![Arg::Fixed(Type::Bool), Arg::Any, Arg::Any], SignatureResult::Any)],
        ),
        Function::scalar(
            "array_length",
            vec![FunctionSignature::new(vec![Arg::ArrayOfAny], SignatureResult::Fixed(Type::Int64))],
        ),
        Function::scalar("current_date", vec![FunctionSignature::fixed(&[], Type::Date)]),
        Function::scalar("current_timestamp", vec![FunctionSignature::fixed(&[], Type::Timestamp)]),
        // aggregates
        Function::aggregate("$count_star", vec![FunctionSignature::fixed(&[], Type::Int64)]),
        Function::aggregate("count", vec![any_to(1, Type::Int64)]),
        Function::aggregate("sum", unary(&[Type::Int64, Type::Uint64, Type::Double, Type::Numeric, Type::BigNumeric])),
        Function::aggregate(
            "avg",
            vec![
                FunctionSignature::fixed(&[Type::Int64], Type::Double),
                FunctionSignature::fixed(&[Type::Uint64], Type::Double),
                FunctionSignature::fixed(&[Type::Double], Type::Double),
                FunctionSignature::fixed(&[Type::Numeric], Type::Numeric),
                FunctionSignature::fixed(&[Type::BigNumeric], Type::BigNumeric),
            ],
        ),
        Function::aggregate("min", vec![any_to_any(1)]).with_constraint(ArgumentConstraint::Ordering),
        Function::aggregate("max", vec![any_to_any(1)]).with_constraint(ArgumentConstraint::Ordering),
        Function::aggregate("array_agg", vec![FunctionSignature::new(vec![Arg::Any], SignatureResult::ArrayOfAny)]),
        Function::aggregate("string_agg", vec![FunctionSignature::fixed(&[Type::String], Type::String)]),
        Function::aggregate("logical_and", vec![FunctionSignature::fixed(&[Type::Bool], Type::Bool)]),
        Function::aggregate("logical_or", vec![FunctionSignature::fixed(&[Type::Bool], Type::Bool)]),
        // window functions
        Function::analytic("row_number", vec![FunctionSignature::fixed(&[], Type::Int64)]),
        Function::analytic("rank", vec![FunctionSignature::fixed(&[], Type::Int64)]),
        Function::analytic("dense_rank", vec![FunctionSignature::fixed(&[], Type::Int64)]),
        Function::analytic("lag", vec![any_to_any(1)]),
        Function::analytic("lead", vec![any_to_any(1)]),
        Function::analytic("first_value", vec![any_to_any(1)]),
        Function::analytic("last_value", vec![any_to_any(1)]),
    ]
}
