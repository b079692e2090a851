use crate::{catalog::Column, types::Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TvfArgumentKind {
    /// A table or subquery.
    Relation,
    Scalar(Type),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TvfOutput {
    Fixed(Vec<Column>),
    /// Same columns as the relation argument at this position.
    ForwardInput(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableValuedFunction {
    pub name: String,
    pub arguments: Vec<TvfArgumentKind>,
    pub output: TvfOutput,
}

impl TableValuedFunction {
    pub fn new(name: impl Into<String>, arguments: Vec<TvfArgumentKind>, output: TvfOutput) -> Self {
        Self { name: name.into(), arguments, output }
    }

    pub fn signature_string(&self) -> String {
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|a| match a {
                TvfArgumentKind::Relation => "TABLE".to_string(),
                TvfArgumentKind::Scalar(t) => t.debug_string(),
            })
            .collect();
        format!("{}({})", self.name.to_uppercase(), args.join(", "))
    }
}
