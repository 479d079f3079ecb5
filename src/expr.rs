use crate::{Dimension, VarId};
use std::{
    convert::TryFrom,
    fmt::{self, Display, Formatter},
    ops::{Add, Div, Mul, Neg, Sub},
};
use thiserror::Error;

/// An expression, where every node is annotated with its physical dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal.
    Number { value: f64, dim: Dimension },
    /// A reference to an entry in the variable table.
    Variable { index: VarId, dim: Dimension },
    /// An expression involving two operands.
    Binary {
        op: BinaryOperation,
        left: Box<Expression>,
        right: Box<Expression>,
        dim: Dimension,
    },
    /// Invoke a builtin function.
    Function {
        function: Builtin,
        argument: Box<Expression>,
        dim: Dimension,
    },
    /// An associative operator applied to any number of arguments.
    NAry {
        op: NAryOperation,
        args: Vec<Expression>,
        dim: Dimension,
    },
}

impl Expression {
    /// A literal whose dimension is yet to be determined.
    pub fn number(value: f64) -> Self {
        Expression::quantity(value, Dimension::Unknown)
    }

    pub fn dimensionless(value: f64) -> Self {
        Expression::quantity(value, Dimension::dimensionless())
    }

    pub fn quantity(value: f64, dim: Dimension) -> Self {
        Expression::Number { value, dim }
    }

    pub fn variable(index: VarId, dim: Dimension) -> Self {
        Expression::Variable { index, dim }
    }

    pub fn binary(
        op: BinaryOperation,
        left: Expression,
        right: Expression,
    ) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            dim: Dimension::Unknown,
        }
    }

    pub fn power(base: Expression, exponent: Expression) -> Self {
        Expression::binary(BinaryOperation::Power, base, exponent)
    }

    pub fn call(function: Builtin, argument: Expression) -> Self {
        Expression::Function {
            function,
            argument: Box::new(argument),
            dim: Dimension::Unknown,
        }
    }

    pub fn sum(args: Vec<Expression>) -> Self {
        Expression::n_ary(NAryOperation::Sum, args)
    }

    pub fn product(args: Vec<Expression>) -> Self {
        Expression::n_ary(NAryOperation::Product, args)
    }

    pub fn n_ary(op: NAryOperation, args: Vec<Expression>) -> Self {
        Expression::NAry {
            op,
            args,
            dim: Dimension::Unknown,
        }
    }

    pub fn dim(&self) -> Dimension {
        match self {
            Expression::Number { dim, .. }
            | Expression::Variable { dim, .. }
            | Expression::Binary { dim, .. }
            | Expression::Function { dim, .. }
            | Expression::NAry { dim, .. } => *dim,
        }
    }

    pub fn set_dim(&mut self, new_dim: Dimension) {
        match self {
            Expression::Number { dim, .. }
            | Expression::Variable { dim, .. }
            | Expression::Binary { dim, .. }
            | Expression::Function { dim, .. }
            | Expression::NAry { dim, .. } => *dim = new_dim,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expression::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool { self.as_number().is_some() }

    pub fn as_variable(&self) -> Option<VarId> {
        match self {
            Expression::Variable { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_compound(&self) -> bool {
        match self {
            Expression::Number { .. } | Expression::Variable { .. } => false,
            Expression::Binary { .. }
            | Expression::Function { .. }
            | Expression::NAry { .. } => true,
        }
    }

    /// The direct children of this node, in order.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Number { .. } | Expression::Variable { .. } => {
                Vec::new()
            },
            Expression::Binary { left, right, .. } => vec![&**left, &**right],
            Expression::Function { argument, .. } => vec![&**argument],
            Expression::NAry { args, .. } => args.iter().collect(),
        }
    }

    /// Visit every node in the tree, parents before their children.
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&Expression),
    {
        visit(self);

        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn references(&self, variable: VarId) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            if node.as_variable() == Some(variable) {
                found = true;
            }
        });
        found
    }

    /// Every variable referenced by this expression, in the order they are
    /// first seen.
    pub fn variables(&self) -> impl Iterator<Item = VarId> {
        let mut found = Vec::new();
        self.walk(&mut |node| {
            if let Some(variable) = node.as_variable() {
                if !found.contains(&variable) {
                    found.push(variable);
                }
            }
        });
        found.into_iter()
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }
}

/// An operation that can be applied to two arguments.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOperation {
    Equals,
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl BinaryOperation {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperation::Equals => "=",
            BinaryOperation::Plus => "+",
            BinaryOperation::Minus => "-",
            BinaryOperation::Times => "*",
            BinaryOperation::Divide => "/",
            BinaryOperation::Power => "^",
        }
    }
}

/// Associative (and commutative) operators which can take any number of
/// arguments.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NAryOperation {
    Sum,
    Product,
}

impl NAryOperation {
    pub fn symbol(self) -> &'static str {
        match self {
            NAryOperation::Sum => "+",
            NAryOperation::Product => "*",
        }
    }

    /// The value of this operation applied to no arguments.
    pub fn identity(self) -> f64 {
        match self {
            NAryOperation::Sum => 0.0,
            NAryOperation::Product => 1.0,
        }
    }

    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            NAryOperation::Sum => left + right,
            NAryOperation::Product => left * right,
        }
    }

    /// The [`BinaryOperation`] this is a repeated version of.
    pub fn binary(self) -> BinaryOperation {
        match self {
            NAryOperation::Sum => BinaryOperation::Plus,
            NAryOperation::Product => BinaryOperation::Times,
        }
    }

    pub fn from_binary(op: BinaryOperation) -> Option<NAryOperation> {
        match op {
            BinaryOperation::Plus => Some(NAryOperation::Sum),
            BinaryOperation::Times => Some(NAryOperation::Product),
            _ => None,
        }
    }
}

/// Various builtin functions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Builtin {
    Sqrt,
    Abs,
    Sine,
    Cosine,
    Tangent,
    ArcSine,
    ArcCosine,
    ArcTangent,
    Exp,
    Ln,
    Log10,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Sqrt,
        Builtin::Abs,
        Builtin::Sine,
        Builtin::Cosine,
        Builtin::Tangent,
        Builtin::ArcSine,
        Builtin::ArcCosine,
        Builtin::ArcTangent,
        Builtin::Exp,
        Builtin::Ln,
        Builtin::Log10,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::Sine => "sin",
            Builtin::Cosine => "cos",
            Builtin::Tangent => "tan",
            Builtin::ArcSine => "asin",
            Builtin::ArcCosine => "acos",
            Builtin::ArcTangent => "atan",
            Builtin::Exp => "exp",
            Builtin::Ln => "ln",
            Builtin::Log10 => "log10",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.iter().copied().find(|b| b.name() == name)
    }

    /// Evaluate the function. Angles are in radians.
    pub fn evaluate(self, argument: f64) -> f64 {
        match self {
            Builtin::Sqrt => argument.sqrt(),
            Builtin::Abs => argument.abs(),
            Builtin::Sine => argument.sin(),
            Builtin::Cosine => argument.cos(),
            Builtin::Tangent => argument.tan(),
            Builtin::ArcSine => argument.asin(),
            Builtin::ArcCosine => argument.acos(),
            Builtin::ArcTangent => argument.atan(),
            Builtin::Exp => argument.exp(),
            Builtin::Ln => argument.ln(),
            Builtin::Log10 => argument.log10(),
        }
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Two expressions which are meant to be equal.
///
/// An equation is the `Equals` form of [`Expression::Binary`], kept as its own
/// type so rewriting either side can never turn it into something that isn't
/// an equation.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub left: Expression,
    pub right: Expression,
    pub dim: Dimension,
}

impl Equation {
    pub fn new(left: Expression, right: Expression) -> Self {
        Equation {
            left,
            right,
            dim: Dimension::Unknown,
        }
    }

    pub fn sides(&self) -> [&Expression; 2] { [&self.left, &self.right] }

    pub fn sides_mut(&mut self) -> [&mut Expression; 2] {
        [&mut self.left, &mut self.right]
    }

    pub fn references(&self, variable: VarId) -> bool {
        self.left.references(variable) || self.right.references(variable)
    }

    /// If this equation has the form `x = <expression without x>`, which
    /// variable does it assign?
    pub fn solved_variable(&self) -> Option<VarId> {
        let variable = self.left.as_variable()?;

        if self.right.references(variable) {
            None
        } else {
            Some(variable)
        }
    }
}

impl From<Equation> for Expression {
    fn from(equation: Equation) -> Expression {
        Expression::Binary {
            op: BinaryOperation::Equals,
            left: Box::new(equation.left),
            right: Box::new(equation.right),
            dim: equation.dim,
        }
    }
}

impl TryFrom<Expression> for Equation {
    type Error = NotAnEquation;

    fn try_from(expr: Expression) -> Result<Self, Self::Error> {
        match expr {
            Expression::Binary {
                op: BinaryOperation::Equals,
                left,
                right,
                dim,
            } => Ok(Equation {
                left: *left,
                right: *right,
                dim,
            }),
            other => Err(NotAnEquation(other)),
        }
    }
}

/// The [`Expression`] passed to [`Equation::try_from()`] wasn't an equality.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected an equation")]
pub struct NotAnEquation(pub Expression);

// define some operator overloads to make constructing an expression easier.

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Plus, self, rhs)
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Minus, self, rhs)
    }
}

impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Times, self, rhs)
    }
}

impl Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Divide, self, rhs)
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output {
        match self {
            Expression::Number { value, dim } => {
                Expression::quantity(-value, dim)
            },
            other => Expression::dimensionless(-1.0) * other,
        }
    }
}
