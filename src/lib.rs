//! Solving systems of dimensioned physics equations by recursive assignment.
//!
//! Every equation with exactly one unknown (appearing linearly) is solved and
//! the result substituted into the rest of the system, over and over, until
//! nothing more can be done. See [`recassign()`].

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod dimension;
mod expr;
pub mod ops;
pub mod parse;
pub mod print;
pub mod report;
mod solve;
mod variables;

pub use dimension::{Dimension, Exponents};
pub use expr::{
    BinaryOperation, Builtin, Equation, Expression, NAryOperation,
    NotAnEquation,
};
pub use ops::{Algebra, Builtins};
pub use parse::{parse, parse_equation, ParseError};
pub use report::{solution_statement, StatementStyle};
pub use solve::{recassign, recassign_with, SolveError, SolveOptions};
pub use variables::{
    LookupError, RecordError, SolvedValues, VarId, Variable, VariableTable,
};
