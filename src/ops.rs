//! [`Expression`] operations.
//!
//! The solver only talks to these through the [`Algebra`] trait. [`Builtins`]
//! implements it on top of the free functions in this module.

use crate::{
    expr::{BinaryOperation, Builtin, NAryOperation},
    Dimension, Equation, Expression, VarId,
};
use std::{collections::BTreeSet, mem};
use thiserror::Error;

/// The order reported for anything which isn't a polynomial in its unknowns
/// (e.g. `1/x` or `sin(x)`).
pub const NON_POLYNOMIAL: usize = usize::MAX;

/// The algebraic operations [`crate::recassign()`] needs.
pub trait Algebra {
    /// Work out the dimension of every node, bottom-up, returning a copy of
    /// the first dimensionally inconsistent subterm.
    fn check_dimensions(&self, equation: &mut Equation) -> Option<Expression>;

    /// Fold constants.
    fn simplify(&self, equation: &mut Equation);

    /// Add every member of `unknowns` referenced by the equation to `found`,
    /// returning how many distinct unknowns the equation references.
    ///
    /// Variables which aren't in `unknowns` are treated as constants.
    fn count_unknowns(
        &self,
        equation: &Equation,
        unknowns: &BTreeSet<VarId>,
        found: &mut BTreeSet<VarId>,
    ) -> usize;

    /// The algebraic order of the equation in `unknowns`, where 1 means
    /// linear and [`NON_POLYNOMIAL`] means it isn't a polynomial at all.
    fn order_in_unknowns(
        &self,
        equation: &Equation,
        unknowns: &BTreeSet<VarId>,
    ) -> usize;

    /// Try to rewrite an equation in one member of `unknowns` as
    /// `variable = value`.
    fn solve_for_unknown(
        &self,
        equation: &mut Equation,
        unknowns: &BTreeSet<VarId>,
    ) -> bool;

    /// Replace the variable assigned by `solved` with its value, returning
    /// whether anything was replaced.
    fn substitute(&self, equation: &mut Equation, solved: &Equation) -> bool;

    /// Do one round of flattening associative operators.
    ///
    /// Every call which returns `true` must make the equation strictly
    /// smaller, otherwise repeatedly flattening would never stop.
    fn flatten(&self, equation: &mut Equation) -> bool;
}

/// The default set of operations, using the builtin functions.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Builtins;

impl Algebra for Builtins {
    fn check_dimensions(&self, equation: &mut Equation) -> Option<Expression> {
        let checked = check_dimensions(&mut equation.left)
            .and_then(|_| check_dimensions(&mut equation.right));

        if let Err(subterm) = checked {
            return Some(subterm);
        }

        equation.dim = equation.left.dim().unify(&equation.right.dim());

        if equation.dim.is_inconsistent() {
            Some(Expression::from(equation.clone()))
        } else {
            None
        }
    }

    fn simplify(&self, equation: &mut Equation) {
        equation.left = fold_constants(&equation.left);
        equation.right = fold_constants(&equation.right);
    }

    fn count_unknowns(
        &self,
        equation: &Equation,
        unknowns: &BTreeSet<VarId>,
        found: &mut BTreeSet<VarId>,
    ) -> usize {
        let mut referenced = BTreeSet::new();
        unknowns_in(&equation.left, unknowns, &mut referenced);
        unknowns_in(&equation.right, unknowns, &mut referenced);

        let count = referenced.len();
        found.extend(referenced);
        count
    }

    fn order_in_unknowns(
        &self,
        equation: &Equation,
        unknowns: &BTreeSet<VarId>,
    ) -> usize {
        order(&equation.left, unknowns).max(order(&equation.right, unknowns))
    }

    fn solve_for_unknown(
        &self,
        equation: &mut Equation,
        unknowns: &BTreeSet<VarId>,
    ) -> bool {
        let mut referenced = BTreeSet::new();
        self.count_unknowns(equation, unknowns, &mut referenced);

        let variable = match referenced.iter().next() {
            Some(&variable) if referenced.len() == 1 => variable,
            _ => return false,
        };

        let (a, b) = match (
            linear_coefficients(&equation.left, variable),
            linear_coefficients(&equation.right, variable),
        ) {
            (Some((la, lb)), Some((ra, rb))) => (la - ra, lb - rb),
            _ => return false,
        };

        if approx::relative_eq!(a, 0.0) {
            return false;
        }

        let value = -b / a;
        if !value.is_finite() {
            return false;
        }
        // avoid printing "-0"
        let value = if value == 0.0 { 0.0 } else { value };

        let dim = variable_dimension(equation, variable);
        equation.left = Expression::variable(variable, dim);
        equation.right = Expression::quantity(value, dim);
        equation.dim = dim;

        true
    }

    fn substitute(&self, equation: &mut Equation, solved: &Equation) -> bool {
        let variable = match solved.left.as_variable() {
            Some(variable) => variable,
            None => return false,
        };

        let left = substitute(&mut equation.left, variable, &solved.right);
        let right = substitute(&mut equation.right, variable, &solved.right);

        left || right
    }

    fn flatten(&self, equation: &mut Equation) -> bool {
        flatten(&mut equation.left) || flatten(&mut equation.right)
    }
}

/// The dimension the equation's references to `variable` were annotated with.
fn variable_dimension(equation: &Equation, variable: VarId) -> Dimension {
    let mut dim = Dimension::Unknown;

    for side in equation.sides().iter() {
        side.walk(&mut |node| {
            if let Expression::Variable { index, dim: d } = node {
                if *index == variable {
                    dim = dim.unify(d);
                }
            }
        });
    }

    if dim.is_inconsistent() {
        Dimension::Unknown
    } else {
        dim
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("no value is known for variable {0}")]
    UnknownValue(VarId),
    #[error("a relation can't be evaluated as a number")]
    Relation,
    #[error("the result is undefined")]
    Undefined,
}

/// Evaluate an expression, looking up the value of each variable.
pub fn evaluate<F>(
    expr: &Expression,
    lookup: &F,
) -> Result<f64, EvaluationError>
where
    F: Fn(VarId) -> Option<f64>,
{
    match expr {
        Expression::Number { value, .. } => Ok(*value),
        Expression::Variable { index, .. } => {
            lookup(*index).ok_or(EvaluationError::UnknownValue(*index))
        },
        Expression::Binary {
            op, left, right, ..
        } => {
            let left = evaluate(left, lookup)?;
            let right = evaluate(right, lookup)?;

            match op {
                BinaryOperation::Equals => Err(EvaluationError::Relation),
                _ => defined(evaluate_binary(*op, left, right)),
            }
        },
        Expression::Function {
            function, argument, ..
        } => defined(function.evaluate(evaluate(argument, lookup)?)),
        Expression::NAry { op, args, .. } => {
            let mut total = op.identity();
            for arg in args {
                total = op.apply(total, evaluate(arg, lookup)?);
            }
            Ok(total)
        },
    }
}

fn defined(value: f64) -> Result<f64, EvaluationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvaluationError::Undefined)
    }
}

/// Annotate every node with its dimension, working from the leaves up.
///
/// The leaves' dimensions are taken as given. The first node whose operands
/// can't be reconciled is marked [`Dimension::Inconsistent`] and a copy of it
/// is returned.
pub fn check_dimensions(expr: &mut Expression) -> Result<(), Expression> {
    let dim = match expr {
        Expression::Number { dim, .. } | Expression::Variable { dim, .. } => {
            *dim
        },
        Expression::Binary {
            op, left, right, ..
        } => {
            check_dimensions(left)?;
            check_dimensions(right)?;
            binary_dimension(*op, left, right)
        },
        Expression::Function {
            function, argument, ..
        } => {
            check_dimensions(argument)?;
            function_dimension(*function, argument.dim())
        },
        Expression::NAry { op, args, .. } => {
            for arg in args.iter_mut() {
                check_dimensions(arg)?;
            }
            n_ary_dimension(*op, args)
        },
    };

    expr.set_dim(dim);

    if dim.is_inconsistent() {
        Err(expr.clone())
    } else {
        Ok(())
    }
}

fn binary_dimension(
    op: BinaryOperation,
    left: &Expression,
    right: &Expression,
) -> Dimension {
    match op {
        BinaryOperation::Equals
        | BinaryOperation::Plus
        | BinaryOperation::Minus => left.dim().unify(&right.dim()),
        BinaryOperation::Times => left.dim() * right.dim(),
        BinaryOperation::Divide => left.dim() / right.dim(),
        BinaryOperation::Power => {
            let exponent = right.dim();
            if !exponent.is_unknown() && !exponent.is_dimensionless() {
                return Dimension::Inconsistent;
            }

            let base = left.dim();
            match right.as_number() {
                Some(power) => base.powf(power),
                None if base.is_dimensionless() => base,
                None => Dimension::Unknown,
            }
        },
    }
}

fn function_dimension(function: Builtin, argument: Dimension) -> Dimension {
    match function {
        Builtin::Sqrt => argument.powf(0.5),
        Builtin::Abs => argument,
        _ if argument.is_unknown() || argument.is_dimensionless() => {
            Dimension::dimensionless()
        },
        _ => Dimension::Inconsistent,
    }
}

fn n_ary_dimension(op: NAryOperation, args: &[Expression]) -> Dimension {
    let dims = args.iter().map(Expression::dim);

    match op {
        NAryOperation::Sum => {
            dims.fold(Dimension::Unknown, |total, dim| total.unify(&dim))
        },
        NAryOperation::Product => {
            dims.fold(Dimension::dimensionless(), |total, dim| total * dim)
        },
    }
}

/// Use the dimension a node was annotated with, or work it out if the
/// dimension check hasn't been run.
fn resolve<F>(annotated: Dimension, computed: F) -> Dimension
where
    F: FnOnce() -> Dimension,
{
    if annotated.is_unknown() {
        computed()
    } else {
        annotated
    }
}

fn is(value: f64, target: f64) -> bool { approx::relative_eq!(value, target) }

/// Simplify an expression by evaluating all constant operations.
pub fn fold_constants(expr: &Expression) -> Expression {
    match expr {
        Expression::Binary {
            op,
            left,
            right,
            dim,
        } => fold_binary_op(*op, left, right, *dim),
        Expression::Function {
            function,
            argument,
            dim,
        } => {
            let argument = fold_constants(argument);

            if let Some(value) = argument.as_number() {
                let result = function.evaluate(value);
                if result.is_finite() {
                    let dim = resolve(*dim, || {
                        function_dimension(*function, argument.dim())
                    });
                    return Expression::quantity(result, dim);
                }
            }

            Expression::Function {
                function: *function,
                argument: Box::new(argument),
                dim: *dim,
            }
        },
        Expression::NAry { op, args, dim } => fold_n_ary_op(*op, args, *dim),
        _ => expr.clone(),
    }
}

fn fold_binary_op(
    op: BinaryOperation,
    left: &Expression,
    right: &Expression,
    dim: Dimension,
) -> Expression {
    let left = fold_constants(left);
    let right = fold_constants(right);
    let dim = resolve(dim, || binary_dimension(op, &left, &right));

    // If our operands contain constants, we can use arithmetic's identity laws
    // to simplify things
    match (left, right, op) {
        (
            Expression::Variable { index: l, .. },
            Expression::Variable { index: r, .. },
            BinaryOperation::Minus,
        ) if l == r => Expression::quantity(0.0, dim),
        (
            Expression::Variable { index: l, .. },
            Expression::Variable { index: r, .. },
            BinaryOperation::Divide,
        ) if l == r => Expression::dimensionless(1.0),

        // Evaluate in-place
        (
            Expression::Number { value: l, .. },
            Expression::Number { value: r, .. },
            op,
        ) if op != BinaryOperation::Equals
            && evaluate_binary(op, l, r).is_finite() =>
        {
            Expression::quantity(evaluate_binary(op, l, r), dim)
        },

        // x + 0 = x
        (Expression::Number { value: l, .. }, right, BinaryOperation::Plus)
            if is(l, 0.0) =>
        {
            right
        },
        (left, Expression::Number { value: r, .. }, BinaryOperation::Plus)
            if is(r, 0.0) =>
        {
            left
        },

        // x - 0 = x
        (left, Expression::Number { value: r, .. }, BinaryOperation::Minus)
            if is(r, 0.0) =>
        {
            left
        },

        // 0 - x = -x
        (Expression::Number { value: l, .. }, right, BinaryOperation::Minus)
            if is(l, 0.0) =>
        {
            let mut negated = -right;
            negated.set_dim(dim);
            negated
        },

        // 0 * x = 0
        (Expression::Number { value: l, .. }, _, BinaryOperation::Times)
            if is(l, 0.0) =>
        {
            Expression::quantity(0.0, dim)
        },
        (_, Expression::Number { value: r, .. }, BinaryOperation::Times)
            if is(r, 0.0) =>
        {
            Expression::quantity(0.0, dim)
        },

        // 1 * x = x
        (Expression::Number { value: l, .. }, right, BinaryOperation::Times)
            if is(l, 1.0) =>
        {
            right
        },
        (left, Expression::Number { value: r, .. }, BinaryOperation::Times)
            if is(r, 1.0) =>
        {
            left
        },

        // 0 / x = 0
        (Expression::Number { value: l, .. }, _, BinaryOperation::Divide)
            if is(l, 0.0) =>
        {
            Expression::quantity(0.0, dim)
        },

        // x / 1 = x
        (left, Expression::Number { value: r, .. }, BinaryOperation::Divide)
            if is(r, 1.0) =>
        {
            left
        },

        // x^1 = x
        (left, Expression::Number { value: r, .. }, BinaryOperation::Power)
            if is(r, 1.0) =>
        {
            left
        },
        // x^0 = 1
        (_, Expression::Number { value: r, .. }, BinaryOperation::Power)
            if is(r, 0.0) =>
        {
            Expression::dimensionless(1.0)
        },

        // Oh well, we tried
        (left, right, op) => Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            dim,
        },
    }
}

fn evaluate_binary(op: BinaryOperation, left: f64, right: f64) -> f64 {
    match op {
        BinaryOperation::Plus => left + right,
        BinaryOperation::Minus => left - right,
        BinaryOperation::Times => left * right,
        BinaryOperation::Divide => left / right,
        BinaryOperation::Power => left.powf(right),
        BinaryOperation::Equals => f64::NAN,
    }
}

fn fold_n_ary_op(
    op: NAryOperation,
    args: &[Expression],
    dim: Dimension,
) -> Expression {
    let mut folded = Vec::with_capacity(args.len());
    // the combined constant term and where it goes
    let mut constant: Option<(usize, f64, Dimension)> = None;

    for arg in args {
        match fold_constants(arg) {
            Expression::Number { value, dim: d } => {
                constant = Some(match constant {
                    Some((position, total, total_dim)) => {
                        let total_dim = match op {
                            NAryOperation::Sum => total_dim.unify(&d),
                            NAryOperation::Product => total_dim * d,
                        };
                        (position, op.apply(total, value), total_dim)
                    },
                    None => (folded.len(), value, d),
                });
            },
            other => folded.push(other),
        }
    }

    let dim = resolve(dim, || n_ary_dimension(op, &folded));

    if let Some((position, value, constant_dim)) = constant {
        if op == NAryOperation::Product && is(value, 0.0) {
            return Expression::quantity(0.0, dim);
        }

        if folded.is_empty() || !is(value, op.identity()) {
            folded.insert(position, Expression::quantity(value, constant_dim));
        }
    }

    match folded.len() {
        0 => Expression::quantity(op.identity(), dim),
        1 => folded.remove(0),
        _ => Expression::NAry {
            op,
            args: folded,
            dim,
        },
    }
}

/// Collect every member of `unknowns` referenced by an expression.
pub fn unknowns_in(
    expr: &Expression,
    unknowns: &BTreeSet<VarId>,
    found: &mut BTreeSet<VarId>,
) {
    found.extend(expr.variables().filter(|v| unknowns.contains(v)));
}

/// The order of an expression as a polynomial in `unknowns`. Any other
/// variable counts as a constant.
pub fn order(expr: &Expression, unknowns: &BTreeSet<VarId>) -> usize {
    match expr {
        Expression::Number { .. } => 0,
        Expression::Variable { index, .. } => {
            if unknowns.contains(index) {
                1
            } else {
                0
            }
        },
        Expression::Binary {
            op, left, right, ..
        } => {
            let l = order(left, unknowns);
            let r = order(right, unknowns);

            match op {
                BinaryOperation::Equals
                | BinaryOperation::Plus
                | BinaryOperation::Minus => l.max(r),
                BinaryOperation::Times => l.saturating_add(r),
                BinaryOperation::Divide if r == 0 => l,
                BinaryOperation::Divide => NON_POLYNOMIAL,
                BinaryOperation::Power if r != 0 => NON_POLYNOMIAL,
                BinaryOperation::Power if l == 0 => 0,
                BinaryOperation::Power => match right.as_number() {
                    Some(n) if n >= 0.0 && n.fract() == 0.0 => {
                        l.saturating_mul(n as usize)
                    },
                    _ => NON_POLYNOMIAL,
                },
            }
        },
        Expression::Function { argument, .. } => {
            if order(argument, unknowns) == 0 {
                0
            } else {
                NON_POLYNOMIAL
            }
        },
        Expression::NAry { op, args, .. } => {
            let orders = args.iter().map(|arg| order(arg, unknowns));

            match op {
                NAryOperation::Sum => orders.max().unwrap_or(0),
                NAryOperation::Product => orders.fold(0, usize::saturating_add),
            }
        },
    }
}

/// Split an expression which is linear in `variable` into `(a, b)` such that
/// it equals `a*variable + b`.
///
/// Returns `None` when the expression isn't linear in `variable` or it
/// depends on some other variable.
pub fn linear_coefficients(
    expr: &Expression,
    variable: VarId,
) -> Option<(f64, f64)> {
    if !expr.references(variable) {
        return evaluate(expr, &|_| None).ok().map(|b| (0.0, b));
    }

    match expr {
        Expression::Number { value, .. } => Some((0.0, *value)),
        Expression::Variable { .. } => Some((1.0, 0.0)),
        Expression::Binary {
            op, left, right, ..
        } => {
            let (la, lb) = linear_coefficients(left, variable)?;
            let (ra, rb) = linear_coefficients(right, variable)?;

            match op {
                BinaryOperation::Plus => Some((la + ra, lb + rb)),
                BinaryOperation::Minus | BinaryOperation::Equals => {
                    Some((la - ra, lb - rb))
                },
                BinaryOperation::Times if !left.references(variable) => {
                    Some((lb * ra, lb * rb))
                },
                BinaryOperation::Times if !right.references(variable) => {
                    Some((la * rb, lb * rb))
                },
                BinaryOperation::Times => None,
                BinaryOperation::Divide if !right.references(variable) => {
                    Some((la / rb, lb / rb))
                },
                BinaryOperation::Divide => None,
                BinaryOperation::Power if right.references(variable) => None,
                BinaryOperation::Power if is(rb, 1.0) => Some((la, lb)),
                BinaryOperation::Power if is(rb, 0.0) => Some((0.0, 1.0)),
                BinaryOperation::Power => None,
            }
        },
        Expression::Function { .. } => None,
        Expression::NAry {
            op: NAryOperation::Sum,
            args,
            ..
        } => {
            let mut total = (0.0, 0.0);
            for arg in args {
                let (a, b) = linear_coefficients(arg, variable)?;
                total = (total.0 + a, total.1 + b);
            }
            Some(total)
        },
        Expression::NAry {
            op: NAryOperation::Product,
            args,
            ..
        } => {
            let mut scale = 1.0;
            let mut linear = None;

            for arg in args {
                if arg.references(variable) {
                    if linear.is_some() {
                        return None;
                    }
                    linear = Some(linear_coefficients(arg, variable)?);
                } else {
                    scale *= evaluate(arg, &|_| None).ok()?;
                }
            }

            linear.map(|(a, b)| (a * scale, b * scale))
        },
    }
}

/// Replace all references to a variable with an [`Expression`], returning
/// whether anything was replaced.
pub fn substitute(
    expression: &mut Expression,
    variable: VarId,
    value: &Expression,
) -> bool {
    if expression.as_variable() == Some(variable) {
        *expression = value.clone();
        return true;
    }

    match expression {
        Expression::Number { .. } | Expression::Variable { .. } => false,
        Expression::Binary { left, right, .. } => {
            let left = substitute(left, variable, value);
            let right = substitute(right, variable, value);
            left || right
        },
        Expression::Function { argument, .. } => {
            substitute(argument, variable, value)
        },
        Expression::NAry { args, .. } => {
            let mut changed = false;
            for arg in args.iter_mut() {
                changed |= substitute(arg, variable, value);
            }
            changed
        },
    }
}

/// Apply one flattening rewrite somewhere in the tree, returning whether
/// anything changed.
///
/// Each rewrite removes at least one node, so calling this in a loop until it
/// returns `false` always terminates.
pub fn flatten(expr: &mut Expression) -> bool {
    if flatten_node(expr) {
        return true;
    }

    match expr {
        Expression::Number { .. } | Expression::Variable { .. } => false,
        Expression::Binary { left, right, .. } => {
            flatten(left) || flatten(right)
        },
        Expression::Function { argument, .. } => flatten(argument),
        Expression::NAry { args, .. } => args.iter_mut().any(flatten),
    }
}

fn flatten_node(expr: &mut Expression) -> bool {
    match expr {
        Expression::NAry { args, .. } if args.len() == 1 => {
            if let Some(only) = args.pop() {
                *expr = only;
            }
            true
        },
        Expression::NAry { op, args, .. } => {
            let op = *op;
            if !args.iter().any(|arg| is_n_ary(arg, op)) {
                return false;
            }

            for arg in mem::take(args) {
                absorb(args, arg, op);
            }
            true
        },
        Expression::Binary {
            op, left, right, dim,
        } => {
            let n_ary_op = match NAryOperation::from_binary(*op) {
                Some(n_ary_op) => n_ary_op,
                None => return false,
            };
            if !is_n_ary(left, n_ary_op) && !is_n_ary(right, n_ary_op) {
                return false;
            }

            let dim = *dim;
            let left = mem::replace(&mut **left, Expression::number(0.0));
            let right = mem::replace(&mut **right, Expression::number(0.0));

            let mut args = Vec::new();
            absorb(&mut args, left, n_ary_op);
            absorb(&mut args, right, n_ary_op);

            *expr = Expression::NAry {
                op: n_ary_op,
                args,
                dim,
            };
            true
        },
        Expression::Number { .. }
        | Expression::Variable { .. }
        | Expression::Function { .. } => false,
    }
}

fn is_n_ary(expr: &Expression, op: NAryOperation) -> bool {
    match expr {
        Expression::NAry { op: inner, .. } => *inner == op,
        _ => false,
    }
}

/// Add `arg` to a list of n-ary arguments, splicing in its own arguments if it
/// uses the same operator.
fn absorb(args: &mut Vec<Expression>, arg: Expression, op: NAryOperation) {
    match arg {
        Expression::NAry {
            op: inner,
            args: nested,
            ..
        } if inner == op => args.extend(nested),
        other => args.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        parse::{parse, parse_equation},
        print::infix,
        Variable, VariableTable,
    };

    fn fold(src: &str) -> String {
        let mut table = VariableTable::new();
        let expr = parse(src, &mut table).unwrap();
        infix(&fold_constants(&expr), &table).unwrap()
    }

    #[test]
    fn constant_fold_simple_arithmetic() {
        let inputs = vec![
            ("1", 1.0),
            ("1 + 1.5", 1.0 + 1.5),
            ("1 - 1.5", 1.0 - 1.5),
            ("2 * 3", 2.0 * 3.0),
            ("4 / 2", 4.0 / 2.0),
            ("2^10", 1024.0),
            ("sqrt(4)", 4_f64.sqrt()),
            ("sqrt(2 + 2)", (2_f64 + 2.0).sqrt()),
            ("sin(0)", 0.0),
            ("sqrt(2 + sqrt(4))", (2.0 + 4_f64.sqrt()).sqrt()),
            ("-(1 + 2)", -(1.0 + 2.0)),
            ("0 * x", 0.0),
            ("x - x", 0.0),
            ("x/x", 1.0),
        ];
        let mut table = VariableTable::new();

        for (src, should_be) in inputs {
            let expr = parse(src, &mut table).unwrap();
            let got = fold_constants(&expr);

            match got.as_number() {
                Some(value) => assert_eq!(value, should_be, "{}", src),
                None => panic!(
                    "Expected a constant expression, but got \"{}\"",
                    infix(&got, &table).unwrap()
                ),
            }
        }
    }

    #[test]
    fn constant_folding_leaves_unknowns_unevaluated() {
        let inputs = vec![
            ("x", "x"),
            ("x + 5", "(x + 5)"),
            ("x + 5*2", "(x + 10)"),
            ("0 + x", "x"),
            ("x + 0", "x"),
            ("1 * x", "x"),
            ("x * 1", "x"),
            ("x - 0", "x"),
            ("0 - x", "(-1 * x)"),
            ("x / 1", "x"),
            ("x^1", "x"),
            ("x^0", "1"),
            ("y - (3 + 2)", "(y - 5)"),
            ("1/0 + x", "((1 / 0) + x)"),
        ];

        for (src, should_be) in inputs {
            assert_eq!(fold(src), should_be, "{}", src);
        }
    }

    #[test]
    fn fold_n_ary_constants_together() {
        let mut table = VariableTable::new();
        let x = Expression::variable(table.intern("x"), Dimension::Unknown);
        let inputs = vec![
            (
                Expression::sum(vec![
                    Expression::number(1.0),
                    x.clone(),
                    Expression::number(2.0),
                ]),
                "(3 + x)",
            ),
            (
                Expression::product(vec![
                    x.clone(),
                    Expression::number(2.0),
                    Expression::number(0.5),
                ]),
                "x",
            ),
            (
                Expression::product(vec![x.clone(), Expression::number(0.0)]),
                "0",
            ),
            (Expression::sum(Vec::new()), "0"),
        ];

        for (expr, should_be) in inputs {
            let got = fold_constants(&expr);
            assert_eq!(infix(&got, &table).unwrap(), should_be);
        }
    }

    #[test]
    fn basic_substitutions() {
        let inputs = vec![
            ("1 + 2", "3", "(1 + 2)", false),
            ("x", "5", "5", true),
            ("y", "5", "y", false),
            ("x + 5", "5", "(5 + 5)", true),
            ("sin(x)", "y + y", "(sin ((y + y)))", true),
        ];

        for (src, new_value, should_be, changed) in inputs {
            let mut table = VariableTable::new();
            let x = table.intern("x");
            let mut original = parse(src, &mut table).unwrap();
            let new_value = parse(new_value, &mut table).unwrap();

            let got = substitute(&mut original, x, &new_value);

            assert_eq!(got, changed, "{}", src);
            assert_eq!(infix(&original, &table).unwrap(), should_be);
        }
    }

    #[test]
    fn order_of_common_expressions() {
        let inputs = vec![
            ("3", 0),
            ("x", 1),
            ("2*x + y", 1),
            ("x*y", 2),
            ("x^2 + 1", 2),
            ("x/2", 1),
            ("2/x", NON_POLYNOMIAL),
            ("sin(x)", NON_POLYNOMIAL),
            ("sin(3)*x", 1),
            ("x^y", NON_POLYNOMIAL),
        ];
        let mut table = VariableTable::new();
        let parsed: Vec<_> = inputs
            .iter()
            .map(|(src, _)| parse(src, &mut table).unwrap())
            .collect();
        let unknowns: BTreeSet<_> = table.ids().collect();

        for ((src, should_be), expr) in inputs.into_iter().zip(parsed) {
            assert_eq!(order(&expr, &unknowns), should_be, "{}", src);
        }
    }

    #[test]
    fn variables_outside_the_unknowns_are_constants() {
        let inputs = vec![
            ("x*y", 1),
            ("y^2 + x", 1),
            ("y*y", 0),
            ("sin(y)*x", 1),
            ("x/y", 1),
            ("y/x", NON_POLYNOMIAL),
        ];
        let mut table = VariableTable::new();
        let x = table.intern("x");
        let unknowns: BTreeSet<_> = vec![x].into_iter().collect();

        for (src, should_be) in inputs {
            let expr = parse(src, &mut table).unwrap();
            assert_eq!(order(&expr, &unknowns), should_be, "{}", src);
        }

        let equation = parse_equation("x - y = y*y", &mut table).unwrap();
        let mut found = BTreeSet::new();
        let got = Builtins.count_unknowns(&equation, &unknowns, &mut found);

        assert_eq!(got, 1);
        assert_eq!(found, unknowns);
    }

    #[test]
    fn known_variables_without_a_value_block_the_solve() {
        let mut table = VariableTable::new();
        let x = table.intern("x");
        let unknowns: BTreeSet<_> = vec![x].into_iter().collect();
        let mut equation = parse_equation("x - y = 0", &mut table).unwrap();
        let original = equation.clone();

        assert!(!Builtins.solve_for_unknown(&mut equation, &unknowns));
        assert_eq!(equation, original);
    }

    #[test]
    fn split_linear_expressions() {
        let inputs = vec![
            ("x", Some((1.0, 0.0))),
            ("2*x - 7", Some((2.0, -7.0))),
            ("(x + 1)/4", Some((0.25, 0.25))),
            ("3 - x", Some((-1.0, 3.0))),
            ("x*x", None),
            ("x + y", None),
            ("sqrt(x)", None),
        ];
        let mut table = VariableTable::new();
        let x = table.intern("x");

        for (src, should_be) in inputs {
            let expr = parse(src, &mut table).unwrap();
            assert_eq!(linear_coefficients(&expr, x), should_be, "{}", src);
        }
    }

    #[test]
    fn solve_a_linear_equation() {
        let mut table = VariableTable::new()
            .with(Variable::named("v").with_dimension(Dimension::length()));
        let mut equation = parse_equation("2*v + 1 = 9", &mut table).unwrap();
        let unknowns = table.ids().collect();

        assert!(Builtins.solve_for_unknown(&mut equation, &unknowns));

        let got = infix(&Expression::from(equation), &table).unwrap();
        assert_eq!(got, "(v = (4 m))");
    }

    #[test]
    fn decline_equations_without_a_unique_solution() {
        let inputs = vec!["2*x - 2*x = 3", "x + y = 2", "x*x = 4", "5 = 5"];
        let mut table = VariableTable::new();
        let equations: Vec<_> = inputs
            .iter()
            .map(|src| parse_equation(src, &mut table).unwrap())
            .collect();
        let unknowns = table.ids().collect();

        for (src, mut equation) in inputs.into_iter().zip(equations) {
            let original = equation.clone();

            assert!(
                !Builtins.solve_for_unknown(&mut equation, &unknowns),
                "{}",
                src
            );
            assert_eq!(equation, original);
        }
    }

    #[test]
    fn detect_inconsistent_dimensions() {
        let mut table = VariableTable::new()
            .with(Variable::named("x").with_dimension(Dimension::length()))
            .with(Variable::named("t").with_dimension(Dimension::time()));
        let mut expr = parse("2 * (x + t) + 1", &mut table).unwrap();

        let offending = check_dimensions(&mut expr).unwrap_err();

        assert_eq!(infix(&offending, &table).unwrap(), "(x + t)");
        assert!(offending.dim().is_inconsistent());
    }

    #[test]
    fn propagate_dimensions_upwards() {
        let mut table = VariableTable::new()
            .with(Variable::named("x").with_dimension(Dimension::length()))
            .with(Variable::named("t").with_dimension(Dimension::time()));
        let mut equation = parse_equation("v = x / t + 3", &mut table).unwrap();

        assert_eq!(Builtins.check_dimensions(&mut equation), None);

        let velocity = Dimension::length() / Dimension::time();
        assert_eq!(equation.right.dim(), velocity);
        assert_eq!(equation.dim, velocity);
        assert!(equation.left.dim().is_unknown());
    }

    #[test]
    fn function_arguments_must_be_dimensionless() {
        let mut table = VariableTable::new()
            .with(Variable::named("x").with_dimension(Dimension::length()));
        let mut bad = parse("sin(x)", &mut table).unwrap();
        let mut good = parse("sqrt(x*x)", &mut table).unwrap();

        assert!(check_dimensions(&mut bad).is_err());
        assert!(check_dimensions(&mut good).is_ok());
        assert_eq!(good.dim(), Dimension::length());
    }

    #[test]
    fn flatten_nested_sums() {
        let mut table = VariableTable::new();
        let mut var = |name: &str| {
            Expression::variable(table.intern(name), Dimension::Unknown)
        };
        let (a, b, c, d) = (var("a"), var("b"), var("c"), var("d"));
        let mut expr = Expression::sum(vec![
            a,
            Expression::sum(vec![b, Expression::product(vec![c])]),
        ]) + d;

        let mut rounds = 0;
        while flatten(&mut expr) {
            rounds += 1;
            assert!(rounds < 10, "flattening should terminate");
        }

        assert_eq!(infix(&expr, &table).unwrap(), "(a + b + c + d)");
    }

    #[test]
    fn flattening_only_merges_the_same_operator() {
        let mut table = VariableTable::new();
        let mut expr = parse("a * (b + c)", &mut table).unwrap();

        assert!(!flatten(&mut expr));
    }

    #[test]
    fn evaluate_with_known_values() {
        let mut table = VariableTable::new();
        let expr = parse("x^2 + 2*y", &mut table).unwrap();
        let x = table.intern("x");

        let got = evaluate(&expr, &|v| if v == x { Some(3.0) } else { None });
        assert_eq!(got, Err(EvaluationError::UnknownValue(table.intern("y"))));

        let got = evaluate(&expr, &|_| Some(1.5)).unwrap();
        assert_eq!(got, 1.5_f64.powf(2.0) + 2.0 * 1.5);

        let got = evaluate(&expr, &|_| Some(-1.0)).unwrap();
        assert_eq!(got, -1.0);

        let undefined = parse("sqrt(x)", &mut table).unwrap();
        assert_eq!(
            evaluate(&undefined, &|_| Some(-1.0)),
            Err(EvaluationError::Undefined)
        );
    }
}
