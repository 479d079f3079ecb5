//! Text renderings of an [`Expression`].
//!
//! Variable names are resolved through the [`VariableTable`], so every
//! renderer fails with a [`LookupError`] when it finds a dangling index.

use crate::{Expression, LookupError, VarId, VariableTable};

/// Render an expression as fully parenthesised infix, e.g.
/// `((v - (a * t)) = (0 m/s))`.
///
/// Numbers with a known dimension are written alongside their units.
pub fn infix(
    expr: &Expression,
    variables: &VariableTable,
) -> Result<String, LookupError> {
    match expr {
        Expression::Number { value, dim } => {
            let number = format_number(*value);
            if dim.is_known() && !dim.is_dimensionless() {
                Ok(format!("({} {})", number, dim.unit_string()))
            } else {
                Ok(number)
            }
        },
        Expression::Variable { index, .. } => name(*index, variables),
        Expression::Binary {
            op, left, right, ..
        } => Ok(format!(
            "({} {} {})",
            infix(left, variables)?,
            op.symbol(),
            infix(right, variables)?
        )),
        Expression::Function {
            function, argument, ..
        } => Ok(format!("({} ({}))", function, infix(argument, variables)?)),
        Expression::NAry { op, args, .. } => {
            if args.is_empty() {
                return Ok(format!("({})", op.symbol()));
            }

            let args = args
                .iter()
                .map(|arg| infix(arg, variables))
                .collect::<Result<Vec<_>, _>>()?;
            let separator = format!(" {} ", op.symbol());

            Ok(format!("({})", args.join(&separator)))
        },
    }
}

/// Render an expression in prefix form, e.g. `(= x (DNUM 3 m))`.
///
/// When `quote` is set, variable names and units are wrapped in bars
/// (`|x|`) so they can be read back as symbols.
pub fn lisp(
    expr: &Expression,
    variables: &VariableTable,
    quote: bool,
) -> Result<String, LookupError> {
    match expr {
        Expression::Number { value, dim } => {
            let number = format_number(*value);
            if dim.is_known() && !dim.is_dimensionless() {
                let units = bars(&dim.unit_string(), quote);
                Ok(format!("(DNUM {} {})", number, units))
            } else {
                Ok(number)
            }
        },
        Expression::Variable { index, .. } => {
            Ok(bars(&name(*index, variables)?, quote))
        },
        Expression::Binary {
            op, left, right, ..
        } => Ok(format!(
            "({} {} {})",
            op.symbol(),
            lisp(left, variables, quote)?,
            lisp(right, variables, quote)?
        )),
        Expression::Function {
            function, argument, ..
        } => {
            let argument = lisp(argument, variables, quote)?;
            Ok(format!("({} {})", function, argument))
        },
        Expression::NAry { op, args, .. } => {
            let mut rendered = format!("({}", op.symbol());
            for arg in args {
                rendered.push(' ');
                rendered.push_str(&lisp(arg, variables, quote)?);
            }
            rendered.push(')');

            Ok(rendered)
        },
    }
}

fn bars(text: &str, quote: bool) -> String {
    if quote {
        format!("|{}|", text)
    } else {
        text.to_string()
    }
}

/// How much detail [`tree()`] should include.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TreeStyle {
    /// Just the operators and leaves.
    Plain,
    /// Name the kind of each node and write out its dimension.
    Annotated,
}

/// Dump the structure of an expression, one node per line with children
/// indented by two spaces.
pub fn tree(
    expr: &Expression,
    variables: &VariableTable,
    style: TreeStyle,
) -> Result<String, LookupError> {
    let mut buffer = String::new();
    write_tree(&mut buffer, expr, variables, style, 0)?;
    Ok(buffer)
}

fn write_tree(
    buffer: &mut String,
    expr: &Expression,
    variables: &VariableTable,
    style: TreeStyle,
    indent: usize,
) -> Result<(), LookupError> {
    let (kind, label) = match expr {
        Expression::Number { value, .. } => {
            ("numval:  ", format_number(*value))
        },
        Expression::Variable { index, .. } => {
            ("physvar: ", name(*index, variables)?)
        },
        Expression::Binary { op, .. } => ("binop   ", op.symbol().to_string()),
        Expression::Function { function, .. } => {
            ("funct:  ", function.to_string())
        },
        Expression::NAry { op, .. } => ("n_op:   ", op.symbol().to_string()),
    };

    buffer.push_str(&" ".repeat(indent));
    match style {
        TreeStyle::Plain => buffer.push_str(&label),
        TreeStyle::Annotated => {
            buffer.push_str(kind);
            buffer.push_str(&label);
            buffer.push('\t');
            buffer.push_str(&expr.dim().to_string());
        },
    }
    buffer.push('\n');

    for child in expr.children() {
        write_tree(buffer, child, variables, style, indent + 2)?;
    }

    Ok(())
}

fn name(
    index: VarId,
    variables: &VariableTable,
) -> Result<String, LookupError> {
    variables.name(index).map(String::from)
}

/// Format a number the way it should appear in rendered expressions.
///
/// Anything which looks like an integer is printed as one, except for tiny
/// non-zero values which would otherwise be truncated to `0`.
pub fn format_number(value: f64) -> String {
    match as_integer(value) {
        Some(integer) if value == 0.0 || value.abs() > 0.5 => {
            integer.to_string()
        },
        _ => format!("{:?}", value),
    }
}

/// Get the integer `value` is (approximately) equal to, if there is one.
pub(crate) fn as_integer(value: f64) -> Option<i64> {
    let rounded = value.round();

    if rounded.abs() < i64::MAX as f64 && approx::relative_eq!(value, rounded)
    {
        Some(rounded as i64)
    } else {
        None
    }
}
