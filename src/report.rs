//! Reporting solved values back to whoever asked for them.

use crate::{
    expr::BinaryOperation, print, Dimension, Expression, LookupError,
    RecordError, SolvedValues, VariableTable,
};
use smol_str::SmolStr;
use thiserror::Error;

/// Something which knows how big a unit is.
pub trait UnitLookup {
    /// The size of one `unit` in SI units, and its dimension.
    fn lookup(&self, unit: &str) -> Option<(f64, Dimension)>;
}

/// A handful of common SI (and SI-derived) units.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct SiUnits;

impl UnitLookup for SiUnits {
    fn lookup(&self, unit: &str) -> Option<(f64, Dimension)> {
        let length = Dimension::length();
        let mass = Dimension::mass();
        let time = Dimension::time();
        let force = mass * length / (time * time);

        let found = match unit {
            "m" => (1.0, length),
            "cm" => (0.01, length),
            "mm" => (0.001, length),
            "km" => (1000.0, length),
            "kg" => (1.0, mass),
            "g" => (0.001, mass),
            "s" => (1.0, time),
            "min" => (60.0, time),
            "h" => (3600.0, time),
            "C" => (1.0, Dimension::charge()),
            "K" => (1.0, Dimension::temperature()),
            "Hz" => (1.0, time.powf(-1.0)),
            "m/s" => (1.0, length / time),
            "km/h" => (1000.0 / 3600.0, length / time),
            "N" => (1.0, force),
            "J" => (1.0, force * length),
            "W" => (1.0, force * length / time),
            "Pa" => (1.0, force / (length * length)),
            _ => return None,
        };

        Some(found)
    }
}

/// Who a [`solution_statement()`] is for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatementStyle {
    /// `(SVAR name value units)`
    Solution,
    /// `(= |name| (DNUM value |units|))`
    Help,
}

/// Write out a solved equation of the form `x = number`, recording its SI
/// value in `values`.
///
/// If the variable has a preferred unit the value is converted to it,
/// otherwise it is written in SI units.
pub fn solution_statement<U>(
    solution: &Expression,
    variables: &VariableTable,
    values: &mut SolvedValues,
    units: &U,
    style: StatementStyle,
) -> Result<String, ReportError>
where
    U: UnitLookup + ?Sized,
{
    let (left, right) = match solution {
        Expression::Binary {
            op: BinaryOperation::Equals,
            left,
            right,
            ..
        } => (left, right),
        _ => return Err(ReportError::NotAnEquation),
    };

    let index = left.as_variable().ok_or(ReportError::LeftNotVariable)?;
    let (value, dim) = match **right {
        Expression::Number { value, dim } => (value, dim),
        _ => return Err(ReportError::RightNotValue),
    };
    let variable = variables.get(index)?;

    values.record(index, value)?;

    let (value, unit) = match &variable.preferred_unit {
        Some(unit) => {
            let (factor, unit_dim) = units.lookup(unit).ok_or_else(|| {
                ReportError::UnknownUnit { unit: unit.clone() }
            })?;

            if unit_dim != dim {
                return Err(ReportError::InconsistentPreferredUnit {
                    variable: variable.name.clone(),
                    unit: unit.clone(),
                    rendered: print::infix(solution, variables)?,
                });
            }

            (value / factor, unit.to_string())
        },
        None => (value, dim.unit_string()),
    };

    let number = print::format_number(value);

    match style {
        StatementStyle::Solution => {
            Ok(format!("(SVAR {} {} {})", variable.name, number, unit))
        },
        StatementStyle::Help => Ok(format!(
            "(= |{}| (DNUM {} |{}|))",
            variable.name, number, unit
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("tried to write a solution that isn't an equation")]
    NotAnEquation,
    #[error("tried to write a solution whose left side isn't a variable")]
    LeftNotVariable,
    #[error("tried to write a solution whose right side isn't a value")]
    RightNotValue,
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("\"{unit}\" isn't a known unit")]
    UnknownUnit { unit: SmolStr },
    #[error("{rendered} is inconsistent with {unit}, the preferred unit for {variable}")]
    InconsistentPreferredUnit {
        variable: SmolStr,
        unit: SmolStr,
        rendered: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Equation, VarId, Variable};

    fn table() -> VariableTable {
        VariableTable::new()
            .with(Variable::named("x").with_dimension(Dimension::length()))
            .with(
                Variable::named("d")
                    .with_dimension(Dimension::length())
                    .with_preferred_unit("cm"),
            )
            .with(Variable::named("n"))
    }

    fn assignment(index: usize, value: f64, dim: Dimension) -> Expression {
        Expression::from(Equation::new(
            Expression::variable(VarId(index), dim),
            Expression::quantity(value, dim),
        ))
    }

    #[test]
    fn write_solutions_in_si_units() {
        let table = table();
        let mut values = SolvedValues::for_table(&table);
        let solution = assignment(0, 3.0, Dimension::length());

        let got = solution_statement(
            &solution,
            &table,
            &mut values,
            &SiUnits,
            StatementStyle::Solution,
        )
        .unwrap();

        assert_eq!(got, "(SVAR x 3 m)");
        assert_eq!(values.get(VarId(0)), Some(3.0));
    }

    #[test]
    fn help_statements_quote_names_and_units() {
        let table = table();
        let mut values = SolvedValues::for_table(&table);
        let solution = assignment(0, 2.5, Dimension::length());

        let got = solution_statement(
            &solution,
            &table,
            &mut values,
            &SiUnits,
            StatementStyle::Help,
        )
        .unwrap();

        assert_eq!(got, "(= |x| (DNUM 2.5 |m|))");
    }

    #[test]
    fn convert_to_the_preferred_unit() {
        let table = table();
        let mut values = SolvedValues::for_table(&table);
        let solution = assignment(1, 0.5, Dimension::length());

        let got = solution_statement(
            &solution,
            &table,
            &mut values,
            &SiUnits,
            StatementStyle::Solution,
        )
        .unwrap();

        assert_eq!(got, "(SVAR d 50 cm)");
        // the table always holds SI values
        assert_eq!(values.get(VarId(1)), Some(0.5));
    }

    #[test]
    fn preferred_unit_must_match_the_dimension() {
        let table = table();
        let mut values = SolvedValues::for_table(&table);
        let solution = assignment(1, 4.0, Dimension::time());

        let got = solution_statement(
            &solution,
            &table,
            &mut values,
            &SiUnits,
            StatementStyle::Solution,
        )
        .unwrap_err();

        assert_eq!(
            got,
            ReportError::InconsistentPreferredUnit {
                variable: SmolStr::from("d"),
                unit: SmolStr::from("cm"),
                rendered: String::from("(d = (4 s))"),
            }
        );
    }

    #[test]
    fn unknown_preferred_units() {
        let table = VariableTable::new()
            .with(Variable::named("x").with_preferred_unit("furlong"));
        let mut values = SolvedValues::for_table(&table);
        let solution = assignment(0, 4.0, Dimension::length());

        let got = solution_statement(
            &solution,
            &table,
            &mut values,
            &SiUnits,
            StatementStyle::Solution,
        )
        .unwrap_err();

        assert_eq!(
            got,
            ReportError::UnknownUnit {
                unit: SmolStr::from("furlong")
            }
        );
    }

    #[test]
    fn only_assignments_can_be_reported() {
        let table = table();
        let mut values = SolvedValues::for_table(&table);
        let x = Expression::variable(VarId(0), Dimension::length());
        let three = Expression::number(3.0);
        let inputs = vec![
            (x.clone() + three.clone(), ReportError::NotAnEquation),
            (
                Equation::new(three.clone(), x.clone()).into(),
                ReportError::LeftNotVariable,
            ),
            (
                Equation::new(x.clone(), three + x).into(),
                ReportError::RightNotValue,
            ),
        ];

        for (solution, should_be) in inputs {
            let got = solution_statement(
                &solution,
                &table,
                &mut values,
                &SiUnits,
                StatementStyle::Solution,
            )
            .unwrap_err();

            assert_eq!(got, should_be);
        }
    }

    #[test]
    fn solved_values_are_write_once() {
        let table = table();
        let mut values = SolvedValues::for_table(&table);
        let first = assignment(2, 1.0, Dimension::dimensionless());
        let second = assignment(2, 2.0, Dimension::dimensionless());

        let got = solution_statement(
            &first,
            &table,
            &mut values,
            &SiUnits,
            StatementStyle::Solution,
        )
        .unwrap();
        assert_eq!(got, "(SVAR n 1 )");

        let got = solution_statement(
            &second,
            &table,
            &mut values,
            &SiUnits,
            StatementStyle::Solution,
        )
        .unwrap_err();
        assert_eq!(
            got,
            ReportError::Record(RecordError::Conflict {
                index: 2,
                previous: 1.0,
                value: 2.0
            })
        );
    }

    #[test]
    fn undersized_value_table() {
        let table = table();
        let mut values = SolvedValues::with_len(1);
        let solution = assignment(1, 0.5, Dimension::length());

        let got = solution_statement(
            &solution,
            &table,
            &mut values,
            &SiUnits,
            StatementStyle::Help,
        )
        .unwrap_err();

        assert_eq!(
            got,
            ReportError::Record(RecordError::TableTooSmall { index: 1, len: 1 })
        );
    }

    #[test]
    fn look_up_derived_units() {
        let speed = Dimension::length() / Dimension::time();

        let (factor, dim) = SiUnits.lookup("km/h").unwrap();

        assert_eq!(dim, speed);
        assert!(approx::relative_eq!(factor * 3.6, 1.0));
        assert!(SiUnits.lookup("parsec").is_none());
    }
}
