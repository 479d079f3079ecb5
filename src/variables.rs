//! The canonical variable table and the table of solved values.

use crate::Dimension;
use smol_str::SmolStr;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// An index into a [`VariableTable`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

impl VarId {
    pub fn index(self) -> usize { self.0 }
}

impl Display for VarId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A physical quantity referenced by equations.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: SmolStr,
    pub dimension: Dimension,
    /// The unit solved values should be displayed in, if not SI.
    pub preferred_unit: Option<SmolStr>,
}

impl Variable {
    pub fn named<S: Into<SmolStr>>(name: S) -> Self {
        Variable {
            name: name.into(),
            dimension: Dimension::Unknown,
            preferred_unit: None,
        }
    }

    pub fn with_dimension(self, dimension: Dimension) -> Self {
        Variable { dimension, ..self }
    }

    pub fn with_preferred_unit<S: Into<SmolStr>>(self, unit: S) -> Self {
        Variable {
            preferred_unit: Some(unit.into()),
            ..self
        }
    }
}

/// The registry every [`VarId`] indexes into.
///
/// Expressions only ever hold indices, so lookups are bounds-checked and a
/// dangling index is reported as a [`LookupError`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VariableTable {
    variables: Vec<Variable>,
}

impl VariableTable {
    pub fn new() -> Self { VariableTable::default() }

    pub fn with(mut self, variable: Variable) -> Self {
        self.declare(variable);
        self
    }

    pub fn declare(&mut self, variable: Variable) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(variable);
        id
    }

    /// Get the id for a variable with this name, declaring it (with an unknown
    /// dimension) if it hasn't been seen before.
    pub fn intern(&mut self, name: &str) -> VarId {
        match self.find(name) {
            Some(id) => id,
            None => self.declare(Variable::named(name)),
        }
    }

    pub fn find(&self, name: &str) -> Option<VarId> {
        self.variables
            .iter()
            .position(|v| v.name.as_str() == name)
            .map(VarId)
    }

    pub fn get(&self, id: VarId) -> Result<&Variable, LookupError> {
        self.variables.get(id.0).ok_or(LookupError::OutOfRange {
            index: id.0,
            len: self.variables.len(),
        })
    }

    pub fn name(&self, id: VarId) -> Result<&str, LookupError> {
        self.get(id).map(|v| v.name.as_str())
    }

    pub fn len(&self) -> usize { self.variables.len() }

    pub fn is_empty(&self) -> bool { self.variables.is_empty() }

    pub fn ids(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.variables.len()).map(VarId)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("variable {index} is out of range for a table of {len} variables")]
    OutOfRange { index: usize, len: usize },
}

/// The SI value of every variable that has been solved so far.
///
/// The table must be sized up front to cover every [`VarId`]. Each entry is
/// meant to be written once: writing the same value again is accepted, but a
/// different value is rejected and the original is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedValues {
    values: Vec<Option<f64>>,
}

impl SolvedValues {
    pub fn with_len(len: usize) -> Self {
        SolvedValues {
            values: vec![None; len],
        }
    }

    pub fn for_table(table: &VariableTable) -> Self {
        SolvedValues::with_len(table.len())
    }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    pub fn get(&self, id: VarId) -> Option<f64> {
        self.values.get(id.0).copied().flatten()
    }

    pub fn record(&mut self, id: VarId, value: f64) -> Result<(), RecordError> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(id.0)
            .ok_or(RecordError::TableTooSmall { index: id.0, len })?;

        match *slot {
            Some(previous) if !approx::relative_eq!(previous, value) => {
                Err(RecordError::Conflict {
                    index: id.0,
                    previous,
                    value,
                })
            },
            _ => {
                *slot = Some(value);
                Ok(())
            },
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, value)| value.map(|v| (VarId(i), v)))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("the solved-value table has {len} entries, which doesn't cover variable {index}")]
    TableTooSmall { index: usize, len: usize },
    #[error("variable {index} was already solved as {previous}, not {value}")]
    Conflict {
        index: usize,
        previous: f64,
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_reuses_existing_entries() {
        let mut table = VariableTable::new()
            .with(Variable::named("x").with_dimension(Dimension::length()));

        let x = table.intern("x");
        let y = table.intern("y");

        assert_eq!(x, VarId(0));
        assert_eq!(y, VarId(1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(x).unwrap().dimension, Dimension::length());
        assert!(table.get(y).unwrap().dimension.is_unknown());
    }

    #[test]
    fn out_of_range_lookups_are_errors() {
        let table = VariableTable::new().with(Variable::named("x"));

        let got = table.get(VarId(3)).unwrap_err();

        assert_eq!(got, LookupError::OutOfRange { index: 3, len: 1 });
    }

    #[test]
    fn solved_values_are_written_once() {
        let mut values = SolvedValues::with_len(2);

        values.record(VarId(1), 9.81).unwrap();
        values.record(VarId(1), 9.81).unwrap();
        let got = values.record(VarId(1), 10.0).unwrap_err();

        assert_eq!(
            got,
            RecordError::Conflict {
                index: 1,
                previous: 9.81,
                value: 10.0
            }
        );
        assert_eq!(values.get(VarId(1)), Some(9.81));
        assert_eq!(values.get(VarId(0)), None);
        assert_eq!(values.iter().collect::<Vec<_>>(), vec![(VarId(1), 9.81)]);
    }

    #[test]
    fn undersized_table_is_reported() {
        let mut values = SolvedValues::with_len(1);

        let got = values.record(VarId(4), 1.0).unwrap_err();

        assert_eq!(got, RecordError::TableTooSmall { index: 4, len: 1 });
    }
}
