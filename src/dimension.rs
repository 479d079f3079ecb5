//! Physical dimensions.

use crate::print;
use nalgebra::Vector5;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Div, Mul},
};

/// Exponents of the base quantities, in the order length, mass, time, charge
/// and temperature.
pub type Exponents = Vector5<f64>;

const LENGTH: usize = 0;
const MASS: usize = 1;
const TIME: usize = 2;
const CHARGE: usize = 3;
const TEMPERATURE: usize = 4;

/// The SI symbol used for each base quantity when writing out units.
const SYMBOLS: [&str; 5] = ["m", "kg", "s", "C", "K"];

/// The physical dimension of a quantity.
///
/// A known dimension is a formal product of powers of the five base
/// quantities. The two sentinel states are ordinary values: `Unknown` is
/// compatible with anything, while `Inconsistent` marks a node whose operands
/// could not be reconciled.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Dimension {
    Known(Exponents),
    Unknown,
    Inconsistent,
}

impl Dimension {
    pub fn new(
        length: f64,
        mass: f64,
        time: f64,
        charge: f64,
        temperature: f64,
    ) -> Self {
        Dimension::Known(Vector5::new(length, mass, time, charge, temperature))
    }

    pub fn dimensionless() -> Self { Dimension::Known(Vector5::zeros()) }

    pub fn unknown() -> Self { Dimension::Unknown }

    pub fn inconsistent() -> Self { Dimension::Inconsistent }

    pub fn length() -> Self { Dimension::new(1.0, 0.0, 0.0, 0.0, 0.0) }

    pub fn mass() -> Self { Dimension::new(0.0, 1.0, 0.0, 0.0, 0.0) }

    pub fn time() -> Self { Dimension::new(0.0, 0.0, 1.0, 0.0, 0.0) }

    pub fn charge() -> Self { Dimension::new(0.0, 0.0, 0.0, 1.0, 0.0) }

    pub fn temperature() -> Self { Dimension::new(0.0, 0.0, 0.0, 0.0, 1.0) }

    pub fn is_unknown(&self) -> bool { *self == Dimension::Unknown }

    pub fn is_inconsistent(&self) -> bool { *self == Dimension::Inconsistent }

    pub fn is_known(&self) -> bool { self.exponents().is_some() }

    pub fn is_dimensionless(&self) -> bool {
        match self {
            Dimension::Known(exponents) => exponents.iter().all(|e| *e == 0.0),
            _ => false,
        }
    }

    pub fn exponents(&self) -> Option<&Exponents> {
        match self {
            Dimension::Known(exponents) => Some(exponents),
            _ => None,
        }
    }

    pub fn length_exponent(&self) -> Option<f64> { self.component(LENGTH) }

    pub fn mass_exponent(&self) -> Option<f64> { self.component(MASS) }

    pub fn time_exponent(&self) -> Option<f64> { self.component(TIME) }

    pub fn charge_exponent(&self) -> Option<f64> { self.component(CHARGE) }

    pub fn temperature_exponent(&self) -> Option<f64> {
        self.component(TEMPERATURE)
    }

    fn component(&self, index: usize) -> Option<f64> {
        self.exponents().map(|e| e[index])
    }

    /// The dimension both sides of a sum (or an equation) must share.
    ///
    /// An unknown side takes on the other side's dimension, and any mismatch
    /// is [`Dimension::Inconsistent`].
    pub fn unify(&self, other: &Dimension) -> Dimension {
        match (self, other) {
            (Dimension::Inconsistent, _) | (_, Dimension::Inconsistent) => {
                Dimension::Inconsistent
            },
            (Dimension::Unknown, other) | (other, Dimension::Unknown) => *other,
            (Dimension::Known(left), Dimension::Known(right)) => {
                if left == right {
                    *self
                } else {
                    Dimension::Inconsistent
                }
            },
        }
    }

    /// Raise a quantity with this dimension to some power.
    pub fn powf(&self, power: f64) -> Dimension {
        self.map(|exponents| exponents * power)
    }

    fn map<F>(&self, func: F) -> Dimension
    where
        F: FnOnce(&Exponents) -> Exponents,
    {
        match self {
            Dimension::Known(exponents) => Dimension::Known(func(exponents)),
            other => *other,
        }
    }

    fn combine<F>(&self, other: &Dimension, func: F) -> Dimension
    where
        F: FnOnce(&Exponents, &Exponents) -> Exponents,
    {
        match (self, other) {
            (Dimension::Inconsistent, _) | (_, Dimension::Inconsistent) => {
                Dimension::Inconsistent
            },
            (Dimension::Known(left), Dimension::Known(right)) => {
                Dimension::Known(func(left, right))
            },
            _ => Dimension::Unknown,
        }
    }

    /// Write out the SI units for this dimension, e.g. `m.kg/s^2`.
    ///
    /// Dimensionless quantities have an empty unit string.
    pub fn unit_string(&self) -> String {
        let exponents = match self {
            Dimension::Known(exponents) => exponents,
            Dimension::Unknown => return String::from("unknown_units"),
            Dimension::Inconsistent => {
                return String::from("inconsistent_units")
            },
        };

        let powers: Vec<(&str, f64)> = SYMBOLS
            .iter()
            .copied()
            .zip(exponents.iter().copied())
            .collect();
        let numerator: Vec<_> = powers
            .iter()
            .filter(|(_, power)| *power > 0.0)
            .map(|(symbol, power)| unit_power(symbol, *power))
            .collect();
        let denominator = powers.iter().filter(|(_, power)| *power < 0.0);

        if numerator.is_empty() {
            // nothing to divide into, so write the negative powers directly
            return denominator
                .map(|(symbol, power)| unit_power(symbol, *power))
                .collect::<Vec<_>>()
                .join(".");
        }

        let mut units = numerator.join(".");
        for (symbol, power) in denominator {
            units.push('/');
            units.push_str(&unit_power(symbol, -*power));
        }

        units
    }
}

fn unit_power(symbol: &str, power: f64) -> String {
    match print::as_integer(power) {
        Some(1) => symbol.to_string(),
        Some(integer) => format!("{}^{}", symbol, integer),
        None => format!("{}^{:.1}", symbol, power),
    }
}

impl Default for Dimension {
    fn default() -> Self { Dimension::Unknown }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        self.combine(&rhs, |left, right| left + right)
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        self.combine(&rhs, |left, right| left - right)
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            write!(f, "dimensionless")
        } else {
            write!(f, "{}", self.unit_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn velocity() -> Dimension { Dimension::length() / Dimension::time() }

    #[test]
    fn sentinels_are_not_known() {
        assert!(Dimension::unknown().is_unknown());
        assert!(!Dimension::unknown().is_known());
        assert!(Dimension::inconsistent().is_inconsistent());
        assert!(!Dimension::inconsistent().is_dimensionless());
        assert_eq!(Dimension::default(), Dimension::Unknown);
    }

    #[test]
    fn equality_is_an_exact_match() {
        assert_eq!(velocity(), Dimension::new(1.0, 0.0, -1.0, 0.0, 0.0));
        assert_ne!(velocity(), Dimension::new(1.0, 0.0, -1.5, 0.0, 0.0));
        assert_eq!(velocity().time_exponent(), Some(-1.0));
        assert_eq!(Dimension::unknown().length_exponent(), None);
    }

    #[test]
    fn multiplying_adds_exponents() {
        let area = Dimension::length() * Dimension::length();

        assert_eq!(area, Dimension::new(2.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(area.powf(0.5), Dimension::length());
        assert_eq!(
            Dimension::length() * Dimension::unknown(),
            Dimension::Unknown
        );
        assert_eq!(
            Dimension::unknown() / Dimension::inconsistent(),
            Dimension::Inconsistent
        );
    }

    #[test]
    fn unify_fills_in_unknowns() {
        let inputs = vec![
            (velocity(), velocity(), velocity()),
            (Dimension::unknown(), velocity(), velocity()),
            (velocity(), Dimension::unknown(), velocity()),
            (Dimension::unknown(), Dimension::unknown(), Dimension::Unknown),
            (velocity(), Dimension::length(), Dimension::Inconsistent),
            (Dimension::inconsistent(), velocity(), Dimension::Inconsistent),
        ];

        for (left, right, should_be) in inputs {
            assert_eq!(left.unify(&right), should_be);
        }
    }

    #[test]
    fn synthesise_unit_strings() {
        let force = Dimension::mass() * Dimension::length()
            / (Dimension::time() * Dimension::time());
        let inputs = vec![
            (Dimension::dimensionless(), ""),
            (Dimension::length(), "m"),
            (velocity(), "m/s"),
            (force, "m.kg/s^2"),
            (Dimension::time().powf(-1.0), "s^-1"),
            (Dimension::length().powf(1.5), "m^1.5"),
            (Dimension::unknown(), "unknown_units"),
            (Dimension::inconsistent(), "inconsistent_units"),
        ];

        for (dimension, should_be) in inputs {
            assert_eq!(dimension.unit_string(), should_be);
        }
    }
}
