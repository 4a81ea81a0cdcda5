//! Method codes and their (family, discipline) pairs.

use std::fmt;

use crate::error::Error;

/// Stepper family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// L-stable Rosenbrock 4(3), uses the Jacobian
    Rodas4,
    /// Dormand–Prince 5(4) explicit Runge–Kutta
    Dopri5,
    /// Gragg–Bulirsch–Stoer extrapolation
    BulirschStoer,
}

/// Stepping discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// Constant step `dx0`, no error control
    Fixed,
    /// Error-controlled steps, observer sees mesh points only
    Adaptive,
    /// Error-controlled steps with a step interpolant
    AdaptiveDense,
}

impl Discipline {
    pub fn is_dense(self) -> bool {
        matches!(self, Discipline::AdaptiveDense)
    }
}

/// A stepper selected by integer code:
///
/// | code | family         | discipline      |
/// |------|----------------|-----------------|
/// | 0    | RODAS4         | adaptive, dense |
/// | 1    | DOPRI5         | adaptive, dense |
/// | 2    | Bulirsch–Stoer | adaptive, dense |
/// | 3    | RODAS4         | adaptive        |
/// | 4    | DOPRI5         | adaptive        |
/// | 5    | Bulirsch–Stoer | adaptive        |
/// | 6    | RODAS4         | fixed step      |
/// | 7    | DOPRI5         | fixed step      |
/// | 8    | Bulirsch–Stoer | fixed step      |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Method {
    pub family: Family,
    pub discipline: Discipline,
}

const FAMILIES: [Family; 3] = [Family::Rodas4, Family::Dopri5, Family::BulirschStoer];
const DISCIPLINES: [Discipline; 3] = [
    Discipline::AdaptiveDense,
    Discipline::Adaptive,
    Discipline::Fixed,
];

impl Method {
    /// Every method in code order.
    pub fn all() -> impl Iterator<Item = Method> {
        (0..9).filter_map(|code| Method::try_from(code).ok())
    }

    pub fn code(self) -> i32 {
        let f = FAMILIES.iter().position(|&f| f == self.family).unwrap_or(0);
        let d = DISCIPLINES
            .iter()
            .position(|&d| d == self.discipline)
            .unwrap_or(0);
        (3 * d + f) as i32
    }

    /// Upgrade an adaptive method to dense output when `dense` is set.
    pub fn with_dense(self, dense: bool) -> Self {
        match self.discipline {
            Discipline::Adaptive if dense => Method {
                discipline: Discipline::AdaptiveDense,
                ..self
            },
            _ => self,
        }
    }
}

impl TryFrom<i32> for Method {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        if !(0..9).contains(&code) {
            return Err(Error::UnknownMethod(code));
        }
        let code = code as usize;
        Ok(Method {
            family: FAMILIES[code % 3],
            discipline: DISCIPLINES[code / 3],
        })
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Family::Rodas4 => "RODAS4",
            Family::Dopri5 => "DOPRI5",
            Family::BulirschStoer => "Bulirsch-Stoer",
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let discipline = match self.discipline {
            Discipline::Fixed => "fixed step",
            Discipline::Adaptive => "adaptive",
            Discipline::AdaptiveDense => "adaptive, dense",
        };
        write!(f, "{} ({})", self.family, discipline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_table() {
        let m = Method::try_from(0).unwrap();
        assert_eq!(m.family, Family::Rodas4);
        assert_eq!(m.discipline, Discipline::AdaptiveDense);

        let m = Method::try_from(4).unwrap();
        assert_eq!(m.family, Family::Dopri5);
        assert_eq!(m.discipline, Discipline::Adaptive);

        let m = Method::try_from(8).unwrap();
        assert_eq!(m.family, Family::BulirschStoer);
        assert_eq!(m.discipline, Discipline::Fixed);
    }

    #[test]
    fn codes_round_trip_and_unknown_fail() {
        assert_eq!(Method::all().count(), 9);
        for (code, m) in Method::all().enumerate() {
            assert_eq!(m.code(), code as i32);
        }
        for code in [-1, 9, 99] {
            assert!(matches!(Method::try_from(code), Err(Error::UnknownMethod(c)) if c == code));
        }
    }

    #[test]
    fn dense_flag_upgrades_adaptive_only() {
        let m = Method::try_from(5).unwrap().with_dense(true);
        assert_eq!(m.code(), 2);
        let m = Method::try_from(7).unwrap().with_dense(true);
        assert_eq!(m.code(), 7);
        assert_eq!(Method::try_from(3).unwrap().with_dense(false).code(), 3);
    }
}
