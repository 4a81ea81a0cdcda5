//! Plain-text records: trajectory rows out, analytic query lines in.
//!
//! Every row is `<x> <v_0> ... <v_{N-1}>`, space separated, each value with
//! [`Real::DIGITS`] significant digits.

use std::io::{BufRead, Write};

use crate::{
    analytic::bateman,
    error::{Error, Result},
    real::{format_real, Real},
    solve::Trajectory,
    validate::diff_row,
};

/// What [`process`] writes for every query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Bateman values at `t = query`
    Values,
    /// Bateman values minus the supplied reference row
    Diff,
}

/// One input line: `<query> [<ref_0> ... <ref_{N-1}>]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Record<T: Real> {
    pub query: T,
    pub reference: Option<Vec<T>>,
}

fn parse_value<T: Real>(token: &str, line: usize) -> Result<T> {
    T::from_str_radix(token, 10).map_err(|_| Error::Format {
        line,
        reason: format!("cannot parse {token:?} as a number"),
    })
}

/// Parse line number `line` (1-based, for messages) of a chain with `n`
/// species. The reference segment must be empty or hold exactly `n` values.
pub fn parse_record<T: Real>(text: &str, line: usize, n: usize) -> Result<Record<T>> {
    let mut tokens = text.split_whitespace();
    let query = match tokens.next() {
        Some(tok) => parse_value(tok, line)?,
        None => {
            return Err(Error::Format {
                line,
                reason: "missing query value".into(),
            })
        }
    };
    let reference = tokens
        .map(|tok| parse_value(tok, line))
        .collect::<Result<Vec<T>>>()?;
    match reference.len() {
        0 => Ok(Record {
            query,
            reference: None,
        }),
        k if k == n => Ok(Record {
            query,
            reference: Some(reference),
        }),
        k => Err(Error::Format {
            line,
            reason: format!("reference segment has {k} values, expected 0 or {n}"),
        }),
    }
}

/// `x v_0 ... v_{N-1}` with full precision.
pub fn format_row<T: Real>(x: T, values: &[T]) -> String {
    let mut row = format_real(x);
    for &v in values {
        row.push(' ');
        row.push_str(&format_real(v));
    }
    row
}

/// Write every trajectory row on its own line.
pub fn write_trajectory<T: Real, W: Write>(trajectory: &Trajectory<T>, mut out: W) -> Result<()> {
    for (x, y) in trajectory.rows() {
        writeln!(out, "{}", format_row(x, y))?;
    }
    Ok(())
}

/// Answer query lines from `input` for the chain with `rates` until an
/// empty line or the end of input. Returns the number of records answered.
///
/// Any malformed line aborts the stream; in [`Mode::Diff`] every line must
/// carry a full reference row.
pub fn process<T, R, W>(input: R, mut out: W, rates: &[T], mode: Mode) -> Result<usize>
where
    T: Real,
    R: BufRead,
    W: Write,
{
    let n = rates.len();
    let mut count = 0;
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        let record: Record<T> = parse_record(&line, i + 1, n)?;
        let values = bateman(rates, record.query);
        let row = match (mode, record.reference) {
            (Mode::Values, _) => values,
            (Mode::Diff, Some(reference)) => diff_row(&values, &reference),
            (Mode::Diff, None) => {
                return Err(Error::Format {
                    line: i + 1,
                    reason: format!("diff mode needs {n} reference values"),
                })
            }
        };
        writeln!(out, "{}", format_row(record.query, &row))?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn reference_segment_length() {
        let r: Record<f64> = parse_record("0.5", 1, 3).unwrap();
        assert_eq!(r.reference, None);
        let r: Record<f64> = parse_record("0.5 1 2 3", 1, 3).unwrap();
        assert_eq!(r.reference, Some(vec![1.0, 2.0, 3.0]));

        let err = parse_record::<f64>("0.5 1 2", 7, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err, Error::Format { line: 7, .. }));
        assert!(parse_record::<f64>("abc", 1, 3).is_err());
    }

    #[test]
    fn rows_use_full_precision() {
        assert_eq!(
            format_row(1.0_f64, &[0.5]),
            "1.0000000000000000e0 5.0000000000000000e-1"
        );
    }
}
