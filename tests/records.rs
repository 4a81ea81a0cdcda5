use std::io::Cursor;

use approx::assert_relative_eq;
use decay_chain::prelude::*;
use decay_chain::records::{format_row, process, write_trajectory, Mode};
use decay_chain::ErrorKind;

mod common;
use common::small_chain;

fn rows(out: &[u8]) -> Vec<Vec<f64>> {
    String::from_utf8(out.to_vec())
        .unwrap()
        .lines()
        .map(|l| l.split(' ').map(|v| v.parse().unwrap()).collect())
        .collect()
}

#[test]
fn values_mode_answers_until_blank_line() {
    let chain = DecayChain::<f64>::from_parameters(3, 1, 5).unwrap();
    let input = Cursor::new("1\n0.5\n\n2\n");
    let mut out = Vec::new();
    let count = process(input, &mut out, chain.rates(), Mode::Values).unwrap();
    assert_eq!(count, 2);

    let rows = rows(&out);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], 1.0);
    for j in 0..3 {
        assert_relative_eq!(rows[0][j + 1], reference(j, 1, 5.0), max_relative = 1e-12);
    }
    assert_eq!(rows[1][0], 0.5);
}

#[test]
fn diff_mode_subtracts_supplied_reference() {
    let chain = DecayChain::<f64>::from_parameters(2, 0, 2).unwrap();
    let input = Cursor::new("1 0.5 0.25\n1 0.5 0.5\n");
    let mut out = Vec::new();
    process(input, &mut out, chain.rates(), Mode::Diff).unwrap();

    let rows = rows(&out);
    assert!(rows[0][1].abs() < 1e-15);
    assert!(rows[0][2].abs() < 1e-15);
    assert_relative_eq!(rows[1][2], -0.25, max_relative = 1e-12);
}

#[test]
fn malformed_records_are_fatal() {
    let chain = DecayChain::<f64>::from_parameters(2, 0, 2).unwrap();

    let err = process(Cursor::new("1\n1 0.5\n"), Vec::new(), chain.rates(), Mode::Values)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(matches!(err, Error::Format { line: 2, .. }));

    let err = process(Cursor::new("one\n"), Vec::new(), chain.rates(), Mode::Values)
        .unwrap_err();
    assert!(matches!(err, Error::Format { line: 1, .. }));

    let err =
        process(Cursor::new("1\n"), Vec::new(), chain.rates(), Mode::Diff).unwrap_err();
    assert!(matches!(err, Error::Format { line: 1, .. }));
}

#[test]
fn trajectory_rows_round_trip_through_text() {
    let out = run::<f64>(&small_chain(4)).unwrap();
    let mut text = Vec::new();
    write_trajectory(&out.trajectory, &mut text).unwrap();

    let parsed = rows(&text);
    assert_eq!(parsed.len(), out.trajectory.len());
    for (row, (x, y)) in parsed.iter().zip(out.trajectory.rows()) {
        assert_eq!(row.len(), 6);
        assert_eq!(row[0], x);
        assert_eq!(&row[1..], y);
    }
}

#[test]
fn row_precision_follows_the_type() {
    assert_eq!(format_row(1.0_f32, &[0.5_f32]), "1.00000000e0 5.00000000e-1");
    assert_eq!(
        format_row(0.25_f64, &[]),
        "2.5000000000000000e-1"
    );
}
