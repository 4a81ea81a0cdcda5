//! Extrapolation methods

mod bulirsch_stoer;

pub use bulirsch_stoer::{bulirsch_stoer, bulirsch_stoer_fixed};
