//! Configuration, trajectory capture and the integration driver.

mod config;
mod cont;
mod method;
mod recorder;
mod run;

pub use config::IntegrationConfig;
pub use cont::ContinuousOutput;
pub use method::{Discipline, Family, Method};
pub use recorder::{Trajectory, TrajectoryRecorder};
pub use run::{run, run_with, RunOutput};
