//! Lowering of a problem and drive intent into an engine script plus field sidecars.

mod driver;
mod energy;
mod evolver;
mod mesh;
mod parameter;
pub mod serialization;
mod system;
mod wave;

pub use driver::driver_script;
pub use energy::{energy_script, term_script};
pub use evolver::{bind_dynamics, evolver_script};
pub use mesh::mesh_script;
pub use parameter::{LoweredParameter, lower_scalar, lower_vector};
pub use serialization::{format_number, format_vector};
pub use system::{LoweredScript, LoweringContext, ScriptOptions, Sidecar, problem_script};
pub use wave::{lookup_procedure, sample_times, wave_procedure};
