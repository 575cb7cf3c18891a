mod dynamics;
mod errors;
mod evolver;
mod intent;
mod parameter;
mod problem;
mod terms;

pub use dynamics::{Damping, Dynamics, DynamicsTerm, Precession, Slonczewski, ZhangLi};
pub use errors::{
    DriveResult, LoweringResult, OommfcError, OommfcErrorCategory, OommfcResult, RunOutput,
};
pub use evolver::{Attribute, Evolver, EvolverKind, TclProcedure, TimeDependence};
pub(crate) use evolver::VECTOR_ATTRIBUTES;
pub use intent::{DriveIntent, HStep, MinimiseIntent, SweepIntent, TimeEvolveIntent};
pub use parameter::{Parameter, RegionMap, Value};
pub use problem::Problem;
pub(crate) use problem::validate_problem_name;
pub use terms::{
    CrystalClass, CubicAnisotropy, Demag, Dmi, Energy, Exchange, MagnetoElastic, Rkky, Term,
    UniaxialAnisotropy, WaveKind, Zeeman,
};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Operating system the engine runs on. Some engine extensions are only built on Unix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub const fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unix => "unix",
            Self::Windows => "windows",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names the lowering reserves for its own script objects.
pub const RESERVED_NAMES: &[&str] = &[
    "mesh",
    "evolver",
    "m0",
    "m0_norm",
    "main_atlas",
    "entire_atlas",
    "hysteresis",
];

pub(crate) fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '_')
}
