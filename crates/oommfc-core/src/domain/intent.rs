use super::errors::{OommfcError, OommfcResult};
use super::evolver::{Evolver, EvolverKind};
use serde::{Deserialize, Serialize};

const TIME_EVOLVE_EVOLVERS: [EvolverKind; 5] = [
    EvolverKind::Euler,
    EvolverKind::RungeKutta,
    EvolverKind::SpinTransfer,
    EvolverKind::Slonczewski,
    EvolverKind::Theta,
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinimiseIntent {
    #[serde(
        rename = "stopping_mxHxm",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stopping_mxhxm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolver: Option<Evolver>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEvolveIntent {
    pub t: f64,
    pub n: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolver: Option<Evolver>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopping_dm_dt: Option<f64>,
}

/// One leg of a hysteresis sweep from `h_start` to `h_end` in `n` field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HStep {
    pub h_start: Vec<f64>,
    pub h_end: Vec<f64>,
    pub n: usize,
}

impl HStep {
    pub fn new(h_start: [f64; 3], h_end: [f64; 3], n: usize) -> Self {
        Self {
            h_start: h_start.to_vec(),
            h_end: h_end.to_vec(),
            n,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepIntent {
    pub hsteps: Vec<HStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolver: Option<Evolver>,
    #[serde(
        rename = "stopping_mxHxm",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stopping_mxhxm: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "snake_case")]
pub enum DriveIntent {
    Minimise(MinimiseIntent),
    TimeEvolve(TimeEvolveIntent),
    Sweep(SweepIntent),
}

impl DriveIntent {
    pub fn minimise() -> Self {
        Self::Minimise(MinimiseIntent::default())
    }

    pub fn time_evolve(t: f64, n: usize) -> Self {
        Self::TimeEvolve(TimeEvolveIntent {
            t,
            n,
            evolver: None,
            stopping_dm_dt: None,
        })
    }

    pub fn sweep(hsteps: Vec<HStep>) -> Self {
        Self::Sweep(SweepIntent {
            hsteps,
            evolver: None,
            stopping_mxhxm: None,
        })
    }

    /// Driver class name recorded in the run manifest.
    pub const fn driver_class(&self) -> &'static str {
        match self {
            Self::Minimise(_) => "MinDriver",
            Self::TimeEvolve(_) => "TimeDriver",
            Self::Sweep(_) => "HysteresisDriver",
        }
    }

    pub fn evolver(&self) -> Option<&Evolver> {
        match self {
            Self::Minimise(intent) => intent.evolver.as_ref(),
            Self::TimeEvolve(intent) => intent.evolver.as_ref(),
            Self::Sweep(intent) => intent.evolver.as_ref(),
        }
    }

    pub fn validate(&self) -> OommfcResult<()> {
        match self {
            Self::Minimise(intent) => {
                validate_stopping("stopping_mxHxm", intent.stopping_mxhxm)?;
                validate_minimiser(intent.evolver.as_ref(), "minimise")
            }
            Self::TimeEvolve(intent) => {
                if !(intent.t.is_finite() && intent.t > 0.0) {
                    return Err(OommfcError::invalid_parameter(
                        "INPUT.TIME_EVOLVE_T",
                        format!("simulation time must be positive, got {}", intent.t),
                    ));
                }
                if intent.n == 0 {
                    return Err(OommfcError::invalid_parameter(
                        "INPUT.TIME_EVOLVE_N",
                        "time evolution needs at least one stage",
                    ));
                }
                validate_stopping("stopping_dm_dt", intent.stopping_dm_dt)?;
                if let Some(evolver) = &intent.evolver {
                    if !TIME_EVOLVE_EVOLVERS.contains(&evolver.kind) {
                        return Err(OommfcError::bad_term_configuration(
                            "INPUT.EVOLVER_PAIRING",
                            format!(
                                "time evolution cannot use evolver {}",
                                evolver.kind.class_name()
                            ),
                        ));
                    }
                }
                Ok(())
            }
            Self::Sweep(intent) => {
                if intent.hsteps.is_empty() {
                    return Err(OommfcError::bad_term_configuration(
                        "INPUT.SWEEP_STEP_COUNT",
                        "hysteresis sweep needs at least one step",
                    ));
                }
                for (index, step) in intent.hsteps.iter().enumerate() {
                    if step.h_start.len() != 3 || step.h_end.len() != 3 {
                        return Err(OommfcError::invalid_parameter(
                            "INPUT.SWEEP_STEP_ARITY",
                            format!(
                                "sweep step {index} endpoints must have 3 components, got {} and {}",
                                step.h_start.len(),
                                step.h_end.len()
                            ),
                        ));
                    }
                    if step.n < 2 {
                        return Err(OommfcError::bad_term_configuration(
                            "INPUT.SWEEP_STEP_COUNT",
                            format!(
                                "sweep step {index} has n={}, expected at least 2",
                                step.n
                            ),
                        ));
                    }
                }
                validate_stopping("stopping_mxHxm", intent.stopping_mxhxm)?;
                validate_minimiser(intent.evolver.as_ref(), "sweep")
            }
        }
    }

    /// Keyword arguments of the intent as recorded in the run manifest.
    pub fn manifest_args(&self) -> OommfcResult<serde_json::Value> {
        let mut value = serde_json::to_value(self).map_err(|source| {
            OommfcError::internal(
                "RUN.MANIFEST_ARGS",
                format!("failed to serialise drive arguments: {source}"),
            )
        })?;
        if let Some(object) = value.as_object_mut() {
            object.remove("driver");
        }
        Ok(value)
    }
}

fn validate_stopping(name: &str, value: Option<f64>) -> OommfcResult<()> {
    match value {
        Some(value) if !(value.is_finite() && value > 0.0) => {
            Err(OommfcError::invalid_parameter(
                "INPUT.STOPPING_CRITERION",
                format!("{name} must be positive, got {value}"),
            ))
        }
        _ => Ok(()),
    }
}

fn validate_minimiser(evolver: Option<&Evolver>, intent: &str) -> OommfcResult<()> {
    match evolver {
        Some(evolver) if evolver.kind != EvolverKind::ConjugateGradient => {
            Err(OommfcError::bad_term_configuration(
                "INPUT.EVOLVER_PAIRING",
                format!(
                    "{intent} requires Oxs_CGEvolve, got {}",
                    evolver.kind.class_name()
                ),
            ))
        }
        _ => Ok(()),
    }
}
