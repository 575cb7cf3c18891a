use super::parameter::Parameter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

const EULER_ATTRIBUTES: &[&str] = &[
    "alpha",
    "gamma_LL",
    "gamma_G",
    "do_precess",
    "allow_signed_gamma",
    "fixed_spins",
    "min_timestep",
    "max_timestep",
    "start_dm",
    "error_rate",
    "absolute_step_error",
    "relative_step_error",
    "step_headroom",
];

const RUNGE_KUTTA_ATTRIBUTES: &[&str] = &[
    "alpha",
    "gamma_LL",
    "gamma_G",
    "do_precess",
    "allow_signed_gamma",
    "fixed_spins",
    "min_timestep",
    "max_timestep",
    "start_dm",
    "start_dt",
    "stage_start",
    "error_rate",
    "absolute_step_error",
    "relative_step_error",
    "energy_precision",
    "min_step_headroom",
    "max_step_headroom",
    "reject_goal",
    "method",
];

const SPIN_TRANSFER_ATTRIBUTES: &[&str] = &[
    "alpha",
    "gamma_LL",
    "gamma_G",
    "do_precess",
    "allow_signed_gamma",
    "fixed_spins",
    "min_timestep",
    "max_timestep",
    "start_dm",
    "start_dt",
    "stage_start",
    "error_rate",
    "absolute_step_error",
    "relative_step_error",
    "energy_precision",
    "min_step_headroom",
    "max_step_headroom",
    "reject_goal",
    "method",
    "u",
    "beta",
    "u_profile",
    "u_profile_args",
];

const SLONCZEWSKI_ATTRIBUTES: &[&str] = &[
    "alpha",
    "gamma_LL",
    "gamma_G",
    "do_precess",
    "allow_signed_gamma",
    "fixed_spins",
    "min_timestep",
    "max_timestep",
    "start_dm",
    "start_dt",
    "stage_start",
    "error_rate",
    "absolute_step_error",
    "relative_step_error",
    "energy_precision",
    "min_step_headroom",
    "max_step_headroom",
    "reject_goal",
    "method",
    "P",
    "P_fixed",
    "P_free",
    "Lambda",
    "Lambda_fixed",
    "Lambda_free",
    "eps_prime",
    "J",
    "J_direction",
    "J_profile",
    "J_profile_args",
    "mp",
];

const THETA_ATTRIBUTES: &[&str] = &[
    "alpha",
    "gamma_LL",
    "gamma_G",
    "do_precess",
    "allow_signed_gamma",
    "fixed_spins",
    "min_timestep",
    "max_timestep",
    "temperature",
    "tempscript",
    "tempscript_args",
    "uniform_kernel_steps",
    "ito_calculus",
];

const CONJUGATE_GRADIENT_ATTRIBUTES: &[&str] = &[
    "gradient_reset_angle",
    "gradient_reset_count",
    "minimum_bracket_step",
    "maximum_bracket_step",
    "line_minimum_angle_precision",
    "line_minimum_relwidth",
    "energy_precision",
    "method",
    "fixed_spins",
];

/// Attributes lowered as vector parameters; everything else is scalar.
pub(crate) const VECTOR_ATTRIBUTES: &[&str] = &["mp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolverKind {
    Euler,
    RungeKutta,
    SpinTransfer,
    Slonczewski,
    Theta,
    ConjugateGradient,
}

impl EvolverKind {
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Euler => "Oxs_EulerEvolve",
            Self::RungeKutta => "Oxs_RungeKuttaEvolve",
            Self::SpinTransfer => "Anv_SpinTEvolve",
            Self::Slonczewski => "Oxs_SpinXferEvolve",
            Self::Theta => "UHH_ThetaEvolve",
            Self::ConjugateGradient => "Oxs_CGEvolve",
        }
    }

    /// Attributes the engine accepts for this evolver, in emission order.
    pub const fn allowed_attributes(self) -> &'static [&'static str] {
        match self {
            Self::Euler => EULER_ATTRIBUTES,
            Self::RungeKutta => RUNGE_KUTTA_ATTRIBUTES,
            Self::SpinTransfer => SPIN_TRANSFER_ATTRIBUTES,
            Self::Slonczewski => SLONCZEWSKI_ATTRIBUTES,
            Self::Theta => THETA_ATTRIBUTES,
            Self::ConjugateGradient => CONJUGATE_GRADIENT_ATTRIBUTES,
        }
    }

    pub fn allows(self, attribute: &str) -> bool {
        self.allowed_attributes().contains(&attribute)
    }

    /// Prefix of the `<prefix>_profile` attribute pair that carries a current profile.
    pub const fn profile_prefix(self) -> Option<&'static str> {
        match self {
            Self::SpinTransfer => Some("u"),
            Self::Slonczewski => Some("J"),
            _ => None,
        }
    }
}

/// An evolver attribute: a parameter lowered like any other, or engine text emitted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    Value(Parameter),
    Text(String),
}

impl From<Parameter> for Attribute {
    fn from(value: Parameter) -> Self {
        Self::Value(value)
    }
}

impl From<f64> for Attribute {
    fn from(value: f64) -> Self {
        Self::Value(Parameter::Constant(value))
    }
}

impl From<[f64; 3]> for Attribute {
    fn from(value: [f64; 3]) -> Self {
        Self::Value(Parameter::ConstantVector(value))
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Scalar multiplier of the driving current as a function of simulation time.
#[derive(Clone)]
pub struct TimeDependence(Arc<dyn Fn(f64) -> f64 + Send + Sync>);

impl TimeDependence {
    pub fn new(function: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(function))
    }

    pub fn evaluate(&self, time: f64) -> f64 {
        (self.0)(time)
    }
}

impl Debug for TimeDependence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("TimeDependence(..)")
    }
}

/// A hand-written engine procedure used as a current profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TclProcedure {
    pub script: String,
    pub name: String,
    pub args: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evolver {
    pub kind: EvolverKind,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(skip)]
    pub time_dependence: Option<TimeDependence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tstep: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcl_strings: Option<TclProcedure>,
}

impl Evolver {
    pub fn new(kind: EvolverKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            time_dependence: None,
            tstep: None,
            tcl_strings: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Attribute>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_time_dependence(
        mut self,
        function: impl Fn(f64) -> f64 + Send + Sync + 'static,
        tstep: f64,
    ) -> Self {
        self.time_dependence = Some(TimeDependence::new(function));
        self.tstep = Some(tstep);
        self
    }

    pub fn with_tcl_procedure(mut self, procedure: TclProcedure) -> Self {
        self.tcl_strings = Some(procedure);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Attribute, Evolver, EvolverKind};
    use crate::domain::Parameter;

    #[test]
    fn class_names_follow_engine_spelling() {
        assert_eq!(EvolverKind::RungeKutta.class_name(), "Oxs_RungeKuttaEvolve");
        assert_eq!(EvolverKind::SpinTransfer.class_name(), "Anv_SpinTEvolve");
        assert_eq!(EvolverKind::Slonczewski.class_name(), "Oxs_SpinXferEvolve");
        assert_eq!(EvolverKind::Theta.class_name(), "UHH_ThetaEvolve");
        assert_eq!(EvolverKind::ConjugateGradient.class_name(), "Oxs_CGEvolve");
    }

    #[test]
    fn allow_lists_gate_dynamics_attributes() {
        assert!(EvolverKind::RungeKutta.allows("alpha"));
        assert!(!EvolverKind::RungeKutta.allows("u"));
        assert!(EvolverKind::SpinTransfer.allows("u_profile"));
        assert!(EvolverKind::Slonczewski.allows("J_profile_args"));
        assert!(EvolverKind::Theta.allows("temperature"));
        assert!(!EvolverKind::ConjugateGradient.allows("alpha"));
        assert_eq!(EvolverKind::SpinTransfer.profile_prefix(), Some("u"));
        assert_eq!(EvolverKind::RungeKutta.profile_prefix(), None);
    }

    #[test]
    fn attributes_deserialise_as_parameters_or_text() {
        let evolver: Evolver = serde_json::from_str(
            r#"{"kind": "runge_kutta", "attributes": {"alpha": 0.02, "method": "rkf54"}}"#,
        )
        .expect("evolver should deserialise");

        assert_eq!(evolver.kind, EvolverKind::RungeKutta);
        assert_eq!(
            evolver.attribute("alpha"),
            Some(&Attribute::Value(Parameter::Constant(0.02)))
        );
        assert_eq!(
            evolver.attribute("method"),
            Some(&Attribute::Text("rkf54".to_string()))
        );
    }

    #[test]
    fn time_dependence_is_evaluated_through_handle() {
        let evolver = Evolver::new(EvolverKind::Slonczewski)
            .with_time_dependence(|t| if t < 1e-10 { 1.0 } else { 0.0 }, 1e-11);

        let profile = evolver
            .time_dependence
            .as_ref()
            .expect("time dependence should be set");
        assert_eq!(profile.evaluate(0.0), 1.0);
        assert_eq!(profile.evaluate(2e-10), 0.0);
        assert_eq!(evolver.tstep, Some(1e-11));
    }
}
