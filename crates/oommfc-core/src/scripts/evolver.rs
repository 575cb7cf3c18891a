use super::parameter::{lower_scalar, lower_vector};
use super::serialization::specify;
use super::system::LoweringContext;
use super::wave::{lookup_procedure, sample_times};
use crate::domain::{
    Attribute, Dynamics, Evolver, LoweringResult, OommfcError, Parameter, VECTOR_ATTRIBUTES,
};

const PROFILE_PROCEDURE: &str = "TimeFunction_evolver";

/// Copies `evolver` and binds dynamics-term parameters onto the copy.
pub fn bind_dynamics(evolver: &Evolver, dynamics: &Dynamics) -> LoweringResult<Evolver> {
    let mut bound = evolver.clone();
    let attributes = &mut bound.attributes;

    match dynamics.precession() {
        Some(precession) => {
            attributes.insert("gamma_G".to_string(), precession.gamma0.clone().into());
        }
        None => {
            attributes.insert("do_precess".to_string(), Attribute::from(0.0));
        }
    }
    match dynamics.damping() {
        Some(damping) => attributes.insert("alpha".to_string(), damping.alpha.clone().into()),
        None => attributes.insert("alpha".to_string(), Attribute::from(0.0)),
    };

    if let Some(zhang_li) = dynamics.zhang_li() {
        if !matches!(zhang_li.beta, Parameter::Constant(_)) {
            return Err(OommfcError::invalid_parameter(
                "INPUT.ZHANG_LI_BETA",
                format!(
                    "Zhang-Li beta must be a constant, got a {}",
                    zhang_li.beta.kind_name()
                ),
            ));
        }
        attributes.insert("u".to_string(), zhang_li.u.clone().into());
        attributes.insert("beta".to_string(), zhang_li.beta.clone().into());
    }

    if let Some(slonczewski) = dynamics.slonczewski() {
        attributes.insert("J".to_string(), slonczewski.j.clone().into());
        attributes.insert("mp".to_string(), slonczewski.mp.clone().into());
        attributes.insert("P".to_string(), slonczewski.p.clone().into());
        attributes.insert("Lambda".to_string(), slonczewski.lambda.clone().into());
        attributes.insert("eps_prime".to_string(), slonczewski.eps_prime.clone().into());
    }

    Ok(bound)
}

/// Emits the evolver block; `total_time` bounds the tabulated current profile.
pub fn evolver_script(
    context: &mut LoweringContext<'_>,
    evolver: &Evolver,
    total_time: Option<f64>,
) -> LoweringResult<String> {
    let mut evolver = evolver.clone();
    let mut script = String::new();

    if evolver.time_dependence.is_some() || evolver.tcl_strings.is_some() {
        let prefix = evolver.kind.profile_prefix().ok_or_else(|| {
            OommfcError::invalid_parameter(
                "INPUT.TIME_DEPENDENCE",
                format!(
                    "{} does not accept a current profile",
                    evolver.kind.class_name()
                ),
            )
        })?;

        let (name, args) = if let Some(procedure) = &evolver.tcl_strings {
            script.push_str(&procedure.script);
            if !procedure.script.ends_with('\n') {
                script.push('\n');
            }
            script.push('\n');
            (procedure.name.clone(), procedure.args.clone())
        } else {
            let (Some(profile), Some(tstep), Some(total_time)) =
                (&evolver.time_dependence, evolver.tstep, total_time)
            else {
                return Err(OommfcError::invalid_parameter(
                    "INPUT.TIME_DEPENDENCE",
                    "a time-dependent current needs tstep and a time drive",
                ));
            };
            let samples: Vec<f64> = sample_times(tstep, total_time)?
                .into_iter()
                .map(|time| profile.evaluate(time))
                .collect();
            script.push_str(&lookup_procedure(PROFILE_PROCEDURE, tstep, &samples)?);
            (PROFILE_PROCEDURE.to_string(), "total_time".to_string())
        };
        evolver
            .attributes
            .insert(format!("{prefix}_profile"), Attribute::Text(name));
        evolver
            .attributes
            .insert(format!("{prefix}_profile_args"), Attribute::Text(args));
    }

    let mut lines = Vec::new();
    for attribute in evolver.kind.allowed_attributes() {
        let Some(value) = evolver.attributes.get(*attribute) else {
            continue;
        };
        let token = match value {
            Attribute::Text(text) => text.clone(),
            Attribute::Value(parameter) => {
                let name = format!("evolver_{attribute}");
                let lowered = if VECTOR_ATTRIBUTES.contains(attribute) {
                    lower_vector(context, parameter, &name)?
                } else {
                    lower_scalar(context, parameter, &name)?
                };
                script.push_str(&lowered.fragment);
                lowered.token
            }
        };
        lines.push(format!("{attribute} {token}"));
    }

    script.push_str(&specify(evolver.kind.class_name(), Some("evolver"), &lines));
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::{bind_dynamics, evolver_script};
    use crate::domain::{
        Attribute, Damping, Dynamics, Evolver, EvolverKind, OommfcErrorCategory, Parameter,
        Platform, Precession, RegionMap, Slonczewski, TclProcedure, ZhangLi,
    };
    use crate::field::{Mesh, Region};
    use crate::scripts::LoweringContext;

    fn mesh() -> Mesh {
        Mesh::new(
            Region::new([0.0, 0.0, 0.0], [2e-9, 2e-9, 2e-9]).expect("region should be valid"),
            [1e-9, 1e-9, 1e-9],
        )
        .expect("mesh should be valid")
    }

    fn lower(evolver: &Evolver, total_time: Option<f64>) -> crate::domain::LoweringResult<String> {
        let mesh = mesh();
        let mut context = LoweringContext::new(&mesh, Platform::Unix);
        evolver_script(&mut context, evolver, total_time)
    }

    #[test]
    fn precession_and_damping_bind_onto_a_copy() {
        let original = Evolver::new(EvolverKind::RungeKutta);
        let dynamics = Dynamics::new()
            .with(Precession::new(2.211e5))
            .with(Damping::new(0.1));

        let bound = bind_dynamics(&original, &dynamics).expect("binding should succeed");
        assert!(original.attributes.is_empty());
        assert_eq!(bound.attribute("gamma_G"), Some(&Attribute::from(2.211e5)));
        assert_eq!(bound.attribute("alpha"), Some(&Attribute::from(0.1)));
        assert!(bound.attribute("do_precess").is_none());

        let script = lower(&bound, Some(1e-12)).expect("evolver should lower");
        assert_eq!(
            script,
            "Specify Oxs_RungeKuttaEvolve:evolver {\n  alpha 0.1\n  gamma_G 221100\n}\n\n"
        );
    }

    #[test]
    fn missing_dynamics_disable_precession_and_damping() {
        let bound = bind_dynamics(&Evolver::new(EvolverKind::Euler), &Dynamics::new())
            .expect("binding should succeed");
        let script = lower(&bound, Some(1e-12)).expect("evolver should lower");

        assert!(script.contains("  alpha 0\n"));
        assert!(script.contains("  do_precess 0\n"));
    }

    #[test]
    fn allow_list_filters_unknown_attributes() {
        let evolver = Evolver::new(EvolverKind::ConjugateGradient)
            .with_attribute("alpha", 0.5)
            .with_attribute("gradient_reset_count", 10.0)
            .with_attribute("not_an_attribute", "x");
        let script = lower(&evolver, None).expect("evolver should lower");

        assert_eq!(
            script,
            "Specify Oxs_CGEvolve:evolver {\n  gradient_reset_count 10\n}\n\n"
        );
    }

    #[test]
    fn zhang_li_binds_u_and_constant_beta() {
        let dynamics = Dynamics::new().with(ZhangLi::new(400.0, 0.5));
        let bound = bind_dynamics(&Evolver::new(EvolverKind::SpinTransfer), &dynamics)
            .expect("binding should succeed");
        let script = lower(&bound, Some(1e-12)).expect("evolver should lower");

        assert!(script.starts_with("Specify Anv_SpinTEvolve:evolver {"));
        assert!(script.contains("  u 400\n"));
        assert!(script.contains("  beta 0.5\n"));

        let mut varying = ZhangLi::new(400.0, 0.5);
        varying.beta = Parameter::PerRegion(RegionMap::new().with("main", 0.5));
        let error = bind_dynamics(
            &Evolver::new(EvolverKind::SpinTransfer),
            &Dynamics::new().with(varying),
        )
        .expect_err("varying beta should fail");
        assert_eq!(error.category(), OommfcErrorCategory::InvalidParameter);
    }

    #[test]
    fn slonczewski_lowers_mp_as_vector() {
        let dynamics = Dynamics::new().with(Slonczewski::new(1e12, [0.0, 0.0, 1.0], 0.4, 2.0));
        let bound = bind_dynamics(&Evolver::new(EvolverKind::Slonczewski), &dynamics)
            .expect("binding should succeed");
        let script = lower(&bound, Some(1e-12)).expect("evolver should lower");

        assert!(script.contains("  P 0.4\n"));
        assert!(script.contains("  Lambda 2\n"));
        assert!(script.contains("  eps_prime 0\n"));
        assert!(script.contains("  J 1000000000000\n"));
        assert!(script.contains("  mp {0 0 1}\n"));
    }

    #[test]
    fn time_dependence_emits_lookup_procedure() {
        let evolver = Evolver::new(EvolverKind::Slonczewski)
            .with_time_dependence(|t| if t < 2e-12 { 1.0 } else { 0.0 }, 1e-12);
        let script = lower(&evolver, Some(4e-12)).expect("evolver should lower");

        assert!(script.contains("proc TimeFunction_evolver { total_time } {"));
        assert!(script.contains("set values {1 1 0 0 0}"));
        assert!(script.contains("  J_profile TimeFunction_evolver\n"));
        assert!(script.contains("  J_profile_args total_time\n"));
        let procedure = script.find("proc TimeFunction_evolver").expect("procedure should be present");
        let block = script.find("Specify Oxs_SpinXferEvolve").expect("block should be present");
        assert!(procedure < block);
    }

    #[test]
    fn time_dependence_needs_a_profiled_evolver() {
        let evolver = Evolver::new(EvolverKind::RungeKutta).with_time_dependence(|_| 1.0, 1e-12);
        let error = lower(&evolver, Some(1e-11)).expect_err("RK has no current profile");
        assert_eq!(error.placeholder(), "INPUT.TIME_DEPENDENCE");
    }

    #[test]
    fn raw_procedure_is_injected_verbatim() {
        let evolver = Evolver::new(EvolverKind::SpinTransfer).with_tcl_procedure(TclProcedure {
            script: "proc pulse { t } { return 1 }".to_string(),
            name: "pulse".to_string(),
            args: "total_time".to_string(),
        });
        let script = lower(&evolver, Some(1e-11)).expect("evolver should lower");

        assert!(script.starts_with("proc pulse { t } { return 1 }\n\n"));
        assert!(script.contains("  u_profile pulse\n"));
        assert!(script.contains("  u_profile_args total_time\n"));
    }
}
