use super::evolver::{bind_dynamics, evolver_script};
use super::serialization::{format_number, nested, specify};
use super::system::{LoweringContext, ScriptOptions};
use crate::domain::{
    Attribute, DriveIntent, Dynamics, Evolver, EvolverKind, HStep, LoweringResult, OommfcError,
    Problem,
};

const DEFAULT_STOPPING_MXHXM: f64 = 0.1;

/// Evolver a time drive uses when the caller supplies none.
fn time_evolver(dynamics: &Dynamics) -> Evolver {
    if dynamics.zhang_li().is_some() {
        Evolver::new(EvolverKind::SpinTransfer)
    } else if dynamics.slonczewski().is_some() {
        Evolver::new(EvolverKind::Slonczewski)
    } else {
        Evolver::new(EvolverKind::RungeKutta)
    }
}

fn select_evolver(intent: &DriveIntent, dynamics: &Dynamics) -> Evolver {
    if let Some(evolver) = intent.evolver() {
        return evolver.clone();
    }
    match intent {
        DriveIntent::TimeEvolve(_) => time_evolver(dynamics),
        DriveIntent::Minimise(_) | DriveIntent::Sweep(_) => {
            Evolver::new(EvolverKind::ConjugateGradient)
        }
    }
}

fn fixed_spins(context: &LoweringContext<'_>, subregions: &[String]) -> LoweringResult<Option<String>> {
    if subregions.is_empty() {
        return Ok(None);
    }
    let known = context.mesh.region_names();
    for name in subregions {
        if !known.contains(&name.as_str()) || name == "entire" {
            return Err(OommfcError::invalid_parameter(
                "INPUT.FIXED_SUBREGION",
                format!(
                    "cannot fix spins in unknown subregion '{name}', expected one of {}",
                    known.join(", ")
                ),
            ));
        }
    }
    Ok(Some(format!("{{:main_atlas {}}}", subregions.join(" "))))
}

fn magnetisation_lines() -> Vec<String> {
    vec![
        "evolver :evolver".to_string(),
        "mesh :mesh".to_string(),
        "Ms :m0_norm".to_string(),
        "m0 :m0".to_string(),
    ]
}

fn hysteresis_zeeman(hsteps: &[HStep]) -> LoweringResult<String> {
    let mut rows = Vec::with_capacity(hsteps.len());
    for step in hsteps {
        let mut entries = Vec::with_capacity(7);
        for component in step.h_start.iter().chain(&step.h_end) {
            entries.push(format_number(*component)?);
        }
        entries.push(step.n.saturating_sub(1).to_string());
        rows.push(format!("{{{}}}", entries.join(" ")));
    }
    Ok(specify("Oxs_UZeeman", Some("hysteresis"), &[nested("Hrange", &rows)]))
}

/// Emits the evolver, the driver block and the output schedule for `intent`.
pub fn driver_script(
    context: &mut LoweringContext<'_>,
    problem: &Problem,
    intent: &DriveIntent,
    options: &ScriptOptions,
) -> LoweringResult<String> {
    let mut evolver = bind_dynamics(&select_evolver(intent, &problem.dynamics), &problem.dynamics)?;
    if let Some(fixed) = fixed_spins(context, &options.fixed_subregions)? {
        evolver
            .attributes
            .insert("fixed_spins".to_string(), Attribute::Text(fixed));
    }

    let mut script = String::new();
    let (driver_class, table_schedule) = match intent {
        DriveIntent::Minimise(minimise) => {
            script.push_str(&evolver_script(context, &evolver, None)?);
            let mut lines = magnetisation_lines();
            lines.push(format!(
                "stopping_mxHxm {}",
                format_number(minimise.stopping_mxhxm.unwrap_or(DEFAULT_STOPPING_MXHXM))?
            ));
            script.push_str(&specify("Oxs_MinDriver", None, &lines));
            ("Oxs_MinDriver", "Stage")
        }
        DriveIntent::Sweep(sweep) => {
            script.push_str(&hysteresis_zeeman(&sweep.hsteps)?);
            script.push_str(&evolver_script(context, &evolver, None)?);
            let mut lines = magnetisation_lines();
            lines.push(format!(
                "stopping_mxHxm {}",
                format_number(sweep.stopping_mxhxm.unwrap_or(DEFAULT_STOPPING_MXHXM))?
            ));
            script.push_str(&specify("Oxs_MinDriver", None, &lines));
            ("Oxs_MinDriver", "Stage")
        }
        DriveIntent::TimeEvolve(time) => {
            script.push_str(&evolver_script(context, &evolver, Some(time.t))?);
            let mut lines = magnetisation_lines();
            lines.push(format!(
                "stopping_time {}",
                format_number(time.t / time.n as f64)?
            ));
            lines.push(format!("stage_count {}", time.n));
            if let Some(stopping_dm_dt) = time.stopping_dm_dt {
                lines.push(format!("stopping_dm_dt {}", format_number(stopping_dm_dt)?));
            }
            script.push_str(&specify("Oxs_TimeDriver", None, &lines));
            script.push_str("Destination archive mmArchive\n");
            let schedule = if options.output_step { "Step" } else { "Stage" };
            ("Oxs_TimeDriver", schedule)
        }
    };

    script.push_str("Destination table mmArchive\n");
    script.push_str("Destination mags mmArchive\n\n");
    script.push_str(&format!("Schedule DataTable table {table_schedule} 1\n"));
    script.push_str(&format!("Schedule {driver_class}::Magnetization mags Stage 1\n"));
    if let Some(compute) = &options.compute {
        script.push_str(compute);
        if !compute.ends_with('\n') {
            script.push('\n');
        }
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::driver_script;
    use crate::domain::{
        Damping, DriveIntent, Dynamics, Evolver, EvolverKind, HStep, MinimiseIntent,
        OommfcErrorCategory, Platform, Precession, Problem, Slonczewski, ZhangLi,
    };
    use crate::field::{Field, Mesh, Region};
    use crate::scripts::{LoweringContext, ScriptOptions};

    fn problem(dynamics: Dynamics) -> Problem {
        let mesh = Mesh::new(
            Region::new([0.0, 0.0, 0.0], [2e-9, 1e-9, 1e-9]).expect("region should be valid"),
            [1e-9, 1e-9, 1e-9],
        )
        .and_then(|mesh| {
            mesh.with_subregion(
                "left",
                Region::new([0.0, 0.0, 0.0], [1e-9, 1e-9, 1e-9]).expect("region should be valid"),
            )
        })
        .and_then(|mesh| {
            mesh.with_subregion(
                "right",
                Region::new([1e-9, 0.0, 0.0], [2e-9, 1e-9, 1e-9]).expect("region should be valid"),
            )
        })
        .expect("mesh should be valid");
        let m = Field::uniform(mesh, &[0.0, 0.0, 1e6]).expect("field should build");
        Problem::new("driver", m).with_dynamics(dynamics)
    }

    fn lower(
        problem: &Problem,
        intent: &DriveIntent,
        options: &ScriptOptions,
    ) -> crate::domain::LoweringResult<String> {
        let mut context = LoweringContext::new(problem.mesh(), Platform::Unix);
        driver_script(&mut context, problem, intent, options)
    }

    #[test]
    fn minimise_defaults_to_cg_and_mxhxm() {
        let script = lower(
            &problem(Dynamics::new()),
            &DriveIntent::minimise(),
            &ScriptOptions::default(),
        )
        .expect("minimise should lower");

        assert!(script.contains("Specify Oxs_CGEvolve:evolver {}"));
        assert!(script.contains(
            "Specify Oxs_MinDriver {\n  evolver :evolver\n  mesh :mesh\n  Ms :m0_norm\n  m0 :m0\n  stopping_mxHxm 0.1\n}"
        ));
        assert!(script.contains("Schedule DataTable table Stage 1\n"));
        assert!(script.contains("Schedule Oxs_MinDriver::Magnetization mags Stage 1\n"));
        assert!(!script.contains("Destination archive"));
    }

    #[test]
    fn caller_stopping_criterion_is_kept() {
        let intent = DriveIntent::Minimise(MinimiseIntent {
            stopping_mxhxm: Some(0.01),
            evolver: Some(Evolver::new(EvolverKind::ConjugateGradient)),
        });
        let script = lower(&problem(Dynamics::new()), &intent, &ScriptOptions::default())
            .expect("minimise should lower");
        assert!(script.contains("  stopping_mxHxm 0.01\n"));
    }

    #[test]
    fn time_evolve_splits_time_into_stages() {
        let dynamics = Dynamics::new()
            .with(Precession::new(2.211e5))
            .with(Damping::new(0.1));
        let script = lower(
            &problem(dynamics),
            &DriveIntent::time_evolve(1e-12, 5),
            &ScriptOptions::default(),
        )
        .expect("time drive should lower");

        assert_eq!(script.matches("Specify Oxs_TimeDriver").count(), 1);
        assert_eq!(script.matches("Oxs_RungeKuttaEvolve").count(), 1);
        assert!(script.contains("  stopping_time 2e-13\n"));
        assert!(script.contains("  stage_count 5\n"));
        assert!(script.contains("Destination archive mmArchive\n"));
        assert!(script.contains("Schedule Oxs_TimeDriver::Magnetization mags Stage 1\n"));
    }

    #[test]
    fn time_evolve_picks_evolver_from_dynamics() {
        let zhang_li = lower(
            &problem(Dynamics::new().with(ZhangLi::new(400.0, 0.5))),
            &DriveIntent::time_evolve(1e-12, 1),
            &ScriptOptions::default(),
        )
        .expect("zhang-li drive should lower");
        assert!(zhang_li.contains("Specify Anv_SpinTEvolve:evolver"));

        let slonczewski = lower(
            &problem(Dynamics::new().with(Slonczewski::new(1e12, [0.0, 0.0, 1.0], 0.4, 2.0))),
            &DriveIntent::time_evolve(1e-12, 1),
            &ScriptOptions::default(),
        )
        .expect("slonczewski drive should lower");
        assert!(slonczewski.contains("Specify Oxs_SpinXferEvolve:evolver"));
    }

    #[test]
    fn output_step_schedules_table_every_step() {
        let options = ScriptOptions {
            output_step: true,
            ..ScriptOptions::default()
        };
        let script = lower(
            &problem(Dynamics::new()),
            &DriveIntent::time_evolve(1e-12, 2),
            &options,
        )
        .expect("time drive should lower");
        assert!(script.contains("Schedule DataTable table Step 1\n"));
    }

    #[test]
    fn fixed_subregions_pin_spins_on_the_evolver() {
        let options = ScriptOptions {
            fixed_subregions: vec!["left".to_string()],
            ..ScriptOptions::default()
        };
        let script = lower(&problem(Dynamics::new()), &DriveIntent::minimise(), &options)
            .expect("minimise should lower");
        assert!(script.contains("  fixed_spins {:main_atlas left}\n"));

        let options = ScriptOptions {
            fixed_subregions: vec!["middle".to_string()],
            ..ScriptOptions::default()
        };
        let error = lower(&problem(Dynamics::new()), &DriveIntent::minimise(), &options)
            .expect_err("unknown subregion should fail");
        assert_eq!(error.category(), OommfcErrorCategory::InvalidParameter);
    }

    #[test]
    fn sweep_emits_hysteresis_zeeman() {
        let intent = DriveIntent::sweep(vec![
            HStep::new([0.0, 0.0, 1e6], [0.0, 0.0, -1e6], 3),
            HStep::new([0.0, 0.0, -1e6], [0.0, 0.0, 1e6], 3),
        ]);
        let script = lower(&problem(Dynamics::new()), &intent, &ScriptOptions::default())
            .expect("sweep should lower");

        assert!(script.contains("Specify Oxs_UZeeman:hysteresis {\n  Hrange {\n"));
        assert!(script.contains("    {0 0 1000000 0 0 -1000000 2}\n"));
        assert!(script.contains("    {0 0 -1000000 0 0 1000000 2}\n"));
        assert!(script.contains("Specify Oxs_MinDriver {"));
    }

    #[test]
    fn compute_directive_is_appended_verbatim() {
        let options = ScriptOptions {
            compute: Some("Schedule \"Oxs_Demag::Field\" archive Step 1".to_string()),
            ..ScriptOptions::default()
        };
        let script = lower(
            &problem(Dynamics::new()),
            &DriveIntent::time_evolve(1e-25, 1),
            &options,
        )
        .expect("time drive should lower");
        assert!(script.ends_with("Schedule \"Oxs_Demag::Field\" archive Step 1\n"));
    }
}
