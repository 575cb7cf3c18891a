use std::collections::HashMap;
use tracing::debug;

/// Short group name of an energy class, used as `E_<group>`.
fn energy_group(class: &str) -> Option<&'static str> {
    let group = match class {
        "Oxs_UniformExchange" | "Oxs_Exchange6Ngbr" | "Oxs_ExchangePtwise" => "exchange",
        "Oxs_FixedZeeman" | "Oxs_TransformZeeman" | "Oxs_UZeeman" => "zeeman",
        "Oxs_Demag" => "demag",
        "Oxs_DMI_Cnv" | "Oxs_DMI_T" | "Oxs_DMI_D2d" | "Oxs_DMExchange6Ngbr" => "dmi",
        "Oxs_UniaxialAnisotropy" | "Southampton_UniaxialAnisotropy4" => "uniaxialanisotropy",
        "Oxs_CubicAnisotropy" => "cubicanisotropy",
        "YY_FixedMEL" => "mel",
        "Oxs_TwoSurfaceExchange" => "rkky",
        _ => return None,
    };
    Some(group)
}

fn is_evolver(class: &str) -> bool {
    matches!(
        class,
        "Oxs_CGEvolve"
            | "Oxs_RungeKuttaEvolve"
            | "Oxs_EulerEvolve"
            | "Anv_SpinTEvolve"
            | "Oxs_SpinXferEvolve"
            | "UHH_ThetaEvolve"
    )
}

fn is_driver(class: &str) -> bool {
    matches!(class, "Oxs_MinDriver" | "Oxs_TimeDriver")
}

fn evolver_column(suffix: &str) -> Option<&'static str> {
    let short = match suffix {
        "Total energy" => "E",
        "Energy calc count" => "E_calc_count",
        "Max mxHxm" => "max_mxHxm",
        "Max dm/dt" => "max_dmdt",
        "dE/dt" => "dE/dt",
        "Delta E" => "delta_E",
        "Bracket count" => "bracket_count",
        "Line min count" => "line_min_count",
        "Conjugate cycle count" => "conjugate_cycle_count",
        "Cycle count" => "cycle_count",
        "Cycle sub count" => "cycle_sub_count",
        "Temperature" => "T",
        "average u" => "average_u",
        "average J" => "average_J",
        _ => return None,
    };
    Some(short)
}

fn driver_column(suffix: &str) -> Option<&'static str> {
    let short = match suffix {
        "Iteration" => "iteration",
        "Stage iteration" => "stage_iteration",
        "Stage" => "stage",
        "mx" => "mx",
        "my" => "my",
        "mz" => "mz",
        "Last time step" => "last_time_step",
        "Simulation time" => "t",
        _ => return None,
    };
    Some(short)
}

fn energy_column(group: &str, suffix: &str) -> Option<String> {
    let short = match suffix {
        "Energy" => return Some(format!("E_{group}")),
        "Max Spin Ang" => "max_spin_ang",
        "Stage Max Spin Ang" => "stage_max_spin_ang",
        "Run Max Spin Ang" => "run_max_spin_ang",
        "Bx" | "By" | "Bz" | "B" if group == "zeeman" => suffix,
        _ => return None,
    };
    Some(short.to_string())
}

fn split_column(column: &str) -> (&str, &str, &str) {
    let Some((prefix, rest)) = column.split_once(':') else {
        return (column, "", "");
    };
    match rest.rsplit_once(':') {
        Some((middle, suffix)) => (prefix, middle, suffix),
        None => (prefix, "", rest),
    }
}

/// Short name for an engine column keyed by its class prefix and quantity suffix.
pub fn short_name(column: &str) -> Option<String> {
    let (prefix, _, suffix) = split_column(column);
    if is_evolver(prefix) {
        evolver_column(suffix).map(str::to_string)
    } else if is_driver(prefix) {
        driver_column(suffix).map(str::to_string)
    } else {
        energy_group(prefix).and_then(|group| energy_column(group, suffix))
    }
}

/// Renames known columns; a short name emitted by several instances gets `_<instance>` appended.
pub fn rename_columns(columns: &[String]) -> Vec<String> {
    let shorts: Vec<Option<String>> = columns.iter().map(|column| short_name(column)).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for short in shorts.iter().flatten() {
        *counts.entry(short.as_str()).or_default() += 1;
    }

    columns
        .iter()
        .zip(&shorts)
        .map(|(column, short)| match short {
            None => column.clone(),
            Some(short) if counts.get(short.as_str()).copied().unwrap_or(0) > 1 => {
                let (_, middle, _) = split_column(column);
                if middle.is_empty() {
                    short.clone()
                } else {
                    debug!(column = %column, short = %short, instance = %middle, "disambiguating column");
                    format!("{short}_{middle}")
                }
            }
            Some(short) => short.clone(),
        })
        .collect()
}
