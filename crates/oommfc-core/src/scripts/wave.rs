use super::serialization::format_number;
use crate::domain::{LoweringResult, OommfcError, WaveKind};

/// Procedure returning `{s s s s' s' s'}` for a Zeeman field scaled by a time wave.
pub fn wave_procedure(name: &str, wave: WaveKind) -> Option<String> {
    let body: &[&str] = match wave {
        WaveKind::Constant => return None,
        WaveKind::Sin => &[
            "set w [expr {2*$PI*$f}]",
            "set tt [expr {$totaltime - $t0}]",
            "set wave [expr {sin($w*$tt)}]",
            "set dwave [expr {$w*cos($w*$tt)}]",
        ],
        WaveKind::Sinc => &[
            "set w [expr {2*$PI*$f}]",
            "set tt [expr {$totaltime - $t0}]",
            "set x [expr {$w*$tt}]",
            "if {$x == 0} {",
            "  return [list 1 1 1 0 0 0]",
            "}",
            "set wave [expr {sin($x)/$x}]",
            "set dwave [expr {$w*(cos($x)/$x - sin($x)/($x*$x))}]",
        ],
    };

    let mut procedure = format!("proc {name} {{ f t0 stage stagetime totaltime }} {{\n");
    procedure.push_str("  set PI [expr {4*atan(1.0)}]\n");
    for line in body {
        procedure.push_str("  ");
        procedure.push_str(line);
        procedure.push('\n');
    }
    procedure.push_str("  return [list $wave $wave $wave $dwave $dwave $dwave]\n}\n\n");
    Some(procedure)
}

/// Tabulates `samples` at `0, tstep, ...` and emits a clamped lookup on `total_time`.
pub fn lookup_procedure(name: &str, tstep: f64, samples: &[f64]) -> LoweringResult<String> {
    if samples.is_empty() {
        return Err(OommfcError::invalid_parameter(
            "INPUT.TIME_DEPENDENCE",
            "time dependence produced no samples",
        ));
    }
    let values = samples
        .iter()
        .map(|sample| format_number(*sample))
        .collect::<LoweringResult<Vec<_>>>()?
        .join(" ");

    let lines = [
        format!("proc {name} {{ total_time }} {{"),
        format!("  set tstep {}", format_number(tstep)?),
        format!("  set values {{{values}}}"),
        "  set index [expr {int(round($total_time/$tstep))}]".to_string(),
        "  set last [expr {[llength $values] - 1}]".to_string(),
        "  if {$index < 0} { set index 0 }".to_string(),
        "  if {$index > $last} { set index $last }".to_string(),
        "  return [lindex $values $index]".to_string(),
        "}".to_string(),
    ];
    Ok(format!("{}\n\n", lines.join("\n")))
}

/// Sample times `0, tstep, 2 tstep, ...` up to and including `total`.
pub fn sample_times(tstep: f64, total: f64) -> LoweringResult<Vec<f64>> {
    if !(tstep.is_finite() && tstep > 0.0) {
        return Err(OommfcError::invalid_parameter(
            "INPUT.TIME_DEPENDENCE",
            format!("tstep must be positive, got {tstep}"),
        ));
    }
    let steps = (total / tstep - 1e-9).ceil().max(0.0) as usize;
    Ok((0..=steps)
        .map(|index| {
            if index == steps {
                total
            } else {
                index as f64 * tstep
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{lookup_procedure, sample_times, wave_procedure};
    use crate::domain::WaveKind;

    #[test]
    fn constant_wave_needs_no_procedure() {
        assert!(wave_procedure("TimeFunction_zeeman", WaveKind::Constant).is_none());
    }

    #[test]
    fn sin_procedure_returns_six_element_list() {
        let procedure = wave_procedure("TimeFunction_zeeman", WaveKind::Sin)
            .expect("sin should emit a procedure");
        assert!(procedure.starts_with("proc TimeFunction_zeeman { f t0 stage stagetime totaltime } {\n"));
        assert!(procedure.contains("set wave [expr {sin($w*$tt)}]"));
        assert!(procedure.contains("return [list $wave $wave $wave $dwave $dwave $dwave]"));
    }

    #[test]
    fn sinc_zero_branch_returns_unit_value_and_zero_slope() {
        let procedure = wave_procedure("TimeFunction_pulse", WaveKind::Sinc)
            .expect("sinc should emit a procedure");
        let guard = procedure
            .find("if {$x == 0}")
            .expect("zero guard should be present");
        let division = procedure
            .find("sin($x)/$x")
            .expect("division should be present");
        assert!(guard < division);
        assert!(procedure.contains("return [list 1 1 1 0 0 0]"));
    }

    #[test]
    fn samples_include_the_end_time() {
        let times = sample_times(1e-12, 5e-12).expect("samples should build");
        assert_eq!(times.len(), 6);
        assert_eq!(times[0], 0.0);
        assert_eq!(times[5], 5e-12);

        let times = sample_times(2e-12, 5e-12).expect("samples should build");
        assert_eq!(times.len(), 4);
        assert_eq!(times[3], 5e-12);
    }

    #[test]
    fn lookup_procedure_tabulates_values() {
        let procedure =
            lookup_procedure("TimeFunction_evolver", 1e-12, &[1.0, 0.5, 0.0]).expect("lookup should build");
        assert!(procedure.starts_with("proc TimeFunction_evolver { total_time } {\n"));
        assert!(procedure.contains("set tstep 1e-12\n"));
        assert!(procedure.contains("set values {1 0.5 0}\n"));
    }
}
