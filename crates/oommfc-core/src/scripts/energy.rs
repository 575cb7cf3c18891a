use super::parameter::{lower_scalar, lower_vector, scalar_default, validate_region};
use super::serialization::{format_number, format_vector, nested, specify};
use super::system::LoweringContext;
use super::wave::wave_procedure;
use crate::domain::{
    CrystalClass, CubicAnisotropy, Demag, Dmi, Energy, Exchange, LoweringResult, MagnetoElastic,
    OommfcError, Parameter, Platform, RegionMap, Rkky, Term, UniaxialAnisotropy, WaveKind, Zeeman,
};
use std::collections::BTreeMap;

pub fn energy_script(context: &mut LoweringContext<'_>, energy: &Energy) -> LoweringResult<String> {
    let mut script = String::new();
    for term in &energy.terms {
        script.push_str(&term_script(context, term)?);
    }
    Ok(script)
}

pub fn term_script(context: &mut LoweringContext<'_>, term: &Term) -> LoweringResult<String> {
    match term {
        Term::Exchange(term) => exchange_script(context, term),
        Term::Zeeman(term) => zeeman_script(context, term),
        Term::Demag(term) => demag_script(term),
        Term::Dmi(term) => dmi_script(context, term),
        Term::UniaxialAnisotropy(term) => uniaxial_script(context, term),
        Term::CubicAnisotropy(term) => cubic_script(context, term),
        Term::MagnetoElastic(term) => mel_script(context, term),
        Term::Rkky(term) => rkky_script(context, term),
    }
}

fn exchange_script(context: &mut LoweringContext<'_>, term: &Exchange) -> LoweringResult<String> {
    match &term.a {
        Parameter::Constant(a) => {
            if !(*a > 0.0) {
                return Err(OommfcError::invalid_parameter(
                    "INPUT.EXCHANGE_A",
                    format!("exchange constant of '{}' must be positive, got {a}", term.name),
                ));
            }
            Ok(specify(
                "Oxs_UniformExchange",
                Some(&term.name),
                &[format!("A {}", format_number(*a)?)],
            ))
        }
        Parameter::PerRegion(map) => {
            let rows = pair_table(context, map, &term.name)?;
            Ok(specify(
                "Oxs_Exchange6Ngbr",
                Some(&term.name),
                &[
                    format!("default_A {}", format_number(scalar_default(map, &term.name)?)?),
                    "atlas :main_atlas".to_string(),
                    nested("A", &rows),
                ],
            ))
        }
        Parameter::FieldValued(_) => {
            let a = lower_scalar(context, &term.a, &format!("{}_A", term.name))?;
            let mut script = a.fragment;
            script.push_str(&specify(
                "Oxs_ExchangePtwise",
                Some(&term.name),
                &[format!("A {}", a.token)],
            ));
            Ok(script)
        }
        Parameter::ConstantVector(_) => Err(OommfcError::invalid_parameter(
            "INPUT.PARAMETER_ARITY",
            format!("exchange constant of '{}' must be a scalar", term.name),
        )),
    }
}

/// Rows `r1 r2 value` of an inter-region table, keys canonicalised to sorted pairs.
fn pair_table(
    context: &LoweringContext<'_>,
    map: &RegionMap,
    name: &str,
) -> LoweringResult<Vec<String>> {
    let mut pairs: BTreeMap<(String, String), f64> = BTreeMap::new();
    for (key, value) in map.iter() {
        let (first, second) = key.split_once(':').unwrap_or((key, key));
        let (first, second) = (first.trim(), second.trim());
        validate_region(context, name, first)?;
        validate_region(context, name, second)?;
        let value = value.as_scalar().ok_or_else(|| {
            OommfcError::invalid_parameter(
                "INPUT.PARAMETER_ARITY",
                format!("entry '{key}' of '{name}' must be a scalar"),
            )
        })?;
        let pair = if first <= second {
            (first.to_string(), second.to_string())
        } else {
            (second.to_string(), first.to_string())
        };
        if pairs.insert(pair.clone(), value).is_some() {
            return Err(OommfcError::invalid_parameter(
                "INPUT.REGION_PAIR",
                format!(
                    "'{name}' sets the coupling between '{}' and '{}' more than once",
                    pair.0, pair.1
                ),
            ));
        }
    }
    pairs
        .into_iter()
        .map(|((first, second), value)| Ok(format!("{first} {second} {}", format_number(value)?)))
        .collect()
}

fn zeeman_script(context: &mut LoweringContext<'_>, term: &Zeeman) -> LoweringResult<String> {
    let h = lower_vector(context, &term.h, &format!("{}_H", term.name))?;
    let mut script = h.fragment;

    let wave = term.wave.unwrap_or(WaveKind::Constant);
    let procedure_name = format!("TimeFunction_{}", term.name);
    let Some(procedure) = wave_procedure(&procedure_name, wave) else {
        script.push_str(&specify(
            "Oxs_FixedZeeman",
            Some(&term.name),
            &[format!("field {}", h.token)],
        ));
        return Ok(script);
    };

    let f = term.f.ok_or_else(|| {
        OommfcError::bad_term_configuration(
            "INPUT.ZEEMAN_WAVE",
            format!("time-varying Zeeman term '{}' needs a frequency f", term.name),
        )
    })?;
    let t0 = term.t0.unwrap_or(0.0);
    script.push_str(&procedure);
    script.push_str(&specify(
        "Oxs_TransformZeeman",
        Some(&term.name),
        &[
            "type diagonal".to_string(),
            "script_args {stage stage_time total_time}".to_string(),
            format!(
                "script {{{procedure_name} {} {}}}",
                format_number(f)?,
                format_number(t0)?
            ),
            format!("field {}", h.token),
        ],
    ));
    Ok(script)
}

fn demag_script(term: &Demag) -> LoweringResult<String> {
    let mut lines = Vec::new();
    if let Some(radius) = term.asymptotic_radius {
        lines.push(format!("asymptotic_radius {}", format_number(radius)?));
    }
    Ok(specify("Oxs_Demag", Some(&term.name), &lines))
}

pub(super) fn dmi_class(crystalclass: CrystalClass, platform: Platform) -> LoweringResult<&'static str> {
    match (crystalclass, platform) {
        (CrystalClass::Cnv, Platform::Unix) => Ok("Oxs_DMI_Cnv"),
        (CrystalClass::T | CrystalClass::O, Platform::Unix) => Ok("Oxs_DMI_T"),
        (CrystalClass::D2d, Platform::Unix) => Ok("Oxs_DMI_D2d"),
        (CrystalClass::Cnv, Platform::Windows) => Ok("Oxs_DMExchange6Ngbr"),
        (other, Platform::Windows) => Err(OommfcError::unsupported_on_platform(
            "INPUT.DMI_CRYSTALCLASS",
            format!(
                "DMI crystal class {} is not available on {}",
                other.as_str(),
                Platform::Windows
            ),
        )),
    }
}

fn dmi_script(context: &mut LoweringContext<'_>, term: &Dmi) -> LoweringResult<String> {
    let class = dmi_class(term.crystalclass, context.platform)?;
    let (default, rows) = match &term.d {
        Parameter::Constant(d) => {
            let value = format_number(*d)?;
            let names: Vec<&str> = if context.mesh.subregions.is_empty() {
                vec!["main"]
            } else {
                context.mesh.subregions.keys().map(String::as_str).collect()
            };
            let mut rows = Vec::new();
            for (index, first) in names.iter().enumerate() {
                for second in &names[index..] {
                    rows.push(format!("{first} {second} {value}"));
                }
            }
            (*d, rows)
        }
        Parameter::PerRegion(map) => (
            scalar_default(map, &term.name)?,
            pair_table(context, map, &term.name)?,
        ),
        other => {
            return Err(OommfcError::invalid_parameter(
                "INPUT.DMI_D",
                format!(
                    "DMI constant of '{}' must be a constant or per-region map, got a {}",
                    term.name,
                    other.kind_name()
                ),
            ));
        }
    };
    Ok(specify(
        class,
        Some(&term.name),
        &[
            format!("default_D {}", format_number(default)?),
            "atlas :main_atlas".to_string(),
            nested("D", &rows),
        ],
    ))
}

fn uniaxial_script(
    context: &mut LoweringContext<'_>,
    term: &UniaxialAnisotropy,
) -> LoweringResult<String> {
    let k1 = lower_scalar(context, &term.k1, &format!("{}_K1", term.name))?;
    let u = lower_vector(context, &term.u, &format!("{}_u", term.name))?;
    let mut script = k1.fragment;
    script.push_str(&u.fragment);

    match &term.k2 {
        None => script.push_str(&specify(
            "Oxs_UniaxialAnisotropy",
            Some(&term.name),
            &[format!("K1 {}", k1.token), format!("axis {}", u.token)],
        )),
        Some(k2) => {
            let k2 = lower_scalar(context, k2, &format!("{}_K2", term.name))?;
            script.push_str(&k2.fragment);
            script.push_str(&specify(
                "Southampton_UniaxialAnisotropy4",
                Some(&term.name),
                &[
                    format!("K1 {}", k1.token),
                    format!("K2 {}", k2.token),
                    format!("axis {}", u.token),
                ],
            ));
        }
    }
    Ok(script)
}

fn cubic_script(context: &mut LoweringContext<'_>, term: &CubicAnisotropy) -> LoweringResult<String> {
    let k1 = lower_scalar(context, &term.k1, &format!("{}_K1", term.name))?;
    let u1 = lower_vector(context, &term.u1, &format!("{}_u1", term.name))?;
    let u2 = lower_vector(context, &term.u2, &format!("{}_u2", term.name))?;
    let mut script = k1.fragment;
    script.push_str(&u1.fragment);
    script.push_str(&u2.fragment);
    script.push_str(&specify(
        "Oxs_CubicAnisotropy",
        Some(&term.name),
        &[
            format!("K1 {}", k1.token),
            format!("axis1 {}", u1.token),
            format!("axis2 {}", u2.token),
        ],
    ));
    Ok(script)
}

fn mel_script(context: &mut LoweringContext<'_>, term: &MagnetoElastic) -> LoweringResult<String> {
    let b1 = lower_scalar(context, &term.b1, &format!("{}_B1", term.name))?;
    let b2 = lower_scalar(context, &term.b2, &format!("{}_B2", term.name))?;
    let e_diag = lower_vector(context, &term.e_diag, &format!("{}_e_diag", term.name))?;
    let e_offdiag = lower_vector(context, &term.e_offdiag, &format!("{}_e_offdiag", term.name))?;
    let mut script = String::new();
    for fragment in [&b1.fragment, &b2.fragment, &e_diag.fragment, &e_offdiag.fragment] {
        script.push_str(fragment);
    }
    script.push_str(&specify(
        "YY_FixedMEL",
        Some(&term.name),
        &[
            format!("B1 {}", b1.token),
            format!("B2 {}", b2.token),
            format!("e_diag_field {}", e_diag.token),
            format!("e_offdiag_field {}", e_offdiag.token),
        ],
    ));
    Ok(script)
}

fn rkky_script(context: &mut LoweringContext<'_>, term: &Rkky) -> LoweringResult<String> {
    let lookup = |name: &str| {
        context.mesh.subregions.get(name).copied().ok_or_else(|| {
            OommfcError::bad_term_configuration(
                "INPUT.RKKY_SUBREGION",
                format!("term '{}' references unknown subregion '{name}'", term.name),
            )
        })
    };
    let [name_a, name_b] = &term.subregions;
    let (region_a, region_b) = (lookup(name_a)?, lookup(name_b)?);
    let tolerance = context.mesh.tolerance();

    let mut faces = Vec::new();
    for axis in 0..3 {
        let overlapping = (0..3).filter(|other| *other != axis).all(|other| {
            region_a.p2[other].min(region_b.p2[other]) - region_a.p1[other].max(region_b.p1[other])
                > tolerance
        });
        if !overlapping {
            continue;
        }
        if (region_a.p2[axis] - region_b.p1[axis]).abs() <= tolerance {
            faces.push((axis, (name_a, region_a), (name_b, region_b)));
        } else if (region_b.p2[axis] - region_a.p1[axis]).abs() <= tolerance {
            faces.push((axis, (name_b, region_b), (name_a, region_a)));
        }
    }

    let [(axis, (first, first_region), (second, second_region))] = faces[..] else {
        return Err(OommfcError::bad_term_configuration(
            "INPUT.RKKY_GEOMETRY",
            format!(
                "subregions '{name_a}' and '{name_b}' of term '{}' must share exactly one face",
                term.name
            ),
        ));
    };

    let mut direction = [0.0; 3];
    direction[axis] = 1.0;
    let field_name = format!("{}_field", term.name);
    let surface = |key: &str, region: &str, value: f64, side: &str| -> LoweringResult<String> {
        Ok(nested(
            key,
            &[
                "atlas :main_atlas".to_string(),
                format!("region {region}"),
                format!("scalarfield :{field_name}"),
                format!("scalarvalue {}", format_number(value)?),
                format!("scalarside {side}"),
            ],
        ))
    };

    let mut script = specify(
        "Oxs_LinearScalarField",
        Some(&field_name),
        &[format!("vector {}", format_vector(direction)?), "norm 1".to_string()],
    );
    script.push_str(&specify(
        "Oxs_TwoSurfaceExchange",
        Some(&term.name),
        &[
            format!("sigma {}", format_number(term.sigma)?),
            format!("sigma2 {}", format_number(term.sigma2)?),
            surface("surface1", first, first_region.p2[axis], "-")?,
            surface("surface2", second, second_region.p1[axis], "+")?,
        ],
    ));
    Ok(script)
}
