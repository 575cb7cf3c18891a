use super::serialization::{format_number, format_vector, nested, specify};
use super::system::LoweringContext;
use crate::domain::{LoweringResult, OommfcError, Parameter, RegionMap, Value};
use crate::field::Field;

/// Lowered parameter: declarations to place before the consumer, and the token it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredParameter {
    pub fragment: String,
    pub token: String,
}

impl LoweredParameter {
    fn literal(token: String) -> Self {
        Self {
            fragment: String::new(),
            token,
        }
    }
}

pub fn lower_scalar(
    context: &mut LoweringContext<'_>,
    value: &Parameter,
    name: &str,
) -> LoweringResult<LoweredParameter> {
    match value {
        Parameter::Constant(value) => Ok(LoweredParameter::literal(format_number(*value)?)),
        Parameter::ConstantVector(_) => Err(arity_error(name, "scalar", value)),
        Parameter::PerRegion(map) => {
            let mut rows = Vec::with_capacity(map.values.len());
            for (region, entry) in map.iter() {
                validate_region(context, name, region)?;
                let entry = entry
                    .as_scalar()
                    .ok_or_else(|| arity_error(name, "scalar", value))?;
                rows.push(format!("{region} {}", format_number(entry)?));
            }
            let default = match map.default {
                None => 0.0,
                Some(default) => default
                    .as_scalar()
                    .ok_or_else(|| arity_error(name, "scalar", value))?,
            };
            let fragment = specify(
                "Oxs_AtlasScalarField",
                Some(name),
                &[
                    "atlas :main_atlas".to_string(),
                    format!("default_value {}", format_number(default)?),
                    nested("values", &rows),
                ],
            );
            Ok(LoweredParameter {
                fragment,
                token: format!(":{name}"),
            })
        }
        Parameter::FieldValued(field) => {
            require_field(context, field, name, 1)?;
            context.add_sidecar(format!("{name}.ovf"), field.clone(), true);
            let mut fragment = file_vector_field(name);
            fragment.push_str(&specify(
                "Oxs_VecMagScalarField",
                Some(&format!("{name}_norm")),
                &[format!("field :{name}")],
            ));
            Ok(LoweredParameter {
                fragment,
                token: format!(":{name}_norm"),
            })
        }
    }
}

pub fn lower_vector(
    context: &mut LoweringContext<'_>,
    value: &Parameter,
    name: &str,
) -> LoweringResult<LoweredParameter> {
    match value {
        Parameter::Constant(_) => Err(arity_error(name, "vector", value)),
        Parameter::ConstantVector(vector) => Ok(LoweredParameter::literal(format_vector(*vector)?)),
        Parameter::PerRegion(map) => {
            let mut rows = Vec::with_capacity(map.values.len());
            for (region, entry) in map.iter() {
                validate_region(context, name, region)?;
                let entry = entry
                    .as_vector()
                    .ok_or_else(|| arity_error(name, "vector", value))?;
                rows.push(format!("{region} {}", format_vector(entry)?));
            }
            let default = match map.default {
                None => [0.0; 3],
                Some(default) => default
                    .as_vector()
                    .ok_or_else(|| arity_error(name, "vector", value))?,
            };
            let fragment = specify(
                "Oxs_AtlasVectorField",
                Some(name),
                &[
                    "atlas :main_atlas".to_string(),
                    format!("default_value {}", format_vector(default)?),
                    nested("values", &rows),
                ],
            );
            Ok(LoweredParameter {
                fragment,
                token: format!(":{name}"),
            })
        }
        Parameter::FieldValued(field) => {
            require_field(context, field, name, 3)?;
            context.add_sidecar(format!("{name}.ovf"), field.clone(), false);
            Ok(LoweredParameter {
                fragment: file_vector_field(name),
                token: format!(":{name}"),
            })
        }
    }
}

/// Scalar fallback of a region map, used by pair-table blocks.
pub(super) fn scalar_default(map: &RegionMap, name: &str) -> LoweringResult<f64> {
    match map.default {
        None => Ok(0.0),
        Some(Value::Scalar(value)) => Ok(value),
        Some(Value::Vector(_)) => Err(OommfcError::invalid_parameter(
            "INPUT.PARAMETER_ARITY",
            format!("default of '{name}' must be a scalar"),
        )),
    }
}

pub(super) fn validate_region(
    context: &LoweringContext<'_>,
    name: &str,
    region: &str,
) -> LoweringResult<()> {
    if context.mesh.region_names().contains(&region) {
        Ok(())
    } else {
        Err(OommfcError::invalid_parameter(
            "INPUT.REGION_KEY",
            format!(
                "'{name}' refers to region '{region}', expected one of {}",
                context.mesh.region_names().join(", ")
            ),
        ))
    }
}

fn file_vector_field(name: &str) -> String {
    specify(
        "Oxs_FileVectorField",
        Some(name),
        &[format!("file {name}.ovf"), "atlas :main_atlas".to_string()],
    )
}

fn require_field(
    context: &LoweringContext<'_>,
    field: &Field,
    name: &str,
    dim: usize,
) -> LoweringResult<()> {
    if field.dim != dim {
        return Err(OommfcError::invalid_parameter(
            "INPUT.PARAMETER_ARITY",
            format!(
                "field for '{name}' has {} components, expected {dim}",
                field.dim
            ),
        ));
    }
    field.validate()?;
    if field.mesh.n() != context.mesh.n() {
        return Err(OommfcError::invalid_parameter(
            "INPUT.PARAMETER_MESH",
            format!(
                "field for '{name}' is defined on {:?} cells, problem mesh has {:?}",
                field.mesh.n(),
                context.mesh.n()
            ),
        ));
    }
    Ok(())
}

fn arity_error(name: &str, expected: &str, value: &Parameter) -> OommfcError {
    OommfcError::invalid_parameter(
        "INPUT.PARAMETER_ARITY",
        format!(
            "'{name}' must be a {expected} parameter, got a {}",
            value.kind_name()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::{lower_scalar, lower_vector};
    use crate::domain::{OommfcErrorCategory, Parameter, Platform, RegionMap};
    use crate::field::{Field, Mesh, Region};
    use crate::scripts::LoweringContext;

    fn two_region_mesh() -> Mesh {
        Mesh::new(
            Region::new([0.0, 0.0, 0.0], [4e-9, 1e-9, 1e-9]).expect("region should be valid"),
            [1e-9, 1e-9, 1e-9],
        )
        .and_then(|mesh| {
            mesh.with_subregion(
                "r1",
                Region::new([0.0, 0.0, 0.0], [2e-9, 1e-9, 1e-9]).expect("region should be valid"),
            )
        })
        .and_then(|mesh| {
            mesh.with_subregion(
                "r2",
                Region::new([2e-9, 0.0, 0.0], [4e-9, 1e-9, 1e-9]).expect("region should be valid"),
            )
        })
        .expect("mesh should be valid")
    }

    #[test]
    fn constants_lower_to_literal_tokens() {
        let mesh = two_region_mesh();
        let mut context = LoweringContext::new(&mesh, Platform::Unix);

        let scalar = lower_scalar(&mut context, &Parameter::Constant(8e5), "Ms")
            .expect("scalar should lower");
        assert_eq!(scalar.fragment, "");
        assert_eq!(scalar.token, "800000");

        let vector = lower_vector(&mut context, &Parameter::ConstantVector([0.0, 0.0, 1.0]), "u")
            .expect("vector should lower");
        assert_eq!(vector.token, "{0 0 1}");
        assert!(context.sidecars().is_empty());
    }

    #[test]
    fn per_region_scalar_declares_atlas_field() {
        let mesh = two_region_mesh();
        let mut context = LoweringContext::new(&mesh, Platform::Unix);
        let value = Parameter::PerRegion(RegionMap::new().with("r1", 1.0).with("r2", 2.0));

        let lowered = lower_scalar(&mut context, &value, "alpha").expect("map should lower");
        assert_eq!(lowered.token, ":alpha");
        assert!(lowered.fragment.contains("Specify Oxs_AtlasScalarField:alpha {"));
        assert!(lowered.fragment.contains("default_value 0\n"));
        assert!(lowered.fragment.contains("    r1 1\n"));
        assert!(lowered.fragment.contains("    r2 2\n"));
    }

    #[test]
    fn per_region_vector_defaults_to_zero_vector() {
        let mesh = two_region_mesh();
        let mut context = LoweringContext::new(&mesh, Platform::Unix);
        let value = Parameter::PerRegion(RegionMap::new().with("r2", [0.0, 0.0, 1.0]));

        let lowered = lower_vector(&mut context, &value, "u").expect("map should lower");
        assert!(lowered.fragment.contains("Specify Oxs_AtlasVectorField:u {"));
        assert!(lowered.fragment.contains("default_value {0 0 0}"));
        assert!(lowered.fragment.contains("r2 {0 0 1}"));
    }

    #[test]
    fn scalar_field_uses_magnitude_adapter_and_sidecar() {
        let mesh = two_region_mesh();
        let mut context = LoweringContext::new(&mesh, Platform::Unix);
        let field = Field::uniform(mesh.clone(), &[8e5]).expect("field should build");

        let lowered = lower_scalar(&mut context, &Parameter::FieldValued(field), "Ms")
            .expect("field should lower");
        assert_eq!(lowered.token, ":Ms_norm");
        assert!(lowered.fragment.contains("Specify Oxs_FileVectorField:Ms {"));
        assert!(lowered.fragment.contains("file Ms.ovf"));
        assert!(lowered.fragment.contains("Specify Oxs_VecMagScalarField:Ms_norm {"));

        let sidecars = context.sidecars();
        assert_eq!(sidecars.len(), 1);
        assert_eq!(sidecars[0].file_name, "Ms.ovf");
        assert!(sidecars[0].extend_scalar);
    }

    #[test]
    fn lowered_token_is_the_only_symbol_with_the_parameter_prefix() {
        let mesh = two_region_mesh();
        let mut context = LoweringContext::new(&mesh, Platform::Unix);
        let field = Field::uniform(mesh.clone(), &[0.0, 0.0, 1.0]).expect("field should build");

        let lowered = lower_vector(&mut context, &Parameter::FieldValued(field), "H")
            .expect("field should lower");
        assert!(lowered.fragment.contains(&lowered.token));
        let symbols: Vec<&str> = lowered
            .fragment
            .split(|character: char| character.is_whitespace() || character == '{' || character == '}')
            .filter(|symbol| symbol.starts_with(":H") || symbol.ends_with(":H"))
            .collect();
        assert!(symbols.iter().all(|symbol| symbol.ends_with(":H")));
    }

    #[test]
    fn arity_mismatches_are_invalid_parameters() {
        let mesh = two_region_mesh();
        let mut context = LoweringContext::new(&mesh, Platform::Unix);

        let error = lower_scalar(&mut context, &Parameter::ConstantVector([1.0, 0.0, 0.0]), "K")
            .expect_err("vector for scalar should fail");
        assert_eq!(error.category(), OommfcErrorCategory::InvalidParameter);

        let field = Field::uniform(mesh.clone(), &[1.0]).expect("field should build");
        let error = lower_vector(&mut context, &Parameter::FieldValued(field), "u")
            .expect_err("scalar field for vector should fail");
        assert_eq!(error.placeholder(), "INPUT.PARAMETER_ARITY");
    }

    #[test]
    fn fields_with_missing_values_are_rejected() {
        let mesh = two_region_mesh();
        let mut context = LoweringContext::new(&mesh, Platform::Unix);
        let mut field = Field::uniform(mesh.clone(), &[0.0, 0.0, 1.0]).expect("field should build");
        field.values.truncate(3);

        let error = lower_vector(&mut context, &Parameter::FieldValued(field), "H")
            .expect_err("short field should fail");
        assert_eq!(error.placeholder(), "INPUT.FIELD_LENGTH");
        assert!(context.sidecars().is_empty());
    }

    #[test]
    fn unknown_region_keys_are_rejected() {
        let mesh = two_region_mesh();
        let mut context = LoweringContext::new(&mesh, Platform::Unix);
        let value = Parameter::PerRegion(RegionMap::new().with("main", 1.0));

        let error = lower_scalar(&mut context, &value, "alpha")
            .expect_err("main is not a region when subregions exist");
        assert_eq!(error.placeholder(), "INPUT.REGION_KEY");
    }
}
