use super::driver::driver_script;
use super::energy::energy_script;
use super::mesh::mesh_script;
use super::serialization::specify;
use crate::domain::{DriveIntent, LoweringResult, OommfcResult, Platform, Problem};
use crate::field::{Field, FieldFormat, Mesh};
use std::path::Path;
use tracing::debug;

/// Field file the script references by relative name.
#[derive(Debug, Clone)]
pub struct Sidecar {
    pub file_name: String,
    pub field: Field,
    pub extend_scalar: bool,
}

impl Sidecar {
    pub fn write(&self, directory: &Path) -> OommfcResult<()> {
        let path = directory.join(&self.file_name);
        debug!(path = %path.display(), dim = self.field.dim, "writing sidecar field");
        if self.extend_scalar {
            self.field.write_extended(&path, FieldFormat::Binary8)
        } else {
            self.field.write(&path, FieldFormat::Binary8)
        }
    }
}

/// State shared by every emitter while one script is lowered.
#[derive(Debug)]
pub struct LoweringContext<'a> {
    pub mesh: &'a Mesh,
    pub platform: Platform,
    sidecars: Vec<Sidecar>,
}

impl<'a> LoweringContext<'a> {
    pub fn new(mesh: &'a Mesh, platform: Platform) -> Self {
        Self {
            mesh,
            platform,
            sidecars: Vec::new(),
        }
    }

    pub fn add_sidecar(&mut self, file_name: String, field: Field, extend_scalar: bool) {
        self.sidecars.push(Sidecar {
            file_name,
            field,
            extend_scalar,
        });
    }

    pub fn sidecars(&self) -> &[Sidecar] {
        &self.sidecars
    }

    pub fn into_sidecars(self) -> Vec<Sidecar> {
        self.sidecars
    }
}

/// Knobs of a single lowering that do not belong to the problem itself.
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    pub output_format: FieldFormat,
    pub fixed_subregions: Vec<String>,
    pub output_step: bool,
    pub compute: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoweredScript {
    pub script: String,
    pub sidecars: Vec<Sidecar>,
}

impl LoweredScript {
    pub fn write_sidecars(&self, directory: &Path) -> OommfcResult<()> {
        for sidecar in &self.sidecars {
            sidecar.write(directory)?;
        }
        Ok(())
    }
}

fn header(name: &str, format: FieldFormat) -> String {
    let format = format.mif_format();
    [
        "# MIF 2.2".to_string(),
        "SetOptions {".to_string(),
        format!("  basename {name}"),
        "  scalar_output_format %.12g".to_string(),
        format!("  scalar_field_output_format {{{format}}}"),
        format!("  vector_field_output_format {{{format}}}"),
        "}".to_string(),
        String::new(),
        String::new(),
    ]
    .join("\n")
}

fn magnetisation_script(context: &mut LoweringContext<'_>, m: &Field) -> String {
    context.add_sidecar("m0.omf".to_string(), m.clone(), false);
    let mut script = specify(
        "Oxs_FileVectorField",
        Some("m0"),
        &["file m0.omf".to_string(), "atlas :main_atlas".to_string()],
    );
    script.push_str(&specify(
        "Oxs_VecMagScalarField",
        Some("m0_norm"),
        &["field :m0".to_string()],
    ));
    script
}

/// Lowers the whole problem for `intent`: header, mesh, energy, magnetisation, evolver and driver.
pub fn problem_script(
    problem: &Problem,
    intent: &DriveIntent,
    options: &ScriptOptions,
    platform: Platform,
) -> LoweringResult<LoweredScript> {
    problem.validate()?;
    intent.validate()?;

    let mut context = LoweringContext::new(problem.mesh(), platform);
    let mut script = header(&problem.name, options.output_format);
    script.push_str(&mesh_script(problem.mesh())?);
    script.push_str(&energy_script(&mut context, &problem.energy)?);
    script.push_str(&magnetisation_script(&mut context, &problem.m));
    script.push_str(&driver_script(&mut context, problem, intent, options)?);

    debug!(
        problem = %problem.name,
        sidecars = context.sidecars().len(),
        "lowered problem script"
    );
    Ok(LoweredScript {
        script,
        sidecars: context.into_sidecars(),
    })
}
