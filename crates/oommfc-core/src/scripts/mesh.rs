use super::serialization::{format_number, format_vector, specify};
use crate::domain::LoweringResult;
use crate::field::{Mesh, Region};

fn ranges(region: &Region) -> LoweringResult<Vec<String>> {
    let mut lines = Vec::with_capacity(3);
    for (axis, label) in ["xrange", "yrange", "zrange"].iter().enumerate() {
        lines.push(format!(
            "{label} {{{} {}}}",
            format_number(region.p1[axis])?,
            format_number(region.p2[axis])?
        ));
    }
    Ok(lines)
}

/// Atlas declarations followed by the mesh, referencing `:main_atlas`.
pub fn mesh_script(mesh: &Mesh) -> LoweringResult<String> {
    let mut script = String::new();

    if mesh.subregions.is_empty() {
        let mut lines = ranges(&mesh.region)?;
        lines.push("name main".to_string());
        script.push_str(&specify("Oxs_BoxAtlas", Some("main_atlas"), &lines));
    } else {
        for (name, subregion) in &mesh.subregions {
            let mut lines = ranges(subregion)?;
            lines.push(format!("name {name}"));
            script.push_str(&specify("Oxs_BoxAtlas", Some(&format!("{name}_atlas")), &lines));
        }

        let mut lines = ranges(&mesh.region)?;
        lines.push("name entire".to_string());
        script.push_str(&specify("Oxs_BoxAtlas", Some("entire_atlas"), &lines));

        let mut lines: Vec<String> = mesh
            .subregions
            .keys()
            .map(|name| format!("atlas :{name}_atlas"))
            .collect();
        lines.push("atlas :entire_atlas".to_string());
        lines.extend(ranges(&mesh.region)?);
        script.push_str(&specify("Oxs_MultiAtlas", Some("main_atlas"), &lines));
    }

    let periodic = mesh.periodic_axes();
    let cellsize = format!("cellsize {}", format_vector(mesh.cell)?);
    if periodic.is_empty() {
        script.push_str(&specify(
            "Oxs_RectangularMesh",
            Some("mesh"),
            &[cellsize, "atlas :main_atlas".to_string()],
        ));
    } else {
        script.push_str(&specify(
            "Oxs_PeriodicRectangularMesh",
            Some("mesh"),
            &[
                cellsize,
                "atlas :main_atlas".to_string(),
                format!("periodic {periodic}"),
            ],
        ));
    }

    Ok(script)
}
