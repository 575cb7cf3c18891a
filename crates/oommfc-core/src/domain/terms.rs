use super::errors::{OommfcError, OommfcResult};
use super::parameter::Parameter;
use super::{RESERVED_NAMES, is_identifier};
use crate::field::Mesh;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn exchange_name() -> String {
    "exchange".to_string()
}

fn zeeman_name() -> String {
    "zeeman".to_string()
}

fn demag_name() -> String {
    "demag".to_string()
}

fn dmi_name() -> String {
    "dmi".to_string()
}

fn uniaxial_name() -> String {
    "uniaxialanisotropy".to_string()
}

fn cubic_name() -> String {
    "cubicanisotropy".to_string()
}

fn mel_name() -> String {
    "mel".to_string()
}

fn rkky_name() -> String {
    "rkky".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    #[serde(default = "exchange_name")]
    pub name: String,
    #[serde(rename = "A")]
    pub a: Parameter,
}

impl Exchange {
    pub fn new(a: impl Into<Parameter>) -> Self {
        Self {
            name: exchange_name(),
            a: a.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveKind {
    Constant,
    Sin,
    Sinc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zeeman {
    #[serde(default = "zeeman_name")]
    pub name: String,
    #[serde(rename = "H")]
    pub h: Parameter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<WaveKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t0: Option<f64>,
}

impl Zeeman {
    pub fn new(h: impl Into<Parameter>) -> Self {
        Self {
            name: zeeman_name(),
            h: h.into(),
            wave: None,
            f: None,
            t0: None,
        }
    }

    pub fn with_wave(mut self, wave: WaveKind, f: f64, t0: f64) -> Self {
        self.wave = Some(wave);
        self.f = Some(f);
        self.t0 = Some(t0);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demag {
    #[serde(default = "demag_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asymptotic_radius: Option<f64>,
}

impl Default for Demag {
    fn default() -> Self {
        Self {
            name: demag_name(),
            asymptotic_radius: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrystalClass {
    #[serde(alias = "cnv")]
    Cnv,
    #[serde(alias = "t")]
    T,
    #[serde(alias = "o")]
    O,
    #[serde(alias = "d2d")]
    D2d,
}

impl CrystalClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cnv => "Cnv",
            Self::T => "T",
            Self::O => "O",
            Self::D2d => "D2d",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dmi {
    #[serde(default = "dmi_name")]
    pub name: String,
    #[serde(rename = "D")]
    pub d: Parameter,
    pub crystalclass: CrystalClass,
}

impl Dmi {
    pub fn new(d: impl Into<Parameter>, crystalclass: CrystalClass) -> Self {
        Self {
            name: dmi_name(),
            d: d.into(),
            crystalclass,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniaxialAnisotropy {
    #[serde(default = "uniaxial_name")]
    pub name: String,
    #[serde(rename = "K", alias = "K1")]
    pub k1: Parameter,
    #[serde(rename = "K2", default, skip_serializing_if = "Option::is_none")]
    pub k2: Option<Parameter>,
    pub u: Parameter,
}

impl UniaxialAnisotropy {
    pub fn new(k1: impl Into<Parameter>, u: impl Into<Parameter>) -> Self {
        Self {
            name: uniaxial_name(),
            k1: k1.into(),
            k2: None,
            u: u.into(),
        }
    }

    pub fn with_k2(mut self, k2: impl Into<Parameter>) -> Self {
        self.k2 = Some(k2.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubicAnisotropy {
    #[serde(default = "cubic_name")]
    pub name: String,
    #[serde(rename = "K", alias = "K1")]
    pub k1: Parameter,
    pub u1: Parameter,
    pub u2: Parameter,
}

impl CubicAnisotropy {
    pub fn new(k1: impl Into<Parameter>, u1: impl Into<Parameter>, u2: impl Into<Parameter>) -> Self {
        Self {
            name: cubic_name(),
            k1: k1.into(),
            u1: u1.into(),
            u2: u2.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnetoElastic {
    #[serde(default = "mel_name")]
    pub name: String,
    #[serde(rename = "B1")]
    pub b1: Parameter,
    #[serde(rename = "B2")]
    pub b2: Parameter,
    pub e_diag: Parameter,
    pub e_offdiag: Parameter,
}

impl MagnetoElastic {
    pub fn new(
        b1: impl Into<Parameter>,
        b2: impl Into<Parameter>,
        e_diag: impl Into<Parameter>,
        e_offdiag: impl Into<Parameter>,
    ) -> Self {
        Self {
            name: mel_name(),
            b1: b1.into(),
            b2: b2.into(),
            e_diag: e_diag.into(),
            e_offdiag: e_offdiag.into(),
        }
    }
}

/// Interlayer exchange between two subregions that share one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rkky {
    #[serde(default = "rkky_name")]
    pub name: String,
    pub sigma: f64,
    #[serde(default)]
    pub sigma2: f64,
    pub subregions: [String; 2],
}

impl Rkky {
    pub fn new(sigma: f64, first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            name: rkky_name(),
            sigma,
            sigma2: 0.0,
            subregions: [first.into(), second.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    Exchange(Exchange),
    Zeeman(Zeeman),
    Demag(Demag),
    Dmi(Dmi),
    UniaxialAnisotropy(UniaxialAnisotropy),
    CubicAnisotropy(CubicAnisotropy),
    MagnetoElastic(MagnetoElastic),
    Rkky(Rkky),
}

impl Term {
    pub fn name(&self) -> &str {
        match self {
            Self::Exchange(term) => &term.name,
            Self::Zeeman(term) => &term.name,
            Self::Demag(term) => &term.name,
            Self::Dmi(term) => &term.name,
            Self::UniaxialAnisotropy(term) => &term.name,
            Self::CubicAnisotropy(term) => &term.name,
            Self::MagnetoElastic(term) => &term.name,
            Self::Rkky(term) => &term.name,
        }
    }

    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Exchange(_) => "exchange",
            Self::Zeeman(_) => "zeeman",
            Self::Demag(_) => "demag",
            Self::Dmi(_) => "dmi",
            Self::UniaxialAnisotropy(_) => "uniaxial_anisotropy",
            Self::CubicAnisotropy(_) => "cubic_anisotropy",
            Self::MagnetoElastic(_) => "magneto_elastic",
            Self::Rkky(_) => "rkky",
        }
    }

    /// Renames the term, keeping its kind and attributes.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match &mut self {
            Self::Exchange(term) => term.name = name,
            Self::Zeeman(term) => term.name = name,
            Self::Demag(term) => term.name = name,
            Self::Dmi(term) => term.name = name,
            Self::UniaxialAnisotropy(term) => term.name = name,
            Self::CubicAnisotropy(term) => term.name = name,
            Self::MagnetoElastic(term) => term.name = name,
            Self::Rkky(term) => term.name = name,
        }
        self
    }

    fn validate(&self, mesh: &Mesh) -> OommfcResult<()> {
        if let Self::Rkky(term) = self {
            for subregion in &term.subregions {
                if !mesh.subregions.contains_key(subregion) {
                    return Err(OommfcError::bad_term_configuration(
                        "INPUT.RKKY_SUBREGION",
                        format!(
                            "term '{}' references unknown subregion '{}'",
                            term.name, subregion
                        ),
                    ));
                }
            }
            if term.subregions[0] == term.subregions[1] {
                return Err(OommfcError::bad_term_configuration(
                    "INPUT.RKKY_SUBREGION",
                    format!("term '{}' couples subregion '{}' to itself", term.name, term.subregions[0]),
                ));
            }
        }
        Ok(())
    }
}

macro_rules! impl_into_term {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Term {
                fn from(term: $variant) -> Self {
                    Self::$variant(term)
                }
            }
        )*
    };
}

impl_into_term!(
    Exchange,
    Zeeman,
    Demag,
    Dmi,
    UniaxialAnisotropy,
    CubicAnisotropy,
    MagnetoElastic,
    Rkky,
);

pub(super) fn validate_term_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
    sum: &str,
) -> OommfcResult<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !is_identifier(name) {
            return Err(OommfcError::invalid_parameter(
                "INPUT.TERM_NAME",
                format!("{sum} term name '{name}' must contain only letters, digits, and '_'"),
            ));
        }
        if RESERVED_NAMES.contains(&name) {
            return Err(OommfcError::invalid_parameter(
                "INPUT.TERM_NAME",
                format!("{sum} term name '{name}' is reserved"),
            ));
        }
        if !seen.insert(name) {
            return Err(OommfcError::invalid_parameter(
                "INPUT.TERM_NAME",
                format!("{sum} term name '{name}' is used more than once"),
            ));
        }
    }
    Ok(())
}

/// Sum of energy terms, lowered in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Energy {
    pub terms: Vec<Term>,
}

impl Energy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, term: impl Into<Term>) -> Self {
        self.terms.push(term.into());
        self
    }

    pub fn push(&mut self, term: impl Into<Term>) {
        self.terms.push(term.into());
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.terms.iter().find(|term| term.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn validate(&self, mesh: &Mesh) -> OommfcResult<()> {
        validate_term_names(self.terms.iter().map(Term::name), "energy")?;
        for term in &self.terms {
            term.validate(mesh)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CrystalClass, Demag, Energy, Exchange, Rkky, Term, Zeeman};
    use crate::domain::OommfcErrorCategory;
    use crate::field::{Mesh, Region};

    fn layered_mesh() -> Mesh {
        Mesh::new(
            Region::new([0.0, 0.0, 0.0], [10e-9, 10e-9, 4e-9]).expect("region should be valid"),
            [1e-9, 1e-9, 1e-9],
        )
        .expect("mesh should be valid")
        .with_subregion(
            "bottom",
            Region::new([0.0, 0.0, 0.0], [10e-9, 10e-9, 2e-9]).expect("region should be valid"),
        )
        .expect("bottom should fit")
        .with_subregion(
            "top",
            Region::new([0.0, 0.0, 2e-9], [10e-9, 10e-9, 4e-9]).expect("region should be valid"),
        )
        .expect("top should fit")
    }

    #[test]
    fn terms_deserialise_with_default_names() {
        let energy: Energy = serde_json::from_str(
            r#"[
                {"kind": "exchange", "A": 1e-11},
                {"kind": "zeeman", "H": [0, 0, 1e6], "wave": "sin", "f": 1e9},
                {"kind": "dmi", "D": 1e-3, "crystalclass": "Cnv"},
                {"kind": "uniaxial_anisotropy", "K1": 1e5, "u": [0, 0, 1]}
            ]"#,
        )
        .expect("energy should deserialise");

        let names: Vec<&str> = energy.terms.iter().map(Term::name).collect();
        assert_eq!(names, ["exchange", "zeeman", "dmi", "uniaxialanisotropy"]);
        let Term::Dmi(dmi) = &energy.terms[2] else {
            panic!("third term should be DMI");
        };
        assert_eq!(dmi.crystalclass, CrystalClass::Cnv);
    }

    #[test]
    fn duplicate_term_names_are_rejected() {
        let energy = Energy::new()
            .with(Zeeman::new([0.0, 0.0, 1.0]))
            .with(Zeeman::new([1.0, 0.0, 0.0]));

        let error = energy
            .validate(&layered_mesh())
            .expect_err("duplicate names should fail");
        assert_eq!(error.category(), OommfcErrorCategory::InvalidParameter);
    }

    #[test]
    fn renamed_terms_coexist() {
        let energy = Energy::new()
            .with(Term::from(Zeeman::new([0.0, 0.0, 1.0])).named("zeeman1"))
            .with(Term::from(Zeeman::new([1.0, 0.0, 0.0])).named("zeeman2"))
            .with(Exchange::new(1e-11))
            .with(Demag::default());

        energy
            .validate(&layered_mesh())
            .expect("distinct names should validate");
        assert!(energy.get("zeeman2").is_some());
    }

    #[test]
    fn reserved_names_are_rejected() {
        let energy = Energy::new().with(Term::from(Exchange::new(1e-11)).named("mesh"));
        let error = energy
            .validate(&layered_mesh())
            .expect_err("reserved name should fail");
        assert_eq!(error.placeholder(), "INPUT.TERM_NAME");
    }

    #[test]
    fn rkky_requires_known_subregions() {
        let energy = Energy::new().with(Rkky::new(-1e-4, "bottom", "middle"));
        let error = energy
            .validate(&layered_mesh())
            .expect_err("unknown subregion should fail");
        assert_eq!(error.category(), OommfcErrorCategory::BadTermConfiguration);
    }
}
