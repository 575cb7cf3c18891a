use super::errors::OommfcResult;
use super::parameter::Parameter;
use super::terms::validate_term_names;
use serde::{Deserialize, Serialize};

fn precession_name() -> String {
    "precession".to_string()
}

fn damping_name() -> String {
    "damping".to_string()
}

fn zhang_li_name() -> String {
    "zhangli".to_string()
}

fn slonczewski_name() -> String {
    "slonczewski".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precession {
    #[serde(default = "precession_name")]
    pub name: String,
    pub gamma0: Parameter,
}

impl Precession {
    pub fn new(gamma0: impl Into<Parameter>) -> Self {
        Self {
            name: precession_name(),
            gamma0: gamma0.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Damping {
    #[serde(default = "damping_name")]
    pub name: String,
    pub alpha: Parameter,
}

impl Damping {
    pub fn new(alpha: impl Into<Parameter>) -> Self {
        Self {
            name: damping_name(),
            alpha: alpha.into(),
        }
    }
}

/// Current-induced spin-transfer torque in the continuous form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZhangLi {
    #[serde(default = "zhang_li_name")]
    pub name: String,
    pub u: Parameter,
    pub beta: Parameter,
}

impl ZhangLi {
    pub fn new(u: impl Into<Parameter>, beta: f64) -> Self {
        Self {
            name: zhang_li_name(),
            u: u.into(),
            beta: Parameter::Constant(beta),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slonczewski {
    #[serde(default = "slonczewski_name")]
    pub name: String,
    #[serde(rename = "J")]
    pub j: Parameter,
    pub mp: Parameter,
    #[serde(rename = "P")]
    pub p: Parameter,
    #[serde(rename = "Lambda")]
    pub lambda: Parameter,
    #[serde(default = "zero_parameter")]
    pub eps_prime: Parameter,
}

fn zero_parameter() -> Parameter {
    Parameter::Constant(0.0)
}

impl Slonczewski {
    pub fn new(
        j: impl Into<Parameter>,
        mp: impl Into<Parameter>,
        p: impl Into<Parameter>,
        lambda: impl Into<Parameter>,
    ) -> Self {
        Self {
            name: slonczewski_name(),
            j: j.into(),
            mp: mp.into(),
            p: p.into(),
            lambda: lambda.into(),
            eps_prime: zero_parameter(),
        }
    }

    pub fn with_eps_prime(mut self, eps_prime: impl Into<Parameter>) -> Self {
        self.eps_prime = eps_prime.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DynamicsTerm {
    Precession(Precession),
    Damping(Damping),
    ZhangLi(ZhangLi),
    Slonczewski(Slonczewski),
}

impl DynamicsTerm {
    pub fn name(&self) -> &str {
        match self {
            Self::Precession(term) => &term.name,
            Self::Damping(term) => &term.name,
            Self::ZhangLi(term) => &term.name,
            Self::Slonczewski(term) => &term.name,
        }
    }
}

impl From<Precession> for DynamicsTerm {
    fn from(term: Precession) -> Self {
        Self::Precession(term)
    }
}

impl From<Damping> for DynamicsTerm {
    fn from(term: Damping) -> Self {
        Self::Damping(term)
    }
}

impl From<ZhangLi> for DynamicsTerm {
    fn from(term: ZhangLi) -> Self {
        Self::ZhangLi(term)
    }
}

impl From<Slonczewski> for DynamicsTerm {
    fn from(term: Slonczewski) -> Self {
        Self::Slonczewski(term)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dynamics {
    pub terms: Vec<DynamicsTerm>,
}

impl Dynamics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, term: impl Into<DynamicsTerm>) -> Self {
        self.terms.push(term.into());
        self
    }

    pub fn precession(&self) -> Option<&Precession> {
        self.terms.iter().find_map(|term| match term {
            DynamicsTerm::Precession(precession) => Some(precession),
            _ => None,
        })
    }

    pub fn damping(&self) -> Option<&Damping> {
        self.terms.iter().find_map(|term| match term {
            DynamicsTerm::Damping(damping) => Some(damping),
            _ => None,
        })
    }

    pub fn zhang_li(&self) -> Option<&ZhangLi> {
        self.terms.iter().find_map(|term| match term {
            DynamicsTerm::ZhangLi(zhang_li) => Some(zhang_li),
            _ => None,
        })
    }

    pub fn slonczewski(&self) -> Option<&Slonczewski> {
        self.terms.iter().find_map(|term| match term {
            DynamicsTerm::Slonczewski(slonczewski) => Some(slonczewski),
            _ => None,
        })
    }

    pub fn validate(&self) -> OommfcResult<()> {
        validate_term_names(self.terms.iter().map(DynamicsTerm::name), "dynamics")
    }
}
