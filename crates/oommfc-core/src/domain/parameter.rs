use crate::field::Field;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of a region map entry that sets the fallback value.
pub const DEFAULT_KEY: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Vector([f64; 3]),
}

impl Value {
    pub const fn as_scalar(self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Vector(_) => None,
        }
    }

    pub const fn as_vector(self) -> Option<[f64; 3]> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(value) => Some(value),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<[f64; 3]> for Value {
    fn from(value: [f64; 3]) -> Self {
        Self::Vector(value)
    }
}

/// Piecewise-constant values keyed by region name or by an unordered `a:b` region pair.
///
/// Serialised as one flat object; a `default` key becomes the fallback value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct RegionMap {
    pub values: BTreeMap<String, Value>,
    pub default: Option<Value>,
}

impl RegionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if key == DEFAULT_KEY {
            self.default = Some(value);
        } else {
            self.values.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), *value))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for RegionMap {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        let mut map = Self::new();
        for (key, value) in entries {
            map.insert(key, value);
        }
        map
    }
}

impl From<RegionMap> for BTreeMap<String, Value> {
    fn from(map: RegionMap) -> Self {
        let mut entries = map.values;
        if let Some(default) = map.default {
            entries.insert(DEFAULT_KEY.to_string(), default);
        }
        entries
    }
}

/// A spatially varying quantity in one of its three storage forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
    Constant(f64),
    ConstantVector([f64; 3]),
    PerRegion(RegionMap),
    FieldValued(Field),
}

impl Parameter {
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Constant(_) => "constant",
            Self::ConstantVector(_) => "constant vector",
            Self::PerRegion(_) => "per-region map",
            Self::FieldValued(_) => "field",
        }
    }

    pub const fn as_constant(&self) -> Option<f64> {
        match self {
            Self::Constant(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl From<[f64; 3]> for Parameter {
    fn from(value: [f64; 3]) -> Self {
        Self::ConstantVector(value)
    }
}

impl From<RegionMap> for Parameter {
    fn from(value: RegionMap) -> Self {
        Self::PerRegion(value)
    }
}

impl From<Field> for Parameter {
    fn from(value: Field) -> Self {
        Self::FieldValued(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Parameter, RegionMap, Value};

    #[test]
    fn default_key_is_routed_to_fallback() {
        let map = RegionMap::new()
            .with("r1", 1e-12)
            .with("r1:r2", 2e-12)
            .with("default", 0.0);

        assert_eq!(map.default, Some(Value::Scalar(0.0)));
        assert_eq!(map.values.len(), 2);
        assert_eq!(map.get("r1:r2"), Some(Value::Scalar(2e-12)));
    }

    #[test]
    fn untagged_json_selects_parameter_representation() {
        let constant: Parameter = serde_json::from_str("1e-11").expect("scalar should parse");
        assert_eq!(constant, Parameter::Constant(1e-11));

        let vector: Parameter =
            serde_json::from_str("[0.0, 0.0, 1.0]").expect("vector should parse");
        assert_eq!(vector, Parameter::ConstantVector([0.0, 0.0, 1.0]));

        let per_region: Parameter =
            serde_json::from_str(r#"{"r1": 1e-12, "r1:r2": 2e-12, "default": 0}"#)
                .expect("region map should parse");
        let Parameter::PerRegion(map) = per_region else {
            panic!("expected a per-region parameter");
        };
        assert_eq!(map.default, Some(Value::Scalar(0.0)));
        assert_eq!(map.get("r1"), Some(Value::Scalar(1e-12)));
    }

    #[test]
    fn region_map_serialises_back_to_flat_object() {
        let map = RegionMap::new().with("r1", [0.0, 0.0, 1.0]).with_default(1.0);
        let json = serde_json::to_value(&map).expect("region map should serialise");

        assert_eq!(json["default"], serde_json::json!(1.0));
        assert_eq!(json["r1"], serde_json::json!([0.0, 0.0, 1.0]));
    }
}
