#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use fnexpr_network::{BaseType, DataType, Float3, GenericArray, GenericValue};
use miette::Diagnostic;
use thiserror::Error;

pub const CONFIG_FILE: &str = "fnexpr.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(fnexpr::config))]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A variable with its type and one value per batch element.
#[derive(Clone, Debug)]
pub struct VariableBinding {
    pub name: String,
    pub data_type: DataType,
    pub values: GenericArray,
}

#[derive(Clone, Debug)]
pub struct ConstantDef {
    pub name: String,
    pub value: GenericValue,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub output: Option<DataType>,
    pub batch: Option<usize>,
    pub variables: Vec<VariableBinding>,
    pub constants: Vec<ConstantDef>,
}

impl ResolvedConfig {
    /// Replaces a same-named variable or appends a new one.
    pub fn bind(&mut self, binding: VariableBinding) {
        match self.variables.iter_mut().find(|v| v.name == binding.name) {
            Some(existing) => *existing = binding,
            None => self.variables.push(binding),
        }
    }

    /// Number of elements to evaluate: the common length of all variables,
    /// else the configured batch size, else 1.
    pub fn batch_size(&self) -> Result<usize, ConfigError> {
        let Some(first) = self.variables.first() else {
            return Ok(self.batch.unwrap_or(1));
        };
        let size = first.values.len();
        if let Some(other) = self.variables.iter().find(|v| v.values.len() != size) {
            return Err(ConfigError::new(format!(
                "variable `{}` has {} values but `{}` has {size}",
                other.name,
                other.values.len(),
                first.name
            )));
        }
        if let Some(batch) = self.batch.filter(|&b| b != size) {
            return Err(ConfigError::new(format!(
                "batch is {batch} but variables hold {size} values"
            )));
        }
        Ok(size)
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    output: Option<String>,

    #[serde(default)]
    batch: Option<usize>,

    #[serde(default)]
    variables: Vec<VariableEntry>,

    #[serde(default)]
    constants: Vec<ConstantEntry>,
}

#[derive(Clone, Debug, serde::Deserialize)]
struct VariableEntry {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    values: Vec<toml::Value>,
}

#[derive(Clone, Debug, serde::Deserialize)]
struct ConstantEntry {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    value: toml::Value,
}

pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = start.to_path_buf();
    loop {
        let candidate = cur.join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        cur = cur.parent()?.to_path_buf();
    }
}

/// Loads `explicit` if given, otherwise the nearest `fnexpr.toml` at or above
/// `start`. No file means an empty configuration.
pub fn load_config(explicit: Option<&Path>, start: &Path) -> Result<ResolvedConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match find_config(start) {
            Some(path) => path,
            None => return Ok(ResolvedConfig::default()),
        },
    };
    let raw = fs::read_to_string(&path)
        .map_err(|e| ConfigError::new(format!("failed to read {}: {e}", path.display())))?;
    let mut resolved = parse_config(&raw)
        .map_err(|e| ConfigError::new(format!("{}: {}", path.display(), e.message)))?;
    resolved.config_path = Some(path);
    Ok(resolved)
}

pub fn parse_config(raw: &str) -> Result<ResolvedConfig, ConfigError> {
    let parsed: ConfigFile =
        toml::from_str(raw).map_err(|e| ConfigError::new(format!("failed to parse: {e}")))?;

    let output = parsed.output.as_deref().map(parse_data_type).transpose()?;

    let mut resolved = ResolvedConfig {
        config_path: None,
        output,
        batch: parsed.batch,
        variables: Vec::new(),
        constants: Vec::new(),
    };
    for entry in parsed.variables {
        let data_type = parse_data_type(&entry.ty)?;
        let values = array_from_toml(data_type, &entry.values)
            .map_err(|e| ConfigError::new(format!("variable `{}`: {}", entry.name, e.message)))?;
        resolved.bind(VariableBinding {
            name: entry.name,
            data_type,
            values,
        });
    }
    for entry in parsed.constants {
        let DataType::Single(base) = parse_data_type(&entry.ty)? else {
            return Err(ConfigError::new(format!(
                "constant `{}` must have a single-value type",
                entry.name
            )));
        };
        let value = Scalar::from_toml(base, &entry.value)
            .map_err(|e| ConfigError::new(format!("constant `{}`: {}", entry.name, e.message)))?;
        resolved.constants.push(ConstantDef {
            name: entry.name,
            value: value.into_generic(),
        });
    }
    Ok(resolved)
}

pub fn parse_data_type(text: &str) -> Result<DataType, ConfigError> {
    text.parse::<DataType>()
        .map_err(|e| ConfigError::new(e.to_string()))
}

/// Parses `name:type=v1,v2,...`. List elements separate their items with `|`;
/// `float3` values are three whitespace-separated numbers.
pub fn parse_var_flag(flag: &str) -> Result<VariableBinding, ConfigError> {
    let (decl, values) = flag
        .split_once('=')
        .ok_or_else(|| ConfigError::new(format!("`{flag}`: expected `name:type=values`")))?;
    let (name, ty) = decl
        .split_once(':')
        .ok_or_else(|| ConfigError::new(format!("`{flag}`: expected `name:type=values`")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::new(format!("`{flag}`: missing variable name")));
    }
    let data_type = parse_data_type(ty)?;
    let elements: Vec<&str> = if values.trim().is_empty() {
        Vec::new()
    } else {
        values.split(',').collect()
    };
    let values = match data_type {
        DataType::Single(base) => {
            let items = elements
                .iter()
                .map(|s| Scalar::parse(base, s))
                .collect::<Result<Vec<_>, _>>()?;
            single_array(base, items)
        }
        DataType::Vector(base) => {
            let lists = elements
                .iter()
                .map(|list| {
                    list.split('|')
                        .filter(|s| !s.trim().is_empty())
                        .map(|s| Scalar::parse(base, s))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            vector_array(base, lists)
        }
    };
    Ok(VariableBinding {
        name: name.to_string(),
        data_type,
        values,
    })
}

fn array_from_toml(data_type: DataType, values: &[toml::Value]) -> Result<GenericArray, ConfigError> {
    match data_type {
        DataType::Single(base) => {
            let items = values
                .iter()
                .map(|v| Scalar::from_toml(base, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(single_array(base, items))
        }
        DataType::Vector(base) => {
            let lists = values
                .iter()
                .map(|v| match v {
                    toml::Value::Array(items) => items
                        .iter()
                        .map(|item| Scalar::from_toml(base, item))
                        .collect::<Result<Vec<_>, _>>(),
                    other => Err(ConfigError::new(format!("expected a list, found {other}"))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(vector_array(base, lists))
        }
    }
}

/// One parsed value, already checked against its element type.
#[derive(Clone, Debug, PartialEq)]
enum Scalar {
    Int(i32),
    Float(f32),
    Bool(bool),
    String(String),
    Float3(Float3),
}

impl Scalar {
    fn parse(base: BaseType, text: &str) -> Result<Scalar, ConfigError> {
        let text = text.trim();
        let invalid = || ConfigError::new(format!("`{text}` is not a valid {base}"));
        match base {
            BaseType::Int32 => text.parse().map(Scalar::Int).map_err(|_| invalid()),
            BaseType::Float => text.parse().map(Scalar::Float).map_err(|_| invalid()),
            BaseType::Bool => text.parse().map(Scalar::Bool).map_err(|_| invalid()),
            BaseType::String => Ok(Scalar::String(text.to_string())),
            BaseType::Float3 => {
                let parts = text
                    .split_whitespace()
                    .map(str::parse::<f32>)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| invalid())?;
                match parts.as_slice() {
                    &[x, y, z] => Ok(Scalar::Float3(Float3::new(x, y, z))),
                    _ => Err(invalid()),
                }
            }
        }
    }

    fn from_toml(base: BaseType, value: &toml::Value) -> Result<Scalar, ConfigError> {
        let invalid = || ConfigError::new(format!("{value} is not a valid {base}"));
        match (base, value) {
            (BaseType::Int32, toml::Value::Integer(i)) => {
                i32::try_from(*i).map(Scalar::Int).map_err(|_| invalid())
            }
            (BaseType::Float, toml::Value::Float(f)) => Ok(Scalar::Float(*f as f32)),
            (BaseType::Float, toml::Value::Integer(i)) => Ok(Scalar::Float(*i as f32)),
            (BaseType::Bool, toml::Value::Boolean(b)) => Ok(Scalar::Bool(*b)),
            (BaseType::String, toml::Value::String(s)) => Ok(Scalar::String(s.clone())),
            (BaseType::Float3, toml::Value::Array(items)) => {
                let parts = items
                    .iter()
                    .map(|item| match item {
                        toml::Value::Float(f) => Some(*f as f32),
                        toml::Value::Integer(i) => Some(*i as f32),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(invalid)?;
                match parts.as_slice() {
                    &[x, y, z] => Ok(Scalar::Float3(Float3::new(x, y, z))),
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }

    fn into_generic(self) -> GenericValue {
        match self {
            Scalar::Int(v) => GenericValue::new(v),
            Scalar::Float(v) => GenericValue::new(v),
            Scalar::Bool(v) => GenericValue::new(v),
            Scalar::String(v) => GenericValue::new(v),
            Scalar::Float3(v) => GenericValue::new(v),
        }
    }
}

macro_rules! typed_items {
    ($items:expr, $variant:ident) => {
        $items
            .into_iter()
            .filter_map(|s| match s {
                Scalar::$variant(v) => Some(v),
                _ => None,
            })
            .collect::<Vec<_>>()
    };
}

fn single_array(base: BaseType, items: Vec<Scalar>) -> GenericArray {
    match base {
        BaseType::Int32 => GenericArray::from_vec(typed_items!(items, Int)),
        BaseType::Float => GenericArray::from_vec(typed_items!(items, Float)),
        BaseType::Bool => GenericArray::from_vec(typed_items!(items, Bool)),
        BaseType::String => GenericArray::from_vec(typed_items!(items, String)),
        BaseType::Float3 => GenericArray::from_vec(typed_items!(items, Float3)),
    }
}

fn vector_array(base: BaseType, lists: Vec<Vec<Scalar>>) -> GenericArray {
    let lists = lists.into_iter();
    match base {
        BaseType::Int32 => GenericArray::from_vector_vec(lists.map(|l| typed_items!(l, Int)).collect()),
        BaseType::Float => GenericArray::from_vector_vec(lists.map(|l| typed_items!(l, Float)).collect()),
        BaseType::Bool => GenericArray::from_vector_vec(lists.map(|l| typed_items!(l, Bool)).collect()),
        BaseType::String => GenericArray::from_vector_vec(lists.map(|l| typed_items!(l, String)).collect()),
        BaseType::Float3 => GenericArray::from_vector_vec(lists.map(|l| typed_items!(l, Float3)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variables_constants_and_defaults() {
        let raw = r#"
output = "float"
batch = 2

[[variables]]
name = "x"
type = "float"
values = [1, 2.5]

[[variables]]
name = "xs"
type = "float[]"
values = [[1.0, 2.0], []]

[[constants]]
name = "up"
type = "float3"
value = [0, 0, 1]
"#;
        let config = parse_config(raw).unwrap();
        assert_eq!(config.output, Some(DataType::single::<f32>()));
        assert_eq!(config.batch_size().unwrap(), 2);
        assert_eq!(config.variables[0].values.as_slice::<f32>(), Some(&[1.0f32, 2.5][..]));
        assert_eq!(config.variables[1].data_type, DataType::vector::<f32>());
        assert_eq!(config.constants[0].value.get::<Float3>(), Some(&Float3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn rejects_bad_values() {
        let raw = "[[variables]]\nname = \"n\"\ntype = \"int\"\nvalues = [1.5]\n";
        let err = parse_config(raw).unwrap_err();
        assert!(err.message.contains("variable `n`"), "{}", err.message);

        assert!(parse_config("output = \"matrix\"").is_err());
        assert!(parse_config("colour = 1").is_err());
    }

    #[test]
    fn var_flags() {
        let v = parse_var_flag("x:int=1, 2,3").unwrap();
        assert_eq!(v.name, "x");
        assert_eq!(v.values.as_slice::<i32>(), Some(&[1, 2, 3][..]));

        let v = parse_var_flag("p:float3=1 2 3,4 5 6").unwrap();
        assert_eq!(v.values.len(), 2);

        let v = parse_var_flag("xs:float[]=1|2,").unwrap();
        assert_eq!(v.values.as_vector_slice::<f32>(), Some(&[vec![1.0f32, 2.0], vec![]][..]));

        assert!(parse_var_flag("x=1").is_err());
        assert!(parse_var_flag("x:int=a").is_err());
    }

    #[test]
    fn flags_override_file_bindings() {
        let mut config = parse_config("[[variables]]\nname = \"x\"\ntype = \"int\"\nvalues = [1]\n").unwrap();
        config.bind(parse_var_flag("x:int=4,5").unwrap());
        config.bind(parse_var_flag("y:int=6,7").unwrap());
        assert_eq!(config.variables.len(), 2);
        assert_eq!(config.batch_size().unwrap(), 2);

        config.bind(parse_var_flag("z:int=1").unwrap());
        assert!(config.batch_size().is_err());
    }
}
