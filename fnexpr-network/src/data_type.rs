#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

use crate::value::{CppType, MfValue, BOOL, FLOAT, FLOAT3, INT32, STRING};

/// Element type of a value flowing through a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseType {
    Int32,
    Float,
    Bool,
    String,
    Float3,
}

impl BaseType {
    pub const ALL: [BaseType; 5] = [
        BaseType::Int32,
        BaseType::Float,
        BaseType::Bool,
        BaseType::String,
        BaseType::Float3,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BaseType::Int32 => "int",
            BaseType::Float => "float",
            BaseType::Bool => "bool",
            BaseType::String => "string",
            BaseType::Float3 => "float3",
        }
    }

    /// The value-type capability implementing copy/destroy for this element type.
    pub fn cpp_type(self) -> &'static dyn CppType {
        match self {
            BaseType::Int32 => &INT32,
            BaseType::Float => &FLOAT,
            BaseType::Bool => &BOOL,
            BaseType::String => &STRING,
            BaseType::Float3 => &FLOAT3,
        }
    }
}

/// A single value per batch element, or a variable-length list of values per
/// batch element. Two data types are equal iff both parts match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    Single(BaseType),
    Vector(BaseType),
}

impl DataType {
    pub fn single<T: MfValue>() -> Self {
        DataType::Single(T::BASE_TYPE)
    }

    pub fn vector<T: MfValue>() -> Self {
        DataType::Vector(T::BASE_TYPE)
    }

    pub fn base_type(self) -> BaseType {
        match self {
            DataType::Single(b) | DataType::Vector(b) => b,
        }
    }

    pub fn is_single(self) -> bool {
        matches!(self, DataType::Single(_))
    }

    pub fn is_vector(self) -> bool {
        matches!(self, DataType::Vector(_))
    }

    pub fn cpp_type(self) -> &'static dyn CppType {
        self.base_type().cpp_type()
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Single(b) => write!(f, "{b}"),
            DataType::Vector(b) => write!(f, "{b}[]"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("unknown data type `{0}`")]
#[diagnostic(
    code(fnexpr::data_type),
    help("expected one of: int, float, bool, string, float3 (append `[]` for a list)")
)]
pub struct DataTypeParseError(pub String);

impl FromStr for BaseType {
    type Err = DataTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "int32" | "i32" => Ok(BaseType::Int32),
            "float" | "f32" => Ok(BaseType::Float),
            "bool" => Ok(BaseType::Bool),
            "string" | "str" => Ok(BaseType::String),
            "float3" | "vec3" | "vector" => Ok(BaseType::Float3),
            _ => Err(DataTypeParseError(s.to_string())),
        }
    }
}

impl FromStr for DataType {
    type Err = DataTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.strip_suffix("[]") {
            Some(elem) => elem
                .parse::<BaseType>()
                .map(DataType::Vector)
                .map_err(|_| DataTypeParseError(s.to_string())),
            None => trimmed.parse::<BaseType>().map(DataType::Single),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_includes_batching_mode() {
        assert_eq!(DataType::single::<f32>(), DataType::Single(BaseType::Float));
        assert_ne!(DataType::single::<f32>(), DataType::vector::<f32>());
        assert_ne!(DataType::single::<f32>(), DataType::single::<i32>());
    }

    #[test]
    fn parse_and_display() {
        for ty in BaseType::ALL {
            let single = DataType::Single(ty);
            let vector = DataType::Vector(ty);
            assert_eq!(single.to_string().parse::<DataType>().unwrap(), single);
            assert_eq!(vector.to_string().parse::<DataType>().unwrap(), vector);
        }
        assert_eq!("i32".parse::<DataType>().unwrap(), DataType::Single(BaseType::Int32));
        assert!("matrix".parse::<DataType>().is_err());
        assert!("[]".parse::<DataType>().is_err());
    }
}
