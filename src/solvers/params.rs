//! Typed solver parameters resolved from `KEY=VALUE` pairs.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::parser::{parse_bool, parse_f32, parse_f64, parse_i32, parse_usize};

/// Type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Double,
    Float,
    Bool,
    Int32,
    Usize,
    Str,
}

impl ParamType {
    pub fn name(self) -> &'static str {
        match self {
            ParamType::Double => "DOUBLE",
            ParamType::Float => "FLOAT",
            ParamType::Bool => "BOOL",
            ParamType::Int32 => "INT32",
            ParamType::Usize => "USIZE",
            ParamType::Str => "STR",
        }
    }
}

/// A parsed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Double(f64),
    Float(f32),
    Bool(bool),
    Int32(i32),
    Usize(usize),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Double(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int32(v) => write!(f, "{v}"),
            ParamValue::Usize(v) => write!(f, "{v}"),
            ParamValue::Str(v) => f.write_str(v),
        }
    }
}

/// Declaration of one solver parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub ty: ParamType,
    /// Default in the same textual form accepted on the command line.
    pub default: &'static str,
    pub glossary: &'static str,
}

impl ParamDescriptor {
    pub fn parse(&self, value: &str) -> Result<ParamValue> {
        parse_value(self.ty, value).ok_or_else(|| {
            Error::invalid_param(
                self.name,
                format!("cannot parse `{value}` as {}", self.ty.name()),
            )
        })
    }
}

fn parse_value(ty: ParamType, value: &str) -> Option<ParamValue> {
    Some(match ty {
        ParamType::Double => ParamValue::Double(parse_f64(value)?),
        ParamType::Float => ParamValue::Float(parse_f32(value)?),
        ParamType::Bool => ParamValue::Bool(parse_bool(value)?),
        ParamType::Int32 => ParamValue::Int32(parse_i32(value)?),
        ParamType::Usize => ParamValue::Usize(parse_usize(value)?),
        ParamType::Str => ParamValue::Str(value.to_string()),
    })
}

/// Splits `KEY=VALUE`.
pub fn parse_key_value(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::invalid_param(pair, "expected a KEY=VALUE pair")),
    }
}

/// Parameter values keyed by name, one per declared descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedParams {
    values: BTreeMap<&'static str, ParamValue>,
}

impl TypedParams {
    /// Resolves `pairs` against `descriptors`, filling defaults for the
    /// parameters not given. Later pairs override earlier ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_cptp::solvers::{ParamDescriptor, ParamType, TypedParams};
    ///
    /// const DESC: &[ParamDescriptor] = &[ParamDescriptor {
    ///     name: "NUM_THREADS",
    ///     ty: ParamType::Int32,
    ///     default: "0",
    ///     glossary: "worker threads",
    /// }];
    ///
    /// let params = TypedParams::resolve(DESC, &[("NUM_THREADS".into(), "0x4".into())]).unwrap();
    /// assert_eq!(params.get_i32("NUM_THREADS").unwrap(), 4);
    /// assert!(TypedParams::resolve(DESC, &[("THREADS".into(), "4".into())]).is_err());
    /// ```
    pub fn resolve(descriptors: &[ParamDescriptor], pairs: &[(String, String)]) -> Result<Self> {
        let mut values = BTreeMap::new();
        for desc in descriptors {
            values.insert(desc.name, desc.parse(desc.default)?);
        }
        for (key, value) in pairs {
            let desc = descriptors
                .iter()
                .find(|d| d.name == key.as_str())
                .ok_or_else(|| Error::invalid_param(key.as_str(), "unknown parameter"))?;
            values.insert(desc.name, desc.parse(value)?);
        }
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    fn mismatch(name: &str, expected: ParamType) -> Error {
        Error::invalid_param(name, format!("not declared as {}", expected.name()))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => Ok(*v),
            _ => Err(Self::mismatch(name, ParamType::Bool)),
        }
    }

    pub fn get_i32(&self, name: &str) -> Result<i32> {
        match self.get(name) {
            Some(ParamValue::Int32(v)) => Ok(*v),
            _ => Err(Self::mismatch(name, ParamType::Int32)),
        }
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        match self.get(name) {
            Some(ParamValue::Double(v)) => Ok(*v),
            Some(ParamValue::Float(v)) => Ok(f64::from(*v)),
            _ => Err(Self::mismatch(name, ParamType::Double)),
        }
    }

    pub fn get_usize(&self, name: &str) -> Result<usize> {
        match self.get(name) {
            Some(ParamValue::Usize(v)) => Ok(*v),
            _ => Err(Self::mismatch(name, ParamType::Usize)),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(ParamValue::Str(v)) => Ok(v),
            _ => Err(Self::mismatch(name, ParamType::Str)),
        }
    }
}
