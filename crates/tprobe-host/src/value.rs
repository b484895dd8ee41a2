//! Values held by a recorded frame.

use indexmap::IndexMap;
use serde_json::Value as Json;
use smol_str::SmolStr;
use tprobe_core::Value;

use crate::error::HostError;

/// Key marking a JSON object as a pointer.
pub const POINTER_KEY: &str = "$ptr";
/// Key holding a pointer's captured target.
pub const TARGET_KEY: &str = "$target";
/// Key naming a record's type.
pub const TYPE_KEY: &str = "$type";

/// Frame value, possibly nested.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Leaf value.
    Scalar(Value),
    /// Struct or class instance.
    Record {
        type_name: SmolStr,
        fields: IndexMap<SmolStr, HostValue>,
    },
    /// Pointer with its captured target, if any.
    Pointer {
        address: u64,
        target: Option<Box<HostValue>>,
    },
}

impl HostValue {
    /// Convert a JSON frame value.
    ///
    /// `null` is a null scalar, objects are records unless they carry
    /// `"$ptr"`, arrays become records with positional field names.
    pub fn from_json(json: Json) -> Result<Self, HostError> {
        match json {
            Json::Null => Ok(Self::Scalar(Value::Null)),
            Json::Bool(value) => Ok(Self::Scalar(Value::Bool(value))),
            Json::Number(number) => number_value(&number).map(Self::Scalar),
            Json::String(text) => Ok(Self::Scalar(Value::Text(text.into()))),
            Json::Array(items) => {
                let type_name = SmolStr::new(format!("array[{}]", items.len()));
                let fields = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| Ok((SmolStr::new(index.to_string()), Self::from_json(item)?)))
                    .collect::<Result<_, HostError>>()?;
                Ok(Self::Record { type_name, fields })
            }
            Json::Object(mut object) => {
                if let Some(address) = object.remove(POINTER_KEY) {
                    let address = pointer_address(&address)?;
                    let target = object
                        .remove(TARGET_KEY)
                        .map(Self::from_json)
                        .transpose()?
                        .map(Box::new);
                    if let Some(extra) = object.keys().next() {
                        return Err(HostError::InvalidValue(
                            format!("unexpected key '{extra}' in pointer").into(),
                        ));
                    }
                    return Ok(Self::Pointer { address, target });
                }
                let type_name = match object.remove(TYPE_KEY) {
                    Some(Json::String(name)) => SmolStr::new(name),
                    Some(_) => {
                        return Err(HostError::InvalidValue("'$type' must be a string".into()))
                    }
                    None => SmolStr::new_inline("struct"),
                };
                let fields = object
                    .into_iter()
                    .map(|(name, value)| Ok((SmolStr::new(name), Self::from_json(value)?)))
                    .collect::<Result<_, HostError>>()?;
                Ok(Self::Record { type_name, fields })
            }
        }
    }

    /// Flatten to the value reported for a read.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Record { type_name, .. } => Value::Aggregate {
                type_name: type_name.clone(),
            },
            Self::Pointer { address, .. } => Value::Address(*address),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> SmolStr {
        match self {
            Self::Scalar(value) => value.type_name().into(),
            Self::Record { type_name, .. } => type_name.clone(),
            Self::Pointer { target, .. } => match target {
                Some(target) => format!("{} *", target.type_name()).into(),
                None => SmolStr::new_inline("void *"),
            },
        }
    }
}

fn number_value(number: &serde_json::Number) -> Result<Value, HostError> {
    if let Some(value) = number.as_i64() {
        return Ok(Value::Int(value));
    }
    number
        .as_f64()
        .map(Value::Float)
        .ok_or_else(|| HostError::InvalidValue(format!("number {number} out of range").into()))
}

fn pointer_address(json: &Json) -> Result<u64, HostError> {
    let invalid = || HostError::InvalidValue(format!("invalid pointer address {json}").into());
    match json {
        Json::Number(number) => number.as_u64().ok_or_else(invalid),
        Json::String(text) => {
            let hex = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .ok_or_else(invalid)?;
            u64::from_str_radix(hex, 16).map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}
