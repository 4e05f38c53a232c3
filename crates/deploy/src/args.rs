//! Constructor argument typing and ABI encoding.

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use thiserror::Error;

/// Errors raised while building the constructor part of the init code.
///
/// These are always fatal: arguments are never truncated or padded to make
/// them fit a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("constructor expects {expected} argument(s), got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("constructor argument #{index} expects {expected}, got {found}")]
    TypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },
    #[error("constructor argument #{index} does not fit in {ty}")]
    Overflow { index: usize, ty: String },
    #[error("invalid solidity type '{0}'")]
    InvalidType(String),
    #[error("constructor argument #{index} is not a valid {ty}: '{value}'")]
    InvalidValue {
        index: usize,
        ty: String,
        value: String,
    },
    #[error("declared signature ({declared}) does not match the artifact constructor ({artifact})")]
    SignatureMismatch { declared: String, artifact: String },
}

/// A typed, ordered constructor argument list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstructorArgs {
    signature: Vec<DynSolType>,
    values: Vec<DynSolValue>,
}

impl ConstructorArgs {
    /// Pair a signature with values, checking arity, types and integer widths.
    pub fn new(signature: Vec<DynSolType>, values: Vec<DynSolValue>) -> Result<Self, EncodeError> {
        if signature.len() != values.len() {
            return Err(EncodeError::ArityMismatch {
                expected: signature.len(),
                found: values.len(),
            });
        }

        for (index, (ty, value)) in signature.iter().zip(&values).enumerate() {
            if !ty.matches(value) {
                return Err(EncodeError::TypeMismatch {
                    index,
                    expected: ty.sol_type_name().into_owned(),
                    found: value
                        .as_type()
                        .map(|t| t.sol_type_name().into_owned())
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            }

            if let DynSolValue::Uint(v, bits) = value {
                if v.bit_len() > *bits {
                    return Err(EncodeError::Overflow {
                        index,
                        ty: ty.sol_type_name().into_owned(),
                    });
                }
            }
        }

        Ok(Self { signature, values })
    }

    /// Parse a signature and string values, e.g. `("address", "0x..")`, `("uint128", "20000000")`.
    pub fn parse<T, V>(pairs: impl IntoIterator<Item = (T, V)>) -> Result<Self, EncodeError>
    where
        T: AsRef<str>,
        V: AsRef<str>,
    {
        let mut signature = Vec::new();
        let mut values = Vec::new();

        for (index, (ty, value)) in pairs.into_iter().enumerate() {
            let ty_str = ty.as_ref();
            let value_str = value.as_ref();
            let parsed =
                DynSolType::parse(ty_str).map_err(|_| EncodeError::InvalidType(ty_str.to_string()))?;
            let coerced = parsed
                .coerce_str(value_str)
                .map_err(|_| EncodeError::InvalidValue {
                    index,
                    ty: ty_str.to_string(),
                    value: value_str.to_string(),
                })?;
            signature.push(parsed);
            values.push(coerced);
        }

        Self::new(signature, values)
    }

    pub fn signature(&self) -> &[DynSolType] {
        &self.signature
    }

    pub fn values(&self) -> &[DynSolValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Comma separated canonical types, e.g. `address,uint128`.
    pub fn signature_string(&self) -> String {
        join_types(&self.signature)
    }

    /// ABI-encode the arguments as constructor parameters.
    pub fn encode(&self) -> Bytes {
        if self.values.is_empty() {
            return Bytes::new();
        }
        DynSolValue::Tuple(self.values.clone())
            .abi_encode_params()
            .into()
    }

    /// Check the declared signature against the constructor found in a compiled ABI.
    ///
    /// An ABI without a constructor only accepts an empty argument list.
    pub fn check_against(&self, abi: &JsonAbi) -> Result<(), EncodeError> {
        let artifact = match &abi.constructor {
            Some(constructor) => constructor
                .inputs
                .iter()
                .map(|param| {
                    let selector_type = param.selector_type();
                    DynSolType::parse(&selector_type)
                        .map_err(|_| EncodeError::InvalidType(selector_type.into_owned()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        if artifact != self.signature {
            return Err(EncodeError::SignatureMismatch {
                declared: self.signature_string(),
                artifact: join_types(&artifact),
            });
        }

        Ok(())
    }
}

fn join_types(types: &[DynSolType]) -> String {
    types
        .iter()
        .map(|t| t.sol_type_name().into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Concatenate creation bytecode and encoded constructor arguments.
pub fn init_code(bytecode: &[u8], args: &ConstructorArgs) -> Bytes {
    let encoded = args.encode();
    let mut code = Vec::with_capacity(bytecode.len() + encoded.len());
    code.extend_from_slice(bytecode);
    code.extend_from_slice(&encoded);
    code.into()
}
