//! Serialization for datashape terms
//!
//! Two wire formats for handing shapes between a frontend (parser, array
//! runtime) and the engine:
//! - JSON via serde_json
//! - binary via bincode

use thiserror::Error;

use crate::term::Shape;

/// Serialization error
#[derive(Error, Debug)]
pub enum SerError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary error: {0}")]
    Binary(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, SerError>;

/// Serialize a shape to JSON
pub fn to_json(shape: &Shape) -> Result<String> {
    Ok(serde_json::to_string(shape)?)
}

/// Deserialize a shape from JSON
pub fn from_json(json: &str) -> Result<Shape> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize a shape to binary
pub fn to_binary(shape: &Shape) -> Result<Vec<u8>> {
    Ok(bincode::serialize(shape)?)
}

/// Deserialize a shape from binary
pub fn from_binary(bytes: &[u8]) -> Result<Shape> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::ScalarType;
    use crate::term::{Dim, Elem};

    #[test]
    fn test_json_roundtrip() {
        let shape = Shape::of(
            [Dim::Int(10), Dim::coerce(Dim::ellipsis("A"))],
            Elem::coerce(Elem::var("t")),
        );
        let json = to_json(&shape).unwrap();
        assert_eq!(from_json(&json).unwrap(), shape);
    }

    #[test]
    fn test_binary_roundtrip() {
        let shape = Shape::of([Dim::var("n")], ScalarType::Float64);
        let bytes = to_binary(&shape).unwrap();
        assert_eq!(from_binary(&bytes).unwrap(), shape);
    }

    #[test]
    fn test_json_rejects_garbage() {
        assert!(from_json("{\"rank\": 3}").is_err());
    }
}
