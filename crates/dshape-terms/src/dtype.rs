//! Scalar element types and the casting lattice
//!
//! A datashape ends in exactly one scalar element type. Which scalar may be
//! implicitly cast to which is not hard-coded into the solver: it is a
//! configuration value, a directed acyclic "castable-to" relation over the
//! scalar tags. [`CastLattice::default`] embeds the standard numeric
//! promotions; callers may supply a richer relation but never a cyclic one.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Concrete scalar element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Bool,

    // Signed integers
    Int8,
    Int16,
    Int32,
    Int64,

    // Unsigned integers
    UInt8,
    UInt16,
    UInt32,
    UInt64,

    // Floating point
    Float32,
    Float64,

    // Complex
    Complex64,
    Complex128,
}

impl ScalarType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarType::Int8
                | ScalarType::Int16
                | ScalarType::Int32
                | ScalarType::Int64
                | ScalarType::UInt8
                | ScalarType::UInt16
                | ScalarType::UInt32
                | ScalarType::UInt64
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            ScalarType::Int8
                | ScalarType::Int16
                | ScalarType::Int32
                | ScalarType::Int64
                | ScalarType::Float32
                | ScalarType::Float64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ScalarType::Float32 | ScalarType::Float64)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, ScalarType::Complex64 | ScalarType::Complex128)
    }

    pub fn bit_width(&self) -> u16 {
        match self {
            ScalarType::Bool | ScalarType::Int8 | ScalarType::UInt8 => 8,
            ScalarType::Int16 | ScalarType::UInt16 => 16,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 => 32,
            ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => 64,
            ScalarType::Complex64 => 64,
            ScalarType::Complex128 => 128,
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::Bool => write!(f, "bool"),
            ScalarType::Int8 => write!(f, "int8"),
            ScalarType::Int16 => write!(f, "int16"),
            ScalarType::Int32 => write!(f, "int32"),
            ScalarType::Int64 => write!(f, "int64"),
            ScalarType::UInt8 => write!(f, "uint8"),
            ScalarType::UInt16 => write!(f, "uint16"),
            ScalarType::UInt32 => write!(f, "uint32"),
            ScalarType::UInt64 => write!(f, "uint64"),
            ScalarType::Float32 => write!(f, "float32"),
            ScalarType::Float64 => write!(f, "float64"),
            ScalarType::Complex64 => write!(f, "complex64"),
            ScalarType::Complex128 => write!(f, "complex128"),
        }
    }
}

/// Adding this edge would make the castable-to relation cyclic
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("casting lattice cycle: {to} already reaches {from}")]
pub struct LatticeCycle {
    pub from: ScalarType,
    pub to: ScalarType,
}

/// Directed acyclic "castable-to" relation over [`ScalarType`]
///
/// `castable` is the reflexive-transitive closure of the stored edges;
/// `cost` is the edge distance, used to weigh overload candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastLattice {
    edges: BTreeMap<ScalarType, BTreeSet<ScalarType>>,
}

impl CastLattice {
    /// Empty lattice: only identity casts are permitted
    pub fn new() -> Self {
        CastLattice { edges: BTreeMap::new() }
    }

    /// Permit casting `from` into `to`, rejecting edges that would close a cycle
    pub fn allow(&mut self, from: ScalarType, to: ScalarType) -> Result<(), LatticeCycle> {
        if from == to || self.castable(to, from) {
            return Err(LatticeCycle { from, to });
        }
        self.edges.entry(from).or_default().insert(to);
        Ok(())
    }

    /// Whether `from` may be cast into `to` (reflexive, transitive)
    pub fn castable(&self, from: ScalarType, to: ScalarType) -> bool {
        self.cost(from, to).is_some()
    }

    /// Number of promotion steps from `from` to `to`; `None` if not castable
    pub fn cost(&self, from: ScalarType, to: ScalarType) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([(from, 0u32)]);
        while let Some((at, dist)) = queue.pop_front() {
            if let Some(nexts) = self.edges.get(&at) {
                for &next in nexts {
                    if next == to {
                        return Some(dist + 1);
                    }
                    if seen.insert(next) {
                        queue.push_back((next, dist + 1));
                    }
                }
            }
        }
        None
    }
}

impl Default for CastLattice {
    /// The standard numeric promotions
    ///
    /// Integers widen within their own signedness, unsigned widths cross
    /// into the next signed width, the widest integers promote to
    /// `float32` (C-style value promotion, so every integer reaches the
    /// floats transitively), floats widen, and floats embed into complex.
    fn default() -> Self {
        let mut lattice = CastLattice::new();
        let edges = [
            (ScalarType::Bool, ScalarType::Int8),
            (ScalarType::Bool, ScalarType::UInt8),
            (ScalarType::Int8, ScalarType::Int16),
            (ScalarType::Int16, ScalarType::Int32),
            (ScalarType::Int32, ScalarType::Int64),
            (ScalarType::Int64, ScalarType::Float32),
            (ScalarType::UInt8, ScalarType::UInt16),
            (ScalarType::UInt8, ScalarType::Int16),
            (ScalarType::UInt16, ScalarType::UInt32),
            (ScalarType::UInt16, ScalarType::Int32),
            (ScalarType::UInt32, ScalarType::UInt64),
            (ScalarType::UInt32, ScalarType::Int64),
            (ScalarType::UInt64, ScalarType::Float32),
            (ScalarType::Float32, ScalarType::Float64),
            (ScalarType::Float32, ScalarType::Complex64),
            (ScalarType::Float64, ScalarType::Complex128),
            (ScalarType::Complex64, ScalarType::Complex128),
        ];
        for (from, to) in edges {
            lattice
                .allow(from, to)
                .expect("default promotion table is acyclic");
        }
        lattice
    }
}
