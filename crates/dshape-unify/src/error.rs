//! Unification errors
//!
//! One tagged failure type for the whole engine. Every kind carries the
//! offending pair as terms plus, where the failure arose from a specific
//! equation, the index of that equation in the caller's list. Failures are
//! terminal for the whole unification call; the solver never backtracks.

use dshape_terms::dtype::ScalarType;
use dshape_terms::term::{Dim, DimSeq, Elem, Shape};
use thiserror::Error;

/// A term of either kind, for failures that can name dimensions or
/// element types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyTerm {
    Dim(Dim),
    Elem(Elem),
}

impl From<Dim> for AnyTerm {
    fn from(dim: Dim) -> Self {
        AnyTerm::Dim(dim)
    }
}

impl From<Elem> for AnyTerm {
    fn from(elem: Elem) -> Self {
        AnyTerm::Elem(elem)
    }
}

impl std::fmt::Display for AnyTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnyTerm::Dim(dim) => write!(f, "{}", dim),
            AnyTerm::Elem(elem) => write!(f, "{}", elem),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnifyError {
    #[error("arity mismatch in equation {equation}: {lhs} against {rhs}")]
    ArityMismatch { lhs: DimSeq, rhs: DimSeq, equation: usize },

    #[error("cannot unify {lhs} with {rhs} in equation {equation}")]
    Clash { lhs: AnyTerm, rhs: AnyTerm, equation: usize },

    #[error("occurs check failed in equation {equation}: {var} occurs in {term}")]
    OccursCheck { var: Box<str>, term: AnyTerm, equation: usize },

    #[error("cannot broadcast {lhs} against {rhs} in equation {equation}")]
    BroadcastIncompatible { lhs: Dim, rhs: Dim, equation: usize },

    #[error("cannot cast {from} to {to} in equation {equation}")]
    CastIncompatible { from: ScalarType, to: ScalarType, equation: usize },

    #[error("malformed equation ({reason}): {lhs} = {rhs}")]
    MalformedEquation { lhs: Shape, rhs: Shape, reason: &'static str },

    #[error("unbound variable {var} in {term}")]
    UnboundVariable { var: Box<str>, term: Shape },
}

pub type UnifyResult<T> = Result<T, UnifyError>;
