//! Decomposition of shape equations
//!
//! One shape equation splits into an element-type sub-equation plus one
//! sub-equation per dimension position, with the single optional ellipsis
//! on the destination side absorbing the unmatched middle of the source
//! dimension run. Coercion markers are stripped here into a per-sub-equation
//! `coercible` flag; the solvers never see a marker.

use dshape_terms::term::{Dim, DimSeq, Elem};

use crate::equation::Equation;
use crate::error::{UnifyError, UnifyResult};

/// A sub-equation produced by decomposition
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SubEq {
    /// A positional dimension pair
    Dim { lhs: Dim, rhs: Dim, coercible: bool, origin: usize },
    /// The element-type pair
    Elem { lhs: Elem, rhs: Elem, coercible: bool, origin: usize },
    /// An ellipsis binding: the destination ellipsis against the source's
    /// middle dimension run
    Seq { var: Box<str>, dims: Vec<Dim>, coercible: bool, origin: usize },
}

impl SubEq {
    pub(crate) fn is_coercible(&self) -> bool {
        match self {
            SubEq::Dim { coercible, .. }
            | SubEq::Elem { coercible, .. }
            | SubEq::Seq { coercible, .. } => *coercible,
        }
    }
}

fn dim_pair(lhs: &Dim, rhs: &Dim, origin: usize) -> SubEq {
    SubEq::Dim {
        lhs: lhs.clone(),
        rhs: rhs.strip_coerce().clone(),
        coercible: rhs.is_coerced(),
        origin,
    }
}

/// Split one shape equation into sub-equations
pub(crate) fn decompose(equation: &Equation, origin: usize) -> UnifyResult<Vec<SubEq>> {
    let lhs = equation.lhs();
    let rhs = equation.rhs();

    let mut out = Vec::with_capacity(rhs.dims.len() + 1);
    out.push(SubEq::Elem {
        lhs: lhs.elem.clone(),
        rhs: rhs.elem.strip_coerce().clone(),
        coercible: rhs.elem.is_coerced(),
        origin,
    });

    let arity_mismatch = || UnifyError::ArityMismatch {
        lhs: DimSeq(lhs.dims.clone()),
        rhs: DimSeq(rhs.dims.clone()),
        equation: origin,
    };

    match rhs.dims.iter().position(Dim::is_ellipsis) {
        None => {
            if lhs.dims.len() != rhs.dims.len() {
                return Err(arity_mismatch());
            }
            for (l, r) in lhs.dims.iter().zip(&rhs.dims) {
                out.push(dim_pair(l, r, origin));
            }
        }
        Some(at) => {
            let suffix = rhs.dims.len() - at - 1;
            if lhs.dims.len() < at + suffix {
                return Err(arity_mismatch());
            }
            let middle_end = lhs.dims.len() - suffix;

            for (l, r) in lhs.dims[..at].iter().zip(&rhs.dims[..at]) {
                out.push(dim_pair(l, r, origin));
            }

            let ellipsis = &rhs.dims[at];
            let var = match ellipsis.strip_coerce() {
                Dim::Ellipsis(Some(name)) => name.clone(),
                _ => {
                    return Err(UnifyError::MalformedEquation {
                        lhs: lhs.clone(),
                        rhs: rhs.clone(),
                        reason: "unnamed ellipsis reached decomposition",
                    })
                }
            };
            out.push(SubEq::Seq {
                var,
                dims: lhs.dims[at..middle_end].to_vec(),
                coercible: ellipsis.is_coerced(),
                origin,
            });

            for (l, r) in lhs.dims[middle_end..].iter().zip(&rhs.dims[at + 1..]) {
                out.push(dim_pair(l, r, origin));
            }
        }
    }

    Ok(out)
}
