//! Overload resolution over the unifier
//!
//! A typed function carries one or more signatures. A call site resolves by
//! unifying the argument shapes against each signature's parameters,
//! weighing the surviving candidates by how much coercion they need, and
//! picking the unique cheapest one. The solver itself knows nothing about
//! any of this; this module is a consumer of [`Unifier`].

use dshape_terms::dtype::CastLattice;
use dshape_terms::term::{Dim, Elem, Shape, VarNames};
use thiserror::Error;

use crate::equation::{validate_rhs, Equation};
use crate::error::UnifyError;
use crate::subst::Solution;
use crate::Unifier;

/// A typed function signature: parameter shapes and a result shape
///
/// Parameters and result are destination shapes, so the full annotation
/// vocabulary (coercion markers, one ellipsis per shape) is available, and
/// a variable reused across parameters denotes one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Shape>,
    ret: Shape,
}

impl Signature {
    pub fn new(params: Vec<Shape>, ret: Shape) -> Result<Signature, DispatchError> {
        for shape in params.iter().chain([&ret]) {
            if let Err(reason) = validate_rhs(shape) {
                return Err(DispatchError::MalformedSignature {
                    shape: shape.clone(),
                    reason,
                });
            }
        }
        if ret.dims.iter().any(|d| matches!(d.strip_coerce(), Dim::Ellipsis(None))) {
            return Err(DispatchError::MalformedSignature {
                shape: ret,
                reason: "anonymous ellipsis in result type",
            });
        }

        // Every result variable must be bound by some parameter, or
        // substitution into the result could never be total.
        let mut bound = VarNames::default();
        for param in &params {
            let names = param.var_names();
            bound.dims.extend(names.dims);
            bound.elems.extend(names.elems);
            bound.seqs.extend(names.seqs);
        }
        let wanted = ret.var_names();
        if !bound.contains_all(&wanted) {
            let var = wanted
                .dims
                .difference(&bound.dims)
                .chain(wanted.elems.difference(&bound.elems))
                .chain(wanted.seqs.difference(&bound.seqs))
                .next()
                .cloned()
                .unwrap_or_else(|| "?".into());
            return Err(DispatchError::UnboundResultVar { var });
        }

        Ok(Signature { params, ret })
    }

    pub fn params(&self) -> &[Shape] {
        &self.params
    }

    pub fn ret(&self) -> &Shape {
        &self.ret
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A signature that survived unification against the call's arguments
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Index into the signature list
    pub index: usize,
    /// The unification solution for this signature
    pub solution: Solution,
    /// The result shape with the solution applied
    pub ret: Shape,
    /// Total coercion weight: cast distance plus one per broadcast
    pub cost: u32,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("malformed signature ({reason}): {shape}")]
    MalformedSignature { shape: Shape, reason: &'static str },

    #[error("result type names {var}, which no parameter binds")]
    UnboundResultVar { var: Box<str> },

    #[error("signature {signature} expects {expected} argument(s), got {found}")]
    ArityMismatch { signature: usize, expected: usize, found: usize },

    #[error("malformed argument: {0}")]
    MalformedArgument(#[from] UnifyError),

    #[error("no signature matches the argument types")]
    NoMatch,

    #[error("ambiguous call: signatures {candidates:?} match at equal cost")]
    Ambiguous { candidates: Vec<usize> },
}

/// Resolve a call against a set of signatures
///
/// Every signature is unified against the argument shapes; failures drop
/// the candidate silently. Survivors are weighed by coercion cost and the
/// unique minimum wins.
pub fn resolve(
    args: &[Shape],
    signatures: &[Signature],
    unifier: &Unifier,
) -> Result<Candidate, DispatchError> {
    let mut survivors: Vec<Candidate> = Vec::new();

    for (index, signature) in signatures.iter().enumerate() {
        if signature.params.len() != args.len() {
            return Err(DispatchError::ArityMismatch {
                signature: index,
                expected: signature.params.len(),
                found: args.len(),
            });
        }

        let equations = args
            .iter()
            .zip(&signature.params)
            .map(|(arg, param)| Equation::new(arg.clone(), param.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let Ok(solution) = unifier.unify(&equations) else {
            continue;
        };
        let Ok(ret) = solution.apply(signature.ret()) else {
            continue;
        };

        let cost = args
            .iter()
            .zip(&signature.params)
            .map(|(arg, param)| shape_cost(arg, param, &solution, unifier.lattice()))
            .sum();
        survivors.push(Candidate { index, solution, ret, cost });
    }

    if survivors.is_empty() {
        return Err(DispatchError::NoMatch);
    }
    let cheapest = survivors.iter().map(|c| c.cost).min().unwrap_or(0);
    let mut at_min: Vec<Candidate> =
        survivors.into_iter().filter(|c| c.cost == cheapest).collect();
    if at_min.len() > 1 {
        return Err(DispatchError::Ambiguous {
            candidates: at_min.iter().map(|c| c.index).collect(),
        });
    }
    Ok(at_min.remove(0))
}

/// Coercion weight of matching one argument against one parameter under a
/// solution
fn shape_cost(arg: &Shape, param: &Shape, solution: &Solution, lattice: &CastLattice) -> u32 {
    let mut cost = 0;

    let dst = match param.elem.strip_coerce() {
        Elem::Scalar(s) => Some(*s),
        Elem::Var(name) => match solution.elem(name) {
            Some(Elem::Scalar(s)) => Some(*s),
            _ => None,
        },
        Elem::Coerce(_) => None,
    };
    if let (Elem::Scalar(src), Some(dst)) = (arg.elem.strip_coerce(), dst) {
        cost += lattice.cost(*src, dst).unwrap_or(0);
    }

    // Resolve the destination dimension run, splicing ellipsis bindings
    let mut dst_dims: Vec<Dim> = Vec::new();
    for dim in &param.dims {
        match dim.strip_coerce() {
            Dim::Var(name) => {
                dst_dims.push(solution.dim(name).cloned().unwrap_or_else(|| dim.clone()))
            }
            Dim::Ellipsis(Some(name)) => {
                if let Some(seq) = solution.seq(name) {
                    dst_dims.extend(seq.iter().cloned());
                }
            }
            Dim::Ellipsis(None) => {}
            other => dst_dims.push(other.clone()),
        }
    }

    // One unit per dimension the argument is padded by, one per absorbed
    // 1-extent
    if dst_dims.len() > arg.dims.len() {
        cost += (dst_dims.len() - arg.dims.len()) as u32;
    }
    for (a, d) in arg.dims.iter().rev().zip(dst_dims.iter().rev()) {
        if matches!(a, Dim::Int(1)) && !matches!(d, Dim::Int(1)) {
            cost += 1;
        }
    }

    cost
}
