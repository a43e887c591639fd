//! # dshape-unify
//!
//! Unification of datashapes: match source shapes (the concrete types of
//! array arguments) against destination shapes (parameter types from typed
//! signatures), producing a substitution from type variables to concrete
//! terms. Applying the substitution to a signature's declared result shape
//! yields the concrete result type.
//!
//! The pipeline is fixed: α-rename every variable (destination names are
//! shared across equations, each source side is its own scope), decompose
//! shape equations into dimension / element-type / ellipsis sub-equations,
//! solve the equality sub-equations, then the coercion-marked ones under
//! broadcasting and casting, and return the solution keyed by the caller's
//! destination names.
//!
//! ## Example
//!
//! ```rust
//! use dshape_terms::prelude::*;
//! use dshape_unify::{substitute, unify, Equation};
//!
//! // Two 10×10 int32 arguments against the signature A...*int32
//! let arg = Shape::of([Dim::Int(10), Dim::Int(10)], ScalarType::Int32);
//! let param = Shape::of([Dim::ellipsis("A")], ScalarType::Int32);
//! let equations = [
//!     Equation::new(arg.clone(), param.clone()).unwrap(),
//!     Equation::new(arg.clone(), param.clone()).unwrap(),
//! ];
//!
//! let solution = unify(&equations).unwrap();
//! assert_eq!(solution.seq("A"), Some(&DimSeq(vec![Dim::Int(10), Dim::Int(10)])));
//!
//! // Concretise the declared result type
//! let result = substitute(&solution, &param).unwrap();
//! assert_eq!(result, arg);
//! ```

pub mod dispatch;
pub mod equation;
pub mod error;
pub mod subst;

mod coerce;
mod decompose;
mod relabel;
mod solve;

pub use dispatch::{resolve, Candidate, DispatchError, Signature};
pub use equation::Equation;
pub use error::{AnyTerm, UnifyError, UnifyResult};
pub use subst::Solution;

use dshape_terms::dtype::CastLattice;
use dshape_terms::term::Shape;
use tracing::debug;

/// The unification engine, configured with an element-type casting lattice
#[derive(Debug, Clone)]
pub struct Unifier {
    lattice: CastLattice,
}

impl Unifier {
    pub fn new(lattice: CastLattice) -> Self {
        Unifier { lattice }
    }

    pub fn lattice(&self) -> &CastLattice {
        &self.lattice
    }

    /// Solve a list of equations into a substitution
    ///
    /// On success the returned solution is fully resolved, idempotent, and
    /// keyed by the destination variable names the caller wrote.
    pub fn unify(&self, equations: &[Equation]) -> UnifyResult<Solution> {
        let relabeled = relabel::relabel(equations);

        let mut rigid = Vec::new();
        let mut coercible = Vec::new();
        for (index, equation) in relabeled.equations.iter().enumerate() {
            for subeq in
                decompose::decompose(equation, index).map_err(|e| relabeled.restore(e))?
            {
                if subeq.is_coercible() {
                    coercible.push(subeq);
                } else {
                    rigid.push(subeq);
                }
            }
        }
        debug!(
            equations = equations.len(),
            rigid = rigid.len(),
            coercible = coercible.len(),
            "decomposed"
        );

        let solution = solve::solve_equalities(rigid).map_err(|e| relabeled.restore(e))?;
        let solution = coerce::CoercionSolver::new(solution, &self.lattice)
            .solve(coercible)
            .map_err(|e| relabeled.restore(e))?;

        let exported = relabeled.export(&solution);
        debug!(bindings = exported.len(), "unified");
        Ok(exported)
    }
}

impl Default for Unifier {
    fn default() -> Self {
        Unifier::new(CastLattice::default())
    }
}

/// Unify under the default casting lattice
pub fn unify(equations: &[Equation]) -> UnifyResult<Solution> {
    Unifier::default().unify(equations)
}

/// Apply a solution to a shape
///
/// Fails with [`UnifyError::UnboundVariable`] if the shape mentions a
/// variable the solution does not bind.
pub fn substitute(solution: &Solution, shape: &Shape) -> UnifyResult<Shape> {
    solution.apply(shape)
}
