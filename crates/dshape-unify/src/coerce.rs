//! Coercion solving
//!
//! The second solver phase. It runs over the coercion-marked sub-equations
//! with the equality-phase solution as its starting context, so every hard
//! constraint is already pinned before a coercion can bind anything.
//!
//! Dimensions broadcast: a 1-extent is absorbed by any extent, and when
//! several coercions touch the same destination variable the non-1 extent
//! wins pairwise as bindings accumulate. Element types cast along the
//! configured lattice. A coerced ellipsis reconciles its occurrences by
//! left-padding the shorter run with 1s and broadcasting element-wise.

use dshape_terms::dtype::CastLattice;
use dshape_terms::term::{Dim, DimSeq, Elem};
use tracing::trace;

use crate::decompose::SubEq;
use crate::error::{UnifyError, UnifyResult};
use crate::subst::Solution;

pub(crate) struct CoercionSolver<'a> {
    solution: Solution,
    lattice: &'a CastLattice,
}

impl<'a> CoercionSolver<'a> {
    pub(crate) fn new(solution: Solution, lattice: &'a CastLattice) -> Self {
        CoercionSolver { solution, lattice }
    }

    /// Process the coercible sub-equations, extending the equality-phase
    /// solution
    pub(crate) fn solve(mut self, subeqs: Vec<SubEq>) -> UnifyResult<Solution> {
        for subeq in subeqs {
            match subeq {
                SubEq::Dim { lhs, rhs, origin, .. } => self.coerce_dim(lhs, rhs, origin)?,
                SubEq::Elem { lhs, rhs, origin, .. } => self.coerce_elem(lhs, rhs, origin)?,
                SubEq::Seq { var, dims, origin, .. } => self.reconcile_seq(var, dims, origin)?,
            }
        }
        Ok(self.solution)
    }

    /// Resolve a dimension, also reporting the variable that directly
    /// holds the final value, if any; that variable is the rebind target
    /// when a provisional 1 is absorbed later
    fn resolve_tracking(&self, dim: &Dim) -> (Dim, Option<Box<str>>) {
        let mut holder = None;
        let mut current = dim.clone();
        loop {
            match current {
                Dim::Var(name) => match self.solution.dim(&name) {
                    Some(next) => {
                        let next = next.clone();
                        holder = Some(name);
                        current = next;
                    }
                    None => return (Dim::Var(name.clone()), Some(name)),
                },
                other => return (other, holder),
            }
        }
    }

    fn coerce_dim(&mut self, lhs: Dim, rhs: Dim, origin: usize) -> UnifyResult<()> {
        let lhs = self.solution.resolve_dim(&lhs);
        let (rhs, rhs_var) = self.resolve_tracking(&rhs);
        match (&lhs, &rhs) {
            // An unbound destination variable takes the source extent,
            // 1 included; a later non-1 occurrence rebinds it.
            (_, Dim::Var(name)) => {
                trace!(var = %name, value = %lhs, "broadcast bound destination variable");
                self.solution.insert_dim(name.clone(), lhs);
                Ok(())
            }
            // The 1-extent broadcasts into anything
            (Dim::Int(1), _) => Ok(()),
            (Dim::Int(a), Dim::Int(b)) if a == b => Ok(()),
            // Non-1 wins over an accumulated 1
            (Dim::Int(a), Dim::Int(1)) => {
                if let Some(var) = rhs_var {
                    trace!(var = %var, value = *a, "broadcast rebound absorbed 1-extent");
                    self.solution.insert_dim(var, Dim::Int(*a));
                }
                Ok(())
            }
            (Dim::Int(_), Dim::Int(_)) => Err(UnifyError::BroadcastIncompatible {
                lhs,
                rhs,
                equation: origin,
            }),
            // An unbound source variable is pinned by the destination
            (Dim::Var(name), _) => {
                self.solution.insert_dim(name.clone(), rhs.clone());
                Ok(())
            }
            _ => Err(UnifyError::Clash {
                lhs: lhs.into(),
                rhs: rhs.into(),
                equation: origin,
            }),
        }
    }

    fn coerce_elem(&mut self, lhs: Elem, rhs: Elem, origin: usize) -> UnifyResult<()> {
        let lhs = self.solution.resolve_elem(&lhs);
        let rhs = self.solution.resolve_elem(&rhs);
        match (&lhs, &rhs) {
            // An unbound destination variable takes the source type; any
            // non-coerced occurrence has already pinned it in the equality
            // phase.
            (_, Elem::Var(name)) => {
                trace!(var = %name, value = %lhs, "cast bound destination variable");
                self.solution.insert_elem(name.clone(), lhs);
                Ok(())
            }
            (Elem::Scalar(a), Elem::Scalar(b)) if a == b => Ok(()),
            (Elem::Scalar(a), Elem::Scalar(b)) => {
                if self.lattice.castable(*a, *b) {
                    Ok(())
                } else {
                    Err(UnifyError::CastIncompatible {
                        from: *a,
                        to: *b,
                        equation: origin,
                    })
                }
            }
            // An unbound source variable is pinned by the destination
            (Elem::Var(name), _) => {
                self.solution.insert_elem(name.clone(), rhs.clone());
                Ok(())
            }
            _ => Err(UnifyError::Clash {
                lhs: lhs.into(),
                rhs: rhs.into(),
                equation: origin,
            }),
        }
    }

    /// Reconcile one occurrence of a coerced ellipsis with its current
    /// binding
    ///
    /// The first occurrence binds verbatim, an empty run included. A later
    /// occurrence left-pads the shorter run with 1s and broadcasts
    /// element-wise, so a scalar only picks up padding when a sibling
    /// equation contributed a non-empty run.
    fn reconcile_seq(&mut self, var: Box<str>, dims: Vec<Dim>, origin: usize) -> UnifyResult<()> {
        let incoming: Vec<Dim> = dims.iter().map(|d| self.solution.resolve_dim(d)).collect();
        match self.solution.seq(&var).cloned() {
            None => {
                let seq = DimSeq(incoming);
                trace!(var = %var, value = %seq, "bound coerced ellipsis");
                self.solution.insert_seq(var, seq);
                Ok(())
            }
            Some(bound) => {
                let width = bound.len().max(incoming.len());
                let current = left_pad(bound.0, width);
                let incoming = left_pad(incoming, width);
                let merged = current
                    .into_iter()
                    .zip(incoming)
                    .map(|(cur, new)| self.broadcast_pair(cur, new, origin))
                    .collect::<UnifyResult<Vec<Dim>>>()?;
                let seq = DimSeq(merged);
                trace!(var = %var, value = %seq, "rebound coerced ellipsis");
                self.solution.insert_seq(var, seq);
                Ok(())
            }
        }
    }

    /// Broadcast two dimensions, binding unbound variables to the other
    /// side
    fn broadcast_pair(&mut self, cur: Dim, new: Dim, origin: usize) -> UnifyResult<Dim> {
        let cur = self.solution.resolve_dim(&cur);
        let new = self.solution.resolve_dim(&new);
        match (&cur, &new) {
            (Dim::Int(a), Dim::Int(b)) if a == b => Ok(cur),
            (Dim::Int(1), _) => Ok(new),
            (_, Dim::Int(1)) => Ok(cur),
            (Dim::Var(name), other) => {
                self.solution.insert_dim(name.clone(), other.clone());
                Ok(new)
            }
            (other, Dim::Var(name)) => {
                self.solution.insert_dim(name.clone(), other.clone());
                Ok(cur)
            }
            (Dim::Int(_), Dim::Int(_)) => Err(UnifyError::BroadcastIncompatible {
                lhs: cur,
                rhs: new,
                equation: origin,
            }),
            _ => Err(UnifyError::Clash {
                lhs: cur.into(),
                rhs: new.into(),
                equation: origin,
            }),
        }
    }
}

fn left_pad(mut dims: Vec<Dim>, width: usize) -> Vec<Dim> {
    let mut padded = vec![Dim::Int(1); width - dims.len()];
    padded.append(&mut dims);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use dshape_terms::dtype::ScalarType;

    fn solver(lattice: &CastLattice) -> CoercionSolver<'_> {
        CoercionSolver::new(Solution::new(), lattice)
    }

    fn dim_subeq(lhs: Dim, rhs: Dim) -> SubEq {
        SubEq::Dim { lhs, rhs, coercible: true, origin: 0 }
    }

    fn elem_subeq(lhs: Elem, rhs: Elem) -> SubEq {
        SubEq::Elem { lhs, rhs, coercible: true, origin: 0 }
    }

    fn seq_subeq(var: &str, dims: Vec<Dim>) -> SubEq {
        SubEq::Seq { var: var.into(), dims, coercible: true, origin: 0 }
    }

    #[test]
    fn test_one_broadcasts_into_concrete() {
        let lattice = CastLattice::default();
        let solution = solver(&lattice)
            .solve(vec![dim_subeq(Dim::Int(1), Dim::Int(10))])
            .unwrap();
        assert!(solution.is_empty());
    }

    #[test]
    fn test_unbound_var_takes_extent_even_one() {
        let lattice = CastLattice::default();
        let solution = solver(&lattice)
            .solve(vec![dim_subeq(Dim::Int(1), Dim::var("n"))])
            .unwrap();
        assert_eq!(solution.dim("n"), Some(&Dim::Int(1)));
    }

    #[test]
    fn test_non_one_wins_pairwise() {
        let lattice = CastLattice::default();
        let solution = solver(&lattice)
            .solve(vec![
                dim_subeq(Dim::Int(1), Dim::var("n")),
                dim_subeq(Dim::Int(10), Dim::var("n")),
            ])
            .unwrap();
        assert_eq!(solution.dim("n"), Some(&Dim::Int(10)));
    }

    #[test]
    fn test_accumulated_non_one_must_agree() {
        let lattice = CastLattice::default();
        let err = solver(&lattice)
            .solve(vec![
                dim_subeq(Dim::Int(5), Dim::var("n")),
                dim_subeq(Dim::Int(10), Dim::var("n")),
            ])
            .unwrap_err();
        assert!(matches!(err, UnifyError::BroadcastIncompatible { .. }));
    }

    #[test]
    fn test_concrete_broadcast_mismatch() {
        let lattice = CastLattice::default();
        let err = solver(&lattice)
            .solve(vec![dim_subeq(Dim::Int(5), Dim::Int(10))])
            .unwrap_err();
        assert!(matches!(
            err,
            UnifyError::BroadcastIncompatible { lhs: Dim::Int(5), rhs: Dim::Int(10), .. }
        ));
    }

    #[test]
    fn test_cast_along_lattice() {
        let lattice = CastLattice::default();
        let solution = solver(&lattice)
            .solve(vec![elem_subeq(
                Elem::Scalar(ScalarType::Int32),
                Elem::Scalar(ScalarType::Float64),
            )])
            .unwrap();
        assert!(solution.is_empty());
    }

    #[test]
    fn test_cast_rejected_off_lattice() {
        let lattice = CastLattice::default();
        let err = solver(&lattice)
            .solve(vec![elem_subeq(
                Elem::Scalar(ScalarType::Float64),
                Elem::Scalar(ScalarType::Int32),
            )])
            .unwrap_err();
        assert_eq!(
            err,
            UnifyError::CastIncompatible {
                from: ScalarType::Float64,
                to: ScalarType::Int32,
                equation: 0,
            }
        );
    }

    #[test]
    fn test_equality_pinned_type_constrains_cast() {
        // dtype pinned to float32 in the equality phase; a coerced int32
        // occurrence casts into it
        let lattice = CastLattice::default();
        let mut pinned = Solution::new();
        pinned.insert_elem("t".into(), Elem::Scalar(ScalarType::Float32));
        let solution = CoercionSolver::new(pinned, &lattice)
            .solve(vec![elem_subeq(Elem::Scalar(ScalarType::Int32), Elem::var("t"))])
            .unwrap();
        assert_eq!(solution.elem("t"), Some(&Elem::Scalar(ScalarType::Float32)));
    }

    #[test]
    fn test_first_coerced_occurrence_pins_type() {
        // float64 binds t; int32 then casts into it
        let lattice = CastLattice::default();
        let solution = solver(&lattice)
            .solve(vec![
                elem_subeq(Elem::Scalar(ScalarType::Float64), Elem::var("t")),
                elem_subeq(Elem::Scalar(ScalarType::Int32), Elem::var("t")),
            ])
            .unwrap();
        assert_eq!(solution.elem("t"), Some(&Elem::Scalar(ScalarType::Float64)));
    }

    #[test]
    fn test_ellipsis_broadcast_left_pads() {
        let lattice = CastLattice::default();
        let solution = solver(&lattice)
            .solve(vec![
                seq_subeq("A", vec![Dim::Int(10)]),
                seq_subeq("A", vec![Dim::Int(10), Dim::Int(10)]),
            ])
            .unwrap();
        assert_eq!(solution.seq("A"), Some(&DimSeq(vec![Dim::Int(10), Dim::Int(10)])));
    }

    #[test]
    fn test_ellipsis_broadcast_absorbs_ones() {
        let lattice = CastLattice::default();
        let solution = solver(&lattice)
            .solve(vec![
                seq_subeq("A", vec![Dim::Int(1), Dim::Int(10)]),
                seq_subeq("A", vec![Dim::Int(10), Dim::Int(10)]),
            ])
            .unwrap();
        assert_eq!(solution.seq("A"), Some(&DimSeq(vec![Dim::Int(10), Dim::Int(10)])));
    }

    #[test]
    fn test_ellipsis_broadcast_incompatible() {
        let lattice = CastLattice::default();
        let err = solver(&lattice)
            .solve(vec![
                seq_subeq("A", vec![Dim::Int(1), Dim::Int(5)]),
                seq_subeq("A", vec![Dim::Int(10), Dim::Int(10)]),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            UnifyError::BroadcastIncompatible { lhs: Dim::Int(5), rhs: Dim::Int(10), equation: 0 }
        );
    }

    #[test]
    fn test_empty_occurrence_accepted_then_padded() {
        let lattice = CastLattice::default();
        let solution = solver(&lattice)
            .solve(vec![
                seq_subeq("A", vec![]),
                seq_subeq("A", vec![Dim::Int(10), Dim::Int(10)]),
            ])
            .unwrap();
        assert_eq!(solution.seq("A"), Some(&DimSeq(vec![Dim::Int(10), Dim::Int(10)])));
    }

    #[test]
    fn test_lone_empty_occurrence_stays_empty() {
        let lattice = CastLattice::default();
        let solution = solver(&lattice).solve(vec![seq_subeq("A", vec![])]).unwrap();
        assert_eq!(solution.seq("A"), Some(&DimSeq(vec![])));
    }
}
