//! Equality solving
//!
//! Robinson-style unification over the decomposed sub-equations, processed
//! as a worklist. Equality sub-equations demand identity: concrete terms
//! must match exactly, variables bind after the occurs check, and a second
//! binding for an ellipsis must agree element-wise with the first.

use std::collections::VecDeque;

use dshape_terms::term::{Dim, DimSeq, Elem};
use tracing::trace;

use crate::decompose::SubEq;
use crate::error::{UnifyError, UnifyResult};
use crate::subst::Solution;

/// Solve the non-coercible sub-equations, producing the equality-phase
/// solution
pub(crate) fn solve_equalities(subeqs: Vec<SubEq>) -> UnifyResult<Solution> {
    let mut solution = Solution::new();
    let mut worklist: VecDeque<SubEq> = subeqs.into();

    while let Some(subeq) = worklist.pop_front() {
        match subeq {
            SubEq::Dim { lhs, rhs, origin, .. } => dim_eq(&mut solution, lhs, rhs, origin)?,
            SubEq::Elem { lhs, rhs, origin, .. } => elem_eq(&mut solution, lhs, rhs, origin)?,
            SubEq::Seq { var, dims, origin, .. } => {
                seq_eq(&mut solution, var, dims, origin, &mut worklist)?
            }
        }
    }

    Ok(solution)
}

fn dim_eq(solution: &mut Solution, lhs: Dim, rhs: Dim, origin: usize) -> UnifyResult<()> {
    let lhs = solution.resolve_dim(&lhs);
    let rhs = solution.resolve_dim(&rhs);
    match (lhs, rhs) {
        (Dim::Int(a), Dim::Int(b)) if a == b => Ok(()),
        // Of two variables, bind the destination one, so destination names
        // always end up in the solution
        (other, Dim::Var(var)) | (Dim::Var(var), other) => bind_dim(solution, var, other, origin),
        (lhs, rhs) => Err(UnifyError::Clash {
            lhs: lhs.into(),
            rhs: rhs.into(),
            equation: origin,
        }),
    }
}

fn bind_dim(solution: &mut Solution, var: Box<str>, value: Dim, origin: usize) -> UnifyResult<()> {
    if let Dim::Var(other) = &value {
        if **other == *var {
            return Ok(());
        }
    }
    if occurs_in_dim(&var, &value) {
        return Err(UnifyError::OccursCheck {
            var,
            term: value.into(),
            equation: origin,
        });
    }
    trace!(var = %var, value = %value, "bound dimension variable");
    solution.insert_dim(var, value);
    Ok(())
}

/// Occurs check for dimension terms
///
/// Datashapes are flat, so a variable can only occur in a candidate by
/// being the whole candidate.
fn occurs_in_dim(var: &str, dim: &Dim) -> bool {
    matches!(dim, Dim::Var(name) if **name == *var)
}

fn elem_eq(solution: &mut Solution, lhs: Elem, rhs: Elem, origin: usize) -> UnifyResult<()> {
    let lhs = solution.resolve_elem(&lhs);
    let rhs = solution.resolve_elem(&rhs);
    match (lhs, rhs) {
        (Elem::Scalar(a), Elem::Scalar(b)) if a == b => Ok(()),
        (other, Elem::Var(var)) | (Elem::Var(var), other) => {
            bind_elem(solution, var, other, origin)
        }
        (lhs, rhs) => Err(UnifyError::Clash {
            lhs: lhs.into(),
            rhs: rhs.into(),
            equation: origin,
        }),
    }
}

fn bind_elem(
    solution: &mut Solution,
    var: Box<str>,
    value: Elem,
    origin: usize,
) -> UnifyResult<()> {
    if let Elem::Var(other) = &value {
        if **other == *var {
            return Ok(());
        }
    }
    if occurs_in_elem(&var, &value) {
        return Err(UnifyError::OccursCheck {
            var,
            term: value.into(),
            equation: origin,
        });
    }
    trace!(var = %var, value = %value, "bound element-type variable");
    solution.insert_elem(var, value);
    Ok(())
}

/// Occurs check for element-type terms; same flatness argument as
/// [`occurs_in_dim`]
fn occurs_in_elem(var: &str, elem: &Elem) -> bool {
    matches!(elem, Elem::Var(name) if **name == *var)
}

/// Ellipsis binding: first binding wins, a repeat must agree element-wise
fn seq_eq(
    solution: &mut Solution,
    var: Box<str>,
    dims: Vec<Dim>,
    origin: usize,
    worklist: &mut VecDeque<SubEq>,
) -> UnifyResult<()> {
    let dims: Vec<Dim> = dims.iter().map(|d| solution.resolve_dim(d)).collect();
    match solution.seq(&var).cloned() {
        None => {
            let seq = DimSeq(dims);
            trace!(var = %var, value = %seq, "bound ellipsis variable");
            solution.insert_seq(var, seq);
            Ok(())
        }
        Some(bound) => {
            if bound.len() != dims.len() {
                return Err(UnifyError::ArityMismatch {
                    lhs: DimSeq(dims),
                    rhs: bound,
                    equation: origin,
                });
            }
            for (lhs, rhs) in dims.into_iter().zip(bound.0) {
                worklist.push_back(SubEq::Dim { lhs, rhs, coercible: false, origin });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dshape_terms::dtype::ScalarType;

    fn dim_subeq(lhs: Dim, rhs: Dim) -> SubEq {
        SubEq::Dim { lhs, rhs, coercible: false, origin: 0 }
    }

    fn seq_subeq(var: &str, dims: Vec<Dim>) -> SubEq {
        SubEq::Seq { var: var.into(), dims, coercible: false, origin: 0 }
    }

    #[test]
    fn test_equal_ints() {
        let solution = solve_equalities(vec![dim_subeq(Dim::Int(3), Dim::Int(3))]).unwrap();
        assert!(solution.is_empty());
    }

    #[test]
    fn test_unequal_ints_clash() {
        let err = solve_equalities(vec![dim_subeq(Dim::Int(3), Dim::Int(5))]).unwrap_err();
        assert!(matches!(err, UnifyError::Clash { .. }));
    }

    #[test]
    fn test_var_binds_to_int() {
        let solution = solve_equalities(vec![dim_subeq(Dim::Int(10), Dim::var("n"))]).unwrap();
        assert_eq!(solution.dim("n"), Some(&Dim::Int(10)));
    }

    #[test]
    fn test_var_chain_resolves() {
        // n = m, then m = 5, so n = 5
        let solution = solve_equalities(vec![
            dim_subeq(Dim::var("n"), Dim::var("m")),
            dim_subeq(Dim::Int(5), Dim::var("m")),
        ])
        .unwrap();
        assert_eq!(solution.resolve_dim(&Dim::var("n")), Dim::Int(5));
        assert_eq!(solution.dim("m"), Some(&Dim::Int(5)));
    }

    #[test]
    fn test_conflicting_bindings_clash() {
        let err = solve_equalities(vec![
            dim_subeq(Dim::Int(10), Dim::var("n")),
            dim_subeq(Dim::Int(20), Dim::var("n")),
        ])
        .unwrap_err();
        assert!(matches!(err, UnifyError::Clash { .. }));
    }

    #[test]
    fn test_var_pair_binds_destination_side() {
        let solution =
            solve_equalities(vec![dim_subeq(Dim::var("src"), Dim::var("dst"))]).unwrap();
        assert_eq!(solution.dim("dst"), Some(&Dim::var("src")));
        assert_eq!(solution.dim("src"), None);
    }

    #[test]
    fn test_same_var_is_noop() {
        let solution =
            solve_equalities(vec![dim_subeq(Dim::var("n"), Dim::var("n"))]).unwrap();
        assert!(solution.is_empty());
    }

    #[test]
    fn test_elem_identity_demanded() {
        let err = solve_equalities(vec![SubEq::Elem {
            lhs: Elem::Scalar(ScalarType::Int32),
            rhs: Elem::Scalar(ScalarType::Float32),
            coercible: false,
            origin: 1,
        }])
        .unwrap_err();
        assert!(matches!(err, UnifyError::Clash { equation: 1, .. }));
    }

    #[test]
    fn test_elem_var_binds() {
        let solution = solve_equalities(vec![SubEq::Elem {
            lhs: Elem::Scalar(ScalarType::Float32),
            rhs: Elem::var("t"),
            coercible: false,
            origin: 0,
        }])
        .unwrap();
        assert_eq!(solution.elem("t"), Some(&Elem::Scalar(ScalarType::Float32)));
    }

    #[test]
    fn test_seq_first_binding_wins() {
        let solution =
            solve_equalities(vec![seq_subeq("A", vec![Dim::Int(10), Dim::Int(10)])]).unwrap();
        assert_eq!(solution.seq("A"), Some(&DimSeq(vec![Dim::Int(10), Dim::Int(10)])));
    }

    #[test]
    fn test_seq_repeat_must_agree() {
        let solution = solve_equalities(vec![
            seq_subeq("A", vec![Dim::Int(10), Dim::Int(10)]),
            seq_subeq("A", vec![Dim::Int(10), Dim::Int(10)]),
        ])
        .unwrap();
        assert_eq!(solution.seq("A"), Some(&DimSeq(vec![Dim::Int(10), Dim::Int(10)])));
    }

    #[test]
    fn test_seq_repeat_binds_vars_elementwise() {
        // A first binds [n 3]; the repeat [2 3] pins n = 2
        let solution = solve_equalities(vec![
            seq_subeq("A", vec![Dim::var("n"), Dim::Int(3)]),
            seq_subeq("A", vec![Dim::Int(2), Dim::Int(3)]),
        ])
        .unwrap();
        assert_eq!(solution.seq("A"), Some(&DimSeq(vec![Dim::Int(2), Dim::Int(3)])));
        assert_eq!(solution.dim("n"), Some(&Dim::Int(2)));
    }

    #[test]
    fn test_seq_length_mismatch() {
        let err = solve_equalities(vec![
            seq_subeq("A", vec![Dim::Int(10)]),
            seq_subeq("A", vec![Dim::Int(10), Dim::Int(10)]),
        ])
        .unwrap_err();
        assert!(matches!(err, UnifyError::ArityMismatch { .. }));
    }

    #[test]
    fn test_seq_repeat_disagreement_clashes() {
        let err = solve_equalities(vec![
            seq_subeq("A", vec![Dim::Int(10)]),
            seq_subeq("A", vec![Dim::Int(20)]),
        ])
        .unwrap_err();
        assert!(matches!(err, UnifyError::Clash { .. }));
    }
}
