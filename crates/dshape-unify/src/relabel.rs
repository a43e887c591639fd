//! Relabeling: α-renaming under the two scoping rules
//!
//! Every variable is renamed to a globally unique fresh name before the
//! solver runs:
//!
//! - destination scope is the union of all right-hand sides: one fresh name
//!   per original name, shared across equations, so a signature variable
//!   reused across parameters still denotes one type;
//! - each left-hand side is its own scope: the same source name in two
//!   left-hand sides names two independent variables.
//!
//! Anonymous ellipses receive a fresh name per occurrence. The relabeling
//! keeps both directions of the renaming, so the driver can key the final
//! solution by caller names and restore caller names inside error terms.

use std::collections::HashMap;

use dshape_terms::term::{Dim, DimSeq, Elem, Shape};

use crate::equation::Equation;
use crate::error::{AnyTerm, UnifyError};
use crate::subst::Solution;

/// Fresh-name generator, one counter across all kinds
#[derive(Debug, Default)]
struct Fresh {
    counter: u32,
}

impl Fresh {
    fn next(&mut self, prefix: &str) -> Box<str> {
        let name = format!("_{}{}", prefix, self.counter);
        self.counter += 1;
        name.into()
    }

    fn dim(&mut self) -> Box<str> {
        self.next("d")
    }

    fn elem(&mut self) -> Box<str> {
        self.next("t")
    }

    fn seq(&mut self) -> Box<str> {
        self.next("r")
    }
}

/// Renamed equations plus the maps needed to translate back
#[derive(Debug)]
pub(crate) struct Relabeling {
    pub(crate) equations: Vec<Equation>,
    /// fresh name → original name, both scopes
    origins: HashMap<Box<str>, Box<str>>,
    /// original name → fresh name, destination scope, by kind
    rhs_dims: HashMap<Box<str>, Box<str>>,
    rhs_elems: HashMap<Box<str>, Box<str>>,
    rhs_seqs: HashMap<Box<str>, Box<str>>,
}

pub(crate) fn relabel(equations: &[Equation]) -> Relabeling {
    let mut fresh = Fresh::default();
    let mut relabeling = Relabeling {
        equations: Vec::with_capacity(equations.len()),
        origins: HashMap::new(),
        rhs_dims: HashMap::new(),
        rhs_elems: HashMap::new(),
        rhs_seqs: HashMap::new(),
    };

    // Destination scope first: one fresh name per original name, walked in
    // equation order so fresh names are deterministic.
    for equation in equations {
        relabeling.scan_rhs(equation.rhs(), &mut fresh);
    }

    for equation in equations {
        let lhs = relabeling.rename_lhs(equation.lhs(), &mut fresh);
        let rhs = relabeling.rename_rhs(equation.rhs(), &mut fresh);
        relabeling.equations.push(Equation::unchecked(lhs, rhs));
    }

    relabeling
}

impl Relabeling {
    fn scan_rhs(&mut self, shape: &Shape, fresh: &mut Fresh) {
        for dim in &shape.dims {
            match dim.strip_coerce() {
                Dim::Var(name) => {
                    if !self.rhs_dims.contains_key(name) {
                        let renamed = fresh.dim();
                        self.origins.insert(renamed.clone(), name.clone());
                        self.rhs_dims.insert(name.clone(), renamed);
                    }
                }
                Dim::Ellipsis(Some(name)) => {
                    if !self.rhs_seqs.contains_key(name) {
                        let renamed = fresh.seq();
                        self.origins.insert(renamed.clone(), name.clone());
                        self.rhs_seqs.insert(name.clone(), renamed);
                    }
                }
                _ => {}
            }
        }
        if let Elem::Var(name) = shape.elem.strip_coerce() {
            if !self.rhs_elems.contains_key(name) {
                let renamed = fresh.elem();
                self.origins.insert(renamed.clone(), name.clone());
                self.rhs_elems.insert(name.clone(), renamed);
            }
        }
    }

    /// Rename one left-hand side in its own scope
    fn rename_lhs(&mut self, shape: &Shape, fresh: &mut Fresh) -> Shape {
        let mut local_dims: HashMap<Box<str>, Box<str>> = HashMap::new();
        let mut local_elems: HashMap<Box<str>, Box<str>> = HashMap::new();

        let dims = shape
            .dims
            .iter()
            .map(|dim| match dim {
                Dim::Var(name) => {
                    let renamed = local_dims.entry(name.clone()).or_insert_with(|| {
                        let renamed = fresh.dim();
                        self.origins.insert(renamed.clone(), name.clone());
                        renamed
                    });
                    Dim::Var(renamed.clone())
                }
                other => other.clone(),
            })
            .collect();

        let elem = match &shape.elem {
            Elem::Var(name) => {
                let renamed = local_elems.entry(name.clone()).or_insert_with(|| {
                    let renamed = fresh.elem();
                    self.origins.insert(renamed.clone(), name.clone());
                    renamed
                });
                Elem::Var(renamed.clone())
            }
            other => other.clone(),
        };

        Shape::new(dims, elem)
    }

    /// Rename one right-hand side in the shared destination scope
    fn rename_rhs(&mut self, shape: &Shape, fresh: &mut Fresh) -> Shape {
        let dims = shape
            .dims
            .iter()
            .map(|dim| {
                let coerced = dim.is_coerced();
                let renamed = match dim.strip_coerce() {
                    Dim::Var(name) => Dim::Var(self.rhs_dims[name].clone()),
                    Dim::Ellipsis(Some(name)) => Dim::Ellipsis(Some(self.rhs_seqs[name].clone())),
                    Dim::Ellipsis(None) => Dim::Ellipsis(Some(fresh.seq())),
                    other => other.clone(),
                };
                if coerced {
                    Dim::coerce(renamed)
                } else {
                    renamed
                }
            })
            .collect();

        let coerced = shape.elem.is_coerced();
        let elem = match shape.elem.strip_coerce() {
            Elem::Var(name) => Elem::Var(self.rhs_elems[name].clone()),
            other => other.clone(),
        };
        let elem = if coerced { Elem::coerce(elem) } else { elem };

        Shape::new(dims, elem)
    }

    fn original(&self, name: &str) -> Box<str> {
        self.origins
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.into())
    }

    fn restore_dim(&self, dim: &Dim) -> Dim {
        match dim {
            Dim::Var(name) => Dim::Var(self.original(name)),
            // A fresh ellipsis name with no origin stood for an anonymous
            // ellipsis
            Dim::Ellipsis(Some(name)) => match self.origins.get(name.as_ref()) {
                Some(original) => Dim::Ellipsis(Some(original.clone())),
                None => Dim::Ellipsis(None),
            },
            Dim::Coerce(inner) => Dim::coerce(self.restore_dim(inner)),
            other => other.clone(),
        }
    }

    fn restore_elem(&self, elem: &Elem) -> Elem {
        match elem {
            Elem::Var(name) => Elem::Var(self.original(name)),
            Elem::Coerce(inner) => Elem::coerce(self.restore_elem(inner)),
            other => other.clone(),
        }
    }

    fn restore_seq(&self, seq: &DimSeq) -> DimSeq {
        DimSeq(seq.iter().map(|d| self.restore_dim(d)).collect())
    }

    fn restore_any(&self, term: &AnyTerm) -> AnyTerm {
        match term {
            AnyTerm::Dim(dim) => AnyTerm::Dim(self.restore_dim(dim)),
            AnyTerm::Elem(elem) => AnyTerm::Elem(self.restore_elem(elem)),
        }
    }

    /// Restore caller-visible variable names inside an error's terms
    pub(crate) fn restore(&self, error: UnifyError) -> UnifyError {
        match error {
            UnifyError::ArityMismatch { lhs, rhs, equation } => UnifyError::ArityMismatch {
                lhs: self.restore_seq(&lhs),
                rhs: self.restore_seq(&rhs),
                equation,
            },
            UnifyError::Clash { lhs, rhs, equation } => UnifyError::Clash {
                lhs: self.restore_any(&lhs),
                rhs: self.restore_any(&rhs),
                equation,
            },
            UnifyError::OccursCheck { var, term, equation } => UnifyError::OccursCheck {
                var: self.original(&var),
                term: self.restore_any(&term),
                equation,
            },
            UnifyError::BroadcastIncompatible { lhs, rhs, equation } => {
                UnifyError::BroadcastIncompatible {
                    lhs: self.restore_dim(&lhs),
                    rhs: self.restore_dim(&rhs),
                    equation,
                }
            }
            other => other,
        }
    }

    /// Restrict a solved map to the caller's destination variables, keyed
    /// by their original names
    pub(crate) fn export(&self, solution: &Solution) -> Solution {
        let mut out = Solution::new();
        for (original, renamed) in &self.rhs_dims {
            if let Some(dim) = solution.dim(renamed) {
                out.dims.insert(original.clone(), self.restore_dim(dim));
            }
        }
        for (original, renamed) in &self.rhs_elems {
            if let Some(elem) = solution.elem(renamed) {
                out.elems.insert(original.clone(), self.restore_elem(elem));
            }
        }
        for (original, renamed) in &self.rhs_seqs {
            if let Some(seq) = solution.seq(renamed) {
                out.seqs.insert(original.clone(), self.restore_seq(seq));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dshape_terms::dtype::ScalarType;

    fn eq(lhs: Shape, rhs: Shape) -> Equation {
        Equation::new(lhs, rhs).unwrap()
    }

    fn rhs_dim_name(equation: &Equation, position: usize) -> &str {
        match equation.rhs().dims[position].strip_coerce() {
            Dim::Var(name) => name,
            other => panic!("expected a dimension variable, got {}", other),
        }
    }

    fn lhs_dim_name(equation: &Equation, position: usize) -> &str {
        match &equation.lhs().dims[position] {
            Dim::Var(name) => name,
            other => panic!("expected a dimension variable, got {}", other),
        }
    }

    #[test]
    fn test_rhs_scope_is_shared() {
        let equations = [
            eq(
                Shape::of([Dim::Int(10)], ScalarType::Int32),
                Shape::of([Dim::var("n")], ScalarType::Int32),
            ),
            eq(
                Shape::of([Dim::Int(20)], ScalarType::Int32),
                Shape::of([Dim::var("n")], ScalarType::Int32),
            ),
        ];
        let relabeled = relabel(&equations);
        assert_eq!(
            rhs_dim_name(&relabeled.equations[0], 0),
            rhs_dim_name(&relabeled.equations[1], 0),
        );
    }

    #[test]
    fn test_lhs_scopes_are_independent() {
        let equations = [
            eq(
                Shape::of([Dim::var("n")], ScalarType::Int32),
                Shape::of([Dim::Int(10)], ScalarType::Int32),
            ),
            eq(
                Shape::of([Dim::var("n")], ScalarType::Int32),
                Shape::of([Dim::Int(20)], ScalarType::Int32),
            ),
        ];
        let relabeled = relabel(&equations);
        assert_ne!(
            lhs_dim_name(&relabeled.equations[0], 0),
            lhs_dim_name(&relabeled.equations[1], 0),
        );
    }

    #[test]
    fn test_lhs_name_does_not_capture_rhs_name() {
        // The same source name on both sides denotes two variables
        let equations = [eq(
            Shape::of([Dim::var("n")], ScalarType::Int32),
            Shape::of([Dim::var("n")], ScalarType::Int32),
        )];
        let relabeled = relabel(&equations);
        assert_ne!(
            lhs_dim_name(&relabeled.equations[0], 0),
            rhs_dim_name(&relabeled.equations[0], 0),
        );
    }

    #[test]
    fn test_repeated_lhs_var_stays_shared_within_equation() {
        let equations = [eq(
            Shape::of([Dim::var("n"), Dim::var("n")], ScalarType::Int32),
            Shape::of([Dim::Int(3), Dim::Int(3)], ScalarType::Int32),
        )];
        let relabeled = relabel(&equations);
        assert_eq!(
            lhs_dim_name(&relabeled.equations[0], 0),
            lhs_dim_name(&relabeled.equations[0], 1),
        );
    }

    #[test]
    fn test_anonymous_ellipses_get_distinct_names() {
        let equations = [
            eq(
                Shape::of([Dim::Int(10)], ScalarType::Int32),
                Shape::of([Dim::anonymous()], ScalarType::Int32),
            ),
            eq(
                Shape::of([Dim::Int(20)], ScalarType::Int32),
                Shape::of([Dim::anonymous()], ScalarType::Int32),
            ),
        ];
        let relabeled = relabel(&equations);
        let name_of = |equation: &Equation| match equation.rhs().dims[0].strip_coerce() {
            Dim::Ellipsis(Some(name)) => name.clone(),
            other => panic!("expected a named ellipsis, got {}", other),
        };
        assert_ne!(
            name_of(&relabeled.equations[0]),
            name_of(&relabeled.equations[1]),
        );
    }

    #[test]
    fn test_coercion_markers_survive() {
        let equations = [eq(
            Shape::of([Dim::Int(1)], ScalarType::Int32),
            Shape::of([Dim::coerce(Dim::var("n"))], Elem::coerce(Elem::var("t"))),
        )];
        let relabeled = relabel(&equations);
        assert!(relabeled.equations[0].rhs().dims[0].is_coerced());
        assert!(relabeled.equations[0].rhs().elem.is_coerced());
    }

    #[test]
    fn test_export_restores_original_names() {
        let equations = [eq(
            Shape::of([Dim::Int(10)], ScalarType::Int32),
            Shape::of([Dim::var("n")], Elem::var("t")),
        )];
        let relabeled = relabel(&equations);

        let mut solved = Solution::new();
        let renamed = rhs_dim_name(&relabeled.equations[0], 0).into();
        solved.insert_dim(renamed, Dim::Int(10));

        let exported = relabeled.export(&solved);
        assert_eq!(exported.dim("n"), Some(&Dim::Int(10)));
        assert_eq!(exported.elem("t"), None);
    }

    #[test]
    fn test_restore_error_names() {
        let equations = [eq(
            Shape::of([Dim::Int(10)], ScalarType::Int32),
            Shape::of([Dim::var("n")], ScalarType::Int32),
        )];
        let relabeled = relabel(&equations);
        let renamed: Box<str> = rhs_dim_name(&relabeled.equations[0], 0).into();

        let error = UnifyError::Clash {
            lhs: Dim::Int(10).into(),
            rhs: Dim::Var(renamed).into(),
            equation: 0,
        };
        let restored = relabeled.restore(error);
        assert_eq!(
            restored,
            UnifyError::Clash {
                lhs: Dim::Int(10).into(),
                rhs: Dim::var("n").into(),
                equation: 0,
            }
        );
    }
}
