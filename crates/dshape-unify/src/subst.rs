//! Solutions and substitution
//!
//! A [`Solution`] is the kind-partitioned variable map the solver builds:
//! dimension variables to dimension terms, element-type variables to
//! element-type terms, ellipsis variables to dimension runs. Bindings are
//! kept resolved against each other as they are inserted, so the map is
//! idempotent at every point in a solve, not just at the end.

use std::collections::HashMap;

use dshape_terms::term::{Dim, DimSeq, Elem, Shape};

use crate::error::{UnifyError, UnifyResult};

/// Mapping from variable names to terms, partitioned by variable kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    pub(crate) dims: HashMap<Box<str>, Dim>,
    pub(crate) elems: HashMap<Box<str>, Elem>,
    pub(crate) seqs: HashMap<Box<str>, DimSeq>,
}

impl Solution {
    pub fn new() -> Self {
        Solution::default()
    }

    /// Binding for a dimension variable
    pub fn dim(&self, name: &str) -> Option<&Dim> {
        self.dims.get(name)
    }

    /// Binding for an element-type variable
    pub fn elem(&self, name: &str) -> Option<&Elem> {
        self.elems.get(name)
    }

    /// Binding for an ellipsis variable
    pub fn seq(&self, name: &str) -> Option<&DimSeq> {
        self.seqs.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty() && self.elems.is_empty() && self.seqs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dims.len() + self.elems.len() + self.seqs.len()
    }

    /// Replace every variable of `shape` by its binding
    ///
    /// Ellipsis bindings are spliced into the surrounding dimension run and
    /// coercion markers are stripped. Fails on any variable of `shape` that
    /// has no binding.
    pub fn apply(&self, shape: &Shape) -> UnifyResult<Shape> {
        let mut dims = Vec::with_capacity(shape.dims.len());
        for dim in &shape.dims {
            self.apply_dim(dim, &mut dims, shape)?;
        }
        let elem = self.apply_elem(&shape.elem, shape)?;
        Ok(Shape::new(dims, elem))
    }

    fn apply_dim(&self, dim: &Dim, out: &mut Vec<Dim>, whole: &Shape) -> UnifyResult<()> {
        match dim {
            Dim::Coerce(inner) => self.apply_dim(inner, out, whole),
            Dim::Int(n) => {
                out.push(Dim::Int(*n));
                Ok(())
            }
            Dim::Var(name) => match self.dims.get(name.as_ref()) {
                Some(bound) => {
                    out.push(self.resolve_dim(bound));
                    Ok(())
                }
                None => Err(self.unbound(name, whole)),
            },
            Dim::Ellipsis(Some(name)) => match self.seqs.get(name.as_ref()) {
                Some(seq) => {
                    out.extend(seq.iter().map(|d| self.resolve_dim(d)));
                    Ok(())
                }
                None => Err(self.unbound(name, whole)),
            },
            Dim::Ellipsis(None) => Err(self.unbound("...", whole)),
        }
    }

    fn apply_elem(&self, elem: &Elem, whole: &Shape) -> UnifyResult<Elem> {
        match elem {
            Elem::Coerce(inner) => self.apply_elem(inner, whole),
            Elem::Scalar(s) => Ok(Elem::Scalar(*s)),
            Elem::Var(name) => match self.elems.get(name.as_ref()) {
                Some(bound) => Ok(self.resolve_elem(bound)),
                None => Err(self.unbound(name, whole)),
            },
        }
    }

    fn unbound(&self, var: &str, whole: &Shape) -> UnifyError {
        UnifyError::UnboundVariable {
            var: var.into(),
            term: whole.clone(),
        }
    }

    /// Fully resolve a dimension term through the current bindings
    pub(crate) fn resolve_dim(&self, dim: &Dim) -> Dim {
        let mut current = dim.clone();
        while let Dim::Var(name) = &current {
            match self.dims.get(name.as_ref()) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }

    /// Fully resolve an element-type term through the current bindings
    pub(crate) fn resolve_elem(&self, elem: &Elem) -> Elem {
        let mut current = elem.clone();
        while let Elem::Var(name) = &current {
            match self.elems.get(name.as_ref()) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }

    /// Bind a dimension variable, rewriting the new value into every
    /// existing binding so the map stays idempotent
    pub(crate) fn insert_dim(&mut self, name: Box<str>, value: Dim) {
        let value = self.resolve_dim(&value);
        for bound in self.dims.values_mut() {
            if matches!(bound, Dim::Var(v) if **v == *name) {
                *bound = value.clone();
            }
        }
        for seq in self.seqs.values_mut() {
            for bound in seq.0.iter_mut() {
                if matches!(bound, Dim::Var(v) if **v == *name) {
                    *bound = value.clone();
                }
            }
        }
        self.dims.insert(name, value);
    }

    /// Bind an element-type variable, rewriting existing bindings
    pub(crate) fn insert_elem(&mut self, name: Box<str>, value: Elem) {
        let value = self.resolve_elem(&value);
        for bound in self.elems.values_mut() {
            if matches!(bound, Elem::Var(v) if **v == *name) {
                *bound = value.clone();
            }
        }
        self.elems.insert(name, value);
    }

    /// Bind (or rebind) an ellipsis variable to a dimension run
    ///
    /// Ellipsis bindings hold plain dimension terms, so nothing in the map
    /// can refer back to an ellipsis variable and no rewrite pass is needed.
    pub(crate) fn insert_seq(&mut self, name: Box<str>, value: DimSeq) {
        let resolved = DimSeq(value.iter().map(|d| self.resolve_dim(d)).collect());
        self.seqs.insert(name, resolved);
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        let mut sep = |f: &mut std::fmt::Formatter<'_>| -> std::fmt::Result {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            Ok(())
        };

        let mut dims: Vec<_> = self.dims.iter().collect();
        dims.sort_by(|a, b| a.0.cmp(b.0));
        for (name, dim) in dims {
            sep(f)?;
            write!(f, "{} ↦ {}", name, dim)?;
        }

        let mut elems: Vec<_> = self.elems.iter().collect();
        elems.sort_by(|a, b| a.0.cmp(b.0));
        for (name, elem) in elems {
            sep(f)?;
            write!(f, "{} ↦ {}", name, elem)?;
        }

        let mut seqs: Vec<_> = self.seqs.iter().collect();
        seqs.sort_by(|a, b| a.0.cmp(b.0));
        for (name, seq) in seqs {
            sep(f)?;
            write!(f, "{} ↦ {}", name, seq)?;
        }

        Ok(())
    }
}
