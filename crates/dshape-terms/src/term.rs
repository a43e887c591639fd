//! Datashape terms
//!
//! A datashape is an ordered run of dimension terms closed by exactly one
//! element-type term: `10*10*int32`, `A...*float64`, `a*b*~c`. The two
//! positions have disjoint vocabularies, so dimension and element terms are
//! separate enums and ill-kinded shapes do not typecheck.
//!
//! Coercion markers (`~`) and ellipses (`A...`) are ordinary term variants
//! here; where they may legally appear is enforced when equations are
//! constructed, not by this crate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dtype::ScalarType;

/// A dimension-position term
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    /// Concrete extent
    Int(u64),

    /// Dimension variable
    Var(Box<str>),

    /// Variadic placeholder for zero or more dimensions; named, or
    /// anonymous (fresh on use)
    Ellipsis(Option<Box<str>>),

    /// Coercion marker: the matching source dimension may be broadcast
    Coerce(Box<Dim>),
}

impl Dim {
    pub fn var(name: impl Into<Box<str>>) -> Self {
        Dim::Var(name.into())
    }

    pub fn ellipsis(name: impl Into<Box<str>>) -> Self {
        Dim::Ellipsis(Some(name.into()))
    }

    pub fn anonymous() -> Self {
        Dim::Ellipsis(None)
    }

    /// Wrap in a coercion marker; markers do not nest
    pub fn coerce(dim: Dim) -> Self {
        match dim {
            Dim::Coerce(_) => dim,
            other => Dim::Coerce(Box::new(other)),
        }
    }

    pub fn is_coerced(&self) -> bool {
        matches!(self, Dim::Coerce(_))
    }

    /// The term underneath an optional coercion marker
    pub fn strip_coerce(&self) -> &Dim {
        match self {
            Dim::Coerce(inner) => inner,
            other => other,
        }
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self.strip_coerce(), Dim::Ellipsis(_))
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, Dim::Int(_))
    }
}

impl From<u64> for Dim {
    fn from(n: u64) -> Self {
        Dim::Int(n)
    }
}

impl std::fmt::Display for Dim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dim::Int(n) => write!(f, "{}", n),
            Dim::Var(name) => write!(f, "{}", name),
            Dim::Ellipsis(Some(name)) => write!(f, "{}...", name),
            Dim::Ellipsis(None) => write!(f, "..."),
            Dim::Coerce(inner) => write!(f, "~{}", inner),
        }
    }
}

/// An element-type-position term
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Elem {
    /// Concrete scalar type
    Scalar(ScalarType),

    /// Element-type variable
    Var(Box<str>),

    /// Coercion marker: the matching source element type may be cast
    Coerce(Box<Elem>),
}

impl Elem {
    pub fn var(name: impl Into<Box<str>>) -> Self {
        Elem::Var(name.into())
    }

    /// Wrap in a coercion marker; markers do not nest
    pub fn coerce(elem: Elem) -> Self {
        match elem {
            Elem::Coerce(_) => elem,
            other => Elem::Coerce(Box::new(other)),
        }
    }

    pub fn is_coerced(&self) -> bool {
        matches!(self, Elem::Coerce(_))
    }

    pub fn strip_coerce(&self) -> &Elem {
        match self {
            Elem::Coerce(inner) => inner,
            other => other,
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, Elem::Scalar(_))
    }
}

impl From<ScalarType> for Elem {
    fn from(scalar: ScalarType) -> Self {
        Elem::Scalar(scalar)
    }
}

impl std::fmt::Display for Elem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Elem::Scalar(s) => write!(f, "{}", s),
            Elem::Var(name) => write!(f, "{}", name),
            Elem::Coerce(inner) => write!(f, "~{}", inner),
        }
    }
}

/// A datashape: dimension terms followed by one element-type term
///
/// Datashapes are flat; a rank-0 shape is a bare scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub dims: Vec<Dim>,
    pub elem: Elem,
}

impl Shape {
    pub fn new(dims: Vec<Dim>, elem: Elem) -> Self {
        Shape { dims, elem }
    }

    /// Rank-0 shape carrying a bare scalar type
    pub fn scalar(scalar: ScalarType) -> Self {
        Shape { dims: Vec::new(), elem: Elem::Scalar(scalar) }
    }

    pub fn of(dims: impl IntoIterator<Item = Dim>, elem: impl Into<Elem>) -> Self {
        Shape { dims: dims.into_iter().collect(), elem: elem.into() }
    }

    /// Number of dimension terms (an ellipsis counts as one)
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn ellipsis_count(&self) -> usize {
        self.dims.iter().filter(|d| d.is_ellipsis()).count()
    }

    pub fn is_concrete(&self) -> bool {
        self.dims.iter().all(Dim::is_concrete) && self.elem.is_concrete()
    }

    /// All variable names occurring in the shape, by kind
    pub fn var_names(&self) -> VarNames {
        let mut names = VarNames::default();
        for dim in &self.dims {
            match dim.strip_coerce() {
                Dim::Var(name) => {
                    names.dims.insert(name.clone());
                }
                Dim::Ellipsis(Some(name)) => {
                    names.seqs.insert(name.clone());
                }
                _ => {}
            }
        }
        if let Elem::Var(name) = self.elem.strip_coerce() {
            names.elems.insert(name.clone());
        }
        names
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for dim in &self.dims {
            write!(f, "{}*", dim)?;
        }
        write!(f, "{}", self.elem)
    }
}

/// An ordered run of dimension terms, the value an ellipsis binds to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DimSeq(pub Vec<Dim>);

impl DimSeq {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dim> {
        self.0.iter()
    }
}

impl From<Vec<Dim>> for DimSeq {
    fn from(dims: Vec<Dim>) -> Self {
        DimSeq(dims)
    }
}

impl std::fmt::Display for DimSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, "]")
    }
}

/// Variable names of a shape, partitioned by kind
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VarNames {
    pub dims: BTreeSet<Box<str>>,
    pub elems: BTreeSet<Box<str>>,
    pub seqs: BTreeSet<Box<str>>,
}

impl VarNames {
    pub fn is_empty(&self) -> bool {
        self.dims.is_empty() && self.elems.is_empty() && self.seqs.is_empty()
    }

    pub fn contains_all(&self, other: &VarNames) -> bool {
        other.dims.is_subset(&self.dims)
            && other.elems.is_subset(&self.elems)
            && other.seqs.is_subset(&self.seqs)
    }
}
