//! # dshape-terms
//!
//! The datashape term model: the types a frontend constructs and the
//! unification engine consumes.
//!
//! A datashape describes an array value as an ordered run of dimensions
//! closed by a scalar element type. Dimensions may be concrete extents,
//! variables, or a variadic ellipsis; element types may be concrete scalars
//! or variables; either position may carry a coercion marker on the
//! destination side of an equation.
//!
//! ## Example
//!
//! ```rust
//! use dshape_terms::prelude::*;
//!
//! // 10*10*int32
//! let source = Shape::of([Dim::Int(10), Dim::Int(10)], ScalarType::Int32);
//!
//! // ~A...*int32: any number of leading dimensions, broadcast permitted
//! let dest = Shape::of([Dim::coerce(Dim::ellipsis("A"))], ScalarType::Int32);
//!
//! assert_eq!(source.to_string(), "10*10*int32");
//! assert_eq!(dest.to_string(), "~A...*int32");
//! ```

pub mod dtype;
pub mod ser;
pub mod term;

/// Prelude - common imports
pub mod prelude {
    pub use crate::dtype::{CastLattice, LatticeCycle, ScalarType};
    pub use crate::term::{Dim, DimSeq, Elem, Shape, VarNames};
}
