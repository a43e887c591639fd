//! Shape equations
//!
//! An equation pairs a source shape (the concrete type of an array
//! argument) with a destination shape (a parameter type from a typed
//! signature). The destination side owns the whole annotation vocabulary:
//! coercion markers and ellipses are destination-only, and a destination
//! carries at most one ellipsis. These rules are enforced here, at
//! construction, so every [`Equation`] in flight is well-formed.

use dshape_terms::term::{Dim, Elem, Shape};

use crate::error::{UnifyError, UnifyResult};

/// A source/destination pair of shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    lhs: Shape,
    rhs: Shape,
}

impl Equation {
    /// Build an equation, rejecting malformed sides
    pub fn new(lhs: Shape, rhs: Shape) -> UnifyResult<Equation> {
        if let Err(reason) = validate_lhs(&lhs) {
            return Err(UnifyError::MalformedEquation { lhs, rhs, reason });
        }
        if let Err(reason) = validate_rhs(&rhs) {
            return Err(UnifyError::MalformedEquation { lhs, rhs, reason });
        }
        Ok(Equation { lhs, rhs })
    }

    /// Skip validation; for engine passes that only rename a valid equation
    pub(crate) fn unchecked(lhs: Shape, rhs: Shape) -> Equation {
        Equation { lhs, rhs }
    }

    pub fn lhs(&self) -> &Shape {
        &self.lhs
    }

    pub fn rhs(&self) -> &Shape {
        &self.rhs
    }
}

impl std::fmt::Display for Equation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

/// Source shapes carry no annotations at all
pub(crate) fn validate_lhs(shape: &Shape) -> Result<(), &'static str> {
    for dim in &shape.dims {
        match dim {
            Dim::Coerce(_) => return Err("coercion marker on the left-hand side"),
            Dim::Ellipsis(_) => return Err("ellipsis on the left-hand side"),
            _ => {}
        }
    }
    if shape.elem.is_coerced() {
        return Err("coercion marker on the left-hand side");
    }
    Ok(())
}

/// Destination shapes: at most one ellipsis, no nested coercion markers
pub(crate) fn validate_rhs(shape: &Shape) -> Result<(), &'static str> {
    if shape.ellipsis_count() > 1 {
        return Err("more than one ellipsis on the right-hand side");
    }
    for dim in &shape.dims {
        if let Dim::Coerce(inner) = dim {
            if inner.is_coerced() {
                return Err("nested coercion marker");
            }
        }
    }
    if let Elem::Coerce(inner) = &shape.elem {
        if inner.is_coerced() {
            return Err("nested coercion marker");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dshape_terms::dtype::ScalarType;

    fn int32() -> Elem {
        Elem::Scalar(ScalarType::Int32)
    }

    #[test]
    fn test_well_formed() {
        let eq = Equation::new(
            Shape::of([Dim::Int(10)], int32()),
            Shape::of([Dim::coerce(Dim::ellipsis("A"))], int32()),
        )
        .unwrap();
        assert_eq!(eq.to_string(), "10*int32 = ~A...*int32");
    }

    #[test]
    fn test_lhs_coercion_rejected() {
        let err = Equation::new(
            Shape::of([Dim::coerce(Dim::Int(10))], int32()),
            Shape::of([Dim::var("n")], int32()),
        )
        .unwrap_err();
        assert!(matches!(err, UnifyError::MalformedEquation { .. }));
    }

    #[test]
    fn test_lhs_coerced_elem_rejected() {
        let err = Equation::new(
            Shape::of([Dim::Int(10)], Elem::coerce(int32())),
            Shape::of([Dim::var("n")], int32()),
        )
        .unwrap_err();
        assert!(matches!(err, UnifyError::MalformedEquation { .. }));
    }

    #[test]
    fn test_lhs_ellipsis_rejected() {
        let err = Equation::new(
            Shape::of([Dim::ellipsis("A")], int32()),
            Shape::of([Dim::var("n")], int32()),
        )
        .unwrap_err();
        assert!(matches!(err, UnifyError::MalformedEquation { .. }));
    }

    #[test]
    fn test_rhs_double_ellipsis_rejected() {
        let err = Equation::new(
            Shape::of([Dim::Int(10)], int32()),
            Shape::of([Dim::ellipsis("A"), Dim::ellipsis("B")], int32()),
        )
        .unwrap_err();
        assert!(matches!(err, UnifyError::MalformedEquation { .. }));
    }

    #[test]
    fn test_rhs_single_ellipsis_accepted() {
        assert!(Equation::new(
            Shape::of([Dim::Int(10)], int32()),
            Shape::of([Dim::Int(10), Dim::ellipsis("A")], int32()),
        )
        .is_ok());
    }

    #[test]
    fn test_nested_coercion_rejected() {
        // Dim::coerce flattens, so build the nesting by hand
        let nested = Dim::Coerce(Box::new(Dim::Coerce(Box::new(Dim::Int(1)))));
        let err = Equation::new(
            Shape::of([Dim::Int(1)], int32()),
            Shape::of([nested], int32()),
        )
        .unwrap_err();
        assert!(matches!(err, UnifyError::MalformedEquation { .. }));
    }
}
