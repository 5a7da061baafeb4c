//! Coordinate helpers for PDF user space
//!
//! PDF user space has a bottom-left origin with Y increasing upward. Raster
//! consumers (image viewers, DOM overlays) use a top-left origin, so any
//! rectangle leaving this crate for such a consumer goes through [`flip_y`].

/// 2-D affine matrix `[a b c d e f]` as used by the `cm` and `Tm` operators.
///
/// Points are row vectors, so `p' = p × M` and `A.then(B)` applies `A` first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Length of the transformed unit X vector
    pub fn horizontal_scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Length of the transformed unit Y vector
    pub fn vertical_scale(&self) -> f64 {
        self.c.hypot(self.d)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Convert the bottom edge of a box in PDF space to its top edge in a
/// top-left-origin raster space of the same scale.
pub fn flip_y(y: f64, height: f64, page_height: f64) -> f64 {
    page_height - (y + height)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    proptest! {
        /// Property: flipping twice returns the original bottom edge
        #[test]
        fn flip_y_is_involution(
            y in 0.0f64..1000.0,
            h in dimension(),
            page_h in dimension(),
        ) {
            let top = flip_y(y, h, page_h);
            let back = flip_y(top, h, page_h);
            prop_assert!((back - y).abs() < 1e-9);
        }

        /// Property: matrix composition is associative
        #[test]
        fn matrix_then_is_associative(
            s1 in 0.1f64..5.0,
            s2 in 0.1f64..5.0,
            tx in -500.0f64..500.0,
            ty in -500.0f64..500.0,
        ) {
            let a = Matrix::new(s1, 0.0, 0.0, s1, tx, 0.0);
            let b = Matrix::new(0.0, s2, -s2, 0.0, 0.0, ty);
            let c = Matrix::translation(ty, tx);

            let left = a.then(&b).then(&c);
            let right = a.then(&b.then(&c));
            prop_assert!((left.e - right.e).abs() < 1e-6);
            prop_assert!((left.f - right.f).abs() < 1e-6);
            prop_assert!((left.a - right.a).abs() < 1e-9);
            prop_assert!((left.d - right.d).abs() < 1e-9);
        }
    }
}
