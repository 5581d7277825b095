//! Part-wise views of complex CSC matrices.

use nalgebra_sparse::CscMatrix;
use num_complex::Complex64;

/// Splits a complex CSC matrix into real- and imaginary-part matrices
/// sharing its sparsity pattern.
pub(crate) trait RealImag {
    type Out;

    fn real_imag(&self) -> (Self::Out, Self::Out);
}

impl RealImag for CscMatrix<Complex64> {
    type Out = CscMatrix<f64>;

    fn real_imag(&self) -> (Self::Out, Self::Out) {
        let re: Vec<f64> = self.values().iter().map(|v| v.re).collect();
        let im: Vec<f64> = self.values().iter().map(|v| v.im).collect();
        // The pattern is taken verbatim, so the value counts always match.
        unsafe {
            (
                CscMatrix::try_from_pattern_and_values(self.pattern().clone(), re)
                    .unwrap_unchecked(),
                CscMatrix::try_from_pattern_and_values(self.pattern().clone(), im)
                    .unwrap_unchecked(),
            )
        }
    }
}

/// Element-wise negation, pattern preserved.
pub(crate) fn csc_neg(m: &CscMatrix<f64>) -> CscMatrix<f64> {
    let values: Vec<f64> = m.values().iter().map(|v| -v).collect();
    unsafe {
        CscMatrix::try_from_pattern_and_values(m.pattern().clone(), values).unwrap_unchecked()
    }
}
