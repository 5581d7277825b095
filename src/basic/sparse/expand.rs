//! Complex sparse solve through the real 2n expansion.
//!
//! A complex system `(R + jM)(x + jy) = b + jc` is equivalent to the real
//! block system `[[R, −M], [M, R]]·[x; y] = [b; c]`, which keeps the LU
//! backends real-valued.

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use num_complex::Complex64;

use super::super::error::Result;
use super::super::solver::Solve;
use super::split::{csc_neg, RealImag};
use super::stack::{csc_hstack, csc_vstack};

pub(crate) fn solve_complex<S: Solve>(
    lhs: &CscMatrix<Complex64>,
    rhs: &DVector<Complex64>,
    solver: &mut S,
) -> Result<DVector<Complex64>> {
    let n = lhs.nrows();
    let (re, im) = lhs.real_imag();
    let neg_im = csc_neg(&im);
    let big = csc_vstack(&[&csc_hstack(&[&re, &neg_im]), &csc_hstack(&[&im, &re])]);

    let (mut ap, mut ai, mut ax) = big.disassemble();
    let mut b = vec![0.0; 2 * n];
    for k in 0..n {
        b[k] = rhs[k].re;
        b[n + k] = rhs[k].im;
    }
    solver.solve(&mut ap, &mut ai, &mut ax, &mut b, 2 * n)?;

    Ok(DVector::from_fn(n, |k, _| Complex64::new(b[k], b[n + k])))
}
