//! Symmetrical-component algebra at power frequency.
//!
//! Sequence triples are ordered `(x1, x2, x0)` — positive, negative, zero —
//! and phase triples `(xA, xB, xC)`. The transform matrix is
//! `[[1,1,1],[a²,a,1],[a,a²,1]]` with `a = e^(j2π/3)`.

use nalgebra::Vector3;
use num_complex::Complex64;

const SQRT3_2: f64 = 0.866_025_403_784_438_6;

/// Rotation operator `a = e^(j2π/3)`.
pub const A: Complex64 = Complex64 { re: -0.5, im: SQRT3_2 };
/// `a² = e^(-j2π/3)`.
pub const A2: Complex64 = Complex64 { re: -0.5, im: -SQRT3_2 };
pub const ONE: Complex64 = Complex64 { re: 1.0, im: 0.0 };

/// Rows of the sequence→phase transform, used directly when a phase-domain
/// boundary condition is written over sequence unknowns.
pub(crate) const V_A: [Complex64; 3] = [ONE, ONE, ONE];
pub(crate) const V_B: [Complex64; 3] = [A2, A, ONE];
pub(crate) const V_C: [Complex64; 3] = [A, A2, ONE];

/// `(x1, x2, x0)` → `(xA, xB, xC)`.
pub fn seq_to_phase(x: &Vector3<Complex64>) -> Vector3<Complex64> {
    Vector3::new(
        x[0] + x[1] + x[2],
        A2 * x[0] + A * x[1] + x[2],
        A * x[0] + A2 * x[1] + x[2],
    )
}

/// `(xA, xB, xC)` → `(x1, x2, x0)`; inverse of [`seq_to_phase`].
pub fn phase_to_seq(x: &Vector3<Complex64>) -> Vector3<Complex64> {
    Vector3::new(
        (x[0] + A * x[1] + A2 * x[2]) / 3.0,
        (x[0] + A2 * x[1] + A * x[2]) / 3.0,
        (x[0] + x[1] + x[2]) / 3.0,
    )
}

/// Line-to-line values `(xAB, xBC, xCA)` from a sequence triple.
pub fn seq_to_line(x: &Vector3<Complex64>) -> Vector3<Complex64> {
    let p = seq_to_phase(x);
    Vector3::new(p[0] - p[1], p[1] - p[2], p[2] - p[0])
}
