//! Named electrical quantities over a sequence voltage/current pair.
//!
//! Every result query goes through [`eval`]: a static registry keyed by the
//! quantity name (`"U1"`, `"IA"`, `"ZAB"`, `"S"`, ...) evaluating a closed
//! form over `(u1, u2, u0)` and `(i1, i2, i0)`. Unknown names are rejected
//! by the caller; there is no dynamic fallback.

use nalgebra::Vector3;
use num_complex::Complex64;

use super::phasor::{seq_to_line, seq_to_phase};

/// A quantity value: a single phasor or a sequence/phase/line 3-tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Scalar(Complex64),
    Triple(Vector3<Complex64>),
}

impl Value {
    pub fn scalar(self) -> Option<Complex64> {
        match self {
            Value::Scalar(v) => Some(v),
            Value::Triple(_) => None,
        }
    }

    pub fn triple(self) -> Option<Vector3<Complex64>> {
        match self {
            Value::Scalar(_) => None,
            Value::Triple(v) => Some(v),
        }
    }
}

/// Output form of a queried quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// Rectangular complex value(s), unchanged.
    Rect,
    /// Real part(s).
    Re,
    /// Imaginary part(s).
    Im,
    /// Magnitude(s).
    Mag,
    /// Angle(s) in degrees.
    Deg,
    /// Text `name = R + Xj`.
    RectText,
    /// Text `name = M < f`.
    PolarText,
}

/// A formatted quantity, matching the requested [`Form`].
#[derive(Debug, Clone, PartialEq)]
pub enum Formed {
    Scalar(Complex64),
    Triple(Vector3<Complex64>),
    Real(f64),
    Reals(Vector3<f64>),
    Text(String),
}

const R2D: f64 = 180.0 / core::f64::consts::PI;

/// Evaluates quantity `name` for the sequence pair `(u, i)`.
///
/// Returns `None` for unrecognised names. Impedances divide voltage by
/// current component-wise; a zero current yields the IEEE-754 complex
/// quotient rather than an error.
pub fn eval(name: &str, u: &Vector3<Complex64>, i: &Vector3<Complex64>) -> Option<Value> {
    use Value::*;
    let uf = seq_to_phase(u);
    let if_ = seq_to_phase(i);
    let ul = seq_to_line(u);
    let il = seq_to_line(i);
    Some(match name {
        "U120" => Triple(*u),
        "U1" => Scalar(u[0]),
        "U2" => Scalar(u[1]),
        "U0" => Scalar(u[2]),
        "3U0" => Scalar(3.0 * u[2]),
        "UA" => Scalar(uf[0]),
        "UB" => Scalar(uf[1]),
        "UC" => Scalar(uf[2]),
        "UAB" => Scalar(ul[0]),
        "UBC" => Scalar(ul[1]),
        "UCA" => Scalar(ul[2]),
        "UABC" => Triple(uf),
        "UAB_BC_CA" => Triple(ul),

        "I120" => Triple(*i),
        "I1" => Scalar(i[0]),
        "I2" => Scalar(i[1]),
        "I0" => Scalar(i[2]),
        "3I0" => Scalar(3.0 * i[2]),
        "IA" => Scalar(if_[0]),
        "IB" => Scalar(if_[1]),
        "IC" => Scalar(if_[2]),
        "IAB" => Scalar(il[0]),
        "IBC" => Scalar(il[1]),
        "ICA" => Scalar(il[2]),
        "IABC" => Triple(if_),
        "IAB_BC_CA" => Triple(il),

        "Z120" => Triple(Vector3::new(u[0] / i[0], u[1] / i[1], u[2] / i[2])),
        "Z1" => Scalar(u[0] / i[0]),
        "Z2" => Scalar(u[1] / i[1]),
        "Z0" => Scalar(u[2] / i[2]),
        "ZA" => Scalar(uf[0] / if_[0]),
        "ZB" => Scalar(uf[1] / if_[1]),
        "ZC" => Scalar(uf[2] / if_[2]),
        "ZAB" => Scalar(ul[0] / il[0]),
        "ZBC" => Scalar(ul[1] / il[1]),
        "ZCA" => Scalar(ul[2] / il[2]),
        "ZABC" => Triple(Vector3::new(uf[0] / if_[0], uf[1] / if_[1], uf[2] / if_[2])),
        "ZAB_BC_CA" => Triple(Vector3::new(ul[0] / il[0], ul[1] / il[1], ul[2] / il[2])),

        "S120" => Triple(Vector3::new(
            u[0] * i[0].conj(),
            u[1] * i[1].conj(),
            u[2] * i[2].conj(),
        )),
        "S1" => Scalar(u[0] * i[0].conj()),
        "S2" => Scalar(u[1] * i[1].conj()),
        "S0" => Scalar(u[2] * i[2].conj()),
        "SA" => Scalar(uf[0] * if_[0].conj()),
        "SB" => Scalar(uf[1] * if_[1].conj()),
        "SC" => Scalar(uf[2] * if_[2].conj()),
        "SAB" => Scalar(ul[0] * il[0].conj()),
        "SBC" => Scalar(ul[1] * il[1].conj()),
        "SCA" => Scalar(ul[2] * il[2].conj()),
        "SABC" => Triple(Vector3::new(
            uf[0] * if_[0].conj(),
            uf[1] * if_[1].conj(),
            uf[2] * if_[2].conj(),
        )),
        "SAB_BC_CA" => Triple(Vector3::new(
            ul[0] * il[0].conj(),
            ul[1] * il[1].conj(),
            ul[2] * il[2].conj(),
        )),
        // Total three-phase complex power.
        "S" => Scalar(uf[0] * if_[0].conj() + uf[1] * if_[1].conj() + uf[2] * if_[2].conj()),

        _ => return None,
    })
}

/// Renders an evaluated quantity in the requested output form.
pub fn format(name: &str, value: &Value, form: Form) -> Formed {
    match (value, form) {
        (Value::Scalar(v), Form::Rect) => Formed::Scalar(*v),
        (Value::Scalar(v), Form::Re) => Formed::Real(v.re),
        (Value::Scalar(v), Form::Im) => Formed::Real(v.im),
        (Value::Scalar(v), Form::Mag) => Formed::Real(v.norm()),
        (Value::Scalar(v), Form::Deg) => Formed::Real(R2D * v.arg()),
        (Value::Scalar(v), Form::RectText) => {
            Formed::Text(format!("{:<4} = {:>8.1} + {:>8.1}j", name, v.re, v.im))
        }
        (Value::Scalar(v), Form::PolarText) => Formed::Text(format!(
            "{:<4} = {:>8.1} < {:>6.1}",
            name,
            v.norm(),
            R2D * v.arg()
        )),
        (Value::Triple(v), Form::Rect) => Formed::Triple(*v),
        (Value::Triple(v), Form::Re) => Formed::Reals(v.map(|e| e.re)),
        (Value::Triple(v), Form::Im) => Formed::Reals(v.map(|e| e.im)),
        (Value::Triple(v), Form::Mag) => Formed::Reals(v.map(|e| e.norm())),
        (Value::Triple(v), Form::Deg) => Formed::Reals(v.map(|e| R2D * e.arg())),
        (Value::Triple(v), Form::RectText) => Formed::Text(format!(
            "{:<4} = [{:>8.1} + {:>8.1}j, {:>8.1} + {:>8.1}j, {:>8.1} + {:>8.1}j]",
            name, v[0].re, v[0].im, v[1].re, v[1].im, v[2].re, v[2].im
        )),
        (Value::Triple(v), Form::PolarText) => Formed::Text(format!(
            "{:<4} = [{:>8.1} < {:>6.1}, {:>8.1} < {:>6.1}, {:>8.1} < {:>6.1}]",
            name,
            v[0].norm(),
            R2D * v[0].arg(),
            v[1].norm(),
            R2D * v[1].arg(),
            v[2].norm(),
            R2D * v[2].arg()
        )),
    }
}
