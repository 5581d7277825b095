use rsparse::{
    data::{Sprs, Symb},
    lsolve, lu, sqr, usolve,
};

use super::Solve;
use crate::basic::error::{Error, Result};

/// LU backend on top of the `rsparse` CSparse port. The symbolic ordering
/// is cached across solves with an unchanged pattern.
#[derive(Default)]
pub struct RSparseSolver {
    symbolic: Option<Symb>,
    work: Option<Vec<f64>>,
}

impl Solve for RSparseSolver {
    fn solve(
        &mut self,
        ap: &mut [usize],
        ai: &mut [usize],
        ax: &mut [f64],
        b: &mut [f64],
        n: usize,
    ) -> Result<()> {
        let a = Sprs {
            m: n,
            n,
            i: ai.to_vec(),
            p: ap.iter().map(|&v| v as isize).collect(),
            x: ax.to_vec(),
            nzmax: ax.len(),
        };
        if self.work.as_ref().map(|w| w.len()) != Some(n) {
            self.reset();
        }
        if self.symbolic.is_none() {
            self.symbolic = Some(sqr(&a, 1, false));
            self.work = Some(vec![0.0; n]);
        }
        let x = self.work.as_mut().unwrap();
        let s = self.symbolic.as_mut().unwrap();
        let num = lu(&a, s, 1e-6)
            .map_err(|_| Error::Singular("sparse LU factorization failed".into()))?;
        ipvec(&num.pinv, b, x); // x = P*b
        lsolve(&num.l, x); // x = L\x
        usolve(&num.u, x); // x = U\x
        ipvec(&s.q, x, b); // b = Q*x
        Ok(())
    }

    fn reset(&mut self) {
        self.symbolic = None;
        self.work = None;
    }
}

fn ipvec(p: &Option<Vec<isize>>, b: &[f64], x: &mut [f64]) {
    match p {
        Some(p) => {
            for k in 0..b.len() {
                x[p[k] as usize] = b[k];
            }
        }
        None => x.copy_from_slice(b),
    }
}
