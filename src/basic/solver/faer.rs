use faer::{
    MatMut,
    linalg::solvers::Solve as FaerSolve,
    sparse::{
        SparseColMatRef, SymbolicSparseColMatRef,
        linalg::solvers::{Lu, SymbolicLu},
    },
};

use super::Solve;
use crate::basic::error::{Error, Result};

/// LU backend on top of `faer`'s supernodal sparse solver.
#[derive(Default)]
pub struct FaerSolver {
    symbolic: Option<SymbolicLu<usize>>,
}

impl Solve for FaerSolver {
    fn solve(
        &mut self,
        ap: &mut [usize],
        ai: &mut [usize],
        ax: &mut [f64],
        b: &mut [f64],
        n: usize,
    ) -> Result<()> {
        let s = unsafe { SymbolicSparseColMatRef::new_unchecked(n, n, ap, None, ai) };
        let mat = SparseColMatRef::new(s, ax);
        if self.symbolic.is_none() {
            self.symbolic = Some(
                SymbolicLu::try_new(s)
                    .map_err(|_| Error::Singular("faer symbolic analysis failed".into()))?,
            );
        }
        let lu = Lu::try_new_with_symbolic(self.symbolic.as_ref().unwrap().clone(), mat)
            .map_err(|_| Error::Singular("faer numerical factorization failed".into()))?;
        let rhs = MatMut::from_column_major_slice_mut(b, n, 1);
        lu.solve_in_place(rhs);
        Ok(())
    }

    fn reset(&mut self) {
        self.symbolic = None;
    }
}
