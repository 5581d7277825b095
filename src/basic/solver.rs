#[cfg(feature = "faer")]
mod faer;
#[cfg(feature = "faer")]
pub use faer::*;

#[cfg(feature = "rsparse")]
mod rsparse;
#[cfg(feature = "rsparse")]
pub use rsparse::*;

#[cfg(feature = "faer")]
pub type DefaultSolver = FaerSolver;

#[cfg(all(not(feature = "faer"), feature = "rsparse"))]
pub type DefaultSolver = RSparseSolver;

use super::error::Result;

/// A direct solver for sparse real linear systems in CSC form.
///
/// `ap`/`ai`/`ax` are the column offsets, row indices and values of an
/// `n`×`n` matrix; `b` holds the right-hand side on entry and the solution
/// on return. A numerically singular matrix is reported as
/// [`Error::Singular`](super::error::Error::Singular).
pub trait Solve {
    fn solve(
        &mut self,
        ap: &mut [usize],
        ai: &mut [usize],
        ax: &mut [f64],
        b: &mut [f64],
        n: usize,
    ) -> Result<()>;

    /// Drops any cached symbolic analysis, e.g. after the sparsity pattern
    /// changed.
    fn reset(&mut self) {}
}
