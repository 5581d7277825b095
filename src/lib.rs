//! Steady-state short-circuit analysis of three-phase networks in the
//! symmetrical-component domain.
//!
//! A [`Model`](basic::model::Model) collects nodes, branches, zero-sequence
//! mutual couplings and faults, assembles them into one sparse complex
//! linear system and solves it with a direct LU backend. All classical
//! shunt fault and series break types are encoded as boundary-condition
//! blocks of that system; solved models answer named-quantity queries
//! (`"UA"`, `"q1IB"`, `"ZAB"`, ...) per entity.
//!
//! ```no_run
//! use rustfault::prelude::*;
//!
//! let mut mdl = Model::new();
//! let bus = mdl.add_node("Bus");
//! mdl.add_branch(
//!     "Sys",
//!     GND,
//!     bus.into(),
//!     BranchPar::new(num_complex::Complex64::new(0.0, 2.0),
//!                    num_complex::Complex64::new(0.0, 2.0),
//!                    num_complex::Complex64::new(0.0, 3.0))
//!         .emf(65000.0, 0.0, 0.0),
//! )?;
//! let kz = mdl.add_fault("KZ", bus, FaultCode::A0)?;
//! mdl.solve()?;
//! mdl.print_fault_report(kz)?;
//! # Ok::<(), Error>(())
//! ```

mod basic;

pub mod prelude {
    use crate::basic;
    pub use basic::elements::*;
    pub use basic::error::{Error, Result};
    pub use basic::model::Model;
    pub use basic::phasor;
    pub use basic::quantity::{Form, Formed, Value};
    pub use basic::results::Side;
    pub use basic::solver::{DefaultSolver, Solve};
    pub use basic::validate::SingularityFinding;
}
