//! The mutable network container: build → validate → solve → read.
//!
//! The model owns one arena per entity type and hands out stable 1-based
//! ids in insertion order; those ids also fix the row/column placement in
//! the assembled system, so results are deterministic in insertion order
//! and numerical input alone. Ids are plain integers: an id taken from a
//! different model is only caught when it is out of range here.

use std::fmt;

use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Vector3};
use nalgebra_sparse::CscMatrix;
use num_complex::Complex64;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::assemble::assemble;
use super::elements::{
    Branch, BranchId, BranchPar, Fault, FaultCode, FaultId, FaultTarget, Mutual, MutualId, Node,
    NodeId, Terminal,
};
use super::error::{Error, Result};
use super::solver::{DefaultSolver, Solve};
use super::sparse::expand::solve_complex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    pub desc: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) branches: Vec<Branch>,
    pub(crate) mutuals: Vec<Mutual>,
    pub(crate) faults: Vec<Fault>,
    /// Solution vector, `None` until a successful [`solve`](Model::solve).
    #[serde(skip)]
    pub(crate) x: Option<DVector<Complex64>>,
}

impl Model {
    pub fn new() -> Self {
        Model::default()
    }

    pub fn with_desc(desc: &str) -> Self {
        Model {
            desc: desc.to_string(),
            ..Model::default()
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_branches(&self) -> usize {
        self.branches.len()
    }

    pub fn n_mutuals(&self) -> usize {
        self.mutuals.len()
    }

    pub fn n_faults(&self) -> usize {
        self.faults.len()
    }

    /// Dimension of the assembled system, `3(N_p + N_q + N_n)`.
    pub fn dim(&self) -> usize {
        3 * (self.branches.len() + self.nodes.len() + self.faults.len())
    }

    pub fn is_solved(&self) -> bool {
        self.x.is_some()
    }

    // ---- entity access -------------------------------------------------

    pub fn node(&self, q: NodeId) -> Result<&Node> {
        self.nodes
            .get(q.0.wrapping_sub(1))
            .ok_or_else(|| Error::Reference(format!("node {q} does not exist in this model")))
    }

    pub fn branch(&self, p: BranchId) -> Result<&Branch> {
        self.branches
            .get(p.0.wrapping_sub(1))
            .ok_or_else(|| Error::Reference(format!("branch {p} does not exist in this model")))
    }

    pub fn mutual(&self, m: MutualId) -> Result<&Mutual> {
        self.mutuals
            .get(m.0.wrapping_sub(1))
            .ok_or_else(|| Error::Reference(format!("mutual {m} does not exist in this model")))
    }

    pub fn fault(&self, n: FaultId) -> Result<&Fault> {
        self.faults
            .get(n.0.wrapping_sub(1))
            .ok_or_else(|| Error::Reference(format!("fault {n} does not exist in this model")))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }

    pub fn mutuals(&self) -> impl Iterator<Item = &Mutual> {
        self.mutuals.iter()
    }

    pub fn faults(&self) -> impl Iterator<Item = &Fault> {
        self.faults.iter()
    }

    // ---- construction --------------------------------------------------

    pub fn add_node(&mut self, name: &str) -> NodeId {
        self.add_node_desc(name, "")
    }

    pub fn add_node_desc(&mut self, name: &str, desc: &str) -> NodeId {
        let id = NodeId(self.nodes.len() + 1);
        self.nodes.push(Node {
            id,
            name: name.to_string(),
            desc: desc.to_string(),
            branches: Vec::new(),
            fault: None,
        });
        id
    }

    /// Bulk-adds `n` nodes named `base1 .. base<n>`.
    pub fn add_nodes(&mut self, n: usize, base: &str) -> Vec<NodeId> {
        (1..=n)
            .map(|k| self.add_node(&format!("{base}{k}")))
            .collect()
    }

    pub fn add_branch(
        &mut self,
        name: &str,
        q1: Terminal,
        q2: Terminal,
        par: BranchPar,
    ) -> Result<BranchId> {
        self.add_branch_desc(name, q1, q2, par, "")
    }

    pub fn add_branch_desc(
        &mut self,
        name: &str,
        q1: Terminal,
        q2: Terminal,
        par: BranchPar,
        desc: &str,
    ) -> Result<BranchId> {
        for t in [q1, q2] {
            if let Terminal::Node(q) = t {
                self.node(q)?;
            }
        }
        if !(par.t.ratio > 0.0) {
            return Err(Error::Value(format!(
                "branch '{name}': transformer ratio must be positive, got {}",
                par.t.ratio
            )));
        }
        if par.t.group > 11 {
            return Err(Error::Value(format!(
                "branch '{name}': vector group must be 0..=11, got {}",
                par.t.group
            )));
        }
        if q1 == q2 && !q1.is_ground() {
            warn!("branch '{name}' connects both ends to the same node {q1}");
        }
        let id = BranchId(self.branches.len() + 1);
        self.branches.push(Branch {
            id,
            name: name.to_string(),
            desc: desc.to_string(),
            q1,
            q2,
            z: par.z,
            e: par.e,
            t: par.t,
            b: par.b,
            mutuals: Vec::new(),
            fault: None,
        });
        for t in [q1, q2] {
            if let Terminal::Node(q) = t {
                let node = &mut self.nodes[q.0 - 1];
                if !node.branches.contains(&id) {
                    node.branches.push(id);
                }
            }
        }
        Ok(id)
    }

    pub fn add_mutual(
        &mut self,
        name: &str,
        p1: BranchId,
        p2: BranchId,
        m12: impl Into<Complex64>,
        m21: impl Into<Complex64>,
    ) -> Result<MutualId> {
        self.add_mutual_desc(name, p1, p2, m12, m21, "")
    }

    pub fn add_mutual_desc(
        &mut self,
        name: &str,
        p1: BranchId,
        p2: BranchId,
        m12: impl Into<Complex64>,
        m21: impl Into<Complex64>,
        desc: &str,
    ) -> Result<MutualId> {
        self.branch(p1)?;
        self.branch(p2)?;
        if p1 == p2 {
            return Err(Error::Value(format!(
                "mutual '{name}' couples branch {p1} with itself"
            )));
        }
        let id = MutualId(self.mutuals.len() + 1);
        self.mutuals.push(Mutual {
            id,
            name: name.to_string(),
            desc: desc.to_string(),
            p1,
            p2,
            m12: m12.into(),
            m21: m21.into(),
        });
        self.branches[p1.0 - 1].mutuals.push(id);
        self.branches[p2.0 - 1].mutuals.push(id);
        Ok(id)
    }

    /// Adds a solid fault (transition resistance 0).
    pub fn add_fault(
        &mut self,
        name: &str,
        target: impl Into<FaultTarget>,
        code: FaultCode,
    ) -> Result<FaultId> {
        self.add_fault_r(name, target, code, 0.0)
    }

    pub fn add_fault_r(
        &mut self,
        name: &str,
        target: impl Into<FaultTarget>,
        code: FaultCode,
        r: f64,
    ) -> Result<FaultId> {
        let target = target.into();
        if !(r >= 0.0) {
            return Err(Error::Value(format!(
                "fault '{name}': transition resistance must be >= 0, got {r}"
            )));
        }
        match target {
            FaultTarget::Node(q) => {
                if let Some(existing) = self.node(q)?.fault {
                    return Err(Error::State(format!(
                        "fault '{name}': node {q} already carries fault {existing}"
                    )));
                }
            }
            FaultTarget::Branch(p) => {
                if !code.series_capable() {
                    return Err(Error::Value(format!(
                        "fault '{name}': code {code} is not a series-break condition"
                    )));
                }
                if let Some(existing) = self.branch(p)?.fault {
                    return Err(Error::State(format!(
                        "fault '{name}': branch {p} already carries fault {existing}"
                    )));
                }
            }
        }
        let id = FaultId(self.faults.len() + 1);
        self.faults.push(Fault {
            id,
            name: name.to_string(),
            desc: String::new(),
            target,
            code,
            r,
        });
        match target {
            FaultTarget::Node(q) => self.nodes[q.0 - 1].fault = Some(id),
            FaultTarget::Branch(p) => self.branches[p.0 - 1].fault = Some(id),
        }
        Ok(id)
    }

    /// Emits one branch per row of a multi-circuit section plus the
    /// zero-sequence mutuals of all off-diagonal pairs.
    ///
    /// `z12[i]` is row `i`'s positive/negative-sequence impedance,
    /// `z0[(i,i)]` its zero-sequence impedance and `z0[(i,j)]` the mutual
    /// impedance pair `(M12, M21) = (z0[(i,j)], z0[(j,i)])`. `b12`/`b0`
    /// supply line charging the same way; off-diagonal susceptances have no
    /// mutual counterpart and are ignored.
    #[allow(clippy::too_many_arguments)]
    pub fn add_branch_section(
        &mut self,
        name: &str,
        left: &[Terminal],
        right: &[Terminal],
        z12: &[Complex64],
        z0: &DMatrix<Complex64>,
        b12: Option<&[Complex64]>,
        b0: Option<&DMatrix<Complex64>>,
    ) -> Result<Vec<BranchId>> {
        let n = left.len();
        if right.len() != n || z12.len() != n || z0.nrows() != n || z0.ncols() != n {
            return Err(Error::Value(format!(
                "section '{name}': got {} left / {} right terminals, {} z12 entries, {}x{} z0",
                n,
                right.len(),
                z12.len(),
                z0.nrows(),
                z0.ncols()
            )));
        }
        if let Some(b) = b12 {
            if b.len() != n {
                return Err(Error::Value(format!(
                    "section '{name}': b12 has {} entries for {} circuits",
                    b.len(),
                    n
                )));
            }
        }
        if let Some(b) = b0 {
            if b.nrows() != n || b.ncols() != n {
                return Err(Error::Value(format!(
                    "section '{name}': b0 is {}x{} for {} circuits",
                    b.nrows(),
                    b.ncols(),
                    n
                )));
            }
        }
        let mut ids = Vec::with_capacity(n);
        for i in 0..n {
            let mut par = BranchPar::new(z12[i], z12[i], z0[(i, i)]);
            let b1 = b12.map_or(Complex64::zero(), |b| b[i]);
            let bz = b0.map_or(Complex64::zero(), |b| b[(i, i)]);
            par = par.shunt(b1, b1, bz);
            ids.push(self.add_branch(&format!("{name}-{}", i + 1), left[i], right[i], par)?);
        }
        for i in 0..n {
            for j in (i + 1)..n {
                self.add_mutual(
                    &format!("{name}-{}-{}", i + 1, j + 1),
                    ids[i],
                    ids[j],
                    z0[(i, j)],
                    z0[(j, i)],
                )?;
            }
        }
        Ok(ids)
    }

    // ---- reset ---------------------------------------------------------

    /// Detaches every entity and forgets any solution.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.branches.clear();
        self.mutuals.clear();
        self.faults.clear();
        self.x = None;
    }

    /// Removes all faults except the permanent `N0` markers, which survive
    /// scenario sweeps, and re-numbers the survivors compactly. The stored
    /// solution is dropped since the system layout changed.
    pub fn clear_faults(&mut self) {
        for f in &self.faults {
            match f.target {
                FaultTarget::Node(q) => self.nodes[q.0 - 1].fault = None,
                FaultTarget::Branch(p) => self.branches[p.0 - 1].fault = None,
            }
        }
        self.faults.retain(|f| f.code == FaultCode::N0);
        for (k, f) in self.faults.iter_mut().enumerate() {
            f.id = FaultId(k + 1);
        }
        for f in &self.faults {
            match f.target {
                FaultTarget::Node(q) => self.nodes[q.0 - 1].fault = Some(f.id),
                FaultTarget::Branch(p) => self.branches[p.0 - 1].fault = Some(f.id),
            }
        }
        self.x = None;
    }

    // ---- system layout -------------------------------------------------

    pub(crate) fn branch_offset(&self, p: BranchId) -> usize {
        3 * (p.0 - 1)
    }

    pub(crate) fn node_offset(&self, q: NodeId) -> usize {
        3 * (self.branches.len() + q.0 - 1)
    }

    pub(crate) fn fault_offset(&self, n: FaultId) -> usize {
        3 * (self.branches.len() + self.nodes.len() + n.0 - 1)
    }

    // ---- solve ---------------------------------------------------------

    /// Assembles the sparse system, factorizes it and stores the solution
    /// vector. Uses the crate's default LU backend.
    pub fn solve(&mut self) -> Result<()> {
        let mut solver = DefaultSolver::default();
        self.solve_with(&mut solver)
    }

    /// [`solve`](Model::solve) with a caller-supplied backend.
    pub fn solve_with<S: Solve>(&mut self, solver: &mut S) -> Result<()> {
        self.x = None;
        self.validate()?;
        let n = self.dim();
        if n == 0 {
            self.x = Some(DVector::zeros(0));
            return Ok(());
        }
        let (coo, rhs) = assemble(self)?;
        let lhs = CscMatrix::from(&coo);
        debug!(
            "assembled {}x{} system with {} nonzeros ({} branches, {} nodes, {} faults)",
            n,
            n,
            lhs.nnz(),
            self.branches.len(),
            self.nodes.len(),
            self.faults.len()
        );
        let x = solve_complex(&lhs, &rhs, solver)?;
        self.x = Some(x);
        Ok(())
    }

    pub(crate) fn solution(&self) -> Result<&DVector<Complex64>> {
        self.x
            .as_ref()
            .ok_or_else(|| Error::State("no solution available; call solve() first".into()))
    }

    /// Raw solution triple of an entity: branch sequence currents, node
    /// sequence voltages, or the fault auxiliary vector.
    pub fn get_result(&self, target: impl Into<FaultTarget>) -> Result<Vector3<Complex64>> {
        match target.into() {
            FaultTarget::Node(q) => self.node_voltage(q),
            FaultTarget::Branch(p) => self.branch_current(p),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model '{}': {} nodes, {} branches, {} mutuals, {} faults",
            self.desc,
            self.nodes.len(),
            self.branches.len(),
            self.mutuals.len(),
            self.faults.len()
        )?;
        for q in &self.nodes {
            writeln!(f, "  {q}")?;
        }
        for p in &self.branches {
            writeln!(f, "  {p}")?;
        }
        for m in &self.mutuals {
            writeln!(f, "  {m}")?;
        }
        for n in &self.faults {
            writeln!(f, "  {n}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::elements::GND;

    fn j(x: f64) -> Complex64 {
        Complex64::new(0.0, x)
    }

    fn two_node_model() -> (Model, NodeId, NodeId) {
        let mut mdl = Model::new();
        let q1 = mdl.add_node("Sys");
        let q2 = mdl.add_node("Bus");
        mdl.add_branch(
            "Src",
            GND,
            q1.into(),
            BranchPar::new(j(2.0), j(2.0), j(3.0)).emf(65000.0, 0.0, 0.0),
        )
        .unwrap();
        mdl.add_branch("Line", q1.into(), q2.into(), BranchPar::new(j(10.0), j(10.0), j(30.0)))
            .unwrap();
        (mdl, q1, q2)
    }

    #[test]
    fn ids_are_one_based_insertion_order() {
        let (mdl, q1, q2) = two_node_model();
        assert_eq!(q1, NodeId(1));
        assert_eq!(q2, NodeId(2));
        assert_eq!(mdl.branch(BranchId(2)).unwrap().name, "Line");
        assert!(mdl.branch(BranchId(3)).is_err());
        assert!(mdl.node(NodeId(0)).is_err());
    }

    #[test]
    fn incidence_lists_are_maintained() {
        let (mdl, q1, q2) = two_node_model();
        assert_eq!(mdl.node(q1).unwrap().branches(), &[BranchId(1), BranchId(2)]);
        assert_eq!(mdl.node(q2).unwrap().branches(), &[BranchId(2)]);
    }

    #[test]
    fn constructor_errors() {
        let (mut mdl, q1, _) = two_node_model();
        // foreign / stale id
        assert!(mdl
            .add_branch("bad", Terminal::Node(NodeId(9)), GND, BranchPar::new(j(1.0), j(1.0), j(1.0)))
            .is_err());
        // bad transformer parameters
        assert!(mdl
            .add_branch("bad", GND, q1.into(), BranchPar::new(j(1.0), j(1.0), j(1.0)).tap(0.0, 0))
            .is_err());
        assert!(mdl
            .add_branch("bad", GND, q1.into(), BranchPar::new(j(1.0), j(1.0), j(1.0)).tap(1.0, 12))
            .is_err());
        // self-coupled mutual
        assert!(mdl
            .add_mutual("bad", BranchId(1), BranchId(1), j(1.0), j(1.0))
            .is_err());
        // series break with a shunt-only code
        assert!(mdl
            .add_fault("bad", BranchId(1), FaultCode::ABC0)
            .is_err());
        // double fault attachment
        mdl.add_fault("kz", q1, FaultCode::A0).unwrap();
        assert!(mdl.add_fault("kz2", q1, FaultCode::BC).is_err());
    }

    #[test]
    fn clear_faults_keeps_permanent_markers() {
        let (mut mdl, q1, q2) = two_node_model();
        let n0 = mdl.add_fault("neutral", q2, FaultCode::N0).unwrap();
        let kz = mdl.add_fault("kz", q1, FaultCode::A0).unwrap();
        assert_eq!((n0, kz), (FaultId(1), FaultId(2)));

        mdl.clear_faults();
        assert_eq!(mdl.n_faults(), 1);
        let survivor = mdl.fault(FaultId(1)).unwrap();
        assert_eq!(survivor.code, FaultCode::N0);
        assert_eq!(survivor.target, FaultTarget::Node(q2));
        assert_eq!(mdl.node(q2).unwrap().fault(), Some(FaultId(1)));
        assert_eq!(mdl.node(q1).unwrap().fault(), None);
    }

    #[test]
    fn clear_detaches_everything() {
        let (mut mdl, q1, _) = two_node_model();
        mdl.add_fault("kz", q1, FaultCode::A0).unwrap();
        mdl.clear();
        assert_eq!(mdl.n_nodes() + mdl.n_branches() + mdl.n_faults(), 0);
        assert!(mdl.node(q1).is_err());
    }

    #[test]
    fn dimension_law() {
        let (mut mdl, q1, _) = two_node_model();
        mdl.add_fault("kz", q1, FaultCode::A0).unwrap();
        mdl.solve().unwrap();
        assert_eq!(mdl.solution().unwrap().len(), mdl.dim());
        assert_eq!(mdl.dim(), 3 * (2 + 2 + 1));
    }

    #[test]
    fn query_before_solve_is_a_state_error() {
        let (mdl, q1, _) = two_node_model();
        match mdl.node_voltage(q1) {
            Err(Error::State(_)) => {}
            other => panic!("expected state error, got {other:?}"),
        }
    }

    #[test]
    fn section_helper_emits_branches_and_mutuals() {
        let mut mdl = Model::new();
        let qs = mdl.add_nodes(2, "Q");
        let left = [Terminal::Node(qs[0]); 3];
        let right = [Terminal::Node(qs[1]); 3];
        let z12 = [j(10.0); 3];
        let z0 = DMatrix::from_fn(3, 3, |i, k| if i == k { j(30.0) } else { j(15.0) });
        let ids = mdl
            .add_branch_section("L", &left, &right, &z12, &z0, None, None)
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(mdl.n_mutuals(), 3);
        let m = mdl.mutual(MutualId(1)).unwrap();
        assert_eq!((m.p1, m.p2), (ids[0], ids[1]));
        assert!((m.m12 - j(15.0)).norm() < 1e-15);

        // size mismatch
        assert!(mdl
            .add_branch_section("bad", &left[..2], &right, &z12, &z0, None, None)
            .is_err());
    }

    #[test]
    fn node_names_from_bulk_helper() {
        let mut mdl = Model::new();
        let ids = mdl.add_nodes(3, "PS");
        assert_eq!(mdl.node(ids[2]).unwrap().name, "PS3");
    }

    #[test]
    fn serde_round_trip() {
        let (mdl, _, _) = two_node_model();
        let text = serde_json::to_string(&mdl).unwrap();
        let back: Model = serde_json::from_str(&text).unwrap();
        assert_eq!(back.n_branches(), 2);
        assert_eq!(back.branch(BranchId(1)).unwrap().e[0].re, 65000.0);
        assert!(!back.is_solved());
    }
}
