//! Structural checks ahead of assembly.
//!
//! [`Model::validate`] rejects models the assembler cannot encode (dangling
//! ids, inconsistent attachments, series breaks with shunt-only codes).
//! [`Model::test_for_singularity`] scans the node graph for structures that
//! are likely to defeat the factorization and reports them as warnings; the
//! LU backend still has the final word on numerical singularity.

use std::fmt;

use log::warn;
use nalgebra::Vector3;
use petgraph::unionfind::UnionFind;

use super::elements::{FaultTarget, NodeId, Terminal};
use super::error::{Error, Result};
use super::model::Model;

/// A structural weakness found by [`Model::test_for_singularity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingularityFinding {
    /// A node with no incident branch; its voltage is undetermined.
    IsolatedNode(NodeId),
    /// A connected group of nodes with no conductive tie to ground: no
    /// ground-ended branch, no line charging and no grounding shunt fault.
    FloatingIsland(Vec<NodeId>),
    /// A connected group of nodes with neither an EMF source nor a
    /// grounding fault to pin its voltages.
    PassiveIsland(Vec<NodeId>),
}

impl fmt::Display for SingularityFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingularityFinding::IsolatedNode(q) => {
                write!(f, "node {q} has no incident branch")
            }
            SingularityFinding::FloatingIsland(qs) => {
                write!(f, "nodes {qs:?} have no conductive path to ground")
            }
            SingularityFinding::PassiveIsland(qs) => {
                write!(f, "nodes {qs:?} carry no EMF source and no grounding fault")
            }
        }
    }
}

impl Model {
    /// Verifies that every stored reference resolves within this model and
    /// that every fault is encodable. Cheap; run by `solve()`.
    pub fn validate(&self) -> Result<()> {
        for p in self.branches() {
            for t in [p.q1, p.q2] {
                if let Terminal::Node(q) = t {
                    self.node(q)?;
                }
            }
        }
        for mu in self.mutuals() {
            self.branch(mu.p1)?;
            self.branch(mu.p2)?;
            if mu.p1 == mu.p2 {
                return Err(Error::Value(format!(
                    "mutual {} couples branch {} with itself",
                    mu.id, mu.p1
                )));
            }
        }
        for f in self.faults() {
            match f.target {
                FaultTarget::Node(q) => {
                    if self.node(q)?.fault() != Some(f.id) {
                        return Err(Error::Reference(format!(
                            "fault {} is not attached to its node {q}",
                            f.id
                        )));
                    }
                }
                FaultTarget::Branch(p) => {
                    if !f.code.series_capable() {
                        return Err(Error::Value(format!(
                            "fault {}: code {} is not a series-break condition",
                            f.id, f.code
                        )));
                    }
                    if self.branch(p)?.fault() != Some(f.id) {
                        return Err(Error::Reference(format!(
                            "fault {} is not attached to its branch {p}",
                            f.id
                        )));
                    }
                }
            }
            if !(f.r >= 0.0) {
                return Err(Error::Value(format!(
                    "fault {}: transition resistance {} is negative",
                    f.id, f.r
                )));
            }
        }
        Ok(())
    }

    /// Scans the node graph for trivially singular structures. Findings are
    /// logged as warnings and returned; an empty list means the structure
    /// looks solvable.
    pub fn test_for_singularity(&self) -> Vec<SingularityFinding> {
        let nq = self.n_nodes();
        let mut uf = UnionFind::<usize>::new(nq);
        for p in self.branches() {
            if let (Terminal::Node(q1), Terminal::Node(q2)) = (p.q1, p.q2) {
                uf.union(q1.0 - 1, q2.0 - 1);
            }
        }

        #[derive(Default)]
        struct Island {
            nodes: Vec<NodeId>,
            grounded: bool,
            has_emf: bool,
            has_ground_fault: bool,
        }
        let mut islands: Vec<Island> = (0..nq).map(|_| Island::default()).collect();

        for p in self.branches() {
            let grounded = p.q1.is_ground() || p.q2.is_ground();
            let has_emf = p.e != Vector3::zeros();
            let has_shunt = p.b != Vector3::zeros();
            for t in [p.q1, p.q2] {
                if let Terminal::Node(q) = t {
                    let isl = &mut islands[uf.find(q.0 - 1)];
                    isl.grounded |= grounded || has_shunt;
                    isl.has_emf |= has_emf;
                }
            }
        }
        for q in self.nodes() {
            let isl = &mut islands[uf.find(q.id.0 - 1)];
            isl.nodes.push(q.id);
            if let Some(n) = q.fault() {
                if let Ok(f) = self.fault(n) {
                    if f.code.grounded() {
                        isl.grounded = true;
                        isl.has_ground_fault = true;
                    }
                }
            }
        }

        let mut findings = Vec::new();
        for q in self.nodes() {
            if q.branches().is_empty() {
                findings.push(SingularityFinding::IsolatedNode(q.id));
            }
        }
        for isl in islands {
            if isl.nodes.is_empty() {
                continue;
            }
            if isl.nodes.len() == 1 && self.node(isl.nodes[0]).map_or(false, |q| q.branches().is_empty()) {
                continue; // already reported as isolated
            }
            if !isl.grounded {
                findings.push(SingularityFinding::FloatingIsland(isl.nodes.clone()));
            }
            if !isl.has_emf && !isl.has_ground_fault {
                findings.push(SingularityFinding::PassiveIsland(isl.nodes));
            }
        }
        for f in &findings {
            warn!("singularity scan: {f}");
        }
        findings
    }
}
