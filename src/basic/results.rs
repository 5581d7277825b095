//! Read access to a solved model.
//!
//! Branch readings are side-aware: from the `q1` side the raw branch
//! current only gains that end's charging contribution, from the `q2` side
//! it is additionally flipped through the ideal-transformer factors so the
//! current points into the branch from node 2.

mod res_display;

use nalgebra::Vector3;
use num_complex::Complex64;

use super::elements::{BranchId, FaultId, FaultTarget, NodeId, Terminal};
use super::error::{Error, Result};
use super::model::Model;
use super::quantity::{self, Form, Formed, Value};

/// Measurement side of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Q1,
    Q2,
}

impl Model {
    /// Sequence voltages `(U1, U2, U0)` at a node.
    pub fn node_voltage(&self, q: NodeId) -> Result<Vector3<Complex64>> {
        let id = self.node(q)?.id;
        let x = self.solution()?;
        let off = self.node_offset(id);
        Ok(Vector3::new(x[off], x[off + 1], x[off + 2]))
    }

    /// Raw sequence currents `(I1, I2, I0)` of a branch, oriented from `q1`
    /// to `q2`, without any charging contribution.
    pub fn branch_current(&self, p: BranchId) -> Result<Vector3<Complex64>> {
        let id = self.branch(p)?.id;
        let x = self.solution()?;
        let off = self.branch_offset(id);
        Ok(Vector3::new(x[off], x[off + 1], x[off + 2]))
    }

    /// Auxiliary triple of a fault: the sequence fault current for a shunt
    /// fault, the sequence voltage break for a series break.
    pub fn fault_vector(&self, n: FaultId) -> Result<Vector3<Complex64>> {
        let id = self.fault(n)?.id;
        let x = self.solution()?;
        let off = self.fault_offset(id);
        Ok(Vector3::new(x[off], x[off + 1], x[off + 2]))
    }

    fn terminal_voltage(&self, t: Terminal) -> Result<Vector3<Complex64>> {
        match t {
            Terminal::Ground => Ok(Vector3::zeros()),
            Terminal::Node(q) => self.node_voltage(q),
        }
    }

    /// Voltage and current of a branch as measured from one side.
    pub fn branch_side(&self, p: BranchId, side: Side) -> Result<(Vector3<Complex64>, Vector3<Complex64>)> {
        let br = self.branch(p)?;
        let mut i = self.branch_current(p)?;
        match side {
            Side::Q1 => {
                let u = self.terminal_voltage(br.q1)?;
                for s in 0..3 {
                    i[s] += u[s] * br.b[s] / 2.0;
                }
                Ok((u, i))
            }
            Side::Q2 => {
                let u = self.terminal_voltage(br.q2)?;
                let k = br.t.factors();
                for s in 0..3 {
                    i[s] = -k[s] * i[s] + u[s] * br.b[s] / 2.0;
                }
                Ok((u, i))
            }
        }
    }

    /// Per-branch sequence currents flowing from each incident branch into
    /// a shunt fault's node.
    pub fn fault_contributions(&self, n: FaultId) -> Result<Vec<(BranchId, Vector3<Complex64>)>> {
        let f = self.fault(n)?;
        let q = match f.target {
            FaultTarget::Node(q) => q,
            FaultTarget::Branch(_) => {
                return Err(Error::Value(format!(
                    "fault {n} is a series break; it has no nodal contributions"
                )));
            }
        };
        let mut out = Vec::new();
        for &pid in self.node(q)?.branches() {
            let side = if self.branch(pid)?.q1 == Terminal::Node(q) {
                Side::Q1
            } else {
                Side::Q2
            };
            let (_, i) = self.branch_side(pid, side)?;
            out.push((pid, -i));
        }
        Ok(out)
    }

    // ---- named-quantity queries ---------------------------------------

    /// Node quantity by name (`"U1"`, `"UA"`, `"3U0"`, ...); current-based
    /// names see a zero current.
    pub fn node_query(&self, q: NodeId, name: &str) -> Result<Value> {
        let u = self.node_voltage(q)?;
        eval(name, &u, &Vector3::zeros())
    }

    /// Branch quantity by name. A `q1`/`q2` prefix selects the measurement
    /// side (`"q1IA"`, `"q2UAB"`); without a prefix the raw branch current
    /// is used and voltage-based names see zero.
    pub fn branch_query(&self, p: BranchId, name: &str) -> Result<Value> {
        if let Some(rest) = name.strip_prefix("q1") {
            let (u, i) = self.branch_side(p, Side::Q1)?;
            eval(rest, &u, &i)
        } else if let Some(rest) = name.strip_prefix("q2") {
            let (u, i) = self.branch_side(p, Side::Q2)?;
            eval(rest, &u, &i)
        } else {
            let i = self.branch_current(p)?;
            eval(name, &Vector3::zeros(), &i)
        }
    }

    /// Fault quantity by name: for a shunt fault the node voltage and fault
    /// current, for a series break the voltage break and branch current.
    pub fn fault_query(&self, n: FaultId, name: &str) -> Result<Value> {
        let f = self.fault(n)?;
        let (u, i) = match f.target {
            FaultTarget::Node(q) => (self.node_voltage(q)?, self.fault_vector(n)?),
            FaultTarget::Branch(p) => (self.fault_vector(n)?, self.branch_current(p)?),
        };
        eval(name, &u, &i)
    }

    pub fn node_query_fmt(&self, q: NodeId, name: &str, form: Form) -> Result<Formed> {
        Ok(quantity::format(name, &self.node_query(q, name)?, form))
    }

    pub fn branch_query_fmt(&self, p: BranchId, name: &str, form: Form) -> Result<Formed> {
        Ok(quantity::format(name, &self.branch_query(p, name)?, form))
    }

    pub fn fault_query_fmt(&self, n: FaultId, name: &str, form: Form) -> Result<Formed> {
        Ok(quantity::format(name, &self.fault_query(n, name)?, form))
    }
}

fn eval(name: &str, u: &Vector3<Complex64>, i: &Vector3<Complex64>) -> Result<Value> {
    quantity::eval(name, u, i).ok_or_else(|| Error::Value(format!("unknown quantity '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::elements::{BranchPar, FaultCode, GND};
    use std::f64::consts::PI;

    fn j(x: f64) -> Complex64 {
        Complex64::new(0.0, x)
    }

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn sc(v: Result<Value>) -> Complex64 {
        v.unwrap().scalar().unwrap()
    }

    /// Two equivalent systems feeding a four-node ring, with zero-sequence
    /// mutuals between the parallel line pairs and transformer stubs
    /// grounding the substation buses.
    fn ring() -> (Model, [NodeId; 4], [BranchId; 8]) {
        let mut mdl = Model::new();
        let sys1 = mdl.add_node("Sys1");
        let sys2 = mdl.add_node("Sys2");
        let ps1 = mdl.add_node("PS1");
        let ps2 = mdl.add_node("PS2");

        let src = || BranchPar::new(j(2.0), j(2.0), j(3.0)).emf(65000.0, 0.0, 0.0);
        let line = || BranchPar::new(j(10.0), j(10.0), j(30.0));
        let stub = || BranchPar::new(500.0, j(200.0), j(30.0));

        let s1 = mdl.add_branch("Sys1", GND, sys1.into(), src()).unwrap();
        let s2 = mdl.add_branch("Sys2", GND, sys2.into(), src()).unwrap();
        let l1 = mdl.add_branch("Sys1-PS1", sys1.into(), ps1.into(), line()).unwrap();
        let l2 = mdl.add_branch("Sys1-PS2", sys1.into(), ps2.into(), line()).unwrap();
        let l3 = mdl.add_branch("Sys2-PS1", sys2.into(), ps1.into(), line()).unwrap();
        let l4 = mdl.add_branch("Sys2-PS2", sys2.into(), ps2.into(), line()).unwrap();
        let t1 = mdl.add_branch("PS1", GND, ps1.into(), stub()).unwrap();
        let t2 = mdl.add_branch("PS2", GND, ps2.into(), stub()).unwrap();

        mdl.add_mutual("L1-L2", l1, l2, j(15.0), j(15.0)).unwrap();
        mdl.add_mutual("L3-L4", l3, l4, j(15.0), j(15.0)).unwrap();

        (
            mdl,
            [sys1, sys2, ps1, ps2],
            [s1, s2, l1, l2, l3, l4, t1, t2],
        )
    }

    /// Residual of every node's KCL row from the stored solution.
    fn assert_kcl(mdl: &Model, tol: f64) {
        for q in mdl.nodes() {
            let u = mdl.node_voltage(q.id).unwrap();
            let mut net = Vector3::<Complex64>::zeros();
            for &pid in q.branches() {
                let br = mdl.branch(pid).unwrap();
                let i = mdl.branch_current(pid).unwrap();
                let k = br.t.factors();
                for s in 0..3 {
                    if br.q1 == Terminal::Node(q.id) {
                        net[s] -= i[s];
                        net[s] -= u[s] * br.b[s] / 2.0;
                    }
                    if br.q2 == Terminal::Node(q.id) {
                        net[s] += k[s] * i[s];
                        net[s] -= u[s] * br.b[s] / 2.0;
                    }
                }
            }
            let fault_i = match q.fault() {
                Some(n) => mdl.fault_vector(n).unwrap(),
                None => Vector3::zeros(),
            };
            for s in 0..3 {
                net[s] -= fault_i[s];
            }
            assert!(
                net.norm() < tol,
                "KCL violated at node {}: residual {}",
                q.id,
                net.norm()
            );
        }
    }

    /// Residual of every branch's KVL row from the stored solution.
    fn assert_kvl(mdl: &Model, tol: f64) {
        for br in mdl.branches() {
            let i = mdl.branch_current(br.id).unwrap();
            let u1 = mdl.terminal_voltage(br.q1).unwrap();
            let u2 = mdl.terminal_voltage(br.q2).unwrap();
            let k = br.t.factors();
            let du = match br.fault() {
                Some(n) => mdl.fault_vector(n).unwrap(),
                None => Vector3::zeros(),
            };
            let mut m0 = Vector3::<Complex64>::zeros();
            for mid in br.mutuals() {
                let mu = mdl.mutual(*mid).unwrap();
                if mu.p1 == br.id {
                    m0[2] += mu.m12 * mdl.branch_current(mu.p2).unwrap()[2];
                }
                if mu.p2 == br.id {
                    m0[2] += mu.m21 * mdl.branch_current(mu.p1).unwrap()[2];
                }
            }
            for s in 0..3 {
                let res = br.z[s] * i[s] + m0[s] - u1[s] + k[s] * u2[s] + du[s] - br.e[s];
                assert!(
                    res.norm() < tol,
                    "KVL violated on branch {} seq {s}: residual {}",
                    br.id,
                    res.norm()
                );
            }
        }
    }

    #[test]
    fn balanced_network_is_positive_sequence_only() {
        let (mut mdl, nodes, _) = ring();
        mdl.solve().unwrap();
        for q in nodes {
            let u = mdl.node_voltage(q).unwrap();
            assert!(u[1].norm() < 1e-6, "U2 at node {q} is {}", u[1].norm());
            assert!(u[2].norm() < 1e-6, "U0 at node {q} is {}", u[2].norm());
            let ua = sc(mdl.node_query(q, "UA"));
            assert!((ua - u[0]).norm() < 1e-6);
        }
        assert_kcl(&mdl, 1e-6);
        assert_kvl(&mdl, 1e-6);
    }

    #[test]
    fn single_phase_fault_at_ps1() {
        let (mut mdl, nodes, _) = ring();
        let ps1 = nodes[2];
        let kz = mdl.add_fault("KZ", ps1, FaultCode::A0).unwrap();
        mdl.solve().unwrap();

        let ua = sc(mdl.fault_query(kz, "UA"));
        let ub = sc(mdl.fault_query(kz, "UB"));
        let uc = sc(mdl.fault_query(kz, "UC"));
        assert!(ua.norm() < 1e-4, "UA at fault is {}", ua.norm());
        assert!(ub.norm() > 10000.0);
        assert!(uc.norm() > 10000.0);

        // Sound-phase fault currents vanish.
        assert!(sc(mdl.fault_query(kz, "IB")).norm() < 1e-4);
        assert!(sc(mdl.fault_query(kz, "IC")).norm() < 1e-4);

        // The total fault current is the sum of the branch currents flowing
        // into PS1 from its incident branches.
        let total = mdl.fault_vector(kz).unwrap();
        assert!(total[0].norm() > 100.0);
        let mut summed = Vector3::<Complex64>::zeros();
        for (_, i) in mdl.fault_contributions(kz).unwrap() {
            summed += i;
        }
        assert!(
            (summed - total).norm() < 1e-6 * total.norm(),
            "contributions {summed:?} != fault current {total:?}"
        );

        assert_kcl(&mdl, 1e-5);
        assert_kvl(&mdl, 1e-5);
    }

    #[test]
    fn resistive_single_phase_fault() {
        let (mut mdl, nodes, _) = ring();
        let kz = mdl.add_fault_r("KZ", nodes[2], FaultCode::A0r, 2.0).unwrap();
        mdl.solve().unwrap();

        let ua = sc(mdl.fault_query(kz, "UA"));
        let ia = sc(mdl.fault_query(kz, "IA"));
        assert!(ia.norm() > 100.0);
        assert!(
            (ua - 2.0 * ia).norm() < 1e-6 * ua.norm().max(1.0),
            "UA - r*IA = {}",
            (ua - 2.0 * ia).norm()
        );
        assert!(sc(mdl.fault_query(kz, "IB")).norm() < 1e-4);
        assert!(sc(mdl.fault_query(kz, "IC")).norm() < 1e-4);
    }

    #[test]
    fn phase_to_phase_fault() {
        let (mut mdl, nodes, _) = ring();
        let kz = mdl.add_fault("KZ", nodes[2], FaultCode::BC).unwrap();
        mdl.solve().unwrap();

        let ub = sc(mdl.fault_query(kz, "UB"));
        let uc = sc(mdl.fault_query(kz, "UC"));
        let ib = sc(mdl.fault_query(kz, "IB"));
        let ic = sc(mdl.fault_query(kz, "IC"));
        assert!((ub - uc).norm() < 1e-6 * ub.norm());
        assert!((ib + ic).norm() < 1e-6 * ib.norm());
        assert!(ib.norm() > 100.0);
        assert!(sc(mdl.fault_query(kz, "IA")).norm() < 1e-4);
        // No ground tie: the zero-sequence current stays zero.
        assert!(sc(mdl.fault_query(kz, "3I0")).norm() < 1e-4);
    }

    #[test]
    fn two_phase_to_ground_fault() {
        let (mut mdl, nodes, _) = ring();
        let kz = mdl.add_fault("KZ", nodes[2], FaultCode::BC0).unwrap();
        mdl.solve().unwrap();

        assert!(sc(mdl.fault_query(kz, "UB")).norm() < 1e-4);
        assert!(sc(mdl.fault_query(kz, "UC")).norm() < 1e-4);
        assert!(sc(mdl.fault_query(kz, "IA")).norm() < 1e-4);
        assert!(sc(mdl.fault_query(kz, "UA")).norm() > 10000.0);
        assert_kcl(&mdl, 1e-5);
    }

    #[test]
    fn fault_idempotence_across_clear() {
        let (mut mdl, nodes, _) = ring();
        mdl.add_fault("KZ", nodes[2], FaultCode::A0).unwrap();
        mdl.solve().unwrap();
        let first = mdl.solution().unwrap().clone();

        mdl.clear_faults();
        mdl.add_fault("KZ", nodes[2], FaultCode::A0).unwrap();
        mdl.solve().unwrap();
        let second = mdl.solution().unwrap();

        assert_eq!(first.len(), second.len());
        for k in 0..first.len() {
            assert!((first[k] - second[k]).norm() < 1e-9 * (1.0 + first[k].norm()));
        }
    }

    #[test]
    fn transformer_group_shift() {
        let mut mdl = Model::new();
        let hv = mdl.add_node("HV");
        let lv = mdl.add_node("LV");
        mdl.add_branch("Src", GND, hv.into(), BranchPar::new(0.0, 0.0, 0.0).emf(100.0, 0.0, 0.0))
            .unwrap();
        mdl.add_branch(
            "T",
            hv.into(),
            lv.into(),
            BranchPar::new(0.0, 0.0, 0.0).tap(10.0, 11),
        )
        .unwrap();
        mdl.add_branch("Load", lv.into(), GND, BranchPar::new(100.0, 100.0, 100.0))
            .unwrap();
        mdl.solve().unwrap();

        let u_hv = mdl.node_voltage(hv).unwrap()[0];
        let u_lv = mdl.node_voltage(lv).unwrap()[0];
        let k1 = Complex64::from_polar(10.0, -11.0 * PI / 6.0);
        assert!((u_hv - c(100.0, 0.0)).norm() < 1e-9);
        assert!(
            (u_hv - k1 * u_lv).norm() < 1e-9,
            "group law violated: {u_hv} vs {}",
            k1 * u_lv
        );
        assert!((u_lv.norm() - 10.0).abs() < 1e-9);
    }

    /// HV source with a grounded A0 fault; the transformer's LV side only
    /// carries zero-sequence current while its neutral is grounded (`N0`).
    fn transformer_net(with_n0: bool) -> (Model, BranchId) {
        let mut mdl = Model::new();
        let hv = mdl.add_node("HV");
        let lv = mdl.add_node("LV");
        mdl.add_branch(
            "Sys",
            GND,
            hv.into(),
            BranchPar::new(j(2.0), j(2.0), j(3.0)).emf(65000.0, 0.0, 0.0),
        )
        .unwrap();
        let t = mdl
            .add_branch(
                "T1",
                hv.into(),
                lv.into(),
                BranchPar::new(j(53.0), j(53.0), j(48.0)).tap(11.0, 11),
            )
            .unwrap();
        if with_n0 {
            mdl.add_fault("neutral", lv, FaultCode::N0).unwrap();
        }
        mdl.add_fault("KZ", hv, FaultCode::A0).unwrap();
        (mdl, t)
    }

    #[test]
    fn neutral_grounding_marker_enables_zero_sequence() {
        let (mut grounded, t) = transformer_net(true);
        grounded.solve().unwrap();
        let i0 = grounded.branch_current(t).unwrap()[2];
        assert!(i0.norm() > 1.0, "no zero-sequence flow with N0: {}", i0.norm());

        let (mut isolated, t) = transformer_net(false);
        isolated.solve().unwrap();
        let i0 = isolated.branch_current(t).unwrap()[2];
        assert!(i0.norm() < 1e-5, "zero-sequence flow without N0: {}", i0.norm());
    }

    #[test]
    fn series_break_opens_one_phase() {
        let (mut mdl, _, branches) = ring();
        let l1 = branches[2];
        let brk = mdl.add_fault("Break", l1, FaultCode::A0).unwrap();
        mdl.solve().unwrap();

        // Phase A of the broken line carries no current.
        let ia = sc(mdl.branch_query(l1, "IA"));
        assert!(ia.norm() < 1e-5, "IA through break is {}", ia.norm());
        // Sound phases see no voltage break.
        let du = mdl.fault_vector(brk).unwrap();
        let du_ph = crate::basic::phasor::seq_to_phase(&du);
        assert!(du_ph[1].norm() < 1e-5);
        assert!(du_ph[2].norm() < 1e-5);
        assert!(du_ph[0].norm() > 1.0);

        assert_kvl(&mdl, 1e-5);
        assert_kcl(&mdl, 1e-5);
    }

    #[test]
    fn branch_side_queries() {
        let (mut mdl, nodes, branches) = ring();
        mdl.add_fault("KZ", nodes[2], FaultCode::A0).unwrap();
        mdl.solve().unwrap();

        let l1 = branches[2];
        // q1 side voltage is the Sys1 node voltage.
        let u_sys1 = mdl.node_voltage(nodes[0]).unwrap();
        let (u, _) = mdl.branch_side(l1, Side::Q1).unwrap();
        assert!((u - u_sys1).norm() < 1e-9);
        assert!((sc(mdl.branch_query(l1, "q1U1")) - u_sys1[0]).norm() < 1e-9);

        // Without charging, the q2-side current is the negated raw current.
        let raw = mdl.branch_current(l1).unwrap();
        let (_, i2) = mdl.branch_side(l1, Side::Q2).unwrap();
        assert!((i2 + raw).norm() < 1e-9);

        // Unknown names and bad sides are rejected.
        assert!(mdl.branch_query(l1, "q3IA").is_err());
        assert!(mdl.node_query(nodes[0], "IQ").is_err());
    }
}
