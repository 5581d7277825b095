//! Assembly of the sparse complex system `LHS·X = RHS`.
//!
//! Unknown layout: branch sequence currents, then node sequence voltages,
//! then one auxiliary triple per fault (fault current for shunt faults,
//! voltage break for series breaks). Triples are pushed in coordinate form;
//! the COO→CSC conversion sums duplicates, so each physical contribution is
//! pushed independently.
//!
//! Baseline equations:
//! - branch rows (KVL): `Z_s·I_p,s − U_q1,s + K_s·U_q2,s = E_s`,
//! - node rows (KCL): `−Σ I(q=q1) + Σ K_s·I(q=q2) − Y_q,s·U_q,s − I_fault,s = 0`
//!   with `Y_q,s = Σ B_s/2` over incident ends,
//! - zero-sequence mutual terms between coupled branch rows.
//!
//! Fault blocks append the classical phase-domain boundary conditions,
//! rewritten over sequence unknowns via the transform rows `V_A/V_B/V_C`.

use nalgebra::DVector;
use nalgebra_sparse::CooMatrix;
use num_complex::Complex64;
use num_traits::Zero;

use super::elements::{FaultCode, FaultTarget, Terminal};
use super::error::{Error, Result};
use super::model::Model;
use super::phasor::{ONE, V_A, V_B, V_C};

/// Builds the coordinate-form system for the model's current state.
pub(crate) fn assemble(m: &Model) -> Result<(CooMatrix<Complex64>, DVector<Complex64>)> {
    let n = m.dim();
    let mut lhs = CooMatrix::new(n, n);
    let mut rhs = DVector::zeros(n);
    // Accumulated π-model end shunts per node and sequence.
    let mut y_shunt = vec![Complex64::zero(); 3 * m.n_nodes()];

    for p in m.branches() {
        let pid = m.branch_offset(p.id);
        let k = p.t.factors();

        for s in 0..3 {
            lhs.push(pid + s, pid + s, p.z[s]);
            rhs[pid + s] = p.e[s];
        }
        if let Terminal::Node(q) = p.q1 {
            let qid = m.node_offset(q);
            for s in 0..3 {
                lhs.push(pid + s, qid + s, -ONE);
                lhs.push(qid + s, pid + s, -ONE);
                y_shunt[3 * (q.0 - 1) + s] += p.b[s] / 2.0;
            }
        }
        if let Terminal::Node(q) = p.q2 {
            let qid = m.node_offset(q);
            for s in 0..3 {
                lhs.push(pid + s, qid + s, k[s]);
                lhs.push(qid + s, pid + s, k[s]);
                y_shunt[3 * (q.0 - 1) + s] += p.b[s] / 2.0;
            }
        }
    }

    for mu in m.mutuals() {
        let p1z = m.branch_offset(mu.p1) + 2;
        let p2z = m.branch_offset(mu.p2) + 2;
        lhs.push(p1z, p2z, mu.m12);
        lhs.push(p2z, p1z, mu.m21);
    }

    for q in m.nodes() {
        let qid = m.node_offset(q.id);
        for s in 0..3 {
            lhs.push(qid + s, qid + s, -y_shunt[3 * (q.id.0 - 1) + s]);
        }
    }

    for f in m.faults() {
        let nid = m.fault_offset(f.id);
        match f.target {
            FaultTarget::Node(q) => {
                let qid = m.node_offset(m.node(q)?.id);
                shunt_fault_block(&mut lhs, nid, qid, f.code, f.r)?;
            }
            FaultTarget::Branch(p) => {
                let pid = m.branch_offset(m.branch(p)?.id);
                series_break_block(&mut lhs, nid, pid, f.code)?;
            }
        }
    }

    Ok((lhs, rhs))
}

/// Pushes `v · (x_c, x_c+1, x_c+2)` as one equation row.
fn push_row(lhs: &mut CooMatrix<Complex64>, row: usize, col: usize, v: &[Complex64; 3]) {
    for s in 0..3 {
        lhs.push(row, col + s, v[s]);
    }
}

/// Boundary block of a shunt fault at a node: the fault current triple is
/// injected into the node's KCL rows, then three conditions over the node
/// voltage (columns `qid`) and the fault current (columns `nid`).
fn shunt_fault_block(
    lhs: &mut CooMatrix<Complex64>,
    nid: usize,
    qid: usize,
    code: FaultCode,
    r: f64,
) -> Result<()> {
    use FaultCode::*;

    for s in 0..3 {
        lhs.push(qid + s, nid + s, -ONE);
    }

    match code {
        // One phase to ground: U_f = r·I_f, other phase currents zero.
        A0 | B0 | C0 | A0r | B0r | C0r => {
            let (vu, vi1, vi2) = match code {
                A0 | A0r => (V_A, V_B, V_C),
                B0 | B0r => (V_B, V_C, V_A),
                _ => (V_C, V_A, V_B),
            };
            push_row(lhs, nid, qid, &vu);
            push_row(lhs, nid + 1, nid, &vi1);
            push_row(lhs, nid + 2, nid, &vi2);
            if code.uses_resistance() {
                push_row(lhs, nid, nid, &vu.map(|v| -r * v));
            }
        }
        // Phase-to-phase: equal fault-phase voltages, opposing currents,
        // sound phase current zero. Zero-sequence terms of the voltage
        // difference cancel, and the current rows rely on `i0 = 0` below.
        AB | BC | CA | ABr | BCr | CAr => {
            let (vx, vy) = match code {
                AB | ABr => (V_A, V_B),
                BC | BCr => (V_B, V_C),
                _ => (V_C, V_A),
            };
            lhs.push(nid, qid, vx[0] - vy[0]);
            lhs.push(nid, qid + 1, vx[1] - vy[1]);
            lhs.push(nid + 1, nid, vx[0] + vy[0]);
            lhs.push(nid + 1, nid + 1, vx[1] + vy[1]);
            lhs.push(nid + 2, nid + 2, ONE);
            if code.uses_resistance() {
                lhs.push(nid, nid, -r * vx[0]);
                lhs.push(nid, nid + 1, -r * vx[1]);
            }
        }
        // Two phases to ground: both voltages zero, sound current zero.
        AB0 | BC0 | CA0 => {
            let (vu1, vu2, vi) = match code {
                AB0 => (V_A, V_B, V_C),
                BC0 => (V_B, V_C, V_A),
                _ => (V_C, V_A, V_B),
            };
            push_row(lhs, nid, qid, &vu1);
            push_row(lhs, nid + 1, qid, &vu2);
            push_row(lhs, nid + 2, nid, &vi);
        }
        // Symmetric fault clear of ground: positive/negative voltage
        // collapse, no zero-sequence path.
        ABC => {
            lhs.push(nid, qid, ONE);
            lhs.push(nid + 1, qid + 1, ONE);
            lhs.push(nid + 2, nid + 2, ONE);
        }
        ABC0 => {
            lhs.push(nid, qid, ONE);
            lhs.push(nid + 1, qid + 1, ONE);
            lhs.push(nid + 2, qid + 2, ONE);
        }
        // Permanent neutral grounding: a zero-sequence-only tie.
        N0 => {
            lhs.push(nid, nid, ONE);
            lhs.push(nid + 1, nid + 1, ONE);
            lhs.push(nid + 2, qid + 2, ONE);
        }
    }
    Ok(())
}

/// Boundary block of a series break on a branch: the voltage-break triple
/// is inserted into the branch's KVL rows, then three conditions over the
/// branch current (columns `pid`) and the break voltage (columns `nid`).
fn series_break_block(
    lhs: &mut CooMatrix<Complex64>,
    nid: usize,
    pid: usize,
    code: FaultCode,
) -> Result<()> {
    use FaultCode::*;

    for s in 0..3 {
        lhs.push(pid + s, nid + s, ONE);
    }

    match code {
        // One phase open: its current zero, sound-phase breaks zero.
        A0 | B0 | C0 => {
            let (vi, vu1, vu2) = match code {
                A0 => (V_A, V_B, V_C),
                B0 => (V_B, V_C, V_A),
                _ => (V_C, V_A, V_B),
            };
            push_row(lhs, nid, pid, &vi);
            push_row(lhs, nid + 1, nid, &vu1);
            push_row(lhs, nid + 2, nid, &vu2);
        }
        // Two phases open.
        AB | BC | CA => {
            let (vi1, vi2, vu) = match code {
                AB => (V_A, V_B, V_C),
                BC => (V_B, V_C, V_A),
                _ => (V_C, V_A, V_B),
            };
            push_row(lhs, nid, pid, &vi1);
            push_row(lhs, nid + 1, pid, &vi2);
            push_row(lhs, nid + 2, nid, &vu);
        }
        // Full open circuit.
        ABC => {
            lhs.push(nid, pid, ONE);
            lhs.push(nid + 1, pid + 1, ONE);
            lhs.push(nid + 2, pid + 2, ONE);
        }
        // Isolated zero-sequence link.
        N0 => {
            lhs.push(nid, nid, ONE);
            lhs.push(nid + 1, nid + 1, ONE);
            lhs.push(nid + 2, pid + 2, ONE);
        }
        other => {
            return Err(Error::Value(format!(
                "code {other} is not a series-break condition"
            )));
        }
    }
    Ok(())
}
