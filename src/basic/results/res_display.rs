//! Human-readable result tables.

use std::fmt;

use nalgebra::Vector3;
use num_complex::Complex64;
use tabled::{settings::Style, Table, Tabled};

use super::super::elements::{FaultId, FaultTarget};
use super::super::error::Result;
use super::super::model::Model;
use super::super::phasor::seq_to_phase;
use super::Side;

/// A phasor cell rendered as `magnitude < angle°`.
#[derive(Clone, Copy)]
struct Polar(Complex64);

impl fmt::Display for Polar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0} < {:.1}", self.0.norm(), self.0.arg().to_degrees())
    }
}

#[derive(Tabled)]
struct SeqPhaseRow {
    #[tabled(rename = "entity")]
    entity: String,
    #[tabled(rename = "X1")]
    x1: Polar,
    #[tabled(rename = "X2")]
    x2: Polar,
    #[tabled(rename = "3X0")]
    x0_3: Polar,
    #[tabled(rename = "XA")]
    xa: Polar,
    #[tabled(rename = "XB")]
    xb: Polar,
    #[tabled(rename = "XC")]
    xc: Polar,
}

impl SeqPhaseRow {
    fn new(entity: String, x: &Vector3<Complex64>) -> Self {
        let ph = seq_to_phase(x);
        SeqPhaseRow {
            entity,
            x1: Polar(x[0]),
            x2: Polar(x[1]),
            x0_3: Polar(3.0 * x[2]),
            xa: Polar(ph[0]),
            xb: Polar(ph[1]),
            xc: Polar(ph[2]),
        }
    }
}

fn markdown(rows: Vec<SeqPhaseRow>) -> String {
    Table::new(rows).with(Style::markdown()).to_string()
}

impl Model {
    /// Sequence and phase voltages of every node, one table row each.
    pub fn node_voltage_table(&self) -> Result<String> {
        let mut rows = Vec::new();
        for q in self.nodes() {
            let u = self.node_voltage(q.id)?;
            rows.push(SeqPhaseRow::new(format!("{} {}", q.id, q.name), &u));
        }
        Ok(markdown(rows))
    }

    /// Branch currents as measured from the given side.
    pub fn branch_flow_table(&self, side: Side) -> Result<String> {
        let mut rows = Vec::new();
        for p in self.branches() {
            let (_, i) = self.branch_side(p.id, side)?;
            rows.push(SeqPhaseRow::new(format!("{} {}", p.id, p.name), &i));
        }
        Ok(markdown(rows))
    }

    /// Voltages, total fault current and per-branch current contributions
    /// at a shunt fault; break voltages and through current for a series
    /// break.
    pub fn fault_report(&self, n: FaultId) -> Result<String> {
        let f = self.fault(n)?;
        let mut out = format!("Fault {} - {} - {}\n", f.id, f.name, f.code);
        match f.target {
            FaultTarget::Node(q) => {
                let node = self.node(q)?;
                out += &format!("at node {} - {}\n", node.id, node.name);
                let u = self.node_voltage(q)?;
                out += &markdown(vec![SeqPhaseRow::new("U".into(), &u)]);
                out += "\n";
                let i = self.fault_vector(n)?;
                out += &markdown(vec![SeqPhaseRow::new("I".into(), &i)]);
                out += "\nbranch contributions\n";
                let mut rows = Vec::new();
                for (pid, i) in self.fault_contributions(n)? {
                    let br = self.branch(pid)?;
                    rows.push(SeqPhaseRow::new(format!("{} {}", br.id, br.name), &i));
                }
                out += &markdown(rows);
            }
            FaultTarget::Branch(p) => {
                let br = self.branch(p)?;
                out += &format!("on branch {} - {}\n", br.id, br.name);
                let du = self.fault_vector(n)?;
                out += &markdown(vec![SeqPhaseRow::new("dU".into(), &du)]);
                out += "\n";
                let i = self.branch_current(p)?;
                out += &markdown(vec![SeqPhaseRow::new("I".into(), &i)]);
            }
        }
        Ok(out)
    }

    pub fn print_node_voltages(&self) -> Result<()> {
        println!("{}", self.node_voltage_table()?);
        Ok(())
    }

    pub fn print_branch_flows(&self, side: Side) -> Result<()> {
        println!("{}", self.branch_flow_table(side)?);
        Ok(())
    }

    pub fn print_fault_report(&self, n: FaultId) -> Result<()> {
        println!("{}", self.fault_report(n)?);
        Ok(())
    }
}
