//! Single-phase-to-ground fault on a four-node ring fed by two systems.
//!
//! Run with `cargo run --example ring_fault`.

use num_complex::Complex64;
use rustfault::prelude::*;

fn j(x: f64) -> Complex64 {
    Complex64::new(0.0, x)
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let mut mdl = Model::with_desc("two systems feeding a four-node ring");
    let sys1 = mdl.add_node("Sys1");
    let sys2 = mdl.add_node("Sys2");
    let ps1 = mdl.add_node("PS1");
    let ps2 = mdl.add_node("PS2");

    mdl.add_branch(
        "Sys1",
        GND,
        sys1.into(),
        BranchPar::new(j(2.0), j(2.0), j(3.0)).emf(65000.0, 0.0, 0.0),
    )?;
    mdl.add_branch(
        "Sys2",
        GND,
        sys2.into(),
        BranchPar::new(j(2.0), j(2.0), j(3.0)).emf(65000.0, 0.0, 0.0),
    )?;

    let line = || BranchPar::new(j(10.0), j(10.0), j(30.0));
    let l1 = mdl.add_branch("Sys1-PS1", sys1.into(), ps1.into(), line())?;
    let l2 = mdl.add_branch("Sys1-PS2", sys1.into(), ps2.into(), line())?;
    let l3 = mdl.add_branch("Sys2-PS1", sys2.into(), ps1.into(), line())?;
    let l4 = mdl.add_branch("Sys2-PS2", sys2.into(), ps2.into(), line())?;
    mdl.add_mutual("L1-L2", l1, l2, j(15.0), j(15.0))?;
    mdl.add_mutual("L3-L4", l3, l4, j(15.0), j(15.0))?;

    let stub = || BranchPar::new(500.0, j(200.0), j(30.0));
    mdl.add_branch("PS1", GND, ps1.into(), stub())?;
    mdl.add_branch("PS2", GND, ps2.into(), stub())?;

    println!("{mdl}");
    for finding in mdl.test_for_singularity() {
        println!("warning: {finding}");
    }

    let kz = mdl.add_fault("KZ", ps1, FaultCode::A0)?;
    mdl.solve()?;

    mdl.print_fault_report(kz)?;
    println!("node voltages");
    mdl.print_node_voltages()?;
    println!("branch currents seen from q1");
    mdl.print_branch_flows(Side::Q1)?;

    if let Formed::Text(line) = mdl.fault_query_fmt(kz, "IA", Form::PolarText)? {
        println!("{line}");
    }
    Ok(())
}
