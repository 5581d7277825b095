//! Network entities: nodes, branches, zero-sequence mutuals and faults.
//!
//! Entities live in per-type arenas owned by the [`Model`](super::model::Model)
//! and refer to each other only through stable 1-based ids, so the cyclic
//! node↔branch↔fault references of the physical description never become
//! ownership cycles. Ground is the reserved sentinel terminal, not a node.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use derive_more::{Display, From, Into};
use nalgebra::Vector3;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::error::Error;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
    Into,
)]
#[display("{_0}")]
pub struct NodeId(pub usize);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
    Into,
)]
#[display("{_0}")]
pub struct BranchId(pub usize);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
    Into,
)]
#[display("{_0}")]
pub struct MutualId(pub usize);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
    Into,
)]
#[display("{_0}")]
pub struct FaultId(pub usize);

/// A branch endpoint: a node of the same model or the ground reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminal {
    Ground,
    Node(NodeId),
}

/// Ground endpoint, written `0` in the classical description.
pub const GND: Terminal = Terminal::Ground;

impl Terminal {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Terminal::Ground => None,
            Terminal::Node(q) => Some(q),
        }
    }

    pub fn is_ground(self) -> bool {
        matches!(self, Terminal::Ground)
    }
}

impl From<NodeId> for Terminal {
    fn from(q: NodeId) -> Self {
        Terminal::Node(q)
    }
}

/// Only `0` denotes ground; every other raw integer is a value error
/// (node endpoints must be passed as [`NodeId`]).
impl TryFrom<usize> for Terminal {
    type Error = Error;

    fn try_from(raw: usize) -> Result<Self, Error> {
        if raw == 0 {
            Ok(Terminal::Ground)
        } else {
            Err(Error::Value(format!(
                "ground endpoint must be written 0, got {raw}"
            )))
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Ground => write!(f, "0"),
            Terminal::Node(q) => write!(f, "{q}"),
        }
    }
}

/// Ideal transformer ratio `k` and vector group `g` (multiples of 30°).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tap {
    pub ratio: f64,
    pub group: u8,
}

impl Default for Tap {
    fn default() -> Self {
        Tap {
            ratio: 1.0,
            group: 0,
        }
    }
}

impl Tap {
    pub fn new(ratio: f64, group: u8) -> Self {
        Tap { ratio, group }
    }

    pub fn is_unity(&self) -> bool {
        self.ratio == 1.0 && self.group == 0
    }

    /// Per-sequence voltage-transfer factors `(K1, K2, K0)`.
    ///
    /// `K1 = k·exp(-j·g·π/6)`; the negative sequence is its conjugate for
    /// odd groups, and the zero sequence follows the positive one.
    pub fn factors(&self) -> [Complex64; 3] {
        let k1 = Complex64::from_polar(self.ratio, -(self.group as f64) * PI / 6.0);
        let k2 = if self.group % 2 == 0 { k1 } else { k1.conj() };
        [k1, k2, k1]
    }
}

/// Short-circuit / break codes. `A`, `B`, `C` name the affected phases,
/// a trailing `0` a ground tie, a trailing `r` a transition resistance.
/// `N0` marks a permanent zero-sequence condition: neutral grounding at a
/// node, an isolated zero-sequence link on a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum FaultCode {
    A0,
    B0,
    C0,
    A0r,
    B0r,
    C0r,
    AB,
    BC,
    CA,
    ABr,
    BCr,
    CAr,
    AB0,
    BC0,
    CA0,
    ABC,
    ABC0,
    N0,
}

impl FaultCode {
    pub const ALL: [FaultCode; 18] = [
        FaultCode::A0,
        FaultCode::B0,
        FaultCode::C0,
        FaultCode::A0r,
        FaultCode::B0r,
        FaultCode::C0r,
        FaultCode::AB,
        FaultCode::BC,
        FaultCode::CA,
        FaultCode::ABr,
        FaultCode::BCr,
        FaultCode::CAr,
        FaultCode::AB0,
        FaultCode::BC0,
        FaultCode::CA0,
        FaultCode::ABC,
        FaultCode::ABC0,
        FaultCode::N0,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::A0 => "A0",
            FaultCode::B0 => "B0",
            FaultCode::C0 => "C0",
            FaultCode::A0r => "A0r",
            FaultCode::B0r => "B0r",
            FaultCode::C0r => "C0r",
            FaultCode::AB => "AB",
            FaultCode::BC => "BC",
            FaultCode::CA => "CA",
            FaultCode::ABr => "ABr",
            FaultCode::BCr => "BCr",
            FaultCode::CAr => "CAr",
            FaultCode::AB0 => "AB0",
            FaultCode::BC0 => "BC0",
            FaultCode::CA0 => "CA0",
            FaultCode::ABC => "ABC",
            FaultCode::ABC0 => "ABC0",
            FaultCode::N0 => "N0",
        }
    }

    /// Codes meaningful as a series break on a branch.
    pub fn series_capable(self) -> bool {
        matches!(
            self,
            FaultCode::A0
                | FaultCode::B0
                | FaultCode::C0
                | FaultCode::AB
                | FaultCode::BC
                | FaultCode::CA
                | FaultCode::ABC
                | FaultCode::N0
        )
    }

    /// Whether the shunt form ties the fault point to ground.
    pub fn grounded(self) -> bool {
        !matches!(
            self,
            FaultCode::AB | FaultCode::BC | FaultCode::CA | FaultCode::ABr | FaultCode::BCr | FaultCode::CAr | FaultCode::ABC
        )
    }

    /// Whether the boundary conditions use the transition resistance.
    pub fn uses_resistance(self) -> bool {
        matches!(
            self,
            FaultCode::A0r
                | FaultCode::B0r
                | FaultCode::C0r
                | FaultCode::ABr
                | FaultCode::BCr
                | FaultCode::CAr
        )
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        FaultCode::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::Value(format!("unknown fault code '{s}'")))
    }
}

/// Attachment point of a fault: shunt at a node or series break on a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultTarget {
    Node(NodeId),
    Branch(BranchId),
}

impl From<NodeId> for FaultTarget {
    fn from(q: NodeId) -> Self {
        FaultTarget::Node(q)
    }
}

impl From<BranchId> for FaultTarget {
    fn from(p: BranchId) -> Self {
        FaultTarget::Branch(p)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub desc: String,
    pub(crate) branches: Vec<BranchId>,
    pub(crate) fault: Option<FaultId>,
}

impl Node {
    /// Branches incident to this node, in attachment order.
    pub fn branches(&self) -> &[BranchId] {
        &self.branches
    }

    pub fn fault(&self) -> Option<FaultId> {
        self.fault
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node {:>3} {:<14} {}", self.id, self.name, self.desc)
    }
}

/// Declarative branch parameters: series sequence impedances, internal EMFs,
/// ideal transformer ratio/group and total line-charging susceptances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchPar {
    pub z: Vector3<Complex64>,
    pub e: Vector3<Complex64>,
    pub t: Tap,
    pub b: Vector3<Complex64>,
}

impl BranchPar {
    pub fn new(
        z1: impl Into<Complex64>,
        z2: impl Into<Complex64>,
        z0: impl Into<Complex64>,
    ) -> Self {
        BranchPar {
            z: Vector3::new(z1.into(), z2.into(), z0.into()),
            e: Vector3::zeros(),
            t: Tap::default(),
            b: Vector3::zeros(),
        }
    }

    /// Internal phase-to-neutral EMFs, zero for passive branches.
    pub fn emf(
        mut self,
        e1: impl Into<Complex64>,
        e2: impl Into<Complex64>,
        e0: impl Into<Complex64>,
    ) -> Self {
        self.e = Vector3::new(e1.into(), e2.into(), e0.into());
        self
    }

    pub fn tap(mut self, ratio: f64, group: u8) -> Self {
        self.t = Tap::new(ratio, group);
        self
    }

    /// Total line-charging susceptances; the π-model places `B/2` at each end.
    pub fn shunt(
        mut self,
        b1: impl Into<Complex64>,
        b2: impl Into<Complex64>,
        b0: impl Into<Complex64>,
    ) -> Self {
        self.b = Vector3::new(b1.into(), b2.into(), b0.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub desc: String,
    pub q1: Terminal,
    pub q2: Terminal,
    pub z: Vector3<Complex64>,
    pub e: Vector3<Complex64>,
    pub t: Tap,
    pub b: Vector3<Complex64>,
    pub(crate) mutuals: Vec<MutualId>,
    pub(crate) fault: Option<FaultId>,
}

impl Branch {
    pub fn mutuals(&self) -> &[MutualId] {
        &self.mutuals
    }

    pub fn fault(&self) -> Option<FaultId> {
        self.fault
    }

    /// Whether the given node is one of the endpoints.
    pub fn touches(&self, q: NodeId) -> bool {
        self.q1 == Terminal::Node(q) || self.q2 == Terminal::Node(q)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Branch {:>3} {:<14} {} <=> {}  Z=({}, {}, {})",
            self.id, self.name, self.q1, self.q2, self.z[0], self.z[1], self.z[2]
        )?;
        if self.e != Vector3::zeros() {
            write!(f, "  E=({}, {}, {})", self.e[0], self.e[1], self.e[2])?;
        }
        if !self.t.is_unity() {
            write!(f, "  T=({}, {})", self.t.ratio, self.t.group)?;
        }
        if self.b != Vector3::zeros() {
            write!(f, "  B=({}, {}, {})", self.b[0], self.b[1], self.b[2])?;
        }
        Ok(())
    }
}

/// Zero-sequence mutual coupling between two distinct branches.
/// `m12` is the effect of `p2`'s zero-sequence current on `p1`'s voltage
/// drop, `m21` the reverse; positive/negative sequences are uncoupled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mutual {
    pub id: MutualId,
    pub name: String,
    pub desc: String,
    pub p1: BranchId,
    pub p2: BranchId,
    pub m12: Complex64,
    pub m21: Complex64,
}

impl fmt::Display for Mutual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Mutual {:>3} {:<14} {} <=> {}  M12={}  M21={}",
            self.id, self.name, self.p1, self.p2, self.m12, self.m21
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    pub id: FaultId,
    pub name: String,
    pub desc: String,
    pub target: FaultTarget,
    pub code: FaultCode,
    /// Transition resistance in Ω, used by the `..r` codes.
    pub r: f64,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            FaultTarget::Node(q) => write!(
                f,
                "Fault {:>3} {:<14} {} (r={}) at node {}",
                self.id, self.name, self.code, self.r, q
            ),
            FaultTarget::Branch(p) => write!(
                f,
                "Break {:>3} {:<14} {} on branch {}",
                self.id, self.name, self.code, p
            ),
        }
    }
}
