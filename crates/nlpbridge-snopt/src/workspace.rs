//! Growable solver workspace.
//!
//! SNOPT-style solvers keep all internal state in three caller-provided
//! arrays: character (`cw`, 8-byte units), integer (`iw`) and real (`rw`).
//! The adapter owns them for one solve, sizes them from a heuristic, then
//! grows them to whatever the memory-sizing query reports.

use crate::interface::MemoryEstimate;
use nlpbridge_core::types::Dimensions;

/// Bytes per character-workspace unit.
pub const CHARACTER_UNIT: usize = 8;

/// Smallest length of any region, in units.
pub const MIN_LENGTH: usize = 500;

/// Default per-row multiplier for the initial integer and real lengths.
pub const DEFAULT_BASE_LENGTH: usize = 500;

/// One of the three workspace regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Character workspace
    Character,
    /// Integer workspace
    Integer,
    /// Real workspace
    Real,
}

impl Region {
    /// Option key used to register the region length.
    pub fn option_key(self) -> &'static str {
        match self {
            Self::Character => "Total character workspace",
            Self::Integer => "Total integer workspace",
            Self::Real => "Total real workspace",
        }
    }
}

/// Character, integer and real scratch owned by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    cw: Vec<u8>,
    iw: Vec<i32>,
    rw: Vec<f64>,
    reported: Option<(usize, usize, usize)>,
}

impl Workspace {
    /// Creates a workspace with explicit lengths, each raised to the floor.
    pub fn with_lengths(lencw: usize, leniw: usize, lenrw: usize) -> Self {
        Self {
            cw: vec![b' '; lencw.max(MIN_LENGTH) * CHARACTER_UNIT],
            iw: vec![0; leniw.max(MIN_LENGTH)],
            rw: vec![0.0; lenrw.max(MIN_LENGTH)],
            reported: None,
        }
    }

    /// Creates a workspace without applying the floor.
    ///
    /// Used to exercise the solver's storage checks.
    pub fn unchecked(lencw: usize, leniw: usize, lenrw: usize) -> Self {
        Self {
            cw: vec![b' '; lencw * CHARACTER_UNIT],
            iw: vec![0; leniw],
            rw: vec![0.0; lenrw],
            reported: None,
        }
    }

    /// Initial sizing: `500` character units, `base_length · (nx + nf)`
    /// integer and real entries.
    pub fn for_problem(dims: Dimensions, base_length: usize) -> Self {
        let rows = dims.nx + dims.nf();
        let len = base_length.saturating_mul(rows);
        Self::with_lengths(MIN_LENGTH, len, len)
    }

    /// Character length in units.
    pub fn lencw(&self) -> usize {
        self.cw.len() / CHARACTER_UNIT
    }

    /// Integer length.
    pub fn leniw(&self) -> usize {
        self.iw.len()
    }

    /// Real length.
    pub fn lenrw(&self) -> usize {
        self.rw.len()
    }

    /// Length of one region.
    pub fn length(&self, region: Region) -> usize {
        match region {
            Region::Character => self.lencw(),
            Region::Integer => self.leniw(),
            Region::Real => self.lenrw(),
        }
    }

    /// Minimums from the last memory-sizing query, if any.
    pub fn reported_minimums(&self) -> Option<(usize, usize, usize)> {
        self.reported
    }

    /// Grows each region to the reported minimum when it is short.
    ///
    /// Never shrinks. Returns the regions that grew.
    pub fn grow_to(&mut self, estimate: &MemoryEstimate) -> Vec<Region> {
        self.reported = Some((estimate.mincw, estimate.miniw, estimate.minrw));

        let mut grown = Vec::new();
        if estimate.mincw > self.lencw() {
            self.cw.resize(estimate.mincw * CHARACTER_UNIT, b' ');
            grown.push(Region::Character);
        }
        if estimate.miniw > self.leniw() {
            self.iw.resize(estimate.miniw, 0);
            grown.push(Region::Integer);
        }
        if estimate.minrw > self.lenrw() {
            self.rw.resize(estimate.minrw, 0.0);
            grown.push(Region::Real);
        }
        grown
    }

    /// Character region, for the solver side of the boundary.
    pub fn cw_mut(&mut self) -> &mut [u8] {
        &mut self.cw
    }

    /// Integer region, for the solver side of the boundary.
    pub fn iw_mut(&mut self) -> &mut [i32] {
        &mut self.iw
    }

    /// Real region, for the solver side of the boundary.
    pub fn rw_mut(&mut self) -> &mut [f64] {
        &mut self.rw
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.cw.len()
            + self.iw.len() * std::mem::size_of::<i32>()
            + self.rw.len() * std::mem::size_of::<f64>()
    }
}
