//! Solve outputs.

use crate::bridge::BridgeStats;
use crate::start::StartState;
use crate::status::{TerminationCategory, TerminationCode};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Everything a finished solve reports.
///
/// A solve that stops without an optimal point still produces `Outputs`;
/// inspect [`termination`](Self::termination) to find out why it stopped.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Outputs {
    /// Final point
    pub x: Vec<f64>,
    /// Objective value including the objective constant
    pub objective: f64,
    /// Constraint values at the final point
    pub constraints: Vec<f64>,
    /// Total (minor) iterations
    pub iterations: usize,
    /// Major iterations
    pub major_iterations: usize,
    /// Solver-measured run time in seconds
    pub run_time: f64,
    /// Number of infeasibilities
    pub ninf: usize,
    /// Sum of infeasibilities
    pub sinf: f64,
    /// Decoded termination code
    pub termination: TerminationCode,
    /// Callback counters
    pub bridge_stats: BridgeStats,
    ns: i32,
    xstate: Vec<i32>,
    xmul: Vec<f64>,
    f: Vec<f64>,
    fstate: Vec<i32>,
    fmul: Vec<f64>,
}

/// Final solver state handed back by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FinalState {
    pub ns: i32,
    pub x: Vec<f64>,
    pub xstate: Vec<i32>,
    pub xmul: Vec<f64>,
    pub f: Vec<f64>,
    pub fstate: Vec<i32>,
    pub fmul: Vec<f64>,
}

/// Iteration counters and timings from the solve report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RunSummary {
    pub iterations: usize,
    pub major_iterations: usize,
    pub run_time: f64,
    pub ninf: usize,
    pub sinf: f64,
}

impl Outputs {
    pub(crate) fn new(
        state: FinalState,
        summary: RunSummary,
        objective_add: f64,
        termination: TerminationCode,
        bridge_stats: BridgeStats,
    ) -> Self {
        let objective = state.f.first().copied().unwrap_or(0.0) + objective_add;
        let constraints = state.f.get(1..).map(<[f64]>::to_vec).unwrap_or_default();
        Self {
            x: state.x,
            objective,
            constraints,
            iterations: summary.iterations,
            major_iterations: summary.major_iterations,
            run_time: summary.run_time,
            ninf: summary.ninf,
            sinf: summary.sinf,
            termination,
            bridge_stats,
            ns: state.ns,
            xstate: state.xstate,
            xmul: state.xmul,
            f: state.f,
            fstate: state.fstate,
            fmul: state.fmul,
        }
    }

    /// Termination category.
    pub fn category(&self) -> TerminationCategory {
        self.termination.category
    }

    /// True when the solver reported an optimal point.
    pub fn is_optimal(&self) -> bool {
        self.termination.is_optimal()
    }

    /// Final function values `[f; g]` as the solver left them.
    pub fn function_values(&self) -> &[f64] {
        &self.f
    }

    /// Final variable states.
    pub fn xstate(&self) -> &[i32] {
        &self.xstate
    }

    /// Final function states.
    pub fn fstate(&self) -> &[i32] {
        &self.fstate
    }

    /// Variable multipliers.
    pub fn xmul(&self) -> &[f64] {
        &self.xmul
    }

    /// Function multipliers.
    pub fn fmul(&self) -> &[f64] {
        &self.fmul
    }

    /// Final superbasic count.
    pub fn ns(&self) -> i32 {
        self.ns
    }

    /// Snapshot to warm start the next solve of the same structure.
    pub fn warm_start(&self) -> StartState {
        StartState::warm(
            self.ns,
            self.x.clone(),
            self.xstate.clone(),
            self.xmul.clone(),
            self.f.clone(),
            self.fstate.clone(),
            self.fmul.clone(),
        )
    }
}
