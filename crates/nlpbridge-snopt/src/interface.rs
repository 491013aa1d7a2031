//! The foreign-solver boundary.
//!
//! [`SnoptInterface`] mirrors the SNOPT C calling convention: stream setup,
//! memory sizing, typed option setters and one blocking solve that calls
//! back into user code. A native binding implements this trait; so does
//! [`ReferenceSolver`](crate::reference::ReferenceSolver).
//!
//! Everything that crosses the boundary is owned by the adapter and lent to
//! the solver for the duration of one call.

use crate::error::Result;
use crate::start::StartMode;
use crate::workspace::Workspace;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Magnitude treated as infinite by the solver.
pub const INFINITE_BOUND: f64 = 1.0e20;

/// Memory-sizing inform value meaning the estimate is valid.
pub const MEMORY_OK: i32 = 104;

/// Default print channel.
pub const DEFAULT_PRINT_UNIT: i32 = 18;

/// Default summary channel.
pub const DEFAULT_SUMMARY_UNIT: i32 = 19;

/// Print and summary stream configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StreamConfig {
    /// Channel number of the print stream
    pub print_unit: i32,
    /// Channel number of the summary stream
    pub summary_unit: i32,
    /// Print file; `None` keeps the stream closed
    pub print_file: Option<PathBuf>,
    /// Summary file; `None` keeps the stream closed
    pub summary_file: Option<PathBuf>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            print_unit: DEFAULT_PRINT_UNIT,
            summary_unit: DEFAULT_SUMMARY_UNIT,
            print_file: None,
            summary_file: None,
        }
    }
}

impl StreamConfig {
    /// Creates a configuration with default channels and no files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the print channel.
    pub fn with_print_unit(mut self, unit: i32) -> Self {
        self.print_unit = unit;
        self
    }

    /// Sets the summary channel.
    pub fn with_summary_unit(mut self, unit: i32) -> Self {
        self.summary_unit = unit;
        self
    }

    /// Sends print output to a file.
    pub fn with_print_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.print_file = Some(path.into());
        self
    }

    /// Sends summary output to a file.
    pub fn with_summary_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.summary_file = Some(path.into());
        self
    }
}

/// Problem sizes passed to the memory-sizing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequest {
    /// Number of problem functions (objective included)
    pub nf: usize,
    /// Number of variables
    pub n: usize,
    /// Number of variable names (1 means none)
    pub nxname: usize,
    /// Number of function names (1 means none)
    pub nfname: usize,
    /// Linear nonzeros
    pub nea: usize,
    /// Nonlinear derivative nonzeros
    pub neg: usize,
}

/// Result of the memory-sizing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryEstimate {
    /// [`MEMORY_OK`] when the estimate is valid
    pub inform: i32,
    /// Required character length, in 8-byte units
    pub mincw: usize,
    /// Required integer length
    pub miniw: usize,
    /// Required real length
    pub minrw: usize,
}

impl MemoryEstimate {
    /// True when the query succeeded and every minimum is non-zero.
    pub fn is_usable(&self) -> bool {
        self.inform == MEMORY_OK && self.mincw > 0 && self.miniw > 0 && self.minrw > 0
    }
}

/// Arguments of the main solve.
///
/// Index arrays are 1-based, as the solver expects. `x`, the state
/// vectors and the multipliers are read as the starting state and
/// overwritten with the final state.
#[derive(Debug)]
pub struct SolveCall<'a> {
    /// Cold or warm start
    pub start: StartMode,
    /// Problem name
    pub problem_name: &'a str,
    /// Number of functions (objective included)
    pub nf: usize,
    /// Number of variables
    pub n: usize,
    /// Constant added to the objective
    pub objective_add: f64,
    /// 1-based row of the objective in `F`
    pub objective_row: usize,
    /// Linear coefficients
    pub a: &'a [f64],
    /// Linear rows
    pub i_afun: &'a [i32],
    /// Linear columns
    pub j_avar: &'a [i32],
    /// Nonlinear derivative rows
    pub i_gfun: &'a [i32],
    /// Nonlinear derivative columns
    pub j_gvar: &'a [i32],
    /// Variable lower bounds
    pub x_lower: &'a [f64],
    /// Variable upper bounds
    pub x_upper: &'a [f64],
    /// Function lower bounds
    pub f_lower: &'a [f64],
    /// Function upper bounds
    pub f_upper: &'a [f64],
    /// Variable names (empty for none)
    pub x_names: &'a [String],
    /// Function names (empty for none)
    pub f_names: &'a [String],
    /// Variables
    pub x: &'a mut [f64],
    /// Variable states
    pub xstate: &'a mut [i32],
    /// Variable multipliers
    pub xmul: &'a mut [f64],
    /// Function values
    pub f: &'a mut [f64],
    /// Function states
    pub fstate: &'a mut [i32],
    /// Function multipliers
    pub fmul: &'a mut [f64],
    /// Number of superbasic variables
    pub ns: &'a mut i32,
    /// Solver workspace
    pub workspace: &'a mut Workspace,
}

/// Arguments of one user-function callback.
///
/// `status` is 1 on the first call, 0 on ordinary calls and `>= 2` on the
/// final call. The callback sets it to `-1` when the point cannot be
/// evaluated, or to `<= -2` to stop the solve.
#[derive(Debug)]
pub struct UsrfunArgs<'a> {
    /// In/out status flag
    pub status: i32,
    /// Point requested by the solver
    pub x: &'a [f64],
    /// `> 0` when function values are wanted
    pub need_f: i32,
    /// Function values (length nF)
    pub f: &'a mut [f64],
    /// `> 0` when derivatives are wanted
    pub need_g: i32,
    /// Derivative values (length neG)
    pub g: &'a mut [f64],
}

/// What the blocking solve reports besides the overwritten state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    /// Termination code
    pub inform: i32,
    /// Minor iterations
    pub iterations: usize,
    /// Major iterations
    pub major_iterations: usize,
    /// Number of infeasibilities
    pub ninf: usize,
    /// Sum of infeasibilities
    pub sinf: f64,
    /// Required character length
    pub mincw: usize,
    /// Required integer length
    pub miniw: usize,
    /// Required real length
    pub minrw: usize,
    /// Solver-measured run time in seconds
    pub run_time: f64,
}

/// User callback handed to [`SnoptInterface::solve`].
pub type Usrfun<'f> = dyn FnMut(&mut UsrfunArgs<'_>) + 'f;

/// Calling convention of a SNOPT-style solver.
pub trait SnoptInterface {
    /// Opens the print and summary streams.
    fn open_streams(&mut self, streams: &StreamConfig) -> Result<()>;

    /// Closes the streams. Must be safe to call more than once.
    fn close_streams(&mut self);

    /// Reports the workspace lengths the solve will need.
    fn memory_requirements(
        &mut self,
        request: &MemoryRequest,
        workspace: &mut Workspace,
    ) -> MemoryEstimate;

    /// Sets a string-valued option; returns the error count.
    fn set_option_string(&mut self, key: &str, value: &str, workspace: &mut Workspace) -> usize;

    /// Sets an integer-valued option; returns the error count.
    fn set_option_int(&mut self, key: &str, value: i64, workspace: &mut Workspace) -> usize;

    /// Sets a real-valued option; returns the error count.
    fn set_option_real(&mut self, key: &str, value: f64, workspace: &mut Workspace) -> usize;

    /// Runs the solver to completion, calling `usrfun` as needed.
    fn solve(&mut self, call: SolveCall<'_>, usrfun: &mut Usrfun<'_>) -> SolveReport;
}

impl<S: SnoptInterface + ?Sized> SnoptInterface for Box<S> {
    fn open_streams(&mut self, streams: &StreamConfig) -> Result<()> {
        (**self).open_streams(streams)
    }

    fn close_streams(&mut self) {
        (**self).close_streams();
    }

    fn memory_requirements(
        &mut self,
        request: &MemoryRequest,
        workspace: &mut Workspace,
    ) -> MemoryEstimate {
        (**self).memory_requirements(request, workspace)
    }

    fn set_option_string(&mut self, key: &str, value: &str, workspace: &mut Workspace) -> usize {
        (**self).set_option_string(key, value, workspace)
    }

    fn set_option_int(&mut self, key: &str, value: i64, workspace: &mut Workspace) -> usize {
        (**self).set_option_int(key, value, workspace)
    }

    fn set_option_real(&mut self, key: &str, value: f64, workspace: &mut Workspace) -> usize {
        (**self).set_option_real(key, value, workspace)
    }

    fn solve(&mut self, call: SolveCall<'_>, usrfun: &mut Usrfun<'_>) -> SolveReport {
        (**self).solve(call, usrfun)
    }
}

impl<S: SnoptInterface + ?Sized> SnoptInterface for &mut S {
    fn open_streams(&mut self, streams: &StreamConfig) -> Result<()> {
        (**self).open_streams(streams)
    }

    fn close_streams(&mut self) {
        (**self).close_streams();
    }

    fn memory_requirements(
        &mut self,
        request: &MemoryRequest,
        workspace: &mut Workspace,
    ) -> MemoryEstimate {
        (**self).memory_requirements(request, workspace)
    }

    fn set_option_string(&mut self, key: &str, value: &str, workspace: &mut Workspace) -> usize {
        (**self).set_option_string(key, value, workspace)
    }

    fn set_option_int(&mut self, key: &str, value: i64, workspace: &mut Workspace) -> usize {
        (**self).set_option_int(key, value, workspace)
    }

    fn set_option_real(&mut self, key: &str, value: f64, workspace: &mut Workspace) -> usize {
        (**self).set_option_real(key, value, workspace)
    }

    fn solve(&mut self, call: SolveCall<'_>, usrfun: &mut Usrfun<'_>) -> SolveReport {
        (**self).solve(call, usrfun)
    }
}

/// Maps an API bound to the solver's finite representation.
pub fn to_solver_bound(value: f64) -> f64 {
    value.clamp(-INFINITE_BOUND, INFINITE_BOUND)
}

/// Maps a solver bound back to `±f64::INFINITY` when at the limit.
pub fn from_solver_bound(value: f64) -> f64 {
    if value >= INFINITE_BOUND {
        f64::INFINITY
    } else if value <= -INFINITE_BOUND {
        f64::NEG_INFINITY
    } else {
        value
    }
}
