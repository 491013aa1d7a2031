//! The SNOPT adapter.
//!
//! One solve runs as a fixed sequence: validate the inputs, open the
//! streams, allocate the workspace, register options, negotiate memory,
//! re-register the workspace sizes, run the blocking solve through a
//! [`CallbackBridge`], and package [`Outputs`]. Streams are closed on every
//! exit path.

use crate::bridge::CallbackBridge;
use crate::error::{to_solver_int, Result};
use crate::interface::{
    to_solver_bound, MemoryRequest, SnoptInterface, SolveCall, StreamConfig, UsrfunArgs,
    INFINITE_BOUND,
};
use crate::options::{OptionRegistry, OptionValue};
use crate::solution::{FinalState, Outputs, RunSummary};
use crate::start::StartState;
use crate::status::TerminationCode;
use crate::workspace::{Region, Workspace, DEFAULT_BASE_LENGTH};
use nlpbridge_core::{
    cache::{build_cache, DerivativeCache, DifferentiationMethod},
    function::NlpFunction,
    sparsity::SparsityPattern,
    types::Bounds,
    NlpError,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Adapter settings that are not solver options.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnoptSettings {
    /// Per-row multiplier for the initial integer and real workspace
    pub base_length: usize,
    /// Print and summary streams
    pub streams: StreamConfig,
    /// Problem name handed to the solver
    pub problem_name: String,
}

impl Default for SnoptSettings {
    fn default() -> Self {
        Self {
            base_length: DEFAULT_BASE_LENGTH,
            streams: StreamConfig::default(),
            problem_name: "nlpbridge".to_string(),
        }
    }
}

impl SnoptSettings {
    /// Creates default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial workspace multiplier.
    pub fn with_base_length(mut self, base_length: usize) -> Self {
        self.base_length = base_length;
        self
    }

    /// Sets the stream configuration.
    pub fn with_streams(mut self, streams: StreamConfig) -> Self {
        self.streams = streams;
        self
    }

    /// Sets the problem name.
    pub fn with_problem_name<S: Into<String>>(mut self, name: S) -> Self {
        self.problem_name = name.into();
        self
    }
}

/// Closes the solver streams when dropped.
struct StreamGuard<'a, S: SnoptInterface + ?Sized> {
    interface: &'a mut S,
}

impl<'a, S: SnoptInterface + ?Sized> StreamGuard<'a, S> {
    fn open(interface: &'a mut S, streams: &StreamConfig) -> Result<Self> {
        interface.open_streams(streams)?;
        Ok(Self { interface })
    }
}

impl<S: SnoptInterface + ?Sized> Drop for StreamGuard<'_, S> {
    fn drop(&mut self) {
        self.interface.close_streams();
    }
}

/// Drives a [`SnoptInterface`] through one or more solves.
#[derive(Debug)]
pub struct SnoptAdapter<S: SnoptInterface> {
    interface: S,
    settings: SnoptSettings,
    options: OptionRegistry,
}

impl<S: SnoptInterface> SnoptAdapter<S> {
    /// Creates an adapter with default settings and no options.
    pub fn new(interface: S) -> Self {
        Self {
            interface,
            settings: SnoptSettings::default(),
            options: OptionRegistry::new(),
        }
    }

    /// Replaces the settings.
    pub fn with_settings(mut self, settings: SnoptSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers a solver option.
    pub fn with_option<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        self.options.set(key, value);
        self
    }

    /// Replaces the whole option registry.
    pub fn with_options(mut self, options: OptionRegistry) -> Self {
        self.options = options;
        self
    }

    /// Settings in use.
    pub fn settings(&self) -> &SnoptSettings {
        &self.settings
    }

    /// Option registry applied on every solve.
    pub fn options(&self) -> &OptionRegistry {
        &self.options
    }

    /// Mutable access to the option registry.
    pub fn options_mut(&mut self) -> &mut OptionRegistry {
        &mut self.options
    }

    /// The wrapped solver.
    pub fn interface(&self) -> &S {
        &self.interface
    }

    /// Mutable access to the wrapped solver.
    pub fn interface_mut(&mut self) -> &mut S {
        &mut self.interface
    }

    /// Consumes the adapter, returning the solver.
    pub fn into_inner(self) -> S {
        self.interface
    }

    /// Builds a cache for `pattern` and `method`, then solves.
    pub fn solve<F: NlpFunction>(
        &mut self,
        function: F,
        start: &StartState,
        bounds: &Bounds,
        pattern: SparsityPattern,
        method: DifferentiationMethod,
        objective_add: f64,
    ) -> Result<Outputs> {
        let mut cache = build_cache(function, pattern, method)?;
        self.solve_with_cache(cache.as_mut(), start, bounds, objective_add)
    }

    /// Solves with a caller-owned cache, which may be reused afterwards.
    pub fn solve_with_cache(
        &mut self,
        cache: &mut dyn DerivativeCache,
        start: &StartState,
        bounds: &Bounds,
        objective_add: f64,
    ) -> Result<Outputs> {
        let dims = cache.dimensions();
        cache.pattern().check_dimensions(dims)?;
        bounds.validate(dims)?;
        start.validate(dims)?;
        if !objective_add.is_finite() {
            return Err(NlpError::invalid_configuration(
                "objective_add",
                "objective constant must be finite",
            )
            .into());
        }

        let nf = dims.nf();
        to_solver_int("nF", nf)?;
        to_solver_int("n", dims.nx)?;
        let (rows, cols) = cache.pattern().solver_structure();
        let i_gfun = to_solver_indices("iGfun", &rows)?;
        let j_gvar = to_solver_indices("jGvar", &cols)?;
        let neg = i_gfun.len();

        let x_lower: Vec<f64> = bounds.x_lower.iter().copied().map(to_solver_bound).collect();
        let x_upper: Vec<f64> = bounds.x_upper.iter().copied().map(to_solver_bound).collect();
        let f_lower: Vec<f64> = std::iter::once(-INFINITE_BOUND)
            .chain(bounds.g_lower.iter().copied().map(to_solver_bound))
            .collect();
        let f_upper: Vec<f64> = std::iter::once(INFINITE_BOUND)
            .chain(bounds.g_upper.iter().copied().map(to_solver_bound))
            .collect();

        tracing::debug!(
            component = "adapter",
            operation = "solve",
            status = "start",
            method = %cache.method(),
            nx = dims.nx,
            ng = dims.ng,
            neg,
            warm = start.is_warm(),
            "Starting solve"
        );

        let guard = StreamGuard::open(&mut self.interface, &self.settings.streams)?;
        let mut workspace = Workspace::for_problem(dims, self.settings.base_length);

        let summary = self.options.apply(&mut *guard.interface, &mut workspace);
        if !summary.skipped.is_empty() || summary.errors > 0 {
            tracing::warn!(
                component = "adapter",
                operation = "options",
                status = "partial",
                applied = summary.applied,
                skipped = summary.skipped.len(),
                errors = summary.errors,
                "Some options were not accepted"
            );
        }

        let request = MemoryRequest {
            nf,
            n: dims.nx,
            nxname: 1,
            nfname: 1,
            nea: 0,
            neg,
        };
        let estimate = guard.interface.memory_requirements(&request, &mut workspace);
        if estimate.is_usable() {
            let grown = workspace.grow_to(&estimate);
            tracing::debug!(
                component = "adapter",
                operation = "memory",
                status = "success",
                lencw = workspace.lencw(),
                leniw = workspace.leniw(),
                lenrw = workspace.lenrw(),
                bytes = workspace.memory_usage(),
                grown = grown.len(),
                "Workspace negotiated"
            );
        } else {
            tracing::warn!(
                component = "adapter",
                operation = "memory",
                status = "unusable",
                inform = estimate.inform,
                mincw = estimate.mincw,
                miniw = estimate.miniw,
                minrw = estimate.minrw,
                "Memory estimate unusable; keeping initial workspace"
            );
        }

        for region in [Region::Character, Region::Integer, Region::Real] {
            let length = i64::from(to_solver_int("workspace length", workspace.length(region))?);
            let errors = guard
                .interface
                .set_option_int(region.option_key(), length, &mut workspace);
            if errors > 0 {
                tracing::warn!(
                    component = "adapter",
                    operation = "memory",
                    status = "error",
                    key = region.option_key(),
                    errors,
                    "Failed to register workspace length"
                );
            }
        }

        let mut x = start.x().to_vec();
        let mut xstate = start.xstate().to_vec();
        let mut xmul = start.xmul().to_vec();
        let mut f = start.f().to_vec();
        let mut fstate = start.fstate().to_vec();
        let mut fmul = start.fmul().to_vec();
        let mut ns = start.ns();

        let mut bridge = CallbackBridge::new(cache);
        let report = {
            let call = SolveCall {
                start: start.mode(),
                problem_name: &self.settings.problem_name,
                nf,
                n: dims.nx,
                objective_add,
                objective_row: 1,
                a: &[],
                i_afun: &[],
                j_avar: &[],
                i_gfun: &i_gfun,
                j_gvar: &j_gvar,
                x_lower: &x_lower,
                x_upper: &x_upper,
                f_lower: &f_lower,
                f_upper: &f_upper,
                x_names: &[],
                f_names: &[],
                x: &mut x,
                xstate: &mut xstate,
                xmul: &mut xmul,
                f: &mut f,
                fstate: &mut fstate,
                fmul: &mut fmul,
                ns: &mut ns,
                workspace: &mut workspace,
            };
            let mut usrfun = |args: &mut UsrfunArgs<'_>| bridge.usrfun(args);
            guard.interface.solve(call, &mut usrfun)
        };
        drop(guard);

        let termination = TerminationCode::from_inform(report.inform);
        let stats = bridge.stats();
        tracing::info!(
            component = "adapter",
            operation = "solve",
            status = termination.category.as_str(),
            inform = termination.code,
            major_iterations = report.major_iterations,
            evaluations = stats.evaluations,
            failures = stats.failures,
            "Solve finished: {}",
            termination.message
        );

        Ok(Outputs::new(
            FinalState {
                ns,
                x,
                xstate,
                xmul,
                f,
                fstate,
                fmul,
            },
            RunSummary {
                iterations: report.iterations,
                major_iterations: report.major_iterations,
                run_time: report.run_time,
                ninf: report.ninf,
                sinf: report.sinf,
            },
            objective_add,
            termination,
            stats,
        ))
    }
}

fn to_solver_indices(what: &'static str, indices: &[usize]) -> Result<Vec<i32>> {
    indices.iter().map(|&i| to_solver_int(what, i)).collect()
}
