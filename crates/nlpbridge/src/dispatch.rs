//! Backend selection and the top-level solve entry point.
//!
//! The [`Dispatcher`] resolves the sparsity pattern, builds one
//! differentiation cache for the requested method, and hands that cache to
//! its backend: the SNOPT-style adapter, or any [`ExternalSolver`].

use std::fmt;

use nlpbridge_core::prelude::*;
use nlpbridge_snopt::interface::SnoptInterface;
use nlpbridge_snopt::options::OptionValue;
use nlpbridge_snopt::reference::ReferenceSolver;
use nlpbridge_snopt::start::StartState;
use nlpbridge_snopt::{Outputs, SnoptAdapter, SnoptSettings, TerminationCategory};

use crate::error::{Error, Result};
use crate::options::Options;

/// What an external backend reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalOutcome {
    /// Final point
    pub x: Vec<f64>,
    /// Objective at `x`, without the objective constant
    pub objective: f64,
    /// Constraint values at `x`
    pub constraints: Vec<f64>,
    /// How the backend stopped
    pub status: TerminationCategory,
}

/// A second nonlinear-programming backend.
///
/// Implementations receive a ready cache; every function and derivative
/// evaluation they need goes through [`DerivativeCache::evaluate`].
pub trait ExternalSolver {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Minimizes from `x0` within `bounds`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the backend cannot run at all. A run that
    /// stops without an optimum reports it through
    /// [`ExternalOutcome::status`].
    fn solve(
        &mut self,
        cache: &mut dyn DerivativeCache,
        x0: &[f64],
        bounds: &Bounds,
    ) -> Result<ExternalOutcome>;
}

/// The solver a [`Dispatcher`] routes to.
pub enum Backend {
    /// SNOPT-style adapter with an optional warm start for its next solve
    Snopt {
        /// Adapter around the solver interface
        adapter: SnoptAdapter<Box<dyn SnoptInterface>>,
        /// Start state consumed by the next solve
        warm_start: Option<StartState>,
    },
    /// Externally implemented backend
    External(Box<dyn ExternalSolver>),
}

impl Backend {
    /// Backend name used in logs.
    pub fn name(&self) -> &str {
        match self {
            Self::Snopt { .. } => "snopt",
            Self::External(solver) => solver.name(),
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snopt { adapter, warm_start } => f
                .debug_struct("Snopt")
                .field("settings", adapter.settings())
                .field("options", adapter.options())
                .field("warm_start", &warm_start.is_some())
                .finish(),
            Self::External(solver) => f.debug_tuple("External").field(&solver.name()).finish(),
        }
    }
}

/// Result of a dispatched solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Final point
    pub x: Vec<f64>,
    /// Objective at `x`, objective constant included
    pub f: f64,
    /// Constraint values at `x`
    pub g: Vec<f64>,
    /// How the backend stopped
    pub status: TerminationCategory,
    /// Full adapter outputs; `None` for external backends
    pub outputs: Option<Outputs>,
}

impl Solution {
    /// True when the backend reported an optimal point.
    pub fn is_optimal(&self) -> bool {
        self.status == TerminationCategory::Optimal
    }

    /// Warm-start snapshot for the next SNOPT-style solve.
    pub fn warm_start(&self) -> Option<StartState> {
        self.outputs.as_ref().map(Outputs::warm_start)
    }

    fn from_outputs(outputs: Outputs) -> Self {
        Self {
            x: outputs.x.clone(),
            f: outputs.objective,
            g: outputs.constraints.clone(),
            status: outputs.category(),
            outputs: Some(outputs),
        }
    }
}

/// Routes problems to one backend.
///
/// # Example
///
/// ```
/// use nlpbridge::prelude::*;
///
/// let dispatcher = Dispatcher::reference().with_option("Major iterations limit", 200);
/// assert_eq!(dispatcher.backend().name(), "snopt");
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    backend: Backend,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::reference()
    }
}

impl Dispatcher {
    /// Creates a dispatcher for `backend`.
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// SNOPT-style backend over `interface`.
    pub fn snopt<S: SnoptInterface + 'static>(interface: S) -> Self {
        let interface: Box<dyn SnoptInterface> = Box::new(interface);
        Self::new(Backend::Snopt {
            adapter: SnoptAdapter::new(interface),
            warm_start: None,
        })
    }

    /// SNOPT-style backend over the bundled reference solver.
    pub fn reference() -> Self {
        Self::snopt(ReferenceSolver::new())
    }

    /// External backend.
    pub fn external<E: ExternalSolver + 'static>(solver: E) -> Self {
        Self::new(Backend::External(Box::new(solver)))
    }

    /// Replaces the adapter settings. Ignored for external backends.
    pub fn with_settings(self, settings: SnoptSettings) -> Self {
        match self.backend {
            Backend::Snopt {
                adapter,
                warm_start,
            } => Self::new(Backend::Snopt {
                adapter: adapter.with_settings(settings),
                warm_start,
            }),
            backend @ Backend::External(_) => {
                tracing::warn!(
                    component = "dispatch",
                    operation = "configure",
                    backend = backend.name(),
                    "Adapter settings ignored by external backend"
                );
                Self::new(backend)
            }
        }
    }

    /// Registers a solver option. Ignored for external backends.
    pub fn with_option<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        match &mut self.backend {
            Backend::Snopt { adapter, .. } => {
                adapter.options_mut().set(key, value);
            }
            Backend::External(solver) => {
                let key = key.into();
                tracing::warn!(
                    component = "dispatch",
                    operation = "configure",
                    backend = solver.name(),
                    key = %key,
                    "Solver option ignored by external backend"
                );
            }
        }
        self
    }

    /// Builder form of [`set_warm_start`](Self::set_warm_start).
    pub fn with_warm_start(mut self, start: StartState) -> Self {
        self.set_warm_start(start);
        self
    }

    /// Warm-starts the next SNOPT-style solve from `start`.
    ///
    /// The state is consumed by the next solve that reaches the solver, and
    /// its point replaces the `x0` passed to [`minimize`](Self::minimize). A
    /// solve rejected during setup leaves it pending.
    pub fn set_warm_start(&mut self, start: StartState) {
        match &mut self.backend {
            Backend::Snopt { warm_start, .. } => *warm_start = Some(start),
            Backend::External(solver) => tracing::warn!(
                component = "dispatch",
                operation = "configure",
                backend = solver.name(),
                "Warm start ignored by external backend"
            ),
        }
    }

    /// Active backend.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Mutable access to the active backend.
    pub fn backend_mut(&mut self) -> &mut Backend {
        &mut self.backend
    }

    /// Minimizes `function` from `x0` subject to `bounds`.
    ///
    /// `ng` is the number of constraints `function` writes. The sparsity
    /// pattern and the differentiation cache are built here, once, before
    /// the backend is reached.
    pub fn minimize<F: NlpFunction>(
        &mut self,
        function: F,
        x0: &[f64],
        ng: usize,
        bounds: &Bounds,
        options: &Options,
    ) -> Result<Solution> {
        let dims = Dimensions::new(x0.len(), ng);
        bounds.validate(dims)?;
        let pattern = options.sparsity.resolve(&function, dims)?;

        tracing::debug!(
            component = "dispatch",
            operation = "minimize",
            backend = self.backend.name(),
            method = %options.method,
            nx = dims.nx,
            ng = dims.ng,
            nnz = pattern.nnz(),
            "Dispatching solve"
        );

        let mut cache = build_cache(function, pattern, options.method)?;

        let solution = match &mut self.backend {
            Backend::Snopt {
                adapter,
                warm_start,
            } => {
                let start = warm_start
                    .take()
                    .unwrap_or_else(|| StartState::cold(x0.to_vec(), dims.nf()));
                match adapter.solve_with_cache(
                    cache.as_mut(),
                    &start,
                    bounds,
                    options.objective_add,
                ) {
                    Ok(outputs) => Solution::from_outputs(outputs),
                    Err(err) => {
                        // Rejected before solving; the warm state stays pending.
                        if start.is_warm() {
                            *warm_start = Some(start);
                        }
                        return Err(err.into());
                    }
                }
            }
            Backend::External(solver) => {
                let outcome = solver.solve(cache.as_mut(), x0, bounds)?;
                if outcome.x.len() != dims.nx || outcome.constraints.len() != dims.ng {
                    return Err(Error::external(
                        solver.name(),
                        format!(
                            "returned {} variables and {} constraints for a {}x{} problem",
                            outcome.x.len(),
                            outcome.constraints.len(),
                            dims.nx,
                            dims.ng
                        ),
                    ));
                }
                Solution {
                    x: outcome.x,
                    f: outcome.objective + options.objective_add,
                    g: outcome.constraints,
                    status: outcome.status,
                    outputs: None,
                }
            }
        };

        tracing::info!(
            component = "dispatch",
            operation = "minimize",
            backend = self.backend.name(),
            status = solution.status.as_str(),
            objective = solution.f,
            "Solve finished"
        );
        Ok(solution)
    }
}

/// Minimizes `function` with the bundled reference solver.
///
/// # Example
///
/// ```
/// use nlpbridge::prelude::*;
///
/// struct Quadratic;
///
/// impl NlpFunction for Quadratic {
///     fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
///         g[0] = x[0] + x[1];
///         Ok(x[0] * x[0] + x[1] * x[1])
///     }
/// }
///
/// let bounds = Bounds::new(
///     vec![f64::NEG_INFINITY; 2],
///     vec![f64::INFINITY; 2],
///     vec![1.0],
///     vec![f64::INFINITY],
/// );
/// let solution = minimize(Quadratic, &[2.0, 2.0], 1, &bounds, &Options::new()).unwrap();
/// assert!(solution.is_optimal());
/// assert!((solution.f - 0.5).abs() < 1e-5);
/// ```
pub fn minimize<F: NlpFunction>(
    function: F,
    x0: &[f64],
    ng: usize,
    bounds: &Bounds,
    options: &Options,
) -> Result<Solution> {
    Dispatcher::reference().minimize(function, x0, ng, bounds, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlpbridge_core::test_problems::ConstrainedQuadratic;

    struct OneShot {
        wrong_shape: bool,
    }

    impl ExternalSolver for OneShot {
        fn name(&self) -> &str {
            "one-shot"
        }

        fn solve(
            &mut self,
            cache: &mut dyn DerivativeCache,
            x0: &[f64],
            _bounds: &Bounds,
        ) -> Result<ExternalOutcome> {
            let dims = cache.dimensions();
            let mut g = vec![0.0; dims.ng];
            let mut df = vec![0.0; dims.nx];
            let mut dg = vec![0.0; cache.jacobian_len()];
            let f = cache
                .evaluate(x0, &mut g, &mut df, &mut dg, true)
                .map_err(|err| Error::external("one-shot", err.to_string()))?;
            if self.wrong_shape {
                g.push(0.0);
            }
            Ok(ExternalOutcome {
                x: x0.to_vec(),
                objective: f,
                constraints: g,
                status: TerminationCategory::FeasiblePoint,
            })
        }
    }

    fn bounds() -> Bounds {
        Bounds::new(
            vec![f64::NEG_INFINITY; 2],
            vec![f64::INFINITY; 2],
            vec![1.0],
            vec![f64::INFINITY],
        )
    }

    #[test]
    fn test_external_backend_receives_cache() {
        let mut dispatcher = Dispatcher::external(OneShot {
            wrong_shape: false,
        });
        let options = Options::new().with_objective_add(1.0);
        let solution = dispatcher
            .minimize(ConstrainedQuadratic, &[1.0, 2.0], 1, &bounds(), &options)
            .unwrap();

        assert_eq!(solution.x, vec![1.0, 2.0]);
        assert_eq!(solution.g, vec![3.0]);
        assert_eq!(solution.f, 6.0);
        assert_eq!(solution.status, TerminationCategory::FeasiblePoint);
        assert!(solution.outputs.is_none());
        assert!(solution.warm_start().is_none());
    }

    #[test]
    fn test_external_shape_checked() {
        let mut dispatcher = Dispatcher::external(OneShot {
            wrong_shape: true,
        });
        let err = dispatcher
            .minimize(ConstrainedQuadratic, &[1.0, 2.0], 1, &bounds(), &Options::new())
            .unwrap_err();
        assert!(matches!(err, Error::External { ref solver, .. } if solver == "one-shot"));
    }

    #[test]
    fn test_bounds_checked_before_backend() {
        let mut dispatcher = Dispatcher::external(OneShot {
            wrong_shape: false,
        });
        let short = Bounds::new(vec![0.0], vec![1.0], vec![1.0], vec![f64::INFINITY]);
        let err = dispatcher
            .minimize(ConstrainedQuadratic, &[1.0, 2.0], 1, &short, &Options::new())
            .unwrap_err();
        assert!(matches!(err, Error::Setup(_)));

        match dispatcher.backend() {
            Backend::External(solver) => assert_eq!(solver.name(), "one-shot"),
            Backend::Snopt { .. } => panic!("backend changed"),
        }
    }

    #[test]
    fn test_configuration_ignored_by_external() {
        let dispatcher = Dispatcher::external(OneShot {
            wrong_shape: false,
        })
        .with_option("Major iterations limit", 10)
        .with_settings(SnoptSettings::new().with_base_length(1000));
        assert_eq!(dispatcher.backend().name(), "one-shot");
    }

    #[test]
    fn test_rejected_warm_start_stays_pending() {
        use nlpbridge_core::test_problems::BandedChain;

        let mut dispatcher = Dispatcher::reference();
        let first = dispatcher
            .minimize(ConstrainedQuadratic, &[2.0, 2.0], 1, &bounds(), &Options::new())
            .unwrap();
        dispatcher.set_warm_start(first.warm_start().unwrap());

        let wider = Bounds::unbounded(Dimensions::new(3, 2));
        let err = dispatcher
            .minimize(BandedChain, &[0.5, 0.25, 0.1], 2, &wider, &Options::new())
            .unwrap_err();
        assert!(matches!(err, Error::Snopt(_)));
        match dispatcher.backend() {
            Backend::Snopt { warm_start, .. } => {
                assert_eq!(warm_start.as_ref().map(StartState::x), Some(first.x.as_slice()));
            }
            Backend::External(_) => panic!("expected the SNOPT backend"),
        }

        let resumed = dispatcher
            .minimize(ConstrainedQuadratic, &[2.0, 2.0], 1, &bounds(), &Options::new())
            .unwrap();
        assert!(resumed.is_optimal());
        match dispatcher.backend() {
            Backend::Snopt { warm_start, .. } => assert!(warm_start.is_none()),
            Backend::External(_) => panic!("expected the SNOPT backend"),
        }
    }

    #[test]
    fn test_warm_start_consumed() {
        let mut dispatcher = Dispatcher::reference();
        let first = dispatcher
            .minimize(ConstrainedQuadratic, &[2.0, 2.0], 1, &bounds(), &Options::new())
            .unwrap();
        assert!(first.is_optimal());

        dispatcher.set_warm_start(first.warm_start().unwrap());
        match dispatcher.backend() {
            Backend::Snopt { warm_start, .. } => assert!(warm_start.is_some()),
            Backend::External(_) => panic!("expected the SNOPT backend"),
        }

        let second = dispatcher
            .minimize(ConstrainedQuadratic, &[2.0, 2.0], 1, &bounds(), &Options::new())
            .unwrap();
        assert!(second.is_optimal());
        match dispatcher.backend() {
            Backend::Snopt { warm_start, .. } => assert!(warm_start.is_none()),
            Backend::External(_) => panic!("expected the SNOPT backend"),
        }
    }
}
