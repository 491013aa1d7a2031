//! Problem-level configuration for dispatched solves.

use nlpbridge_core::prelude::*;

use crate::error::Result;

/// Where the Jacobian structure comes from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SparsitySpec {
    /// Every `(row, col)` pair, objective row included
    #[default]
    Dense,
    /// A caller-supplied constraint pattern
    Pattern(SparsityPattern),
    /// Detected from three distinct probe points
    Detect {
        /// Probe points, each of length nx
        probes: [Vec<f64>; 3],
        /// Difference scheme used at the probes
        scheme: FdScheme,
    },
}

impl SparsitySpec {
    /// Detection from `probes` with central differences.
    pub fn detect(probes: [Vec<f64>; 3]) -> Self {
        Self::Detect {
            probes,
            scheme: FdScheme::Central,
        }
    }

    /// Builds the concrete pattern for a problem of size `dims`.
    pub fn resolve<F: NlpFunction>(
        &self,
        function: &F,
        dims: Dimensions,
    ) -> Result<SparsityPattern> {
        match self {
            Self::Dense => Ok(SparsityPattern::dense(dims.nx, dims.nf())),
            Self::Pattern(pattern) => {
                pattern.check_dimensions(dims)?;
                Ok(pattern.clone())
            }
            Self::Detect { probes, scheme } => {
                if let Some(probe) = probes.iter().find(|p| p.len() != dims.nx) {
                    let err = NlpError::dimension_mismatch("probe point", dims.nx, probe.len());
                    return Err(err.into());
                }
                let pattern = SparsityPattern::detect(
                    function,
                    dims.ng,
                    [&probes[0], &probes[1], &probes[2]],
                    *scheme,
                )?;
                tracing::debug!(
                    component = "dispatch",
                    operation = "detect_sparsity",
                    nnz = pattern.nnz(),
                    dense_nnz = dims.nx * dims.ng,
                    "Detected constraint sparsity"
                );
                Ok(pattern)
            }
        }
    }
}

/// Options for [`minimize`](crate::minimize).
///
/// # Example
///
/// ```
/// use nlpbridge::prelude::*;
///
/// let options = Options::new()
///     .with_method(DifferentiationMethod::CentralFD)
///     .with_objective_add(1.0);
/// assert_eq!(options.sparsity, SparsitySpec::Dense);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Derivative strategy
    pub method: DifferentiationMethod,
    /// Jacobian structure source
    pub sparsity: SparsitySpec,
    /// Constant added to the reported objective
    pub objective_add: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            method: DifferentiationMethod::ForwardAD,
            sparsity: SparsitySpec::Dense,
            objective_add: 0.0,
        }
    }
}

impl Options {
    /// Creates default options: forward AD on a dense pattern.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the derivative strategy.
    pub fn with_method(mut self, method: DifferentiationMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the sparsity source.
    pub fn with_sparsity(mut self, sparsity: SparsitySpec) -> Self {
        self.sparsity = sparsity;
        self
    }

    /// Uses a caller-supplied constraint pattern.
    pub fn with_pattern(self, pattern: SparsityPattern) -> Self {
        self.with_sparsity(SparsitySpec::Pattern(pattern))
    }

    /// Detects the constraint pattern from three probe points.
    pub fn with_detection(self, probes: [Vec<f64>; 3]) -> Self {
        self.with_sparsity(SparsitySpec::detect(probes))
    }

    /// Sets the objective constant.
    pub fn with_objective_add(mut self, objective_add: f64) -> Self {
        self.objective_add = objective_add;
        self
    }
}
