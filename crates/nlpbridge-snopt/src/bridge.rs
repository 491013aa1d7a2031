//! Marshaling between the solver callback and a differentiation cache.

use crate::interface::UsrfunArgs;
use nlpbridge_core::cache::DerivativeCache;

/// Counters kept by the bridge across one solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BridgeStats {
    /// Callbacks that evaluated the function
    pub evaluations: usize,
    /// Of those, how many also produced derivatives
    pub derivative_evaluations: usize,
    /// Evaluations that failed and returned status `-1`
    pub failures: usize,
    /// Final-call notifications answered without evaluating
    pub short_circuits: usize,
}

/// Translates solver callbacks into cache evaluations.
///
/// The point is copied out of solver memory before evaluation, and the
/// results are written back into `F` and `G` in the solver's layout:
/// a dense pattern fills `G` column-major over all `nF` rows, a sparse one
/// writes the objective gradient first and then the constraint nonzeros in
/// declared order.
pub struct CallbackBridge<'c> {
    cache: &'c mut dyn DerivativeCache,
    x: Vec<f64>,
    g: Vec<f64>,
    df: Vec<f64>,
    dg: Vec<f64>,
    dense: bool,
    stats: BridgeStats,
}

impl<'c> CallbackBridge<'c> {
    /// Creates a bridge over a cache, sizing scratch from its dimensions.
    pub fn new(cache: &'c mut dyn DerivativeCache) -> Self {
        let dims = cache.dimensions();
        let jacobian_len = cache.jacobian_len();
        let dense = cache.pattern().is_dense();
        Self {
            cache,
            x: vec![0.0; dims.nx],
            g: vec![0.0; dims.ng],
            df: vec![0.0; dims.nx],
            dg: vec![0.0; jacobian_len],
            dense,
            stats: BridgeStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Handles one callback.
    pub fn usrfun(&mut self, args: &mut UsrfunArgs<'_>) {
        if args.status >= 2 {
            self.stats.short_circuits += 1;
            return;
        }

        self.x.copy_from_slice(args.x);
        let need_derivatives = args.need_g > 0;
        let result = self.cache.evaluate(
            &self.x,
            &mut self.g,
            &mut self.df,
            &mut self.dg,
            need_derivatives,
        );

        let f = match result {
            Ok(f) => f,
            Err(err) => {
                self.stats.failures += 1;
                tracing::warn!(
                    component = "bridge",
                    operation = "usrfun",
                    status = "undefined",
                    error = %err,
                    "Evaluation failed; asking the solver to back off"
                );
                args.status = -1;
                return;
            }
        };

        self.stats.evaluations += 1;
        args.f[0] = f;
        args.f[1..].copy_from_slice(&self.g);

        if need_derivatives {
            self.stats.derivative_evaluations += 1;
            self.write_derivatives(args.g);
        }
    }

    fn write_derivatives(&self, out: &mut [f64]) {
        if self.dense {
            let nx = self.df.len();
            let ng = self.g.len();
            let nf = ng + 1;
            for j in 0..nx {
                out[j * nf] = self.df[j];
                out[j * nf + 1..(j + 1) * nf].copy_from_slice(&self.dg[j * ng..(j + 1) * ng]);
            }
        } else {
            let nx = self.df.len();
            out[..nx].copy_from_slice(&self.df);
            out[nx..].copy_from_slice(&self.dg);
        }
    }
}

impl std::fmt::Debug for CallbackBridge<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackBridge")
            .field("method", &self.cache.method())
            .field("dense", &self.dense)
            .field("stats", &self.stats)
            .finish()
    }
}
