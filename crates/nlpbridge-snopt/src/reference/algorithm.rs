//! Augmented-Lagrangian iteration.
//!
//! Constraints `l <= F_i(x) <= u` are handled through slacks eliminated in
//! closed form: for multiplier `λ` and penalty `ρ`,
//! `s = clamp(F_i - λ/ρ, l, u)` and `r = F_i - s`. The merit function is
//! `F_obj + Σ (-λ r + ρ r² / 2)`, minimized over the variable box by
//! projected gradient steps with Barzilai-Borwein lengths and Armijo
//! backtracking. After each inner solve `λ ← λ - ρ r`.

use super::{required_lengths, storage_check, ReferenceOptions, Streams};
use crate::interface::{
    from_solver_bound, MemoryRequest, SolveCall, SolveReport, Usrfun, UsrfunArgs,
    INFINITE_BOUND,
};
use crate::start::StartMode;
use crate::status::TerminationCode;
use nalgebra::{DMatrix, DVector};
use std::time::Instant;

const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;
const MAX_PENALTY: f64 = 1e10;
const PENALTY_GROWTH: f64 = 10.0;
const STEP_MIN: f64 = 1e-12;
const STEP_MAX: f64 = 1e12;

// Termination codes produced here.
const OPTIMAL: i32 = 1;
const ACCURACY_NOT_ACHIEVED: i32 = 3;
const NONLINEAR_INFEASIBLE: i32 = 13;
const UNBOUNDED: i32 = 21;
const ITERATION_LIMIT: i32 = 31;
const MAJOR_ITERATION_LIMIT: i32 = 32;
const CANNOT_IMPROVE: i32 = 41;
const UNDEFINED_AT_START: i32 = 62;
const UNDEFINED_REGION: i32 = 63;
const USER_STOP: i32 = 71;
const INVALID_INPUT: i32 = 91;
const BAD_BASIS_DIMENSIONS: i32 = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Defined,
    Undefined,
    Stop,
}

/// Calls the user function and assembles `F` and the dense Jacobian.
struct Evaluator<'a, 'f> {
    usrfun: &'a mut Usrfun<'f>,
    g_entries: Vec<(usize, usize)>,
    linear: Vec<(usize, usize, f64)>,
    f_buf: Vec<f64>,
    g_buf: Vec<f64>,
    status: i32,
    calls: usize,
}

impl Evaluator<'_, '_> {
    fn call(&mut self, x: &DVector<f64>, need_g: bool) -> Outcome {
        let mut args = UsrfunArgs {
            status: self.status,
            x: x.as_slice(),
            need_f: 1,
            f: &mut self.f_buf,
            need_g: i32::from(need_g),
            g: &mut self.g_buf,
        };
        (*self.usrfun)(&mut args);
        let status = args.status;
        self.status = 0;
        self.calls += 1;

        match status {
            s if s <= -2 => Outcome::Stop,
            -1 => Outcome::Undefined,
            _ if self.f_buf.iter().any(|v| !v.is_finite()) => Outcome::Undefined,
            _ if need_g && self.g_buf.iter().any(|v| !v.is_finite()) => Outcome::Undefined,
            _ => Outcome::Defined,
        }
    }

    fn values(&mut self, x: &DVector<f64>, f: &mut DVector<f64>) -> Outcome {
        let outcome = self.call(x, false);
        if outcome == Outcome::Defined {
            self.load_values(x, f);
        }
        outcome
    }

    fn values_and_jacobian(
        &mut self,
        x: &DVector<f64>,
        f: &mut DVector<f64>,
        jacobian: &mut DMatrix<f64>,
    ) -> Outcome {
        let outcome = self.call(x, true);
        if outcome == Outcome::Defined {
            self.load_values(x, f);
            jacobian.fill(0.0);
            for (&(i, j), &value) in self.g_entries.iter().zip(&self.g_buf) {
                jacobian[(i, j)] += value;
            }
            for &(i, j, a) in &self.linear {
                jacobian[(i, j)] += a;
            }
        }
        outcome
    }

    fn load_values(&self, x: &DVector<f64>, f: &mut DVector<f64>) {
        f.copy_from_slice(&self.f_buf);
        for &(i, j, a) in &self.linear {
            f[i] += a * x[j];
        }
    }

    /// Final notification; the callback is expected to return at once.
    fn finish(&mut self, x: &DVector<f64>) {
        let mut args = UsrfunArgs {
            status: 2,
            x: x.as_slice(),
            need_f: 0,
            f: &mut self.f_buf,
            need_g: 0,
            g: &mut self.g_buf,
        };
        (*self.usrfun)(&mut args);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InnerExit {
    Converged,
    Stalled,
    IterationLimit,
    Undefined,
    Stop,
    Unbounded,
}

struct AugmentedLagrangian<'a, 'f> {
    options: &'a ReferenceOptions,
    streams: &'a mut Streams,
    eval: Evaluator<'a, 'f>,
    x_lower: DVector<f64>,
    x_upper: DVector<f64>,
    f_lower: DVector<f64>,
    f_upper: DVector<f64>,
    objective: usize,
    rows: Vec<usize>,
    lambda: DVector<f64>,
    rho: f64,
    warm: bool,
    x: DVector<f64>,
    f: DVector<f64>,
    jacobian: DMatrix<f64>,
    minor: usize,
    major: usize,
}

impl AugmentedLagrangian<'_, '_> {
    fn project(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            x.len(),
            x.iter()
                .zip(self.x_lower.iter().zip(self.x_upper.iter()))
                .map(|(&v, (&lo, &up))| v.clamp(lo, up)),
        )
    }

    fn projected_norm(&self, grad: &DVector<f64>) -> f64 {
        let stepped = self.project(&(&self.x - grad));
        (stepped - &self.x).amax()
    }

    fn residual(&self, f: &DVector<f64>, i: usize) -> f64 {
        let slack = (f[i] - self.lambda[i] / self.rho).clamp(self.f_lower[i], self.f_upper[i]);
        f[i] - slack
    }

    fn merit(&self, f: &DVector<f64>) -> f64 {
        self.rows.iter().fold(f[self.objective], |acc, &i| {
            let r = self.residual(f, i);
            acc - self.lambda[i] * r + 0.5 * self.rho * r * r
        })
    }

    fn merit_gradient(&self, f: &DVector<f64>, jacobian: &DMatrix<f64>) -> DVector<f64> {
        let mut weights = DVector::zeros(f.len());
        weights[self.objective] = 1.0;
        for &i in &self.rows {
            weights[i] = -self.lambda[i] + self.rho * self.residual(f, i);
        }
        jacobian.tr_mul(&weights)
    }

    fn lagrangian_gradient(&self) -> DVector<f64> {
        let mut weights = -&self.lambda;
        weights[self.objective] = 1.0;
        self.jacobian.tr_mul(&weights)
    }

    /// Largest bound violation and `(count, sum)` over violated rows.
    fn violation(&self) -> (f64, usize, f64) {
        let tolerance = self.options.major_feasibility_tolerance;
        self.rows.iter().fold((0.0_f64, 0, 0.0), |(max, count, sum), &i| {
            let v = (self.f_lower[i] - self.f[i])
                .max(self.f[i] - self.f_upper[i])
                .max(0.0);
            if v > tolerance {
                (max.max(v), count + 1, sum + v)
            } else {
                (max.max(v), count, sum)
            }
        })
    }

    fn is_unbounded(&self) -> bool {
        self.f[self.objective] < -self.options.unbounded_objective
    }

    fn inner(&mut self, omega: f64) -> InnerExit {
        let (nf, n) = self.jacobian.shape();
        let mut grad = self.merit_gradient(&self.f, &self.jacobian);
        let mut step = 1.0 / grad.amax().max(1.0);

        loop {
            if self.projected_norm(&grad) <= omega {
                return InnerExit::Converged;
            }
            if self.minor >= self.options.iterations_limit {
                return InnerExit::IterationLimit;
            }

            let merit = self.merit(&self.f);
            let mut trial_f = DVector::zeros(nf);
            let mut trial_jacobian = DMatrix::zeros(nf, n);
            let mut alpha = step;
            let mut undefined = false;
            let mut accepted = None;

            for _ in 0..MAX_BACKTRACKS {
                let trial_x = self.project(&(&self.x - &grad * alpha));
                let direction = &trial_x - &self.x;
                if direction.amax() <= 0.0 {
                    break;
                }
                let slope = grad.dot(&direction);

                match self.eval.values(&trial_x, &mut trial_f) {
                    Outcome::Stop => return InnerExit::Stop,
                    Outcome::Undefined => {
                        undefined = true;
                        alpha *= 0.5;
                        continue;
                    }
                    Outcome::Defined => {}
                }

                if self.merit(&trial_f) <= merit + ARMIJO * slope {
                    match self
                        .eval
                        .values_and_jacobian(&trial_x, &mut trial_f, &mut trial_jacobian)
                    {
                        Outcome::Stop => return InnerExit::Stop,
                        Outcome::Undefined => undefined = true,
                        Outcome::Defined => {
                            accepted = Some(trial_x);
                            break;
                        }
                    }
                }
                alpha *= 0.5;
            }

            let Some(trial_x) = accepted else {
                return if undefined {
                    InnerExit::Undefined
                } else {
                    InnerExit::Stalled
                };
            };

            self.minor += 1;
            let trial_grad = self.merit_gradient(&trial_f, &trial_jacobian);
            let s = &trial_x - &self.x;
            let y = &trial_grad - &grad;
            let sy = s.dot(&y);
            step = if sy > 0.0 {
                (s.norm_squared() / sy).clamp(STEP_MIN, STEP_MAX)
            } else {
                (2.0 * alpha).min(STEP_MAX)
            };

            self.x = trial_x;
            self.f = trial_f;
            self.jacobian = trial_jacobian;
            grad = trial_grad;

            if self.is_unbounded() {
                return InnerExit::Unbounded;
            }
        }
    }

    fn solve(&mut self) -> i32 {
        self.x = self.project(&self.x);
        match self
            .eval
            .values_and_jacobian(&self.x, &mut self.f, &mut self.jacobian)
        {
            Outcome::Stop => return USER_STOP,
            Outcome::Undefined => return UNDEFINED_AT_START,
            Outcome::Defined => {}
        }
        if self.is_unbounded() {
            return UNBOUNDED;
        }

        let opt_tol = self.options.major_optimality_tolerance;
        let feas_tol = self.options.major_feasibility_tolerance;
        let mut previous = f64::INFINITY;
        let mut stalls = 0;

        if self.options.major_print_level > 0 {
            self.streams.print(format_args!(
                " Major Minors     Objective    Feasible     Optimal   Penalty"
            ));
        }

        for major in 1..=self.options.major_iterations_limit {
            self.major = major;
            // Inner tolerance: 0.1^k down to the optimality tolerance, or
            // the optimality tolerance throughout on a warm start.
            let omega = if self.warm {
                opt_tol
            } else {
                opt_tol.max(0.1_f64.powi(i32::try_from(major).unwrap_or(i32::MAX)))
            };
            let exit = self.inner(omega);
            match exit {
                InnerExit::Stop => return USER_STOP,
                InnerExit::Undefined => return UNDEFINED_REGION,
                InnerExit::IterationLimit => return ITERATION_LIMIT,
                InnerExit::Unbounded => return UNBOUNDED,
                InnerExit::Converged | InnerExit::Stalled => {}
            }

            for index in 0..self.rows.len() {
                let i = self.rows[index];
                let r = self.residual(&self.f, i);
                self.lambda[i] -= self.rho * r;
            }

            let (feasibility, _, _) = self.violation();
            let optimality = self.projected_norm(&self.lagrangian_gradient());

            tracing::trace!(
                component = "reference",
                operation = "major",
                major,
                minor = self.minor,
                objective = self.f[self.objective],
                feasibility,
                optimality,
                rho = self.rho
            );
            if self.options.major_print_level > 0 {
                self.streams.print(format_args!(
                    "{major:>6} {:>6} {:>13.6e} {feasibility:>11.1e} {optimality:>11.1e} {:>9.1e}",
                    self.minor, self.f[self.objective], self.rho
                ));
            }

            if feasibility <= feas_tol && optimality <= opt_tol {
                return OPTIMAL;
            }

            if exit == InnerExit::Stalled {
                stalls += 1;
                if stalls >= 2 {
                    return if feasibility <= feas_tol {
                        ACCURACY_NOT_ACHIEVED
                    } else {
                        CANNOT_IMPROVE
                    };
                }
            } else {
                stalls = 0;
            }

            if feasibility > feas_tol && feasibility > 0.25 * previous {
                self.rho *= PENALTY_GROWTH;
                if self.rho > MAX_PENALTY {
                    return NONLINEAR_INFEASIBLE;
                }
            }
            previous = feasibility;
        }
        MAJOR_ITERATION_LIMIT
    }

    fn print_solution(&mut self) {
        self.streams.print(format_args!(
            " Variable     State          Value          Lower          Upper     Multiplier"
        ));
        let reduced = self.lagrangian_gradient();
        for j in 0..self.x.len() {
            self.streams.print(format_args!(
                "{:>9} {:>9} {:>14.6e} {:>14.6e} {:>14.6e} {:>14.6e}",
                j + 1,
                variable_state(
                    self.x[j],
                    self.x_lower[j],
                    self.x_upper[j],
                    self.options.major_feasibility_tolerance
                ),
                self.x[j],
                self.x_lower[j],
                self.x_upper[j],
                reduced[j]
            ));
        }
    }
}

/// Bounds at or beyond `INFINITE_BOUND` become infinite.
fn decoded_bounds(values: &[f64]) -> DVector<f64> {
    DVector::from_iterator(values.len(), values.iter().map(|&v| from_solver_bound(v)))
}

fn at_bound(value: f64, bound: f64, tolerance: f64) -> bool {
    bound.abs() < INFINITE_BOUND && (value - bound).abs() <= tolerance * (1.0 + bound.abs())
}

/// 0 at the lower bound, 1 at the upper bound, 2 between.
fn variable_state(value: f64, lower: f64, upper: f64, tolerance: f64) -> i32 {
    if at_bound(value, lower, tolerance) {
        0
    } else if at_bound(value, upper, tolerance) {
        1
    } else {
        2
    }
}

/// Like [`variable_state`] with 3 (basic) for inactive rows.
fn row_state(value: f64, lower: f64, upper: f64, tolerance: f64) -> i32 {
    match variable_state(value, lower, upper, tolerance) {
        2 => 3,
        state => state,
    }
}

/// Input validation; returns the inform code on failure.
fn check_input(call: &SolveCall<'_>) -> Option<i32> {
    let n = call.n;
    let nf = call.nf;
    if n == 0 || nf == 0 || call.objective_row == 0 || call.objective_row > nf {
        return Some(INVALID_INPUT);
    }

    let names_ok = |names: usize, expected: usize| names <= 1 || names == expected;
    let lengths = [
        (call.x.len(), n),
        (call.xstate.len(), n),
        (call.xmul.len(), n),
        (call.x_lower.len(), n),
        (call.x_upper.len(), n),
        (call.f.len(), nf),
        (call.fstate.len(), nf),
        (call.fmul.len(), nf),
        (call.f_lower.len(), nf),
        (call.f_upper.len(), nf),
        (call.j_gvar.len(), call.i_gfun.len()),
        (call.i_afun.len(), call.a.len()),
        (call.j_avar.len(), call.a.len()),
    ];
    if lengths.iter().any(|(actual, expected)| actual != expected)
        || !names_ok(call.x_names.len(), n)
        || !names_ok(call.f_names.len(), nf)
    {
        return Some(INVALID_INPUT);
    }

    let in_range = |rows: &[i32], cols: &[i32]| {
        rows.iter().zip(cols).all(|(&i, &j)| {
            usize::try_from(i).is_ok_and(|i| (1..=nf).contains(&i))
                && usize::try_from(j).is_ok_and(|j| (1..=n).contains(&j))
        })
    };
    if !in_range(call.i_gfun, call.j_gvar) || !in_range(call.i_afun, call.j_avar) {
        return Some(INVALID_INPUT);
    }

    let crossed = call
        .x_lower
        .iter()
        .zip(call.x_upper.iter())
        .chain(call.f_lower.iter().zip(call.f_upper.iter()))
        .any(|(lo, up)| lo > up || lo.is_nan() || up.is_nan());
    if crossed || call.x.iter().any(|v| !v.is_finite()) || !call.a.iter().all(|v| v.is_finite())
    {
        return Some(INVALID_INPUT);
    }

    if call.start == StartMode::Warm {
        let ns = usize::try_from(*call.ns).ok();
        if !ns.is_some_and(|ns| ns <= n) {
            return Some(BAD_BASIS_DIMENSIONS);
        }
    }
    None
}

fn zero_based(indices: &[i32]) -> impl Iterator<Item = usize> + '_ {
    indices.iter().map(|&i| i as usize - 1)
}

/// Runs one solve.
pub(super) fn run(
    options: &ReferenceOptions,
    streams: &mut Streams,
    call: SolveCall<'_>,
    usrfun: &mut Usrfun<'_>,
) -> SolveReport {
    let started = Instant::now();
    let request = MemoryRequest {
        nf: call.nf,
        n: call.n,
        nxname: call.x_names.len().max(1),
        nfname: call.f_names.len().max(1),
        nea: call.a.len(),
        neg: call.i_gfun.len(),
    };
    let (mincw, miniw, minrw) = required_lengths(&request);
    let mut report = SolveReport {
        inform: 0,
        iterations: 0,
        major_iterations: 0,
        ninf: 0,
        sinf: 0.0,
        mincw,
        miniw,
        minrw,
        run_time: 0.0,
    };

    streams.print(format_args!(
        " Problem {}: n = {}, nF = {}, neG = {}, neA = {}, start = {:?}",
        call.problem_name,
        call.n,
        call.nf,
        request.neg,
        request.nea,
        call.start
    ));

    if let Some(inform) = check_input(&call).or_else(|| storage_check(call.workspace, &request)) {
        report.inform = inform;
    } else {
        let inform = iterate(options, streams, call, usrfun, &mut report);
        report.inform = inform;
    }

    report.run_time = started.elapsed().as_secs_f64();
    let decoded = TerminationCode::from_inform(report.inform);
    streams.print(format_args!(" {decoded}"));
    streams.summary(format_args!(
        " {decoded}\n Major iterations {:>8}  Minor iterations {:>8}  \
         Infeasibilities {:>4} ({:.2e})",
        report.major_iterations, report.iterations, report.ninf, report.sinf
    ));
    tracing::debug!(
        component = "reference",
        operation = "solve",
        status = decoded.category.as_str(),
        inform = report.inform,
        major_iterations = report.major_iterations,
        "Reference solve finished"
    );
    report
}

fn iterate(
    options: &ReferenceOptions,
    streams: &mut Streams,
    call: SolveCall<'_>,
    usrfun: &mut Usrfun<'_>,
    report: &mut SolveReport,
) -> i32 {
    let n = call.n;
    let nf = call.nf;
    let objective = call.objective_row - 1;

    let warm = call.start == StartMode::Warm;
    let mut lambda = DVector::zeros(nf);
    if warm {
        lambda.copy_from_slice(call.fmul);
        lambda[objective] = 0.0;
    }

    let eval = Evaluator {
        usrfun,
        g_entries: zero_based(call.i_gfun).zip(zero_based(call.j_gvar)).collect(),
        linear: zero_based(call.i_afun)
            .zip(zero_based(call.j_avar))
            .zip(call.a.iter())
            .map(|((i, j), &a)| (i, j, a))
            .collect(),
        f_buf: vec![0.0; nf],
        g_buf: vec![0.0; call.i_gfun.len()],
        status: 1,
        calls: 0,
    };

    let mut solver = AugmentedLagrangian {
        options,
        streams,
        eval,
        x_lower: decoded_bounds(call.x_lower),
        x_upper: decoded_bounds(call.x_upper),
        f_lower: decoded_bounds(call.f_lower),
        f_upper: decoded_bounds(call.f_upper),
        objective,
        rows: (0..nf).filter(|&i| i != objective).collect(),
        lambda,
        rho: options.penalty_parameter,
        warm,
        x: DVector::from_column_slice(call.x),
        f: DVector::from_column_slice(call.f),
        jacobian: DMatrix::zeros(nf, n),
        minor: 0,
        major: 0,
    };

    let inform = solver.solve();
    if inform != USER_STOP && solver.eval.calls > 0 {
        let x = solver.x.clone();
        solver.eval.finish(&x);
    }
    if options.print_solution {
        solver.print_solution();
    }

    let (_, ninf, sinf) = solver.violation();
    report.iterations = solver.minor;
    report.major_iterations = solver.major;
    report.ninf = ninf;
    report.sinf = sinf;

    let reduced = solver.lagrangian_gradient();
    call.x.copy_from_slice(solver.x.as_slice());
    call.f.copy_from_slice(solver.f.as_slice());
    call.xmul.copy_from_slice(reduced.as_slice());
    call.fmul.copy_from_slice(solver.lambda.as_slice());
    let tolerance = options.major_feasibility_tolerance;
    for j in 0..n {
        call.xstate[j] =
            variable_state(solver.x[j], solver.x_lower[j], solver.x_upper[j], tolerance);
    }
    for i in 0..nf {
        call.fstate[i] = if i == objective {
            3
        } else {
            row_state(solver.f[i], solver.f_lower[i], solver.f_upper[i], tolerance)
        };
    }
    let superbasic = call.xstate.iter().filter(|&&s| s == 2).count();
    let active = call.fstate.iter().filter(|&&s| s != 3).count();
    *call.ns = i32::try_from(superbasic.saturating_sub(active)).unwrap_or(i32::MAX);

    inform
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::SnoptInterface;
    use crate::reference::ReferenceSolver;
    use crate::workspace::Workspace;
    use approx::assert_relative_eq;

    /// `min x1² + x2²  s.t.  x1 + x2 >= 1`, dense G.
    fn quadratic(args: &mut UsrfunArgs<'_>) {
        if args.status >= 2 {
            return;
        }
        let x = args.x;
        args.f[0] = x[0] * x[0] + x[1] * x[1];
        args.f[1] = x[0] + x[1];
        if args.need_g > 0 {
            args.g.copy_from_slice(&[2.0 * x[0], 1.0, 2.0 * x[1], 1.0]);
        }
    }

    #[test]
    fn test_bounds_decoded_to_infinity() {
        let decoded = decoded_bounds(&[-INFINITE_BOUND, -3.0, 2.5e20, INFINITE_BOUND]);
        assert_eq!(decoded[0], f64::NEG_INFINITY);
        assert_eq!(decoded[1], -3.0);
        assert_eq!(decoded[2], f64::INFINITY);
        assert_eq!(decoded[3], f64::INFINITY);
        assert!(!at_bound(1e20, decoded[3], 1e-6));
    }

    struct Problem {
        x: Vec<f64>,
        xstate: Vec<i32>,
        xmul: Vec<f64>,
        f: Vec<f64>,
        fstate: Vec<i32>,
        fmul: Vec<f64>,
        ns: i32,
        workspace: Workspace,
    }

    impl Problem {
        fn new(x0: Vec<f64>) -> Self {
            Self {
                xstate: vec![0; x0.len()],
                xmul: vec![0.0; x0.len()],
                x: x0,
                f: vec![0.0; 2],
                fstate: vec![0; 2],
                fmul: vec![0.0; 2],
                ns: 0,
                workspace: Workspace::with_lengths(1000, 2000, 2000),
            }
        }

        fn solve(
            &mut self,
            solver: &mut ReferenceSolver,
            start: StartMode,
            i_gfun: &[i32],
            usrfun: &mut Usrfun<'_>,
        ) -> SolveReport {
            let call = SolveCall {
                start,
                problem_name: "quadratic",
                nf: 2,
                n: 2,
                objective_add: 0.0,
                objective_row: 1,
                a: &[],
                i_afun: &[],
                j_avar: &[],
                i_gfun,
                j_gvar: &[1, 1, 2, 2],
                x_lower: &[-INFINITE_BOUND; 2],
                x_upper: &[INFINITE_BOUND; 2],
                f_lower: &[-INFINITE_BOUND, 1.0],
                f_upper: &[INFINITE_BOUND; 2],
                x_names: &[],
                f_names: &[],
                x: &mut self.x,
                xstate: &mut self.xstate,
                xmul: &mut self.xmul,
                f: &mut self.f,
                fstate: &mut self.fstate,
                fmul: &mut self.fmul,
                ns: &mut self.ns,
                workspace: &mut self.workspace,
            };
            solver.solve(call, usrfun)
        }
    }

    #[test]
    fn test_solves_constrained_quadratic() {
        let mut solver = ReferenceSolver::new();
        let mut problem = Problem::new(vec![2.0, 2.0]);
        let report = problem.solve(&mut solver, StartMode::Cold, &[1, 2, 1, 2], &mut quadratic);

        assert_eq!(report.inform, OPTIMAL);
        assert_relative_eq!(problem.x[0], 0.5, epsilon = 1e-5);
        assert_relative_eq!(problem.x[1], 0.5, epsilon = 1e-5);
        assert_relative_eq!(problem.f[0], 0.5, epsilon = 1e-5);
        assert_relative_eq!(problem.fmul[1], 1.0, epsilon = 1e-4);
        assert_eq!(problem.fstate[1], 0);
        assert!(report.major_iterations >= 1);
    }

    #[test]
    fn test_status_sequence() {
        let mut statuses = Vec::new();
        let mut recorder = |args: &mut UsrfunArgs<'_>| {
            statuses.push(args.status);
            quadratic(args);
        };
        let mut solver = ReferenceSolver::new();
        Problem::new(vec![2.0, 2.0]).solve(
            &mut solver,
            StartMode::Cold,
            &[1, 2, 1, 2],
            &mut recorder,
        );

        assert_eq!(statuses.first(), Some(&1));
        assert_eq!(statuses.last(), Some(&2));
        assert!(statuses[1..statuses.len() - 1].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_undefined_start() {
        let mut undefined = |args: &mut UsrfunArgs<'_>| args.status = -1;
        let mut solver = ReferenceSolver::new();
        let report = Problem::new(vec![2.0, 2.0]).solve(
            &mut solver,
            StartMode::Cold,
            &[1, 2, 1, 2],
            &mut undefined,
        );
        assert_eq!(report.inform, UNDEFINED_AT_START);
    }

    #[test]
    fn test_user_stop() {
        let mut calls = 0;
        let mut stopper = |args: &mut UsrfunArgs<'_>| {
            calls += 1;
            quadratic(args);
            if calls == 3 {
                args.status = -2;
            }
        };
        let mut solver = ReferenceSolver::new();
        let report = Problem::new(vec![2.0, 2.0]).solve(
            &mut solver,
            StartMode::Cold,
            &[1, 2, 1, 2],
            &mut stopper,
        );
        assert_eq!(report.inform, USER_STOP);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_out_of_range_structure() {
        let mut solver = ReferenceSolver::new();
        let report = Problem::new(vec![2.0, 2.0]).solve(
            &mut solver,
            StartMode::Cold,
            &[1, 3, 1, 2],
            &mut quadratic,
        );
        assert_eq!(report.inform, INVALID_INPUT);
    }

    #[test]
    fn test_major_iteration_limit() {
        let mut options = ReferenceOptions::default();
        options.major_iterations_limit = 1;
        let mut solver = ReferenceSolver::with_options(options);
        let report = Problem::new(vec![2.0, 2.0]).solve(
            &mut solver,
            StartMode::Cold,
            &[1, 2, 1, 2],
            &mut quadratic,
        );
        assert_eq!(report.inform, MAJOR_ITERATION_LIMIT);
        assert_eq!(report.major_iterations, 1);
    }

    #[test]
    fn test_warm_start_ns_checked() {
        let mut solver = ReferenceSolver::new();
        let mut problem = Problem::new(vec![2.0, 2.0]);
        problem.ns = 5;
        let report = problem.solve(&mut solver, StartMode::Warm, &[1, 2, 1, 2], &mut quadratic);
        assert_eq!(report.inform, BAD_BASIS_DIMENSIONS);
    }
}
