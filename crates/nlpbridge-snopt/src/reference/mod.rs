//! A pure-Rust solver speaking the SNOPT calling convention.
//!
//! [`ReferenceSolver`] implements [`SnoptInterface`] with a small
//! augmented-Lagrangian method over box constraints. It honours the whole
//! protocol the adapter relies on: memory sizing with the `104` inform,
//! typed option setters returning error counts, print and summary streams,
//! storage checks against the lent workspace, a blocking solve that
//! re-enters the user callback, and SNOPT termination codes.
//!
//! It is meant for exercising the adapter and for small problems, not as a
//! replacement for a production SQP code.

mod algorithm;

use crate::error::{Result, SnoptError};
use crate::interface::{
    MemoryEstimate, MemoryRequest, SnoptInterface, SolveCall, SolveReport, StreamConfig, Usrfun,
    MEMORY_OK,
};
use crate::workspace::{Workspace, MIN_LENGTH};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inform value for workspace regions below the 500-unit floor.
const STORAGE_FLOOR: i32 = 81;

/// Tunable parameters of the reference solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferenceOptions {
    /// Outer (multiplier) iterations
    pub major_iterations_limit: usize,
    /// Inner (projected-gradient) iterations, summed over the solve
    pub iterations_limit: usize,
    /// Stationarity tolerance
    pub major_optimality_tolerance: f64,
    /// Constraint violation tolerance
    pub major_feasibility_tolerance: f64,
    /// Initial penalty parameter
    pub penalty_parameter: f64,
    /// Objective magnitude treated as unbounded
    pub unbounded_objective: f64,
    /// Per-iteration print lines when positive
    pub major_print_level: i64,
    /// Print the final point to the print stream
    pub print_solution: bool,
    /// Registered character workspace length
    pub total_character_workspace: Option<usize>,
    /// Registered integer workspace length
    pub total_integer_workspace: Option<usize>,
    /// Registered real workspace length
    pub total_real_workspace: Option<usize>,
}

impl Default for ReferenceOptions {
    fn default() -> Self {
        Self {
            major_iterations_limit: 1000,
            iterations_limit: 10_000,
            major_optimality_tolerance: 1e-6,
            major_feasibility_tolerance: 1e-6,
            penalty_parameter: 10.0,
            unbounded_objective: 1e15,
            major_print_level: 1,
            print_solution: false,
            total_character_workspace: None,
            total_integer_workspace: None,
            total_real_workspace: None,
        }
    }
}

/// Collapses whitespace and case so `"major  Iterations LIMIT"` matches.
fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_count(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

impl ReferenceOptions {
    fn set_int(&mut self, key: &str, value: i64) -> usize {
        let slot = match normalize_key(key).as_str() {
            "major iterations limit" => &mut self.major_iterations_limit,
            "iterations limit" => &mut self.iterations_limit,
            "major print level" => {
                self.major_print_level = value;
                return 0;
            }
            "total character workspace" => {
                return store_length(&mut self.total_character_workspace, value)
            }
            "total integer workspace" => {
                return store_length(&mut self.total_integer_workspace, value)
            }
            "total real workspace" => return store_length(&mut self.total_real_workspace, value),
            // Integer values are accepted for real-valued options.
            _ => return self.set_real(key, value as f64),
        };
        match to_count(value) {
            Some(v) => {
                *slot = v;
                0
            }
            None => 1,
        }
    }

    fn set_real(&mut self, key: &str, value: f64) -> usize {
        if !value.is_finite() || value <= 0.0 {
            return 1;
        }
        let slot = match normalize_key(key).as_str() {
            "major optimality tolerance" => &mut self.major_optimality_tolerance,
            "major feasibility tolerance" => &mut self.major_feasibility_tolerance,
            "penalty parameter" => &mut self.penalty_parameter,
            "unbounded objective value" => &mut self.unbounded_objective,
            _ => return 1,
        };
        *slot = value;
        0
    }

    fn set_string(&mut self, key: &str, value: &str) -> usize {
        match normalize_key(key).as_str() {
            "print solution" => match value.trim().to_ascii_lowercase().as_str() {
                "yes" => {
                    self.print_solution = true;
                    0
                }
                "no" => {
                    self.print_solution = false;
                    0
                }
                _ => 1,
            },
            _ => {
                // Numeric strings are routed to the typed setters.
                if let Ok(i) = value.trim().parse::<i64>() {
                    self.set_int(key, i)
                } else if let Ok(r) = value.trim().parse::<f64>() {
                    self.set_real(key, r)
                } else {
                    1
                }
            }
        }
    }
}

fn store_length(slot: &mut Option<usize>, value: i64) -> usize {
    match to_count(value) {
        Some(v) => {
            *slot = Some(v);
            0
        }
        None => 1,
    }
}

/// Required workspace lengths for a problem.
///
/// Character: `500 + nxname + nfname` units. Integer:
/// `500 + 20(n + nF) + 2(neA + neG)`. Real:
/// `600 + 40(n + nF) + 2(neA + neG) + n²`.
pub fn required_lengths(request: &MemoryRequest) -> (usize, usize, usize) {
    let rows = request.n + request.nf;
    let nonzeros = request.nea + request.neg;
    let mincw = MIN_LENGTH + request.nxname + request.nfname;
    let miniw = 500 + 20 * rows + 2 * nonzeros;
    let minrw = 600 + 40 * rows + 2 * nonzeros + request.n * request.n;
    (mincw, miniw, minrw)
}

/// Storage inform for a workspace, or `None` when it is large enough.
pub(crate) fn storage_check(workspace: &Workspace, request: &MemoryRequest) -> Option<i32> {
    if workspace.lencw() < MIN_LENGTH
        || workspace.leniw() < MIN_LENGTH
        || workspace.lenrw() < MIN_LENGTH
    {
        return Some(STORAGE_FLOOR);
    }
    let (mincw, miniw, minrw) = required_lengths(request);
    if workspace.lencw() < mincw {
        Some(82)
    } else if workspace.leniw() < miniw {
        Some(83)
    } else if workspace.lenrw() < minrw {
        Some(84)
    } else {
        None
    }
}

/// Open print and summary files.
#[derive(Debug, Default)]
pub(crate) struct Streams {
    print: Option<BufWriter<File>>,
    summary: Option<BufWriter<File>>,
}

impl Streams {
    fn open(config: &StreamConfig) -> Result<Self> {
        Ok(Self {
            print: open_stream("print", config.print_unit, config.print_file.as_deref())?,
            summary: open_stream("summary", config.summary_unit, config.summary_file.as_deref())?,
        })
    }

    pub(crate) fn print(&mut self, args: fmt::Arguments<'_>) {
        write_line(&mut self.print, "print", args);
    }

    pub(crate) fn summary(&mut self, args: fmt::Arguments<'_>) {
        write_line(&mut self.summary, "summary", args);
    }

    fn close(&mut self) {
        for (name, stream) in [("print", &mut self.print), ("summary", &mut self.summary)] {
            if let Some(mut writer) = stream.take() {
                if let Err(err) = writer.flush() {
                    tracing::warn!(
                        component = "reference",
                        operation = "close_streams",
                        status = "error",
                        stream = name,
                        error = %err,
                        "Failed to flush stream"
                    );
                }
            }
        }
    }
}

fn open_stream(
    name: &'static str,
    unit: i32,
    path: Option<&Path>,
) -> Result<Option<BufWriter<File>>> {
    match path {
        Some(path) if unit > 0 => File::create(path)
            .map(|file| Some(BufWriter::new(file)))
            .map_err(|err| SnoptError::stream(name, path.display(), err)),
        _ => Ok(None),
    }
}

fn write_line(stream: &mut Option<BufWriter<File>>, name: &str, args: fmt::Arguments<'_>) {
    if let Some(writer) = stream {
        if let Err(err) = writeln!(writer, "{args}") {
            tracing::warn!(
                component = "reference",
                operation = "write",
                status = "error",
                stream = name,
                error = %err,
                "Stream write failed; disabling stream"
            );
            *stream = None;
        }
    }
}

/// Pure-Rust solver behind the SNOPT calling convention.
#[derive(Debug, Default)]
pub struct ReferenceSolver {
    options: ReferenceOptions,
    streams: Streams,
}

impl ReferenceSolver {
    /// Creates a solver with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a solver with explicit options.
    pub fn with_options(options: ReferenceOptions) -> Self {
        Self {
            options,
            streams: Streams::default(),
        }
    }

    /// Current options, including those set through the setters.
    pub fn options(&self) -> &ReferenceOptions {
        &self.options
    }
}

impl SnoptInterface for ReferenceSolver {
    fn open_streams(&mut self, streams: &StreamConfig) -> Result<()> {
        self.streams.close();
        self.streams = Streams::open(streams)?;
        Ok(())
    }

    fn close_streams(&mut self) {
        self.streams.close();
    }

    fn memory_requirements(
        &mut self,
        request: &MemoryRequest,
        workspace: &mut Workspace,
    ) -> MemoryEstimate {
        let (mincw, miniw, minrw) = required_lengths(request);
        let inform = if workspace.lencw() < MIN_LENGTH
            || workspace.leniw() < MIN_LENGTH
            || workspace.lenrw() < MIN_LENGTH
        {
            STORAGE_FLOOR
        } else {
            MEMORY_OK
        };
        MemoryEstimate {
            inform,
            mincw,
            miniw,
            minrw,
        }
    }

    fn set_option_string(&mut self, key: &str, value: &str, _workspace: &mut Workspace) -> usize {
        self.options.set_string(key, value)
    }

    fn set_option_int(&mut self, key: &str, value: i64, _workspace: &mut Workspace) -> usize {
        self.options.set_int(key, value)
    }

    fn set_option_real(&mut self, key: &str, value: f64, _workspace: &mut Workspace) -> usize {
        self.options.set_real(key, value)
    }

    fn solve(&mut self, call: SolveCall<'_>, usrfun: &mut Usrfun<'_>) -> SolveReport {
        algorithm::run(&self.options, &mut self.streams, call, usrfun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(n: usize, nf: usize, neg: usize) -> MemoryRequest {
        MemoryRequest {
            nf,
            n,
            nxname: 1,
            nfname: 1,
            nea: 0,
            neg,
        }
    }

    #[test]
    fn test_option_keys_are_case_and_space_insensitive() {
        let mut solver = ReferenceSolver::new();
        let mut ws = Workspace::with_lengths(500, 500, 500);
        assert_eq!(solver.set_option_int("major  ITERATIONS limit", 7, &mut ws), 0);
        assert_eq!(solver.set_option_real("Major optimality tolerance", 1e-8, &mut ws), 0);
        assert_eq!(solver.set_option_string("Print solution", "Yes", &mut ws), 0);
        assert_eq!(solver.set_option_string("Iterations limit", "42", &mut ws), 0);

        let options = solver.options();
        assert_eq!(options.major_iterations_limit, 7);
        assert_eq!(options.major_optimality_tolerance, 1e-8);
        assert!(options.print_solution);
        assert_eq!(options.iterations_limit, 42);
    }

    #[test]
    fn test_option_errors() {
        let mut solver = ReferenceSolver::new();
        let mut ws = Workspace::with_lengths(500, 500, 500);
        assert_eq!(solver.set_option_int("Hessian frequency", 3, &mut ws), 1);
        assert_eq!(solver.set_option_int("Iterations limit", -3, &mut ws), 1);
        assert_eq!(solver.set_option_real("Penalty parameter", -1.0, &mut ws), 1);
        assert_eq!(solver.set_option_string("Print solution", "maybe", &mut ws), 1);
        assert_eq!(solver.options(), &ReferenceOptions::default());
    }

    #[test]
    fn test_workspace_lengths_are_recorded() {
        let mut solver = ReferenceSolver::new();
        let mut ws = Workspace::with_lengths(500, 500, 500);
        assert_eq!(solver.set_option_int("Total real workspace", 2400, &mut ws), 0);
        assert_eq!(solver.options().total_real_workspace, Some(2400));
    }

    #[test]
    fn test_memory_formula() {
        let mut solver = ReferenceSolver::new();
        let mut ws = Workspace::with_lengths(500, 500, 500);
        let estimate = solver.memory_requirements(&request(2, 2, 4), &mut ws);
        assert_eq!(estimate.inform, MEMORY_OK);
        assert_eq!(estimate.mincw, 502);
        assert_eq!(estimate.miniw, 500 + 80 + 8);
        assert_eq!(estimate.minrw, 600 + 160 + 8 + 4);

        let mut tiny = Workspace::unchecked(10, 10, 10);
        assert_eq!(
            solver.memory_requirements(&request(2, 2, 4), &mut tiny).inform,
            STORAGE_FLOOR
        );
    }

    #[test]
    fn test_storage_checks() {
        let req = request(2, 2, 4);
        let (mincw, miniw, minrw) = required_lengths(&req);
        assert_eq!(storage_check(&Workspace::unchecked(mincw, miniw, minrw), &req), None);
        assert_eq!(storage_check(&Workspace::unchecked(499, miniw, minrw), &req), Some(81));
        assert_eq!(storage_check(&Workspace::unchecked(500, miniw, minrw), &req), Some(82));
        assert_eq!(storage_check(&Workspace::unchecked(mincw, miniw - 1, minrw), &req), Some(83));
        assert_eq!(storage_check(&Workspace::unchecked(mincw, miniw, minrw - 1), &req), Some(84));
    }

    #[test]
    fn test_streams_write_files() {
        let dir = std::env::temp_dir().join(format!("nlpbridge-streams-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let print = dir.join("run.out");

        let mut solver = ReferenceSolver::new();
        solver
            .open_streams(&StreamConfig::new().with_print_file(&print))
            .unwrap();
        solver.streams.print(format_args!("hello {}", 42));
        solver.close_streams();
        solver.close_streams();

        let contents = std::fs::read_to_string(&print).unwrap();
        assert_eq!(contents, "hello 42\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unopenable_stream() {
        let mut solver = ReferenceSolver::new();
        let config =
            StreamConfig::new().with_summary_file("/nonexistent-dir/nlpbridge/summary.out");
        let err = solver.open_streams(&config).unwrap_err();
        assert!(matches!(err, SnoptError::Stream { stream: "summary", .. }));
    }
}
