//! Cold and warm start state.

use nlpbridge_core::{types::Dimensions, NlpError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Start mode flag as the solver sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(i32)]
pub enum StartMode {
    /// Crash a basis from scratch
    Cold = 0,
    /// Reuse states and multipliers from a previous solve
    Warm = 2,
}

impl StartMode {
    /// Integer flag passed to the solver.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Starting point and basis information for one solve.
///
/// Vectors are handed to the solver as-is; a warm state is never resized
/// or reinterpreted.
///
/// With the `serde` feature a state can be saved and restored, so a warm
/// start taken from [`Outputs`](crate::Outputs) can resume in a later
/// process. Restoring checks that the vectors agree with each other, that
/// `ns` is non-negative and that every state code lies in `0..=5`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "StartRecord"))]
pub struct StartState {
    mode: StartMode,
    ns: i32,
    x: Vec<f64>,
    xstate: Vec<i32>,
    xmul: Vec<f64>,
    f: Vec<f64>,
    fstate: Vec<i32>,
    fmul: Vec<f64>,
}

impl StartState {
    /// Cold start at `x0` with zeroed states and multipliers.
    pub fn cold(x0: Vec<f64>, nf: usize) -> Self {
        let nx = x0.len();
        Self {
            mode: StartMode::Cold,
            ns: 0,
            x: x0,
            xstate: vec![0; nx],
            xmul: vec![0.0; nx],
            f: vec![0.0; nf],
            fstate: vec![0; nf],
            fmul: vec![0.0; nf],
        }
    }

    /// Warm start from a previous solve's final state.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn warm(
        ns: i32,
        x: Vec<f64>,
        xstate: Vec<i32>,
        xmul: Vec<f64>,
        f: Vec<f64>,
        fstate: Vec<i32>,
        fmul: Vec<f64>,
    ) -> Self {
        Self {
            mode: StartMode::Warm,
            ns,
            x,
            xstate,
            xmul,
            f,
            fstate,
            fmul,
        }
    }

    /// Start mode.
    pub fn mode(&self) -> StartMode {
        self.mode
    }

    /// Whether this is a warm start.
    pub fn is_warm(&self) -> bool {
        self.mode == StartMode::Warm
    }

    /// Number of superbasic variables.
    pub fn ns(&self) -> i32 {
        self.ns
    }

    /// Starting point.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Variable states.
    pub fn xstate(&self) -> &[i32] {
        &self.xstate
    }

    /// Variable multipliers.
    pub fn xmul(&self) -> &[f64] {
        &self.xmul
    }

    /// Function values.
    pub fn f(&self) -> &[f64] {
        &self.f
    }

    /// Function states.
    pub fn fstate(&self) -> &[i32] {
        &self.fstate
    }

    /// Function multipliers.
    pub fn fmul(&self) -> &[f64] {
        &self.fmul
    }

    /// Checks vector lengths against the problem dimensions.
    pub fn validate(&self, dims: Dimensions) -> Result<()> {
        let nf = dims.nf();
        let checks = [
            ("x", self.x.len(), dims.nx),
            ("xstate", self.xstate.len(), dims.nx),
            ("xmul", self.xmul.len(), dims.nx),
            ("F", self.f.len(), nf),
            ("Fstate", self.fstate.len(), nf),
            ("Fmul", self.fmul.len(), nf),
        ];
        for (what, actual, expected) in checks {
            if actual != expected {
                return Err(NlpError::dimension_mismatch(
                    format!("start {what}"),
                    expected,
                    actual,
                ));
            }
        }
        if self.x.iter().any(|v| !v.is_finite()) {
            return Err(NlpError::invalid_configuration(
                "start x",
                "starting point must be finite",
            ));
        }
        Ok(())
    }
}

/// Largest basis state code the solver accepts on input.
#[cfg(feature = "serde")]
const MAX_STATE_CODE: i32 = 5;

/// Unchecked form of a saved [`StartState`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct StartRecord {
    mode: StartMode,
    ns: i32,
    x: Vec<f64>,
    xstate: Vec<i32>,
    xmul: Vec<f64>,
    f: Vec<f64>,
    fstate: Vec<i32>,
    fmul: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<StartRecord> for StartState {
    type Error = NlpError;

    fn try_from(record: StartRecord) -> Result<Self> {
        let nx = record.x.len();
        let nf = record.f.len();
        let checks = [
            ("xstate", record.xstate.len(), nx),
            ("xmul", record.xmul.len(), nx),
            ("Fstate", record.fstate.len(), nf),
            ("Fmul", record.fmul.len(), nf),
        ];
        for (what, actual, expected) in checks {
            if actual != expected {
                return Err(NlpError::dimension_mismatch(
                    format!("saved start {what}"),
                    expected,
                    actual,
                ));
            }
        }
        if record.ns < 0 {
            return Err(NlpError::invalid_configuration(
                "saved start ns",
                format!("superbasic count {} is negative", record.ns),
            ));
        }
        let states = record.xstate.iter().chain(&record.fstate);
        if let Some(code) = states.copied().find(|c| !(0..=MAX_STATE_CODE).contains(c)) {
            return Err(NlpError::invalid_configuration(
                "saved start states",
                format!("state code {code} outside 0..={MAX_STATE_CODE}"),
            ));
        }

        Ok(Self {
            mode: record.mode,
            ns: record.ns,
            x: record.x,
            xstate: record.xstate,
            xmul: record.xmul,
            f: record.f,
            fstate: record.fstate,
            fmul: record.fmul,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cold_start_is_zeroed() {
        let start = StartState::cold(vec![2.0, 2.0], 2);
        assert_eq!(start.mode(), StartMode::Cold);
        assert_eq!(start.mode().as_i32(), 0);
        assert_eq!(start.xstate(), &[0, 0]);
        assert_eq!(start.fmul(), &[0.0, 0.0]);
        assert_eq!(start.ns(), 0);
        assert!(start.validate(Dimensions::new(2, 1)).is_ok());
    }

    #[test]
    fn test_warm_flag() {
        let start =
            StartState::warm(1, vec![1.0], vec![2], vec![0.0], vec![0.5], vec![3], vec![1.0]);
        assert!(start.is_warm());
        assert_eq!(start.mode().as_i32(), 2);
    }

    #[test]
    fn test_validate_lengths() {
        let start = StartState::cold(vec![1.0, 2.0, 3.0], 2);
        let err = start.validate(Dimensions::new(2, 1)).unwrap_err();
        assert!(matches!(err, NlpError::DimensionMismatch { .. }));

        let err = StartState::cold(vec![1.0, 2.0], 3)
            .validate(Dimensions::new(2, 1))
            .unwrap_err();
        assert!(err.to_string().contains("start F"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_saved_state_round_trip() {
        let start =
            StartState::warm(1, vec![1.0], vec![2], vec![0.0], vec![0.5], vec![3], vec![1.0]);
        let json = serde_json::to_string(&start).unwrap();
        let restored: StartState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, start);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_inconsistent_saved_state_rejected() {
        let short = r#"{"mode":"Warm","ns":0,"x":[1.0,2.0],"xstate":[0],"xmul":[0.0,0.0],
            "f":[0.0],"fstate":[0],"fmul":[0.0]}"#;
        let err = serde_json::from_str::<StartState>(short).unwrap_err();
        assert!(err.to_string().contains("saved start xstate"));

        let negative = r#"{"mode":"Warm","ns":-1,"x":[1.0],"xstate":[0],"xmul":[0.0],
            "f":[0.0],"fstate":[0],"fmul":[0.0]}"#;
        assert!(serde_json::from_str::<StartState>(negative).is_err());

        let bad_code = r#"{"mode":"Warm","ns":0,"x":[1.0],"xstate":[9],"xmul":[0.0],
            "f":[0.0],"fstate":[0],"fmul":[0.0]}"#;
        let err = serde_json::from_str::<StartState>(bad_code).unwrap_err();
        assert!(err.to_string().contains("state code 9"));
    }

    #[test]
    fn test_validate_rejects_non_finite_point() {
        let start = StartState::cold(vec![f64::NAN], 1);
        assert!(start.validate(Dimensions::new(1, 0)).is_err());
    }
}
