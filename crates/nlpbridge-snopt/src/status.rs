//! Termination codes.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coarse classification of a termination code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationCategory {
    /// Optimality conditions satisfied
    Optimal,
    /// Feasible point found
    FeasiblePoint,
    /// Requested accuracy could not be achieved
    AccuracyNotAchieved,
    /// The problem appears to be infeasible
    Infeasible,
    /// The problem appears to be unbounded
    Unbounded,
    /// An iteration or size limit was reached
    ResourceLimit,
    /// Numerical difficulties
    NumericalDifficulty,
    /// User derivatives appear to be incorrect
    DerivativeError,
    /// The user function is undefined where it was needed
    UserFunctionError,
    /// The user requested a stop
    UserStop,
    /// Workspace too small
    StorageError,
    /// Invalid input
    InputError,
    /// Internal solver error
    InternalError,
    /// Code not in the table
    Unknown,
}

impl TerminationCategory {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::FeasiblePoint => "feasible_point",
            Self::AccuracyNotAchieved => "accuracy_not_achieved",
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::ResourceLimit => "resource_limit",
            Self::NumericalDifficulty => "numerical_difficulty",
            Self::DerivativeError => "derivative_error",
            Self::UserFunctionError => "user_function_error",
            Self::UserStop => "user_stop",
            Self::StorageError => "storage_error",
            Self::InputError => "input_error",
            Self::InternalError => "internal_error",
            Self::Unknown => "unknown",
        }
    }

    /// True when the final point is worth reporting to the caller.
    pub fn has_solution(self) -> bool {
        matches!(
            self,
            Self::Optimal | Self::FeasiblePoint | Self::AccuracyNotAchieved | Self::ResourceLimit
        )
    }
}

impl fmt::Display for TerminationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use TerminationCategory as C;

/// Every code the solver may return.
pub const TERMINATION_TABLE: [(i32, TerminationCategory, &str); 32] = [
    (1, C::Optimal, "optimality conditions satisfied"),
    (2, C::FeasiblePoint, "feasible point found"),
    (3, C::AccuracyNotAchieved, "requested accuracy could not be achieved"),
    (11, C::Infeasible, "infeasible linear constraints"),
    (12, C::Infeasible, "infeasible linear equalities"),
    (13, C::Infeasible, "nonlinear infeasibilities minimized"),
    (14, C::Infeasible, "linear infeasibilities minimized"),
    (15, C::Infeasible, "infeasible linear constraints in QP subproblem"),
    (21, C::Unbounded, "unbounded objective"),
    (22, C::Unbounded, "constraint violation limit reached"),
    (31, C::ResourceLimit, "iteration limit reached"),
    (32, C::ResourceLimit, "major iteration limit reached"),
    (33, C::ResourceLimit, "the superbasics limit is too small"),
    (41, C::NumericalDifficulty, "current point cannot be improved"),
    (42, C::NumericalDifficulty, "singular basis"),
    (43, C::NumericalDifficulty, "cannot satisfy the general constraints"),
    (44, C::NumericalDifficulty, "ill-conditioned null-space basis"),
    (51, C::DerivativeError, "incorrect objective derivatives"),
    (52, C::DerivativeError, "incorrect constraint derivatives"),
    (61, C::UserFunctionError, "undefined function at the first feasible point"),
    (62, C::UserFunctionError, "undefined function at the initial point"),
    (63, C::UserFunctionError, "unable to proceed into undefined region"),
    (71, C::UserStop, "terminated during function evaluation"),
    (74, C::UserStop, "terminated from monitor routine"),
    (81, C::StorageError, "work arrays must have at least 500 elements"),
    (82, C::StorageError, "not enough character storage"),
    (83, C::StorageError, "not enough integer storage"),
    (84, C::StorageError, "not enough real storage"),
    (91, C::InputError, "invalid input argument"),
    (92, C::InputError, "basis file dimensions do not match this problem"),
    (141, C::InternalError, "wrong number of basic variables"),
    (142, C::InternalError, "error in basis package"),
];

/// A decoded termination code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TerminationCode {
    /// Raw inform value
    pub code: i32,
    /// Classification
    pub category: TerminationCategory,
    /// Fixed message
    #[cfg_attr(feature = "serde", serde(skip_deserializing))]
    pub message: &'static str,
}

impl TerminationCode {
    /// Looks up a raw inform value; unknown codes map to `Unknown`.
    pub fn from_inform(code: i32) -> Self {
        TERMINATION_TABLE
            .iter()
            .find(|(c, _, _)| *c == code)
            .map_or(
                Self {
                    code,
                    category: C::Unknown,
                    message: "unknown termination code",
                },
                |&(code, category, message)| Self {
                    code,
                    category,
                    message,
                },
            )
    }

    /// True for the optimal category.
    pub fn is_optimal(&self) -> bool {
        self.category == C::Optimal
    }
}

impl fmt::Display for TerminationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EXIT {} ({}): {}", self.code, self.category, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_codes_are_unique() {
        let codes: HashSet<_> = TERMINATION_TABLE.iter().map(|(c, _, _)| *c).collect();
        assert_eq!(codes.len(), TERMINATION_TABLE.len());
    }

    #[test]
    fn test_families() {
        let cases = [
            (1, C::Optimal),
            (2, C::FeasiblePoint),
            (3, C::AccuracyNotAchieved),
            (13, C::Infeasible),
            (22, C::Unbounded),
            (32, C::ResourceLimit),
            (41, C::NumericalDifficulty),
            (52, C::DerivativeError),
            (62, C::UserFunctionError),
            (74, C::UserStop),
            (84, C::StorageError),
            (91, C::InputError),
            (142, C::InternalError),
        ];
        for (code, category) in cases {
            assert_eq!(TerminationCode::from_inform(code).category, category, "code {code}");
        }
    }

    #[test]
    fn test_unknown_codes() {
        for code in [0, 4, 16, 72, 100, 143, -1] {
            let decoded = TerminationCode::from_inform(code);
            assert_eq!(decoded.category, C::Unknown);
            assert_eq!(decoded.code, code);
        }
    }

    #[test]
    fn test_category_strings() {
        assert_eq!(C::Optimal.as_str(), "optimal");
        assert_eq!(C::UserFunctionError.to_string(), "user_function_error");
        assert!(C::Optimal.has_solution());
        assert!(!C::Infeasible.has_solution());
    }

    #[test]
    fn test_display() {
        let decoded = TerminationCode::from_inform(1);
        assert!(decoded.is_optimal());
        assert_eq!(
            decoded.to_string(),
            "EXIT 1 (optimal): optimality conditions satisfied"
        );
    }
}
