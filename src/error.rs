use thiserror::Error;

/// Errors returned by the calculators.
///
/// Inputs are rejected up front rather than producing NaN-like or negative results.
#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    /// A parameter is outside its valid range (non-positive principal, negative rate,
    /// retirement age not after the current age, ...).
    #[error("Invalid input: {field} ({reason})")]
    InvalidInput { field: String, reason: String },

    /// Allocation weights cannot be brought to 100 (all zero, or no class left to
    /// absorb a rebalance).
    #[error("Inconsistent allocation: {0}")]
    InconsistentAllocation(String),

    /// The horizon or amounts are too large for decimal arithmetic.
    #[error("Overflow in {context}")]
    Overflow { context: String },
}

impl CalcError {
    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(context: &str) -> Self {
        CalcError::Overflow {
            context: context.into(),
        }
    }
}

/// Result alias used by every calculator.
pub type CalcResult<T> = Result<T, CalcError>;
