//! Emergency reserve sizing and the time needed to build it.

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};
use crate::worksheet::Calculator;

/// Longest simulated horizon, in months. Anything slower is reported as
/// [`MonthsToTarget::Beyond`].
pub const SIMULATION_HORIZON_MONTHS: u32 = 120;

const RECOMMENDED_TARGET_MONTHS: std::ops::RangeInclusive<u32> = 3..=12;

/// Input parameters for sizing an emergency reserve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyFundParameters {
    pub monthly_income: Decimal,
    pub monthly_expenses: Decimal,
    /// Months of expenses the reserve should cover.
    pub target_months: u32,
    /// Amount already set aside.
    pub current_amount: Decimal,
    /// Added at the end of every simulated month.
    pub monthly_contribution: Decimal,
    /// Monthly return as a percentage (0.5 for 0.5% per month).
    pub monthly_return_rate: Decimal,
}

/// Months until the reserve reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonthsToTarget {
    Within(u32),
    /// Not reached within [`SIMULATION_HORIZON_MONTHS`] ("more than 10 years").
    Beyond,
}

impl MonthsToTarget {
    /// Month count, capped at [`SIMULATION_HORIZON_MONTHS`] for `Beyond`.
    pub fn months(self) -> u32 {
        match self {
            MonthsToTarget::Within(months) => months,
            MonthsToTarget::Beyond => SIMULATION_HORIZON_MONTHS,
        }
    }

    pub fn is_reached(self) -> bool {
        matches!(self, MonthsToTarget::Within(_))
    }
}

/// Reserve target, current progress and the time left to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyFundResult {
    /// `monthly_expenses * target_months`.
    pub target_amount: Decimal,
    /// Share of the target already saved, within 0..=100.
    pub progress_percent: Decimal,
    /// Amount still missing; zero once funded.
    pub shortfall: Decimal,
    pub months_to_target: MonthsToTarget,
    /// Income minus expenses; negative when spending exceeds income.
    pub monthly_surplus: Decimal,
}

/// Emergency reserve calculator behind the [`Calculator`] seam.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmergencyFundCalculator;

impl Calculator for EmergencyFundCalculator {
    type Params = EmergencyFundParameters;
    type Output = EmergencyFundResult;

    fn compute(params: &EmergencyFundParameters) -> CalcResult<EmergencyFundResult> {
        compute(params)
    }
}

fn validate(params: &EmergencyFundParameters) -> CalcResult<()> {
    if params.monthly_income <= Decimal::ZERO {
        return Err(CalcError::invalid("monthly_income", "must be greater than zero"));
    }
    if params.monthly_expenses <= Decimal::ZERO {
        return Err(CalcError::invalid("monthly_expenses", "must be greater than zero"));
    }
    if params.target_months == 0 {
        return Err(CalcError::invalid("target_months", "must be at least one month"));
    }
    if params.current_amount < Decimal::ZERO {
        return Err(CalcError::invalid("current_amount", "must not be negative"));
    }
    if params.monthly_contribution < Decimal::ZERO {
        return Err(CalcError::invalid("monthly_contribution", "must not be negative"));
    }
    if params.monthly_return_rate < Decimal::ZERO {
        return Err(CalcError::invalid("monthly_return_rate", "must not be negative"));
    }
    Ok(())
}

/// Sizes the reserve and simulates, month by month, how long the current amount and
/// contributions take to reach it.
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] when income or expenses are not positive, the
/// target is zero months, or any amount or rate is negative. Returns
/// [`CalcError::Overflow`] when the target or the simulated balance leaves decimal range.
pub fn compute(params: &EmergencyFundParameters) -> CalcResult<EmergencyFundResult> {
    validate(params)?;

    if !RECOMMENDED_TARGET_MONTHS.contains(&params.target_months) {
        warn!(
            "emergency fund target of {} months is outside the recommended 3 to 12",
            params.target_months
        );
    }

    let target_amount = params
        .monthly_expenses
        .checked_mul(Decimal::from(params.target_months))
        .ok_or_else(|| CalcError::overflow("emergency fund target"))?;
    let shortfall = (target_amount - params.current_amount).max(Decimal::ZERO);

    let (progress_percent, months_to_target) = if shortfall.is_zero() {
        (Decimal::ONE_HUNDRED, MonthsToTarget::Within(0))
    } else {
        (
            params.current_amount / target_amount * Decimal::ONE_HUNDRED,
            simulate(params, target_amount)?,
        )
    };

    debug!(
        "emergency fund: target={} current={} progress={}% months_to_target={:?}",
        target_amount, params.current_amount, progress_percent, months_to_target
    );

    Ok(EmergencyFundResult {
        target_amount,
        progress_percent,
        shortfall,
        months_to_target,
        monthly_surplus: params.monthly_income - params.monthly_expenses,
    })
}

/// Month by month: the balance earns the month's return, then the contribution
/// is added.
fn simulate(
    params: &EmergencyFundParameters,
    target_amount: Decimal,
) -> CalcResult<MonthsToTarget> {
    let growth = Decimal::ONE + params.monthly_return_rate / Decimal::ONE_HUNDRED;
    let mut balance = params.current_amount;
    let mut months = 0;

    while balance < target_amount && months < SIMULATION_HORIZON_MONTHS {
        balance = balance
            .checked_mul(growth)
            .and_then(|grown| grown.checked_add(params.monthly_contribution))
            .ok_or_else(|| CalcError::overflow("emergency fund balance"))?;
        months += 1;
    }

    Ok(if balance >= target_amount {
        MonthsToTarget::Within(months)
    } else {
        MonthsToTarget::Beyond
    })
}
