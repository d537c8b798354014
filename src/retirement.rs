//! Retirement accumulation projection.

use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};
use crate::worksheet::Calculator;
use crate::{equivalent_monthly_rate, future_value};

/// Share of the accumulated capital treated as sustainably withdrawable each month.
pub const SAFE_WITHDRAWAL_RATE: Decimal = dec!(0.004);

/// Youngest accepted `current_age`.
pub const MINIMUM_AGE: u32 = 18;

/// Input parameters for a retirement projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetirementParameters {
    /// Age today, in years; at least [`MINIMUM_AGE`].
    pub current_age: u32,
    /// Must be after `current_age`.
    pub retirement_age: u32,
    /// Monthly income wanted once retired.
    pub desired_monthly_income: Decimal,
    /// Capital already saved.
    pub current_savings: Decimal,
    /// Contribution paid at the end of every month until retirement.
    pub monthly_contribution: Decimal,
    /// Annual return as a decimal (0.06 = 6%).
    pub annual_return_rate: Decimal,
}

/// Projected capital at retirement and the income it sustains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementResult {
    pub months_to_retirement: u32,
    /// Savings and contributions compounded up to retirement.
    pub projected_final_value: Decimal,
    /// `projected_final_value` times [`SAFE_WITHDRAWAL_RATE`].
    pub estimated_monthly_income: Decimal,
    /// Current savings plus every monthly contribution.
    pub total_contributed: Decimal,
    pub total_return: Decimal,
    /// Desired income not covered by the estimated income; zero when covered.
    pub income_gap: Decimal,
}

/// Retirement projection behind the [`Calculator`] seam.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetirementCalculator;

impl Calculator for RetirementCalculator {
    type Params = RetirementParameters;
    type Output = RetirementResult;

    fn compute(params: &RetirementParameters) -> CalcResult<RetirementResult> {
        compute(params)
    }
}

fn validate(params: &RetirementParameters) -> CalcResult<()> {
    if params.current_age < MINIMUM_AGE {
        return Err(CalcError::invalid("current_age", "must be at least 18"));
    }
    if params.retirement_age <= params.current_age {
        return Err(CalcError::invalid(
            "retirement_age",
            "must be greater than current_age",
        ));
    }
    if params.desired_monthly_income <= Decimal::ZERO {
        return Err(CalcError::invalid(
            "desired_monthly_income",
            "must be greater than zero",
        ));
    }
    if params.current_savings < Decimal::ZERO {
        return Err(CalcError::invalid("current_savings", "must not be negative"));
    }
    if params.monthly_contribution < Decimal::ZERO {
        return Err(CalcError::invalid("monthly_contribution", "must not be negative"));
    }
    if params.annual_return_rate < Decimal::ZERO {
        return Err(CalcError::invalid("annual_return_rate", "must not be negative"));
    }
    Ok(())
}

/// Projects savings and contributions up to retirement and the monthly income the
/// resulting capital sustains at [`SAFE_WITHDRAWAL_RATE`].
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] when the retirement horizon is not positive,
/// the client is younger than 18 or any amount or rate is negative, and
/// [`CalcError::Overflow`] when the horizon or the projected value leaves its range.
pub fn compute(params: &RetirementParameters) -> CalcResult<RetirementResult> {
    validate(params)?;

    let months_to_retirement = (params.retirement_age - params.current_age)
        .checked_mul(12)
        .ok_or_else(|| CalcError::overflow("months to retirement"))?;
    let monthly_rate = equivalent_monthly_rate(params.annual_return_rate);

    let projected_final_value = future_value(
        params.current_savings,
        params.monthly_contribution,
        monthly_rate,
        months_to_retirement,
    )?;
    let estimated_monthly_income = projected_final_value * SAFE_WITHDRAWAL_RATE;
    let total_contributed =
        params.current_savings + params.monthly_contribution * Decimal::from(months_to_retirement);
    let income_gap = (params.desired_monthly_income - estimated_monthly_income).max(Decimal::ZERO);

    if !income_gap.is_zero() {
        warn!(
            "estimated retirement income {} falls short of the desired {}",
            estimated_monthly_income.round_dp(2),
            params.desired_monthly_income
        );
    }
    debug!(
        "retirement: months={} monthly_rate={} projected={}",
        months_to_retirement, monthly_rate, projected_final_value
    );

    Ok(RetirementResult {
        months_to_retirement,
        projected_final_value,
        estimated_monthly_income,
        total_contributed,
        total_return: projected_final_value - total_contributed,
        income_gap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RetirementParameters {
        RetirementParameters {
            current_age: 30,
            retirement_age: 65,
            desired_monthly_income: dec!(10_000),
            current_savings: dec!(50_000),
            monthly_contribution: dec!(1_000),
            annual_return_rate: dec!(0.06),
        }
    }

    #[test]
    fn test_reference_scenario() {
        let result = compute(&params()).unwrap();

        assert_eq!(result.months_to_retirement, 420);
        assert_eq!(result.total_contributed, dec!(470_000));
        assert!((result.projected_final_value - dec!(1_757_908.31)).abs() < dec!(100));
        assert!((result.estimated_monthly_income - dec!(7_031.63)).abs() < dec!(0.5));
        assert!(result.total_return > Decimal::ZERO);
        assert!((result.income_gap - dec!(2_968.37)).abs() < dec!(0.5));
    }

    #[test]
    fn test_withdrawal_rate_is_fixed() {
        let mut input = params();
        input.annual_return_rate = dec!(0.12);
        let result = compute(&input).unwrap();
        assert_eq!(
            result.estimated_monthly_income,
            result.projected_final_value * dec!(0.004)
        );
    }

    #[test]
    fn test_zero_return_only_accumulates_contributions() {
        let mut input = params();
        input.annual_return_rate = Decimal::ZERO;
        let result = compute(&input).unwrap();

        assert_eq!(result.projected_final_value, dec!(470_000));
        assert_eq!(result.total_return, Decimal::ZERO);
        assert_eq!(result.estimated_monthly_income, dec!(1_880));
    }

    #[test]
    fn test_covered_income_has_no_gap() {
        let mut input = params();
        input.desired_monthly_income = dec!(5_000);
        let result = compute(&input).unwrap();
        assert_eq!(result.income_gap, Decimal::ZERO);
    }

    #[test]
    fn test_non_positive_horizon_fails_fast() {
        let mut input = params();
        input.retirement_age = 30;
        match compute(&input) {
            Err(CalcError::InvalidInput { field, .. }) => assert_eq!(field, "retirement_age"),
            other => panic!("expected invalid input, got {:?}", other),
        }

        input.retirement_age = 25;
        assert!(compute(&input).is_err());
    }

    #[test]
    fn test_minor_rejected() {
        let mut input = params();
        input.current_age = 17;
        assert!(compute(&input).is_err());
    }

    #[test]
    fn test_horizon_out_of_range_is_an_error() {
        let mut input = params();
        input.retirement_age = u32::MAX;
        assert!(matches!(compute(&input), Err(CalcError::Overflow { .. })));

        input.retirement_age = 330;
        input.annual_return_rate = dec!(0.3);
        assert!(matches!(compute(&input), Err(CalcError::Overflow { .. })));
    }
}
