//! `br_calculators` is a Rust library of personal-finance calculators for Brazilian
//! financial planning.
//!
//! It provides five independent, stateless calculators:
//! - **Amortization**: financing schedules under the **SAC** (Sistema de Amortização
//!   Constante) and **Price** (Sistema Francês de Amortização) systems.
//! - **Fixed income**: CDB, LCI, LCA and Treasury yields with the regressive income
//!   tax table applied.
//! - **Emergency fund**: reserve target, progress and months to reach it.
//! - **Portfolio**: weighted expected return and projected value per asset class.
//! - **Retirement**: projected wealth and sustainable monthly income.
//!
//! Every calculator is a pure function from a parameter struct to a result struct.
//! Values are `rust_decimal::Decimal` and are returned unrounded; formatting is left
//! to the caller.
//!
//! ## Usage
//!
//! ```rust
//! use br_calculators::amortization::{self, AmortizationSystem, LoanParameters};
//! use rust_decimal_macros::dec;
//!
//! let params = LoanParameters {
//!     principal: dec!(12_000),
//!     term_months: 12,
//!     monthly_rate: dec!(0.01),
//!     system: AmortizationSystem::ConstantAmortization,
//! };
//!
//! match amortization::compute(&params) {
//!     Ok(result) => {
//!         println!("First payment: {:.2}", result.installment_value);
//!         println!("Total paid:    {:.2}", result.total_paid);
//!     }
//!     Err(e) => eprintln!("Error calculating schedule: {}", e),
//! }
//! ```

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

pub mod amortization;
pub mod emergency_fund;
pub mod error;
pub mod fixed_income;
pub mod portfolio;
pub mod retirement;
pub mod worksheet;

pub use amortization::AmortizationCalculator;
pub use emergency_fund::EmergencyFundCalculator;
pub use error::{CalcError, CalcResult};
pub use fixed_income::FixedIncomeCalculator;
pub use portfolio::PortfolioCalculator;
pub use retirement::RetirementCalculator;
pub use worksheet::{Calculator, Worksheet};

/// Normalizes an annual interest rate percentage to a monthly decimal rate.
///
/// This converts a rate like 10.5% per year into its equivalent effective monthly
/// rate, `(1 + 10.5/100)^(1/12) - 1`, for use in compound interest calculations.
pub fn normalize_annual_interest_rate(input: Decimal) -> Decimal {
    equivalent_monthly_rate(input / Decimal::ONE_HUNDRED)
}

/// Equivalent effective monthly rate of an annual rate given as a decimal fraction
/// (0.06 = 6% per year).
pub fn equivalent_monthly_rate(annual_rate: Decimal) -> Decimal {
    if annual_rate.is_zero() {
        return Decimal::ZERO;
    }
    let exponent = Decimal::ONE / dec!(12);
    (Decimal::ONE + annual_rate).powd(exponent) - Decimal::ONE
}

/// Future value of `present` plus a monthly contribution paid at the end of each month.
///
/// The contribution made at the end of month `i` compounds for the remaining
/// `months - i` periods; each one is grown individually rather than through the
/// closed-form annuity factor.
///
/// # Errors
///
/// Returns [`CalcError::Overflow`] when a compounded amount or the running total
/// leaves decimal range.
pub fn future_value(
    present: Decimal,
    contribution: Decimal,
    monthly_rate: Decimal,
    months: u32,
) -> CalcResult<Decimal> {
    let growth = Decimal::ONE + monthly_rate;
    let grow = |amount: Decimal, periods: u32| {
        if amount.is_zero() {
            return Some(Decimal::ZERO);
        }
        growth
            .checked_powu(periods.into())
            .and_then(|factor| amount.checked_mul(factor))
    };
    let overflow = || CalcError::overflow("future value");

    let mut total = grow(present, months).ok_or_else(overflow)?;
    if contribution.is_zero() {
        return Ok(total);
    }
    for month in 1..=months {
        total = grow(contribution, months - month)
            .and_then(|grown| total.checked_add(grown))
            .ok_or_else(overflow)?;
    }
    Ok(total)
}
