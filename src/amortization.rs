//! Financing schedules under the two main Brazilian amortization systems.
//!
//! - **Price (Sistema Francês de Amortização)**: fixed total payments throughout the
//!   financing period; the interest share shrinks as the balance is paid down.
//! - **SAC (Sistema de Amortização Constante)**: fixed amortization payments,
//!   leading to decreasing total payments over time.

use log::debug;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};
use crate::worksheet::Calculator;

/// Amortization system used to build the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmortizationSystem {
    /// Price table: constant payment.
    FixedInstallment,
    /// SAC table: constant amortization.
    ConstantAmortization,
}

/// Input parameters for a financing schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanParameters {
    /// The principal amount of the loan.
    pub principal: Decimal,
    /// The total number of monthly payments.
    pub term_months: u32,
    /// The effective monthly interest rate as a decimal (0.025 = 2.5%).
    pub monthly_rate: Decimal,
    pub system: AmortizationSystem,
}

/// Represents the payment details for a single month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentRow {
    /// 1-based installment number.
    pub index: u32,
    /// The portion of the payment that goes towards reducing the principal.
    pub amortization: Decimal,
    /// The portion of the payment that covers interest.
    pub interest: Decimal,
    pub payment: Decimal,
    /// The remaining balance of the loan after the payment.
    pub remaining_balance: Decimal,
}

/// Complete schedule and totals for one amortization system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationResult {
    pub system: AmortizationSystem,
    /// The fixed payment under Price; the first (highest) payment under SAC.
    pub installment_value: Decimal,
    /// The last payment; equal to `installment_value` under Price.
    pub last_payment: Decimal,
    pub total_interest: Decimal,
    /// The total amount paid over the lifetime of the loan.
    pub total_paid: Decimal,
    pub schedule: Vec<InstallmentRow>,
}

/// Price and SAC schedules for the same loan, side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemComparison {
    pub principal: Decimal,
    pub price: AmortizationResult,
    pub sac: AmortizationResult,
    /// How much less interest SAC pays than Price.
    pub interest_savings: Decimal,
}

/// Schedule calculator behind the [`Calculator`] seam.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmortizationCalculator;

impl Calculator for AmortizationCalculator {
    type Params = LoanParameters;
    type Output = AmortizationResult;

    fn compute(params: &LoanParameters) -> CalcResult<AmortizationResult> {
        compute(params)
    }
}

fn validate(principal: Decimal, monthly_rate: Decimal, term_months: u32) -> CalcResult<()> {
    if principal <= Decimal::ZERO {
        return Err(CalcError::invalid("principal", "must be greater than zero"));
    }
    if term_months == 0 {
        return Err(CalcError::invalid("term_months", "total months cannot be zero"));
    }
    if monthly_rate < Decimal::ZERO {
        return Err(CalcError::invalid("monthly_rate", "must not be negative"));
    }
    Ok(())
}

/// Builds the full installment schedule for `params`.
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] if the principal is not positive, the term is
/// zero or the rate is negative, and [`CalcError::Overflow`] if the schedule does not
/// fit in decimal range.
pub fn compute(params: &LoanParameters) -> CalcResult<AmortizationResult> {
    validate(params.principal, params.monthly_rate, params.term_months)?;

    let result = match params.system {
        AmortizationSystem::FixedInstallment => {
            price_schedule(params.principal, params.monthly_rate, params.term_months)?
        }
        AmortizationSystem::ConstantAmortization => {
            sac_schedule(params.principal, params.monthly_rate, params.term_months)?
        }
    };

    debug!(
        "{:?} schedule: principal={} rate={} months={} installment={} total_paid={}",
        params.system,
        params.principal,
        params.monthly_rate,
        params.term_months,
        result.installment_value,
        result.total_paid
    );
    Ok(result)
}

/// Calculates and compares the debt trajectory for both Price and SAC systems.
///
/// # Errors
///
/// Same as [`compute`].
pub fn compare_systems(
    principal: Decimal,
    monthly_rate: Decimal,
    term_months: u32,
) -> CalcResult<SystemComparison> {
    validate(principal, monthly_rate, term_months)?;

    let price = price_schedule(principal, monthly_rate, term_months)?;
    let sac = sac_schedule(principal, monthly_rate, term_months)?;
    let interest_savings = price.total_interest - sac.total_interest;

    Ok(SystemComparison {
        principal,
        price,
        sac,
        interest_savings,
    })
}

/// Fixed Price payment: PMT = P * [i(1 + i)^n] / [(1 + i)^n – 1].
///
/// With a zero rate the formula degenerates and the payment is `P / n`.
///
/// # Errors
///
/// Returns [`CalcError::Overflow`] when `(1 + i)^n` or the numerator leaves decimal range.
pub fn payment_for(
    principal: Decimal,
    monthly_rate: Decimal,
    term_months: u32,
) -> CalcResult<Decimal> {
    let months = Decimal::from(term_months);
    if monthly_rate.is_zero() {
        return Ok(principal / months);
    }
    let overflow = || CalcError::overflow("Price payment factor");
    let i_plus_1_pow_n = (Decimal::ONE + monthly_rate)
        .checked_powu(term_months.into())
        .ok_or_else(overflow)?;
    let numerator = monthly_rate
        .checked_mul(i_plus_1_pow_n)
        .and_then(|factor| principal.checked_mul(factor))
        .ok_or_else(overflow)?;
    Ok(numerator / (i_plus_1_pow_n - Decimal::ONE))
}

fn price_schedule(
    principal: Decimal,
    monthly_rate: Decimal,
    term_months: u32,
) -> CalcResult<AmortizationResult> {
    let fixed_payment = payment_for(principal, monthly_rate, term_months)?;

    let mut current_balance = principal;
    let mut schedule = Vec::with_capacity(term_months as usize);

    for index in 1..=term_months {
        let interest = current_balance * monthly_rate;
        let amortization = fixed_payment - interest;
        current_balance -= amortization;
        schedule.push(InstallmentRow {
            index,
            amortization,
            interest,
            payment: fixed_payment,
            remaining_balance: current_balance.max(Decimal::ZERO),
        });
    }

    summarize(AmortizationSystem::FixedInstallment, schedule)
}

fn sac_schedule(
    principal: Decimal,
    monthly_rate: Decimal,
    term_months: u32,
) -> CalcResult<AmortizationResult> {
    let fixed_amortization = principal / Decimal::from(term_months);
    // The first month carries the highest interest.
    principal
        .checked_mul(monthly_rate)
        .and_then(|interest| interest.checked_add(fixed_amortization))
        .ok_or_else(|| CalcError::overflow("SAC first installment"))?;

    let mut current_balance = principal;
    let mut schedule = Vec::with_capacity(term_months as usize);

    for index in 1..=term_months {
        let interest = current_balance * monthly_rate;
        current_balance -= fixed_amortization;
        schedule.push(InstallmentRow {
            index,
            amortization: fixed_amortization,
            interest,
            payment: fixed_amortization + interest,
            remaining_balance: current_balance.max(Decimal::ZERO),
        });
    }

    summarize(AmortizationSystem::ConstantAmortization, schedule)
}

fn checked_total(mut values: impl Iterator<Item = Decimal>, context: &str) -> CalcResult<Decimal> {
    values.try_fold(Decimal::ZERO, |total, value| {
        total.checked_add(value).ok_or_else(|| CalcError::overflow(context))
    })
}

fn summarize(
    system: AmortizationSystem,
    mut schedule: Vec<InstallmentRow>,
) -> CalcResult<AmortizationResult> {
    // Rounding drift of the running balance is absorbed by the last row.
    if let Some(last) = schedule.last_mut() {
        last.remaining_balance = Decimal::ZERO;
    }

    let total_interest = checked_total(schedule.iter().map(|row| row.interest), "total interest")?;
    let total_paid = checked_total(schedule.iter().map(|row| row.payment), "total paid")?;
    let installment_value = schedule.first().map(|row| row.payment).unwrap_or_default();
    let last_payment = schedule.last().map(|row| row.payment).unwrap_or_default();

    Ok(AmortizationResult {
        system,
        installment_value,
        last_payment,
        total_interest,
        total_paid,
        schedule,
    })
}
