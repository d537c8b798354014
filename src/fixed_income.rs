//! Fixed-income yield with the regressive income tax table.

use log::debug;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};
use crate::normalize_annual_interest_rate;
use crate::worksheet::Calculator;

/// Regressive income tax brackets: (maximum term in months, withholding rate).
/// Terms beyond the last bracket pay [`LONG_TERM_TAX_RATE`].
const TAX_BRACKETS: [(u32, Decimal); 3] = [(6, dec!(0.225)), (12, dec!(0.20)), (24, dec!(0.175))];
const LONG_TERM_TAX_RATE: Decimal = dec!(0.15);

/// Fixed-income instrument, serialized as `CDB`, `LCI`, `LCA` or `TREASURY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstrumentType {
    Cdb,
    Lci,
    Lca,
    Treasury,
}

impl InstrumentType {
    /// LCI and LCA are income-tax exempt for individuals.
    pub fn is_tax_exempt(self) -> bool {
        matches!(self, InstrumentType::Lci | InstrumentType::Lca)
    }
}

/// Input parameters for a fixed-income investment held to maturity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedIncomeParameters {
    pub instrument: InstrumentType,
    /// Amount invested; must be positive.
    pub principal: Decimal,
    /// Holding period in months; also selects the tax bracket.
    pub term_months: u32,
    /// Annual rate as a percentage (12.5 for 12.5%).
    pub annual_rate: Decimal,
}

/// Gross and after-tax outcome of a fixed-income investment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedIncomeResult {
    /// Effective monthly rate equivalent to the annual rate.
    pub monthly_rate: Decimal,
    /// Principal compounded over the term, before tax.
    pub final_value: Decimal,
    /// `final_value - principal`.
    pub gross_return: Decimal,
    /// Withholding rate applied to the gross return (zero for LCI/LCA).
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub net_return: Decimal,
    /// Principal plus the return after tax.
    pub net_final_value: Decimal,
}

/// Fixed-income calculator behind the [`Calculator`] seam.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedIncomeCalculator;

impl Calculator for FixedIncomeCalculator {
    type Params = FixedIncomeParameters;
    type Output = FixedIncomeResult;

    fn compute(params: &FixedIncomeParameters) -> CalcResult<FixedIncomeResult> {
        compute(params)
    }
}

/// Income tax withheld on the gross return for a holding period of `term_months`.
pub fn income_tax_rate(instrument: InstrumentType, term_months: u32) -> Decimal {
    if instrument.is_tax_exempt() {
        return Decimal::ZERO;
    }
    TAX_BRACKETS
        .iter()
        .find(|(max_months, _)| term_months <= *max_months)
        .map(|(_, rate)| *rate)
        .unwrap_or(LONG_TERM_TAX_RATE)
}

/// Compounds the principal monthly at the rate equivalent to `annual_rate` and
/// applies the tax bracket for the term.
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] if the principal is not positive, the term is
/// zero or the rate is negative, and [`CalcError::Overflow`] if the compounded value
/// leaves decimal range.
pub fn compute(params: &FixedIncomeParameters) -> CalcResult<FixedIncomeResult> {
    if params.principal <= Decimal::ZERO {
        return Err(CalcError::invalid("principal", "must be greater than zero"));
    }
    if params.term_months == 0 {
        return Err(CalcError::invalid("term_months", "must be at least one month"));
    }
    if params.annual_rate < Decimal::ZERO {
        return Err(CalcError::invalid("annual_rate", "must not be negative"));
    }

    let monthly_rate = normalize_annual_interest_rate(params.annual_rate);
    let final_value = (Decimal::ONE + monthly_rate)
        .checked_powu(params.term_months.into())
        .and_then(|growth| params.principal.checked_mul(growth))
        .ok_or_else(|| CalcError::overflow("fixed-income final value"))?;
    let gross_return = final_value - params.principal;

    let tax_rate = income_tax_rate(params.instrument, params.term_months);
    let tax_amount = gross_return * tax_rate;
    let net_return = gross_return - tax_amount;

    debug!(
        "{:?}: principal={} annual_rate={}% months={} gross={} tax_rate={}",
        params.instrument,
        params.principal,
        params.annual_rate,
        params.term_months,
        gross_return,
        tax_rate
    );

    Ok(FixedIncomeResult {
        monthly_rate,
        final_value,
        gross_return,
        tax_rate,
        tax_amount,
        net_return,
        net_final_value: params.principal + net_return,
    })
}
