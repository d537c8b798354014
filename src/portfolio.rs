//! Multi-asset portfolio projection and allocation weights.
//!
//! Weights are percentages per [`AssetClass`] and always add up to 100 once
//! normalized. When a rescale does not land on whole numbers, each weight is rounded
//! half-up and a missing remainder goes to the largest weight, ties going to the first
//! class in declaration order. An excess is taken back from the largest weights first,
//! never pushing a weight below zero.

use std::collections::BTreeMap;

use log::{debug, warn};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};
use crate::worksheet::Calculator;
use crate::{future_value, normalize_annual_interest_rate};

/// Asset classes a portfolio is split across. Declaration order breaks rounding ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    FixedIncome,
    Equities,
    RealEstateFunds,
    International,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::FixedIncome,
        AssetClass::Equities,
        AssetClass::RealEstateFunds,
        AssetClass::International,
    ];
}

/// Percentage per asset class.
pub type Allocation = BTreeMap<AssetClass, Decimal>;

/// Input parameters for a portfolio projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioParameters {
    /// Amount invested today.
    pub initial_value: Decimal,
    /// Contribution paid at the end of every month.
    pub monthly_contribution: Decimal,
    /// Projection horizon in whole years.
    pub horizon_years: u32,
    /// Target weights in percent; renormalized when they do not add up to 100.
    pub allocation: Allocation,
    /// Expected annual return in percent for each class. Classes weighted at zero may
    /// be left out.
    pub expected_returns: Allocation,
}

/// Projected value of a portfolio at the end of the horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResult {
    /// Allocation after rescaling to 100.
    pub normalized_weights: Allocation,
    /// Annual percentage.
    pub weighted_annual_return: Decimal,
    /// Effective monthly rate equivalent to `weighted_annual_return`.
    pub monthly_rate: Decimal,
    pub months: u32,
    pub final_value: Decimal,
    /// Growth beyond the initial value and the contributions.
    pub total_return: Decimal,
    /// `final_value` split by the normalized weights.
    pub value_by_asset_class: Allocation,
}

/// Portfolio projection behind the [`Calculator`] seam.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortfolioCalculator;

impl Calculator for PortfolioCalculator {
    type Params = PortfolioParameters;
    type Output = PortfolioResult;

    fn compute(params: &PortfolioParameters) -> CalcResult<PortfolioResult> {
        compute(params)
    }
}

fn validate_weights(weights: &Allocation) -> CalcResult<()> {
    if let Some((class, _)) = weights.iter().find(|(_, weight)| **weight < Decimal::ZERO) {
        return Err(CalcError::InvalidInput {
            field: "allocation".into(),
            reason: format!("weight for {:?} must not be negative", class),
        });
    }
    Ok(())
}

fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn largest_class(weights: &Allocation) -> Option<AssetClass> {
    let mut largest: Option<(AssetClass, Decimal)> = None;
    for (&class, &weight) in weights {
        match largest {
            Some((_, current)) if current >= weight => {}
            _ => largest = Some((class, weight)),
        }
    }
    largest.map(|(class, _)| class)
}

/// Rounds every weight to a whole number and settles the residual so the weights add
/// up to exactly `total`.
///
/// A missing remainder goes to the largest weight. An excess is taken from the largest
/// weights first and never drives one below zero; the rounded weights always cover it
/// because `total` is not negative.
fn round_to_total(scaled: Allocation, total: Decimal) -> Allocation {
    let mut rounded: Allocation = scaled
        .into_iter()
        .map(|(class, weight)| (class, round_half_up(weight)))
        .collect();

    let mut residual = total - rounded.values().copied().sum::<Decimal>();
    if residual > Decimal::ZERO {
        if let Some(weight) = largest_class(&rounded).and_then(|class| rounded.get_mut(&class)) {
            *weight += residual;
        }
    } else if residual < Decimal::ZERO {
        // Stable sort: equal weights keep declaration order.
        let mut by_size: Vec<AssetClass> = rounded.keys().copied().collect();
        by_size.sort_by(|a, b| rounded[b].cmp(&rounded[a]));
        for class in by_size {
            if residual.is_zero() {
                break;
            }
            if let Some(weight) = rounded.get_mut(&class) {
                let taken = (*weight).min(-residual);
                *weight -= taken;
                residual += taken;
            }
        }
    }
    rounded
}

/// Rescales `weights` proportionally so they add up to 100.
///
/// Weights that already add up to exactly 100 are returned unchanged.
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] for a negative weight and
/// [`CalcError::InconsistentAllocation`] when every weight is zero.
pub fn normalize_weights(weights: &Allocation) -> CalcResult<Allocation> {
    validate_weights(weights)?;

    let total: Decimal = weights.values().copied().sum();
    if total.is_zero() {
        return Err(CalcError::InconsistentAllocation(
            "allocation weights add up to zero".into(),
        ));
    }
    if total == Decimal::ONE_HUNDRED {
        return Ok(weights.clone());
    }

    warn!("allocation weights add up to {}, rescaling to 100", total);
    let scaled: Allocation = weights
        .iter()
        .map(|(&class, &weight)| (class, weight * Decimal::ONE_HUNDRED / total))
        .collect();
    Ok(round_to_total(scaled, Decimal::ONE_HUNDRED))
}

/// Sets `changed` to `new_value` and rescales the other classes proportionally so the
/// allocation still adds up to 100. If every other class is at zero, the remainder is
/// split evenly among them.
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] for a negative weight or a `new_value` outside
/// 0..=100, and [`CalcError::InconsistentAllocation`] when no other class exists.
pub fn rebalance(
    weights: &Allocation,
    changed: AssetClass,
    new_value: Decimal,
) -> CalcResult<Allocation> {
    validate_weights(weights)?;
    if new_value < Decimal::ZERO || new_value > Decimal::ONE_HUNDRED {
        return Err(CalcError::invalid("new_value", "must be between 0 and 100"));
    }

    let others: Allocation = weights
        .iter()
        .filter(|(class, _)| **class != changed)
        .map(|(&class, &weight)| (class, weight))
        .collect();
    if others.is_empty() {
        return Err(CalcError::InconsistentAllocation(format!(
            "no asset class besides {:?} to absorb the change",
            changed
        )));
    }

    let remaining = Decimal::ONE_HUNDRED - new_value;
    let others_total: Decimal = others.values().copied().sum();
    let scaled: Allocation = if others_total.is_zero() {
        let share = remaining / Decimal::from(others.len() as u64);
        others.keys().map(|&class| (class, share)).collect()
    } else {
        others
            .iter()
            .map(|(&class, &weight)| (class, weight * remaining / others_total))
            .collect()
    };

    let mut rebalanced = round_to_total(scaled, remaining);
    rebalanced.insert(changed, new_value);
    Ok(rebalanced)
}

/// Weight-weighted average of the expected returns, in percent. Classes weighted at
/// zero contribute nothing and need no expected return.
fn weighted_return(weights: &Allocation, expected_returns: &Allocation) -> CalcResult<Decimal> {
    let mut weighted = Decimal::ZERO;
    for (class, weight) in weights {
        if weight.is_zero() {
            continue;
        }
        let expected = expected_returns.get(class).ok_or_else(|| CalcError::InvalidInput {
            field: "expected_returns".into(),
            reason: format!("missing expected return for {:?}", class),
        })?;
        if *expected < Decimal::ZERO {
            return Err(CalcError::InvalidInput {
                field: "expected_returns".into(),
                reason: format!("expected return for {:?} must not be negative", class),
            });
        }
        weighted += weight * expected / Decimal::ONE_HUNDRED;
    }
    Ok(weighted)
}

/// Normalizes the allocation, blends the expected returns and projects the initial
/// value plus monthly contributions over the horizon.
///
/// # Errors
///
/// Returns [`CalcError::InvalidInput`] for negative amounts, a zero horizon, or a
/// weighted class without a non-negative expected return.
/// [`CalcError::InconsistentAllocation`] comes from [`normalize_weights`], and
/// [`CalcError::Overflow`] when the horizon or the projected value leaves its range.
pub fn compute(params: &PortfolioParameters) -> CalcResult<PortfolioResult> {
    if params.initial_value < Decimal::ZERO {
        return Err(CalcError::invalid("initial_value", "must not be negative"));
    }
    if params.monthly_contribution < Decimal::ZERO {
        return Err(CalcError::invalid("monthly_contribution", "must not be negative"));
    }
    if params.horizon_years == 0 {
        return Err(CalcError::invalid("horizon_years", "must be at least one year"));
    }

    let normalized_weights = normalize_weights(&params.allocation)?;
    let weighted_annual_return = weighted_return(&normalized_weights, &params.expected_returns)?;
    let monthly_rate = normalize_annual_interest_rate(weighted_annual_return);
    let months = params
        .horizon_years
        .checked_mul(12)
        .ok_or_else(|| CalcError::overflow("portfolio horizon in months"))?;

    let final_value = future_value(
        params.initial_value,
        params.monthly_contribution,
        monthly_rate,
        months,
    )?;
    let total_return =
        final_value - params.initial_value - params.monthly_contribution * Decimal::from(months);

    let value_by_asset_class = normalized_weights
        .iter()
        .map(|(&class, &weight)| (class, final_value * (weight / Decimal::ONE_HUNDRED)))
        .collect();

    debug!(
        "portfolio: weighted_return={}% months={} final_value={}",
        weighted_annual_return, months, final_value
    );

    Ok(PortfolioResult {
        normalized_weights,
        weighted_annual_return,
        monthly_rate,
        months,
        final_value,
        total_return,
        value_by_asset_class,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn allocation(weights: [Decimal; 4]) -> Allocation {
        AssetClass::ALL.into_iter().zip(weights).collect()
    }

    fn params() -> PortfolioParameters {
        PortfolioParameters {
            initial_value: dec!(10_000),
            monthly_contribution: Decimal::ZERO,
            horizon_years: 1,
            allocation: allocation([dec!(40), dec!(30), dec!(20), dec!(10)]),
            expected_returns: allocation([dec!(10), dec!(16), dec!(8), dec!(6)]),
        }
    }

    #[test]
    fn test_weighted_return_and_growth() {
        let result = compute(&params()).unwrap();

        // 0.4 * 10 + 0.3 * 16 + 0.2 * 8 + 0.1 * 6
        assert_eq!(result.weighted_annual_return, dec!(11));
        assert_eq!(result.months, 12);
        assert!((result.final_value - dec!(11_100)).abs() < dec!(0.05));
        assert!((result.total_return - dec!(1_100)).abs() < dec!(0.05));
    }

    #[test]
    fn test_value_by_asset_class_adds_up_to_final_value() {
        let mut input = params();
        input.monthly_contribution = dec!(500);
        input.horizon_years = 20;
        let result = compute(&input).unwrap();

        let total: Decimal = result.value_by_asset_class.values().copied().sum();
        assert!((total - result.final_value).abs() < dec!(0.000001));
        let fixed_income = result.value_by_asset_class[&AssetClass::FixedIncome];
        assert!((fixed_income - result.final_value * dec!(0.4)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_contributions_without_return_are_not_gains() {
        let mut input = params();
        input.expected_returns = allocation([Decimal::ZERO; 4]);
        input.monthly_contribution = dec!(100);
        let result = compute(&input).unwrap();

        assert_eq!(result.final_value, dec!(11_200));
        assert_eq!(result.total_return, Decimal::ZERO);
    }

    #[test]
    fn test_normalize_keeps_exact_hundred() {
        let weights = allocation([dec!(12.5), dec!(37.5), dec!(25), dec!(25)]);
        assert_eq!(normalize_weights(&weights).unwrap(), weights);
    }

    #[test]
    fn test_normalize_rescales_proportionally() {
        let weights = allocation([dec!(50), dec!(30), dec!(30), dec!(10)]);
        let expected = allocation([dec!(42), dec!(25), dec!(25), dec!(8)]);
        assert_eq!(normalize_weights(&weights).unwrap(), expected);
    }

    #[test]
    fn test_normalize_residual_goes_to_largest() {
        // 33.33 each rounds to 99; the first largest class takes the missing point.
        let weights = allocation([Decimal::ZERO, dec!(1), dec!(1), dec!(1)]);
        let expected = allocation([dec!(0), dec!(34), dec!(33), dec!(33)]);
        assert_eq!(normalize_weights(&weights).unwrap(), expected);
    }

    #[test]
    fn test_normalize_rounds_half_up() {
        // 2.5 / 32.5 / 32.5 / 32.5 rounds to 3 / 33 / 33 / 33 = 102.
        let weights = allocation([dec!(5), dec!(65), dec!(65), dec!(65)]);
        let expected = allocation([dec!(3), dec!(31), dec!(33), dec!(33)]);
        let normalized = normalize_weights(&weights).unwrap();
        assert_eq!(normalized, expected);
        assert_eq!(normalized.values().copied().sum::<Decimal>(), dec!(100));
    }

    #[test]
    fn test_normalize_rejects_bad_weights() {
        assert!(matches!(
            normalize_weights(&allocation([Decimal::ZERO; 4])),
            Err(CalcError::InconsistentAllocation(_))
        ));
        assert!(matches!(
            normalize_weights(&allocation([dec!(110), dec!(-10), dec!(0), dec!(0)])),
            Err(CalcError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_rebalance_scales_the_others() {
        let weights = allocation([dec!(40), dec!(30), dec!(20), dec!(10)]);
        let rebalanced = rebalance(&weights, AssetClass::Equities, dec!(50)).unwrap();
        let expected = allocation([dec!(29), dec!(50), dec!(14), dec!(7)]);
        assert_eq!(rebalanced, expected);
    }

    #[test]
    fn test_rebalance_residual_stays_off_the_changed_class() {
        let weights = allocation([dec!(10), dec!(10), dec!(10), dec!(70)]);
        let rebalanced = rebalance(&weights, AssetClass::International, Decimal::ZERO).unwrap();
        let expected = allocation([dec!(34), dec!(33), dec!(33), dec!(0)]);
        assert_eq!(rebalanced, expected);
    }

    #[test]
    fn test_rebalance_splits_evenly_when_others_are_empty() {
        let weights = allocation([dec!(100), dec!(0), dec!(0), dec!(0)]);
        let rebalanced = rebalance(&weights, AssetClass::FixedIncome, dec!(70)).unwrap();
        let expected = allocation([dec!(70), dec!(10), dec!(10), dec!(10)]);
        assert_eq!(rebalanced, expected);
    }

    #[test]
    fn test_rebalance_agrees_with_normalize() {
        // Same proportions reached through either path.
        let weights = allocation([dec!(40), dec!(30), dec!(20), dec!(10)]);
        let rebalanced = rebalance(&weights, AssetClass::FixedIncome, dec!(40)).unwrap();
        assert_eq!(rebalanced, normalize_weights(&weights).unwrap());
    }

    #[test]
    fn test_rebalance_excess_never_goes_negative() {
        // The others scale to 0.5 each and round up to 3 for a remainder of 1.5.
        let weights = allocation([dec!(25), dec!(25), dec!(25), dec!(25)]);
        let rebalanced = rebalance(&weights, AssetClass::International, dec!(98.5)).unwrap();
        let expected = allocation([dec!(0), dec!(0.5), dec!(1), dec!(98.5)]);

        assert_eq!(rebalanced, expected);
        assert!(rebalanced.values().all(|weight| *weight >= Decimal::ZERO));
        assert_eq!(normalize_weights(&rebalanced).unwrap(), rebalanced);
    }

    #[test]
    fn test_rebalanced_weights_feed_back_into_compute() {
        let mut input = params();
        input.allocation =
            rebalance(&input.allocation, AssetClass::FixedIncome, dec!(99.5)).unwrap();
        let result = compute(&input).unwrap();

        let total: Decimal = result.normalized_weights.values().copied().sum();
        assert_eq!(total, dec!(100));
        assert!(result.normalized_weights.values().all(|weight| *weight >= Decimal::ZERO));
    }

    #[test]
    fn test_rebalance_rejects_out_of_range_value() {
        let weights = allocation([dec!(40), dec!(30), dec!(20), dec!(10)]);
        assert!(rebalance(&weights, AssetClass::Equities, dec!(101)).is_err());
        assert!(rebalance(&weights, AssetClass::Equities, dec!(-1)).is_err());
    }

    #[test]
    fn test_missing_expected_return_rejected() {
        let mut input = params();
        input.expected_returns.remove(&AssetClass::International);
        match compute(&input) {
            Err(CalcError::InvalidInput { field, .. }) => assert_eq!(field, "expected_returns"),
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_weight_class_needs_no_expected_return() {
        let mut input = params();
        input.allocation = allocation([dec!(50), dec!(30), dec!(20), Decimal::ZERO]);
        input.expected_returns.remove(&AssetClass::International);
        let result = compute(&input).unwrap();

        // 0.5 * 10 + 0.3 * 16 + 0.2 * 8
        assert_eq!(result.weighted_annual_return, dec!(11.4));
        assert_eq!(result.value_by_asset_class[&AssetClass::International], Decimal::ZERO);
    }

    #[test]
    fn test_horizon_out_of_range_is_an_error() {
        let mut input = params();
        input.horizon_years = u32::MAX;
        assert!(matches!(compute(&input), Err(CalcError::Overflow { .. })));

        input.horizon_years = 300;
        input.expected_returns = allocation([dec!(30); 4]);
        input.monthly_contribution = dec!(1_000);
        assert!(matches!(compute(&input), Err(CalcError::Overflow { .. })));
    }
}
