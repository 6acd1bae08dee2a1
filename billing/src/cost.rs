use db::models::catalog::ModelConfig;
use rust_decimal::Decimal;
use serde::Serialize;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const ONE_MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BilledCost {
    pub provider_cost: Decimal,
    pub markup_amount: Decimal,
    pub billed_cost: Decimal,
}

impl BilledCost {
    pub fn zero() -> Self {
        Self {
            provider_cost: Decimal::ZERO,
            markup_amount: Decimal::ZERO,
            billed_cost: Decimal::ZERO,
        }
    }
}

/// Applies the markup to a raw provider cost.
///
/// `markup_amount = provider_cost * markup_percent / 100` and
/// `billed_cost = provider_cost + markup_amount`. Negative inputs are treated
/// as zero. No rounding happens here; storage keeps ten fractional digits.
pub fn compute_billed_cost(provider_cost: Decimal, markup_percent: Decimal) -> BilledCost {
    let provider_cost = provider_cost.max(Decimal::ZERO);
    let markup_percent = markup_percent.max(Decimal::ZERO);

    let markup_amount = provider_cost * markup_percent / ONE_HUNDRED;
    BilledCost {
        provider_cost,
        markup_amount,
        billed_cost: provider_cost + markup_amount,
    }
}

/// Raw provider cost of a call from per-million token prices.
pub fn provider_cost(model: &ModelConfig, tokens_input: u64, tokens_output: u64) -> Decimal {
    let input = Decimal::from(tokens_input) * model.input_price_per_million;
    let output = Decimal::from(tokens_output) * model.output_price_per_million;
    (input + output) / ONE_MILLION
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn model() -> ModelConfig {
        ModelConfig {
            id: "gpt-4o-mini".to_string(),
            provider: "openai".to_string(),
            input_price_per_million: dec!(0.15),
            output_price_per_million: dec!(0.60),
            active: true,
        }
    }

    #[test]
    fn markup_is_added_on_top_of_provider_cost() {
        let cost = compute_billed_cost(dec!(2.00), dec!(20));

        assert_eq!(cost.markup_amount, dec!(0.40));
        assert_eq!(cost.billed_cost, dec!(2.40));
    }

    #[test]
    fn billed_cost_matches_formula_and_never_undercuts_provider_cost() {
        let costs = [dec!(0), dec!(0.000001), dec!(0.0375), dec!(12.5), dec!(9999.999999)];
        let markups = [dec!(0), dec!(7.5), dec!(20), dec!(100), dec!(250)];

        for provider in costs {
            for markup in markups {
                let cost = compute_billed_cost(provider, markup);
                assert_eq!(cost.billed_cost, provider + provider * markup / dec!(100));
                assert!(cost.billed_cost >= provider);
            }
        }
    }

    #[test]
    fn sub_cent_costs_keep_their_precision() {
        // 1 input token of a model priced at $0.15 per million tokens
        let raw = provider_cost(&model(), 1, 0);
        assert_eq!(raw, dec!(0.00000015));

        let cost = compute_billed_cost(raw, dec!(20));
        assert_eq!(cost.billed_cost, dec!(0.00000018));
    }

    #[test]
    fn negative_inputs_bill_nothing() {
        let cost = compute_billed_cost(dec!(-3), dec!(20));
        assert_eq!(cost, BilledCost::zero());
    }

    #[test]
    fn provider_cost_sums_input_and_output() {
        // 1000 * 0.15 / 1e6 + 500 * 0.60 / 1e6
        assert_eq!(provider_cost(&model(), 1000, 500), dec!(0.00045));
    }
}
