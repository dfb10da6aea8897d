//! Fixed-template grid plan generation
//!
//! Builds the 19-band ladder around a base price in a single pass over the
//! tier template, threading three anchor prices through the iteration. The
//! same per-band pricing rules and economics are reused verbatim by the
//! re-anchoring engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    round_price, round_rate, truncate_cash, truncate_quantity, PricingMode, Tier, BAND_COUNT,
    BAND_TEMPLATE, SMALL_PERCENT, TRIGGER_OFFSET,
};

/// Fully priced band specification, one per template slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandSpec {
    pub level: u8,
    pub tier: Tier,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub buy_trigger_price: Decimal,
    pub sell_trigger_price: Decimal,
    pub buy_amount: Decimal,
    pub buy_quantity: Decimal,
    pub sell_amount: Decimal,
    pub profit: Decimal,
    pub profit_rate: Decimal,
}

/// Running anchor prices threaded through one pass over the ladder.
#[derive(Debug, Clone)]
pub(crate) struct Anchors {
    pub last_small_buy: Decimal,
    pub last_medium_buy: Option<Decimal>,
    pub second_medium_buy: Option<Decimal>,
    medium_seen: u32,
}

impl Anchors {
    pub fn new(base_price: Decimal) -> Self {
        Anchors {
            last_small_buy: base_price,
            last_medium_buy: None,
            second_medium_buy: None,
            medium_seen: 0,
        }
    }

    /// Fold a band's authoritative buy price into the tracker for its tier.
    /// Large bands anchor nothing downstream.
    pub fn fold(&mut self, tier: Tier, buy_price: Decimal) {
        match tier {
            Tier::Small => self.last_small_buy = buy_price,
            Tier::Medium => {
                self.medium_seen += 1;
                self.last_medium_buy = Some(buy_price);
                if self.medium_seen == 2 {
                    self.second_medium_buy = Some(buy_price);
                }
            }
            Tier::Large => {}
        }
    }
}

/// Compute one band's buy and sell price from the current anchors under the
/// given pricing mode. `pinned_buy` overrides the buy price (plan edits).
/// The caller folds the returned buy price into the anchors afterwards.
pub(crate) fn price_band(
    mode: PricingMode,
    base_price: Decimal,
    level: u8,
    tier: Tier,
    anchors: &Anchors,
    pinned_buy: Option<Decimal>,
) -> (Decimal, Decimal) {
    match mode {
        PricingMode::PriceLock => price_lock_band(base_price, level, tier, anchors, pinned_buy),
        PricingMode::Independent => independent_band(base_price, level, tier, anchors, pinned_buy),
    }
}

/// Anchor-rebound pricing: small bands descend by an arithmetic step of the
/// base price and sell back into the band above; medium and large bands
/// inherit the latest small buy and sell back to their anchors.
fn price_lock_band(
    base_price: Decimal,
    level: u8,
    tier: Tier,
    anchors: &Anchors,
    pinned_buy: Option<Decimal>,
) -> (Decimal, Decimal) {
    let small_step = base_price * SMALL_PERCENT;
    match tier {
        Tier::Small => {
            if level == 1 {
                let buy = pinned_buy.unwrap_or(base_price);
                let sell = round_price(base_price + small_step);
                (buy, sell)
            } else {
                let buy =
                    pinned_buy.unwrap_or_else(|| round_price(anchors.last_small_buy - small_step));
                (buy, anchors.last_small_buy)
            }
        }
        Tier::Medium => {
            let buy = pinned_buy.unwrap_or(anchors.last_small_buy);
            // The first medium (level 5) rebounds to the base price.
            let sell = if level == 5 {
                base_price
            } else {
                anchors.last_medium_buy.unwrap_or(base_price)
            };
            (buy, sell)
        }
        Tier::Large => {
            let buy = pinned_buy.unwrap_or(anchors.last_small_buy);
            // First large (level 10) rebounds to base; the second rebounds
            // to the second medium's buy price.
            let sell = if level == 10 {
                base_price
            } else {
                anchors.second_medium_buy.unwrap_or(base_price)
            };
            (buy, sell)
        }
    }
}

/// Self-contained pricing: small buys descend geometrically, and every sell
/// price derives from the band's own buy price and tier percentage.
fn independent_band(
    base_price: Decimal,
    level: u8,
    tier: Tier,
    anchors: &Anchors,
    pinned_buy: Option<Decimal>,
) -> (Decimal, Decimal) {
    let buy = match tier {
        Tier::Small if level == 1 => pinned_buy.unwrap_or(base_price),
        Tier::Small => pinned_buy
            .unwrap_or_else(|| round_price(anchors.last_small_buy * (Decimal::ONE - SMALL_PERCENT))),
        Tier::Medium | Tier::Large => pinned_buy.unwrap_or(anchors.last_small_buy),
    };
    let sell = round_price(buy * (Decimal::ONE + tier.percent()));
    (buy, sell)
}

/// Derive the dependent figures shared by plan generation and re-anchoring:
/// triggers, quantity, sell amount, profit, and profit rate.
pub(crate) fn complete_band(
    level: u8,
    tier: Tier,
    buy_price: Decimal,
    sell_price: Decimal,
    buy_amount: Decimal,
) -> BandSpec {
    let buy_quantity = truncate_quantity(buy_amount / buy_price);
    let sell_amount = truncate_cash(buy_quantity * sell_price);
    let profit = sell_amount - buy_amount;
    BandSpec {
        level,
        tier,
        buy_price,
        sell_price,
        buy_trigger_price: buy_price + TRIGGER_OFFSET,
        sell_trigger_price: sell_price - TRIGGER_OFFSET,
        buy_amount,
        buy_quantity,
        sell_amount,
        profit,
        profit_rate: round_rate(profit / buy_amount),
    }
}

/// Generate the full 19-band plan in template order.
///
/// Preconditions (validated at the service boundary): `base_price > 0`,
/// `amount_per_band > 0`.
pub fn generate(
    base_price: Decimal,
    amount_per_band: Decimal,
    mode: PricingMode,
) -> Vec<BandSpec> {
    assert!(base_price > Decimal::ZERO, "base price must be positive");
    assert!(
        amount_per_band > Decimal::ZERO,
        "amount per band must be positive"
    );

    let mut anchors = Anchors::new(base_price);
    let mut bands = Vec::with_capacity(BAND_COUNT);
    for (i, tier) in BAND_TEMPLATE.iter().enumerate() {
        let level = (i + 1) as u8;
        let (buy, sell) = price_band(mode, base_price, level, *tier, &anchors, None);
        anchors.fold(*tier, buy);
        bands.push(complete_band(level, *tier, buy, sell, amount_per_band));
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn generates_nineteen_bands_in_template_order() {
        let bands = generate(dec!(1.500), dec!(1500.00), PricingMode::PriceLock);
        assert_eq!(bands.len(), 19);
        for (i, band) in bands.iter().enumerate() {
            assert_eq!(band.level as usize, i + 1);
            assert_eq!(band.tier, BAND_TEMPLATE[i]);
            assert!(band.sell_price > band.buy_price);
        }
    }

    #[test]
    fn price_lock_matches_worked_example() {
        let bands = generate(dec!(1.500), dec!(1500.00), PricingMode::PriceLock);
        assert_eq!(bands[0].buy_price, dec!(1.500));
        assert_eq!(bands[0].sell_price, dec!(1.575));
        assert_eq!(bands[1].buy_price, dec!(1.425));
        assert_eq!(bands[1].sell_price, dec!(1.500));
        assert_eq!(bands[0].buy_quantity, dec!(1000));
        assert_eq!(bands[0].sell_amount, dec!(1575.00));
        assert_eq!(bands[0].profit, dec!(75.00));
        assert_eq!(bands[0].profit_rate, dec!(0.050000));
    }

    #[test]
    fn price_lock_anchors_rebound_to_base() {
        let base = dec!(1.500);
        let bands = generate(base, dec!(1500.00), PricingMode::PriceLock);
        // First medium (level 5) and first large (level 10) sell back to base.
        assert_eq!(bands[4].sell_price, base);
        assert_eq!(bands[9].sell_price, base);
        // Second large (level 19) sells back to the second medium's buy.
        assert_eq!(bands[18].sell_price, bands[8].buy_price);
        // Later mediums sell back to the previous medium's buy.
        assert_eq!(bands[8].sell_price, bands[4].buy_price);
        assert_eq!(bands[13].sell_price, bands[8].buy_price);
        assert_eq!(bands[17].sell_price, bands[13].buy_price);
    }

    #[test]
    fn price_lock_small_bands_form_descending_ladder() {
        let bands = generate(dec!(1.500), dec!(1500.00), PricingMode::PriceLock);
        let step = dec!(1.500) * SMALL_PERCENT;
        // Each small band after the first sells at the previous small's buy.
        assert_eq!(bands[2].buy_price, bands[1].buy_price - step);
        assert_eq!(bands[2].sell_price, bands[1].buy_price);
        // Medium and large bands inherit the latest small buy.
        assert_eq!(bands[4].buy_price, bands[3].buy_price);
        assert_eq!(bands[9].buy_price, bands[7].buy_price);
    }

    #[test]
    fn independent_sell_derives_from_own_buy() {
        let bands = generate(dec!(2.000), dec!(1000.00), PricingMode::Independent);
        for band in &bands {
            let expected = round_price(band.buy_price * (Decimal::ONE + band.tier.percent()));
            assert_eq!(band.sell_price, expected, "level {}", band.level);
        }
    }

    #[test]
    fn independent_small_buys_descend_geometrically() {
        let bands = generate(dec!(2.000), dec!(1000.00), PricingMode::Independent);
        assert_eq!(bands[0].buy_price, dec!(2.000));
        assert_eq!(bands[1].buy_price, round_price(dec!(2.000) * dec!(0.95)));
        assert_eq!(bands[2].buy_price, round_price(bands[1].buy_price * dec!(0.95)));
        // Mediums and larges inherit instead of stepping down.
        assert_eq!(bands[4].buy_price, bands[3].buy_price);
    }

    #[test]
    fn triggers_offset_by_two_cents() {
        let bands = generate(dec!(1.500), dec!(1500.00), PricingMode::PriceLock);
        for band in &bands {
            assert_eq!(band.buy_trigger_price, band.buy_price + TRIGGER_OFFSET);
            assert_eq!(band.sell_trigger_price, band.sell_price - TRIGGER_OFFSET);
        }
    }
}
