//! Downstream re-anchoring after an authoritative buy-price change
//!
//! When a band's buy price becomes authoritative at an actual value (a
//! confirmed fill or a manual plan edit), every not-yet-filled band above it
//! is repriced under the strategy's pricing mode so the ladder stays
//! internally consistent. Filled bands are frozen, but their actual prices
//! still seed the anchors for everything below them.

use rust_decimal::Decimal;
use tracing::debug;

use crate::model::Strategy;
use crate::plan::{complete_band, price_band, Anchors};
use crate::types::BAND_COUNT;

/// Recompute every unfilled band at `level >= start_level`.
///
/// `pinned_buy` pins the start band's buy price (the plan-edit path, where
/// recomputation starts at the edited band itself). The confirmed-fill path
/// passes `None` and starts at the filled band's level + 1, so the fill
/// price enters through the prefix scan instead.
///
/// Running this twice with the same inputs yields identical bands.
pub fn reanchor_from(strategy: &mut Strategy, start_level: u8, pinned_buy: Option<Decimal>) {
    if start_level as usize > BAND_COUNT {
        return;
    }
    strategy.sort_bands();

    let base_price = strategy.base_price;
    let mode = strategy.pricing_mode;

    // Seed anchors from everything below the start level, preferring actual
    // fill prices over planned ones.
    let mut anchors = Anchors::new(base_price);
    for band in strategy.bands.iter().filter(|b| b.level < start_level) {
        anchors.fold(band.tier, band.effective_buy_price());
    }

    for band in &mut strategy.bands {
        if band.level < start_level {
            continue;
        }

        // Filled bands keep their prices but still anchor the rest.
        if band.is_filled() && !(band.level == start_level && pinned_buy.is_some()) {
            anchors.fold(band.tier, band.effective_buy_price());
            continue;
        }

        let pin = if band.level == start_level {
            pinned_buy
        } else {
            None
        };
        let (buy, sell) = price_band(mode, base_price, band.level, band.tier, &anchors, pin);
        anchors.fold(band.tier, buy);

        let spec = complete_band(band.level, band.tier, buy, sell, band.buy_amount);
        debug!(
            level = band.level,
            old_buy = %band.buy_price,
            new_buy = %spec.buy_price,
            new_sell = %spec.sell_price,
            "band re-anchored"
        );
        band.buy_price = spec.buy_price;
        band.sell_price = spec.sell_price;
        band.buy_trigger_price = spec.buy_trigger_price;
        band.sell_trigger_price = spec.sell_trigger_price;
        band.buy_quantity = spec.buy_quantity;
        band.sell_amount = spec.sell_amount;
        band.profit = spec.profit;
        band.profit_rate = spec.profit_rate;
    }
}
