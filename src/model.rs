//! Band ledger data model
//!
//! Pure state: the strategy account, its 19 grid bands, and append-only fill
//! records. All mutation lives in the engine modules; this module only offers
//! lookups and derived figures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{BandState, PricingMode, StrategyStatus, Tier, TradeType};

/// Strategy account. Owns its bands and is the unit of serialization,
/// persistence, and mutual exclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub base_price: Decimal,
    pub amount_per_band: Decimal,
    pub max_capital: Decimal,
    pub pricing_mode: PricingMode,
    pub status: StrategyStatus,
    pub last_price: Option<Decimal>,
    pub available_cash: Decimal,
    pub invested_amount: Decimal,
    pub position: Decimal,
    pub realized_profit: Decimal,
    pub created_at: DateTime<Utc>,
    pub bands: Vec<GridBand>,
}

impl Strategy {
    pub fn band(&self, level: u8) -> Option<&GridBand> {
        self.bands.iter().find(|b| b.level == level)
    }

    pub fn band_mut(&mut self, level: u8) -> Option<&mut GridBand> {
        self.bands.iter_mut().find(|b| b.level == level)
    }

    /// Order bands by level ascending. Level is immutable, so this is the
    /// canonical ordering for every pass over the ladder.
    pub fn sort_bands(&mut self) {
        self.bands.sort_by_key(|b| b.level);
    }

    pub fn bought_count(&self) -> usize {
        self.bands
            .iter()
            .filter(|b| b.state == BandState::Bought)
            .count()
    }

    /// Lowest planned buy price across the ladder (the stop-risk floor).
    pub fn lowest_buy_price(&self) -> Option<Decimal> {
        self.bands.iter().map(|b| b.buy_price).min()
    }

    /// Sum of planned per-band profit across the full ladder.
    pub fn expected_profit(&self) -> Decimal {
        self.bands.iter().map(|b| b.profit).sum()
    }
}

/// One rung of the 19-band ladder. A perpetually reusable slot cycling
/// `WaitBuy -> Bought -> WaitBuy`, never consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridBand {
    pub id: i64,
    /// 1..=19, immutable after creation.
    pub level: u8,
    pub tier: Tier,
    pub state: BandState,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub buy_trigger_price: Decimal,
    pub sell_trigger_price: Decimal,
    pub buy_amount: Decimal,
    pub buy_quantity: Decimal,
    pub sell_amount: Decimal,
    pub profit: Decimal,
    pub profit_rate: Decimal,
    /// Confirmed fill price; unset means not yet filled at a real price.
    pub actual_buy_price: Option<Decimal>,
    pub actual_sell_price: Option<Decimal>,
    pub buy_count: u32,
    pub sell_count: u32,
    /// Lifetime fee-adjusted profit from confirmed fills.
    pub actual_profit: Decimal,
}

impl GridBand {
    /// The authoritative buy price: the confirmed fill price when present,
    /// the planned price otherwise.
    pub fn effective_buy_price(&self) -> Decimal {
        self.actual_buy_price.unwrap_or(self.buy_price)
    }

    pub fn is_filled(&self) -> bool {
        self.state == BandState::Bought
    }
}

/// Executed buy or sell, recorded against exactly one band. Append-only;
/// fee corrections amend the stored record rather than replacing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRecord {
    pub id: Option<i64>,
    pub strategy_id: i64,
    pub level: u8,
    pub kind: TradeType,
    pub price: Decimal,
    pub quantity: Decimal,
    pub amount: Decimal,
    pub fee: Decimal,
    pub executed_at: DateTime<Utc>,
    /// Engine-generated fills are simulated; imported confirmed fills are not.
    pub simulated: bool,
}

/// Lifetime fee-adjusted profit of one band, derived from its confirmed
/// (non-simulated) fill history: sell amounts minus buy amounts minus fees.
pub fn band_realized_profit(fills: &[FillRecord]) -> Decimal {
    fills
        .iter()
        .filter(|f| !f.simulated)
        .map(|f| match f.kind {
            TradeType::Buy => -f.amount - f.fee,
            TradeType::Sell => f.amount - f.fee,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fill(kind: TradeType, amount: Decimal, fee: Decimal, simulated: bool) -> FillRecord {
        FillRecord {
            id: None,
            strategy_id: 1,
            level: 3,
            kind,
            price: dec!(1.0),
            quantity: dec!(1.0),
            amount,
            fee,
            executed_at: Utc::now(),
            simulated,
        }
    }

    #[test]
    fn band_profit_is_fee_adjusted() {
        let fills = vec![
            fill(TradeType::Buy, dec!(1500.00), dec!(1.20), false),
            fill(TradeType::Sell, dec!(1575.00), dec!(1.30), false),
        ];
        assert_eq!(band_realized_profit(&fills), dec!(72.50));
    }

    #[test]
    fn band_profit_ignores_simulated_fills() {
        let fills = vec![
            fill(TradeType::Buy, dec!(1500.00), dec!(0), true),
            fill(TradeType::Sell, dec!(1575.00), dec!(0.50), false),
        ];
        assert_eq!(band_realized_profit(&fills), dec!(1574.50));
    }
}
