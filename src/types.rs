//! Core domain types for the grid trading system
//!
//! Tiers, lifecycle enumerations, the fixed 19-slot band template, and the
//! decimal rounding policy applied to every ledger field.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of bands in the fixed template.
pub const BAND_COUNT: usize = 19;

/// Profit percentage of a small band.
pub const SMALL_PERCENT: Decimal = dec!(0.05);
/// Profit percentage of a medium band.
pub const MEDIUM_PERCENT: Decimal = dec!(0.15);
/// Profit percentage of a large band.
pub const LARGE_PERCENT: Decimal = dec!(0.30);

/// Offset between a planned price and its trigger price.
pub const TRIGGER_OFFSET: Decimal = dec!(0.02);

/// Fixed tier layout, level 1..=19: 13 small, 4 medium, 2 large.
pub const BAND_TEMPLATE: [Tier; BAND_COUNT] = [
    Tier::Small,  // 1
    Tier::Small,  // 2
    Tier::Small,  // 3
    Tier::Small,  // 4
    Tier::Medium, // 5
    Tier::Small,  // 6
    Tier::Small,  // 7
    Tier::Small,  // 8
    Tier::Medium, // 9
    Tier::Large,  // 10
    Tier::Small,  // 11
    Tier::Small,  // 12
    Tier::Small,  // 13
    Tier::Medium, // 14
    Tier::Small,  // 15
    Tier::Small,  // 16
    Tier::Small,  // 17
    Tier::Medium, // 18
    Tier::Large,  // 19
];

// Scale/rounding policy per ledger field. Prices round half-up, quantities
// and currency amounts truncate, rates round half-up.
const PRICE_SCALE: u32 = 8;
const QUANTITY_SCALE: u32 = 8;
const CASH_SCALE: u32 = 2;
const RATE_SCALE: u32 = 6;

/// Round a price to 8 decimal places, half-up.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncate a quantity to 8 decimal places.
pub fn truncate_quantity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero)
}

/// Truncate a currency amount to 2 decimal places.
pub fn truncate_cash(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CASH_SCALE, RoundingStrategy::ToZero)
}

/// Round a profit rate to 6 decimal places, half-up.
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Band tier, fixing the band's profit percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Small,
    Medium,
    Large,
}

impl Tier {
    pub fn percent(self) -> Decimal {
        match self {
            Tier::Small => SMALL_PERCENT,
            Tier::Medium => MEDIUM_PERCENT,
            Tier::Large => LARGE_PERCENT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Small => "SMALL",
            Tier::Medium => "MEDIUM",
            Tier::Large => "LARGE",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SMALL" => Ok(Tier::Small),
            "MEDIUM" => Ok(Tier::Medium),
            "LARGE" => Ok(Tier::Large),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// Band lifecycle. Exactly two states; the legacy wire values `SOLD` and
/// `WAIT_SELL` are normalized to `WaitBuy` and `Bought` on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandState {
    #[serde(rename = "WAIT_BUY", alias = "SOLD")]
    WaitBuy,
    #[serde(rename = "BOUGHT", alias = "WAIT_SELL")]
    Bought,
}

impl BandState {
    pub fn as_str(self) -> &'static str {
        match self {
            BandState::WaitBuy => "WAIT_BUY",
            BandState::Bought => "BOUGHT",
        }
    }
}

impl fmt::Display for BandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BandState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAIT_BUY" | "SOLD" => Ok(BandState::WaitBuy),
            "BOUGHT" | "WAIT_SELL" => Ok(BandState::Bought),
            other => Err(format!("unknown band state: {other}")),
        }
    }
}

/// Strategy running status. `Stopped` suppresses buys; selling stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyStatus {
    Running,
    Stopped,
}

impl StrategyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyStatus::Running => "RUNNING",
            StrategyStatus::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(StrategyStatus::Running),
            "STOPPED" => Ok(StrategyStatus::Stopped),
            other => Err(format!("unknown strategy status: {other}")),
        }
    }
}

/// Fill direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeType::Buy => "BUY",
            TradeType::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TradeType::Buy),
            "SELL" => Ok(TradeType::Sell),
            other => Err(format!("unknown trade type: {other}")),
        }
    }
}

/// Pricing mode for plan generation and re-anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    /// Anchor-rebound: sell prices are pinned to other bands' buy prices,
    /// small buys descend by an arithmetic step of the base price.
    PriceLock,
    /// Self-contained: small buys descend geometrically, every sell price
    /// derives from the band's own buy price and tier percentage.
    Independent,
}

impl PricingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PricingMode::PriceLock => "PRICE_LOCK",
            PricingMode::Independent => "INDEPENDENT",
        }
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRICE_LOCK" => Ok(PricingMode::PriceLock),
            "INDEPENDENT" => Ok(PricingMode::Independent),
            other => Err(format!("unknown pricing mode: {other}")),
        }
    }
}
