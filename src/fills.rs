//! Application of externally confirmed fills
//!
//! A confirmed fill arrives already matched to one band (matching heuristics
//! live in the import pipeline, not here). Applying it sets the band's actual
//! price, advances its lifecycle, and for buys re-anchors the downstream
//! ladder. This path never touches the cash ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GridError, Result};
use crate::model::{FillRecord, Strategy};
use crate::reanchor::reanchor_from;
use crate::types::{truncate_cash, truncate_quantity, BandState, TradeType};

/// A confirmed (non-simulated) fill from the import collaborator. Either
/// quantity or amount may be absent; each derives from the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmedFill {
    pub kind: TradeType,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub fee: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// Apply one confirmed fill to the band at `level` and return the record to
/// append. Buys re-anchor everything downstream of the band.
pub fn apply_confirmed_fill(
    strategy: &mut Strategy,
    level: u8,
    fill: &ConfirmedFill,
) -> Result<FillRecord> {
    if fill.price <= Decimal::ZERO {
        return Err(GridError::invalid("fill price must be positive"));
    }
    let (quantity, amount) = resolve_quantity_amount(fill)?;

    let strategy_id = strategy.id;
    let band = strategy
        .band_mut(level)
        .ok_or(GridError::BandNotFound { strategy_id, level })?;

    match fill.kind {
        TradeType::Buy => {
            band.actual_buy_price = Some(fill.price);
            band.buy_count += 1;
            if band.state == BandState::WaitBuy {
                band.state = BandState::Bought;
            }
            info!(
                level,
                price = %fill.price,
                buy_count = band.buy_count,
                "confirmed buy applied"
            );
            reanchor_from(strategy, level + 1, None);
        }
        TradeType::Sell => {
            band.actual_sell_price = Some(fill.price);
            band.sell_count += 1;
            if band.state == BandState::Bought {
                band.state = BandState::WaitBuy;
            }
            info!(
                level,
                price = %fill.price,
                sell_count = band.sell_count,
                "confirmed sell applied"
            );
        }
    }

    Ok(FillRecord {
        id: None,
        strategy_id,
        level,
        kind: fill.kind,
        price: fill.price,
        quantity,
        amount,
        fee: fill.fee,
        executed_at: fill.executed_at,
        simulated: false,
    })
}

fn resolve_quantity_amount(fill: &ConfirmedFill) -> Result<(Decimal, Decimal)> {
    match (fill.quantity, fill.amount) {
        (Some(quantity), Some(amount)) => Ok((quantity, amount)),
        (None, Some(amount)) => Ok((truncate_quantity(amount / fill.price), amount)),
        (Some(quantity), None) => Ok((quantity, truncate_cash(quantity * fill.price))),
        (None, None) => Err(GridError::invalid("fill needs a quantity or an amount")),
    }
}
