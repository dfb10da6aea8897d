//! Price edit command implementations

use anyhow::Result;
use grid_trading::service::GridService;
use rust_decimal::Decimal;

/// Edit a waiting band's planned buy price; downstream bands re-anchor.
pub fn set_plan_buy_price(
    service: &GridService,
    strategy_id: i64,
    level: u8,
    price: Decimal,
) -> Result<()> {
    service.update_plan_buy_price(strategy_id, level, price)?;
    println!("Plan buy price for level {level} set to {price}; downstream bands re-anchored.");
    Ok(())
}

/// Record the real fill price of a bought band; downstream bands re-anchor.
pub fn set_actual_buy_price(
    service: &GridService,
    strategy_id: i64,
    level: u8,
    price: Decimal,
) -> Result<()> {
    service.update_actual_buy_price(strategy_id, level, price)?;
    println!("Actual buy price for level {level} set to {price}; downstream bands re-anchored.");
    Ok(())
}
