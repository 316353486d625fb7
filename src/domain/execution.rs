//! Trade execution and fill simulation.
//!
//! Slippage always works against the trader and is doubled on stop-loss
//! fills. Fees are charged on entry and exit notional.

use crate::domain::position::{ExitReason, Position, Side, Trade};
use crate::domain::strategy::StrategyGene;
use chrono::NaiveDateTime;

/// Long entry (buy): execution_price = close * (1 + slippage)
pub fn apply_slippage_long_entry(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 + slippage)
}

/// Short entry (sell short): execution_price = close * (1 - slippage)
pub fn apply_slippage_short_entry(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 - slippage)
}

/// Exit fill price. Long exits sell lower, short exits buy back higher.
pub fn apply_slippage_exit(side: Side, market_price: f64, slippage: f64, reason: ExitReason) -> f64 {
    let slip = match reason {
        ExitReason::StopLoss => 2.0 * slippage,
        ExitReason::TakeProfit | ExitReason::ExitRule => slippage,
    };
    match side {
        Side::Long => market_price * (1.0 - slip),
        Side::Short => market_price * (1.0 + slip),
    }
}

/// Open a position with the whole balance, net of the entry fee.
pub fn open_position(
    side: Side,
    close: f64,
    balance: f64,
    bar_index: usize,
    time: NaiveDateTime,
    initial_atr: f64,
    gene: &StrategyGene,
) -> Position {
    let entry_price = match side {
        Side::Long => apply_slippage_long_entry(close, gene.slippage_pct),
        Side::Short => apply_slippage_short_entry(close, gene.slippage_pct),
    };
    let size = (balance * (1.0 - gene.fee_pct)) / entry_price;

    Position {
        side,
        entry_price,
        entry_index: bar_index,
        entry_time: time,
        size,
        balance_before: balance,
        initial_atr,
        break_even_active: false,
    }
}

/// Realized PnL of closing `position` at `exit_price`.
///
/// Long: `size * exit * (1 - fee) - balance_before`.
/// Short: `entry_notional - exit_notional - (entry_notional + exit_notional) * fee`.
pub fn realized_pnl(position: &Position, exit_price: f64, fee: f64) -> f64 {
    match position.side {
        Side::Long => position.size * exit_price * (1.0 - fee) - position.balance_before,
        Side::Short => {
            let entry_notional = position.size * position.entry_price;
            let exit_notional = position.size * exit_price;
            entry_notional - exit_notional - (entry_notional + exit_notional) * fee
        }
    }
}

/// Close `position` at a raw market price and produce the trade record.
pub fn close_position(
    position: &Position,
    market_price: f64,
    time: NaiveDateTime,
    reason: ExitReason,
    gene: &StrategyGene,
) -> Trade {
    let exit_price = apply_slippage_exit(position.side, market_price, gene.slippage_pct, reason);
    let pnl = realized_pnl(position, exit_price, gene.fee_pct);
    let roi = if position.balance_before > 0.0 {
        pnl / position.balance_before * 100.0
    } else {
        0.0
    };

    Trade {
        side: position.side,
        entry_time: position.entry_time,
        exit_time: time,
        entry_price: position.entry_price,
        exit_price,
        size: position.size,
        pnl,
        roi,
        exit_reason: reason,
    }
}
