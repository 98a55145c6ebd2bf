//! FIFO lot-matching engine
//!
//! Matches sell transactions against prior buy lots in date order,
//! apportions realized gain, and derives today/total/all-time metrics for
//! the remaining open position from a current quote.
//!
//! The engine is pure computation: it takes an immutable transaction list
//! plus an optional quote snapshot and produces a parallel sequence of
//! derived annotations. Nothing is cached across calls, so evaluating the
//! same inputs twice yields identical results.

use chrono::Datelike;
use rust_decimal::Decimal;

use crate::db::{Transaction, TransactionType};
use crate::quotes::QuoteSnapshot;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Derived annotations for a buy lot within one evaluation
///
/// `sold_amount` and `realized` accumulate while later sells are matched;
/// the market fields are `None` for a fully closed lot or when no quote is
/// available.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyDetails {
    pub sold_amount: Decimal,
    pub realized: Decimal,
    pub realized_percent: Option<Decimal>,
    pub cost: Decimal,
    pub unrealized_cost: Option<Decimal>,
    pub value: Option<Decimal>,
    pub today: Option<Decimal>,
    pub today_percent: Option<Decimal>,
    pub total: Option<Decimal>,
    pub total_percent: Option<Decimal>,
}

/// Derived annotations for a sell transaction
///
/// `sold` is the amount actually matched against available buy lots. It
/// may be less than the sell amount when prior buy quantity was
/// insufficient; the shortfall is deliberately silent, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct SellDetails {
    pub sold: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LotDetails {
    Buy(BuyDetails),
    Sell(SellDetails),
}

/// A transaction paired with its derived annotations
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedTransaction {
    pub transaction: Transaction,
    pub details: LotDetails,
}

/// Per-instrument evaluation output
///
/// `transactions` is most-recent-first for display. Aggregate fields are
/// `None` when there is no meaningful metric, which is distinct from zero:
/// a symbol with no open position has no "today" gain rather than a zero
/// one.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolResult {
    pub transactions: Vec<CalculatedTransaction>,
    pub today: Option<Decimal>,
    pub today_percent: Option<Decimal>,
    pub total: Option<Decimal>,
    pub total_percent: Option<Decimal>,
    pub value: Option<Decimal>,
    pub cost: Decimal,
    pub unrealized_cost: Option<Decimal>,
    pub realized: Option<Decimal>,
    pub realized_percent: Option<Decimal>,
    pub alltime: Option<Decimal>,
    pub alltime_percent: Option<Decimal>,
}

struct BuyState {
    index: usize,
    sold_amount: Decimal,
    realized: Decimal,
    realized_percent: Option<Decimal>,
}

/// Evaluate all transactions of one (portfolio, symbol) pair
///
/// Input order does not matter; transactions are stable-sorted ascending
/// by date, so same-date entries keep their given relative order. With no
/// quote the FIFO matching still runs (realized gain is price-derived) but
/// every market-valued field stays `None`.
pub fn evaluate_symbol(
    transactions: &[Transaction],
    quote: Option<&QuoteSnapshot>,
) -> SymbolResult {
    let mut ordered: Vec<Transaction> = transactions.to_vec();
    ordered.sort_by(|a, b| a.date.cmp(&b.date));

    let mut buys: Vec<BuyState> = ordered
        .iter()
        .enumerate()
        .filter(|(_, tx)| tx.tx_type == TransactionType::Buy)
        .map(|(index, _)| BuyState {
            index,
            sold_amount: Decimal::ZERO,
            realized: Decimal::ZERO,
            realized_percent: None,
        })
        .collect();

    // First pass: consume sells against prior buy lots, oldest first.
    let mut sell_details: Vec<(usize, SellDetails)> = Vec::new();

    for (sell_index, sell) in ordered
        .iter()
        .enumerate()
        .filter(|(_, tx)| tx.tx_type == TransactionType::Sell)
    {
        let mut remaining = sell.amount;

        for buy_state in buys.iter_mut() {
            if remaining.is_zero() {
                break;
            }

            let buy = &ordered[buy_state.index];
            if buy.date > sell.date {
                continue;
            }

            let available = buy.amount - buy_state.sold_amount;
            let matched = available.min(remaining);
            if matched.is_zero() {
                continue;
            }

            buy_state.sold_amount += matched;
            buy_state.realized += matched * (sell.price - buy.price);

            let consumed_cost = buy_state.sold_amount * buy.price;
            buy_state.realized_percent = (!consumed_cost.is_zero())
                .then(|| buy_state.realized / consumed_cost * HUNDRED);

            remaining -= matched;
        }

        sell_details.push((
            sell_index,
            SellDetails {
                sold: sell.amount - remaining,
            },
        ));
    }

    // Second pass: value open lots against the quote and accumulate.
    let mut all_today = Decimal::ZERO;
    let mut all_total = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;
    let mut unrealized_cost = Decimal::ZERO;
    let mut realized = Decimal::ZERO;

    let mut buy_details: Vec<(usize, BuyDetails)> = Vec::with_capacity(buys.len());

    for buy_state in &buys {
        let buy = &ordered[buy_state.index];
        let cost = buy.amount * buy.price;
        let rest_amount = buy.amount - buy_state.sold_amount;

        let mut details = BuyDetails {
            sold_amount: buy_state.sold_amount,
            realized: buy_state.realized,
            realized_percent: buy_state.realized_percent,
            cost,
            unrealized_cost: None,
            value: None,
            today: None,
            today_percent: None,
            total: None,
            total_percent: None,
        };

        if !rest_amount.is_zero() {
            let lot_unrealized_cost = rest_amount * buy.price;
            details.unrealized_cost = Some(lot_unrealized_cost);
            unrealized_cost += lot_unrealized_cost;

            if let Some(quote) = quote {
                let value = rest_amount * quote.close;
                let total = rest_amount * (quote.close - buy.price);
                let total_percent =
                    (!cost.is_zero()).then(|| total / cost * HUNDRED);

                // A position opened on the quote day attributes all of its
                // unrealized gain to "today"; older lots use the
                // instrument's own day-over-day change.
                let (today, today_percent) = if same_calendar_day(buy, quote) {
                    (total, total_percent)
                } else {
                    (
                        value - rest_amount * quote.previous_close,
                        Some(quote.change_percent),
                    )
                };

                details.value = Some(value);
                details.total = Some(total);
                details.total_percent = total_percent;
                details.today = Some(today);
                details.today_percent = today_percent;

                all_today += today;
                all_total += total;
                total_value += value;
            }
        }

        total_cost += cost;
        realized += buy_state.realized;

        buy_details.push((buy_state.index, details));
    }

    let has_active_positions = total_value > Decimal::ZERO;
    // Fully-realized positions with zero gain still have historical cost,
    // hence the second clause.
    let has_realized_gains = realized > Decimal::ZERO || total_cost > unrealized_cost;

    let today_denominator = total_value - all_today;
    let realized_denominator = total_cost - unrealized_cost;

    let mut calculated: Vec<CalculatedTransaction> = {
        let mut annotated: Vec<Option<CalculatedTransaction>> = vec![None; ordered.len()];
        for (index, details) in buy_details {
            annotated[index] = Some(CalculatedTransaction {
                transaction: ordered[index].clone(),
                details: LotDetails::Buy(details),
            });
        }
        for (index, details) in sell_details {
            annotated[index] = Some(CalculatedTransaction {
                transaction: ordered[index].clone(),
                details: LotDetails::Sell(details),
            });
        }
        annotated.into_iter().flatten().collect()
    };

    // Most-recent-first is display order only; matching always ran on the
    // ascending order above.
    calculated.reverse();

    SymbolResult {
        transactions: calculated,
        today: has_active_positions.then_some(all_today),
        today_percent: (has_active_positions && !today_denominator.is_zero())
            .then(|| all_today / today_denominator * HUNDRED),
        total: has_active_positions.then_some(all_total),
        total_percent: (has_active_positions && unrealized_cost > Decimal::ZERO)
            .then(|| all_total / unrealized_cost * HUNDRED),
        value: has_active_positions.then_some(total_value),
        cost: total_cost,
        unrealized_cost: has_active_positions.then_some(unrealized_cost),
        realized: has_realized_gains.then_some(realized),
        realized_percent: (has_realized_gains && realized_denominator > Decimal::ZERO)
            .then(|| realized / realized_denominator * HUNDRED),
        alltime: if has_active_positions {
            Some(realized + all_total)
        } else if has_realized_gains {
            Some(realized)
        } else {
            None
        },
        alltime_percent: (total_cost > Decimal::ZERO).then(|| {
            let open_total = if has_active_positions {
                all_total
            } else {
                Decimal::ZERO
            };
            (realized + open_total) / total_cost * HUNDRED
        }),
    }
}

fn same_calendar_day(buy: &Transaction, quote: &QuoteSnapshot) -> bool {
    let buy_date = buy.date.date();
    let quote_date = quote.timestamp.date();
    buy_date.year() == quote_date.year() && buy_date.ordinal() == quote_date.ordinal()
}
