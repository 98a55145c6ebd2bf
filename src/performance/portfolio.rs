//! Portfolio-level aggregation of per-symbol results

use rust_decimal::Decimal;

use super::lots::SymbolResult;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Portfolio totals across all evaluated symbols
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioPerformance {
    pub today_total: Decimal,
    pub total: Decimal,
    pub today_percent: Decimal,
    pub total_percent: Decimal,
}

/// Sum per-symbol results into portfolio totals
///
/// Absent metrics count as zero for summation. Percentages fall back to
/// zero for portfolios without positive value or unrealized cost, so an
/// all-cash or empty portfolio reads as flat rather than undefined.
pub fn aggregate<'a>(results: impl IntoIterator<Item = &'a SymbolResult>) -> PortfolioPerformance {
    let mut today_total = Decimal::ZERO;
    let mut total = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;
    let mut unrealized_cost = Decimal::ZERO;

    for result in results {
        if let Some(today) = result.today {
            today_total += today;
        }
        if let Some(symbol_total) = result.total {
            total += symbol_total;
        }
        if let Some(value) = result.value {
            total_value += value;
        }
        if let Some(cost) = result.unrealized_cost {
            unrealized_cost += cost;
        }
    }

    let today_denominator = total_value - today_total;
    let today_percent = if total_value > Decimal::ZERO && !today_denominator.is_zero() {
        today_total / today_denominator * HUNDRED
    } else {
        Decimal::ZERO
    };

    let total_percent = if unrealized_cost > Decimal::ZERO {
        total / unrealized_cost * HUNDRED
    } else {
        Decimal::ZERO
    };

    PortfolioPerformance {
        today_total,
        total,
        today_percent,
        total_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn symbol_result(
        today: Option<Decimal>,
        total: Option<Decimal>,
        value: Option<Decimal>,
        unrealized_cost: Option<Decimal>,
    ) -> SymbolResult {
        SymbolResult {
            transactions: Vec::new(),
            today,
            today_percent: None,
            total,
            total_percent: None,
            value,
            cost: Decimal::ZERO,
            unrealized_cost,
            realized: None,
            realized_percent: None,
            alltime: None,
            alltime_percent: None,
        }
    }

    #[test]
    fn test_aggregate_sums_across_symbols() {
        let a = symbol_result(
            Some(dec!(30)),
            Some(dec!(360)),
            Some(dec!(960)),
            Some(dec!(600)),
        );
        let b = symbol_result(
            Some(dec!(10)),
            Some(dec!(40)),
            Some(dec!(240)),
            Some(dec!(200)),
        );

        let perf = aggregate([&a, &b]);

        assert_eq!(perf.today_total, dec!(40));
        assert_eq!(perf.total, dec!(400));
        // 40 / (1200 - 40) * 100
        assert_eq!(perf.today_percent.round_dp(4), dec!(3.4483));
        assert_eq!(perf.total_percent, dec!(50));
    }

    #[test]
    fn test_aggregate_treats_absent_metrics_as_zero() {
        let closed = symbol_result(None, None, None, None);
        let open = symbol_result(
            Some(dec!(5)),
            Some(dec!(20)),
            Some(dec!(105)),
            Some(dec!(100)),
        );

        let perf = aggregate([&closed, &open]);

        assert_eq!(perf.today_total, dec!(5));
        assert_eq!(perf.total, dec!(20));
        assert_eq!(perf.total_percent, dec!(20));
    }

    #[test]
    fn test_zero_value_portfolio_has_zero_percentages() {
        let closed = symbol_result(None, None, None, None);

        let perf = aggregate([&closed]);

        assert_eq!(perf.today_total, dec!(0));
        assert_eq!(perf.total, dec!(0));
        assert_eq!(perf.today_percent, dec!(0));
        assert_eq!(perf.total_percent, dec!(0));
    }

    #[test]
    fn test_empty_portfolio() {
        let results: Vec<SymbolResult> = Vec::new();
        let perf = aggregate(&results);
        assert_eq!(perf.today_percent, dec!(0));
        assert_eq!(perf.total_percent, dec!(0));
    }

    #[test]
    fn test_today_total_equal_to_value_is_boundary_guarded() {
        // Denominator (value - today) collapses to zero; percentage falls
        // back to zero instead of dividing.
        let degenerate = symbol_result(
            Some(dec!(100)),
            Some(dec!(100)),
            Some(dec!(100)),
            Some(dec!(50)),
        );

        let perf = aggregate([&degenerate]);

        assert_eq!(perf.today_percent, dec!(0));
        assert_eq!(perf.total_percent, dec!(200));
    }
}
