use crate::domain::market::{Mover, TopMovers};
use crate::ingest::types::CoinMarket;

pub const MIN_MARKET_CAP_FOR_MOVERS: f64 = 100_000_000.0;
pub const TOP_MOVERS_COUNT: usize = 8;

/// Biggest 24h gainers and losers among coins above the market-cap floor.
///
/// Each side holds `TOP_MOVERS_COUNT / 2` coins; with fewer eligible coins
/// than that the two lists overlap.
pub fn top_movers(coins: &[CoinMarket]) -> TopMovers {
    let mut eligible: Vec<(&CoinMarket, f64)> = coins
        .iter()
        .filter(|c| c.market_cap.unwrap_or(0.0) >= MIN_MARKET_CAP_FOR_MOVERS)
        .filter_map(|c| {
            c.price_change_percentage_24h
                .filter(|v| v.is_finite())
                .map(|change| (c, change))
        })
        .collect();

    eligible.sort_by(|a, b| b.1.total_cmp(&a.1));

    let half = TOP_MOVERS_COUNT / 2;
    let gainers = eligible.iter().take(half).map(to_mover).collect();
    let losers = eligible.iter().rev().take(half).map(to_mover).collect();

    TopMovers { gainers, losers }
}

/// Percentage of coins with a positive 24h change; coins with no change data
/// count towards the total. `None` for an empty list.
pub fn market_breadth(coins: &[CoinMarket]) -> Option<f64> {
    if coins.is_empty() {
        return None;
    }
    let positive = coins
        .iter()
        .filter(|c| c.price_change_percentage_24h.is_some_and(|v| v > 0.0))
        .count();
    let breadth = positive as f64 / coins.len() as f64 * 100.0;

    tracing::info!(
        breadth,
        positive,
        total = coins.len(),
        "market breadth"
    );
    Some(breadth)
}

fn to_mover((coin, change): &(&CoinMarket, f64)) -> Mover {
    Mover {
        symbol: coin.symbol.to_uppercase(),
        name: coin.name.clone(),
        price_change_24h: *change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(symbol: &str, market_cap: Option<f64>, change: Option<f64>) -> CoinMarket {
        CoinMarket {
            id: symbol.to_string(),
            symbol: symbol.to_string(),
            name: symbol.to_uppercase(),
            current_price: Some(1.0),
            market_cap,
            price_change_percentage_24h: change,
        }
    }

    #[test]
    fn movers_skip_small_caps_and_missing_changes() {
        let big = Some(5e9);
        let coins = vec![
            coin("a", big, Some(12.0)),
            coin("b", big, Some(-8.0)),
            coin("c", big, Some(3.0)),
            coin("d", big, Some(-1.0)),
            coin("e", big, Some(7.0)),
            coin("f", big, Some(-15.0)),
            coin("g", big, Some(0.5)),
            coin("h", big, Some(-3.0)),
            coin("i", big, Some(1.5)),
            coin("small", Some(5e7), Some(80.0)),
            coin("nodata", big, None),
            coin("nocap", None, Some(-90.0)),
        ];

        let m = top_movers(&coins);
        let g: Vec<&str> = m.gainers.iter().map(|x| x.symbol.as_str()).collect();
        let l: Vec<&str> = m.losers.iter().map(|x| x.symbol.as_str()).collect();
        assert_eq!(g, vec!["A", "E", "C", "I"]);
        assert_eq!(l, vec!["F", "B", "H", "D"]);
        assert_eq!(m.losers[0].price_change_24h, -15.0);
    }

    #[test]
    fn breadth_counts_positive_share_of_all_coins() {
        let coins = vec![
            coin("a", None, Some(1.0)),
            coin("b", None, Some(0.0)),
            coin("c", None, Some(-2.0)),
            coin("d", None, None),
        ];
        assert_eq!(market_breadth(&coins), Some(25.0));
        assert_eq!(market_breadth(&[]), None);
    }
}
