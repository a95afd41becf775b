use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// `GET {fng}/?limit=N`
#[derive(Debug, Clone, Deserialize)]
pub struct FearGreedResponse {
    #[serde(default)]
    pub data: Vec<FearGreedItem>,
}

/// The API encodes numbers as strings (`"value": "40"`, `"timestamp": "1551157200"`).
#[derive(Debug, Clone, Deserialize)]
pub struct FearGreedItem {
    #[serde(deserialize_with = "de_u8_from_str_or_num")]
    pub value: u8,
    pub value_classification: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `GET {coingecko}/global`
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalResponse {
    pub data: GlobalData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalData {
    #[serde(default)]
    pub active_cryptocurrencies: u64,
    #[serde(default)]
    pub total_market_cap: BTreeMap<String, f64>,
    #[serde(default)]
    pub total_volume: BTreeMap<String, f64>,
    #[serde(default)]
    pub market_cap_percentage: BTreeMap<String, f64>,
}

/// `GET {coingecko}/simple/price?ids=bitcoin&...`
#[derive(Debug, Clone, Deserialize)]
pub struct SimplePriceResponse {
    pub bitcoin: Option<SimplePriceQuote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplePriceQuote {
    pub usd: Option<f64>,
    pub usd_24h_vol: Option<f64>,
    pub usd_24h_change: Option<f64>,
}

/// One row of `GET {coingecko}/coins/markets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
}

fn de_u8_from_str_or_num<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    let n = match Raw::deserialize(d)? {
        Raw::Num(n) => n,
        Raw::Str(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("not an integer: {s:?}")))?,
    };
    if n > 100 {
        return Err(serde::de::Error::custom(format!(
            "index value out of range: {n}"
        )));
    }
    Ok(n as u8)
}
