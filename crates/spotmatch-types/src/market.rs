//! Market configuration: precision, limits, fee rates and status.
//!
//! Markets are read-only during a trading session. The engine looks them up
//! by `BASE/QUOTE` symbol through a [`MarketCatalog`].

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fixed::{self, FeeRate};
use crate::{MarketPair, OrderSide, Result, SpotmatchError, constants};

/// Wallet family whose balances fund a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletType {
    Spot,
    Eco,
    Futures,
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spot => write!(f, "SPOT"),
            Self::Eco => write!(f, "ECO"),
            Self::Futures => write!(f, "FUTURES"),
        }
    }
}

/// Whether a market accepts new orders and subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Enabled,
    Disabled,
}

/// Fractional digits for amounts (base currency) and prices (quote currency).
///
/// Costs and fees are denominated in the quote currency and share the
/// price precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    pub amount: u32,
    pub price: u32,
}

/// Inclusive bounds; a missing bound is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRange {
    #[serde(default)]
    pub min: Option<Decimal>,
    #[serde(default)]
    pub max: Option<Decimal>,
}

impl LimitRange {
    fn check(&self, label: &str, value: i128, precision: u32) -> Result<()> {
        if let Some(min) = self.min {
            if value < fixed::from_decimal(min, precision)? {
                return Err(SpotmatchError::InvalidLimits {
                    reason: format!(
                        "{label} {} below minimum {min}",
                        fixed::to_decimal(value, precision)
                    ),
                });
            }
        }
        if let Some(max) = self.max {
            if value > fixed::from_decimal(max, precision)? {
                return Err(SpotmatchError::InvalidLimits {
                    reason: format!(
                        "{label} {} above maximum {max}",
                        fixed::to_decimal(value, precision)
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Amount, price and cost bounds for a market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default)]
    pub amount: LimitRange,
    #[serde(default)]
    pub price: LimitRange,
    #[serde(default)]
    pub cost: LimitRange,
}

/// Per-market configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Base currency (e.g., "BTC").
    pub base: String,
    /// Quote currency (e.g., "USDT").
    pub quote: String,
    pub precision: Precision,
    #[serde(default)]
    pub limits: Limits,
    /// Fee rate charged to the incoming (taker) order.
    pub taker: FeeRate,
    /// Fee rate charged to the resting (maker) order.
    pub maker: FeeRate,
    pub status: MarketStatus,
    #[serde(default = "default_wallet_type")]
    pub wallet_type: WalletType,
}

fn default_wallet_type() -> WalletType {
    WalletType::Spot
}

impl MarketConfig {
    /// Create a default BTC/USDT market config (amount 8, price 2).
    #[must_use]
    pub fn btc_usdt() -> Self {
        Self {
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            precision: Precision {
                amount: 8,
                price: 2,
            },
            limits: Limits {
                amount: LimitRange {
                    min: Some(Decimal::new(1, 8)),
                    max: Some(Decimal::new(1000, 0)),
                },
                price: LimitRange {
                    min: Some(Decimal::new(1, 2)),
                    max: None,
                },
                cost: LimitRange::default(),
            },
            taker: FeeRate::from_raw(100_000), // 0.1%
            maker: FeeRate::from_raw(100_000),
            status: MarketStatus::Enabled,
            wallet_type: WalletType::Spot,
        }
    }

    /// Create a default ETH/USDT market config (amount 6, price 2).
    #[must_use]
    pub fn eth_usdt() -> Self {
        Self {
            base: "ETH".to_string(),
            quote: "USDT".to_string(),
            precision: Precision {
                amount: 6,
                price: 2,
            },
            ..Self::btc_usdt()
        }
    }

    /// Returns the market symbol (e.g., "BTC/USDT").
    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    #[must_use]
    pub fn pair(&self) -> MarketPair {
        MarketPair::new(&self.base, &self.quote)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status == MarketStatus::Enabled
    }

    /// Currency an order on `side` must lock: quote for buys, base for sells.
    #[must_use]
    pub fn locked_currency(&self, side: OrderSide) -> &str {
        match side {
            OrderSide::Buy => &self.quote,
            OrderSide::Sell => &self.base,
        }
    }

    /// Parse a human amount at this market's amount precision.
    pub fn parse_amount(&self, input: &str) -> Result<i128> {
        fixed::to_integer(input, self.precision.amount)
    }

    /// Parse a human price at this market's price precision.
    pub fn parse_price(&self, input: &str) -> Result<i128> {
        fixed::to_integer(input, self.precision.price)
    }

    #[must_use]
    pub fn format_amount(&self, value: i128) -> String {
        fixed::to_decimal(value, self.precision.amount)
    }

    #[must_use]
    pub fn format_price(&self, value: i128) -> String {
        fixed::to_decimal(value, self.precision.price)
    }

    /// Quote cost of `amount` at `price`, rounded down.
    pub fn cost_of(&self, amount: i128, price: i128) -> Result<i128> {
        fixed::mul(
            amount,
            self.precision.amount,
            price,
            self.precision.price,
            self.precision.price,
            fixed::Rounding::Down,
        )
    }

    /// The larger of the taker and maker rates; what a resting buy must
    /// reserve for fees since it may fill either way.
    #[must_use]
    pub fn max_fee_rate(&self) -> FeeRate {
        self.taker.max(self.maker)
    }

    /// Check amount, optional price, and optional cost against [`Limits`].
    pub fn check_limits(&self, amount: i128, price: Option<i128>, cost: Option<i128>) -> Result<()> {
        self.limits
            .amount
            .check("amount", amount, self.precision.amount)?;
        if let Some(price) = price {
            self.limits.price.check("price", price, self.precision.price)?;
        }
        if let Some(cost) = cost {
            self.limits.cost.check("cost", cost, self.precision.price)?;
        }
        Ok(())
    }

    /// Validate the configuration itself (run once at catalog load).
    pub fn validate(&self) -> Result<()> {
        if self.base.is_empty() || self.quote.is_empty() || self.base == self.quote {
            return Err(SpotmatchError::Configuration(format!(
                "invalid currencies for market {}",
                self.symbol()
            )));
        }
        for precision in [self.precision.amount, self.precision.price] {
            if precision > constants::MAX_PRECISION {
                return Err(SpotmatchError::Configuration(format!(
                    "{}: precision {precision} exceeds {}",
                    self.symbol(),
                    constants::MAX_PRECISION
                )));
            }
        }
        let bounds = [
            (&self.limits.amount, self.precision.amount),
            (&self.limits.price, self.precision.price),
            (&self.limits.cost, self.precision.price),
        ];
        for (range, precision) in bounds {
            for bound in [range.min, range.max].into_iter().flatten() {
                fixed::from_decimal(bound, precision).map_err(|e| {
                    SpotmatchError::Configuration(format!("{}: {e}", self.symbol()))
                })?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MarketCatalog
// ---------------------------------------------------------------------------

/// Read-only lookup of market configuration by `BASE/QUOTE` symbol.
#[derive(Debug, Clone, Default)]
pub struct MarketCatalog {
    markets: BTreeMap<String, MarketConfig>,
}

impl MarketCatalog {
    /// Build a catalog, validating every market.
    ///
    /// # Errors
    /// Returns `Configuration` for an invalid market or a duplicate symbol.
    pub fn new(markets: impl IntoIterator<Item = MarketConfig>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for market in markets {
            market.validate()?;
            let symbol = market.symbol();
            if map.insert(symbol.clone(), market).is_some() {
                return Err(SpotmatchError::Configuration(format!(
                    "duplicate market {symbol}"
                )));
            }
        }
        Ok(Self { markets: map })
    }

    /// Look up a market by symbol.
    pub fn get(&self, symbol: &str) -> Result<&MarketConfig> {
        self.markets
            .get(symbol)
            .ok_or_else(|| SpotmatchError::MarketNotFound(symbol.to_string()))
    }

    /// Look up a market that is accepting orders.
    pub fn enabled(&self, symbol: &str) -> Result<&MarketConfig> {
        let market = self.get(symbol)?;
        if !market.is_enabled() {
            return Err(SpotmatchError::MarketDisabled(symbol.to_string()));
        }
        Ok(market)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketConfig> {
        self.markets.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_config_btc_usdt() {
        let cfg = MarketConfig::btc_usdt();
        assert_eq!(cfg.symbol(), "BTC/USDT");
        assert!(cfg.is_enabled());
        assert_eq!(cfg.locked_currency(OrderSide::Buy), "USDT");
        assert_eq!(cfg.locked_currency(OrderSide::Sell), "BTC");
        cfg.validate().unwrap();
    }

    #[test]
    fn parse_and_format_round_trip() {
        let cfg = MarketConfig::btc_usdt();
        let amount = cfg.parse_amount("0.5").unwrap();
        assert_eq!(amount, 50_000_000);
        assert_eq!(cfg.format_amount(amount), "0.50000000");
        assert_eq!(cfg.format_price(cfg.parse_price("100").unwrap()), "100.00");
    }

    #[test]
    fn cost_rounds_down() {
        let cfg = MarketConfig::btc_usdt();
        // 0.5 BTC @ 100.00 = 50.00
        assert_eq!(cfg.cost_of(50_000_000, 10_000).unwrap(), 5_000);
        // 0.00000001 BTC @ 100.00 = 0.000001 -> 0.00
        assert_eq!(cfg.cost_of(1, 10_000).unwrap(), 0);
    }

    #[test]
    fn limits_are_enforced() {
        let cfg = MarketConfig::btc_usdt();
        assert!(cfg.check_limits(100_000_000, Some(10_000), None).is_ok());
        let err = cfg.check_limits(0, Some(10_000), None).unwrap_err();
        assert!(matches!(err, SpotmatchError::InvalidLimits { .. }));
        let too_big = cfg.parse_amount("1001").unwrap();
        assert!(cfg.check_limits(too_big, None, None).is_err());
    }

    #[test]
    fn cost_limit_is_enforced() {
        let mut cfg = MarketConfig::btc_usdt();
        cfg.limits.cost.min = Some(Decimal::new(10, 0));
        assert!(cfg.check_limits(100_000_000, Some(500), Some(500)).is_err());
        assert!(cfg.check_limits(100_000_000, Some(1_000), Some(1_000)).is_ok());
    }

    #[test]
    fn catalog_lookup() {
        let mut disabled = MarketConfig::eth_usdt();
        disabled.status = MarketStatus::Disabled;
        let catalog = MarketCatalog::new([MarketConfig::btc_usdt(), disabled]).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.enabled("BTC/USDT").is_ok());
        assert!(matches!(
            catalog.enabled("ETH/USDT"),
            Err(SpotmatchError::MarketDisabled(_))
        ));
        assert!(matches!(
            catalog.get("DOGE/USDT"),
            Err(SpotmatchError::MarketNotFound(_))
        ));
    }

    #[test]
    fn catalog_rejects_duplicates_and_bad_limits() {
        assert!(MarketCatalog::new([MarketConfig::btc_usdt(), MarketConfig::btc_usdt()]).is_err());
        let mut bad = MarketConfig::btc_usdt();
        bad.limits.amount.min = Some(Decimal::new(1, 9));
        assert!(MarketCatalog::new([bad]).is_err());
    }

    #[test]
    fn market_config_serde_roundtrip() {
        let cfg = MarketConfig::btc_usdt();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: MarketConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.base, back.base);
        assert_eq!(cfg.precision, back.precision);
        assert_eq!(cfg.taker, back.taker);
        assert_eq!(cfg.limits, back.limits);
    }
}
