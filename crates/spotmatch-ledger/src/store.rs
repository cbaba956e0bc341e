//! Persistence boundary for wallets, orders and trades.
//!
//! A [`LedgerStore`] owns three kinds of rows: wallet balances keyed by
//! [`WalletKey`], orders keyed by [`OrderId`] and trades. Every method is
//! atomic on its own; [`LedgerStore::commit_match`] in particular applies
//! all wallet movements, both order rows and the trade row of one match, or
//! none of them.

use async_trait::async_trait;
use spotmatch_types::{
    BalanceEntry, MarketConfig, Order, OrderId, OrderSide, Result, SpotmatchError, Trade, UserId,
    WalletKey, WalletType,
};

/// A signed change to one wallet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub key: WalletKey,
    /// Change to the available balance.
    pub balance: i128,
    /// Change to the amount locked by orders.
    pub in_order: i128,
}

/// Everything one match writes.
#[derive(Debug, Clone)]
pub struct MatchCommit {
    pub trade: Trade,
    /// Taker row after the fill.
    pub taker: Order,
    /// Maker row after the fill.
    pub maker: Order,
    pub base: String,
    pub quote: String,
    pub wallet_type: WalletType,
    deltas: Vec<BalanceDelta>,
}

impl MatchCommit {
    /// Build the commit for one fill and derive its wallet movements:
    ///
    /// - buyer: `in_order(quote) -= cost + buyer fee`, `balance(base) += amount`
    /// - seller: `in_order(base) -= amount`, `balance(quote) += cost - seller fee`
    /// - fee account: `balance(quote) += maker fee + taker fee`
    ///
    /// An order that is fully filled with part of its reservation unused
    /// (price improvement) gets that remainder released in the same commit.
    pub fn new(market: &MarketConfig, trade: Trade, taker: Order, maker: Order) -> Result<Self> {
        if trade.taker_order_id != taker.id || trade.maker_order_id != maker.id {
            return Err(SpotmatchError::MatchingFailed {
                reason: format!("trade {} does not belong to its orders", trade.id),
            });
        }
        let mut commit = Self {
            trade,
            taker,
            maker,
            base: market.base.clone(),
            quote: market.quote.clone(),
            wallet_type: market.wallet_type,
            deltas: Vec::with_capacity(7),
        };
        commit.derive_deltas(market);
        commit.check_conservation()?;
        Ok(commit)
    }

    fn derive_deltas(&mut self, market: &MarketConfig) {
        let trade = &self.trade;
        let (buyer, seller) = trade.buyer_seller();
        let (buyer_fee, seller_fee) = if trade.taker_is_buyer() {
            (trade.taker_fee, trade.maker_fee)
        } else {
            (trade.maker_fee, trade.taker_fee)
        };
        let key = |user: UserId, currency: &str| WalletKey::new(user, currency, self.wallet_type);

        let mut deltas = vec![
            BalanceDelta {
                key: key(buyer, &self.quote),
                balance: 0,
                in_order: -(trade.cost + buyer_fee),
            },
            BalanceDelta {
                key: key(buyer, &self.base),
                balance: trade.amount,
                in_order: 0,
            },
            BalanceDelta {
                key: key(seller, &self.base),
                balance: 0,
                in_order: -trade.amount,
            },
            BalanceDelta {
                key: key(seller, &self.quote),
                balance: trade.cost - seller_fee,
                in_order: 0,
            },
        ];
        if trade.total_fee() > 0 {
            deltas.push(BalanceDelta {
                key: key(UserId::FEE_ACCOUNT, &self.quote),
                balance: trade.total_fee(),
                in_order: 0,
            });
        }
        for order in [&mut self.taker, &mut self.maker] {
            if order.is_filled() && order.locked > 0 {
                deltas.push(BalanceDelta {
                    key: WalletKey::new(
                        order.user_id,
                        market.locked_currency(order.side),
                        self.wallet_type,
                    ),
                    balance: order.locked,
                    in_order: -order.locked,
                });
                order.locked = 0;
            }
        }
        self.deltas = deltas;
    }

    /// Per currency, the movements sum to zero.
    pub fn check_conservation(&self) -> Result<()> {
        for currency in [&self.base, &self.quote] {
            let net: i128 = self
                .deltas
                .iter()
                .filter(|d| &d.key.currency == currency)
                .map(|d| d.balance + d.in_order)
                .sum();
            if net != 0 {
                return Err(SpotmatchError::SupplyInvariantViolation {
                    reason: format!("trade {} moves {net} {currency} out of thin air", self.trade.id),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn deltas(&self) -> &[BalanceDelta] {
        &self.deltas
    }

    /// The order on `side`.
    #[must_use]
    pub fn order(&self, side: OrderSide) -> &Order {
        if self.taker.side == side {
            &self.taker
        } else {
            &self.maker
        }
    }
}

/// Storage for wallets, orders and trades.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Credit `amount` to the available balance.
    async fn deposit(&self, key: &WalletKey, amount: i128) -> Result<BalanceEntry>;

    /// Current balance; a missing wallet reads as zero.
    async fn balance(&self, key: &WalletKey) -> Result<BalanceEntry>;

    /// Move `amount` from `balance` to `in_order`.
    ///
    /// Fails with `InsufficientBalance` without changing anything when the
    /// available balance is short.
    async fn lock_funds(&self, key: &WalletKey, amount: i128) -> Result<()>;

    /// Move `amount` from `in_order` back to `balance`.
    async fn release_funds(&self, key: &WalletKey, amount: i128) -> Result<()>;

    /// Record a newly accepted order.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Apply one match atomically.
    async fn commit_match(&self, commit: &MatchCommit) -> Result<()>;

    /// Persist a cancelled or expired order and release `order.locked` of
    /// `release` back to the available balance. The stored row has nothing
    /// locked.
    async fn finish_order(&self, order: &Order, release: &WalletKey) -> Result<()>;

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Non-terminal orders of `symbol`, by arrival sequence.
    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>>;

    /// Trades of `symbol`, by sequence.
    async fn trades(&self, symbol: &str) -> Result<Vec<Trade>>;

    /// Sum of `balance + in_order` over every wallet holding `currency`.
    async fn total_supply(&self, currency: &str) -> Result<i128>;
}
