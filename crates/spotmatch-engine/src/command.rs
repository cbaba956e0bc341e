//! Messages between the registry and a symbol engine task.

use serde::{Deserialize, Serialize};
use spotmatch_matchcore::DepthSnapshot;
use spotmatch_marketdata::TickerStats;
use spotmatch_types::{
    Candle, CandleInterval, Order, OrderId, OrderRequest, OrderSide, OrderType, Result, Trade,
    UserId,
};
use tokio::sync::oneshot;

/// An order as a client submits it: quantities are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub user_id: UserId,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub amount: String,
    #[serde(default)]
    pub price: Option<String>,
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// The order after matching: resting, filled, or cancelled.
    pub order: Order,
    /// Trades executed by this submission, in sequence order.
    pub trades: Vec<Trade>,
    /// Market order quantity that found no liquidity and was cancelled.
    pub unfilled: i128,
}

impl SubmitOutcome {
    /// A market order that was only partly executed.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.unfilled > 0 && self.order.filled > 0
    }
}

pub(crate) type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Command {
    Submit {
        request: OrderRequest,
        reply: Reply<Result<SubmitOutcome>>,
    },
    Cancel {
        order_id: OrderId,
        user_id: UserId,
        reply: Reply<Result<Order>>,
    },
    Depth {
        depth: usize,
        reply: Reply<DepthSnapshot>,
    },
    Ticker {
        reply: Reply<TickerStats>,
    },
    RecentTrades {
        reply: Reply<Vec<Trade>>,
    },
    OpenCandle {
        interval: CandleInterval,
        reply: Reply<Option<Candle>>,
    },
    UserOrders {
        user_id: UserId,
        reply: Reply<Vec<Order>>,
    },
}
