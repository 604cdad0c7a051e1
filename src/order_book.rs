//! Single-ticker order book: bid and ask price levels, id counter, lifecycle flag.
//!
//! Not synchronised; [`crate::Engine`] wraps it in a mutex. Each price level is
//! ordered by `submitted_at` (oldest first). Best bid is the highest price, best
//! ask the lowest. Matching lives in [`crate::matching`].

use std::collections::{BTreeMap, VecDeque};

use rust_decimal::Decimal;

use crate::error::BookError;
use crate::types::{Order, OrderId, OrderRequest, Side};

/// Price -> time-ordered queue of resting orders.
type Levels = BTreeMap<Decimal, VecDeque<Order>>;

/// One price level in a [`BookSnapshot`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LevelSnapshot {
    pub price: Decimal,
    /// Oldest first.
    pub orders: Vec<Order>,
}

/// Point-in-time copy of the book. Bids highest price first, asks lowest price first.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BookSnapshot {
    pub ticker: String,
    pub bids: Vec<LevelSnapshot>,
    pub asks: Vec<LevelSnapshot>,
}

impl BookSnapshot {
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// All resting orders, bids then asks, in priority order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .flat_map(|level| level.orders.iter())
    }
}

#[derive(Debug)]
pub struct OrderBook {
    ticker: String,
    bids: Levels,
    asks: Levels,
    next_order_id: u64,
    last_timestamp: u64,
    closed: bool,
}

impl OrderBook {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            next_order_id: 1,
            last_timestamp: 0,
            closed: false,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Validate and insert an order at its price level. Does not run matching.
    ///
    /// `now` is the submission time in nanoseconds; it is clamped so timestamps never
    /// go backwards, which keeps time priority equal to insertion order.
    pub fn add_order(&mut self, request: OrderRequest, now: u64) -> Result<Order, BookError> {
        if self.closed {
            return Err(BookError::Closed);
        }
        request.validate(&self.ticker)?;

        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        let submitted_at = now.max(self.last_timestamp);
        self.last_timestamp = submitted_at;

        let order = Order {
            id,
            side: request.side,
            kind: request.kind,
            price: request.price,
            size: request.size,
            ticker: request.ticker,
            submitted_at,
        };
        let level = self.levels_mut(order.side).entry(order.price).or_default();
        let key = (order.submitted_at, order.id);
        let pos = level.partition_point(|o| (o.submitted_at, o.id) <= key);
        level.insert(pos, order.clone());
        Ok(order)
    }

    /// Best bid price (None if empty).
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    /// Best ask price (None if empty).
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// True when the best bid is at or above the best ask.
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(b), Some(a)) if b >= a)
    }

    pub fn order_count(&self) -> usize {
        self.bids.values().chain(self.asks.values()).map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the book closed and drop every order that does not survive shutdown.
    /// Returns the number of orders removed.
    pub fn close(&mut self) -> usize {
        self.closed = true;
        retain_survivors(&mut self.bids) + retain_survivors(&mut self.asks)
    }

    pub fn snapshot(&self) -> BookSnapshot {
        let level = |(price, queue): (&Decimal, &VecDeque<Order>)| LevelSnapshot {
            price: *price,
            orders: queue.iter().cloned().collect(),
        };
        BookSnapshot {
            ticker: self.ticker.clone(),
            bids: self.bids.iter().rev().map(level).collect(),
            asks: self.asks.iter().map(level).collect(),
        }
    }

    /// Head (oldest) orders of the levels at `bid_price` and `ask_price`.
    pub(crate) fn heads_mut(&mut self, bid_price: Decimal, ask_price: Decimal) -> Option<(&mut Order, &mut Order)> {
        let bid = self.bids.get_mut(&bid_price)?.front_mut()?;
        let ask = self.asks.get_mut(&ask_price)?.front_mut()?;
        Some((bid, ask))
    }

    pub(crate) fn head_mut(&mut self, side: Side, price: Decimal) -> Option<&mut Order> {
        self.levels_mut(side).get_mut(&price)?.front_mut()
    }

    /// Remove the head order at `price`, dropping the level if it empties.
    pub(crate) fn pop_head(&mut self, side: Side, price: Decimal) -> Option<Order> {
        let levels = self.levels_mut(side);
        let queue = levels.get_mut(&price)?;
        let head = queue.pop_front();
        if queue.is_empty() {
            levels.remove(&price);
        }
        head
    }

    /// Panics if any book invariant is broken: empty level, zero size, order on the
    /// wrong side or price, time priority out of order, or duplicate ids.
    pub fn assert_invariants(&self) {
        let mut ids = std::collections::HashSet::new();
        for (side, levels) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            for (price, queue) in levels {
                assert!(!queue.is_empty(), "empty price level {} on {:?}", price, side);
                for order in queue {
                    assert!(order.size > 0, "order {} rests with zero size", order.id);
                    assert_eq!(order.side, side, "order {} on wrong side", order.id);
                    assert_eq!(order.price, *price, "order {} at wrong level", order.id);
                    assert!(order.id.0 < self.next_order_id, "order {} from the future", order.id);
                    assert!(ids.insert(order.id), "duplicate order id {}", order.id);
                }
                for pair in queue.iter().collect::<Vec<_>>().windows(2) {
                    assert!(
                        (pair[0].submitted_at, pair[0].id) < (pair[1].submitted_at, pair[1].id),
                        "time priority broken at {}",
                        price
                    );
                }
            }
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut Levels {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

fn retain_survivors(levels: &mut Levels) -> usize {
    let mut removed = 0;
    levels.retain(|_, queue| {
        let before = queue.len();
        queue.retain(|o| o.kind.survives_shutdown());
        removed += before - queue.len();
        !queue.is_empty()
    });
    removed
}
