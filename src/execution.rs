//! Fill records and where they go.
//!
//! The matching pass returns a [`Fill`] per trade. [`crate::Engine`] also hands each
//! batch to a [`FillSink`] so scheduled passes can be logged or broadcast.

use std::sync::{Arc, Mutex};

use log::info;
use rust_decimal::Decimal;

use crate::types::OrderId;

/// One trade between a resting bid and a resting ask.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fill {
    /// The older of the two orders.
    pub maker_order_id: OrderId,
    /// The newer of the two orders.
    pub taker_order_id: OrderId,
    pub bid_order_id: OrderId,
    pub ask_order_id: OrderId,
    /// Execution price: the ask level's price.
    pub price: Decimal,
    pub quantity: u64,
}

/// Receiver of fills produced by a matching pass. Called outside the book lock.
pub trait FillSink: Send + Sync {
    fn publish(&self, ticker: &str, fills: &[Fill]);
}

/// Logs one line per fill.
pub struct LogFillSink;

impl FillSink for LogFillSink {
    fn publish(&self, ticker: &str, fills: &[Fill]) {
        for fill in fills {
            info!(
                "fill ticker={} price={} quantity={} maker={} taker={}",
                ticker, fill.price, fill.quantity, fill.maker_order_id, fill.taker_order_id
            );
        }
    }
}

/// Stores fills in memory (tests). Clone shares the same backing buffer.
#[derive(Clone, Default)]
pub struct InMemoryFillSink {
    fills: Arc<Mutex<Vec<Fill>>>,
}

impl InMemoryFillSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fills(&self) -> Vec<Fill> {
        self.fills.lock().expect("lock").clone()
    }

    pub fn clear(&self) {
        self.fills.lock().expect("lock").clear();
    }
}

impl FillSink for InMemoryFillSink {
    fn publish(&self, _ticker: &str, fills: &[Fill]) {
        self.fills.lock().expect("lock").extend_from_slice(fills);
    }
}

/// Fans a batch out to several sinks in order.
pub struct FanoutFillSink {
    sinks: Vec<Arc<dyn FillSink>>,
}

impl FanoutFillSink {
    pub fn new(sinks: Vec<Arc<dyn FillSink>>) -> Self {
        Self { sinks }
    }
}

impl FillSink for FanoutFillSink {
    fn publish(&self, ticker: &str, fills: &[Fill]) {
        for sink in &self.sinks {
            sink.publish(ticker, fills);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(bid: u64, ask: u64, qty: u64) -> Fill {
        Fill {
            maker_order_id: OrderId(bid.min(ask)),
            taker_order_id: OrderId(bid.max(ask)),
            bid_order_id: OrderId(bid),
            ask_order_id: OrderId(ask),
            price: Decimal::from(100),
            quantity: qty,
        }
    }

    #[test]
    fn in_memory_sink_clones_share_buffer() {
        let sink = InMemoryFillSink::new();
        let other = sink.clone();
        other.publish("QQQ", &[fill(1, 2, 5)]);
        assert_eq!(sink.fills().len(), 1);
        sink.clear();
        assert!(other.fills().is_empty());
    }

    #[test]
    fn fanout_delivers_to_every_sink() {
        let a = InMemoryFillSink::new();
        let b = InMemoryFillSink::new();
        let sinks: Vec<Arc<dyn FillSink>> = vec![Arc::new(a.clone()), Arc::new(b.clone()), Arc::new(LogFillSink)];
        let fanout = FanoutFillSink::new(sinks);
        fanout.publish("QQQ", &[fill(3, 1, 2), fill(4, 1, 1)]);
        assert_eq!(a.fills(), b.fills());
        assert_eq!(a.fills().len(), 2);
    }
}
