//! Concurrent book facade.
//!
//! [`Engine`] owns one [`OrderBook`] behind a mutex, the [`Scheduler`] that re-runs
//! the matching pass every [`EngineConfig::match_interval`], and the [`FillSink`]
//! that receives each pass's fills. Every operation takes the book lock for its
//! whole duration; fills are published after the lock is released.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info};
use rust_decimal::Decimal;

use crate::error::BookError;
use crate::execution::{Fill, FillSink, LogFillSink};
use crate::matching::match_crossing;
use crate::order_book::{BookSnapshot, OrderBook};
use crate::scheduler::Scheduler;
use crate::types::{Order, OrderRequest};

/// Period of the background matching pass.
pub const DEFAULT_MATCH_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub match_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_interval: DEFAULT_MATCH_INTERVAL,
        }
    }
}

/// Single-ticker book with background matching.
///
/// Use [`Engine::submit`] from any number of threads. Call [`Engine::shutdown`] once to
/// stop matching and drain every order that is not GTC.
pub struct Engine {
    ticker: String,
    book: Arc<Mutex<OrderBook>>,
    sink: Arc<dyn FillSink>,
    /// `None` once shut down.
    scheduler: Mutex<Option<Scheduler>>,
}

impl Engine {
    /// Creates the book for `ticker` and starts its matching scheduler.
    pub fn create(ticker: impl Into<String>, config: EngineConfig, sink: Arc<dyn FillSink>) -> Result<Self, BookError> {
        let ticker = ticker.into();
        let book = Arc::new(Mutex::new(OrderBook::new(ticker.clone())));

        let tick_book = Arc::clone(&book);
        let tick_sink = Arc::clone(&sink);
        let scheduler = Scheduler::start(format!("match-{}", ticker), config.match_interval, move || {
            run_pass(&tick_book, tick_sink.as_ref());
        })
        .map_err(|e| BookError::SchedulerStart(e.to_string()))?;

        info!(
            "book created ticker={} match_interval_ms={}",
            ticker,
            config.match_interval.as_millis()
        );
        Ok(Self {
            ticker,
            book,
            sink,
            scheduler: Mutex::new(Some(scheduler)),
        })
    }

    /// Default interval, fills logged.
    pub fn with_defaults(ticker: impl Into<String>) -> Result<Self, BookError> {
        Self::create(ticker, EngineConfig::default(), Arc::new(LogFillSink))
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Validates and rests an order; assigns its id and timestamp. Never matches.
    ///
    /// The timestamp is taken after the lock is acquired, so id order, time priority
    /// and lock acquisition order agree.
    pub fn submit(&self, request: OrderRequest) -> Result<Order, BookError> {
        let mut book = self.lock_book();
        let order = book.add_order(request, now_nanos())?;
        drop(book);
        debug!(
            "order submitted ticker={} order_id={} side={:?} kind={:?} price={} size={}",
            self.ticker, order.id, order.side, order.kind, order.price, order.size
        );
        Ok(order)
    }

    /// Runs one matching pass now and returns its fills (also published to the sink).
    /// A shut-down book is not matched.
    pub fn match_now(&self) -> Vec<Fill> {
        run_pass(&self.book, self.sink.as_ref())
    }

    pub fn snapshot(&self) -> BookSnapshot {
        self.lock_book().snapshot()
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.lock_book().best_bid()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.lock_book().best_ask()
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock_book().is_closed()
    }

    /// Stops the scheduler (waiting for a pass in flight), then removes every non-GTC
    /// order. Returns the surviving book. A second call returns
    /// [`BookError::AlreadyShutDown`] and changes nothing.
    pub fn shutdown(&self) -> Result<BookSnapshot, BookError> {
        let mut scheduler = self.scheduler.lock().expect("scheduler lock");
        let Some(mut running) = scheduler.take() else {
            return Err(BookError::AlreadyShutDown);
        };
        running.stop();

        let mut book = self.lock_book();
        let removed = book.close();
        let survivors = book.snapshot();
        drop(book);
        info!(
            "book shut down ticker={} drained={} remaining_gtc={}",
            self.ticker,
            removed,
            survivors.orders().count()
        );
        Ok(survivors)
    }

    fn lock_book(&self) -> MutexGuard<'_, OrderBook> {
        lock(&self.book)
    }
}

// A poisoned lock means a pass panicked mid-mutation; the book can no longer be trusted.
fn lock(book: &Mutex<OrderBook>) -> MutexGuard<'_, OrderBook> {
    book.lock().expect("order book lock poisoned")
}

fn run_pass(book: &Mutex<OrderBook>, sink: &dyn FillSink) -> Vec<Fill> {
    let mut guard = lock(book);
    if guard.is_closed() {
        return Vec::new();
    }
    let fills = match_crossing(&mut guard);
    let ticker = guard.ticker().to_string();
    drop(guard);
    if !fills.is_empty() {
        sink.publish(&ticker, &fills);
    }
    fills
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
