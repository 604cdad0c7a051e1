//! # TCP Exchange
//!
//! Continuous double-auction order book for a single ticker: orders rest in
//! price-time priority and a background pass matches crossing levels every
//! 20 ms by default.
//!
//! ## Entry point
//!
//! Use [`Engine`]: create with [`Engine::create`] (starts the matching scheduler),
//! then [`Engine::submit`], [`Engine::snapshot`], and finally [`Engine::shutdown`],
//! which stops matching and keeps only GTC orders.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rust_decimal::Decimal;
//! use tcp_exchange::{Engine, EngineConfig, InMemoryFillSink, OrderKind, OrderRequest, Side};
//!
//! let fills = InMemoryFillSink::new();
//! let config = EngineConfig { match_interval: Duration::from_secs(60) };
//! let engine = Engine::create("QQQ", config, Arc::new(fills.clone())).unwrap();
//! engine.submit(OrderRequest::new(Side::Buy, OrderKind::Market, Decimal::from(100), 10, "QQQ")).unwrap();
//! engine.submit(OrderRequest::new(Side::Sell, OrderKind::Market, Decimal::from(100), 10, "QQQ")).unwrap();
//! let executed = engine.match_now();
//! assert_eq!(executed.len(), 1);
//! assert!(engine.snapshot().is_empty());
//! engine.shutdown().unwrap();
//! ```
//!
//! ## Lower-level API
//!
//! [`OrderBook`] and [`match_crossing`] are usable directly when you manage
//! locking and timestamps yourself.

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod market_data_gen;
pub mod matching;
pub mod order_book;
pub mod scheduler;
pub mod server;
pub mod types;

pub use command::{parse_command, Command, CommandError};
pub use config::Config;
pub use engine::{Engine, EngineConfig, DEFAULT_MATCH_INTERVAL};
pub use error::{BookError, ValidationError};
pub use execution::{FanoutFillSink, Fill, FillSink, InMemoryFillSink, LogFillSink};
pub use market_data_gen::{replay_into_book, Generator, GeneratorConfig};
pub use matching::match_crossing;
pub use order_book::{BookSnapshot, LevelSnapshot, OrderBook};
pub use server::{BroadcastFillSink, Exchange, Server};
pub use types::{Order, OrderId, OrderKind, OrderRequest, Side};
