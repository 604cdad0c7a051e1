//! Line protocol spoken by clients.
//!
//! ```text
//! JOIN <exchange>
//! LEAVE <exchange>
//! TRADE <exchange> <buy|sell> <market|limit|gtc|fok> <price> <size> <ticker>
//! BOOK <exchange>
//! ```
//!
//! Parsing checks shape and field syntax; ticker and range checks happen in
//! [`crate::OrderRequest::validate`] before the order reaches the book.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::ValidationError;
use crate::types::{OrderKind, OrderRequest, Side};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Join(String),
    Leave(String),
    Trade { exchange: String, order: OrderRequest },
    Book(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command")]
    Unknown(String),

    #[error("Invalid message format")]
    InvalidFormat,

    #[error("Rejected: {0}")]
    Invalid(#[from] ValidationError),
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["JOIN", exchange] => Ok(Command::Join(exchange.to_string())),
        ["LEAVE", exchange] => Ok(Command::Leave(exchange.to_string())),
        ["BOOK", exchange] => Ok(Command::Book(exchange.to_string())),
        ["TRADE", exchange, side, kind, price, size, ticker] => {
            let order = OrderRequest {
                side: side.parse::<Side>()?,
                kind: kind.parse::<OrderKind>()?,
                price: price
                    .parse::<Decimal>()
                    .map_err(|_| ValidationError::InvalidPrice(price.to_string()))?,
                size: size
                    .parse::<u64>()
                    .map_err(|_| ValidationError::InvalidSize(size.to_string()))?,
                ticker: ticker.to_string(),
            };
            Ok(Command::Trade {
                exchange: exchange.to_string(),
                order,
            })
        }
        ["TRADE", ..] => Err(CommandError::InvalidFormat),
        ["JOIN" | "LEAVE" | "BOOK", ..] => Err(CommandError::InvalidFormat),
        _ => Err(CommandError::Unknown(line.to_string())),
    }
}
