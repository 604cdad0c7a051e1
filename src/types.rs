//! Core types and IDs for the order book.
//!
//! [`OrderRequest`] is what a submitter hands to the book; [`Order`] is the
//! resting record the book creates from it (id and timestamp assigned).

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Engine-assigned order identifier. Strictly increasing per book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(ValidationError::UnknownSide(other.to_string())),
        }
    }
}

/// Order kind. Decides matching eligibility and whether the order survives shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Immediately executable at its reference price.
    Market,
    Limit,
    /// Good-Til-Cancelled: the only kind retained after shutdown.
    Gtc,
    /// Fill-or-Kill: fills its whole remaining size in one trade or is removed.
    Fok,
}

impl OrderKind {
    pub fn is_market(self) -> bool {
        matches!(self, OrderKind::Market)
    }

    pub fn is_fok(self) -> bool {
        matches!(self, OrderKind::Fok)
    }

    /// Whether an order of this kind stays in the book across `shutdown()`.
    pub fn survives_shutdown(self) -> bool {
        matches!(self, OrderKind::Gtc)
    }
}

impl FromStr for OrderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market" => Ok(OrderKind::Market),
            "limit" => Ok(OrderKind::Limit),
            "gtc" => Ok(OrderKind::Gtc),
            "fok" => Ok(OrderKind::Fok),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// An order as submitted: everything except the id and timestamp the book assigns.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderRequest {
    pub side: Side,
    pub kind: OrderKind,
    pub price: Decimal,
    pub size: u64,
    pub ticker: String,
}

impl OrderRequest {
    pub fn new(side: Side, kind: OrderKind, price: Decimal, size: u64, ticker: impl Into<String>) -> Self {
        Self {
            side,
            kind,
            price,
            size,
            ticker: ticker.into(),
        }
    }

    /// Boundary checks for a book trading `ticker`. Nothing is mutated on failure.
    pub fn validate(&self, ticker: &str) -> Result<(), ValidationError> {
        if self.price <= Decimal::ZERO {
            return Err(ValidationError::InvalidPrice(self.price.to_string()));
        }
        if self.size == 0 {
            return Err(ValidationError::InvalidSize(self.size.to_string()));
        }
        if self.ticker.is_empty() {
            return Err(ValidationError::EmptyTicker);
        }
        if self.ticker != ticker {
            return Err(ValidationError::TickerMismatch {
                expected: ticker.to_string(),
                actual: self.ticker.clone(),
            });
        }
        Ok(())
    }
}

/// Resting order. `size` is the remaining quantity and is always > 0 while in the book.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Decimal,
    pub size: u64,
    pub ticker: String,
    /// Nanoseconds since the Unix epoch, non-decreasing in submission order.
    pub submitted_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_side_and_kind() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("sell".parse::<Side>().unwrap(), Side::Sell);
        assert_eq!("gtc".parse::<OrderKind>().unwrap(), OrderKind::Gtc);
        assert_eq!("fok".parse::<OrderKind>().unwrap(), OrderKind::Fok);
    }

    #[test]
    fn unknown_kind_is_rejected_not_defaulted() {
        let err = "ioc".parse::<OrderKind>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownKind("ioc".into()));
        assert!("BUY".parse::<Side>().is_err());
    }

    #[test]
    fn only_gtc_survives_shutdown() {
        assert!(OrderKind::Gtc.survives_shutdown());
        assert!(!OrderKind::Market.survives_shutdown());
        assert!(!OrderKind::Limit.survives_shutdown());
        assert!(!OrderKind::Fok.survives_shutdown());
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let ok = OrderRequest::new(Side::Buy, OrderKind::Limit, Decimal::new(10000, 2), 10, "QQQ");
        assert!(ok.validate("QQQ").is_ok());

        let mut r = ok.clone();
        r.price = Decimal::ZERO;
        assert!(matches!(r.validate("QQQ"), Err(ValidationError::InvalidPrice(_))));

        let mut r = ok.clone();
        r.size = 0;
        assert!(matches!(r.validate("QQQ"), Err(ValidationError::InvalidSize(_))));

        let mut r = ok.clone();
        r.ticker.clear();
        assert_eq!(r.validate("QQQ"), Err(ValidationError::EmptyTicker));

        assert!(matches!(ok.validate("SPY"), Err(ValidationError::TickerMismatch { .. })));
    }
}
