//! Price-time priority matching pass.
//!
//! [`match_crossing`] repeatedly takes the best bid and best ask levels while they
//! cross, trades their head orders, and stops once the book is uncrossed or a side
//! is empty. Every step removes at least one order, so a pass always terminates and
//! a second pass with no new orders finds nothing to do.

use log::debug;
use rust_decimal::Decimal;

use crate::execution::Fill;
use crate::order_book::OrderBook;
use crate::types::{Order, OrderKind, Side};

/// What one step of the pass does to the head pair.
enum Step {
    /// Both heads traded; sizes are already reduced.
    Trade(Fill),
    /// Remove an FOK head that cannot be filled in full.
    Kill(Side),
    /// Pair cannot trade; end the pass.
    Halt,
}

/// Run one matching pass over the whole book. Returns the fills in execution order.
pub fn match_crossing(book: &mut OrderBook) -> Vec<Fill> {
    let mut fills = Vec::new();
    loop {
        let (Some(bid_price), Some(ask_price)) = (book.best_bid(), book.best_ask()) else {
            break;
        };
        if bid_price < ask_price {
            break;
        }
        let step = {
            let (bid, ask) = book
                .heads_mut(bid_price, ask_price)
                .unwrap_or_else(|| panic!("best levels {} / {} have no head order", bid_price, ask_price));
            next_step(bid, ask)
        };
        match step {
            Step::Trade(fill) => {
                clear_filled_head(book, Side::Buy, bid_price);
                clear_filled_head(book, Side::Sell, ask_price);
                fills.push(fill);
            }
            Step::Kill(side) => {
                let price = match side {
                    Side::Buy => bid_price,
                    Side::Sell => ask_price,
                };
                if let Some(killed) = book.pop_head(side, price) {
                    debug!("fok killed order_id={} side={:?} price={} size={}", killed.id, side, price, killed.size);
                }
            }
            Step::Halt => break,
        }
    }
    fills
}

/// Whether the kinds of a bid/ask pair at crossed levels may trade with each other.
fn eligible(bid: OrderKind, ask: OrderKind) -> bool {
    use OrderKind::*;
    match (bid, ask) {
        (Market, _) | (_, Market) => true,
        (Limit | Gtc | Fok, Limit | Gtc | Fok) => true,
    }
}

fn next_step(bid: &mut Order, ask: &mut Order) -> Step {
    if !eligible(bid.kind, ask.kind) {
        return Step::Halt;
    }
    let volume = bid.size.min(ask.size);
    // FOK legs trade only their whole remaining size.
    if bid.kind.is_fok() && volume != bid.size {
        return Step::Kill(Side::Buy);
    }
    if ask.kind.is_fok() && volume != ask.size {
        return Step::Kill(Side::Sell);
    }
    assert!(volume > 0, "zero-size order resting in the book");

    bid.size -= volume;
    ask.size -= volume;

    let (maker, taker) = if (bid.submitted_at, bid.id) < (ask.submitted_at, ask.id) {
        (bid.id, ask.id)
    } else {
        (ask.id, bid.id)
    };
    Step::Trade(Fill {
        maker_order_id: maker,
        taker_order_id: taker,
        bid_order_id: bid.id,
        ask_order_id: ask.id,
        price: ask.price,
        quantity: volume,
    })
}

fn clear_filled_head(book: &mut OrderBook, side: Side, price: Decimal) {
    let filled = book
        .head_mut(side, price)
        .map_or(false, |head| head.size == 0);
    if filled {
        book.pop_head(side, price);
    }
}
