//! Property-based invariant tests.
//!
//! Uses proptest to generate (seed, num_orders, match_every); replays synthetic
//! orders into a book and asserts: no zero or negative sizes at rest, book not
//! crossed after a pass, a second pass is a no-op, and volume is conserved.

use proptest::prelude::*;
use tcp_exchange::market_data_gen::{replay_into_book, Generator, GeneratorConfig};
use tcp_exchange::{match_crossing, OrderBook, OrderKind, Side};

fn gen_orders(seed: u64, num_orders: usize) -> Vec<tcp_exchange::OrderRequest> {
    Generator::new(GeneratorConfig {
        seed,
        num_orders,
        ..Default::default()
    })
    .all_orders()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_book_invariants_hold_after_replay(
        seed in 0u64..100_000u64,
        num_orders in 1usize..200usize,
        match_every in 1usize..20usize,
    ) {
        let mut book = OrderBook::new("QQQ");
        let fills = replay_into_book(&mut book, gen_orders(seed, num_orders), match_every).unwrap();

        book.assert_invariants();
        prop_assert!(!book.is_crossed(), "book crossed after a pass");
        prop_assert!(fills.iter().all(|f| f.quantity > 0));
        prop_assert!(match_crossing(&mut book).is_empty(), "second pass produced fills");
    }

    #[test]
    fn prop_traded_volume_is_conserved(seed in 0u64..100_000u64, num_orders in 1usize..200usize) {
        let orders = gen_orders(seed, num_orders);
        // no FOK kills in this stream, so every unit is either traded or resting
        let orders: Vec<_> = orders.into_iter().filter(|o| o.kind != OrderKind::Fok).collect();
        let submitted_buy: u64 = orders.iter().filter(|o| o.side == Side::Buy).map(|o| o.size).sum();
        let submitted_sell: u64 = orders.iter().filter(|o| o.side == Side::Sell).map(|o| o.size).sum();

        let mut book = OrderBook::new("QQQ");
        let fills = replay_into_book(&mut book, orders, 5).unwrap();
        let traded: u64 = fills.iter().map(|f| f.quantity).sum();
        let snap = book.snapshot();
        let resting_buy: u64 = snap.bids.iter().flat_map(|l| &l.orders).map(|o| o.size).sum();
        let resting_sell: u64 = snap.asks.iter().flat_map(|l| &l.orders).map(|o| o.size).sum();

        prop_assert_eq!(submitted_buy, traded + resting_buy);
        prop_assert_eq!(submitted_sell, traded + resting_sell);
    }

    #[test]
    fn prop_shutdown_keeps_exactly_the_gtc_orders(seed in 0u64..100_000u64, num_orders in 1usize..200usize) {
        let mut book = OrderBook::new("QQQ");
        replay_into_book(&mut book, gen_orders(seed, num_orders), 7).unwrap();
        let gtc_before: Vec<_> = book
            .snapshot()
            .orders()
            .filter(|o| o.kind == OrderKind::Gtc)
            .cloned()
            .collect();
        book.close();
        let after: Vec<_> = book.snapshot().orders().cloned().collect();
        prop_assert_eq!(gtc_before, after);
    }
}

/// Deterministic replay: same config ⇒ same fills.
#[test]
fn deterministic_replay_same_seed_same_outcome() {
    let mut book1 = OrderBook::new("QQQ");
    let fills1 = replay_into_book(&mut book1, gen_orders(999, 300), 4).unwrap();
    let mut book2 = OrderBook::new("QQQ");
    let fills2 = replay_into_book(&mut book2, gen_orders(999, 300), 4).unwrap();
    assert_eq!(fills1, fills2);
    assert_eq!(book1.snapshot(), book2.snapshot());
}
