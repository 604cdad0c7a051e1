//! TCP exchange server.
//!
//! Line protocol: JOIN, LEAVE, TRADE, BOOK (see `tcp_exchange::command`).
//! Configured from `EXCHANGE_ADDR`, `MATCH_INTERVAL_MS` and `RUST_LOG`.

use log::{error, info};
use tcp_exchange::{Config, Server};
use tokio::net::TcpListener;
use tokio::signal;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::try_init();
    let config = Config::from_env();

    let listener = TcpListener::bind(&config.addr).await?;
    info!("listening on {}", config.addr);

    let server = Server::new(config.engine.clone());
    tokio::select! {
        _ = std::sync::Arc::clone(&server).serve(listener) => {},
        _ = shutdown_signal() => info!("shutdown signal received"),
    }

    for book in server.shutdown_all() {
        for order in book.orders() {
            info!(
                "resting gtc ticker={} order_id={} side={:?} price={} size={}",
                book.ticker, order.id, order.side, order.price, order.size
            );
        }
    }
    Ok(())
}
