//! TCP session layer: one [`Engine`] per named exchange, line commands per client.
//!
//! Each connection gets a writer task fed by a channel. `JOIN` subscribes the
//! connection to the exchange's fill notices (a `tokio::sync::broadcast` channel
//! fed by [`BroadcastFillSink`]); `LEAVE` or disconnect drops the subscription.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::command::{parse_command, Command, CommandError};
use crate::engine::{Engine, EngineConfig};
use crate::execution::{FanoutFillSink, Fill, FillSink, LogFillSink};
use crate::order_book::BookSnapshot;
use crate::types::OrderRequest;

const NOTICE_CAPACITY: usize = 1024;

/// Formats fills as text lines and broadcasts them to subscribed sessions.
pub struct BroadcastFillSink {
    tx: broadcast::Sender<String>,
}

impl BroadcastFillSink {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

pub fn fill_notice(ticker: &str, fill: &Fill) -> String {
    format!(
        "FILL {} price={} size={} maker={} taker={}\n",
        ticker, fill.price, fill.quantity, fill.maker_order_id, fill.taker_order_id
    )
}

impl FillSink for BroadcastFillSink {
    fn publish(&self, ticker: &str, fills: &[Fill]) {
        for fill in fills {
            // no subscribers is not an error
            let _ = self.tx.send(fill_notice(ticker, fill));
        }
    }
}

/// A named book plus its notice channel.
pub struct Exchange {
    pub engine: Engine,
    notices: broadcast::Sender<String>,
}

impl Exchange {
    fn open(name: &str, config: EngineConfig) -> Result<Self, crate::BookError> {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let sinks: Vec<Arc<dyn FillSink>> = vec![
            Arc::new(LogFillSink),
            Arc::new(BroadcastFillSink::new(notices.clone())),
        ];
        let sink = FanoutFillSink::new(sinks);
        let engine = Engine::create(name, config, Arc::new(sink))?;
        Ok(Self { engine, notices })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.notices.subscribe()
    }
}

pub struct Server {
    config: EngineConfig,
    exchanges: Mutex<HashMap<String, Arc<Exchange>>>,
}

struct Session {
    outbound: mpsc::UnboundedSender<String>,
    subscriptions: HashMap<String, JoinHandle<()>>,
}

impl Session {
    fn send(&self, line: impl Into<String>) {
        let mut line = line.into();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        let _ = self.outbound.send(line);
    }

    fn unsubscribe(&mut self, exchange: &str) {
        if let Some(task) = self.subscriptions.remove(exchange) {
            task.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for (_, task) in self.subscriptions.drain() {
            task.abort();
        }
    }
}

impl Server {
    pub fn new(config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            exchanges: Mutex::new(HashMap::new()),
        })
    }

    pub fn exchange(&self, name: &str) -> Option<Arc<Exchange>> {
        self.exchanges.lock().expect("exchanges lock").get(name).cloned()
    }

    /// Returns the exchange, creating its book on first use.
    pub fn get_or_open(&self, name: &str) -> Result<Arc<Exchange>, crate::BookError> {
        let mut exchanges = self.exchanges.lock().expect("exchanges lock");
        if let Some(existing) = exchanges.get(name) {
            return Ok(Arc::clone(existing));
        }
        let exchange = Arc::new(Exchange::open(name, self.config.clone())?);
        exchanges.insert(name.to_string(), Arc::clone(&exchange));
        Ok(exchange)
    }

    /// Submits to an existing exchange. Returns the client-facing reply.
    pub fn trade(&self, exchange: &str, order: OrderRequest) -> String {
        let Some(ex) = self.exchange(exchange) else {
            return format!("Not in exchange {}", exchange);
        };
        match ex.engine.submit(order) {
            Ok(order) => format!("Order {} added to {} exchange", order.id, exchange),
            Err(e) => {
                warn!("order rejected exchange={} reason={}", exchange, e);
                format!("Rejected: {}", e)
            }
        }
    }

    /// Accept connections forever; each client runs on its own task.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!("client connected peer={}", peer);
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_client(stream).await {
                            warn!("client error peer={} error={}", peer, e);
                        }
                        info!("client disconnected peer={}", peer);
                    });
                }
                Err(e) => warn!("accept error: {}", e),
            }
        }
    }

    /// Shut down every book. Returns each exchange's surviving GTC orders.
    pub fn shutdown_all(&self) -> Vec<BookSnapshot> {
        let exchanges: Vec<Arc<Exchange>> = self
            .exchanges
            .lock()
            .expect("exchanges lock")
            .values()
            .cloned()
            .collect();
        let mut survivors = Vec::new();
        for ex in exchanges {
            match ex.engine.shutdown() {
                Ok(snapshot) => survivors.push(snapshot),
                Err(e) => warn!("shutdown ticker={} error={}", ex.engine.ticker(), e),
            }
        }
        survivors
    }

    async fn handle_client(&self, stream: TcpStream) -> std::io::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            while let Some(line) = outbound_rx.recv().await {
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        let mut session = Session {
            outbound,
            subscriptions: HashMap::new(),
        };
        let mut lines = BufReader::new(reader).lines();
        let result = loop {
            match lines.next_line().await {
                Ok(Some(line)) => self.handle_line(&line, &mut session),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        drop(session);
        let _ = writer_task.await;
        result
    }

    fn handle_line(&self, line: &str, session: &mut Session) {
        let command = match parse_command(line) {
            Ok(c) => c,
            Err(e) => {
                if !matches!(e, CommandError::Unknown(_)) {
                    warn!("bad command line={:?} error={}", line, e);
                }
                session.send(e.to_string());
                return;
            }
        };
        match command {
            Command::Join(name) => match self.get_or_open(&name) {
                Ok(exchange) => {
                    if !session.subscriptions.contains_key(&name) {
                        let task = forward_notices(exchange.subscribe(), session.outbound.clone());
                        session.subscriptions.insert(name.clone(), task);
                    }
                    info!("client joined exchange={}", name);
                    session.send(format!("Joined exchange: {}", name));
                }
                Err(e) => session.send(format!("Rejected: {}", e)),
            },
            Command::Leave(name) => {
                session.unsubscribe(&name);
                info!("client left exchange={}", name);
                session.send(format!("Left exchange: {}", name));
            }
            Command::Trade { exchange, order } => session.send(self.trade(&exchange, order)),
            Command::Book(name) => match self.exchange(&name) {
                Some(ex) => match serde_json::to_string(&ex.engine.snapshot()) {
                    Ok(json) => session.send(json),
                    Err(e) => session.send(format!("Rejected: {}", e)),
                },
                None => session.send(format!("Not in exchange {}", name)),
            },
        }
    }
}

fn forward_notices(mut rx: broadcast::Receiver<String>, out: mpsc::UnboundedSender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(line) => {
                    if out.send(line).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("subscriber lagged, skipped {} notices", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderKind, Side};
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn idle_config() -> EngineConfig {
        EngineConfig {
            match_interval: Duration::from_secs(3600),
        }
    }

    fn request(side: Side, kind: OrderKind, price: i64, size: u64) -> OrderRequest {
        OrderRequest::new(side, kind, Decimal::from(price), size, "QQQ")
    }

    #[test]
    fn trade_on_unknown_exchange() {
        let server = Server::new(idle_config());
        let reply = server.trade("QQQ", request(Side::Buy, OrderKind::Gtc, 100, 1));
        assert_eq!(reply, "Not in exchange QQQ");
    }

    #[test]
    fn trade_replies_with_assigned_id() {
        let server = Server::new(idle_config());
        server.get_or_open("QQQ").unwrap();
        assert_eq!(
            server.trade("QQQ", request(Side::Buy, OrderKind::Gtc, 100, 1)),
            "Order 1 added to QQQ exchange"
        );
        let mut wrong = request(Side::Buy, OrderKind::Gtc, 100, 1);
        wrong.ticker = "SPY".into();
        assert!(server.trade("QQQ", wrong).starts_with("Rejected:"));
        server.shutdown_all();
    }

    #[test]
    fn broadcast_sink_formats_fills() {
        let (tx, mut rx) = broadcast::channel(4);
        let sink = BroadcastFillSink::new(tx);
        let fill = Fill {
            maker_order_id: crate::OrderId(1),
            taker_order_id: crate::OrderId(2),
            bid_order_id: crate::OrderId(1),
            ask_order_id: crate::OrderId(2),
            price: Decimal::new(10000, 2),
            quantity: 10,
        };
        sink.publish("QQQ", &[fill]);
        assert_eq!(rx.try_recv().unwrap(), "FILL QQQ price=100.00 size=10 maker=1 taker=2\n");
    }

    #[test]
    fn shutdown_all_keeps_gtc() {
        let server = Server::new(idle_config());
        let ex = server.get_or_open("QQQ").unwrap();
        ex.engine.submit(request(Side::Buy, OrderKind::Gtc, 98, 90)).unwrap();
        ex.engine.submit(request(Side::Buy, OrderKind::Market, 99, 10)).unwrap();
        let survivors = server.shutdown_all();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].orders().count(), 1);
        assert!(server.shutdown_all().is_empty());
    }
}
