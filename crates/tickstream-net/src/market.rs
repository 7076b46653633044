//! Market-data payloads and the application's two channels.
//!
//! The price channel pushes `price_update` envelopes. The trade channel
//! pushes `message` envelopes (bot log lines) and individual trade log
//! entries, whose `type` field is the trade side (`buy` or `sell`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tickstream_core::Observable;

use crate::channel::{ChannelClient, Connector, TungsteniteConnector};
use crate::error::Result;
use crate::settings::Settings;

/// One listed stock in a price update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub market_cap: String,
    pub market: String,
}

/// One market index in a price update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketIndex {
    pub code: String,
    pub name: String,
    pub value: f64,
    pub change: f64,
    pub change_percent: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// An executed (or failed) order from the trading bot.
///
/// On the trade channel the entry is sent as-is, so its `type` field doubles
/// as the envelope discriminator: subscribe with
/// `on_event::<TradeLog, _>("buy", ..)` and `("sell", ..)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeLog {
    pub time: String,
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub qty: u64,
    pub price: f64,
    pub success: bool,
    pub message: String,
}

/// Payload of a `price_update` envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    #[serde(default)]
    pub stocks: Vec<Stock>,
    #[serde(default)]
    pub indices: Vec<MarketIndex>,
}

/// The known envelopes, keyed by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    PriceUpdate(PriceUpdate),
    /// A free-form log line from the trading bot.
    Message { data: String },
    /// A trade log entry wrapped in a `trade` envelope.
    Trade { data: TradeLog },
}

impl MarketEvent {
    /// The `type` this event is sent under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PriceUpdate(_) => "price_update",
            Self::Message { .. } => "message",
            Self::Trade { .. } => "trade",
        }
    }
}

/// The application's long-lived channels, built once at startup.
///
/// Each channel has its own connectivity status. Handlers are registered on
/// the individual clients; `MarketChannels` only owns them and drives their
/// lifecycle together.
#[derive(Debug)]
pub struct MarketChannels {
    prices: ChannelClient,
    trades: ChannelClient,
    prices_connected: Arc<Observable<bool>>,
    trades_connected: Arc<Observable<bool>>,
}

impl MarketChannels {
    /// Build both channels from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_connector(settings, Arc::new(TungsteniteConnector))
    }

    /// Build both channels, opening transports through `connector`.
    pub fn with_connector(settings: &Settings, connector: Arc<dyn Connector>) -> Result<Self> {
        let prices_connected = Arc::new(Observable::new(false));
        let trades_connected = Arc::new(Observable::new(false));
        let prices = ChannelClient::with_connector(
            settings.channel_config(&settings.channels.prices)?,
            prices_connected.clone(),
            connector.clone(),
        )?;
        let trades = ChannelClient::with_connector(
            settings.channel_config(&settings.channels.trades)?,
            trades_connected.clone(),
            connector,
        )?;
        Ok(Self {
            prices,
            trades,
            prices_connected,
            trades_connected,
        })
    }

    /// The price channel.
    pub fn prices(&self) -> &ChannelClient {
        &self.prices
    }

    /// The trade channel.
    pub fn trades(&self) -> &ChannelClient {
        &self.trades
    }

    pub fn prices_connected(&self) -> &Arc<Observable<bool>> {
        &self.prices_connected
    }

    pub fn trades_connected(&self) -> &Arc<Observable<bool>> {
        &self.trades_connected
    }

    /// Connect both channels.
    pub fn connect_all(&self) {
        self.prices.connect();
        self.trades.connect();
    }

    /// Close both channels.
    pub fn close_all(&self) {
        self.prices.close();
        self.trades.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Envelope;

    const PRICE_UPDATE: &str = r#"{
        "type": "price_update",
        "stocks": [{
            "code": "005930", "name": "Samsung Electronics", "price": 71200,
            "change": -300, "change_percent": -0.42, "volume": 12034511,
            "market_cap": "425T", "market": "KOSPI"
        }],
        "indices": [{
            "code": "0001", "name": "KOSPI", "value": 2650.31,
            "change": 12.5, "change_percent": 0.47
        }]
    }"#;

    #[test]
    fn test_price_update_decodes_from_envelope() {
        let envelope = Envelope::parse(PRICE_UPDATE).unwrap();
        let event: MarketEvent = envelope.decode().unwrap();
        let MarketEvent::PriceUpdate(update) = event else {
            panic!("expected price update");
        };
        assert_eq!(update.stocks[0].code, "005930");
        assert_eq!(update.stocks[0].price, 71200.0);
        assert_eq!(update.indices[0].name, "KOSPI");
    }

    #[test]
    fn test_message_and_trade_variants() {
        let message: MarketEvent =
            Envelope::parse(r#"{"type":"message","data":"[2024-05-02 09:00:03] bot started"}"#)
                .unwrap()
                .decode()
                .unwrap();
        assert_eq!(message.kind(), "message");

        let trade: MarketEvent = Envelope::parse(
            r#"{"type":"trade","data":{"time":"2024-05-02 09:01:00","code":"000660",
                "name":"SK hynix","type":"buy","qty":3,"price":181500,
                "success":true,"message":"ok"}}"#,
        )
        .unwrap()
        .decode()
        .unwrap();
        match trade {
            MarketEvent::Trade { data } => {
                assert_eq!(data.side, TradeSide::Buy);
                assert_eq!(data.qty, 3);
            }
            other => panic!("expected trade, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_trade_log_is_its_own_envelope() {
        let envelope = Envelope::parse(
            r#"{"time":"2024-05-02 14:10:00","code":"005930","name":"Samsung Electronics",
                "type":"sell","qty":10,"price":71500,"success":false,"message":"rejected"}"#,
        )
        .unwrap();
        assert_eq!(envelope.kind(), "sell");
        let log: TradeLog = envelope.decode().unwrap();
        assert_eq!(log.side, TradeSide::Sell);
        assert!(!log.success);
    }

    #[test]
    fn test_event_serializes_as_envelope() {
        let event = MarketEvent::Message {
            data: "hello".to_string(),
        };
        let envelope = Envelope::from_serialize(&event).unwrap();
        assert_eq!(envelope.kind(), event.kind());
    }

    #[test]
    fn test_channels_resolve_both_paths() {
        let settings = Settings::from_toml_str(r#"origin = "https://markets.example.com""#).unwrap();
        let channels = MarketChannels::new(&settings).unwrap();
        assert_eq!(channels.prices().url().as_str(), "wss://markets.example.com/ws/prices");
        assert_eq!(channels.trades().url().as_str(), "wss://markets.example.com/ws/trades");
        assert!(!channels.prices_connected().get());
        assert!(!Arc::ptr_eq(channels.prices_connected(), channels.trades_connected()));
    }
}
