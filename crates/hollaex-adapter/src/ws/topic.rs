/*
[INPUT]:  Topic names such as `orderbook`, `trade:xht-usdt`, `wallet`
[OUTPUT]: Typed subscription topics with market/account classification
[POS]:    WebSocket layer - subscription identity
[UPDATE]: When the exchange adds or renames stream channels
*/

use std::fmt;
use std::str::FromStr;

/// Stream channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Orderbook,
    Trade,
    Order,
    Wallet,
    Deposit,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Orderbook => "orderbook",
            Channel::Trade => "trade",
            Channel::Order => "order",
            Channel::Wallet => "wallet",
            Channel::Deposit => "deposit",
        }
    }

    /// Market channels may be narrowed to one symbol.
    pub fn is_market(&self) -> bool {
        matches!(self, Channel::Orderbook | Channel::Trade)
    }
}

impl FromStr for Channel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orderbook" => Ok(Channel::Orderbook),
            "trade" => Ok(Channel::Trade),
            "order" => Ok(Channel::Order),
            "wallet" => Ok(Channel::Wallet),
            "deposit" => Ok(Channel::Deposit),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription identity: a channel plus an optional symbol.
///
/// Ordering is by channel, then unscoped before scoped, then symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Topic {
    channel: Channel,
    symbol: Option<String>,
}

impl Topic {
    /// Channel-wide topic, e.g. `orderbook` or `wallet`.
    pub fn new(channel: Channel) -> Self {
        Self { channel, symbol: None }
    }

    /// Topic narrowed to one symbol. Account channels ignore the symbol.
    pub fn scoped(channel: Channel, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            channel,
            symbol: (channel.is_market() && !symbol.is_empty()).then_some(symbol),
        }
    }

    pub fn orderbook(symbol: impl Into<String>) -> Self {
        Self::scoped(Channel::Orderbook, symbol)
    }

    pub fn trade(symbol: impl Into<String>) -> Self {
        Self::scoped(Channel::Trade, symbol)
    }

    /// Parse `channel` or `channel:symbol`; `None` for unknown channels.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (name, symbol) = match raw.split_once(':') {
            Some((name, symbol)) => (name, Some(symbol.trim())),
            None => (raw, None),
        };
        let channel = Channel::from_str(name.trim()).ok()?;
        Some(match symbol {
            Some(symbol) => Self::scoped(channel, symbol),
            None => Self::new(channel),
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn is_scoped(&self) -> bool {
        self.symbol.is_some()
    }

    /// Channel-wide form of this topic.
    pub fn unscoped(&self) -> Self {
        Self::new(self.channel)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{}:{}", self.channel, symbol),
            None => f.write_str(self.channel.as_str()),
        }
    }
}

impl From<Channel> for Topic {
    fn from(channel: Channel) -> Self {
        Self::new(channel)
    }
}
