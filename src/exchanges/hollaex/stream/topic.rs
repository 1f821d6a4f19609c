use std::fmt;
use std::str::FromStr;

/// Trading-pair identifier, e.g. `xht-usdt`
pub type Symbol = String;

/// Named category of streamed events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Orderbook,
    Trade,
    Order,
    UserTrade,
    Wallet,
    Deposit,
    Withdrawal,
    Admin,
}

impl Topic {
    pub const ALL: [Self; 8] = [
        Self::Orderbook,
        Self::Trade,
        Self::Order,
        Self::UserTrade,
        Self::Wallet,
        Self::Deposit,
        Self::Withdrawal,
        Self::Admin,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orderbook => "orderbook",
            Self::Trade => "trade",
            Self::Order => "order",
            Self::UserTrade => "usertrade",
            Self::Wallet => "wallet",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Admin => "admin",
        }
    }

    /// Public topics that can be narrowed to one symbol
    pub const fn is_filterable(self) -> bool {
        matches!(self, Self::Orderbook | Self::Trade)
    }

    /// Topics that need an authenticated stream
    pub const fn is_private(self) -> bool {
        !self.is_filterable()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or(())
    }
}

/// One entry of the desired subscription set
///
/// Only the filterable topics carry a symbol, so "global topic with a symbol"
/// cannot be represented. `None` means every symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionKey {
    Orderbook(Option<Symbol>),
    Trade(Option<Symbol>),
    Order,
    UserTrade,
    Wallet,
    Deposit,
    Withdrawal,
    Admin,
}

impl SubscriptionKey {
    /// Parse the canonical `topic` / `topic:symbol` form
    ///
    /// Unknown topics yield `None`. A symbol on a global topic is dropped, and an
    /// empty symbol reads as the bare topic.
    pub fn parse(raw: &str) -> Option<Self> {
        let (topic, symbol) = match raw.split_once(':') {
            Some((topic, symbol)) => (topic, Some(symbol).filter(|s| !s.is_empty())),
            None => (raw, None),
        };
        let topic = topic.parse::<Topic>().ok()?;
        Some(Self::new(topic, symbol.map(str::to_string)))
    }

    pub fn new(topic: Topic, symbol: Option<Symbol>) -> Self {
        match topic {
            Topic::Orderbook => Self::Orderbook(symbol),
            Topic::Trade => Self::Trade(symbol),
            Topic::Order => Self::Order,
            Topic::UserTrade => Self::UserTrade,
            Topic::Wallet => Self::Wallet,
            Topic::Deposit => Self::Deposit,
            Topic::Withdrawal => Self::Withdrawal,
            Topic::Admin => Self::Admin,
        }
    }

    pub const fn topic(&self) -> Topic {
        match self {
            Self::Orderbook(_) => Topic::Orderbook,
            Self::Trade(_) => Topic::Trade,
            Self::Order => Topic::Order,
            Self::UserTrade => Topic::UserTrade,
            Self::Wallet => Topic::Wallet,
            Self::Deposit => Topic::Deposit,
            Self::Withdrawal => Topic::Withdrawal,
            Self::Admin => Topic::Admin,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Orderbook(symbol) | Self::Trade(symbol) => symbol.as_deref(),
            _ => None,
        }
    }

    /// True for keys covering every symbol (and for all global topics)
    pub fn is_bare(&self) -> bool {
        self.symbol().is_none()
    }

    /// The all-symbols key of the same topic
    pub fn bare(&self) -> Self {
        Self::new(self.topic(), None)
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(symbol) => write!(f, "{}:{}", self.topic(), symbol),
            None => write!(f, "{}", self.topic()),
        }
    }
}

/// Parse a caller-supplied list, silently dropping unknown topics
pub fn parse_keys<S: AsRef<str>>(raw: &[S]) -> Vec<SubscriptionKey> {
    raw.iter()
        .filter_map(|s| SubscriptionKey::parse(s.as_ref()))
        .collect()
}
