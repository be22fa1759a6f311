use std::fmt;

/// Header name used on HTTP requests and Kafka records alike.
pub const BAGGAGE_HEADER: &str = "baggage";

/// Baggage member naming the environment a request was diverted to.
pub const DIVERT_KEY: &str = "okteto-divert";

/// Propagation context carried across every hop.
///
/// The raw header value is forwarded untouched; only the divert member is
/// ever interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baggage(String);

impl Baggage {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Value of the first member named `key`. Member properties (`;k=v`) are ignored.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .split(',')
            .filter_map(|member| {
                let member = member.split(';').next().unwrap_or_default();
                member.split_once('=')
            })
            .find(|(name, _)| name.trim() == key)
            .map(|(_, value)| value.trim())
    }

    /// Divert tag, if the request was routed to a specific environment.
    pub fn divert(&self) -> Option<&str> {
        self.get(DIVERT_KEY).filter(|value| !value.is_empty())
    }
}

impl From<&str> for Baggage {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Baggage {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Baggage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
