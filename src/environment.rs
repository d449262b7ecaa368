//! Environment introspection: mobile detection and injected-provider identity.
//!
//! Everything here is a pure query. The resulting [`Environment`] snapshot
//! is the only input the capability policy looks at; nothing in this module
//! knows about connectors.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Identity of the wallet injected into the browsing environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectedProvider {
    MetaMask,
    CoinbaseWallet,
    /// An injected provider advertising neither recognized identity flag.
    Generic,
}

impl InjectedProvider {
    /// Human-readable wallet name. `None` for unrecognized providers.
    pub fn wallet_name(self) -> Option<&'static str> {
        match self {
            InjectedProvider::MetaMask => Some("MetaMask"),
            InjectedProvider::CoinbaseWallet => Some("Coinbase Wallet"),
            InjectedProvider::Generic => None,
        }
    }
}

impl std::str::FromStr for InjectedProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metamask" => Ok(InjectedProvider::MetaMask),
            "coinbase" | "coinbase_wallet" => Ok(InjectedProvider::CoinbaseWallet),
            "generic" => Ok(InjectedProvider::Generic),
            other => Err(format!(
                "unknown injected provider: {other} (expected: metamask, coinbase, generic)"
            )),
        }
    }
}

/// Identity flags an injected provider exposes on itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderFlags {
    pub is_metamask: bool,
    pub is_coinbase_wallet: bool,
}

/// Classify an injected provider from its identity flags.
///
/// Coinbase Wallet also sets the MetaMask flag for dapp compatibility, so
/// the Coinbase flag is checked first.
pub fn detect_injected(flags: Option<ProviderFlags>) -> Option<InjectedProvider> {
    let flags = flags?;
    if flags.is_coinbase_wallet {
        Some(InjectedProvider::CoinbaseWallet)
    } else if flags.is_metamask {
        Some(InjectedProvider::MetaMask)
    } else {
        Some(InjectedProvider::Generic)
    }
}

static MOBILE_UA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)android|iphone|ipad|ipod|mobile|blackberry|opera mini|iemobile")
        .expect("mobile user-agent pattern is valid")
});

/// Returns true if the user-agent string belongs to a mobile device.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    MOBILE_UA.is_match(user_agent)
}

/// Snapshot of the runtime environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub is_mobile: bool,
    pub injected: Option<InjectedProvider>,
    pub chain_id: Option<u64>,
}

impl Environment {
    pub fn new(is_mobile: bool, injected: Option<InjectedProvider>) -> Self {
        Self {
            is_mobile,
            injected,
            chain_id: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn is_injected(&self) -> bool {
        self.injected.is_some()
    }

    pub fn is_metamask(&self) -> bool {
        self.injected == Some(InjectedProvider::MetaMask)
    }

    pub fn is_coinbase_wallet(&self) -> bool {
        self.injected == Some(InjectedProvider::CoinbaseWallet)
    }

    pub fn is_generic_injector(&self) -> bool {
        self.injected == Some(InjectedProvider::Generic)
    }

    /// Running inside a wallet app's own in-app browser.
    pub fn is_injected_mobile_browser(&self) -> bool {
        self.is_mobile && (self.is_metamask() || self.is_coinbase_wallet())
    }
}
