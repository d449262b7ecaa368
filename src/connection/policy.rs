//! Capability policy: which connections are offered, how they are labelled,
//! and when activation is intercepted.
//!
//! Pure functions of an [`Environment`] snapshot. Rules, in precedence:
//!
//! - Injected is offered for a recognized wallet, a generic injector, or a
//!   desktop browser with nothing injected (to advertise installation).
//! - WalletConnect v1 is offered unless already inside a wallet's in-app
//!   browser.
//! - WalletConnect v2 and the network fallback are never offered.
//! - Desktop with nothing injected intercepts injected activation and
//!   opens the install page instead.

use serde::Serialize;

use crate::environment::Environment;

use super::ConnectionKind;

/// Where the install link for the advertised wallet points.
pub const INSTALL_URL: &str = "https://metamask.io/";

/// Browsing-context name the install link opens in.
pub const INSTALL_TARGET: &str = "inst_metamask";

/// Display name for an injected provider that identifies as nothing known.
pub const GENERIC_INJECTED_NAME: &str = "Browser Wallet";

/// Static icon assets shipped with the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IconAsset {
    #[serde(rename = "metamask.svg")]
    MetaMask,
    #[serde(rename = "walletConnectIcon.svg")]
    WalletConnect,
    #[serde(rename = "browser-wallet-dark.svg")]
    BrowserWalletDark,
    #[serde(rename = "browser-wallet-light.svg")]
    BrowserWalletLight,
}

impl IconAsset {
    pub fn path(self) -> &'static str {
        match self {
            IconAsset::MetaMask => "metamask.svg",
            IconAsset::WalletConnect => "walletConnectIcon.svg",
            IconAsset::BrowserWalletDark => "browser-wallet-dark.svg",
            IconAsset::BrowserWalletLight => "browser-wallet-light.svg",
        }
    }
}

/// Replacement for the normal activation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOverride {
    OpenInstallPage {
        url: &'static str,
        target: &'static str,
    },
}

/// An offerable connection as the UI renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionOption {
    pub kind: ConnectionKind,
    pub display_name: String,
    pub icon: Option<IconAsset>,
}

/// Desktop browser with nothing injected: advertise the install page.
pub fn should_advertise_install(env: &Environment) -> bool {
    !env.is_injected() && !env.is_mobile
}

/// Whether `kind` is user-selectable in `env`.
pub fn is_offerable(kind: ConnectionKind, env: &Environment) -> bool {
    match kind {
        ConnectionKind::Injected => {
            env.is_metamask()
                || env.is_coinbase_wallet()
                || should_advertise_install(env)
                || env.is_generic_injector()
        }
        // Nesting WalletConnect inside a wallet's own browser breaks the session.
        ConnectionKind::WalletConnectV1 => !env.is_injected_mobile_browser(),
        ConnectionKind::WalletConnectV2 => false,
        ConnectionKind::NetworkFallback => false,
    }
}

pub fn display_name(kind: ConnectionKind, env: &Environment) -> String {
    match kind {
        ConnectionKind::Injected => match env.injected {
            Some(provider) => provider
                .wallet_name()
                .unwrap_or(GENERIC_INJECTED_NAME)
                .to_string(),
            None => "MetaMask".to_string(),
        },
        ConnectionKind::WalletConnectV1 => "WalletConnect".to_string(),
        ConnectionKind::WalletConnectV2 => "WalletConnectV2".to_string(),
        ConnectionKind::NetworkFallback => "Network".to_string(),
    }
}

pub fn icon(kind: ConnectionKind, env: &Environment, dark_mode: bool) -> Option<IconAsset> {
    match kind {
        ConnectionKind::Injected if env.is_generic_injector() => Some(if dark_mode {
            IconAsset::BrowserWalletDark
        } else {
            IconAsset::BrowserWalletLight
        }),
        ConnectionKind::Injected => Some(IconAsset::MetaMask),
        ConnectionKind::WalletConnectV1 | ConnectionKind::WalletConnectV2 => {
            Some(IconAsset::WalletConnect)
        }
        ConnectionKind::NetworkFallback => None,
    }
}

/// Override for activating `kind` in `env`, if any.
pub fn activation_override(kind: ConnectionKind, env: &Environment) -> Option<ActivationOverride> {
    if kind == ConnectionKind::Injected && should_advertise_install(env) {
        Some(ActivationOverride::OpenInstallPage {
            url: INSTALL_URL,
            target: INSTALL_TARGET,
        })
    } else {
        None
    }
}

/// Offerable connections among `kinds`, preserving their order.
pub fn offerable_options(
    kinds: impl IntoIterator<Item = ConnectionKind>,
    env: &Environment,
    dark_mode: bool,
) -> Vec<ConnectionOption> {
    kinds
        .into_iter()
        .filter(|kind| is_offerable(*kind, env))
        .map(|kind| ConnectionOption {
            kind,
            display_name: display_name(kind, env),
            icon: icon(kind, env, dark_mode),
        })
        .collect()
}
