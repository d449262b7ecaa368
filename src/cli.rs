use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::connection::ConnectionKind;
use crate::environment::{self, Environment, InjectedProvider, ProviderFlags};

#[derive(Parser)]
#[command(name = "walletd", about = "Wallet connection manager")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the wallet connections offered in this environment
    List {
        #[command(flatten)]
        env: EnvArgs,

        /// Resolve icons for a dark theme
        #[arg(long)]
        dark: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Connect a wallet and report the outcome
    Connect {
        /// Connection kind: injected, walletconnect, wc2, network
        kind: ConnectionKind,

        #[command(flatten)]
        env: EnvArgs,

        #[command(flatten)]
        network: NetworkArgs,

        #[command(flatten)]
        script: ScriptArgs,

        /// Print install links instead of opening them
        #[arg(long)]
        no_open: bool,

        /// Disconnect again after a successful connect
        #[arg(long)]
        disconnect: bool,

        /// Keep running this long before printing error state
        #[arg(long, value_name = "MS", default_value_t = 0)]
        watch_ms: u64,

        /// Remember the selected wallet in this file
        #[arg(long, env = "WALLETD_SELECTION_FILE")]
        selection_file: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the remembered wallet
    Selected {
        #[arg(long, env = "WALLETD_SELECTION_FILE")]
        selection_file: PathBuf,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::List { .. } => "list",
            Command::Connect { .. } => "connect",
            Command::Selected { .. } => "selected",
        }
    }
}

/// Environment facts. On a desktop these would come from the browser.
#[derive(Args, Debug, Clone)]
pub struct EnvArgs {
    /// Treat the device as mobile
    #[arg(long)]
    pub mobile: bool,

    /// User-agent string; mobile devices are detected from it
    #[arg(long, env = "WALLETD_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Injected provider: metamask, coinbase, generic (default: none)
    #[arg(long, conflicts_with_all = ["provider", "is_metamask", "is_coinbase_wallet"])]
    pub injected: Option<InjectedProvider>,

    /// An injected provider is present; classify it from its flags
    #[arg(long)]
    pub provider: bool,

    /// The injected provider sets `isMetaMask`
    #[arg(long)]
    pub is_metamask: bool,

    /// The injected provider sets `isCoinbaseWallet`
    #[arg(long)]
    pub is_coinbase_wallet: bool,

    /// Current chain id
    #[arg(long, env = "WALLETD_CHAIN_ID")]
    pub chain_id: Option<u64>,
}

impl EnvArgs {
    pub fn environment(&self) -> Environment {
        let is_mobile = self.mobile
            || self
                .user_agent
                .as_deref()
                .is_some_and(environment::is_mobile_user_agent);
        let env = Environment::new(is_mobile, self.injected.or_else(|| self.detected()));
        match self.chain_id {
            Some(chain_id) => env.with_chain_id(chain_id),
            None => env,
        }
    }
}

impl EnvArgs {
    fn detected(&self) -> Option<InjectedProvider> {
        let present = self.provider || self.is_metamask || self.is_coinbase_wallet;
        environment::detect_injected(present.then_some(ProviderFlags {
            is_metamask: self.is_metamask,
            is_coinbase_wallet: self.is_coinbase_wallet,
        }))
    }
}

/// RPC endpoints for the network fallback connector.
#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// RPC URL for the current chain
    #[arg(long, env = "WALLETD_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Additional endpoint as CHAIN_ID=URL (repeatable)
    #[arg(long = "rpc", value_name = "CHAIN_ID=URL", value_parser = parse_rpc_entry)]
    pub rpc: Vec<(u64, String)>,
}

/// Simulated wallet behavior for the connector being connected.
#[derive(Args, Debug, Clone)]
pub struct ScriptArgs {
    /// Fail activation with this message
    #[arg(long, value_name = "MESSAGE")]
    pub fail_with: Option<String>,

    /// Simulated approval latency
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub latency_ms: u64,

    /// Simulate the wallet dropping the session after this long
    #[arg(long, value_name = "MS")]
    pub drop_after_ms: Option<u64>,
}

fn parse_rpc_entry(s: &str) -> Result<(u64, String), String> {
    let (chain, url) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CHAIN_ID=URL, got {s}"))?;
    let chain = chain
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid chain id {chain}: {e}"))?;
    let url = url.trim();
    if url.is_empty() {
        return Err(format!("missing URL for chain {chain}"));
    }
    Ok((chain, url.to_string()))
}
