//! CLI commands over the connection layer.
//!
//! Each command builds the standard registry and a manager for the given
//! environment, performs one action, prints the result, and returns.

mod format;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{self, NetworkAdapter, Script};
use crate::cli::{Command, EnvArgs, NetworkArgs, ScriptArgs};
use crate::connection::manager::ConnectionManager;
use crate::connection::registry::ConnectorRegistry;
use crate::connection::{ConnectOutcome, ConnectionKind};
use crate::launcher::{LinkOpener, PrintLinkOpener, SystemLinkOpener};
use crate::preference::{
    FilePreference, MemoryPreference, PreferenceError, SelectedWalletStore,
};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("preference: {0}")]
    Preference(#[from] PreferenceError),
    #[error("output: {0}")]
    Output(#[from] serde_json::Error),
}

pub async fn run(command: Command) -> Result<(), CommandError> {
    match command {
        Command::List { env, dark, json } => {
            let (registry, _) = connectors(&env, None, None);
            let manager = ConnectionManager::builder(registry)
                .environment(env.environment())
                .build();
            let options = manager.list_offerable(dark);
            if json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                format::print_options(&options);
            }
        }
        Command::Connect {
            kind,
            env,
            network,
            script,
            no_open,
            disconnect,
            watch_ms,
            selection_file,
            json,
        } => {
            let opener: Arc<dyn LinkOpener> = if no_open {
                Arc::new(PrintLinkOpener)
            } else {
                Arc::new(SystemLinkOpener)
            };
            let preference: Arc<dyn SelectedWalletStore> = match selection_file {
                Some(path) => Arc::new(FilePreference::new(path)),
                None => Arc::new(MemoryPreference::new()),
            };
            let scripts = HashMap::from([(kind, script_from(&script))]);
            let (registry, network_adapter) = connectors(&env, Some(&network), Some(scripts));
            let manager = ConnectionManager::builder(registry)
                .environment(env.environment())
                .link_opener(opener)
                .preference(preference)
                .build();
            // After build, so an unconfigured chain lands in the error table.
            if let Some(chain_id) = env.chain_id {
                network_adapter.select_chain(chain_id);
            }

            let outcome = manager.connect(kind).await;
            tracing::debug!(%kind, ?outcome, "connect finished");

            if watch_ms > 0 {
                tokio::time::sleep(Duration::from_millis(watch_ms)).await;
            }
            if disconnect && outcome == ConnectOutcome::Connected {
                manager.disconnect(kind).await;
            }

            let errors = manager.errors();
            if json {
                let report = format::ConnectReport {
                    kind,
                    outcome: &outcome,
                    state: format!("{:?}", manager.state(kind)),
                    errors: &errors,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                format::print_outcome(kind, &outcome);
                format::print_errors(&errors);
            }
        }
        Command::Selected { selection_file } => {
            let selected = FilePreference::new(selection_file).selected()?;
            format::print_selected(selected);
        }
    }

    Ok(())
}

/// Build the standard registry. The network connector is returned as well
/// so the caller can point it at the environment's chain.
fn connectors(
    env: &EnvArgs,
    network: Option<&NetworkArgs>,
    scripts: Option<HashMap<ConnectionKind, Script>>,
) -> (ConnectorRegistry, Arc<NetworkAdapter>) {
    let network_adapter = NetworkAdapter::new(rpc_urls(env, network));
    let registry =
        adapters::standard_registry(&scripts.unwrap_or_default(), Arc::clone(&network_adapter));
    (registry, network_adapter)
}

fn rpc_urls(env: &EnvArgs, network: Option<&NetworkArgs>) -> HashMap<u64, String> {
    let Some(network) = network else {
        return HashMap::new();
    };
    let mut urls: HashMap<u64, String> = network.rpc.iter().cloned().collect();
    if let Some(url) = &network.rpc_url {
        let chain_id = env.chain_id.unwrap_or(adapters::network::DEFAULT_CHAIN_ID);
        urls.insert(chain_id, url.clone());
    }
    urls
}

fn script_from(args: &ScriptArgs) -> Script {
    Script {
        fail_with: args.fail_with.clone(),
        latency: Duration::from_millis(args.latency_ms),
        drop_after: args.drop_after_ms.map(Duration::from_millis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_args(chain_id: Option<u64>) -> EnvArgs {
        EnvArgs {
            mobile: false,
            user_agent: None,
            injected: None,
            provider: false,
            is_metamask: false,
            is_coinbase_wallet: false,
            chain_id,
        }
    }

    #[test]
    fn rpc_url_binds_to_current_chain() {
        let network = NetworkArgs {
            rpc_url: Some("http://localhost:8545".into()),
            rpc: vec![(1, "https://rpc.example/1".into())],
        };
        let urls = rpc_urls(&env_args(Some(5)), Some(&network));
        assert_eq!(urls.get(&5).map(String::as_str), Some("http://localhost:8545"));
        assert_eq!(urls.get(&1).map(String::as_str), Some("https://rpc.example/1"));
    }

    #[test]
    fn rpc_url_defaults_to_default_chain() {
        let network = NetworkArgs {
            rpc_url: Some("http://localhost:8545".into()),
            rpc: Vec::new(),
        };
        let urls = rpc_urls(&env_args(None), Some(&network));
        assert!(urls.contains_key(&adapters::network::DEFAULT_CHAIN_ID));
    }

    #[test]
    fn script_conversion() {
        let script = script_from(&ScriptArgs {
            fail_with: Some("nope".into()),
            latency_ms: 25,
            drop_after_ms: None,
        });
        assert_eq!(script.fail_with.as_deref(), Some("nope"));
        assert_eq!(script.latency, Duration::from_millis(25));
        assert!(script.drop_after.is_none());
    }

    #[tokio::test]
    async fn connect_then_disconnect_clears_selection_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selected.json");
        let command = Command::Connect {
            kind: ConnectionKind::WalletConnectV1,
            env: env_args(None),
            network: NetworkArgs {
                rpc_url: None,
                rpc: Vec::new(),
            },
            script: ScriptArgs {
                fail_with: None,
                latency_ms: 0,
                drop_after_ms: None,
            },
            no_open: true,
            disconnect: true,
            watch_ms: 0,
            selection_file: Some(path.clone()),
            json: true,
        };
        run(command).await.unwrap();
        assert_eq!(FilePreference::new(&path).selected().unwrap(), None);
    }

    #[tokio::test]
    async fn connect_remembers_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selected.json");
        let command = Command::Connect {
            kind: ConnectionKind::WalletConnectV1,
            env: env_args(None),
            network: NetworkArgs {
                rpc_url: None,
                rpc: Vec::new(),
            },
            script: ScriptArgs {
                fail_with: None,
                latency_ms: 0,
                drop_after_ms: None,
            },
            no_open: true,
            disconnect: false,
            watch_ms: 0,
            selection_file: Some(path.clone()),
            json: false,
        };
        run(command).await.unwrap();
        assert_eq!(
            FilePreference::new(&path).selected().unwrap(),
            Some(ConnectionKind::WalletConnectV1)
        );
    }
}
