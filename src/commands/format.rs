//! Output formatting for CLI commands.
//!
//! Human-readable tables by default; commands with `--json` serialize the
//! same data instead.

use serde::Serialize;

use crate::connection::policy::ConnectionOption;
use crate::connection::{ConnectOutcome, ConnectionKind};

/// JSON shape of `walletd connect --json`.
#[derive(Serialize)]
pub struct ConnectReport<'a> {
    pub kind: ConnectionKind,
    pub outcome: &'a ConnectOutcome,
    pub state: String,
    pub errors: &'a [(ConnectionKind, Option<String>)],
}

/// Print offerable connections as a table to stdout.
pub fn print_options(options: &[ConnectionOption]) {
    if options.is_empty() {
        println!("No wallet connections available");
        return;
    }

    println!("{:<20} {:<18} ICON", "KIND", "NAME");
    println!("{}", "-".repeat(64));
    for o in options {
        println!(
            "{:<20} {:<18} {}",
            o.kind,
            o.display_name,
            o.icon.map_or("-", |icon| icon.path())
        );
    }
}

pub fn print_outcome(kind: ConnectionKind, outcome: &ConnectOutcome) {
    match outcome {
        ConnectOutcome::Connected => println!("{kind}: connected"),
        ConnectOutcome::HandledExternally => println!("{kind}: handled externally"),
        ConnectOutcome::Failed(message) => println!("{kind}: failed ({message})"),
        ConnectOutcome::Rejected(reason) => println!("{kind}: rejected ({reason})"),
    }
}

/// Print the per-kind error table.
pub fn print_errors(errors: &[(ConnectionKind, Option<String>)]) {
    println!();
    println!("{:<20} ERROR", "KIND");
    println!("{}", "-".repeat(64));
    for (kind, error) in errors {
        println!("{:<20} {}", kind, error.as_deref().unwrap_or("-"));
    }
}

pub fn print_selected(selected: Option<ConnectionKind>) {
    match selected {
        Some(kind) => println!("{kind}"),
        None => println!("No wallet selected"),
    }
}
