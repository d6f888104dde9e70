//! Mirror replay - project a file of decoded records.
//!
//! # Usage
//!
//! ```bash
//! # Replay with debug output from the handlers
//! RUST_LOG=mirror=debug mirror-replay --records data/sample.json
//!
//! # Only log token mutations, with schedules disabled
//! MIRROR_IMPORTER_PERSIST__SCHEDULES=false mirror-replay --records data/sample.json --kind token
//! ```

mod config;
mod loader;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use config::Config;
use mirror_importer::sink::ResolverUpdatingListener;
use mirror_importer::{
    CompositeListener, ImporterProperties, InMemoryEntityIdResolver, InMemoryLedger, Projector,
};
use mirror_log_sink::LogListener;

fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .init();

    tracing::info!(target: "mirror::replay", "Starting mirror replay");
    tracing::info!(target: "mirror::replay", "Records: {}", config.records.display());
    if let Some(path) = &config.config {
        tracing::info!(target: "mirror::replay", "Importer config: {}", path.display());
    }

    let properties = ImporterProperties::new(config.config.as_deref())?;
    let projector = Projector::new(properties)?;
    let mut records = loader::load_records(&config.records)?;

    let resolver = Arc::new(InMemoryEntityIdResolver::new());
    let mut ledger = ResolverUpdatingListener::new(resolver.clone(), InMemoryLedger::new());
    let mut log_listener = LogListener::new(config.max_logs);
    if let Some(kind) = &config.kind {
        log_listener = log_listener.with_kind_filter(kind.clone());
    }
    let log_store = log_listener.store();

    let processed = {
        let mut listener = CompositeListener::default();
        listener.push(Box::new(&mut ledger));
        listener.push(Box::new(log_listener));
        projector.process_all(&mut records, resolver.as_ref(), &mut listener)?
    };

    let ledger = ledger.into_inner();
    if config.validate {
        ledger.validate()?;
        tracing::info!(target: "mirror::replay", "Ledger histories are non-overlapping");
    }

    let touched: usize = records.iter().map(|record| record.entity_ids().len()).sum();
    println!("Processed {processed} record(s), {touched} touched id(s)");
    println!("Resolver knows {} alias/address mapping(s)", resolver.len());
    println!("Mutations by kind:");
    for (kind, count) in log_store.counts() {
        println!("  {kind:<24} {count}");
    }
    println!(
        "Current rows: {} entities, {} tokens, {} token accounts, {} nfts",
        ledger.entities.len(),
        ledger.tokens.len(),
        ledger.token_accounts.len(),
        ledger.nfts.len()
    );

    Ok(())
}
