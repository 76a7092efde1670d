//! # depot: Back-Office Exit Billing CLI
//!
//! ```bash
//! depot resolve LO-1001
//! depot weigh LO-1001 --line 1:12400:4100 --weighbridge-fee 500 --permission exit.save
//! depot save LO-1001 --status final --permission exit.finalize
//! depot delete 17 --permission exit.delete
//! ```
//!
//! Logging goes to stderr. `RUST_LOG` overrides the `[logging] level` config key.

mod cli;
mod render;

use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use depot_billing::context::{PERM_EXIT_DELETE, PERM_EXIT_FINALIZE, PERM_EXIT_SAVE};
use depot_billing::{
    DepotConfig, ExitPersister, ExitResolver, ExitSession, SearchOutcome, SharedStore, UserContext,
};
use depot_core::{ExitStatus, Money, SystemClock};
use depot_db::{Database, DbConfig};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = DepotConfig::load(cli.config.clone())?;
    if let Some(path) = &cli.db {
        config.database.path = path.clone();
    }
    init_tracing(&config.logging.level);
    debug!(?config, "Configuration loaded");

    let user = UserContext::new(
        cli.operator.user.clone(),
        cli.operator.role.clone(),
        cli.operator.permissions.clone(),
    );

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await?;

    if let Commands::Migrate = cli.command {
        let (total, applied) = depot_db::migrations::migration_status(db.pool()).await?;
        println!("Database: {}", config.database.path.display());
        println!("Migrations applied: {}/{}", applied, total);
        db.close().await;
        return Ok(());
    }

    let store: SharedStore = Arc::new(db.clone());
    let resolver = Arc::new(ExitResolver::new(
        store.clone(),
        Arc::new(SystemClock),
        config.billing.monthly_proration,
    ));
    let persister = Arc::new(ExitPersister::new(store, config.billing.reference_prefix.clone()));
    let session = ExitSession::new(resolver, persister);

    let result = run(cli, &session, &user).await;
    db.close().await;
    result
}

async fn run(
    cli: Cli,
    session: &ExitSession,
    user: &UserContext,
) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => {}

        Commands::Resolve { key } => {
            load(session, &key).await?;
            print(session, cli.json)?;
        }

        Commands::Weigh {
            key,
            readings,
            weighbridge_fee,
            extra_fee,
            extra_description,
            payment,
            proration,
            status,
        } => {
            let status = ExitStatus::from(status);
            require_save_permission(user, status)?;
            load(session, &key).await?;

            session.with_document_mut(|doc| {
                for reading in &readings {
                    doc.set_weights(reading.line, reading.full_kg, reading.empty_kg)?;
                }
                if let Some(fee) = weighbridge_fee {
                    doc.set_weighbridge_fee(Money::from_units(fee))?;
                }
                if extra_fee.is_some() || extra_description.is_some() {
                    let fee = extra_fee.map(Money::from_units).unwrap_or(doc.extra_fee);
                    let description = extra_description.clone().or(doc.extra_description.clone());
                    doc.set_extra_fee(fee, description)?;
                }
                if let Some(method) = payment {
                    doc.set_payment_method(method.into())?;
                }
                if let Some(enabled) = proration {
                    doc.set_monthly_proration(enabled)?;
                }
                Ok(())
            })?;

            save(session, status, user, cli.json).await?;
        }

        Commands::Save { key, status } => {
            let status = ExitStatus::from(status);
            require_save_permission(user, status)?;
            load(session, &key).await?;
            save(session, status, user, cli.json).await?;
        }

        Commands::Delete { exit_id } => {
            require(user, PERM_EXIT_DELETE)?;
            load(session, &exit_id.to_string()).await?;
            session.delete(user).await?;
            println!("Exit {} deleted", exit_id);
        }
    }

    Ok(())
}

async fn load(session: &ExitSession, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    match session.search(key).await? {
        SearchOutcome::Loaded(state) => {
            info!(key, ?state, "Loaded exit document");
            Ok(())
        }
        SearchOutcome::Superseded => Err("search was superseded".into()),
    }
}

async fn save(
    session: &ExitSession,
    status: ExitStatus,
    user: &UserContext,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let exit_id = session.save(status, user).await?;
    if !json {
        println!("Saved exit {} as {}", exit_id, status);
        println!();
    }
    print(session, json)
}

fn print(session: &ExitSession, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let out = session.with_document(serde_json::to_string_pretty)??;
        println!("{}", out);
    } else {
        let state = session.state();
        session.with_document(|doc| match state {
            Some(state) => render::print_resolution(&depot_billing::Resolution {
                state,
                document: doc.clone(),
            }),
            None => render::print_document(doc),
        })?;
    }
    Ok(())
}

fn require_save_permission(
    user: &UserContext,
    status: ExitStatus,
) -> Result<(), Box<dyn std::error::Error>> {
    match status {
        ExitStatus::Draft => require(user, PERM_EXIT_SAVE),
        ExitStatus::Final => require(user, PERM_EXIT_FINALIZE),
    }
}

fn require(user: &UserContext, permission: &str) -> Result<(), Box<dyn std::error::Error>> {
    if user.has_permission(permission) {
        Ok(())
    } else {
        Err(format!("user '{}' lacks permission '{}'", user.username, permission).into())
    }
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=depot_billing=trace` - Trace the engine only
/// - Default: the configured level, with sqlx at warn
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", level.to_lowercase())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
