use crate::config::Config;
use crate::db::StoreClients;
use crate::router::{handle, AppContext};
use crate::sevis_gateway::{HttpSevisGateway, SevisGateway};
use astra::Server;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod db;
mod domain;
mod errors;
mod loaders;
mod migration;
mod mock;
mod responses;
mod router;
mod sevis_gateway;
mod spreadsheets;
mod templates;

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[command(name = "exchange-admin", version, about = "Student-exchange program administration")]
struct Cli {
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the web server (default)
    Serve,
    /// Write a deterministic mock dataset into the tenant database
    Seed {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 40)]
        students: usize,
    },
    /// Backfill users and profiles from a legacy SQL dump
    ImportLegacy { file: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load();
    info!(?config, "configuration loaded");

    let clients = StoreClients::connect(&config);

    let code = match cli.command.unwrap_or(Cmd::Serve) {
        Cmd::Serve => serve(config, clients),
        Cmd::Seed { seed, students } => {
            let ds = mock::MockGenerator::new(seed).dataset(mock::MockSizes {
                students,
                ..Default::default()
            });
            write(&config, &clients, migration::dataset_upserts(ds))
        }
        Cmd::ImportLegacy { file } => match std::fs::read_to_string(&file) {
            Ok(dump) => write(&config, &clients, migration::import_legacy(&dump).records),
            Err(e) => {
                error!(file = %file.display(), "cannot read legacy dump: {e}");
                1
            }
        },
    };
    std::process::exit(code);
}

fn write(config: &Config, clients: &StoreClients, records: Vec<db::Upsert>) -> i32 {
    let Some(admin) = clients.admin.as_ref() else {
        error!("writing requires {} and {}", config::APP_ID_VAR, config::ADMIN_TOKEN_VAR);
        return 1;
    };
    let report = migration::write_in_batches(admin, &records, &config.migration);
    if report.is_clean() {
        0
    } else {
        warn!(failed = report.failed.len(), "some batches were skipped");
        2
    }
}

fn serve(config: Config, clients: StoreClients) -> i32 {
    let addr: SocketAddr = match config.bind.parse() {
        Ok(a) => a,
        Err(e) => {
            error!(bind = %config.bind, "invalid bind address: {e}");
            return 1;
        }
    };

    let gateway: Option<Box<dyn SevisGateway>> = match &config.sevis_endpoint {
        Some(endpoint) => match HttpSevisGateway::new(endpoint.clone(), config.sevis_api_key.clone()) {
            Ok(g) => Some(Box::new(g)),
            Err(e) => {
                warn!("SEVIS gateway disabled: {e}");
                None
            }
        },
        None => None,
    };

    let workers = config.workers;
    let ctx = AppContext {
        clients,
        gateway,
        config,
    };

    info!("Starting server at http://{addr}");
    let server = Server::bind(&addr).max_workers(workers);

    let result = server.serve(move |req, _info| match handle(req, &ctx) {
        Ok(resp) => resp,
        Err(err) => responses::html_error_response(err),
    });

    match result {
        Ok(()) => {
            info!("Server shut down cleanly.");
            0
        }
        Err(e) => {
            error!("Server ended with error: {e}");
            1
        }
    }
}
