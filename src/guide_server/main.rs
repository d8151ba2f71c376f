// Berlin bus guide backend
// HTTP API consumed by the circle editor

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::let_and_return,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::op_ref,
    clippy::useless_vec
)]

mod api;

use actix_cors::Cors;
use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpServer, middleware, web};
use bus_guide::config::GuideConfig;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Serves circles, articles and routes for the guide editor",
    long_about = None
)]
struct Args {
    /// Address to bind, overrides BUS_GUIDE_HOST
    #[arg(long)]
    host: Option<String>,
    /// Port to bind, overrides BUS_GUIDE_PORT
    #[arg(short, long)]
    port: Option<u16>,
    /// Directory holding user_circles.json and articles.json
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Directory holding bus<ID>.geojson route files
    #[arg(long)]
    routes_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = GuideConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(routes_dir) = args.routes_dir {
        config.routes_dir = routes_dir;
    }

    info!(
        "Circles at {}, articles at {}, routes in {}",
        config.circles_path().display(),
        config.articles_path().display(),
        config.routes_dir.display()
    );

    let state = web::Data::new(api::AppState::new(&config));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(DefaultHeaders::new().add(("Server", "Bus Guide")))
            .wrap(middleware::Compress::default())
            .app_data(state.clone())
            .configure(api::config)
    })
    .workers(args.workers)
    .bind((config.host.as_str(), config.port))?;

    info!("Listening on {}:{}", config.host, config.port);

    server.run().await?;

    Ok(())
}
