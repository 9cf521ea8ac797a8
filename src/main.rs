use std::{sync::Arc, time::Duration};

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use cinelog::{AppState, config::Config, db, importer, tmdb::TmdbClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinelog=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("cinelog/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;

    let tmdb = Arc::new(TmdbClient::new(
        http,
        config.tmdb_access_token.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_rps,
    ));

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("import") => {
            let pages = parse_pages(args)?;
            let stats = importer::run(&db, &tmdb, &config.tmdb_image_base, pages).await?;
            tracing::info!(
                created = stats.created,
                updated = stats.updated,
                skipped = stats.skipped,
                "import complete"
            );
            return Ok(());
        },
        Some(other) => anyhow::bail!("unknown command: {other}"),
        None => {},
    }

    let state = Arc::new(AppState { config: config.clone(), db, tmdb });

    let app = cinelog::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn parse_pages(mut args: impl Iterator<Item = String>) -> anyhow::Result<u32> {
    match args.next() {
        None => Ok(1),
        Some(flag) if flag == "--pages" => {
            let value = args.next().ok_or_else(|| anyhow::anyhow!("--pages needs a value"))?;
            Ok(value.parse()?)
        },
        Some(value) => Ok(value.parse()?),
    }
}
