use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use tally_stats::MemoryStore;
use tally_stats::StatsReporter;
use tower::ServiceBuilder;
use tower_tally::ServiceBuilderExt;
use tower_tally::TrackingConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1. Setup Store
    let store = Arc::new(MemoryStore::new());
    let reporter = StatsReporter::new(Arc::clone(&store));

    // 2. Setup Trackers
    let config = TrackingConfig::new().with_store(store);

    // 3. Build the Router
    let app = Router::new()
        .route("/api/hello", get(|| async { "Hello, Tally!" }))
        .route("/stats", get(report))
        .with_state(reporter)
        .layer(ServiceBuilder::new().track_requests(config));

    // 4. Serve, with ConnectInfo so the remote address is available
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    println!("📡 Listening on http://127.0.0.1:3000 (try /api/hello, then /stats)");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn report(State(reporter): State<StatsReporter<MemoryStore>>) -> String {
    match reporter.summary_report(30, 10).await {
        Ok(report) => report,
        Err(e) => format!("report unavailable: {e}"),
    }
}
