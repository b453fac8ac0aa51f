use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use clap::Parser;
use hdrhistogram::Histogram;
use http::Request;
use http::Response;
use rand::Rng;
use tally_stats::MemoryStore;
use tally_stats::StatsReporter;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tower::BoxError;
use tower::Service;
use tower::ServiceBuilder;
use tower::ServiceExt;
use tower::service_fn;
use tower_tally::ServiceBuilderExt;
use tower_tally::TrackingConfig;

const AGENTS: [&str; 4] = [
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "curl/8.5.0",
    "python-requests/2.32.3",
];

#[derive(Parser, Debug)]
#[command(about = "Drive concurrent requests through the trackers and check nothing is lost")]
struct Args {
    /// Total number of requests
    #[arg(short, long, default_value_t = 50_000)]
    requests: usize,

    /// Distinct client addresses
    #[arg(short, long, default_value_t = 256)]
    clients: u32,

    /// Simulated handler latency
    #[arg(short, long, value_parser = humantime::parse_duration, default_value = "1ms")]
    latency: Duration,

    /// Fraction of requests outside the tracked prefix
    #[arg(short, long, default_value_t = 0.1)]
    untracked: f64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    let store = Arc::new(MemoryStore::new());
    let latency = args.latency;

    let svc = ServiceBuilder::new()
        .track_requests(TrackingConfig::new().with_store(Arc::clone(&store)))
        .service(service_fn(move |_req: Request<()>| async move {
            tokio::time::sleep(latency).await;
            Ok::<_, BoxError>(Response::new(()))
        }));

    let mut hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)?;
    let mut tasks = JoinSet::new();
    let barrier = Arc::new(Barrier::new(args.requests));
    let mut rng = rand::rng();
    let mut tracked = 0u64;

    println!("🚀 Starting Stress Test...");
    println!(
        "Requests: {}, Clients: {}, Latency: {:?}\n",
        args.requests, args.clients, args.latency
    );

    let start = Instant::now();
    for _ in 0..args.requests {
        let client = rng.random_range(0..args.clients.max(1));
        let agent = AGENTS[rng.random_range(0..AGENTS.len())];
        let path = if rng.random_bool(args.untracked.clamp(0.0, 1.0)) {
            "/health"
        } else {
            tracked += 1;
            "/api/v1/items"
        };
        let req = Request::builder()
            .uri(path)
            .header("user-agent", agent)
            .header("x-forwarded-for", format!("10.{}.{}.1", client / 256, client % 256))
            .body(())?;

        let mut local_svc = svc.clone();
        let bar = barrier.clone();
        tasks.spawn(async move {
            bar.wait().await;
            let req_start = Instant::now();
            let res = local_svc.ready().await?.call(req).await;
            res.map(|_| req_start.elapsed())
        });
    }

    let mut failures = 0;
    while let Some(task) = tasks.join_next().await {
        match task? {
            Ok(elapsed) => hist.record(elapsed.as_micros() as u64)?,
            Err(_) => failures += 1,
        }
    }
    let total_duration = start.elapsed();

    println!("--- Tracking Throughput ---");
    println!("Total Duration:  {:.2?}", total_duration);
    println!(
        "Total Rate:      {:.2} req/sec",
        args.requests as f64 / total_duration.as_secs_f64()
    );
    println!("P50 (Elapsed):   {}µs", hist.value_at_quantile(0.5));
    println!("P99 (Elapsed):   {}µs", hist.value_at_quantile(0.99));
    println!("Errors:          {}", failures);
    println!();

    let summary = StatsReporter::new(store).summarize(1).await?;
    let ip_total: u64 = summary.ips().values().sum();
    println!("{}", summary.render(5));
    println!();
    println!("Tracked (expected): {}", tracked);
    println!("User-agent counted: {}", summary.total_requests());
    println!("IP counted:         {}", ip_total);

    if summary.total_requests() != tracked || ip_total != tracked {
        return Err("lost increments under contention".into());
    }
    Ok(())
}
