//! Example of using the near-peers crawler.

use clap::Parser;
use log::LevelFilter;
use near_peers_crawler::{CrawlerBuilder, Fetch, NodeRecord};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address of the seed node.
    #[arg(short, long)]
    address: String,

    /// RPC port of the nodes.
    #[arg(short, long, default_value = "3030")]
    port: u16,

    /// Custom user agent (optional).
    #[arg(short, long)]
    user_agent: Option<String>,

    /// Maximum number of nodes fetched concurrently.
    #[arg(short, long, default_value = "8")]
    concurrent_tasks: usize,

    /// Timeout of each request in seconds, 0 disables it.
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn slot<T>(fetch: &Fetch<T>) -> &'static str {
    match fetch {
        Fetch::Pending => "pending",
        Fetch::Ready(_) => "ok",
        Fetch::Failed(_) => "failed",
    }
}

fn summary(record: &NodeRecord) -> String {
    let height = record
        .height()
        .map_or_else(|| "-".to_string(), |height| height.to_string());
    let sync = record
        .sync_status()
        .ready()
        .map_or_else(|| "-".to_string(), |sync| format!("{:?}", sync.status()));
    format!(
        "{} height={} validator={} status={} debug={} sync={} ({}) shards={}",
        record.ip(),
        height,
        record.validator_account_id().unwrap_or("-"),
        slot(record.basic_status()),
        slot(record.detailed_status()),
        slot(record.sync_status()),
        sync,
        slot(record.tracked_shards()),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    // Configure fern logger
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} - {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log_level)
        .chain(std::io::stderr())
        .apply()?;

    log::info!("CRAWLING THE NEAR NETWORK");

    let seed = args
        .address
        .parse::<IpAddr>()
        .map_err(|_| format!("Invalid IP address: {}", args.address))?;

    let mut builder = CrawlerBuilder::new().with_port(args.port);
    if let Some(user_agent) = args.user_agent.clone() {
        log::debug!("Using custom user agent: {user_agent}");
        builder = builder.with_user_agent(user_agent)?;
    }

    builder = match args.timeout {
        0 => builder.without_request_timeout(),
        secs => builder.with_request_timeout(Duration::from_secs(secs)),
    };

    log::debug!("Using {} concurrent tasks", args.concurrent_tasks);
    builder = builder.with_max_concurrent_nodes(args.concurrent_tasks);

    // The notifier runs on crawler tasks, hand changes over to this loop.
    let changed = Arc::new(Notify::new());
    let notify = changed.clone();
    let crawler = builder.build(move || notify.notify_one())?;

    let crawl = crawler.crawl(seed.to_string());
    tokio::pin!(crawl);

    loop {
        tokio::select! {
            () = &mut crawl => break,
            () = changed.notified() => {
                let nodes = crawler.nodes();
                log::debug!(
                    "{} nodes known, highest height {:?}",
                    nodes.len(),
                    nodes.highest_height()
                );
            }
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted, reporting partial results");
                break;
            }
        }
    }

    let records = crawler.nodes().records();
    log::info!("{} nodes discovered", records.len());
    for record in &records {
        log::info!("{}", summary(record));
    }

    Ok(())
}
