//! Demo application driving window counters from several threads.
//!
//! Run with:
//! ```bash
//! RUST_LOG=finestre=debug cargo run --example window_demo --features demo -- --help
//! ```

use clap::Parser;
use finestre::adapters::SwappableWindowCounter;
use finestre::counters::ratio::RatioWindowCounter;
use finestre::counters::window::WindowCounter;
use finestre::counters::Observable;
use finestre::snapshot::{MetricsSnapshot, WindowSnapshot};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Feed sliding-window counters and print their state as they decay.
#[derive(Debug, Parser)]
#[command(name = "window_demo")]
struct Args {
    /// Window length in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    interval_ms: u64,

    /// Number of buckets per window
    #[arg(short, long, default_value_t = 20)]
    resolution: usize,

    /// Number of writer threads
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// How long writers keep producing events, in milliseconds
    #[arg(long, default_value_t = 1500)]
    run_ms: u64,

    /// Pretty-print the JSON snapshots
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let interval = Duration::from_millis(args.interval_ms);

    let requests = WindowCounter::new_with_resolution(interval, args.resolution)?
        .with_name("requests");
    let latency = RatioWindowCounter::new_with_resolution(interval, args.resolution)?
        .with_name("latency_avg_us");
    let errors = SwappableWindowCounter::new_with_resolution(interval, args.resolution)?
        .with_name("errors");

    requests.on_idle(|window| {
        tracing::info!(counter = ?window, "requests window drained");
    });

    let run_for = Duration::from_millis(args.run_ms);
    thread::scope(|s| {
        for t in 0..args.threads {
            let (requests, latency, errors) = (&requests, &latency, &errors);
            s.spawn(move || {
                let start = Instant::now();
                let mut i: u64 = 0;
                while start.elapsed() < run_for {
                    requests.increment(1);
                    latency.increment(100 + ((i * 7 + t as u64) % 50) as i64);
                    if i % 97 == 0 {
                        errors.increment(1);
                    }
                    i += 1;
                    thread::sleep(Duration::from_micros(200));
                }
            });
        }

        s.spawn(|| {
            let start = Instant::now();
            while start.elapsed() < run_for + 2 * interval {
                let counters: Vec<&dyn Observable> = vec![&requests, &latency, &errors];
                let snapshot = MetricsSnapshot::collect(counters.into_iter());
                match snapshot.to_json(args.pretty) {
                    Ok(json) => println!("{json}"),
                    Err(err) => eprintln!("snapshot failed: {err}"),
                }
                thread::sleep(interval / 4);
            }
        });
    });

    let counters: Vec<&dyn Observable> = vec![&requests, &latency, &errors];
    let last = MetricsSnapshot::collect(counters.into_iter());
    if let (Some(req), Some(lat)) = (last.get("requests"), last.get("latency_avg_us")) {
        println!(
            "requests left in window: {}, average latency: {:.1}us",
            req.value.as_i64(),
            lat.value.as_f64()
        );
    }

    println!("{:?}", WindowSnapshot::from_window(&requests));
    println!("peak requests per window: {}", requests.max_rate());
    println!("errors before reset: {errors}");
    errors.reset();
    println!("errors after reset: {errors}");
    Ok(())
}
