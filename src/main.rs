use fixed_pool::demo::{self, DemoConfig};
use std::time::Instant;
use tracing_subscriber::EnvFilter;


fn main() -> Result<(), fixed_pool::PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let now = Instant::now();
    let report = demo::run(&DemoConfig::default())?;

    for (consumer, count) in &report.per_consumer {
        println!("consumer #{consumer}: {count} items");
    }
    println!(
        "produced: {}, consumed: {}, elapsed: {:?}",
        report.produced,
        report.consumed,
        now.elapsed()
    );
    Ok(())
}
