#[tokio::main]
async fn main() {
    if let Err(e) = riskwatch::run().await {
        tracing::error!("Startup failed: {e}");
        eprintln!("riskwatch: {e}");
        std::process::exit(1);
    }
}
