#[tokio::main]
async fn main() {
    if let Err(err) = soulresearch_cli::cli::run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
