//! Thin entrypoint for the `lumen` binary.

#[tokio::main]
async fn main() {
    std::process::exit(lumen_cli::run().await);
}
