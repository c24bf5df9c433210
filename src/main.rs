#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = essaymark_rust::run().await {
        eprintln!("essaymark-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
