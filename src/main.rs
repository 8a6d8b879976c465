use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    estudio::cli::run().await?;
    Ok(())
}
