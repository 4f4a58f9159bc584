use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    caption_cli::main_entry().await
}
