use anyhow::Result;
use colored::Colorize;
use options_downloader::{downloader, logging, AppConfig, YahooClient};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let config = AppConfig::from_env();
    let client = YahooClient::new()?;

    downloader::run(&client, &config).await?;

    println!("{}", "Done!".green().bold());

    Ok(())
}
