//! homedeck - smart-home buttons for Stream Deck style hosts
//!
//! This is the binary entry point. All logic lives in the library.

use homedeck::host::LaunchArgs;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = LaunchArgs::parse_from_host(std::env::args())?;
    homedeck::run(args).await?;
    Ok(())
}
