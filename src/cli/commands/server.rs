use clap::Subcommand;

use crate::cli::utils::{output_success, output_value};
use crate::cli::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Show server information from the API root endpoint")]
    Info,

    #[command(about = "Check server health from the /health endpoint")]
    Health,
}

pub async fn handle(cmd: ServerCommands, ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;

    match cmd {
        ServerCommands::Info => {
            let info = client.info().await?;
            match ctx.output {
                OutputFormat::Json => output_value(&ctx.output, &info),
                OutputFormat::Text => {
                    println!(
                        "{} {}",
                        info["name"].as_str().unwrap_or("Wakaa API"),
                        info["version"].as_str().unwrap_or("")
                    );
                    println!("URL: {}", ctx.base_url);
                    Ok(())
                }
            }
        }
        ServerCommands::Health => {
            let health = client.health().await?;
            let status = health["status"].as_str().unwrap_or("unknown").to_string();
            output_success(&ctx.output, &format!("{} is {}", ctx.base_url, status), Some(health))
        }
    }
}
