use clap::Parser;
use tracing_subscriber::EnvFilter;
use wakaa::cli::utils::output_error;
use wakaa::cli::{Cli, OutputFormat};
use wakaa::client::ClientError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wakaa=info,tower_http=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    if let Err(e) = wakaa::cli::run(cli).await {
        let code = e.downcast_ref::<ClientError>().and_then(ClientError::code);
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("{e:?}"),
            _ => output_error(&output_format, &e.to_string(), code)?,
        }
        std::process::exit(1);
    }

    Ok(())
}
