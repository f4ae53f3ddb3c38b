use clap::Parser;
use gallery_api::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ADMIN_PASSWORD_HASH and friends may live in .env
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = gallery_api::cli::run(cli).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
