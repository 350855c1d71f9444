use anyhow::{Context, Result};
use mailcal_core::FilePaths;
use mailcal_provider_google::Credentials;

pub async fn run() -> Result<()> {
    let files = FilePaths::from_env().context("Invalid configuration")?;

    println!("Authorizing mailcal with Google...");

    Credentials::authorize(&files.token_path, &files.credentials_path)
        .await
        .context("Failed to authorize with Google")?;

    println!("\nSaved credentials to {}", files.token_path.display());
    println!("\nSet SENDER_EMAIL in your environment or .env file,");
    println!("then run `mailcal sync` to create events from your inbox.");

    Ok(())
}
