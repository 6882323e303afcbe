use safevault::{cli, SafeVaultError};

#[tokio::main]
async fn main() {
    // Load .env file if it exists (optional - won't fail if missing)
    // This must happen before any config is read from environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        let code = e.downcast_ref::<SafeVaultError>().map(SafeVaultError::exit_code).unwrap_or(1);
        std::process::exit(code);
    }
}
