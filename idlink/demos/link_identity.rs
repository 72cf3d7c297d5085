//! Link a VSTS account from the command line.
//!
//! Prints the authorize URL, then waits for the full callback URL the browser
//! was redirected to and prints the resulting identity.
//!
//! Run with:
//! ```bash
//! VSTS_CLIENT_ID=... VSTS_CLIENT_SECRET=... \
//!     cargo run --example link_identity -- https://app.example.com/identity/callback
//! ```

use idlink::prelude::*;
use std::io::BufRead;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let redirect = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000/identity/callback".to_string());

    let keys = idlink::init_from_env();
    if !keys.iter().any(|k| k == "vsts") {
        anyhow::bail!("set VSTS_CLIENT_ID and VSTS_CLIENT_SECRET first");
    }

    let request = begin_link("vsts", &redirect)?;
    println!("Open this URL and authorize the application:\n\n  {}\n", request.authorize_url);
    println!("Then paste the URL you were redirected to:");

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let callback = url::Url::parse(line.trim())?;

    let identity = complete_link("vsts", &request, CallbackParams::from_url(&callback)).await?;
    println!("{}", serde_json::to_string_pretty(&identity)?);

    if identity.data.is_expired(chrono::Utc::now()) {
        let refreshed = refresh_link("vsts", &identity.data, Some(&redirect)).await?;
        println!("Refreshed token expires at {:?}", refreshed.expires);
    } else {
        println!("Access token still valid until {:?}, no refresh needed", identity.data.expires);
    }

    Ok(())
}
