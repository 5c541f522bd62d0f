//! `kubecred history`: Verification attempts for a credential hash.

use clap::Args;
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Credential hash (hex).
    pub credential_hash: String,

    /// Verification service endpoint.
    #[arg(short, long, env = "VERIFICATION_SERVICE_URL", default_value = super::DEFAULT_VERIFICATION_URL)]
    pub endpoint: String,

    /// Print the raw JSON response.
    #[arg(long)]
    pub json: bool,
}

#[derive(Deserialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct HistoryEntry {
    is_valid: bool,
    verified_by: String,
    verified_at: String,
}

pub async fn run(args: &HistoryArgs) -> anyhow::Result<()> {
    let url = format!("{}/history/{}", args.endpoint, args.credential_hash);

    match reqwest::get(&url).await {
        Ok(r) if r.status().is_success() => {
            if args.json {
                let raw: serde_json::Value = r.json().await?;
                println!("{}", serde_json::to_string_pretty(&raw)?);
                return Ok(());
            }
            let data: HistoryResponse = r.json().await?;
            if data.entries.is_empty() {
                println!("No verification attempts recorded.");
                return Ok(());
            }
            println!("{} attempt(s), newest first:", data.entries.len());
            for entry in &data.entries {
                let verdict = if entry.is_valid { "VALID" } else { "INVALID" };
                println!("  {}  {:<7}  {}", entry.verified_at, verdict, entry.verified_by);
            }
        }
        Ok(r) => return Err(super::failure("history", r).await),
        Err(e) => super::unreachable_endpoint(&args.endpoint, e),
    }

    Ok(())
}
