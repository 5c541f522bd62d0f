//! `kubecred check`: Existence check for a credential hash.

use clap::Args;
use serde::{Deserialize, Serialize};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Credential hash (hex).
    pub credential_hash: String,

    /// Issuance service endpoint.
    #[arg(short, long, env = "ISSUANCE_SERVICE_URL", default_value = super::DEFAULT_ISSUANCE_URL)]
    pub endpoint: String,
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    credential_hash: &'a str,
}

#[derive(Deserialize)]
struct CheckResponse {
    exists: bool,
    worker_id: Option<String>,
    issued_at: Option<String>,
}

pub async fn run(args: &CheckArgs) -> anyhow::Result<()> {
    let url = format!("{}/check", args.endpoint);
    let body = CheckRequest {
        credential_hash: &args.credential_hash,
    };

    let resp = reqwest::Client::new().post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: CheckResponse = r.json().await?;
            if !data.exists {
                println!("Not issued");
                return Ok(());
            }
            println!("Issued");
            println!("  Worker:  {}", data.worker_id.as_deref().unwrap_or("-"));
            println!("  At:      {}", data.issued_at.as_deref().unwrap_or("-"));
        }
        Ok(r) => return Err(super::failure("check", r).await),
        Err(e) => super::unreachable_endpoint(&args.endpoint, e),
    }

    Ok(())
}
