//! `kubecred verify`: Verify a credential.

use clap::Args;
use serde::{Deserialize, Serialize};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential plaintext.
    pub credential: String,

    /// Verification service endpoint.
    #[arg(short, long, env = "VERIFICATION_SERVICE_URL", default_value = super::DEFAULT_VERIFICATION_URL)]
    pub endpoint: String,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    credential: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    is_valid: bool,
    message: String,
    issued_by: Option<String>,
    issued_at: Option<String>,
}

pub async fn run(args: &VerifyArgs) -> anyhow::Result<()> {
    let url = format!("{}/verify", args.endpoint);
    let body = VerifyRequest {
        credential: &args.credential,
    };

    let resp = reqwest::Client::new().post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: VerifyResponse = r.json().await?;
            if data.is_valid {
                println!("Credential is VALID");
            } else {
                println!("Credential is INVALID");
            }
            println!("  {}", data.message);
            if let Some(ref worker) = data.issued_by {
                println!("  Issued by:  {}", worker);
            }
            if let Some(ref at) = data.issued_at {
                println!("  Issued at:  {}", at);
            }
        }
        Ok(r) => return Err(super::failure("verification", r).await),
        Err(e) => super::unreachable_endpoint(&args.endpoint, e),
    }

    Ok(())
}
