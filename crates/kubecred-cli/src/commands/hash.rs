//! `kubecred hash`: Compute a credential hash without contacting a service.

use clap::Args;
use kubecred_core::CredentialHasher;
use std::fmt;

#[derive(Args)]
pub struct HashArgs {
    /// Credential plaintext.
    pub credential: String,

    /// Shared HMAC secret used by the services.
    #[arg(short, long, env = "CREDENTIAL_SECRET", hide_env_values = true)]
    pub secret: String,
}

impl fmt::Debug for HashArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashArgs")
            .field("credential", &self.credential)
            .field("secret", &"<redacted>")
            .finish()
    }
}

pub fn run(args: &HashArgs) -> anyhow::Result<()> {
    let hasher = CredentialHasher::new(&args.secret)?;
    println!("{}", hasher.hash(&args.credential));
    Ok(())
}
