//! Encrypt a Stripe credential set into a record for `CREDENTIALS_FILE`.
//!
//! ```text
//! echo '{"live":{"secretKey":"sk_live_…","publicKey":"pk_live_…"}}' \
//!     | ENCRYPTION_SECRET=… seal-credentials cred_1
//! ```

use std::io::Read;

use anyhow::Context;
use payment_block::{AesGcmCipher, CredentialRecord, CredentialSet};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let id = std::env::args()
        .nth(1)
        .context("usage: seal-credentials <credentials-id> < credentials.json")?;

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let data: serde_json::Value = serde_json::from_str(&input).context("stdin is not JSON")?;

    // Reject payloads the server could not use
    CredentialSet::from_value(data.clone())?.select(false)?;

    let cipher = AesGcmCipher::from_env()?;
    let record = CredentialRecord::new(id, cipher.seal(&data)?);

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
