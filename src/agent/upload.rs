//! Signed image upload.
//!
//! The image host authenticates uploads with a signature over
//! `SHA256(challenge ∥ bytes)` made with the account's posting key. The
//! challenge prefix is a protocol constant; it must match byte-for-byte or
//! the host rejects the signature.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::agent::types::{AgentError, AgentResult, UploadOutcome};
use crate::blockchain::wallet::Wallet;

/// Fixed signing-challenge prefix mandated by the image host.
pub const IMAGE_SIGNING_CHALLENGE: &[u8] = b"ImageSigningChallenge";

/// Digest the host expects to be signed for the given image bytes.
pub fn signing_digest(image_bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(IMAGE_SIGNING_CHALLENGE);
    hasher.update(image_bytes);
    hasher.finalize().into()
}

#[derive(Debug, serde::Deserialize)]
struct UploadResponse {
    url: String,
}

/// Sign and upload one image, returning the hosted URL.
pub async fn upload_image(
    http: &reqwest::Client,
    endpoint: &str,
    wallet: &Wallet,
    image_bytes: &[u8],
    file_name: Option<String>,
) -> AgentResult<UploadOutcome> {
    if image_bytes.is_empty() {
        return Err(AgentError::Validation(
            "Image data is empty".to_string(),
        ));
    }

    let signature = wallet.sign_digest(signing_digest(image_bytes))?.to_hex();

    let form = [
        ("file", BASE64.encode(image_bytes)),
        ("signature", signature.clone()),
        ("username", wallet.account_name().to_string()),
    ];

    let response = http.post(endpoint).form(&form).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AgentError::UploadRejected {
            status: status.to_string(),
        });
    }

    let body: UploadResponse = response.json().await?;

    tracing::info!(url = %body.url, "Image uploaded");

    Ok(UploadOutcome {
        url: body.url,
        file_name,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        let bytes = b"fake image bytes";
        assert_eq!(signing_digest(bytes), signing_digest(bytes));
    }

    #[test]
    fn test_digest_sensitive_to_content() {
        let a = signing_digest(b"fake image bytes");
        let b = signing_digest(b"fake image byteS");
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_includes_challenge_prefix() {
        // Hashing the raw bytes without the prefix must not match.
        let bytes = b"fake image bytes";
        let unprefixed: [u8; 32] = Sha256::digest(bytes).into();
        assert_ne!(signing_digest(bytes), unprefixed);
    }
}
