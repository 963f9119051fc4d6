use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::BackendError;

/// Source of bearer tokens for the managed Google endpoints.
#[async_trait]
pub trait AccessTokens: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, BackendError>;
}

/// Resolves tokens from the active application-default login, the same
/// credential source the deployment's preflight check verifies.
#[derive(Clone, Copy, Debug, Default)]
pub struct GcloudTokens;

#[async_trait]
impl AccessTokens for GcloudTokens {
    async fn access_token(&self) -> Result<SecretString, BackendError> {
        let output = tokio::process::Command::new("gcloud")
            .args(["auth", "application-default", "print-access-token"])
            .output()
            .await
            .map_err(|error| {
                BackendError::TokenSource(format!("could not run gcloud: {error}"))
            })?;

        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(BackendError::TokenSource(format!(
                "no active application-default login: {detail}"
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(BackendError::TokenSource(
                "gcloud returned an empty access token".to_string(),
            ));
        }

        Ok(token.into())
    }
}
