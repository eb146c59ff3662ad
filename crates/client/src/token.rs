//! Bearer tokens issued by the identity provider.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token command failed: {0}")]
    Command(String),
    #[error("token command could not run: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of the session token attached to authenticated requests.
///
/// `Ok(None)` means "no session"; the request is then sent without an
/// `Authorization` header.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<Option<String>, TokenError>;
}

/// A token known up front (configuration or environment).
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<Option<String>, TokenError> {
        Ok(self.0.clone())
    }
}

/// Runs a shell command for every request and uses its trimmed stdout.
///
/// This lets an external helper refresh short-lived session tokens.
#[derive(Debug, Clone)]
pub struct CommandToken {
    command: String,
    envs: Vec<(String, String)>,
}

impl CommandToken {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            envs: Vec::new(),
        }
    }

    /// Adds an environment variable visible to the command.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl TokenProvider for CommandToken {
    async fn token(&self) -> Result<Option<String>, TokenError> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TokenError::Command(format!("{}: {stderr}", output.status)));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!token.is_empty()).then_some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_ignores_blank_values() {
        assert_eq!(StaticToken::new(Some("  ".to_string())).token().await.unwrap(), None);
        assert_eq!(
            StaticToken::new(Some("abc".to_string())).token().await.unwrap(),
            Some("abc".to_string())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_token_reads_stdout() {
        let provider = CommandToken::new("printf '%s\\n' \"$KEY\"").env("KEY", "tok_123");
        assert_eq!(provider.token().await.unwrap(), Some("tok_123".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_token_failure_is_an_error() {
        let provider = CommandToken::new("echo nope >&2; exit 3");
        let err = provider.token().await.unwrap_err();
        assert!(matches!(err, TokenError::Command(msg) if msg.contains("nope")));
    }
}
