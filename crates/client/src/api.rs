use std::{sync::Arc, time::Duration};

use api_types::{
    ErrorResponse,
    transaction::{RESOURCE_PATH, Transaction, TransactionNew},
};
use reqwest::{
    RequestBuilder, Response, Url,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};

use crate::{ClientError, TokenProvider};

/// Timeout applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the transaction API.
///
/// Every request asks the [`TokenProvider`] for a bearer token first. A
/// provider failure is logged and the request goes out unauthenticated.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ClientError::Url(format!("{base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Url(format!("{base_url}: not a base url")));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url,
            http,
            tokens,
        })
    }

    /// `GET /api/v1/transaction/{user_id}`
    pub async fn list_transactions(&self, user_id: &str) -> Result<Vec<Transaction>, ClientError> {
        let endpoint = self.endpoint(&[user_id])?;
        let res = self.send(self.http.get(endpoint)).await?;
        Ok(res.json::<Vec<Transaction>>().await?)
    }

    /// `POST /api/v1/transaction`
    pub async fn create_transaction(&self, payload: &TransactionNew) -> Result<(), ClientError> {
        let endpoint = self.endpoint(&[])?;
        self.send(self.http.post(endpoint).json(payload)).await?;
        Ok(())
    }

    /// `DELETE /api/v1/transaction/{id}`
    pub async fn delete_transaction(&self, id: &str) -> Result<(), ClientError> {
        let endpoint = self.endpoint(&[id])?;
        self.send(self.http.delete(endpoint)).await?;
        Ok(())
    }

    fn endpoint(&self, tail: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(format!("{}: not a base url", self.base_url)))?
            .pop_if_empty()
            .extend(RESOURCE_PATH)
            .extend(tail);
        Ok(url)
    }

    async fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.tokens.token().await {
            Ok(Some(token)) => req.bearer_auth(token),
            Ok(None) => req,
            Err(err) => {
                tracing::error!("failed to get auth token: {err}");
                req
            }
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ClientError> {
        let res = match self.authorize(req).await.send().await {
            Ok(res) => res,
            Err(err) => {
                tracing::error!("network error: {err}");
                return Err(ClientError::Transport(err));
            }
        };

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        tracing::error!("api error: {} {body}", status.as_u16());
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|err| err.error)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        Err(ClientError::from_status(status.as_u16(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticToken;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Arc::new(StaticToken::default())).unwrap()
    }

    #[test]
    fn endpoints_append_to_base_path() {
        let api = client("https://api.example.com");
        assert_eq!(
            api.endpoint(&["user_1"]).unwrap().as_str(),
            "https://api.example.com/api/v1/transaction/user_1"
        );

        let api = client("https://example.com/finance/");
        assert_eq!(
            api.endpoint(&[]).unwrap().as_str(),
            "https://example.com/finance/api/v1/transaction"
        );
    }

    #[test]
    fn ids_are_percent_encoded() {
        let api = client("http://127.0.0.1:3000");
        assert_eq!(
            api.endpoint(&["a/b c"]).unwrap().as_str(),
            "http://127.0.0.1:3000/api/v1/transaction/a%2Fb%20c"
        );
    }

    #[test]
    fn rejects_invalid_base() {
        let tokens: Arc<dyn TokenProvider> = Arc::new(StaticToken::default());
        assert!(matches!(
            ApiClient::new("not a url", tokens.clone()),
            Err(ClientError::Url(_))
        ));
        assert!(matches!(
            ApiClient::new("mailto:me@example.com", tokens),
            Err(ClientError::Url(_))
        ));
    }
}
