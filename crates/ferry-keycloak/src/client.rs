//! Keycloak admin REST implementation of [`IdentityProvider`].

use crate::error::ClientError;
use async_trait::async_trait;
use ferry_core::{
    BearerToken, IdentityRef, NewUser, PasswordCredential, ProviderSettings, RoleRepresentation,
};
use ferry_runtime::token::now;
use ferry_runtime::{IdentityProvider, ProviderError, RoleCreation};
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

/// User-Agent sent with every request: `ferry/{version}`.
pub fn user_agent() -> String {
    format!("ferry/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for one realm of a Keycloak server.
#[derive(Debug, Clone)]
pub struct KeycloakClient {
    http: Client,
    base_url: Url,
    realm: String,
    client_id: String,
    client_secret: String,
}

impl KeycloakClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ClientError> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: settings.base_url.clone(),
                message: "URL cannot carry a path".to_string(),
            });
        }

        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            realm: settings.realm.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        })
    }

    /// `{base}/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn admin(&self, segments: &[&str]) -> Url {
        let mut all = vec!["admin", "realms", self.realm.as_str()];
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }

    fn token_url(&self) -> Url {
        self.endpoint(&[
            "realms",
            self.realm.as_str(),
            "protocol",
            "openid-connect",
            "token",
        ])
    }
}

fn transport(e: reqwest::Error) -> ProviderError {
    ProviderError::Transport(e.to_string())
}

/// The response body as JSON, or as a JSON string when it is not JSON.
async fn error_body(response: Response) -> Value {
    match response.text().await {
        Ok(text) if text.trim().is_empty() => Value::Null,
        Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Err(e) => Value::String(e.to_string()),
    }
}

async fn rejected(response: Response) -> ProviderError {
    let status = response.status().as_u16();
    tracing::debug!(status, url = %response.url(), "Admin API request rejected");
    ProviderError::Rejected {
        status,
        body: error_body(response).await,
    }
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    fn realm(&self) -> &str {
        &self.realm
    }

    async fn acquire_token(&self) -> Result<BearerToken, ProviderError> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(ProviderError::Auth {
                status,
                body: error_body(response).await,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        tracing::debug!(realm = %self.realm, "Acquired service account token");
        Ok(BearerToken::new(token.access_token, now()))
    }

    async fn create_user(
        &self,
        token: &BearerToken,
        user: &NewUser,
    ) -> Result<IdentityRef, ProviderError> {
        let response = self
            .http
            .post(self.admin(&["users"]))
            .bearer_auth(token.access_token())
            .json(user)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(IdentityRef::from_location)
            .ok_or(ProviderError::MissingLocation)
    }

    async fn get_role(
        &self,
        token: &BearerToken,
        name: &str,
    ) -> Result<RoleRepresentation, ProviderError> {
        let response = self
            .http
            .get(self.admin(&["roles", name]))
            .bearer_auth(token.access_token())
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(format!("role '{}'", name)));
        }
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    async fn add_realm_roles(
        &self,
        token: &BearerToken,
        identity: &IdentityRef,
        roles: &[RoleRepresentation],
    ) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.admin(&["users", identity.as_str(), "role-mappings", "realm"]))
            .bearer_auth(token.access_token())
            .json(roles)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }

    async fn reset_password(
        &self,
        token: &BearerToken,
        identity: &IdentityRef,
        credential: &PasswordCredential,
    ) -> Result<(), ProviderError> {
        let response = self
            .http
            .put(self.admin(&["users", identity.as_str(), "reset-password"]))
            .bearer_auth(token.access_token())
            .json(credential)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }

    async fn create_role(
        &self,
        token: &BearerToken,
        name: &str,
    ) -> Result<RoleCreation, ProviderError> {
        let response = self
            .http
            .post(self.admin(&["roles"]))
            .bearer_auth(token.access_token())
            .json(&RoleRepresentation::named(name))
            .send()
            .await
            .map_err(transport)?;

        if response.status().is_success() {
            return Ok(RoleCreation::Created);
        }
        let err = rejected(response).await;
        if err.is_conflict() {
            Ok(RoleCreation::AlreadyExists)
        } else {
            Err(err)
        }
    }
}
