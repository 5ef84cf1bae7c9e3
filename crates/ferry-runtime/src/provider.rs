use crate::error::ProviderError;
use async_trait::async_trait;
use ferry_core::{BearerToken, IdentityRef, NewUser, PasswordCredential, RoleRepresentation};

/// Result of a role creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCreation {
    Created,
    AlreadyExists,
}

/// Administrative API of the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Realm (tenant) every call is scoped to.
    fn realm(&self) -> &str;

    /// Exchange the client credentials for a bearer token.
    async fn acquire_token(&self) -> Result<BearerToken, ProviderError>;

    /// Create an account and return its reference.
    async fn create_user(
        &self,
        token: &BearerToken,
        user: &NewUser,
    ) -> Result<IdentityRef, ProviderError>;

    /// Look up a realm role by name.
    async fn get_role(
        &self,
        token: &BearerToken,
        name: &str,
    ) -> Result<RoleRepresentation, ProviderError>;

    /// Attach realm roles to an account in one call.
    async fn add_realm_roles(
        &self,
        token: &BearerToken,
        identity: &IdentityRef,
        roles: &[RoleRepresentation],
    ) -> Result<(), ProviderError>;

    /// Replace the account's password.
    async fn reset_password(
        &self,
        token: &BearerToken,
        identity: &IdentityRef,
        credential: &PasswordCredential,
    ) -> Result<(), ProviderError>;

    /// Create a realm role; an existing role is not an error.
    async fn create_role(
        &self,
        token: &BearerToken,
        name: &str,
    ) -> Result<RoleCreation, ProviderError>;
}
