//! Temporary password issuance.

use crate::error::ProviderError;
use crate::provider::IdentityProvider;
use ferry_audit::{AuditEntry, AuditEvent, AuditSink, PasswordDetail};
use ferry_core::{BearerToken, IdentityRef, PasswordCredential, PasswordPolicy};
use rand::Rng;
use rand::distr::Alphanumeric;

/// Produce a password according to `policy`.
pub fn generate_password(policy: &PasswordPolicy, email: &str) -> String {
    match policy {
        PasswordPolicy::Random { length } => rand::rng()
            .sample_iter(&Alphanumeric)
            .take((*length).max(1))
            .map(char::from)
            .collect(),
        PasswordPolicy::Template { template } => template.replace("{email}", email),
    }
}

/// Sets temporary passwords and audits the issued value.
pub struct PasswordIssuer<'a, P: ?Sized> {
    provider: &'a P,
    audit: &'a dyn AuditSink,
    policy: PasswordPolicy,
}

impl<'a, P> PasswordIssuer<'a, P>
where
    P: IdentityProvider + ?Sized,
{
    pub fn new(provider: &'a P, audit: &'a dyn AuditSink, policy: PasswordPolicy) -> Self {
        Self {
            provider,
            audit,
            policy,
        }
    }

    /// Issue a temporary password; the user must change it on first login.
    ///
    /// Returns the issued value. A failure is audited before it is returned.
    pub async fn issue_password(
        &self,
        identity: &IdentityRef,
        email: &str,
        token: &BearerToken,
    ) -> Result<String, ProviderError> {
        let value = generate_password(&self.policy, email);
        let credential = PasswordCredential::temporary(value.clone());

        match self.provider.reset_password(token, identity, &credential).await {
            Ok(()) => {
                self.audit.record(AuditEntry::success(AuditEvent::SetPassword(PasswordDetail {
                    identity_ref: identity.to_string(),
                    email: email.to_string(),
                    temp_password: Some(value.clone()),
                    ..Default::default()
                })));
                tracing::info!(identity = %identity, email = %email, "Set temporary password");
                Ok(value)
            }
            Err(e) => {
                self.audit.record(AuditEntry::error(AuditEvent::SetPassword(PasswordDetail {
                    identity_ref: identity.to_string(),
                    email: email.to_string(),
                    error: Some(e.detail()),
                    ..Default::default()
                })));
                tracing::error!(identity = %identity, email = %email, error = %e, "Error setting password");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_password_length_and_charset() {
        let pw = generate_password(&PasswordPolicy::Random { length: 24 }, "a@x.com");
        assert_eq!(pw.len(), 24);
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));

        let other = generate_password(&PasswordPolicy::Random { length: 24 }, "a@x.com");
        assert_ne!(pw, other);
    }

    #[test]
    fn test_template_password() {
        let policy = PasswordPolicy::Template {
            template: "{email}_2025".to_string(),
        };
        assert_eq!(generate_password(&policy, "c@x.com"), "c@x.com_2025");
    }
}
