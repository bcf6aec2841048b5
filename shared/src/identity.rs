use crate::config::DashboardConfig;
use crate::types::Identity;
use serde::Serialize;

/// The two viewer roles the dashboard distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Client,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Administrator)
    }
}

/// Single place where a viewer's role is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleClassifier {
    admin_roles: Vec<String>,
    admin_emails: Vec<String>,
}

impl RoleClassifier {
    pub fn new(admin_roles: Vec<String>, admin_emails: Vec<String>) -> Self {
        Self {
            admin_roles,
            admin_emails,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.admin_roles.clone(), config.admin_emails.clone())
    }

    /// Administrator iff the identity holds an admin role or its email is on
    /// the override allow-list.
    pub fn classify(&self, identity: &Identity) -> Role {
        let has_admin_role = identity
            .roles
            .iter()
            .any(|role| self.admin_roles.iter().any(|admin| admin == role));
        let is_override = self
            .admin_emails
            .iter()
            .any(|email| email.eq_ignore_ascii_case(&identity.email));

        if has_admin_role || is_override {
            Role::Administrator
        } else {
            Role::Client
        }
    }
}

impl Default for RoleClassifier {
    fn default() -> Self {
        Self::from_config(&DashboardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_role_wins() {
        let classifier = RoleClassifier::default();
        let identity = Identity::new(1, "boss@example.com").with_role("admin");
        assert_eq!(classifier.classify(&identity), Role::Administrator);
    }

    #[test]
    fn test_plain_identity_is_client() {
        let classifier = RoleClassifier::default();
        let identity = Identity::new(9, "client@example.com").with_role("client");
        assert_eq!(classifier.classify(&identity), Role::Client);
    }

    #[test]
    fn test_email_override() {
        let config = DashboardConfig::default().with_admin_email("ops@example.com");
        let classifier = RoleClassifier::from_config(&config);

        assert_eq!(
            classifier.classify(&Identity::new(3, "ops@example.com")),
            Role::Administrator
        );
        assert_eq!(
            classifier.classify(&Identity::new(4, "other@example.com")),
            Role::Client
        );
    }

    #[test]
    fn test_role_alias_is_configurable() {
        let default = RoleClassifier::default();
        let aliased = RoleClassifier::from_config(
            &DashboardConfig::default().with_admin_role("administrator"),
        );
        let identity = Identity::new(5, "a@example.com").with_role("administrator");

        assert_eq!(default.classify(&identity), Role::Client);
        assert_eq!(aliased.classify(&identity), Role::Administrator);
    }
}
