use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const ADMIN_EMAILS_ENV: &str = "DASHBOARD_ADMIN_EMAILS";
pub const ADMIN_ROLES_ENV: &str = "DASHBOARD_ADMIN_ROLES";
pub const PROVIDER_TIMEOUT_ENV: &str = "DASHBOARD_PROVIDER_TIMEOUT_MS";
pub const MEMBERS_PAGE_SIZE_ENV: &str = "DASHBOARD_MEMBERS_PAGE_SIZE";
pub const STORE_DIR_ENV: &str = "DASHBOARD_STORE_DIR";

/// Role name that grants the administrator view.
pub const DEFAULT_ADMIN_ROLE: &str = "admin";
const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MEMBERS_PAGE_SIZE: u32 = 100;
const DEFAULT_STORE_DIR: &str = ".labelboard";

/// Runtime settings for the dashboard engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Emails that are always treated as administrators, whatever their roles.
    pub admin_emails: Vec<String>,
    /// Role names that grant the administrator view.
    pub admin_roles: Vec<String>,
    pub provider_timeout: Duration,
    pub members_page_size: u32,
    pub store_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            admin_emails: Vec::new(),
            admin_roles: vec![DEFAULT_ADMIN_ROLE.to_string()],
            provider_timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            members_page_size: DEFAULT_MEMBERS_PAGE_SIZE,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl DashboardConfig {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let admin_emails = env::var(ADMIN_EMAILS_ENV)
            .map(|raw| split_list(&raw))
            .unwrap_or(defaults.admin_emails);

        let admin_roles = env::var(ADMIN_ROLES_ENV)
            .map(|raw| split_list(&raw))
            .ok()
            .filter(|roles| !roles.is_empty())
            .unwrap_or(defaults.admin_roles);

        let provider_timeout = env::var(PROVIDER_TIMEOUT_ENV)
            .ok()
            .and_then(|raw| parse_or_warn::<u64>(PROVIDER_TIMEOUT_ENV, &raw))
            .map(Duration::from_millis)
            .unwrap_or(defaults.provider_timeout);

        let members_page_size = env::var(MEMBERS_PAGE_SIZE_ENV)
            .ok()
            .and_then(|raw| parse_or_warn::<u32>(MEMBERS_PAGE_SIZE_ENV, &raw))
            .filter(|size| *size > 0)
            .unwrap_or(defaults.members_page_size);

        let store_dir = env::var(STORE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or(defaults.store_dir);

        Self {
            admin_emails,
            admin_roles,
            provider_timeout,
            members_page_size,
            store_dir,
        }
    }

    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_emails.push(email.into());
        self
    }

    pub fn with_admin_role(mut self, role: impl Into<String>) -> Self {
        self.admin_roles.push(role.into());
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or_warn<T: std::str::FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {} value: {}", name, raw);
            None
        }
    }
}
