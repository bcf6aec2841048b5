use crate::error::ProviderError;
use crate::types::{
    DateRange, OrgBillingRow, Project, ProjectListFilter, ProductivityRow, Task, TenantReportRow,
    User,
};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Source of projects, memberships and tasks.
///
/// Implementations talk to whatever API backs the dashboard. Report methods
/// default to `Ok(None)`, meaning the backend does not serve that report yet.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn list_projects(
        &self,
        filter: &ProjectListFilter,
    ) -> Result<Vec<Project>, ProviderError>;

    async fn list_memberships(&self, page: u32, page_size: u32) -> Result<Vec<User>, ProviderError>;

    /// Primary task listing.
    async fn list_tasks(&self, project_id: i64) -> Result<Vec<Task>, ProviderError>;

    /// Per-project task endpoint, tried when `list_tasks` fails.
    async fn list_project_tasks(&self, project_id: i64) -> Result<Vec<Task>, ProviderError> {
        Err(ProviderError::Request(format!(
            "no per-project task endpoint for project {}",
            project_id
        )))
    }

    /// `Ok(None)` when the user does not exist.
    async fn get_user(&self, user_id: i64) -> Result<Option<User>, ProviderError>;

    async fn org_billing_report(&self) -> Result<Option<Vec<OrgBillingRow>>, ProviderError> {
        Ok(None)
    }

    async fn tenant_report(&self) -> Result<Option<Vec<TenantReportRow>>, ProviderError> {
        Ok(None)
    }

    async fn monthly_productivity(
        &self,
        _project_id: i64,
        _month: &str,
    ) -> Result<Option<Vec<ProductivityRow>>, ProviderError> {
        Ok(None)
    }

    async fn cumulative_productivity(
        &self,
        _range: &DateRange,
        _daywise: bool,
    ) -> Result<Option<Vec<ProductivityRow>>, ProviderError> {
        Ok(None)
    }
}

/// Run a provider call, giving up after `timeout`.
pub async fn with_timeout<T, F>(timeout: Duration, what: &str, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", what, timeout);
            Err(ProviderError::Timeout(timeout))
        }
    }
}

/// List a project's tasks, falling back to the per-project endpoint when the
/// primary listing fails. Each attempt gets its own timeout.
pub async fn fetch_tasks(
    provider: &dyn DataProvider,
    project_id: i64,
    timeout: Duration,
) -> Result<Vec<Task>, ProviderError> {
    match with_timeout(timeout, "list_tasks", provider.list_tasks(project_id)).await {
        Ok(tasks) => Ok(tasks),
        Err(primary) => {
            tracing::warn!(
                "Task listing failed for project {}, trying per-project endpoint: {}",
                project_id,
                primary
            );
            with_timeout(timeout, "list_project_tasks", provider.list_project_tasks(project_id))
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Per-project task listing failed for project {}: {}",
                        project_id,
                        e
                    );
                    e
                })
        }
    }
}

/// Tag attached to an in-flight fetch so late responses can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(Uuid);

impl RequestToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Tracks the newest request for one view slot. Issuing a token supersedes
/// the previous one.
#[derive(Debug, Default)]
pub struct RequestTracker {
    current: Option<RequestToken>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> RequestToken {
        let token = RequestToken::new();
        self.current = Some(token);
        token
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current == Some(token)
    }

    /// Accept a response. Returns `false` for a superseded token.
    pub fn complete(&mut self, token: RequestToken) -> bool {
        if self.is_current(token) {
            self.current = None;
            true
        } else {
            tracing::debug!("Discarding stale response for request {:?}", token);
            false
        }
    }

    pub fn cancel(&mut self) {
        self.current = None;
    }
}
