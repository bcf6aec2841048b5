use crate::error::ProviderError;
use crate::provider::DataProvider;
use crate::types::{Project, ProjectListFilter, Task, TenantReportRow, User};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// In-memory provider with per-endpoint failure switches and call counting.
#[derive(Default)]
pub(crate) struct FakeProvider {
    projects: Vec<Project>,
    users: Vec<User>,
    tasks: HashMap<i64, Vec<Task>>,
    tenant_rows: Option<Vec<TenantReportRow>>,
    failing: HashSet<&'static str>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<&'static str, usize>>,
    filters: Mutex<Vec<ProjectListFilter>>,
}

impl FakeProvider {
    pub(crate) fn with_projects(mut self, projects: Vec<Project>) -> Self {
        self.projects = projects;
        self
    }

    pub(crate) fn with_users(mut self, users: Vec<User>) -> Self {
        self.users = users;
        self
    }

    pub(crate) fn with_tasks(mut self, project_id: i64, tasks: Vec<Task>) -> Self {
        self.tasks.insert(project_id, tasks);
        self
    }

    pub(crate) fn with_tenant_rows(mut self, rows: Vec<TenantReportRow>) -> Self {
        self.tenant_rows = Some(rows);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn failing(mut self, endpoint: &'static str) -> Self {
        self.failing.insert(endpoint);
        self
    }

    pub(crate) fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().get(endpoint).copied().unwrap_or(0)
    }

    pub(crate) fn last_filter(&self) -> Option<ProjectListFilter> {
        self.filters.lock().last().cloned()
    }

    async fn enter(&self, endpoint: &'static str) -> Result<(), ProviderError> {
        *self.calls.lock().entry(endpoint).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(endpoint) {
            return Err(ProviderError::Request(format!("{} failed", endpoint)));
        }
        Ok(())
    }
}

#[async_trait]
impl DataProvider for FakeProvider {
    async fn list_projects(
        &self,
        filter: &ProjectListFilter,
    ) -> Result<Vec<Project>, ProviderError> {
        self.filters.lock().push(filter.clone());
        self.enter("list_projects").await?;
        Ok(self.projects.clone())
    }

    async fn list_memberships(
        &self,
        _page: u32,
        page_size: u32,
    ) -> Result<Vec<User>, ProviderError> {
        self.enter("list_memberships").await?;
        Ok(self.users.iter().take(page_size as usize).cloned().collect())
    }

    async fn list_tasks(&self, project_id: i64) -> Result<Vec<Task>, ProviderError> {
        self.enter("list_tasks").await?;
        Ok(self.tasks.get(&project_id).cloned().unwrap_or_default())
    }

    async fn list_project_tasks(&self, project_id: i64) -> Result<Vec<Task>, ProviderError> {
        self.enter("list_project_tasks").await?;
        Ok(self.tasks.get(&project_id).cloned().unwrap_or_default())
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, ProviderError> {
        self.enter("get_user").await?;
        Ok(self.users.iter().find(|user| user.id == user_id).cloned())
    }

    async fn tenant_report(&self) -> Result<Option<Vec<TenantReportRow>>, ProviderError> {
        self.enter("tenant_report").await?;
        Ok(self.tenant_rows.clone())
    }
}
