pub mod assignments;
pub mod billing;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod provider;
pub mod stats;
pub mod store;
pub mod tasks;
pub mod types;
pub mod views;
pub mod visibility;

#[cfg(test)]
mod testing;

use assignments::AssignmentStore;
use billing::BillingLedger;
use config::DashboardConfig;
use directory::{member_ids, with_creator, ProjectMember, UserDirectory};
use error::{DashboardError, ProviderError};
use identity::{Role, RoleClassifier};
use provider::{fetch_tasks, with_timeout, DataProvider, RequestToken, RequestTracker};
use std::sync::Arc;
use std::time::Duration;
use store::{JsonDirStore, KeyValueStore};
use tasks::TaskStatus;
use types::{
    BillingEntry, CreateBillingEntryRequest, Identity, Project, ProjectListFilter, Task, User,
};
use views::{DashboardTab, DashboardView, ReportView, Section};
use visibility::VisibilityFilter;

/// One viewer's dashboard session.
///
/// Owns the persisted state (assignments, billing ledger, user cache) and the
/// last project and member listings fetched from the provider. Views are
/// recomputed from that state on every call.
pub struct Dashboard {
    config: DashboardConfig,
    classifier: RoleClassifier,
    provider: Arc<dyn DataProvider>,
    identity: Option<Identity>,
    assignments: AssignmentStore,
    ledger: BillingLedger,
    directory: UserDirectory,
    projects: Section<Project>,
    users: Section<User>,
    task_requests: RequestTracker,
}

impl Dashboard {
    pub fn new(
        config: DashboardConfig,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn DataProvider>,
    ) -> Self {
        Self {
            classifier: RoleClassifier::from_config(&config),
            assignments: AssignmentStore::new(store.clone()),
            ledger: BillingLedger::load(store.clone()),
            directory: UserDirectory::new(store),
            config,
            provider,
            identity: None,
            projects: Section::default(),
            users: Section::default(),
            task_requests: RequestTracker::new(),
        }
    }

    /// Session persisted under `config.store_dir`.
    pub fn open(config: DashboardConfig, provider: Arc<dyn DataProvider>) -> Self {
        let store = Arc::new(JsonDirStore::new(config.store_dir.clone()));
        Self::new(config, store, provider)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Identity became available (or changed): re-read persisted state.
    pub fn set_identity(&mut self, identity: Identity) {
        let role = self.classifier.classify(&identity);
        tracing::info!("Dashboard identity set: {} ({:?})", identity.email, role);

        self.identity = Some(identity);
        self.assignments.refresh();
        self.ledger.reload();
        self.task_requests.cancel();
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| self.classifier.classify(identity))
    }

    pub fn viewer(&self) -> Result<VisibilityFilter<'_>, DashboardError> {
        viewer_for(&self.classifier, self.identity.as_ref(), &self.assignments)
    }

    pub fn projects(&self) -> &Section<Project> {
        &self.projects
    }

    pub fn users(&self) -> &Section<User> {
        &self.users
    }

    /// Refetch projects and members and re-read the persisted blobs. A failed
    /// fetch leaves that list `Unavailable`; the session carries on.
    pub async fn reload(&mut self) {
        let timeout = self.config.provider_timeout;
        let filter = ProjectListFilter::default();

        let projects = with_timeout(timeout, "list_projects", self.provider.list_projects(&filter));
        self.projects = match projects.await {
            Ok(projects) => {
                tracing::info!("Loaded {} projects", projects.len());
                Section::Ready(projects)
            }
            Err(e) => {
                tracing::error!("Error fetching projects: {}", e);
                Section::Unavailable
            }
        };

        let page_size = self.config.members_page_size;
        self.users = match with_timeout(
            timeout,
            "list_memberships",
            self.provider.list_memberships(1, page_size),
        )
        .await
        {
            Ok(users) => {
                tracing::info!("Loaded {} members", users.len());
                Section::Ready(users)
            }
            Err(e) => {
                tracing::error!("Error fetching members: {}", e);
                Section::Unavailable
            }
        };

        self.assignments.refresh();
        self.ledger.reload();
    }

    /// Build the view-model for one tab.
    pub async fn view(&self, tab: &DashboardTab) -> Result<DashboardView, DashboardError> {
        let viewer = self.viewer()?;
        let timeout = self.config.provider_timeout;
        let provider = self.provider.as_ref();

        let view = match tab {
            DashboardTab::ProjectStatus(query) => {
                DashboardView::ProjectStatus(views::project_status(&viewer, &self.projects, query))
            }
            DashboardTab::UsersStatus { search } => DashboardView::UsersStatus(views::users_status(
                &viewer,
                &self.users,
                self.projects.rows(),
                search,
            )),
            DashboardTab::UsersTarget { search } => DashboardView::UsersTarget(views::users_target(
                &viewer,
                &self.users,
                self.projects.rows(),
                search,
                &self.assignments.user_targets(),
            )),
            DashboardTab::BillingReport => {
                let org_report = Section::from_report(
                    "org billing report",
                    with_timeout(timeout, "org_billing_report", provider.org_billing_report())
                        .await,
                );
                DashboardView::BillingReport(views::billing_report(
                    &viewer,
                    self.users.rows(),
                    self.projects.rows(),
                    org_report,
                ))
            }
            DashboardTab::BillingStatus => DashboardView::BillingStatus(views::billing_status(
                self.ledger.list(&viewer, self.users.rows()),
            )),
            DashboardTab::TenantReport => DashboardView::TenantReport(ReportView {
                rows: Section::from_report(
                    "tenant report",
                    with_timeout(timeout, "tenant_report", provider.tenant_report()).await,
                ),
            }),
            DashboardTab::MonthlyProductivity { project_id, month } => {
                DashboardView::MonthlyProductivity(ReportView {
                    rows: Section::from_report(
                        "monthly productivity",
                        with_timeout(
                            timeout,
                            "monthly_productivity",
                            provider.monthly_productivity(*project_id, month),
                        )
                        .await,
                    ),
                })
            }
            DashboardTab::CumulativeProductivity { range, daywise } => {
                DashboardView::CumulativeProductivity(ReportView {
                    rows: Section::from_report(
                        "cumulative productivity",
                        with_timeout(
                            timeout,
                            "cumulative_productivity",
                            provider.cumulative_productivity(range, *daywise),
                        )
                        .await,
                    ),
                })
            }
        };
        Ok(view)
    }

    // ========== BILLING ==========

    pub fn add_billing_entry(
        &mut self,
        request: &CreateBillingEntryRequest,
    ) -> Result<BillingEntry, DashboardError> {
        let viewer = viewer_for(&self.classifier, self.identity.as_ref(), &self.assignments)?;
        self.ledger
            .add(request, &viewer, self.users.rows())
            .map_err(|e| {
                tracing::warn!("Billing entry rejected: {}", e);
                e
            })
    }

    pub fn remove_billing_entry(&mut self, entry_id: i64) -> Result<bool, DashboardError> {
        Ok(self.ledger.remove(entry_id)?)
    }

    /// Callers confirm with the viewer before calling this.
    pub fn clear_billing(&mut self) -> Result<usize, DashboardError> {
        let viewer = viewer_for(&self.classifier, self.identity.as_ref(), &self.assignments)?;
        Ok(self.ledger.clear_all(&viewer, self.users.rows())?)
    }

    // ========== DRILL-DOWNS ==========

    /// Users assigned to a project as the viewer sees them, plus its creator.
    pub async fn project_members(
        &self,
        project_id: i64,
    ) -> Result<Vec<ProjectMember>, DashboardError> {
        let viewer = self.viewer()?;
        let ids = member_ids(&viewer, project_id);
        let users = self
            .directory
            .resolve(&ids, self.provider.as_ref(), self.config.provider_timeout)
            .await;

        let project = self.projects.rows().iter().find(|p| p.id == project_id);
        Ok(with_creator(users, project))
    }

    /// Start a task fetch. Any earlier fetch still in flight becomes stale.
    pub fn begin_tasks(&mut self, project_id: i64, status: TaskStatus) -> TaskRequest {
        TaskRequest {
            token: self.task_requests.begin(),
            project_id,
            status,
            provider: self.provider.clone(),
            timeout: self.config.provider_timeout,
        }
    }

    /// Accept a finished fetch. `None` when a newer fetch superseded it.
    pub fn apply_tasks(&mut self, response: TaskResponse) -> Option<Section<Task>> {
        if !self.task_requests.complete(response.token) {
            return None;
        }
        match response.result {
            Ok(tasks) => Some(Section::Ready(tasks::select(tasks, response.status))),
            Err(e) => {
                tracing::error!("Error fetching tasks for project {}: {}", response.project_id, e);
                Some(Section::Unavailable)
            }
        }
    }

    pub async fn open_tasks(
        &mut self,
        project_id: i64,
        status: TaskStatus,
    ) -> Option<Section<Task>> {
        let response = self.begin_tasks(project_id, status).fetch().await;
        self.apply_tasks(response)
    }
}

fn viewer_for<'a>(
    classifier: &RoleClassifier,
    identity: Option<&'a Identity>,
    assignments: &'a AssignmentStore,
) -> Result<VisibilityFilter<'a>, DashboardError> {
    let identity = identity.ok_or(DashboardError::NoIdentity)?;
    Ok(VisibilityFilter::new(
        classifier.classify(identity),
        identity,
        assignments.assignments(),
        assignments.client_assignments(),
    ))
}

/// An in-flight task fetch. Holds no borrow of the dashboard, so other
/// operations can run while it is awaited.
pub struct TaskRequest {
    token: RequestToken,
    project_id: i64,
    status: TaskStatus,
    provider: Arc<dyn DataProvider>,
    timeout: Duration,
}

impl TaskRequest {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub async fn fetch(self) -> TaskResponse {
        let result = fetch_tasks(self.provider.as_ref(), self.project_id, self.timeout).await;
        TaskResponse {
            token: self.token,
            project_id: self.project_id,
            status: self.status,
            result,
        }
    }
}

pub struct TaskResponse {
    token: RequestToken,
    project_id: i64,
    status: TaskStatus,
    result: Result<Vec<Task>, ProviderError>,
}
