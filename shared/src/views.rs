use crate::error::ProviderError;
use crate::stats::compute_stats;
use crate::types::{
    BillingEntry, DateRange, OrgBillingRow, ProductivityRow, Project, ProjectStats,
    TenantReportRow, User,
};
use crate::visibility::{user_matches_search, ProjectQuery, VisibilityFilter};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// State of one list on the dashboard. Anything but `Ready` renders as an
/// empty "none found" list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "rows", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(Vec<T>),
    /// The provider call behind this list failed.
    Unavailable,
    /// No backend serves this data yet.
    NotYetAvailable,
}

impl<T> Section<T> {
    pub fn rows(&self) -> &[T] {
        match self {
            Section::Ready(rows) => rows,
            Section::Unavailable | Section::NotYetAvailable => &[],
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Section::Ready(_))
    }

    pub fn map<U>(&self, f: impl FnOnce(&[T]) -> Vec<U>) -> Section<U> {
        match self {
            Section::Ready(rows) => Section::Ready(f(rows)),
            Section::Unavailable => Section::Unavailable,
            Section::NotYetAvailable => Section::NotYetAvailable,
        }
    }

    /// Fold an optional-report provider answer into a section.
    pub fn from_report(what: &str, result: Result<Option<Vec<T>>, ProviderError>) -> Self {
        match result {
            Ok(Some(rows)) => Section::Ready(rows),
            Ok(None) => Section::NotYetAvailable,
            Err(e) => {
                tracing::error!("Error fetching {}: {}", what, e);
                Section::Unavailable
            }
        }
    }
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Section::Ready(Vec::new())
    }
}

/// Tab selector, carrying the inputs each tab needs.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardTab {
    ProjectStatus(ProjectQuery),
    UsersStatus { search: String },
    UsersTarget { search: String },
    BillingReport,
    BillingStatus,
    TenantReport,
    MonthlyProductivity { project_id: i64, month: String },
    CumulativeProductivity { range: DateRange, daywise: bool },
}

/// One typed view-model per tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tab", rename_all = "snake_case")]
pub enum DashboardView {
    ProjectStatus(ProjectStatusView),
    UsersStatus(UsersStatusView),
    UsersTarget(UsersTargetView),
    BillingReport(BillingReportView),
    BillingStatus(BillingStatusView),
    TenantReport(ReportView<TenantReportRow>),
    MonthlyProductivity(ReportView<ProductivityRow>),
    CumulativeProductivity(ReportView<ProductivityRow>),
}

// ========== PROJECT STATUS ==========
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRow {
    pub id: i64,
    pub title: String,
    pub is_archived: bool,
    pub stats: ProjectStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStatusView {
    pub query: ProjectQuery,
    pub projects: Section<ProjectRow>,
}

pub fn project_status(
    viewer: &VisibilityFilter<'_>,
    projects: &Section<Project>,
    query: &ProjectQuery,
) -> ProjectStatusView {
    let rows = projects.map(|projects| {
        viewer
            .projects(projects, query)
            .into_iter()
            .map(|project| ProjectRow {
                id: project.id,
                title: project.title.clone().unwrap_or_default(),
                is_archived: project.is_archived,
                stats: compute_stats(
                    project,
                    viewer.assignments(),
                    viewer.client_assignments(),
                    viewer.role(),
                    viewer.identity(),
                ),
            })
            .collect()
    });

    ProjectStatusView {
        query: query.clone(),
        projects: rows,
    }
}

// ========== USERS ==========
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStatusRow {
    pub user: User,
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsersStatusView {
    pub search: String,
    pub users: Section<UserStatusRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTargetRow {
    pub user: User,
    pub projects: Vec<ProjectSummary>,
    pub assignments: Vec<i64>,
    /// `None` until a target is set for the user.
    pub target: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsersTargetView {
    pub search: String,
    pub users: Section<UserTargetRow>,
}

/// Projects (from the loaded list) assigned to a user.
fn assigned_projects(
    viewer: &VisibilityFilter<'_>,
    user_id: i64,
    projects: &[Project],
) -> Vec<ProjectSummary> {
    let Some(assigned) = viewer.assignments().get(&user_id.to_string()) else {
        return Vec::new();
    };
    projects
        .iter()
        .filter(|project| assigned.contains(&project.id))
        .map(|project| ProjectSummary {
            id: project.id,
            title: project.title.clone().unwrap_or_default(),
        })
        .collect()
}

fn searched_users<'u>(
    viewer: &VisibilityFilter<'_>,
    users: &'u [User],
    search: &str,
) -> Vec<&'u User> {
    viewer
        .users(users)
        .into_iter()
        .filter(|user| user_matches_search(user, search))
        .collect()
}

pub fn users_status(
    viewer: &VisibilityFilter<'_>,
    users: &Section<User>,
    projects: &[Project],
    search: &str,
) -> UsersStatusView {
    let rows = users.map(|users| {
        searched_users(viewer, users, search)
            .into_iter()
            .map(|user| UserStatusRow {
                user: user.clone(),
                projects: assigned_projects(viewer, user.id, projects),
            })
            .collect()
    });

    UsersStatusView {
        search: search.to_string(),
        users: rows,
    }
}

pub fn users_target(
    viewer: &VisibilityFilter<'_>,
    users: &Section<User>,
    projects: &[Project],
    search: &str,
    targets: &BTreeMap<String, Value>,
) -> UsersTargetView {
    let rows = users.map(|users| {
        searched_users(viewer, users, search)
            .into_iter()
            .map(|user| {
                let key = user.id.to_string();
                UserTargetRow {
                    user: user.clone(),
                    projects: assigned_projects(viewer, user.id, projects),
                    assignments: viewer
                        .assignments()
                        .get(&key)
                        .map(|ids| ids.iter().copied().collect())
                        .unwrap_or_default(),
                    target: targets.get(&key).filter(|v| !v.is_null()).cloned(),
                }
            })
            .collect()
    });

    UsersTargetView {
        search: search.to_string(),
        users: rows,
    }
}

// ========== BILLING ==========
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserOption {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientOption {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingReportView {
    /// Users the viewer may bill for.
    pub users: Vec<UserOption>,
    pub clients: Vec<ClientOption>,
    pub org_report: Section<OrgBillingRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingRow {
    pub entry: BillingEntry,
    pub hours: String,
    pub rate: String,
    pub total: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingStatusView {
    pub entries: Vec<BillingRow>,
}

/// Distinct project creators, in first-seen order.
pub fn client_options(projects: &[Project]) -> Vec<ClientOption> {
    let mut seen = HashSet::new();
    projects
        .iter()
        .filter_map(|project| project.created_by.as_ref())
        .filter(|creator| seen.insert(creator.id))
        .map(|creator| ClientOption {
            id: creator.id,
            name: creator.display_name(),
            email: creator.email.clone().or_else(|| creator.username.clone()),
        })
        .collect()
}

pub fn billing_report(
    viewer: &VisibilityFilter<'_>,
    users: &[User],
    projects: &[Project],
    org_report: Section<OrgBillingRow>,
) -> BillingReportView {
    BillingReportView {
        users: viewer
            .users(users)
            .into_iter()
            .map(|user| UserOption {
                id: user.id,
                name: user.display_name(),
                email: user.email.clone(),
            })
            .collect(),
        clients: client_options(projects),
        org_report,
    }
}

pub fn billing_status(entries: Vec<&BillingEntry>) -> BillingStatusView {
    BillingStatusView {
        entries: entries
            .into_iter()
            .map(|entry| BillingRow {
                hours: entry.hours_display(),
                rate: entry.rate_display(),
                total: entry.total_display(),
                entry: entry.clone(),
            })
            .collect(),
    }
}

// ========== REPORTS ==========
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView<T> {
    pub rows: Section<T>,
}
