use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ========== IDENTITY ==========
/// The viewer as reported by the current-identity provider.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Identity {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            first_name: None,
            last_name: None,
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    /// "First Last" when both names are set, otherwise the email.
    pub fn display_name(&self) -> Option<String> {
        full_name(self.first_name.as_deref(), self.last_name.as_deref())
            .or_else(|| (!self.email.is_empty()).then(|| self.email.clone()))
    }

    /// Key used for this identity in the persisted assignment maps.
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

// ========== USER ==========
/// A member of the organization, as returned by the memberships listing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub created_by: Option<i64>, // id of the client that onboarded this user
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl User {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            username: None,
            first_name: None,
            last_name: None,
            created_by: None,
            is_active: true,
        }
    }

    pub fn created_by(mut self, creator_id: i64) -> Self {
        self.created_by = Some(creator_id);
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    pub fn display_name(&self) -> String {
        full_name(self.first_name.as_deref(), self.last_name.as_deref())
            .unwrap_or_else(|| self.email.clone())
    }
}

fn default_true() -> bool {
    true
}

fn full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    match (first, last) {
        (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
            Some(format!("{} {}", first, last))
        }
        _ => None,
    }
}

/// Project creator reference embedded in project records.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserRef {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            email: None,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn display_name(&self) -> String {
        full_name(self.first_name.as_deref(), self.last_name.as_deref())
            .or_else(|| self.email.clone())
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| format!("User {}", self.id))
    }
}

impl From<&UserRef> for User {
    fn from(creator: &UserRef) -> Self {
        User {
            id: creator.id,
            email: creator.email.clone().unwrap_or_default(),
            username: creator.username.clone(),
            first_name: creator.first_name.clone(),
            last_name: creator.last_name.clone(),
            created_by: None,
            is_active: true,
        }
    }
}

// ========== PROJECT ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Project {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by: Option<UserRef>,
    #[serde(default)]
    pub task_number: Option<u64>,
    #[serde(default)]
    pub finished_task_number: Option<u64>,
    #[serde(default)]
    pub total_annotations_number: Option<u64>,
    #[serde(default)]
    pub batches: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub is_archived: bool,
}

impl Project {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: Some(title.into()),
            description: None,
            created_by: None,
            task_number: None,
            finished_task_number: None,
            total_annotations_number: None,
            batches: None,
            is_archived: false,
        }
    }

    pub fn with_tasks(mut self, total: u64, finished: u64) -> Self {
        self.task_number = Some(total);
        self.finished_task_number = Some(finished);
        self
    }

    pub fn created_by(mut self, creator: UserRef) -> Self {
        self.created_by = Some(creator);
        self
    }

    pub fn archived(mut self) -> Self {
        self.is_archived = true;
        self
    }
}

/// Query parameters for the project listing.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ProjectListFilter {
    pub show_all: bool,
    pub page_size: u32,
    pub created_by: Option<i64>,
}

impl Default for ProjectListFilter {
    fn default() -> Self {
        Self {
            show_all: true,
            page_size: 1000,
            created_by: None,
        }
    }
}

// ========== TASK ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub annotations: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub annotations_count: Option<i64>,
    #[serde(default)]
    pub annotations_results: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Task {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            data: None,
            annotations: None,
            annotations_count: None,
            annotations_results: None,
            created_at: None,
            updated_at: None,
        }
    }
}

// ========== ASSIGNMENTS ==========
/// user-id -> project ids assigned to that user.
pub type AssignmentMap = BTreeMap<String, BTreeSet<i64>>;

/// client-id -> (project-id -> user ids that client assigned to the project).
pub type ClientAssignmentMap = BTreeMap<String, BTreeMap<String, BTreeSet<i64>>>;

// ========== BILLING ==========
/// One row of the billing ledger, in its persisted shape.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingEntry {
    pub id: i64,
    #[serde(default)]
    pub email_id: String, // empty when the billed member had no email
    pub client_id: String, // display name of the viewer who filed the entry
    pub user_id: String,   // display name of the billed user
    pub hours: f64,
    pub rate: f64,
    #[serde(default)]
    pub total: f64, // recomputed from hours and rate on load
}

/// Raw billing form input; every field arrives as typed text.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillingEntryRequest {
    pub user_id: String,
    pub hours: String,
    pub rate: String,
}

// ========== REPORTS ==========
// Rows of the provider-backed reports. Until a backend serves them the
// dashboard shows them as not yet available.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrgBillingRow {
    pub org_name: String,
    pub total_transactions: u64,
    pub total_datasets: u64,
    pub total_time_taken: String, // HH:MM:SS
    pub total_users: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TenantReportRow {
    pub project_name: String,
    pub level: String,
    pub users: u64,
    pub active_users: u64,
    pub completed_tasks: u64,
    pub total_time_taken: String,
    pub avg_time_per_task: String,
    pub utilization: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProductivityRow {
    pub project_name: String,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub productivity: f64,
    pub utilization: f64,
    #[serde(default)]
    pub daywise: Option<Vec<DailyProductivity>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyProductivity {
    pub date: chrono::NaiveDate,
    pub tasks: u64,
    pub completed: u64,
}

/// Inclusive date range for the cumulative report.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

// ========== STATS ==========
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total: u64,
    pub pending: u64,
    pub complete: u64,
    pub active: u64,
    pub complete_percentage: u32,
    pub users: usize,
    pub batches: usize,
}
