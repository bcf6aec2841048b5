use crate::identity::Role;
use crate::types::{AssignmentMap, BillingEntry, ClientAssignmentMap, Identity, Project, User};
use serde::{Deserialize, Serialize};

/// Active/archived split of the project list. The two are disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatusFilter {
    #[default]
    Active,
    Archived,
}

impl ProjectStatusFilter {
    pub fn matches(self, project: &Project) -> bool {
        match self {
            ProjectStatusFilter::Active => !project.is_archived,
            ProjectStatusFilter::Archived => project.is_archived,
        }
    }
}

/// Search and status predicate applied to projects before role scoping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: ProjectStatusFilter,
}

impl ProjectQuery {
    pub fn new(search: impl Into<String>, status: ProjectStatusFilter) -> Self {
        Self {
            search: search.into(),
            status,
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        let matches_search = contains_ignore_case(&self.search, project.title.as_deref())
            || contains_ignore_case(&self.search, project.description.as_deref());
        matches_search && self.status.matches(project)
    }
}

/// Case-insensitive substring match; an empty needle matches anything.
pub(crate) fn contains_ignore_case(needle: &str, haystack: Option<&str>) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

/// User search over username, email, first name and last name.
pub fn user_matches_search(user: &User, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    [
        user.username.as_deref(),
        Some(user.email.as_str()),
        user.first_name.as_deref(),
        user.last_name.as_deref(),
    ]
    .into_iter()
    .any(|field| contains_ignore_case(search, field))
}

/// True when the user was onboarded by `identity` or is `identity` itself.
pub fn owned_by(user: &User, identity: &Identity) -> bool {
    user.created_by == Some(identity.id) || user.id == identity.id
}

/// Resolve the user a billing entry belongs to by its email. An entry
/// without an email has no owner.
pub fn resolve_entry_owner<'u>(entry: &BillingEntry, users: &'u [User]) -> Option<&'u User> {
    if entry.email_id.is_empty() {
        return None;
    }
    users.iter().find(|user| user.email == entry.email_id)
}

/// Decides, for one viewer, which projects, users and billing rows are visible.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityFilter<'a> {
    role: Role,
    identity: &'a Identity,
    assignments: &'a AssignmentMap,
    client_assignments: &'a ClientAssignmentMap,
}

impl<'a> VisibilityFilter<'a> {
    pub fn new(
        role: Role,
        identity: &'a Identity,
        assignments: &'a AssignmentMap,
        client_assignments: &'a ClientAssignmentMap,
    ) -> Self {
        Self {
            role,
            identity,
            assignments,
            client_assignments,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn identity(&self) -> &'a Identity {
        self.identity
    }

    pub fn client_assignments(&self) -> &'a ClientAssignmentMap {
        self.client_assignments
    }

    pub fn assignments(&self) -> &'a AssignmentMap {
        self.assignments
    }

    /// Administrators see every project matching the query; clients only
    /// the ones assigned to them.
    pub fn project_visible(&self, project: &Project, query: &ProjectQuery) -> bool {
        if !query.matches(project) {
            return false;
        }
        match self.role {
            Role::Administrator => true,
            Role::Client => self
                .assignments
                .get(&self.identity.key())
                .map(|projects| projects.contains(&project.id))
                .unwrap_or(false),
        }
    }

    pub fn user_visible(&self, user: &User) -> bool {
        match self.role {
            Role::Administrator => true,
            Role::Client => owned_by(user, self.identity),
        }
    }

    /// Clients only see entries whose owner resolves to a user they own;
    /// an unresolved owner hides the entry.
    pub fn entry_visible(&self, entry: &BillingEntry, users: &[User]) -> bool {
        match self.role {
            Role::Administrator => true,
            Role::Client => resolve_entry_owner(entry, users)
                .map(|owner| owned_by(owner, self.identity))
                .unwrap_or(false),
        }
    }

    pub fn projects<'p>(&self, projects: &'p [Project], query: &ProjectQuery) -> Vec<&'p Project> {
        projects
            .iter()
            .filter(|project| self.project_visible(project, query))
            .collect()
    }

    pub fn users<'u>(&self, users: &'u [User]) -> Vec<&'u User> {
        users.iter().filter(|user| self.user_visible(user)).collect()
    }

    pub fn entries<'e>(
        &self,
        entries: &'e [BillingEntry],
        users: &[User],
    ) -> Vec<&'e BillingEntry> {
        entries
            .iter()
            .filter(|entry| self.entry_visible(entry, users))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn entry(id: i64, email: &str) -> BillingEntry {
        BillingEntry {
            id,
            email_id: email.to_string(),
            client_id: "Client".to_string(),
            user_id: email.to_string(),
            hours: 1.0,
            rate: 10.0,
            total: 10.0,
        }
    }

    fn users() -> Vec<User> {
        vec![
            User::new(9, "client@example.com"),
            User::new(20, "mine@example.com").created_by(9),
            User::new(21, "theirs@example.com").created_by(8),
            User::new(22, "orphan@example.com"),
        ]
    }

    #[test]
    fn test_client_sees_only_assigned_projects() {
        let identity = Identity::new(9, "client@example.com");
        let mut assignments = AssignmentMap::new();
        assignments.insert("9".to_string(), BTreeSet::from([101, 102]));
        let client_assignments = ClientAssignmentMap::new();
        let projects = vec![
            Project::new(101, "Alpha"),
            Project::new(102, "Beta"),
            Project::new(103, "Gamma"),
        ];

        let filter =
            VisibilityFilter::new(Role::Client, &identity, &assignments, &client_assignments);
        let visible: Vec<i64> = filter
            .projects(&projects, &ProjectQuery::default())
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(visible, vec![101, 102]);

        let admin = VisibilityFilter::new(
            Role::Administrator,
            &identity,
            &assignments,
            &client_assignments,
        );
        assert_eq!(admin.projects(&projects, &ProjectQuery::default()).len(), 3);
    }

    #[test]
    fn test_search_and_status() {
        let identity = Identity::new(1, "a@example.com");
        let assignments = AssignmentMap::new();
        let client_assignments = ClientAssignmentMap::new();
        let mut described = Project::new(2, "Road signs");
        described.description = Some("Traffic LIGHTS only".to_string());
        let projects = vec![
            Project::new(1, "Fruit and Food"),
            described,
            Project::new(3, "Fruit archive").archived(),
        ];
        let filter = VisibilityFilter::new(
            Role::Administrator,
            &identity,
            &assignments,
            &client_assignments,
        );

        let ids = |query: ProjectQuery| -> Vec<i64> {
            filter.projects(&projects, &query).iter().map(|p| p.id).collect()
        };

        assert_eq!(ids(ProjectQuery::new("FRUIT", ProjectStatusFilter::Active)), vec![1]);
        assert_eq!(ids(ProjectQuery::new("fruit", ProjectStatusFilter::Archived)), vec![3]);
        assert_eq!(ids(ProjectQuery::new("lights", ProjectStatusFilter::Active)), vec![2]);
        assert_eq!(ids(ProjectQuery::new("", ProjectStatusFilter::Active)), vec![1, 2]);
    }

    #[test]
    fn test_empty_search_matches_untitled_project() {
        let mut untitled = Project::new(4, "x");
        untitled.title = None;
        assert!(ProjectQuery::default().matches(&untitled));
    }

    #[test]
    fn test_client_user_visibility() {
        let identity = Identity::new(9, "client@example.com");
        let assignments = AssignmentMap::new();
        let client_assignments = ClientAssignmentMap::new();
        let users = users();

        let client =
            VisibilityFilter::new(Role::Client, &identity, &assignments, &client_assignments);
        let visible: Vec<i64> = client.users(&users).iter().map(|u| u.id).collect();
        assert_eq!(visible, vec![9, 20]);

        let admin = VisibilityFilter::new(
            Role::Administrator,
            &identity,
            &assignments,
            &client_assignments,
        );
        assert_eq!(admin.users(&users).len(), 4);
    }

    #[test]
    fn test_entry_visibility_fails_closed_for_clients() {
        let identity = Identity::new(9, "client@example.com");
        let assignments = AssignmentMap::new();
        let client_assignments = ClientAssignmentMap::new();
        let users = users();
        let entries = vec![
            entry(1, "mine@example.com"),
            entry(2, "theirs@example.com"),
            entry(3, "ghost@example.com"),
            entry(4, "client@example.com"),
        ];

        let client =
            VisibilityFilter::new(Role::Client, &identity, &assignments, &client_assignments);
        let visible: Vec<i64> = client.entries(&entries, &users).iter().map(|e| e.id).collect();
        assert_eq!(visible, vec![1, 4]);

        let admin = VisibilityFilter::new(
            Role::Administrator,
            &identity,
            &assignments,
            &client_assignments,
        );
        assert_eq!(admin.entries(&entries, &users).len(), 4);
    }

    #[test]
    fn test_user_search_fields() {
        let mut user = User::new(1, "Jane.Doe@Example.com").with_name("Jane", "Doe");
        user.username = Some("jdoe".to_string());

        assert!(user_matches_search(&user, ""));
        assert!(user_matches_search(&user, "JDOE"));
        assert!(user_matches_search(&user, "example"));
        assert!(user_matches_search(&user, "doe"));
        assert!(!user_matches_search(&user, "smith"));
    }
}
