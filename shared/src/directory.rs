use crate::assignments::{assigned_by_client, users_assigned_to};
use crate::identity::Role;
use crate::provider::{with_timeout, DataProvider};
use crate::store::{self, KeyValueStore, USER_CACHE_KEY};
use crate::types::{Project, User};
use crate::visibility::VisibilityFilter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Creator,
    Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectMember {
    pub user: User,
    pub kind: MemberKind,
}

/// Users assigned to a project, as far as the viewer may know: every
/// assignment for administrators, only the client's own for clients.
pub fn member_ids(viewer: &VisibilityFilter<'_>, project_id: i64) -> Vec<i64> {
    match viewer.role() {
        Role::Administrator => users_assigned_to(viewer.assignments(), project_id),
        Role::Client => {
            assigned_by_client(viewer.client_assignments(), viewer.identity().id, project_id)
                .into_iter()
                .collect()
        }
    }
}

/// Tag resolved users and append the project creator when missing.
pub fn with_creator(users: Vec<User>, project: Option<&Project>) -> Vec<ProjectMember> {
    let creator = project.and_then(|p| p.created_by.as_ref());
    let mut members: Vec<ProjectMember> = users
        .into_iter()
        .map(|user| {
            let kind = match creator {
                Some(c) if c.id == user.id => MemberKind::Creator,
                _ => MemberKind::Member,
            };
            ProjectMember { user, kind }
        })
        .collect();

    if let Some(creator) = creator {
        if !members.iter().any(|m| m.user.id == creator.id) {
            members.push(ProjectMember {
                user: User::from(creator),
                kind: MemberKind::Creator,
            });
        }
    }
    members
}

/// User lookups backed by the `userInfoCache` blob, filled write-through
/// from the data provider.
pub struct UserDirectory {
    store: Arc<dyn KeyValueStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn cached(&self) -> BTreeMap<String, User> {
        store::load_json(self.store.as_ref(), USER_CACHE_KEY)
    }

    /// Resolve ids in order, cache first. Ids the provider cannot resolve
    /// are skipped.
    pub async fn resolve(
        &self,
        ids: &[i64],
        provider: &dyn DataProvider,
        timeout: Duration,
    ) -> Vec<User> {
        let mut cache = self.cached();
        let mut fetched = 0usize;
        let mut users = Vec::with_capacity(ids.len());

        for id in ids {
            let key = id.to_string();
            if let Some(user) = cache.get(&key) {
                users.push(user.clone());
                continue;
            }

            match with_timeout(timeout, "get_user", provider.get_user(*id)).await {
                Ok(Some(user)) => {
                    cache.insert(key, user.clone());
                    users.push(user);
                    fetched += 1;
                }
                Ok(None) => {
                    tracing::debug!("User {} not found, skipping", id);
                }
                Err(e) => {
                    tracing::error!("Error fetching user {}: {}", id, e);
                }
            }
        }

        if fetched > 0 {
            if let Err(e) = store::save_json(self.store.as_ref(), USER_CACHE_KEY, &cache) {
                tracing::error!("Failed to update user cache: {}", e);
            }
        }
        users
    }
}
