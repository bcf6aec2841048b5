use crate::store::{self, KeyValueStore, ASSIGNMENTS_KEY, CLIENT_ASSIGNMENTS_KEY, USER_TARGETS_KEY};
use crate::types::{AssignmentMap, ClientAssignmentMap};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Read-mostly view of the user/project assignment blobs.
///
/// The maps are written by the role-assignment workflow elsewhere; this type
/// only loads them and keeps an in-memory copy that is replaced wholesale on
/// `refresh`.
pub struct AssignmentStore {
    store: Arc<dyn KeyValueStore>,
    assignments: AssignmentMap,
    client_assignments: ClientAssignmentMap,
}

impl AssignmentStore {
    /// Create the store and load both maps.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let mut this = Self {
            store,
            assignments: AssignmentMap::new(),
            client_assignments: ClientAssignmentMap::new(),
        };
        this.refresh();
        this
    }

    /// Read both maps from the persisted store. Missing or malformed blobs
    /// yield empty maps.
    pub fn load(&self) -> (AssignmentMap, ClientAssignmentMap) {
        let raw: BTreeMap<String, Value> = store::load_json(self.store.as_ref(), ASSIGNMENTS_KEY);
        let assignments = raw
            .into_iter()
            .filter_map(|(user_id, ids)| id_set(ASSIGNMENTS_KEY, &ids).map(|set| (user_id, set)))
            .collect();

        let raw: BTreeMap<String, BTreeMap<String, Value>> =
            store::load_json(self.store.as_ref(), CLIENT_ASSIGNMENTS_KEY);
        let client_assignments = raw
            .into_iter()
            .map(|(client_id, per_project)| {
                let per_project = per_project
                    .into_iter()
                    .filter_map(|(project_id, ids)| {
                        id_set(CLIENT_ASSIGNMENTS_KEY, &ids).map(|set| (project_id, set))
                    })
                    .collect();
                (client_id, per_project)
            })
            .collect();

        (assignments, client_assignments)
    }

    /// Replace the in-memory copies with what is currently persisted.
    pub fn refresh(&mut self) {
        let (assignments, client_assignments) = self.load();
        tracing::debug!(
            "Loaded assignments for {} users and {} clients",
            assignments.len(),
            client_assignments.len()
        );
        self.assignments = assignments;
        self.client_assignments = client_assignments;
    }

    pub fn assignments(&self) -> &AssignmentMap {
        &self.assignments
    }

    pub fn client_assignments(&self) -> &ClientAssignmentMap {
        &self.client_assignments
    }

    /// Project ids assigned to a user; empty when the user has none.
    pub fn projects_for(&self, user_id: i64) -> BTreeSet<i64> {
        self.assignments
            .get(&user_id.to_string())
            .cloned()
            .unwrap_or_default()
    }

    /// Distinct users whose assignment set contains the project.
    pub fn users_assigned_to(&self, project_id: i64) -> Vec<i64> {
        users_assigned_to(&self.assignments, project_id)
    }

    /// Users a given client assigned to a project.
    pub fn assigned_by_client(&self, client_id: i64, project_id: i64) -> BTreeSet<i64> {
        assigned_by_client(&self.client_assignments, client_id, project_id)
    }

    /// Per-user targets set by the role-assignment workflow. Read on demand.
    pub fn user_targets(&self) -> BTreeMap<String, Value> {
        store::load_json(self.store.as_ref(), USER_TARGETS_KEY)
    }
}

/// Raw user keys whose assignment set contains the project, numeric or not.
pub(crate) fn user_keys_assigned_to(assignments: &AssignmentMap, project_id: i64) -> Vec<&str> {
    assignments
        .iter()
        .filter(|(_, projects)| projects.contains(&project_id))
        .map(|(user_id, _)| user_id.as_str())
        .collect()
}

pub(crate) fn users_assigned_to(assignments: &AssignmentMap, project_id: i64) -> Vec<i64> {
    user_keys_assigned_to(assignments, project_id)
        .into_iter()
        .filter_map(|user_id| match user_id.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::debug!("Skipping non-numeric user key {} in assignments", user_id);
                None
            }
        })
        .collect()
}

pub(crate) fn assigned_by_client(
    client_assignments: &ClientAssignmentMap,
    client_id: i64,
    project_id: i64,
) -> BTreeSet<i64> {
    client_assignments
        .get(&client_id.to_string())
        .and_then(|per_project| per_project.get(&project_id.to_string()))
        .cloned()
        .unwrap_or_default()
}

/// Accept `[1, "2", 3]`; anything that is not an array drops the entry.
fn id_set(key: &str, value: &Value) -> Option<BTreeSet<i64>> {
    let Some(items) = value.as_array() else {
        tracing::warn!("Ignoring non-array entry in {}: {}", key, value);
        return None;
    };
    Some(items.iter().filter_map(id_from_value).collect())
}

pub(crate) fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store_with(assignments: &str, client: &str) -> Arc<dyn KeyValueStore> {
        Arc::new(
            MemoryStore::new()
                .with_blob(ASSIGNMENTS_KEY, assignments)
                .with_blob(CLIENT_ASSIGNMENTS_KEY, client),
        )
    }

    #[test]
    fn test_load_empty_store() {
        let store = AssignmentStore::new(Arc::new(MemoryStore::new()));
        assert!(store.assignments().is_empty());
        assert!(store.client_assignments().is_empty());
    }

    #[test]
    fn test_malformed_blob_loads_empty() {
        let store = AssignmentStore::new(store_with("{\"9\": [101", "{}"));
        let (assignments, client) = store.load();
        assert!(assignments.is_empty());
        assert!(client.is_empty());
    }

    #[test]
    fn test_mixed_id_encodings() {
        let store = AssignmentStore::new(store_with(
            r#"{"9": [101, "102"], "10": "oops"}"#,
            r#"{"9": {"101": [4, 5, 5]}}"#,
        ));

        assert_eq!(store.projects_for(9), BTreeSet::from([101, 102]));
        assert!(store.projects_for(10).is_empty());
        assert_eq!(store.assigned_by_client(9, 101).len(), 2);
        assert!(store.assigned_by_client(9, 102).is_empty());
        assert!(store.assigned_by_client(1, 101).is_empty());
    }

    #[test]
    fn test_users_assigned_to() {
        let store = AssignmentStore::new(store_with(
            r#"{"1": [5], "2": [5, 6], "3": [6]}"#,
            "{}",
        ));
        assert_eq!(store.users_assigned_to(5), vec![1, 2]);
        assert_eq!(store.users_assigned_to(7), Vec::<i64>::new());
    }

    #[test]
    fn test_refresh_picks_up_new_blob() {
        let backing = Arc::new(MemoryStore::new());
        let mut store = AssignmentStore::new(backing.clone());
        assert!(store.projects_for(9).is_empty());

        backing.set(ASSIGNMENTS_KEY, r#"{"9": [101]}"#).unwrap();
        store.refresh();
        assert_eq!(store.projects_for(9), BTreeSet::from([101]));
    }
}
