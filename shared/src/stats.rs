use crate::assignments::{assigned_by_client, user_keys_assigned_to};
use crate::identity::Role;
use crate::types::{AssignmentMap, ClientAssignmentMap, Identity, Project, ProjectStats};

/// Derive the display metrics for one project.
///
/// Pure: the same inputs always give the same output. `finished_task_number`
/// larger than `task_number` is clamped so that `pending + complete == total`
/// holds.
pub fn compute_stats(
    project: &Project,
    assignments: &AssignmentMap,
    client_assignments: &ClientAssignmentMap,
    role: Role,
    identity: &Identity,
) -> ProjectStats {
    let total = project.task_number.unwrap_or(0);

    let (pending, complete, active, complete_percentage) = if total == 0 {
        // new project, no tasks imported yet
        (0, 0, 1, 0)
    } else {
        let complete = project.finished_task_number.unwrap_or(0).min(total);
        let pending = total - complete;
        if complete == 0 {
            (pending, complete, 1, 0)
        } else if complete == total {
            (pending, complete, 0, 100)
        } else {
            (pending, complete, 0, percentage(complete, total))
        }
    };

    let users = match role {
        Role::Administrator => {
            // every key counts, numeric or not
            let assigned = user_keys_assigned_to(assignments, project.id);
            let creator_uncounted = project
                .created_by
                .as_ref()
                .map(|creator| !assigned.contains(&creator.id.to_string().as_str()))
                .unwrap_or(false);
            assigned.len() + usize::from(creator_uncounted)
        }
        // Creator is not added for clients; see DESIGN.md.
        Role::Client => assigned_by_client(client_assignments, identity.id, project.id).len(),
    };

    let batches = project
        .batches
        .as_ref()
        .map(Vec::len)
        .filter(|count| *count > 0)
        .unwrap_or(1);

    ProjectStats {
        total,
        pending,
        complete,
        active,
        complete_percentage,
        users,
        batches,
    }
}

fn percentage(complete: u64, total: u64) -> u32 {
    ((complete as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserRef;
    use std::collections::{BTreeMap, BTreeSet};

    fn admin() -> Identity {
        Identity::new(1, "admin@example.com").with_role("admin")
    }

    fn stats_for(project: &Project) -> ProjectStats {
        compute_stats(
            project,
            &AssignmentMap::new(),
            &ClientAssignmentMap::new(),
            Role::Administrator,
            &admin(),
        )
    }

    #[test]
    fn test_new_project_without_tasks() {
        let stats = stats_for(&Project::new(1, "Empty"));
        assert_eq!(stats.total, 0);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.complete, 0);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.complete_percentage, 0);
    }

    #[test]
    fn test_untouched_project() {
        let stats = stats_for(&Project::new(1, "Fresh").with_tasks(100, 0));
        assert_eq!(
            (
                stats.total,
                stats.pending,
                stats.complete,
                stats.active,
                stats.complete_percentage
            ),
            (100, 100, 0, 1, 0)
        );
    }

    #[test]
    fn test_finished_project() {
        let stats = stats_for(&Project::new(2, "Done").with_tasks(50, 50));
        assert_eq!(
            (
                stats.total,
                stats.pending,
                stats.complete,
                stats.active,
                stats.complete_percentage
            ),
            (50, 0, 50, 0, 100)
        );
    }

    #[test]
    fn test_partial_project_rounds() {
        let stats = stats_for(&Project::new(3, "Half").with_tasks(3, 2));
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.complete, 2);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.complete_percentage, 67);

        let stats = stats_for(&Project::new(4, "Tiny").with_tasks(200, 1));
        assert_eq!(stats.complete_percentage, 1);
    }

    #[test]
    fn test_pending_plus_complete_is_total() {
        for (total, finished) in [(1, 0), (7, 3), (10, 10), (10, 12), (999, 998)] {
            let stats = stats_for(&Project::new(5, "p").with_tasks(total, finished));
            assert_eq!(stats.pending + stats.complete, stats.total);
        }
    }

    #[test]
    fn test_batches_default_to_one() {
        let mut project = Project::new(6, "Batches");
        assert_eq!(stats_for(&project).batches, 1);
        project.batches = Some(vec![]);
        assert_eq!(stats_for(&project).batches, 1);
        project.batches = Some(vec![
            serde_json::json!({"id": 1}),
            serde_json::json!({"id": 2}),
        ]);
        assert_eq!(stats_for(&project).batches, 2);
    }

    fn admin_stats(project: &Project, assignments: &AssignmentMap) -> ProjectStats {
        compute_stats(
            project,
            assignments,
            &ClientAssignmentMap::new(),
            Role::Administrator,
            &admin(),
        )
    }

    #[test]
    fn test_admin_count_includes_non_numeric_keys() {
        let mut assignments = AssignmentMap::new();
        assignments.insert("5".to_string(), BTreeSet::from([10]));
        assignments.insert("legacy-user".to_string(), BTreeSet::from([10]));

        let project = Project::new(10, "Mixed").created_by(UserRef::new(5));
        assert_eq!(admin_stats(&project, &assignments).users, 2);
    }

    #[test]
    fn test_admin_user_count_adds_creator_once() {
        let mut assignments = AssignmentMap::new();
        assignments.insert("5".to_string(), BTreeSet::from([10]));
        assignments.insert("6".to_string(), BTreeSet::from([10, 11]));
        assignments.insert("7".to_string(), BTreeSet::from([11]));

        let project = Project::new(10, "Counted").created_by(UserRef::new(99));
        let stats = admin_stats(&project, &assignments);
        assert_eq!(stats.users, 3);

        let project = Project::new(10, "Counted").created_by(UserRef::new(5));
        let stats = admin_stats(&project, &assignments);
        assert_eq!(stats.users, 2);

        let project = Project::new(10, "No creator");
        let stats = admin_stats(&project, &assignments);
        assert_eq!(stats.users, 2);
    }

    #[test]
    fn test_client_user_count_uses_own_assignments_only() {
        let client = Identity::new(9, "client@example.com");
        let mut assignments = AssignmentMap::new();
        assignments.insert("5".to_string(), BTreeSet::from([10]));
        assignments.insert("6".to_string(), BTreeSet::from([10]));

        let mut client_assignments = ClientAssignmentMap::new();
        let mut per_project = BTreeMap::new();
        per_project.insert("10".to_string(), BTreeSet::from([5]));
        client_assignments.insert("9".to_string(), per_project);

        let project = Project::new(10, "Scoped").created_by(UserRef::new(9));
        let stats =
            compute_stats(&project, &assignments, &client_assignments, Role::Client, &client);
        assert_eq!(stats.users, 1);

        let other = Identity::new(8, "other@example.com");
        let stats =
            compute_stats(&project, &assignments, &client_assignments, Role::Client, &other);
        assert_eq!(stats.users, 0);
    }

    #[test]
    fn test_idempotent() {
        let project = Project::new(11, "Same").with_tasks(40, 13);
        assert_eq!(stats_for(&project), stats_for(&project));
    }
}
