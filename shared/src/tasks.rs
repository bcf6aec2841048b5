use crate::types::Task;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Pending,
}

/// Completed when any annotation signal is present. Upstream sources fill
/// different fields, so all three are checked.
pub fn classify(task: &Task) -> TaskStatus {
    let has_annotations = task.annotations.as_ref().is_some_and(|a| !a.is_empty())
        || task.annotations_count.is_some_and(|count| count > 0)
        || task.annotations_results.as_ref().is_some_and(|r| !r.is_empty());

    if has_annotations {
        TaskStatus::Completed
    } else {
        TaskStatus::Pending
    }
}

/// Split tasks into (completed, pending). Every task lands in exactly one side.
pub fn partition(tasks: Vec<Task>) -> (Vec<Task>, Vec<Task>) {
    tasks
        .into_iter()
        .partition(|task| classify(task) == TaskStatus::Completed)
}

/// Tasks of one status, in input order.
pub fn select(tasks: Vec<Task>, status: TaskStatus) -> Vec<Task> {
    let (completed, pending) = partition(tasks);
    match status {
        TaskStatus::Completed => completed,
        TaskStatus::Pending => pending,
    }
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        classify(self)
    }

    /// Preview image for the task, from `data.image`, `data.url` or `data.src`.
    /// `data` may be an object, a JSON-encoded object, or a bare URL string.
    pub fn image_url(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        match data {
            Value::Object(_) => url_field(data),
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(parsed) => url_field(&parsed),
                Err(_) if raw.starts_with("http") => Some(raw.clone()),
                Err(_) => None,
            },
            _ => None,
        }
    }
}

fn url_field(data: &Value) -> Option<String> {
    ["image", "url", "src"]
        .iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
