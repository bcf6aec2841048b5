use crate::error::{DashboardError, StoreError, ValidationError};
use crate::identity::Role;
use crate::store::{self, KeyValueStore, BILLING_KEY};
use crate::types::{BillingEntry, CreateBillingEntryRequest, User};
use crate::visibility::{owned_by, resolve_entry_owner, VisibilityFilter};
use serde_json::Value;
use std::sync::Arc;

const FALLBACK_CLIENT_NAME: &str = "Current User";

/// Persisted, insertion-ordered log of manually entered billing rows.
///
/// Every mutation is written through to the store before the in-memory copy
/// changes, so a failed write leaves the ledger as it was.
pub struct BillingLedger {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<BillingEntry>,
}

impl BillingLedger {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = read_entries(store.as_ref());
        Self { store, entries }
    }

    /// Re-read the ledger from the store.
    pub fn reload(&mut self) {
        self.entries = read_entries(self.store.as_ref());
    }

    /// Every entry, unfiltered.
    pub fn entries(&self) -> &[BillingEntry] {
        &self.entries
    }

    /// Validate form input, append a new entry and persist the ledger.
    ///
    /// The referenced user must be among the users visible to the viewer.
    pub fn add(
        &mut self,
        request: &CreateBillingEntryRequest,
        viewer: &VisibilityFilter<'_>,
        users: &[User],
    ) -> Result<BillingEntry, DashboardError> {
        let user_id = required("user", &request.user_id)?;
        let hours = parse_amount("hours", &request.hours)?;
        let rate = parse_amount("rate", &request.rate)?;
        let total = line_total(hours, rate);
        if !total.is_finite() {
            return Err(ValidationError::TotalOutOfRange { hours, rate }.into());
        }

        let selected = user_id
            .parse::<i64>()
            .ok()
            .and_then(|id| {
                users
                    .iter()
                    .find(|user| user.id == id && viewer.user_visible(user))
            })
            .ok_or_else(|| ValidationError::UnknownUser(user_id.to_string()))?;

        let entry = BillingEntry {
            id: self.next_id(),
            email_id: selected.email.clone(),
            client_id: viewer
                .identity()
                .display_name()
                .unwrap_or_else(|| FALLBACK_CLIENT_NAME.to_string()),
            user_id: selected.display_name(),
            hours,
            rate,
            total,
        };

        let mut updated = self.entries.clone();
        updated.push(entry.clone());
        self.persist(updated)?;

        tracing::info!(
            "Billing entry {} added for {} ({} h at {})",
            entry.id,
            entry.email_id,
            entry.hours_display(),
            entry.rate_display()
        );
        Ok(entry)
    }

    /// Remove one entry by id. Unknown ids are a no-op and return `false`.
    pub fn remove(&mut self, entry_id: i64) -> Result<bool, StoreError> {
        if !self.entries.iter().any(|entry| entry.id == entry_id) {
            tracing::debug!("Billing entry {} not found, nothing to remove", entry_id);
            return Ok(false);
        }

        let updated = self
            .entries
            .iter()
            .filter(|entry| entry.id != entry_id)
            .cloned()
            .collect();
        self.persist(updated)?;
        Ok(true)
    }

    /// Destructive bulk delete; callers confirm with the viewer first.
    ///
    /// Administrators wipe the whole ledger. Clients remove only entries that
    /// resolve to a user they own; entries whose owner cannot be resolved are
    /// kept. Returns the number of removed entries.
    pub fn clear_all(
        &mut self,
        viewer: &VisibilityFilter<'_>,
        users: &[User],
    ) -> Result<usize, StoreError> {
        let before = self.entries.len();

        match viewer.role() {
            Role::Administrator => {
                self.store.remove(BILLING_KEY)?;
                self.entries.clear();
            }
            Role::Client => {
                let identity = viewer.identity();
                let kept: Vec<BillingEntry> = self
                    .entries
                    .iter()
                    .filter(|entry| match resolve_entry_owner(entry, users) {
                        Some(owner) => !owned_by(owner, identity),
                        None => true,
                    })
                    .cloned()
                    .collect();
                self.persist(kept)?;
            }
        }

        let removed = before - self.entries.len();
        tracing::info!("Cleared {} billing entries ({:?})", removed, viewer.role());
        Ok(removed)
    }

    /// Entries visible to the viewer, in insertion order.
    pub fn list<'a>(
        &'a self,
        viewer: &VisibilityFilter<'_>,
        users: &[User],
    ) -> Vec<&'a BillingEntry> {
        viewer.entries(&self.entries, users)
    }

    fn persist(&mut self, entries: Vec<BillingEntry>) -> Result<(), StoreError> {
        if let Err(e) = store::save_json(self.store.as_ref(), BILLING_KEY, &entries) {
            tracing::error!("Failed to save billing data: {}", e);
            return Err(e);
        }
        self.entries = entries;
        Ok(())
    }

    /// Millisecond timestamp, bumped past the newest existing id.
    fn next_id(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let newest = self.entries.iter().map(|entry| entry.id).max().unwrap_or(0);
        now.max(newest + 1)
    }
}

impl BillingEntry {
    pub fn hours_display(&self) -> String {
        format!("{:.1}", self.hours)
    }

    pub fn rate_display(&self) -> String {
        format!("{:.2}", self.rate)
    }

    pub fn total_display(&self) -> String {
        format!("{:.2}", self.total)
    }
}

/// `hours * rate`, rounded to cents.
pub fn line_total(hours: f64, rate: f64) -> f64 {
    (hours * rate * 100.0).round() / 100.0
}

/// Rows are decoded one at a time; a damaged row is skipped, not the ledger.
fn read_entries(store: &dyn KeyValueStore) -> Vec<BillingEntry> {
    let rows: Vec<Value> = store::load_json(store, BILLING_KEY);
    rows.into_iter().filter_map(entry_from_row).collect()
}

fn entry_from_row(mut row: Value) -> Option<BillingEntry> {
    let id = row.get("id").cloned().unwrap_or(Value::Null);
    // total is derived; never trust the stored value
    if let Some(fields) = row.as_object_mut() {
        fields.remove("total");
    }

    let mut entry: BillingEntry = match serde_json::from_value(row) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!("Skipping malformed billing entry {}: {}", id, e);
            return None;
        }
    };

    entry.total = line_total(entry.hours, entry.rate);
    if !entry.total.is_finite() {
        tracing::warn!("Skipping billing entry {} with an out-of-range total", entry.id);
        return None;
    }
    Some(entry)
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}

fn parse_amount(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    let raw = required(field, value)?;
    let amount: f64 = raw.parse().map_err(|_| ValidationError::InvalidNumber {
        field,
        value: raw.to_string(),
    })?;
    if !amount.is_finite() {
        return Err(ValidationError::InvalidNumber {
            field,
            value: raw.to_string(),
        });
    }
    if amount < 0.0 {
        return Err(ValidationError::Negative { field });
    }
    Ok(amount)
}
