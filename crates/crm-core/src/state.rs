use crate::application::{self, ApplicationSummary, OpportunityApplication};
use crate::customer::Customer;
use crate::error::{CrmError, Result};
use crate::opportunity::{self, Opportunity};
use crate::paths;
use crate::stats::{self, Conversion, Funnel, SalesPerformance};
use crate::types::Period;
use crate::user::User;
use crate::visit::{self, VisitRecord};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Monotonic counters behind generated ids. Never reset, so ids stay unique
/// even if the lists are edited by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sequences {
    #[serde(default)]
    pub customer: u32,
    #[serde(default)]
    pub visit: u32,
    #[serde(default)]
    pub application: u32,
    #[serde(default)]
    pub opportunity: u32,
}

// ---------------------------------------------------------------------------
// CrmState
// ---------------------------------------------------------------------------

/// The whole CRM as one snapshot. Updates produce a new snapshot; see
/// [`crate::workflow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmState {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: String,
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub visits: Vec<VisitRecord>,
    #[serde(default)]
    pub applications: Vec<OpportunityApplication>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub seq: Sequences,
    pub last_updated: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl CrmState {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: project.into(),
            customers: Vec::new(),
            visits: Vec::new(),
            applications: Vec::new(),
            opportunities: Vec::new(),
            notifications: Vec::new(),
            seq: Sequences::default(),
            last_updated: Utc::now(),
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::state_path(root);
        if !path.exists() {
            return Err(CrmError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let state: CrmState = serde_yaml::from_str(&data)?;
        Ok(state)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::state_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // ---------------------------------------------------------------------------
    // Id generation
    // ---------------------------------------------------------------------------

    pub(crate) fn next_customer_id(&mut self) -> String {
        self.seq.customer += 1;
        format!("C{}", self.seq.customer)
    }

    pub(crate) fn next_visit_id(&mut self) -> String {
        self.seq.visit += 1;
        format!("V{}", self.seq.visit)
    }

    pub(crate) fn next_application_code(&mut self) -> String {
        self.seq.application += 1;
        application::code_for(self.seq.application)
    }

    pub(crate) fn next_opportunity_id(&mut self) -> String {
        self.seq.opportunity += 1;
        format!("O{}", self.seq.opportunity)
    }

    // ---------------------------------------------------------------------------
    // Notifications
    // ---------------------------------------------------------------------------

    /// Append a notice, keeping at most `keep` of the newest.
    pub fn notify(&mut self, message: impl Into<String>, now: DateTime<Utc>, keep: usize) {
        self.notifications.push(Notification {
            message: message.into(),
            at: now,
        });
        if self.notifications.len() > keep {
            self.notifications.drain(..self.notifications.len() - keep);
        }
        self.last_updated = now;
    }

    /// The notice a user sees: always the newest one.
    pub fn latest_notification(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    // ---------------------------------------------------------------------------
    // Scoped views
    // ---------------------------------------------------------------------------

    pub fn visits_for<'a>(&'a self, viewer: &'a User) -> Vec<&'a VisitRecord> {
        visit::visible_to(&self.visits, viewer).collect()
    }

    pub fn eligible_visits<'a>(&'a self, actor: &'a User) -> Vec<&'a VisitRecord> {
        visit::eligible_for(&self.visits, actor).collect()
    }

    pub fn applications_for<'a>(&'a self, viewer: &'a User) -> Vec<&'a OpportunityApplication> {
        application::visible_to(&self.applications, viewer).collect()
    }

    pub fn opportunities_for<'a>(&'a self, viewer: &'a User) -> Vec<&'a Opportunity> {
        opportunity::visible_to(&self.opportunities, viewer).collect()
    }

    // ---------------------------------------------------------------------------
    // Reports
    // ---------------------------------------------------------------------------

    pub fn application_summary(&self, viewer: &User) -> ApplicationSummary {
        application::summarize(application::visible_to(&self.applications, viewer))
    }

    pub fn funnel(&self, viewer: &User) -> Funnel {
        stats::funnel(&self.opportunities, viewer)
    }

    pub fn conversion<Tz: TimeZone>(
        &self,
        viewer: &User,
        period: Period,
        today: NaiveDate,
        tz: &Tz,
    ) -> Conversion {
        stats::conversion(&self.visits, &self.applications, viewer, period, today, tz)
    }

    pub fn leaderboard(&self, viewer: &User) -> Result<Vec<SalesPerformance>> {
        stats::leaderboard(&self.visits, &self.applications, &self.opportunities, viewer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn state_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut state = CrmState::new("sales");
        let id = state.next_customer_id();
        state.notify("创建成功", Utc::now(), 200);
        state.save(dir.path()).unwrap();

        let loaded = CrmState::load(dir.path()).unwrap();
        assert_eq!(id, "C1");
        assert_eq!(loaded.project, "sales");
        assert_eq!(loaded.seq.customer, 1);
        assert_eq!(loaded.latest_notification().unwrap().message, "创建成功");
    }

    #[test]
    fn state_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(CrmState::load(dir.path()), Err(CrmError::NotInitialized)));
    }

    #[test]
    fn notifications_are_trimmed_to_newest() {
        let mut state = CrmState::new("sales");
        for i in 0..5 {
            state.notify(format!("n{i}"), Utc::now(), 3);
        }
        let kept: Vec<&str> = state.notifications.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(kept, vec!["n2", "n3", "n4"]);
    }

    #[test]
    fn ids_are_sequential() {
        let mut state = CrmState::new("sales");
        assert_eq!(state.next_application_code(), "OP-001");
        assert_eq!(state.next_application_code(), "OP-002");
        assert_eq!(state.next_visit_id(), "V1");
        assert_eq!(state.next_opportunity_id(), "O1");
    }
}
