use crate::error::{CrmError, Result};
use crate::form;
use crate::types::CustomerStage;
use crate::user::User;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const CUSTOMER_FIELD: &str = "客户";
pub const DATE_FIELD: &str = "拜访日期";

/// Stage a visit must carry before it can be turned into an application.
pub const CONVERTIBLE_STAGE: CustomerStage = CustomerStage::NeedsConfirmed;

/// Raw visit form input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitDraft {
    pub customer: Option<String>,
    pub visit_date: Option<String>,
    pub stage: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: String,
    /// Customer name; not checked against the registry.
    pub customer: String,
    pub visit_date: NaiveDate,
    pub stage: CustomerStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub salesperson: String,
    pub created_at: DateTime<Utc>,
}

impl VisitDraft {
    /// Validate and build the record, stamping `actor` as the salesperson.
    pub fn into_record(
        self,
        id: impl Into<String>,
        actor: &User,
        now: DateTime<Utc>,
    ) -> Result<VisitRecord> {
        let customer = form::required(CUSTOMER_FIELD, self.customer.as_deref())?;
        let date = form::required(DATE_FIELD, self.visit_date.as_deref())?;
        let stage = form::required(CustomerStage::FIELD, self.stage.as_deref())?;

        let visit_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| CrmError::InvalidDate(date.to_string()))?;

        Ok(VisitRecord {
            id: id.into(),
            customer: customer.to_string(),
            visit_date,
            stage: CustomerStage::from_str(stage)?,
            notes: form::optional(self.notes.as_deref()).map(str::to_string),
            salesperson: actor.name.clone(),
            created_at: now,
        })
    }
}

impl VisitRecord {
    pub fn is_convertible_by(&self, actor: &User) -> bool {
        self.salesperson == actor.name && self.stage == CONVERTIBLE_STAGE
    }
}

// ---------------------------------------------------------------------------
// Log queries
// ---------------------------------------------------------------------------

pub fn visible_to<'a>(visits: &'a [VisitRecord], viewer: &'a User) -> impl Iterator<Item = &'a VisitRecord> {
    visits.iter().filter(move |v| viewer.sees(&v.salesperson))
}

/// Visits `actor` may convert into an opportunity application.
pub fn eligible_for<'a>(visits: &'a [VisitRecord], actor: &'a User) -> impl Iterator<Item = &'a VisitRecord> {
    visits.iter().filter(move |v| v.is_convertible_by(actor))
}

pub fn find<'a>(visits: &'a [VisitRecord], id: &str) -> Result<&'a VisitRecord> {
    visits
        .iter()
        .find(|v| v.id == id)
        .ok_or_else(|| CrmError::VisitNotFound(id.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
