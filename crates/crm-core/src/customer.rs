use crate::error::{CrmError, Result};
use crate::form;
use crate::types::{Headcount, Industry, Region, Tier};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

pub const NAME_FIELD: &str = "客户名称";
pub const WEBSITE_FIELD: &str = "官方网站";

// ---------------------------------------------------------------------------
// ChangeLogEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub field: String,
    pub old: String,
    pub new: String,
    pub changed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// CustomerDraft
// ---------------------------------------------------------------------------

/// Raw customer form input, as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDraft {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub tier: Option<String>,
    pub headcount: Option<String>,
    pub region: Option<String>,
    pub website: Option<String>,
}

/// Validated customer attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerFields {
    pub name: String,
    pub industry: Industry,
    pub tier: Tier,
    pub headcount: Option<Headcount>,
    pub region: Option<Region>,
    pub website: Option<String>,
}

static WEBSITE_RE: OnceLock<Regex> = OnceLock::new();

fn website_re() -> &'static Regex {
    WEBSITE_RE.get_or_init(|| Regex::new(r"^https?://[^\s/?#]+\.[^\s/?#]+(?:[/?#]\S*)?$").unwrap())
}

impl CustomerDraft {
    pub fn validate(&self) -> Result<CustomerFields> {
        let name = form::required(NAME_FIELD, self.name.as_deref())?;
        let industry = form::required(Industry::FIELD, self.industry.as_deref())?;
        let tier = form::required(Tier::FIELD, self.tier.as_deref())?;

        let website = match form::optional(self.website.as_deref()) {
            Some(url) if !website_re().is_match(url) => {
                return Err(CrmError::InvalidWebsite(url.to_string()))
            }
            other => other.map(str::to_string),
        };

        Ok(CustomerFields {
            name: name.to_string(),
            industry: Industry::from_str(industry)?,
            tier: Tier::from_str(tier)?,
            headcount: form::optional_choice(self.headcount.as_deref())?,
            region: form::optional_choice(self.region.as_deref())?,
            website,
        })
    }

    /// Prefill a draft from an existing customer, the way an edit form opens.
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            name: Some(customer.name.clone()),
            industry: Some(customer.industry.as_str().to_string()),
            tier: Some(customer.tier.as_str().to_string()),
            headcount: customer.headcount.map(|h| h.as_str().to_string()),
            region: customer.region.map(|r| r.as_str().to_string()),
            website: customer.website.clone(),
        }
    }

    /// Overlay the fields set in `patch` on top of this draft.
    pub fn merged(mut self, patch: CustomerDraft) -> Self {
        if patch.name.is_some() {
            self.name = patch.name;
        }
        if patch.industry.is_some() {
            self.industry = patch.industry;
        }
        if patch.tier.is_some() {
            self.tier = patch.tier;
        }
        if patch.headcount.is_some() {
            self.headcount = patch.headcount;
        }
        if patch.region.is_some() {
            self.region = patch.region;
        }
        if patch.website.is_some() {
            self.website = patch.website;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Customer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub industry: Industry,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headcount: Option<Headcount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub change_log: Vec<ChangeLogEntry>,
}

impl Customer {
    pub fn new(
        id: impl Into<String>,
        fields: CustomerFields,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: fields.name,
            industry: fields.industry,
            tier: fields.tier,
            headcount: fields.headcount,
            region: fields.region,
            website: fields.website,
            created_by: created_by.into(),
            created_at: now,
            change_log: Vec::new(),
        }
    }

    /// Display values in form order; absent optionals render as "".
    fn field_values(&self) -> [(&'static str, String); 6] {
        [
            (NAME_FIELD, self.name.clone()),
            (Industry::FIELD, self.industry.label().to_string()),
            (Tier::FIELD, self.tier.label().to_string()),
            (
                Headcount::FIELD,
                self.headcount.map(|h| h.label().to_string()).unwrap_or_default(),
            ),
            (
                Region::FIELD,
                self.region.map(|r| r.label().to_string()).unwrap_or_default(),
            ),
            (WEBSITE_FIELD, self.website.clone().unwrap_or_default()),
        ]
    }

    /// Overwrite attributes and log one entry per changed field.
    /// Returns the number of entries appended.
    pub fn apply_edit(&mut self, fields: CustomerFields, now: DateTime<Utc>) -> usize {
        let before = self.field_values();

        self.name = fields.name;
        self.industry = fields.industry;
        self.tier = fields.tier;
        self.headcount = fields.headcount;
        self.region = fields.region;
        self.website = fields.website;

        let after = self.field_values();
        let mut appended = 0;
        for ((field, old), (_, new)) in before.into_iter().zip(after) {
            if old != new {
                self.change_log.push(ChangeLogEntry {
                    field: field.to_string(),
                    old,
                    new,
                    changed_at: now,
                });
                appended += 1;
            }
        }
        appended
    }
}

// ---------------------------------------------------------------------------
// Registry operations (operate on the customer list)
// ---------------------------------------------------------------------------

pub fn find<'a>(customers: &'a [Customer], id: &str) -> Result<&'a Customer> {
    customers
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| CrmError::CustomerNotFound(id.to_string()))
}

pub fn find_mut<'a>(customers: &'a mut [Customer], id: &str) -> Result<&'a mut Customer> {
    customers
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| CrmError::CustomerNotFound(id.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
