use crate::error::{CrmError, Result};
use crate::form;
use crate::money::Amount;
use crate::types::{ApplicationStatus, Probability, ProductLine};
use crate::user::User;
use crate::visit::VisitRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const AMOUNT_FIELD: &str = "预计签单金额";
pub const REASON_FIELD: &str = "驳回原因";

pub fn code_for(seq: u32) -> String {
    format!("OP-{seq:03}")
}

// ---------------------------------------------------------------------------
// ApplicationDraft
// ---------------------------------------------------------------------------

/// Raw input of the convert-to-opportunity form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub amount: Option<String>,
    pub product_line: Option<String>,
    pub probability: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationTerms {
    pub amount: Amount,
    pub product_line: ProductLine,
    pub probability: Probability,
}

impl ApplicationDraft {
    pub fn validate(&self) -> Result<ApplicationTerms> {
        let amount = form::required(AMOUNT_FIELD, self.amount.as_deref())?;
        let product_line = form::required(ProductLine::FIELD, self.product_line.as_deref())?;
        let probability = form::required(Probability::FIELD, self.probability.as_deref())?;

        Ok(ApplicationTerms {
            amount: Amount::from_str(amount)?,
            product_line: ProductLine::from_str(product_line)?,
            probability: Probability::from_str(probability)?,
        })
    }
}

// ---------------------------------------------------------------------------
// OpportunityApplication
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityApplication {
    pub code: String,
    pub amount: Amount,
    pub product_line: ProductLine,
    pub probability: Probability,
    pub status: ApplicationStatus,
    pub applicant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approver: Option<String>,
    pub rejection_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Only managers may decide on applications.
pub fn authorize(actor: &User) -> Result<()> {
    if actor.role.can_approve() {
        Ok(())
    } else {
        Err(CrmError::ApprovalDenied)
    }
}

impl OpportunityApplication {
    pub fn new(
        code: impl Into<String>,
        terms: ApplicationTerms,
        applicant: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            code: code.into(),
            amount: terms.amount,
            product_line: terms.product_line,
            probability: terms.probability,
            status: ApplicationStatus::Pending,
            applicant: applicant.into(),
            customer: None,
            visit_id: None,
            created_at: now,
            approver: None,
            rejection_reason: None,
            decided_at: None,
        }
    }

    /// Application raised from a qualified visit; carries the visit's customer.
    pub fn from_visit(
        code: impl Into<String>,
        terms: ApplicationTerms,
        visit: &VisitRecord,
        now: DateTime<Utc>,
    ) -> Self {
        let mut app = Self::new(code, terms, visit.salesperson.clone(), now);
        app.customer = Some(visit.customer.clone());
        app.visit_id = Some(visit.id.clone());
        app
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApplicationStatus::Pending
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(CrmError::AlreadyDecided {
                code: self.code.clone(),
                status: self.status.to_string(),
            })
        }
    }

    pub fn approve(&mut self, approver: &User, now: DateTime<Utc>) -> Result<()> {
        authorize(approver)?;
        self.ensure_pending()?;
        self.status = ApplicationStatus::Approved;
        self.approver = Some(approver.name.clone());
        self.decided_at = Some(now);
        Ok(())
    }

    pub fn reject(&mut self, approver: &User, reason: &str, now: DateTime<Utc>) -> Result<()> {
        authorize(approver)?;
        self.ensure_pending()?;
        let reason = form::required(REASON_FIELD, Some(reason))?;
        self.status = ApplicationStatus::Rejected;
        self.approver = Some(approver.name.clone());
        self.rejection_reason = Some(reason.to_string());
        self.decided_at = Some(now);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Queue operations
// ---------------------------------------------------------------------------

/// First pending application with `code`, falling back to any match.
/// Codes are a correlation key, not a unique key.
pub fn find_mut<'a>(
    apps: &'a mut [OpportunityApplication],
    code: &str,
) -> Result<&'a mut OpportunityApplication> {
    let idx = apps
        .iter()
        .position(|a| a.code == code && a.is_pending())
        .or_else(|| apps.iter().position(|a| a.code == code))
        .ok_or_else(|| CrmError::ApplicationNotFound(code.to_string()))?;
    Ok(&mut apps[idx])
}

pub fn visible_to<'a>(
    apps: &'a [OpportunityApplication],
    viewer: &'a User,
) -> impl Iterator<Item = &'a OpportunityApplication> {
    apps.iter().filter(move |a| viewer.sees(&a.applicant))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationSummary {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

pub fn summarize<'a>(apps: impl IntoIterator<Item = &'a OpportunityApplication>) -> ApplicationSummary {
    let mut summary = ApplicationSummary::default();
    for app in apps {
        summary.total += 1;
        match app.status {
            ApplicationStatus::Pending => summary.pending += 1,
            ApplicationStatus::Approved => summary.approved += 1,
            ApplicationStatus::Rejected => summary.rejected += 1,
        }
    }
    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> ApplicationTerms {
        ApplicationDraft {
            amount: Some("1000000".to_string()),
            product_line: Some("AI 平台".to_string()),
            probability: Some("60%".to_string()),
        }
        .validate()
        .unwrap()
    }

    fn pending(code: &str) -> OpportunityApplication {
        OpportunityApplication::new(code, terms(), "王销售", Utc::now())
    }

    #[test]
    fn draft_requires_fields_in_order() {
        let err = ApplicationDraft::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "预计签单金额为必填项");

        let err = ApplicationDraft {
            amount: Some("500000".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "产品线为必填项");

        let err = ApplicationDraft {
            amount: Some("lots".to_string()),
            product_line: Some("云服务".to_string()),
            probability: Some("30%".to_string()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "请输入有效的金额");
    }

    #[test]
    fn approval_lifecycle() {
        let boss = User::manager("manager_001", "李管理");
        let mut app = pending("OP-001");
        assert!(app.is_pending());

        app.approve(&boss, Utc::now()).unwrap();
        assert_eq!(app.status, ApplicationStatus::Approved);
        assert_eq!(app.approver.as_deref(), Some("李管理"));
        assert!(app.decided_at.is_some());

        let err = app.approve(&boss, Utc::now()).unwrap_err();
        assert!(matches!(err, CrmError::AlreadyDecided { .. }));
        let err = app.reject(&boss, "late", Utc::now()).unwrap_err();
        assert!(matches!(err, CrmError::AlreadyDecided { .. }));
    }

    #[test]
    fn salesperson_cannot_decide() {
        let rep = User::salesperson("sales_001", "王销售");
        let mut app = pending("OP-005");
        assert!(matches!(app.approve(&rep, Utc::now()), Err(CrmError::ApprovalDenied)));
        assert!(matches!(
            app.reject(&rep, "预算不足", Utc::now()),
            Err(CrmError::ApprovalDenied)
        ));
        assert!(app.is_pending());
        assert!(app.approver.is_none());
    }

    #[test]
    fn rejection_needs_reason() {
        let boss = User::manager("manager_001", "李管理");
        let mut app = pending("OP-002");

        let err = app.reject(&boss, "   ", Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "驳回原因为必填项");
        assert!(app.is_pending());
        assert!(app.rejection_reason.is_none());

        app.reject(&boss, "客户预算不足", Utc::now()).unwrap();
        assert_eq!(app.status, ApplicationStatus::Rejected);
        assert_eq!(app.rejection_reason.as_deref(), Some("客户预算不足"));
    }

    #[test]
    fn summary_counts_by_status() {
        let boss = User::manager("manager_001", "李管理");
        let mut apps = vec![pending("OP-001"), pending("OP-002"), pending("OP-003")];
        apps[0].approve(&boss, Utc::now()).unwrap();
        apps[1].reject(&boss, "重复申请", Utc::now()).unwrap();

        let s = summarize(&apps);
        assert_eq!(
            s,
            ApplicationSummary {
                total: 3,
                pending: 1,
                approved: 1,
                rejected: 1,
            }
        );
    }

    #[test]
    fn find_mut_prefers_pending_duplicate() {
        let boss = User::manager("manager_001", "李管理");
        let mut apps = vec![pending("OP-007"), pending("OP-007")];
        apps[0].approve(&boss, Utc::now()).unwrap();
        let app = find_mut(&mut apps, "OP-007").unwrap();
        assert!(app.is_pending());
    }

    #[test]
    fn code_format() {
        assert_eq!(code_for(1), "OP-001");
        assert_eq!(code_for(1234), "OP-1234");
    }
}
