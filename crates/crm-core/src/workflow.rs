//! The single place CRM rules are applied.
//!
//! [`apply`] is pure: it takes a snapshot and returns either the next snapshot
//! or an error, never a half-updated state. [`dispatch`] wraps it with the
//! notification rule (every attempt leaves exactly one notice), and [`Desk`]
//! owns the current snapshot for callers that run several actions in a row.

use crate::application::{self, ApplicationDraft, OpportunityApplication};
use crate::customer::{self, Customer, CustomerDraft};
use crate::error::{CrmError, Result};
use crate::opportunity::{self, Opportunity};
use crate::state::CrmState;
use crate::types::{OpportunityStage, OpportunityStatus, Outcome};
use crate::user::User;
use crate::visit::{self, VisitDraft};
use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Action / Effect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Action {
    CreateCustomer(CustomerDraft),
    EditCustomer { id: String, draft: CustomerDraft },
    LogVisit(VisitDraft),
    SubmitApplication { visit_id: String, draft: ApplicationDraft },
    Approve { code: String },
    Reject { code: String, reason: String },
    ChangeStage { code: String, stage: OpportunityStage },
    Settle { code: String, outcome: Outcome },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateCustomer(_) => "create_customer",
            Action::EditCustomer { .. } => "edit_customer",
            Action::LogVisit(_) => "log_visit",
            Action::SubmitApplication { .. } => "submit_application",
            Action::Approve { .. } => "approve",
            Action::Reject { .. } => "reject",
            Action::ChangeStage { .. } => "change_stage",
            Action::Settle { .. } => "settle",
        }
    }
}

/// What a successful action did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    CustomerCreated { id: String },
    CustomerEdited { id: String, changes: usize },
    VisitLogged { id: String },
    ApplicationSubmitted { code: String },
    ApplicationApproved { code: String, opportunity: String },
    ApplicationRejected { code: String, reason: String },
    StageChanged {
        code: String,
        from: OpportunityStage,
        to: OpportunityStage,
    },
    OpportunitySettled { code: String, status: OpportunityStatus },
}

impl Effect {
    /// Notification text shown for this effect.
    pub fn notice(&self) -> String {
        match self {
            Effect::CustomerCreated { .. } => "创建成功".to_string(),
            Effect::CustomerEdited { .. } => "客户信息更新成功".to_string(),
            Effect::VisitLogged { .. } => "拜访记录创建成功".to_string(),
            Effect::ApplicationSubmitted { code } => format!("商机申请{code}已提交，等待审批"),
            Effect::ApplicationApproved { code, .. } => format!("商机申请{code}已通过审批"),
            Effect::ApplicationRejected { code, reason } => {
                format!("商机申请{code}已驳回，原因：{reason}")
            }
            Effect::StageChanged { code, to, .. } => format!("商机{code}阶段已更新为{to}"),
            Effect::OpportunitySettled { code, status } => format!("商机{code}已标记为{status}"),
        }
    }
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

/// Evaluate `action` for `actor` against `state`.
///
/// On success returns the next snapshot (notifications untouched) and the
/// effect. On failure `state` is, by construction, unchanged.
pub fn apply(
    state: &CrmState,
    actor: &User,
    action: Action,
    now: DateTime<Utc>,
) -> Result<(CrmState, Effect)> {
    let mut next = state.clone();

    let effect = match action {
        Action::CreateCustomer(draft) => {
            let fields = draft.validate()?;
            let id = next.next_customer_id();
            next.customers
                .push(Customer::new(id.clone(), fields, actor.name.clone(), now));
            Effect::CustomerCreated { id }
        }

        Action::EditCustomer { id, draft } => {
            let target = customer::find_mut(&mut next.customers, &id)?;
            let fields = draft.validate()?;
            let changes = target.apply_edit(fields, now);
            Effect::CustomerEdited { id, changes }
        }

        Action::LogVisit(draft) => {
            // Validate before consuming an id so refused drafts leave no gap.
            let record = draft.into_record(String::new(), actor, now)?;
            let id = next.next_visit_id();
            next.visits.push(visit::VisitRecord { id: id.clone(), ..record });
            Effect::VisitLogged { id }
        }

        Action::SubmitApplication { visit_id, draft } => {
            let source = visit::find(&next.visits, &visit_id)?;
            if !source.is_convertible_by(actor) {
                return Err(CrmError::VisitNotEligible(visit_id));
            }
            let terms = draft.validate()?;
            let source = source.clone();
            let code = next.next_application_code();
            next.applications
                .push(OpportunityApplication::from_visit(code.clone(), terms, &source, now));
            Effect::ApplicationSubmitted { code }
        }

        Action::Approve { code } => {
            application::authorize(actor)?;
            let app = application::find_mut(&mut next.applications, &code)?;
            app.approve(actor, now)?;
            let app = app.clone();
            let opp_id = next.next_opportunity_id();
            next.opportunities
                .push(Opportunity::from_application(opp_id.clone(), &app, now));
            Effect::ApplicationApproved {
                code,
                opportunity: opp_id,
            }
        }

        Action::Reject { code, reason } => {
            application::authorize(actor)?;
            let app = application::find_mut(&mut next.applications, &code)?;
            app.reject(actor, &reason, now)?;
            Effect::ApplicationRejected {
                code,
                reason: reason.trim().to_string(),
            }
        }

        Action::ChangeStage { code, stage } => {
            let opp = opportunity::find_mut(&mut next.opportunities, &code)?;
            let from = opp.change_stage(stage, actor, now)?;
            Effect::StageChanged {
                code,
                from,
                to: stage,
            }
        }

        Action::Settle { code, outcome } => {
            let opp = opportunity::find_mut(&mut next.opportunities, &code)?;
            opp.settle(outcome, actor, now)?;
            Effect::OpportunitySettled {
                code,
                status: outcome.status(),
            }
        }
    };

    next.last_updated = now;
    Ok((next, effect))
}

// ---------------------------------------------------------------------------
// dispatch
// ---------------------------------------------------------------------------

/// Result of one dispatched action: the snapshot to keep, and what happened.
#[derive(Debug)]
pub struct Dispatched {
    pub state: CrmState,
    pub result: Result<Effect>,
}

/// Apply `action` and record its notice. A refused action yields the previous
/// collections plus a notice carrying the refusal message.
pub fn dispatch(
    state: &CrmState,
    actor: &User,
    action: Action,
    now: DateTime<Utc>,
    keep: usize,
) -> Dispatched {
    let name = action.name();
    tracing::debug!(action = name, actor = %actor.name, role = %actor.role, "dispatch");

    match apply(state, actor, action, now) {
        Ok((mut next, effect)) => {
            tracing::info!(action = name, actor = %actor.name, ?effect, "applied");
            next.notify(effect.notice(), now, keep);
            Dispatched {
                state: next,
                result: Ok(effect),
            }
        }
        Err(err) => {
            tracing::warn!(action = name, actor = %actor.name, error = %err, "refused");
            let mut same = state.clone();
            same.notify(err.to_string(), now, keep);
            Dispatched {
                state: same,
                result: Err(err),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Desk
// ---------------------------------------------------------------------------

/// Owns the current snapshot and replaces it wholesale after each action.
#[derive(Debug, Clone)]
pub struct Desk {
    state: CrmState,
    keep: usize,
}

impl Desk {
    pub fn new(state: CrmState, keep: usize) -> Self {
        Self { state, keep }
    }

    pub fn state(&self) -> &CrmState {
        &self.state
    }

    pub fn run(&mut self, actor: &User, action: Action, now: DateTime<Utc>) -> Result<Effect> {
        let Dispatched { state, result } = dispatch(&self.state, actor, action, now, self.keep);
        self.state = state;
        result
    }

    pub fn latest_notice(&self) -> Option<&str> {
        self.state
            .latest_notification()
            .map(|n| n.message.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
