use crate::application::OpportunityApplication;
use crate::error::{CrmError, Result};
use crate::money::Amount;
use crate::types::{OpportunityStage, OpportunityStatus, Outcome};
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_CUSTOMER: &str = "未知客户";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageChange {
    pub from: OpportunityStage,
    pub to: OpportunityStage,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    /// Code of the application this opportunity was approved from.
    pub code: String,
    pub customer: String,
    pub amount: Amount,
    pub stage: OpportunityStage,
    pub owner: String,
    pub status: OpportunityStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub stage_history: Vec<StageChange>,
}

impl Opportunity {
    pub fn from_application(
        id: impl Into<String>,
        app: &OpportunityApplication,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            code: app.code.clone(),
            customer: app
                .customer
                .clone()
                .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string()),
            amount: app.amount,
            stage: OpportunityStage::first(),
            owner: app.applicant.clone(),
            status: OpportunityStatus::Open,
            created_at: now,
            stage_history: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == OpportunityStatus::Open
    }

    fn ensure_owner(&self, actor: &User) -> Result<()> {
        if actor.name == self.owner {
            Ok(())
        } else {
            Err(CrmError::NotOwner {
                code: self.code.clone(),
                actor: actor.name.clone(),
            })
        }
    }

    fn move_to(&mut self, to: OpportunityStage, now: DateTime<Utc>) {
        self.stage_history.push(StageChange {
            from: self.stage,
            to,
            changed_at: now,
        });
        self.stage = to;
    }

    /// Move to `to`, recording one history entry. Any stage may follow any
    /// other, including the current one.
    pub fn change_stage(
        &mut self,
        to: OpportunityStage,
        actor: &User,
        now: DateTime<Utc>,
    ) -> Result<OpportunityStage> {
        self.ensure_owner(actor)?;
        let from = self.stage;
        self.move_to(to, now);
        Ok(from)
    }

    /// Close the deal as won or lost. The stage lands on the final pipeline
    /// step if it is not there already.
    pub fn settle(&mut self, outcome: Outcome, actor: &User, now: DateTime<Utc>) -> Result<()> {
        self.ensure_owner(actor)?;
        if !self.is_open() {
            return Err(CrmError::AlreadySettled(self.code.clone()));
        }
        if self.stage != OpportunityStage::Settlement {
            self.move_to(OpportunityStage::Settlement, now);
        }
        self.status = outcome.status();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline queries
// ---------------------------------------------------------------------------

pub fn find<'a>(opps: &'a [Opportunity], code: &str) -> Result<&'a Opportunity> {
    opps.iter()
        .find(|o| o.code == code)
        .ok_or_else(|| CrmError::OpportunityNotFound(code.to_string()))
}

pub fn find_mut<'a>(opps: &'a mut [Opportunity], code: &str) -> Result<&'a mut Opportunity> {
    opps.iter_mut()
        .find(|o| o.code == code)
        .ok_or_else(|| CrmError::OpportunityNotFound(code.to_string()))
}

pub fn visible_to<'a>(opps: &'a [Opportunity], viewer: &'a User) -> impl Iterator<Item = &'a Opportunity> {
    opps.iter().filter(move |o| viewer.sees(&o.owner))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ApplicationDraft;

    fn approved_app() -> OpportunityApplication {
        let terms = ApplicationDraft {
            amount: Some("800000".to_string()),
            product_line: Some("数据分析".to_string()),
            probability: Some("70%".to_string()),
        }
        .validate()
        .unwrap();
        let mut app = OpportunityApplication::new("OP-010", terms, "张三", Utc::now());
        app.approve(&User::manager("manager_001", "李管理"), Utc::now())
            .unwrap();
        app
    }

    #[test]
    fn starts_open_at_first_stage() {
        let opp = Opportunity::from_application("O1", &approved_app(), Utc::now());
        assert_eq!(opp.code, "OP-010");
        assert_eq!(opp.stage, OpportunityStage::Evaluation);
        assert_eq!(opp.status, OpportunityStatus::Open);
        assert_eq!(opp.owner, "张三");
        assert_eq!(opp.customer, UNKNOWN_CUSTOMER);
        assert!(opp.stage_history.is_empty());
    }

    #[test]
    fn every_change_appends_one_entry() {
        let owner = User::salesperson("user_001", "张三");
        let mut opp = Opportunity::from_application("O1", &approved_app(), Utc::now());

        opp.change_stage(OpportunityStage::Proposal, &owner, Utc::now()).unwrap();
        opp.change_stage(OpportunityStage::Negotiation, &owner, Utc::now()).unwrap();
        // Backwards and repeated moves are allowed.
        opp.change_stage(OpportunityStage::Proposal, &owner, Utc::now()).unwrap();
        opp.change_stage(OpportunityStage::Proposal, &owner, Utc::now()).unwrap();

        assert_eq!(opp.stage_history.len(), 4);
        assert_eq!(opp.stage_history[0].from, OpportunityStage::Evaluation);
        assert_eq!(opp.stage_history[0].to, OpportunityStage::Proposal);
        assert_eq!(opp.stage_history[2].from, OpportunityStage::Negotiation);
        assert_eq!(opp.stage, OpportunityStage::Proposal);
    }

    #[test]
    fn only_owner_changes_stage() {
        let mut opp = Opportunity::from_application("O1", &approved_app(), Utc::now());
        let boss = User::manager("manager_001", "李管理");
        let err = opp
            .change_stage(OpportunityStage::Proposal, &boss, Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "仅商机负责人可变更阶段");
        assert_eq!(opp.stage, OpportunityStage::Evaluation);
        assert!(opp.stage_history.is_empty());
    }

    #[test]
    fn settle_moves_to_final_stage_once() {
        let owner = User::salesperson("user_001", "张三");
        let mut opp = Opportunity::from_application("O1", &approved_app(), Utc::now());

        opp.settle(Outcome::Won, &owner, Utc::now()).unwrap();
        assert_eq!(opp.status, OpportunityStatus::Won);
        assert_eq!(opp.stage, OpportunityStage::Settlement);
        assert_eq!(opp.stage_history.len(), 1);

        let err = opp.settle(Outcome::Closed, &owner, Utc::now()).unwrap_err();
        assert!(matches!(err, CrmError::AlreadySettled(_)));
        assert_eq!(opp.status, OpportunityStatus::Won);

        // Stage edits stay possible after settlement.
        opp.change_stage(OpportunityStage::Negotiation, &owner, Utc::now()).unwrap();
        assert_eq!(opp.stage_history.len(), 2);
    }
}
