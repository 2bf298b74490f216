use crate::error::CrmError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a closed set of presentation labels.
///
/// Each variant carries a stable snake_case key (used on disk and on the
/// command line) and the Chinese label shown to users. Parsing accepts either.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal {
            $($variant:ident => ($key:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            /// Form label of the field this value fills.
            pub const FIELD: &'static str = $field;

            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CrmError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::all()
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s || v.label() == s)
                    .ok_or_else(|| CrmError::InvalidOption {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

// ---------------------------------------------------------------------------
// People
// ---------------------------------------------------------------------------

labeled_enum! {
    Role, field = "角色" {
        Salesperson => ("salesperson", "销售人员"),
        Manager => ("manager", "管理者"),
    }
}

// ---------------------------------------------------------------------------
// Customer attributes
// ---------------------------------------------------------------------------

labeled_enum! {
    Industry, field = "客户行业" {
        Software => ("software", "软件"),
        Manufacturing => ("manufacturing", "制造业"),
        Finance => ("finance", "金融"),
        Education => ("education", "教育"),
        Healthcare => ("healthcare", "医疗"),
        Retail => ("retail", "零售"),
    }
}

labeled_enum! {
    Tier, field = "客户分层" {
        A => ("a", "A"),
        B => ("b", "B"),
        C => ("c", "C"),
    }
}

labeled_enum! {
    Headcount, field = "人员规模" {
        UpTo50 => ("1_50", "1-50人"),
        UpTo200 => ("51_200", "51-200人"),
        UpTo500 => ("201_500", "201-500人"),
        Over500 => ("500_plus", "500人以上"),
    }
}

labeled_enum! {
    Region, field = "国家/地区" {
        China => ("china", "中国"),
        Usa => ("usa", "美国"),
        Japan => ("japan", "日本"),
        Germany => ("germany", "德国"),
        Other => ("other", "其他"),
    }
}

labeled_enum! {
    /// Relationship stage recorded on a visit.
    CustomerStage, field = "客户阶段" {
        FirstContact => ("first_contact", "初次接触"),
        NeedsConfirmed => ("needs_confirmed", "需求确认"),
        Demo => ("demo", "方案演示"),
        Nurturing => ("nurturing", "意向培养"),
        Negotiation => ("negotiation", "合同谈判"),
        Closed => ("closed", "成交"),
    }
}

// ---------------------------------------------------------------------------
// Application and opportunity attributes
// ---------------------------------------------------------------------------

labeled_enum! {
    ProductLine, field = "产品线" {
        AiPlatform => ("ai_platform", "AI 平台"),
        Crm => ("crm", "CRM系统"),
        Analytics => ("analytics", "数据分析"),
        Cloud => ("cloud", "云服务"),
        Other => ("other", "其他"),
    }
}

labeled_enum! {
    Probability, field = "签单概率" {
        P10 => ("p10", "10%"),
        P30 => ("p30", "30%"),
        P50 => ("p50", "50%"),
        P60 => ("p60", "60%"),
        P70 => ("p70", "70%"),
        P80 => ("p80", "80%"),
        P90 => ("p90", "90%"),
    }
}

labeled_enum! {
    ApplicationStatus, field = "审批状态" {
        Pending => ("pending", "待审批"),
        Approved => ("approved", "已通过"),
        Rejected => ("rejected", "已驳回"),
    }
}

labeled_enum! {
    /// Pipeline position of an opportunity. Declaration order is pipeline order.
    OpportunityStage, field = "阶段" {
        Evaluation => ("evaluation", "立项评估"),
        Proposal => ("proposal", "方案制定"),
        Negotiation => ("negotiation", "合同谈判"),
        Settlement => ("settlement", "成交/关闭"),
    }
}

labeled_enum! {
    OpportunityStatus, field = "商机状态" {
        Open => ("open", "进行中"),
        Won => ("won", "成交"),
        Closed => ("closed", "关闭"),
    }
}

labeled_enum! {
    /// How an open opportunity ends.
    Outcome, field = "结案结果" {
        Won => ("won", "成交"),
        Closed => ("closed", "关闭"),
    }
}

labeled_enum! {
    Period, field = "统计周期" {
        ThisMonth => ("month", "本月"),
        ThisQuarter => ("quarter", "本季度"),
        ThisYear => ("year", "本年"),
        All => ("all", "全部"),
    }
}

impl Role {
    pub fn can_approve(self) -> bool {
        self == Role::Manager
    }

    /// Managers see every record; salespeople only their own.
    pub fn sees_everything(self) -> bool {
        self == Role::Manager
    }
}

impl OpportunityStage {
    pub fn first() -> OpportunityStage {
        OpportunityStage::Evaluation
    }

    /// 1-based position in the pipeline.
    pub fn order(self) -> usize {
        self as usize + 1
    }
}

impl Outcome {
    pub fn status(self) -> OpportunityStatus {
        match self {
            Outcome::Won => OpportunityStatus::Won,
            Outcome::Closed => OpportunityStatus::Closed,
        }
    }
}

impl Period {
    /// First day included in the period, or `None` for an unbounded period.
    pub fn start(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::ThisMonth => NaiveDate::from_ymd_opt(today.year(), today.month(), 1),
            Period::ThisQuarter => {
                let first_month = (today.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(today.year(), first_month, 1)
            }
            Period::ThisYear => NaiveDate::from_ymd_opt(today.year(), 1, 1),
            Period::All => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
