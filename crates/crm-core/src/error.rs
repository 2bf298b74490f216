use thiserror::Error;

/// Coarse classification used by callers that only care about the failure
/// family, not the exact message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Storage,
}

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("not initialized: run 'crm init'")]
    NotInitialized,

    #[error("{0}为必填项")]
    MissingField(&'static str),

    #[error("{field}选项无效: {value}")]
    InvalidOption { field: &'static str, value: String },

    #[error("请输入有效的金额")]
    InvalidAmount(String),

    #[error("拜访日期格式无效: {0}")]
    InvalidDate(String),

    #[error("请输入有效的网址")]
    InvalidWebsite(String),

    #[error("无审批权限")]
    ApprovalDenied,

    #[error("仅商机负责人可变更阶段")]
    NotOwner { code: String, actor: String },

    #[error("仅管理者可查看销售排名")]
    ReportDenied,

    #[error("客户不存在: {0}")]
    CustomerNotFound(String),

    #[error("拜访记录不存在: {0}")]
    VisitNotFound(String),

    #[error("拜访记录不可转商机: {0}")]
    VisitNotEligible(String),

    #[error("商机申请不存在: {0}")]
    ApplicationNotFound(String),

    #[error("商机不存在: {0}")]
    OpportunityNotFound(String),

    #[error("用户不存在: {0}")]
    UserNotFound(String),

    #[error("商机申请{code}已处理（{status}），不可重复审批")]
    AlreadyDecided { code: String, status: String },

    #[error("商机{0}已结束，无法再次结案")]
    AlreadySettled(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl CrmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrmError::MissingField(_)
            | CrmError::InvalidOption { .. }
            | CrmError::InvalidAmount(_)
            | CrmError::InvalidDate(_)
            | CrmError::InvalidWebsite(_) => ErrorKind::Validation,
            CrmError::ApprovalDenied | CrmError::NotOwner { .. } | CrmError::ReportDenied => {
                ErrorKind::Authorization
            }
            CrmError::CustomerNotFound(_)
            | CrmError::VisitNotFound(_)
            | CrmError::VisitNotEligible(_)
            | CrmError::ApplicationNotFound(_)
            | CrmError::OpportunityNotFound(_)
            | CrmError::UserNotFound(_) => ErrorKind::NotFound,
            CrmError::AlreadyDecided { .. } | CrmError::AlreadySettled(_) => ErrorKind::Conflict,
            CrmError::NotInitialized | CrmError::Io(_) | CrmError::Yaml(_) => ErrorKind::Storage,
        }
    }

    /// Rule refusals become notifications; storage failures abort the command.
    pub fn is_rule_refusal(&self) -> bool {
        self.kind() != ErrorKind::Storage
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;
