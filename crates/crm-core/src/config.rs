use crate::error::{CrmError, Result};
use crate::io::atomic_write;
use crate::paths;
use crate::types::Role;
use crate::user::User;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// NotificationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Notifications kept in the snapshot; older ones are dropped.
    #[serde(default = "default_keep")]
    pub keep: usize,
}

fn default_keep() -> usize {
    200
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            keep: default_keep(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default = "default_users")]
    pub users: Vec<User>,
    #[serde(default = "default_active_user")]
    pub active_user: String,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

fn default_version() -> u32 {
    1
}

fn default_users() -> Vec<User> {
    vec![
        User::salesperson("user_001", "张三"),
        User::manager("manager_001", "李管理"),
    ]
}

fn default_active_user() -> String {
    "张三".to_string()
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            users: default_users(),
            active_user: default_active_user(),
            notifications: NotificationConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CrmError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    pub fn user(&self, name: &str) -> Result<&User> {
        self.users
            .iter()
            .find(|u| u.name == name)
            .ok_or_else(|| CrmError::UserNotFound(name.to_string()))
    }

    /// Acting user: the explicit override if given, else `active_user`.
    pub fn resolve_actor(&self, override_name: Option<&str>) -> Result<&User> {
        self.user(override_name.unwrap_or(&self.active_user))
    }

    pub fn set_active(&mut self, name: &str) -> Result<&User> {
        let name = self.user(name)?.name.clone();
        self.active_user = name;
        self.user(&self.active_user)
    }

    /// Flip between the first salesperson and the first manager.
    pub fn switch_role(&mut self) -> Result<&User> {
        let current = self.user(&self.active_user)?.role;
        let target = match current {
            Role::Salesperson => Role::Manager,
            Role::Manager => Role::Salesperson,
        };
        let next = self
            .users
            .iter()
            .find(|u| u.role == target)
            .ok_or_else(|| CrmError::UserNotFound(target.label().to_string()))?
            .name
            .clone();
        self.active_user = next;
        self.user(&self.active_user)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.users.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "users roster is empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if !seen.insert(user.name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate user name '{}'", user.name),
                });
            }
        }

        if !self.users.is_empty() && self.user(&self.active_user).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("active_user '{}' is not in the roster", self.active_user),
            });
        }

        if !self.users.iter().any(User::is_manager) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no manager in roster: applications cannot be approved".to_string(),
            });
        }

        if self.notifications.keep == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "notifications.keep is 0: no notice will be retained".to_string(),
            });
        }

        warnings
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
    fn default_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        Config::new("sales").save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.project.name, "sales");
        assert_eq!(loaded.users.len(), 2);
        assert_eq!(loaded.active_user, "张三");
        assert_eq!(loaded.notifications.keep, 200);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let cfg: Config = serde_yaml::from_str("project:\n  name: sales\n").unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.users.len(), 2);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_uninitialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Config::load(dir.path()), Err(CrmError::NotInitialized)));
    }

    #[test]
    fn resolve_actor_prefers_override() {
        let cfg = Config::new("sales");
        assert_eq!(cfg.resolve_actor(None).unwrap().name, "张三");
        assert_eq!(cfg.resolve_actor(Some("李管理")).unwrap().role, Role::Manager);
        assert!(matches!(
            cfg.resolve_actor(Some("nobody")),
            Err(CrmError::UserNotFound(_))
        ));
    }

    #[test]
    fn switch_role_toggles() {
        let mut cfg = Config::new("sales");
        assert_eq!(cfg.switch_role().unwrap().name, "李管理");
        assert_eq!(cfg.switch_role().unwrap().name, "张三");
    }

    #[test]
    fn set_active_requires_known_user() {
        let mut cfg = Config::new("sales");
        assert!(cfg.set_active("赵六").is_err());
        assert_eq!(cfg.active_user, "张三");
        cfg.set_active("李管理").unwrap();
        assert_eq!(cfg.active_user, "李管理");
    }

    #[test]
    fn validate_flags_roster_problems() {
        let mut cfg = Config::new("sales");
        cfg.users = vec![
            User::salesperson("u1", "张三"),
            User::salesperson("u2", "张三"),
        ];
        cfg.active_user = "ghost".to_string();
        cfg.notifications.keep = 0;

        let warnings = cfg.validate();
        let errors = warnings.iter().filter(|w| w.level == WarnLevel::Error).count();
        assert_eq!(errors, 2);
        assert!(warnings.iter().any(|w| w.message.contains("no manager")));
        assert!(warnings.iter().any(|w| w.message.contains("notifications.keep")));
    }
}
