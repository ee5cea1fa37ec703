//! Identity directory port.
//!
//! Lookups are batched: orchestrators collect every user id they will
//! notify and resolve them in one call, then map locally. A user missing
//! from the result is skipped with a warning by the caller, never fatal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AppResult;

/// A directory user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    /// Display name: family name followed by given name, falling back to
    /// the user id when both are absent.
    pub fn display_name(&self) -> String {
        let name = format!(
            "{}{}",
            self.last_name.as_deref().unwrap_or(""),
            self.first_name.as_deref().unwrap_or("")
        );
        if name.is_empty() {
            self.id.clone()
        } else {
            name
        }
    }
}

/// Port to the identity directory.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Resolve users by id in one batch. Ids without a matching user are
    /// simply absent from the returned map.
    async fn users_by_ids(&self, ids: &[String]) -> AppResult<HashMap<String, User>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_family_first() {
        let user = User {
            id: "zhang.wei".to_string(),
            first_name: Some("Wei".to_string()),
            last_name: Some("Zhang".to_string()),
            email: None,
        };
        assert_eq!(user.display_name(), "ZhangWei");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let user = User {
            id: "svc-account".to_string(),
            first_name: None,
            last_name: None,
            email: None,
        };
        assert_eq!(user.display_name(), "svc-account");
    }
}
