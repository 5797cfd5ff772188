use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who is browsing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Guest,
    User,
    Agent,
}

/// Account kinds that can be registered; guests are never signed up
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    User,
    Agent,
}

impl From<AccountKind> for IdentityKind {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::User => IdentityKind::User,
            AccountKind::Agent => IdentityKind::Agent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub kind: IdentityKind,
}

impl Identity {
    pub fn is_guest(&self) -> bool {
        self.kind == IdentityKind::Guest
    }

    pub fn is_agent(&self) -> bool {
        self.kind == IdentityKind::Agent
    }
}

/// Profile row kept by the identity provider for registered accounts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub user_type: IdentityKind,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn to_identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            kind: self.user_type,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}
