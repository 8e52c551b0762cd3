use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ATTR_ID: &str = "Id";
pub const ATTR_PREFERRED_USER_NAME: &str = "PreferredUserName";
pub const ATTR_NAME: &str = "Name";
pub const ATTR_SUMMARY: &str = "Summary";
pub const ATTR_ICON: &str = "Icon";
pub const ATTR_KIND: &str = "Kind";

pub const ADMIN_USER_ID: &str = "admin";
pub const ADMIN_USER_NAME: &str = "namachan10777";
pub const ADMIN_SUMMARY: &str = "Administrator on this server";
pub const ADMIN_ICON_URL: &str = "https://www.namachan10777.dev/icon.webp";

/// Attribute values the provisioner reads and writes.
///
/// Only strings and lists are needed for the user record; anything else the
/// store returns is rejected by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    L(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(value) => Some(value),
            Self::L(_) => None,
        }
    }

    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::L(values) => Some(values),
            Self::S(_) => None,
        }
    }
}

pub type Item = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Person,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "Person",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Person" => Some(Self::Person),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("attribute '{0}' is missing")]
    MissingAttribute(&'static str),
    #[error("attribute '{attribute}' has the wrong type (expected {expected})")]
    WrongType {
        attribute: &'static str,
        expected: &'static str,
    },
    #[error("unsupported account kind '{0}'")]
    UnknownKind(String),
}

/// A user account as stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub preferred_user_name: String,
    pub name: String,
    pub summary: String,
    pub icon: Vec<String>,
    pub kind: AccountKind,
}

impl UserRecord {
    pub fn to_item(&self) -> Item {
        BTreeMap::from([
            (ATTR_ID.to_string(), AttributeValue::S(self.id.clone())),
            (
                ATTR_PREFERRED_USER_NAME.to_string(),
                AttributeValue::S(self.preferred_user_name.clone()),
            ),
            (ATTR_NAME.to_string(), AttributeValue::S(self.name.clone())),
            (
                ATTR_SUMMARY.to_string(),
                AttributeValue::S(self.summary.clone()),
            ),
            (
                ATTR_ICON.to_string(),
                AttributeValue::L(self.icon.iter().cloned().map(AttributeValue::S).collect()),
            ),
            (
                ATTR_KIND.to_string(),
                AttributeValue::S(self.kind.as_str().to_string()),
            ),
        ])
    }

    pub fn from_item(item: &Item) -> Result<Self, RecordError> {
        let kind_raw = string_attribute(item, ATTR_KIND)?;
        let kind = AccountKind::parse(&kind_raw).ok_or(RecordError::UnknownKind(kind_raw))?;

        Ok(Self {
            id: string_attribute(item, ATTR_ID)?,
            preferred_user_name: string_attribute(item, ATTR_PREFERRED_USER_NAME)?,
            name: string_attribute(item, ATTR_NAME)?,
            summary: string_attribute(item, ATTR_SUMMARY)?,
            icon: string_list_attribute(item, ATTR_ICON)?,
            kind,
        })
    }
}

fn string_attribute(item: &Item, attribute: &'static str) -> Result<String, RecordError> {
    let value = item
        .get(attribute)
        .ok_or(RecordError::MissingAttribute(attribute))?;
    value
        .as_s()
        .map(str::to_string)
        .ok_or(RecordError::WrongType {
            attribute,
            expected: "string",
        })
}

fn string_list_attribute(item: &Item, attribute: &'static str) -> Result<Vec<String>, RecordError> {
    let wrong_type = RecordError::WrongType {
        attribute,
        expected: "list of strings",
    };
    let values = item
        .get(attribute)
        .ok_or(RecordError::MissingAttribute(attribute))?
        .as_l()
        .ok_or_else(|| wrong_type.clone())?;

    values
        .iter()
        .map(|value| value.as_s().map(str::to_string).ok_or_else(|| wrong_type.clone()))
        .collect()
}

/// Returns the single administrator account seeded into a fresh environment.
pub fn admin_user() -> UserRecord {
    UserRecord {
        id: ADMIN_USER_ID.to_string(),
        preferred_user_name: ADMIN_USER_NAME.to_string(),
        name: ADMIN_USER_NAME.to_string(),
        summary: ADMIN_SUMMARY.to_string(),
        icon: vec![ADMIN_ICON_URL.to_string()],
        kind: AccountKind::Person,
    }
}
