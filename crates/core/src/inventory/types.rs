use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{require_reference, require_text, Entity, ValidationError};

/// A tool tracked in inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Units on hand that are not checked out.
    pub quantity: i32,
    #[serde(default)]
    pub condition_type_id: Option<i64>,
    #[serde(default)]
    pub status_type_id: Option<i64>,
    #[serde(default)]
    pub image_id: Option<i64>,
}

impl Tool {
    /// Creates an unsaved tool. The repository assigns the id.
    pub fn new(name: impl Into<String>, quantity: i32) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            quantity,
            condition_type_id: None,
            status_type_id: None,
            image_id: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_condition(mut self, condition_type_id: i64) -> Self {
        self.condition_type_id = Some(condition_type_id);
        self
    }

    pub fn with_status(mut self, status_type_id: i64) -> Self {
        self.status_type_id = Some(status_type_id);
        self
    }
}

impl Entity for Tool {
    const NAME: &'static str = "Tool";
    const CACHE_PREFIX: &'static str = "tools";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::NAME, "name", &self.name)?;
        if self.quantity < 0 {
            return Err(ValidationError::new(
                Self::NAME,
                "quantity",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// A job site tools are checked out to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            location: None,
            active: true,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl Entity for Project {
    const NAME: &'static str = "Project";
    const CACHE_PREFIX: &'static str = "projects";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::NAME, "name", &self.name)
    }
}

/// A worker who can check tools in and out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personnel {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

impl Personnel {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: None,
            position: None,
        }
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }
}

impl Entity for Personnel {
    const NAME: &'static str = "Personnel";
    const CACHE_PREFIX: &'static str = "personnel";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::NAME, "first_name", &self.first_name)?;
        require_text(Self::NAME, "last_name", &self.last_name)
    }
}

/// A tool handed to a person for a project. Open until `checked_in_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkin {
    pub id: i64,
    pub tool_id: i64,
    pub personnel_id: i64,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub quantity: i32,
    pub checked_out_at: DateTime<Utc>,
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub condition_type_id: Option<i64>,
}

impl Checkin {
    pub fn new(tool_id: i64, personnel_id: i64, quantity: i32, at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            tool_id,
            personnel_id,
            project_id: None,
            quantity,
            checked_out_at: at,
            checked_in_at: None,
            condition_type_id: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.checked_in_at.is_none()
    }
}

impl Entity for Checkin {
    const NAME: &'static str = "Checkin";
    const CACHE_PREFIX: &'static str = "checkins";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_reference(Self::NAME, "tool_id", self.tool_id)?;
        require_reference(Self::NAME, "personnel_id", self.personnel_id)?;
        if self.quantity <= 0 {
            return Err(ValidationError::new(
                Self::NAME,
                "quantity",
                "must be at least 1",
            ));
        }
        if let Some(checked_in_at) = self.checked_in_at {
            if checked_in_at < self.checked_out_at {
                return Err(ValidationError::new(
                    Self::NAME,
                    "checked_in_at",
                    "must not precede checked_out_at",
                ));
            }
        }
        Ok(())
    }
}

/// An account of the inventory application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            email: email.into(),
            role: None,
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "User";
    const CACHE_PREFIX: &'static str = "users";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::NAME, "username", &self.username)?;
        if !self.email.contains('@') {
            return Err(ValidationError::new(
                Self::NAME,
                "email",
                "must be an email address",
            ));
        }
        Ok(())
    }
}

/// Metadata for an uploaded tool photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub file_name: String,
    pub content_type: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl Entity for Image {
    const NAME: &'static str = "Image";
    const CACHE_PREFIX: &'static str = "images";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::NAME, "file_name", &self.file_name)?;
        require_text(Self::NAME, "content_type", &self.content_type)
    }
}

/// A request for tools to be delivered to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: i64,
    pub tool_id: i64,
    #[serde(default)]
    pub personnel_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub quantity: i32,
    #[serde(default)]
    pub status_type_id: Option<i64>,
    pub requested_at: DateTime<Utc>,
}

impl Entity for ToolRequest {
    const NAME: &'static str = "ToolRequest";
    const CACHE_PREFIX: &'static str = "tool_requests";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_reference(Self::NAME, "tool_id", self.tool_id)?;
        if self.quantity <= 0 {
            return Err(ValidationError::new(
                Self::NAME,
                "quantity",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A report that a tool needs repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRepairRequest {
    pub id: i64,
    pub tool_id: i64,
    pub description: String,
    #[serde(default)]
    pub status_type_id: Option<i64>,
    pub requested_at: DateTime<Utc>,
}

impl Entity for ToolRepairRequest {
    const NAME: &'static str = "ToolRepairRequest";
    const CACHE_PREFIX: &'static str = "tool_repair_requests";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_reference(Self::NAME, "tool_id", self.tool_id)?;
        require_text(Self::NAME, "description", &self.description)
    }
}

/// Lookup value describing the physical condition of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionType {
    pub id: i64,
    pub name: String,
}

impl ConditionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

impl Entity for ConditionType {
    const NAME: &'static str = "ConditionType";
    const CACHE_PREFIX: &'static str = "condition_types";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::NAME, "name", &self.name)
    }
}

/// Lookup value describing where a tool or request stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusType {
    pub id: i64,
    pub name: String,
}

impl StatusType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

impl Entity for StatusType {
    const NAME: &'static str = "StatusType";
    const CACHE_PREFIX: &'static str = "status_types";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::NAME, "name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_tool_validation() {
        assert!(Tool::new("Hammer", 4).validate().is_ok());

        let err = Tool::new("", 4).validate().unwrap_err();
        assert_eq!(err.field, "name");

        let err = Tool::new("Hammer", -1).validate().unwrap_err();
        assert_eq!(err.field, "quantity");
    }

    #[test]
    fn test_checkin_validation() {
        let checkin = Checkin::new(1, 2, 1, fixed_timestamp());
        assert!(checkin.validate().is_ok());
        assert!(checkin.is_open());

        let err = Checkin::new(0, 2, 1, fixed_timestamp())
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "tool_id");

        let mut returned_early = Checkin::new(1, 2, 1, fixed_timestamp());
        returned_early.checked_in_at = Some(Utc.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap());
        let err = returned_early.validate().unwrap_err();
        assert_eq!(err.field, "checked_in_at");
    }

    #[test]
    fn test_user_email_validation() {
        assert!(User::new("jdoe", "jdoe@example.com").validate().is_ok());
        let err = User::new("jdoe", "not-an-email").validate().unwrap_err();
        assert_eq!(err.field, "email");
    }

    #[test]
    fn test_tool_deserializes_without_optional_fields() {
        let tool: Tool = serde_json::from_str(r#"{"id":3,"name":"Saw","quantity":5}"#).unwrap();
        assert_eq!(tool, Tool::new("Saw", 5).with_id(3));
    }

    #[test]
    fn test_cache_prefixes_are_distinct() {
        let prefixes = [
            Tool::CACHE_PREFIX,
            Project::CACHE_PREFIX,
            Personnel::CACHE_PREFIX,
            Checkin::CACHE_PREFIX,
            User::CACHE_PREFIX,
            Image::CACHE_PREFIX,
            ToolRequest::CACHE_PREFIX,
            ToolRepairRequest::CACHE_PREFIX,
            ConditionType::CACHE_PREFIX,
            StatusType::CACHE_PREFIX,
        ];
        let unique: std::collections::HashSet<_> = prefixes.iter().collect();
        assert_eq!(unique.len(), prefixes.len());
    }
}
