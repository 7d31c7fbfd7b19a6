//! Email template records.
//!
//! Email nodes point at a template through the `templateId` field of their
//! data. A template holds the subject and rendered HTML plus the editor's
//! design document, which is stored without being interpreted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use ulid::Ulid;

/// Category given to templates created without one.
pub const DEFAULT_CATEGORY: &str = "marketing";

/// Identifier of an email template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TemplateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Publication state of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

/// A stored email template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: TemplateId,
    pub name: String,
    pub subject: String,
    /// Inbox preview line.
    pub preview_text: String,
    pub category: String,
    /// Design document of the visual email editor.
    pub design: JsonValue,
    pub html: String,
    pub status: TemplateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// How many sends used this template.
    pub usage_count: u64,
}

impl EmailTemplate {
    /// Copies the template under a fresh ID as an unused draft named
    /// `<name> (Copy)`.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: TemplateId::generate(),
            name: format!("{} (Copy)", self.name),
            status: TemplateStatus::Draft,
            created_at: now,
            updated_at: now,
            usage_count: 0,
            ..self.clone()
        }
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Empty strings for `name`, `subject` and `category` leave the current
    /// value in place; the other fields take whatever is supplied.
    pub fn apply(&mut self, patch: TemplatePatch) {
        let keep_if_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        if let Some(name) = keep_if_blank(patch.name) {
            self.name = name;
        }
        if let Some(subject) = keep_if_blank(patch.subject) {
            self.subject = subject;
        }
        if let Some(category) = keep_if_blank(patch.category) {
            self.category = category;
        }
        if let Some(preview_text) = patch.preview_text {
            self.preview_text = preview_text;
        }
        if let Some(design) = patch.design {
            self.design = design;
        }
        if let Some(html) = patch.html {
            self.html = html;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Errors in a template payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// `name` or `subject` is missing or blank.
    MissingNameOrSubject,
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNameOrSubject => f.write_str("Template name and subject are required"),
        }
    }
}

impl std::error::Error for TemplateError {}

/// Body of a template create request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateDraft {
    pub name: String,
    pub subject: String,
    pub preview_text: Option<String>,
    pub category: Option<String>,
    pub design: Option<JsonValue>,
    pub html: Option<String>,
    pub status: Option<TemplateStatus>,
}

impl TemplateDraft {
    /// Builds a new template with a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingNameOrSubject`] if either is blank.
    pub fn into_template(self) -> Result<EmailTemplate, TemplateError> {
        if self.name.trim().is_empty() || self.subject.trim().is_empty() {
            return Err(TemplateError::MissingNameOrSubject);
        }
        let now = Utc::now();
        Ok(EmailTemplate {
            id: TemplateId::generate(),
            name: self.name,
            subject: self.subject,
            preview_text: self.preview_text.unwrap_or_default(),
            category: self
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            design: self
                .design
                .unwrap_or_else(|| JsonValue::Object(serde_json::Map::new())),
            html: self.html.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            usage_count: 0,
        })
    }
}

/// Body of a template update request. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub preview_text: Option<String>,
    pub category: Option<String>,
    pub design: Option<JsonValue>,
    pub html: Option<String>,
    pub status: Option<TemplateStatus>,
}
