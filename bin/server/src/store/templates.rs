use super::{StoreError, TemplateStore};
use async_trait::async_trait;
use chrono::Utc;
use mailflow_core::Result;
use mailflow_workflow::{EmailTemplate, TemplateId, TemplateStatus};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::instrument;

/// Email template store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<Vec<EmailTemplate>>,
}

impl MemoryTemplateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the two templates the welcome series sends,
    /// under IDs `1` and `2`.
    #[must_use]
    pub fn with_samples() -> Self {
        Self {
            templates: RwLock::new(samples()),
        }
    }
}

fn sample(id: &str, name: &str, subject: &str, category: &str, body: &str) -> EmailTemplate {
    let now = Utc::now();
    EmailTemplate {
        id: TemplateId::from(id),
        name: name.to_string(),
        subject: subject.to_string(),
        preview_text: String::new(),
        category: category.to_string(),
        design: json!({
            "body": {
                "backgroundColor": "#ffffff",
                "content": [
                    { "type": "text", "content": format!("<h1>{subject}</h1>") },
                    { "type": "text", "content": format!("<p>{body}</p>") }
                ]
            }
        }),
        html: format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{name}</title></head>\
             <body><h1>{subject}</h1><p>Hi {{{{user.name}}}},</p><p>{body}</p></body></html>"
        ),
        status: TemplateStatus::Published,
        created_at: now,
        updated_at: now,
        usage_count: 0,
    }
}

fn samples() -> Vec<EmailTemplate> {
    vec![
        sample(
            "1",
            "Welcome Email",
            "Welcome to our platform!",
            "welcome",
            "We are excited to have you on board.",
        ),
        sample(
            "2",
            "Follow-up Email",
            "How are you enjoying our platform?",
            "onboarding",
            "It has been a couple of days since you joined us.",
        ),
    ]
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn list(&self, category: Option<&str>) -> Result<Vec<EmailTemplate>, StoreError> {
        let templates = self.templates.read().await;
        Ok(templates
            .iter()
            .filter(|t| category.is_none_or(|c| t.category == c))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &TemplateId) -> Result<Option<EmailTemplate>, StoreError> {
        let templates = self.templates.read().await;
        Ok(templates.iter().find(|t| &t.id == id).cloned())
    }

    #[instrument(skip_all, fields(template_id = %template.id))]
    async fn create(&self, template: &EmailTemplate) -> Result<(), StoreError> {
        let mut templates = self.templates.write().await;
        if templates.iter().any(|t| t.id == template.id) {
            return Err(StoreError::TemplateExists {
                id: template.id.clone(),
            }
            .into());
        }
        templates.push(template.clone());
        Ok(())
    }

    #[instrument(skip_all, fields(template_id = %template.id))]
    async fn update(&self, template: &EmailTemplate) -> Result<bool, StoreError> {
        let mut templates = self.templates.write().await;
        match templates.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => {
                *existing = template.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &TemplateId) -> Result<bool, StoreError> {
        let mut templates = self.templates.write().await;
        let before = templates.len();
        templates.retain(|t| &t.id != id);
        Ok(templates.len() < before)
    }
}
