//! Email templates.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use mailflow_workflow::{EmailTemplate, TemplateDraft, TemplateId, TemplatePatch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Query of `GET /api/email-templates`. `all` is the same as no filter.
#[derive(Debug, Default, Deserialize)]
pub struct TemplateFilter {
    #[serde(default)]
    pub category: Option<String>,
}

impl TemplateFilter {
    fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != "all")
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateList {
    pub templates: Vec<EmailTemplate>,
}

#[derive(Debug, Serialize)]
pub struct TemplateBody {
    pub template: EmailTemplate,
}

async fn load_template(state: &AppState, id: &TemplateId) -> Result<EmailTemplate, ApiError> {
    state
        .templates
        .get(id)
        .await?
        .ok_or_else(|| ApiError::TemplateNotFound { id: id.to_string() })
}

pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TemplateFilter>,
) -> Result<Json<TemplateList>, ApiError> {
    let templates = state.templates.list(filter.category()).await?;
    Ok(Json(TemplateList { templates }))
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<TemplateDraft>,
) -> Result<(StatusCode, Json<TemplateBody>), ApiError> {
    let template = draft.into_template()?;
    state.templates.create(&template).await?;

    info!(template_id = %template.id, category = %template.category, "Email template created");
    Ok((StatusCode::CREATED, Json(TemplateBody { template })))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TemplateBody>, ApiError> {
    let template = load_template(&state, &TemplateId::from(id)).await?;
    Ok(Json(TemplateBody { template }))
}

pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<TemplatePatch>,
) -> Result<Json<TemplateBody>, ApiError> {
    let id = TemplateId::from(id);
    let mut template = load_template(&state, &id).await?;
    template.apply(patch);

    if !state.templates.update(&template).await? {
        return Err(ApiError::TemplateNotFound { id: id.to_string() });
    }

    info!(template_id = %id, "Email template updated");
    Ok(Json(TemplateBody { template }))
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = TemplateId::from(id);
    if !state.templates.delete(&id).await? {
        return Err(ApiError::TemplateNotFound { id: id.to_string() });
    }

    info!(template_id = %id, "Email template deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn duplicate_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TemplateBody>), ApiError> {
    let id = TemplateId::from(id);
    let template = load_template(&state, &id).await?.duplicate();
    state.templates.create(&template).await?;

    info!(template_id = %id, copy_id = %template.id, "Email template duplicated");
    Ok((StatusCode::CREATED, Json(TemplateBody { template })))
}
