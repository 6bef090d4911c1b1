use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::{fail, ApiResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 10, max = 5000))]
    pub message: String,
}

pub async fn submit(State(s): State<AppState>, Json(form): Json<ContactForm>) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    form.validate().map_err(fail)?;
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO contact_messages (id, name, email, message, created_at) VALUES ($1, $2, $3, $4, NOW())")
        .bind(id).bind(form.name.trim()).bind(form.email.trim()).bind(form.message.trim())
        .execute(&s.db).await.map_err(fail)?;
    tracing::info!(message_id = %id, "contact message received");
    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id, "status": "received"}))))
}
