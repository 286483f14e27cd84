use axum::{extract::State, Json};

use crate::services::Notification;
use crate::AppState;

/// Most recent notifications, newest first.
pub async fn list_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.notifier.recent())
}
