// Inbound shop webhooks

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use uuid::Uuid;

use super::invalid_body;
use crate::{
    app::AppState,
    models::OrderWebhookPayload,
    services::IntakeOutcome,
    utils::service_error::ServiceError,
};

#[derive(Debug, Serialize)]
pub struct OrderIntakeResponse {
    pub success: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
}

/// POST /api/webhooks/order - Create the customer for a new order
///
/// Redelivery of an order that already has a customer answers 200 with `created: false`.
pub async fn order_created(
    State(app_state): State<AppState>,
    payload: Result<Json<OrderWebhookPayload>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Json(payload) = payload.map_err(invalid_body)?;

    let response = match app_state.intake_service.ingest_order(payload).await? {
        IntakeOutcome::Created(customer) => (
            StatusCode::CREATED,
            Json(OrderIntakeResponse {
                success: true,
                created: true,
                customer_id: Some(customer.id),
            }),
        ),
        IntakeOutcome::Duplicate => (
            StatusCode::OK,
            Json(OrderIntakeResponse {
                success: true,
                created: false,
                customer_id: None,
            }),
        ),
    };

    Ok(response.into_response())
}
