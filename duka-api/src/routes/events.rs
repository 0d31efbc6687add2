/// Audit log endpoint
///
/// - `GET /v1/events?table_name=&field_id=` - List audit events (admin)

use crate::{app::AppState, error::ApiResult, response::ApiResponse};
use axum::{
    extract::{Query, State},
    Extension,
};
use duka_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    models::event::{Event, EventListParams},
    pagination::Page,
};

pub async fn list_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<EventListParams>,
) -> ApiResult<ApiResponse<Page<Event>>> {
    require_admin(&auth)?;
    let page = Event::list(&state.db, &params).await?;
    Ok(ApiResponse::ok("Events fetched", page))
}
