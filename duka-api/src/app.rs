/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use duka_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use duka_shared::{
    auth::middleware::{authenticate_bearer, AuthContext},
    models::user::User,
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                          public
/// /v1/auth/{register,login,refresh} public
/// /v1/auth/me                      authenticated
/// /v1/users, /v1/categories, /v1/units, /v1/products,
/// /v1/orders, /v1/customers, /v1/expenses, /v1/events,
/// /v1/dashboard                    authenticated
/// ```
///
/// Middleware, outermost first: security headers, CORS, compression,
/// request tracing. Bearer authentication wraps the protected routes only.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let protected = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .nest("/users", user_routes())
        .nest("/categories", category_routes())
        .nest("/units", unit_routes())
        .nest("/products", product_routes())
        .nest("/orders", order_routes())
        .nest("/customers", customer_routes())
        .nest("/expenses", expense_routes())
        .route("/events", get(routes::events::list_events))
        .nest("/dashboard", dashboard_routes())
        .layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes)
        .merge(protected);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn user_routes() -> Router<AppState> {
    use routes::users::*;

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/count", get(count_users))
        .route("/lookup", get(lookup_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

fn category_routes() -> Router<AppState> {
    use routes::categories::*;

    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/all", get(all_categories))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

fn unit_routes() -> Router<AppState> {
    use routes::units::*;

    Router::new()
        .route("/", get(list_units).post(create_unit))
        .route("/all", get(all_units))
        .route("/:id", get(get_unit).put(update_unit).delete(delete_unit))
}

fn product_routes() -> Router<AppState> {
    use routes::products::*;

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/all", get(all_products))
        .route("/by-ids", post(products_by_ids))
        .route("/low-stock", get(low_stock_products))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/:id/stock", put(set_stock))
        .route("/:id/stock-history", get(stock_history))
}

fn order_routes() -> Router<AppState> {
    use routes::orders::*;

    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/repayments", get(list_repayments).post(record_repayment))
}

fn customer_routes() -> Router<AppState> {
    use routes::customers::*;

    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/:id", get(get_customer).put(update_customer).delete(delete_customer))
        .route("/:id/credit-limit", post(set_credit_limit))
        .route("/:id/credit-limits", get(list_credit_limits))
}

fn expense_routes() -> Router<AppState> {
    use routes::expenses::*;

    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/:id", get(get_expense).delete(delete_expense))
}

fn dashboard_routes() -> Router<AppState> {
    use routes::dashboard::*;

    Router::new()
        .route("/summary", get(summary))
        .route("/today", get(today))
        .route("/stock-history", get(stock_history))
        .route("/low-stock-count", get(low_stock_count))
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Validates the bearer token and stores the caller in the request extensions
///
/// The account is re-read on every request, so a ban, deletion or role
/// change applies immediately rather than when the token expires.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = authenticate_bearer(req.headers(), state.jwt_secret())?;
    let user = User::find_by_id(&state.db, claims.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    if user.banned {
        tracing::warn!(user_id = %user.id, "Rejected token of banned user");
        return Err(ApiError::Forbidden("This account has been banned".to_string()));
    }

    req.extensions_mut().insert(AuthContext {
        user_id: user.id,
        role: user.role,
    });
    Ok(next.run(req).await)
}
