//! OpenAPI document for the REST API.

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// Path of the generated OpenAPI JSON document.
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Aggregated OpenAPI description of every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "UniBaby Pool API", description = "Course registration and payment for the UniBaby children's pool"),
    paths(
        crate::api::handlers::system::health_handler,
        crate::api::handlers::system::packages_handler,
        crate::api::handlers::registration::register,
        crate::api::handlers::registration::get_registration,
        crate::api::handlers::checkout::create_session,
        crate::api::handlers::checkout::checkout_status,
        crate::api::handlers::webhook::stripe_webhook,
    ),
    components(schemas(
        crate::api::handlers::system::HealthResponse,
        crate::api::dto::PackageDto,
        crate::api::dto::PackagesResponse,
        crate::api::dto::RegistrationRequest,
        crate::api::dto::RegisterResponse,
        crate::api::dto::RegistrationDto,
        crate::api::dto::CheckoutSessionRequest,
        crate::api::dto::CheckoutSessionResponse,
        crate::api::dto::CheckoutStatusResponse,
        crate::api::dto::WebhookAck,
        crate::domain::RegistrationStatus,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "System", description = "Health"),
        (name = "Packages", description = "Course package catalog"),
        (name = "Registrations", description = "Parent/child registrations"),
        (name = "Checkout", description = "Hosted payment checkout"),
        (name = "Webhooks", description = "Payment provider callbacks"),
    )
)]
pub struct ApiDoc;

/// Routes serving the OpenAPI document, plus Swagger UI at `/swagger-ui`
/// when the `swagger-ui` feature is enabled.
#[cfg(feature = "swagger-ui")]
pub fn routes() -> Router<AppState> {
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(SwaggerUi::new("/swagger-ui").url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
}

/// Routes serving the OpenAPI document.
#[cfg(not(feature = "swagger-ui"))]
pub fn routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(OPENAPI_JSON_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}
