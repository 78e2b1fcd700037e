//! services/api/src/web/rest.rs
//!
//! Master definition for the OpenAPI specification. Only the surfaces
//! clients integrate against most are annotated; the rest of the routes
//! follow the same `{status, ...}` envelope.

use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::web::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::web::medicine_reminders::{SetStatusRequest, SetStatusResponse, SlotView};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::medicine_reminders::list_reminders_handler,
        crate::web::medicine_reminders::set_reminder_status_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthResponse,
            SetStatusRequest,
            SetStatusResponse,
            SlotView,
            ErrorBody,
        )
    ),
    tags(
        (name = "Household Records API", description = "Family health, vehicle and expense records.")
    )
)]
pub struct ApiDoc;
