use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// `role` is `customer` or `professional`; `service`, `experience` and
/// `description` apply to professionals only.
#[derive(ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub pin_code: String,
    pub role: String,
    pub service: Option<String>,
    pub experience: Option<i32>,
    pub description: Option<String>,
}

/// `login` accepts a username or an email.
#[derive(ToSchema)]
pub struct LoginRequest { pub login: String, pub password: String }

#[derive(ToSchema)]
pub struct ProfileUpdateRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub pin_code: Option<String>,
    pub preferences: Option<String>,
    pub experience: Option<i32>,
    pub description: Option<String>,
}

#[derive(ToSchema)]
pub struct CreateRequestBody {
    pub service_id: i32,
    /// RFC 3339 or `YYYY-MM-DDTHH:MM`.
    pub scheduled_date: String,
    pub remarks: Option<String>,
    pub address: Option<String>,
    pub pin_code: Option<String>,
}

#[derive(ToSchema)]
pub struct UpdateRequestBody {
    pub scheduled_date: Option<String>,
    pub remarks: Option<String>,
    /// Only `closed`.
    pub status: Option<String>,
}

#[derive(ToSchema)]
pub struct ReviewBody { pub rating: i32, pub comment: Option<String> }

#[derive(ToSchema)]
pub struct ServiceBody { pub name: String, pub price: f64, pub time_required: i32, pub description: Option<String> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::profile,
        crate::routes::auth::update_profile,
        crate::routes::customer::list_services,
        crate::routes::customer::create_request,
        crate::routes::customer::update_request,
        crate::routes::customer::create_review,
        crate::routes::professional::pending,
        crate::routes::professional::accept,
        crate::routes::professional::reject,
        crate::routes::professional::complete,
        crate::routes::admin::list_services,
        crate::routes::admin::create_service,
        crate::routes::admin::update_service,
        crate::routes::admin::delete_service,
        crate::routes::admin::list_requests,
        crate::routes::admin::toggle_verification,
        crate::routes::admin::block_customer,
        crate::routes::admin::dashboard,
        crate::routes::admin::trigger_monthly_report,
        crate::routes::admin::recompute_ratings,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            ProfileUpdateRequest,
            CreateRequestBody,
            UpdateRequestBody,
            ReviewBody,
            ServiceBody,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "customer"),
        (name = "professional"),
        (name = "admin")
    )
)]
pub struct ApiDoc;
