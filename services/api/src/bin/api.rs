//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{clock::SystemClock, db::DbAdapter, files::LocalFileStore},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        expenses, medical_records, medicine_reminders, profiles, rest::ApiDoc, vehicles, vitals,
        middleware::require_auth,
        state::AppState,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    let file_store = Arc::new(LocalFileStore::new(config.upload_dir.clone()));
    let app_state = Arc::new(AppState {
        db: db_adapter,
        files: file_store,
        clock: Arc::new(SystemClock),
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("invalid CORS_ORIGIN: {e}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/v1/auth/signup", post(signup_handler))
        .route("/api/v1/auth/login", post(login_handler));

    let profile_routes = Router::new()
        .route(
            "/",
            get(profiles::list_profiles_handler).post(profiles::create_profile_handler),
        );

    let vitals_routes = Router::new()
        .route(
            "/blood-pressure",
            get(vitals::list_blood_pressure_handler).post(vitals::create_blood_pressure_handler),
        )
        .route(
            "/blood-pressure/{id}",
            get(vitals::get_blood_pressure_handler).put(vitals::update_blood_pressure_handler),
        )
        .route(
            "/blood-sugar",
            get(vitals::list_blood_sugar_handler).post(vitals::create_blood_sugar_handler),
        )
        .route(
            "/blood-sugar/{id}",
            get(vitals::get_blood_sugar_handler).put(vitals::update_blood_sugar_handler),
        )
        .route(
            "/body-weight",
            get(vitals::list_body_weight_handler).post(vitals::create_body_weight_handler),
        )
        .route(
            "/body-weight/{id}",
            get(vitals::get_body_weight_handler).put(vitals::update_body_weight_handler),
        )
        .route(
            "/illness",
            get(vitals::list_illness_handler).post(vitals::create_illness_handler),
        )
        .route(
            "/illness/{id}",
            get(vitals::get_illness_handler)
                .put(vitals::update_illness_handler)
                .delete(vitals::delete_illness_handler),
        );

    let medical_record_routes = Router::new()
        .route(
            "/",
            get(medical_records::list_medical_records_handler)
                .post(medical_records::create_medical_record_handler),
        )
        .route(
            "/{id}",
            get(medical_records::get_medical_record_handler)
                .put(medical_records::update_medical_record_handler)
                .delete(medical_records::delete_medical_record_handler),
        );

    let medicine_reminder_routes = Router::new()
        .route(
            "/",
            get(medicine_reminders::list_reminders_handler)
                .post(medicine_reminders::create_reminder_handler),
        )
        .route(
            "/{id}",
            get(medicine_reminders::get_reminder_handler)
                .put(medicine_reminders::update_reminder_handler)
                .delete(medicine_reminders::delete_reminder_handler),
        )
        .route(
            "/{id}/logs",
            post(medicine_reminders::set_reminder_status_handler),
        );

    let car_maintenance_routes = Router::new()
        .route(
            "/vehicles",
            get(vehicles::list_vehicles_handler).post(vehicles::create_vehicle_handler),
        )
        .route(
            "/vehicles/{id}",
            get(vehicles::get_vehicle_handler).put(vehicles::update_vehicle_handler),
        )
        .route(
            "/records",
            get(vehicles::list_maintenance_records_handler)
                .post(vehicles::create_maintenance_record_handler),
        )
        .route(
            "/records/{id}",
            get(vehicles::get_maintenance_record_handler)
                .delete(vehicles::delete_maintenance_record_handler),
        )
        .route(
            "/reminders",
            get(vehicles::list_vehicle_reminders_handler)
                .post(vehicles::create_vehicle_reminder_handler),
        )
        .route(
            "/reminders/{id}",
            get(vehicles::get_vehicle_reminder_handler)
                .put(vehicles::update_vehicle_reminder_handler)
                .delete(vehicles::delete_vehicle_reminder_handler),
        );

    let expense_routes = Router::new()
        .route(
            "/",
            get(expenses::list_expenses_handler).post(expenses::create_expense_handler),
        )
        .route("/categories", get(expenses::list_categories_handler).post(expenses::create_category_handler))
        .route("/categories/list", get(expenses::list_categories_handler))
        .route(
            "/categories/{id}",
            put(expenses::update_category_handler).delete(expenses::delete_category_handler),
        )
        .route("/budgets", get(expenses::list_budgets_handler).post(expenses::create_budget_handler))
        .route("/budgets/summary", get(expenses::budget_summary_handler))
        .route(
            "/budgets/{id}",
            put(expenses::update_budget_handler).delete(expenses::delete_budget_handler),
        )
        .route("/goals", get(expenses::list_goals_handler).post(expenses::create_goal_handler))
        .route(
            "/goals/{id}",
            put(expenses::update_goal_handler).delete(expenses::delete_goal_handler),
        )
        .route("/schedules", get(expenses::list_schedules_handler).post(expenses::create_schedule_handler))
        .route(
            "/schedules/{id}",
            put(expenses::update_schedule_handler).delete(expenses::delete_schedule_handler),
        )
        .route("/schedules/{id}/pay", post(expenses::mark_schedule_paid_handler))
        .route(
            "/subscriptions",
            get(expenses::list_subscriptions_handler).post(expenses::create_subscription_handler),
        )
        .route(
            "/subscriptions/{id}",
            put(expenses::update_subscription_handler)
                .delete(expenses::delete_subscription_handler),
        )
        .route("/subscriptions/{id}/pay", post(expenses::mark_subscription_paid_handler))
        .route("/accounts", get(expenses::list_accounts_handler).post(expenses::create_account_handler))
        .route("/accounts/list", get(expenses::list_accounts_handler))
        .route(
            "/accounts/{id}",
            put(expenses::update_account_handler).delete(expenses::delete_account_handler),
        )
        .route(
            "/currencies",
            get(expenses::list_currencies_handler).post(expenses::create_currency_handler),
        )
        .route("/currencies/list", get(expenses::list_currencies_handler))
        .route(
            "/currencies/{id}",
            put(expenses::update_currency_handler).delete(expenses::delete_currency_handler),
        )
        .route(
            "/{id}",
            get(expenses::get_expense_handler)
                .put(expenses::update_expense_handler)
                .delete(expenses::delete_expense_handler),
        );

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/v1/auth/logout", post(logout_handler))
        .nest("/api/v1/profiles", profile_routes)
        .nest("/api/v1/vitals", vitals_routes)
        .nest("/api/v1/medical-records", medical_record_routes)
        .nest("/api/v1/medicine-reminders", medicine_reminder_routes)
        .nest("/api/v1/car-maintenance", car_maintenance_routes)
        .nest("/api/v1/expenses", expense_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors)
        .with_state(app_state);

    // Serve uploaded attachments and merge in the Swagger UI router.
    let app = Router::new()
        .merge(api_router)
        .nest_service("/files", ServeDir::new(&config.upload_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
