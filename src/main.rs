use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use budget_tracker::config::AppConfig;
use budget_tracker::models::default_taxonomy::default_taxonomy;
use budget_tracker::repositories::expense_repository::PostgresExpenseRepository;
use budget_tracker::repositories::monthly_balance_repository::PostgresMonthlyBalanceRepository;
use budget_tracker::repositories::suggestion_repository::PostgresSuggestionRepository;
use budget_tracker::repositories::taxonomy_repository::PostgresTaxonomyRepository;
use budget_tracker::repositories::user_repository::PostgresUserRepository;
use budget_tracker::routes::{AppState, build_router};
use budget_tracker::services::auth_service::{AuthServiceImpl, AuthSettings};
use budget_tracker::services::expense_service::ExpenseServiceImpl;
use budget_tracker::services::monthly_balance_service::MonthlyBalanceServiceImpl;
use budget_tracker::services::suggestion_service::SuggestionServiceImpl;
use budget_tracker::services::taxonomy_service::{TaxonomyService, TaxonomyServiceImpl};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // RUST_LOG wins over the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let taxonomy_repository = Arc::new(PostgresTaxonomyRepository::new(pool.clone()));
    let suggestion_repository = Arc::new(PostgresSuggestionRepository::new(pool.clone()));
    let expense_repository = Arc::new(PostgresExpenseRepository::new(pool.clone()));
    let monthly_balance_repository = Arc::new(PostgresMonthlyBalanceRepository::new(pool));

    let taxonomy_service = Arc::new(
        TaxonomyServiceImpl::new(taxonomy_repository.clone())
            .with_upsert_timeout(config.taxonomy_upsert_timeout),
    );

    // Startup continues with whatever was synchronized
    match taxonomy_service.synchronize(&default_taxonomy()).await {
        Ok(report) if report.is_complete() => info!(
            categories = report.categories_synced,
            created = report.records_created,
            "Expense taxonomy up to date"
        ),
        Ok(report) => {
            for failure in &report.failures {
                warn!(key = %failure.immutable_key, error = %failure.error, "Category not synchronized");
            }
        }
        Err(e) => warn!(error = %e, "Expense taxonomy synchronization skipped"),
    }

    let auth_settings = AuthSettings {
        jwt_secret: config.jwt_secret.clone(),
        token_ttl: chrono::Duration::hours(config.token_ttl_hours),
        max_users: config.max_users,
    };

    let state = AppState {
        auth_service: Arc::new(AuthServiceImpl::new(user_repository, auth_settings)),
        taxonomy_service,
        suggestion_service: Arc::new(SuggestionServiceImpl::new(
            suggestion_repository,
            taxonomy_repository.clone(),
        )),
        expense_service: Arc::new(ExpenseServiceImpl::new(
            expense_repository,
            taxonomy_repository,
        )),
        monthly_balance_service: Arc::new(MonthlyBalanceServiceImpl::new(
            monthly_balance_repository,
        )),
    };

    let app = build_router(state, config.is_development());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, environment = ?config.environment, "Server listening");
    if config.is_development() {
        info!("API docs available at http://{}/api/docs", addr);
    }

    axum::serve(listener, app).await?;

    Ok(())
}
