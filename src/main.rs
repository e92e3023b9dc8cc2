use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use reqwest::Client;
use signup_bridge::{
    config::Config,
    db::{
        diagnostic_repository::DiagnosticLog,
        postgres_diagnostic_repository::PostgresDiagnosticLog,
        postgres_signup_repository::PostgresSignupStore,
        signup_repository::{SignupStore, TimedSignupStore},
    },
    responses::JsonResponse,
    routes::{auth_routes, diagnostics_routes, signup_routes},
    services::{
        crm::HighLevelCrm, diagnostics::Diagnostics, oauth::google::client::GoogleOAuthClient,
    },
    utils::{admin::ADMIN_TOKEN_HEADER, jwt::JwtKeys},
    worker, AppState,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

const OUTBOUND_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(Config::from_env().context("invalid configuration")?);

    let limits = &config.rate_limits;
    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(limits.global_per_millisecond)
            .burst_size(limits.global_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid global rate limiter settings")?,
    );
    // Stricter limiter for /api/auth/*
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(limits.auth_per_second)
            .burst_size(limits.auth_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many sign-in attempts. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid auth rate limiter settings")?,
    );

    for limiter in [
        global_governor_conf.limiter().clone(),
        auth_governor_conf.limiter().clone(),
    ] {
        std::thread::spawn(move || loop {
            std::thread::sleep(Duration::from_secs(60));
            limiter.retain_recent();
        });
    }

    let pg_pool = establish_connection(&config.database_url).await?;

    let postgres_store = Arc::new(PostgresSignupStore {
        pool: pg_pool.clone(),
        ttl: config.pending_signup_ttl,
    }) as Arc<dyn SignupStore>;
    let signups = Arc::new(TimedSignupStore::new(postgres_store, config.store_timeout))
        as Arc<dyn SignupStore>;

    let diagnostic_log = Arc::new(PostgresDiagnosticLog {
        pool: pg_pool.clone(),
        capacity: config.diagnostics_capacity,
    }) as Arc<dyn DiagnosticLog>;

    let http_client = Client::builder()
        .timeout(OUTBOUND_HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let jwt_keys = Arc::new(JwtKeys::from_secret(&config.jwt_secret).context("invalid JWT_SECRET")?);

    let state = AppState {
        signups,
        diagnostics: Diagnostics::new(diagnostic_log),
        google_oauth: Arc::new(GoogleOAuthClient {
            client: http_client.clone(),
            config: config.google.clone(),
        }),
        crm: Arc::new(HighLevelCrm::new(http_client, config.crm.clone())),
        config: config.clone(),
        jwt_keys,
    };

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(ADMIN_TOKEN_HEADER)])
        .allow_credentials(true);

    let app = Router::new()
        .route("/", get(root))
        .nest("/api/signups", signup_routes(state.clone()))
        .nest(
            "/api/auth",
            auth_routes().layer(GovernorLayer {
                config: auth_governor_conf,
            }),
        )
        .nest("/api/diagnostics", diagnostics_routes(state.clone()))
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: global_governor_conf,
        })
        .layer(cors);

    worker::start_background_workers(state, config.sweep_interval).await;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// `LOG_FORMAT=json` switches to structured output; `RUST_LOG` sets the filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn root() -> Response {
    JsonResponse::success("signup bridge is running").into_response()
}

/// Connects, verifies the connection, and applies pending migrations.
async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    info!("connected to the database");
    Ok(pool)
}
