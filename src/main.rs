mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::database::Database;
use crate::core::middleware;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::features::complaints::routes as complaints_routes;
use crate::features::complaints::{
    AuditLogService, ComplaintService, IntakeService, LocationService, NominatimGeocoder,
};
use crate::modules::ai::AiClient;
use axum::{middleware::from_fn, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    // Storage: first reachable tier, schema created, admin seeded
    let database = Arc::new(
        Database::connect(&config.database, &config.admin_seed)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open any storage tier: {}", e))?,
    );
    let storage_tier = database.tier();
    tracing::info!("Storage ready (tier: {})", storage_tier);

    // AI client; missing keys surface as failed stages at request time
    let missing_keys = config.ai.missing_keys();
    if !missing_keys.is_empty() {
        tracing::warn!(
            "AI API keys not configured: {}. Complaint intake will fail until they are set.",
            missing_keys.join(", ")
        );
    }
    let ai_client = AiClient::from_config(&config.ai)
        .map_err(|e| anyhow::anyhow!("Failed to create AI client: {}", e))?;
    tracing::info!(
        "AI client initialized (model: {}, max attempts: {})",
        config.ai.model_name,
        config.ai.max_retries
    );

    let geocoder = Arc::new(
        NominatimGeocoder::new(&config.geocoding)
            .map_err(|e| anyhow::anyhow!("Failed to create geocoder: {}", e))?,
    );
    let location_service = Arc::new(LocationService::new(geocoder));
    tracing::info!("Location service initialized ({})", config.geocoding.base_url);

    let complaint_service = Arc::new(ComplaintService::new(Arc::clone(&database)));
    let audit_log_service = Arc::new(AuditLogService::new(Arc::clone(&database)));

    std::fs::create_dir_all(&config.app.scratch_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to create scratch directory {}: {}",
            config.app.scratch_dir.display(),
            e
        )
    })?;
    let intake_service = Arc::new(IntakeService::new(
        ai_client,
        location_service,
        Arc::clone(&complaint_service),
        config.app.scratch_dir.clone(),
    ));
    tracing::info!("Complaint services initialized");

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));

    let app = Router::new()
        .merge(swagger)
        .merge(complaints_routes::public_routes(
            intake_service,
            Arc::clone(&complaint_service),
            config.app.max_request_body_size,
        ))
        .nest(
            "/api/admin",
            complaints_routes::admin_routes(complaint_service, audit_log_service),
        )
        .merge(complaints_routes::health_routes(storage_tier))
        .layer(from_fn(middleware::submitting_user_middleware))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        .layer(
            ServiceBuilder::new()
                // Generate X-Request-Id using UUID v7 (or use client-provided one)
                .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(middleware::MakeSpanWithRequestId)
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                // Propagate X-Request-Id to response headers
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
