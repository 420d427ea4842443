use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use redis::Client as RedisClient;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutorat_api::config::Config;
use tutorat_api::db;
use tutorat_api::middleware::auth::JwtSecret;
use tutorat_api::routes;
use tutorat_api::services::email::EmailService;
use tutorat_api::services::storage::FileStore;
use tutorat_api::services::video::JwtRoomProvider;
use tutorat_api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let files = Arc::new(FileStore::new(config.upload_dir.clone()));
    let rooms = Arc::new(JwtRoomProvider::new(config.video_room_secret.clone()));

    let email = EmailService::new(&config).map(Arc::new);
    if email.is_some() {
        info!("SMTP email service configured");
    } else {
        info!("SMTP not configured — email features disabled");
    }

    let state = AppState {
        db: pool,
        redis: redis_conn,
        redis_client: redis_client.clone(),
        config: config.clone(),
        files,
        rooms,
        email,
    };

    // CORS : l'origine de l'application, plus localhost en développement.
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
            return true;
        }
        o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/auth/login", post(routes::auth::login))
        // Demandes parents
        .route(
            "/parent-requests",
            get(routes::parents::list_parent_requests).post(routes::parents::create_parent_request),
        )
        .route(
            "/parent-requests/{id}",
            get(routes::parents::get_parent_request)
                .delete(routes::parents::delete_parent_request),
        )
        .route(
            "/parent-requests/{id}/status",
            put(routes::parents::update_parent_request_status),
        )
        // Candidatures enseignants
        .route(
            "/teacher-requests",
            get(routes::teachers::list_teacher_requests)
                .post(routes::teachers::create_teacher_request),
        )
        .route(
            "/teacher-requests/{id}",
            get(routes::teachers::get_teacher_request)
                .delete(routes::teachers::delete_teacher_request),
        )
        .route(
            "/teacher-requests/{id}/status",
            put(routes::teachers::update_teacher_request_status),
        )
        .route(
            "/teacher-requests/{id}/cv",
            get(routes::teachers::download_teacher_cv),
        )
        // Rendez-vous
        .route(
            "/appointments",
            get(routes::appointments::list_appointments)
                .post(routes::appointments::create_appointment),
        )
        .route(
            "/appointments/check-trial/{parent_id}",
            get(routes::appointments::check_trial),
        )
        .route(
            "/appointments/parent/{parent_id}",
            get(routes::appointments::list_parent_appointments),
        )
        .route(
            "/appointments/teacher/{teacher_id}",
            get(routes::appointments::list_teacher_appointments),
        )
        .route(
            "/appointments/{id}",
            get(routes::appointments::get_appointment)
                .delete(routes::appointments::delete_appointment),
        )
        .route(
            "/appointments/{id}/suitable-teachers",
            get(routes::appointments::suitable_teachers),
        )
        .route(
            "/appointments/{id}/assign",
            put(routes::appointments::assign_teacher),
        )
        .route(
            "/appointments/{id}/status",
            put(routes::appointments::update_appointment_status),
        )
        .route(
            "/appointments/{id}/video-room",
            get(routes::appointments::video_room),
        )
        // Fichiers de cours
        .route(
            "/appointments/{id}/files",
            get(routes::files::list_course_files).post(routes::files::upload_course_file),
        )
        .route(
            "/files/{id}/download",
            get(routes::files::download_course_file),
        )
        .route("/files/{id}", delete(routes::files::delete_course_file))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Couvre les envois de fichiers (20 Mio) avec la marge multipart.
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("tutorat API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
