//! Wiring & DI. Entry point: bootstrap adapters, inject into services, serve HTTP.
//! No business logic here.

use dotenv::dotenv;
use meditrack::adapters::ai::{MockAiAdapter, OpenAiAdapter};
use meditrack::adapters::http::{build_router, AppContext, RateLimits};
use meditrack::adapters::notify::{HttpMailAdapter, LogNotifier};
use meditrack::adapters::persistence::SqliteRepo;
use meditrack::adapters::transcribe::HttpTranscriber;
use meditrack::domain::ReminderTracker;
use meditrack::ports::{AiPort, EmergencyLogPort, MedicineRepo, NotifierPort, TranscriberPort, UserRepo};
use meditrack::shared::config::{AppConfig, DEV_JWT_SECRET};
use meditrack::shared::token::TokenIssuer;
use meditrack::usecases::{
    AuthService, ChatService, EmergencyService, MedicineService, OnboardingService,
    ReminderService, RetryPolicy, UserService,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config load failed; using defaults");
        AppConfig::default()
    });

    let jwt_secret = cfg.jwt_secret_or_default();
    if jwt_secret == DEV_JWT_SECRET {
        warn!("MEDITRACK_JWT_SECRET not set; using development secret");
    }

    let data_path = PathBuf::from(cfg.data_dir_or_default());
    let repo = Arc::new(
        SqliteRepo::connect(&data_path)
            .await
            .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
    );
    info!(path = %repo.db_path().display(), "database ready");
    let users: Arc<dyn UserRepo> = Arc::clone(&repo) as Arc<dyn UserRepo>;
    let medicine_repo: Arc<dyn MedicineRepo> = Arc::clone(&repo) as Arc<dyn MedicineRepo>;
    let emergency_log: Arc<dyn EmergencyLogPort> = Arc::clone(&repo) as Arc<dyn EmergencyLogPort>;

    // --- Outbound adapters ---
    let ai: Arc<dyn AiPort> = if cfg.is_ai_configured() {
        info!(
            model = %cfg.ai_model_or_default(),
            url = %cfg.ai_api_url_or_default(),
            "medical assistant enabled"
        );
        Arc::new(OpenAiAdapter::new(
            cfg.ai_api_url_or_default(),
            cfg.ai_api_key.clone().unwrap_or_default(),
            cfg.ai_model_or_default(),
        ))
    } else {
        warn!("MEDITRACK_AI_API_KEY not set, using mock assistant");
        Arc::new(MockAiAdapter::new())
    };

    let notifier: Arc<dyn NotifierPort> = if cfg.is_mail_configured() {
        info!(from = %cfg.mail_from_or_default(), "mail relay enabled");
        Arc::new(HttpMailAdapter::new(
            cfg.mail_api_url.clone().unwrap_or_default(),
            cfg.mail_api_key.clone().unwrap_or_default(),
            cfg.mail_from_or_default(),
        ))
    } else {
        warn!("mail relay not configured; notifications are only logged");
        Arc::new(LogNotifier::new())
    };

    let transcriber: Option<Arc<dyn TranscriberPort>> = if cfg.is_transcription_configured() {
        info!(model = %cfg.transcribe_model_or_default(), "voice transcription enabled");
        Some(Arc::new(HttpTranscriber::new(
            cfg.transcribe_api_url.clone().unwrap_or_default(),
            cfg.transcribe_api_key.clone().unwrap_or_default(),
            cfg.transcribe_model_or_default(),
        )))
    } else {
        None
    };

    // --- Services ---
    let tokens = Arc::new(TokenIssuer::new(
        jwt_secret,
        cfg.access_token_ttl_secs_or_default(),
        cfg.refresh_token_ttl_secs_or_default(),
    ));
    let tracker = Arc::new(Mutex::new(ReminderTracker::new()));
    let window = cfg.reminder_window();

    let ctx = AppContext {
        auth: Arc::new(AuthService::new(
            Arc::clone(&users),
            tokens,
            cfg.password_iterations_or_default(),
        )),
        onboarding: Arc::new(OnboardingService::new(Arc::clone(&users))),
        users: Arc::new(UserService::new(Arc::clone(&users))),
        medicines: Arc::new(MedicineService::new(
            Arc::clone(&medicine_repo),
            Arc::clone(&tracker),
            window,
        )),
        chat: Arc::new(ChatService::new(ai)),
        emergency: Arc::new(EmergencyService::new(
            Arc::clone(&users),
            emergency_log,
            Arc::clone(&notifier),
            transcriber,
            RetryPolicy::default(),
        )),
        limits: RateLimits::new(cfg.trust_forwarded_for_or_default()),
    };

    // --- Reminder loop (background) ---
    let reminder_service = ReminderService::new(
        users,
        medicine_repo,
        notifier,
        tracker,
        window,
        Duration::from_secs(cfg.reminder_cycle_secs_or_default()),
    );
    tokio::spawn(async move {
        reminder_service.run_loop().await;
    });

    // --- Serve ---
    let addr = cfg.bind_addr_or_default();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("bind {}: {}", addr, e))?;
    info!(addr = %addr, "HTTP API listening");
    axum::serve(
        listener,
        build_router(ctx).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
