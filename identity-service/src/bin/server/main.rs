use std::sync::Arc;
use std::time::Duration;

use auth::SystemClock;
use auth::TokenIssuer;
use identity_service::config::Config;
use identity_service::domain::identity::models::EmailAddress;
use identity_service::domain::identity::service::IdentityService;
use identity_service::domain::verification::service::VerificationService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::mail::smtp::SmtpMailer;
use identity_service::outbound::store::postgres::PgStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        mail_host = %config.mail.host,
        verification_ttl_minutes = config.verification.ttl_minutes,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let clock = Arc::new(SystemClock);
    let issuer = Arc::new(TokenIssuer::new(
        config.token.secret.as_bytes(),
        chrono::Duration::minutes(config.token.access_ttl_minutes),
        chrono::Duration::days(config.token.refresh_ttl_days),
        clock.clone(),
    ));
    let mailer = Arc::new(SmtpMailer::new(&config.mail)?);
    let store = Arc::new(PgStore::new(pg_pool));

    let identity = Arc::new(IdentityService::new(
        Arc::clone(&store),
        Arc::clone(&issuer),
        clock.clone(),
    ));
    let verification = Arc::new(VerificationService::new(
        Arc::clone(&store),
        mailer,
        clock.clone(),
        config.verification.code_length,
        config.verification.ttl_minutes,
    ));

    let admin_email = EmailAddress::new(config.admin.email.clone())?;
    identity
        .bootstrap_admin(&admin_email, &config.admin.password)
        .await?;

    // TTL sweep for verification records that expired without being superseded.
    let sweep_interval = Duration::from_secs(config.verification.ttl_minutes as u64 * 60);
    let sweeper = Arc::clone(&verification);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.purge_expired().await {
                tracing::warn!(error = %e, "Verification sweep failed");
            }
        }
    });

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let application = create_router(identity, verification, issuer);
    axum::serve(http_listener, application).await?;

    Ok(())
}
