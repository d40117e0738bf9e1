use base64::{engine::general_purpose, Engine as _};
use outio_pulse::db::PgStore;
use outio_pulse::middleware::SubmitThrottle;
use outio_pulse::pseudonym::Pseudonymizer;
use outio_pulse::services::aggregator::Aggregator;
use outio_pulse::services::ingest::IngestService;
use outio_pulse::state::{AppState, SharedState};
use outio_pulse::store::{ProfileStore, ResponseStore, SurveyStore};
use outio_pulse::web;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL missing");
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run database migrations: {}", e);
        e
    })?;
    tracing::info!("Database ready");

    let session_key_b64 = std::env::var("SESSION_KEY").expect("SESSION_KEY missing");
    let session_key = general_purpose::STANDARD
        .decode(session_key_b64)
        .expect("SESSION_KEY must be base64");
    let pseudonyms = Pseudonymizer::from_env()
        .expect("PSEUDONYM_KEY missing or invalid (base64, at least 32 bytes)");

    let store = Arc::new(PgStore::new(pool));
    let surveys: Arc<dyn SurveyStore> = store.clone();
    let responses: Arc<dyn ResponseStore> = store.clone();
    let profiles: Arc<dyn ProfileStore> = store;

    let ingest = IngestService::new(surveys.clone(), responses.clone());
    let aggregator = Aggregator::new(surveys.clone(), responses, profiles.clone());

    let recompute_on_submit = std::env::var("RECOMPUTE_ON_SUBMIT")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let shared: SharedState = Arc::new(AppState {
        surveys,
        profiles,
        ingest,
        aggregator,
        pseudonyms,
        session_key,
        recompute_on_submit,
        submit_throttle: SubmitThrottle::new(10, 60),
    });

    let scheduler = JobScheduler::new().await?;

    // Periodic triggering policy: sweep every company on a schedule so
    // profiles converge even when nothing else triggers a recompute.
    let recompute_schedule =
        std::env::var("RECOMPUTE_SCHEDULE").unwrap_or_else(|_| "0 */15 * * * *".to_string());
    let shared_for_recompute = shared.clone();
    scheduler
        .add(Job::new_async(recompute_schedule.as_str(), move |_uuid, _l| {
            let state = shared_for_recompute.clone();
            Box::pin(async move {
                tracing::info!("Starting scheduled profile recompute sweep...");
                if let Err(e) = state.aggregator.recompute_all().await {
                    tracing::error!("Scheduled recompute sweep failed: {e:#}");
                }
            })
        })?)
        .await?;

    // Throttle bookkeeping - drop idle submit windows every hour.
    let shared_for_cleanup = shared.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let state = shared_for_cleanup.clone();
            Box::pin(async move {
                state.submit_throttle.cleanup().await;
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Scheduler started:");
    tracing::info!("  - Profile recompute sweep: {}", recompute_schedule);
    tracing::info!("  - Submit throttle cleanup: hourly");
    if recompute_on_submit {
        tracing::info!("  - Recompute-on-submit: enabled");
    }

    let app = web::routes(shared)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
        let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        format!("0.0.0.0:{}", port)
    });
    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
