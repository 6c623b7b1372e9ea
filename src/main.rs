use goalfund::api::{create_router, AppState};
use goalfund::config::Settings;
use goalfund::events::{
    topics, ConsumerConfig, EventConsumer, EventDispatcher, EventProducer, OutboxPump,
    OutboxRepository, ProducerConfig,
};
use goalfund::idempotency::{IdempotencyHandler, IdempotencyHandlerConfig};
use goalfund::observability::{
    init_logging, init_metrics, LogConfig, LogFormat, HealthChecker,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (needed for log level)
    let settings = Settings::new()?;

    // Initialize structured logging
    let log_config = LogConfig {
        level: settings.application.log_level.clone(),
        format: LogFormat::from(
            std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()).as_str()
        ),
        include_target: true,
        include_file: false,
        include_line: false,
    };
    init_logging(&log_config);

    // Initialize Prometheus metrics
    let metrics_handle = init_metrics();
    info!("Configuration loaded, metrics initialized");

    // Connect to PostgreSQL
    info!("Connecting to database at {}...", settings.database.url);
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;

    info!("Database connection established");

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied successfully");

    // Connect to Redis
    info!("Connecting to Redis at {}...", settings.redis.url);
    let redis_client = redis::Client::open(settings.redis.url.clone())?;
    let mut con = redis_client.get_multiplexed_async_connection().await?;
    let _: () = redis::cmd("PING").query_async(&mut con).await?;
    info!("Redis connection established");

    // Connect to Kafka (with timeout, preserve client)
    info!("Checking Kafka connection...");
    use rskafka::client::ClientBuilder;

    let connection = vec![settings.kafka.brokers.clone()];
    let kafka_client = match tokio::time::timeout(
        Duration::from_secs(3),
        ClientBuilder::new(connection).build()
    )
    .await
    {
        Ok(Ok(client)) => {
            info!("Kafka client created successfully");
            Some(Arc::new(client))
        }
        Ok(Err(e)) => {
            tracing::warn!("Kafka connection failed: {}. Continuing without Kafka.", e);
            None
        }
        Err(_) => {
            tracing::warn!("Kafka connection timed out. Continuing without Kafka.");
            None
        }
    };

    if kafka_client.is_none() {
        info!("Kafka not available, continuing without event streaming");
    }

    info!("System startup verification complete.");

    // Create health checker
    let health_checker = Arc::new(HealthChecker::new(
        pool.clone(),
        redis_client.clone(),
        kafka_client.clone(),
    ));

    // Create application state with metrics handle and health checker
    let state = AppState::new(pool.clone(), redis_client.clone(), kafka_client.clone(), settings.provider.clone())?
        .with_metrics(metrics_handle)
        .with_health_checker(health_checker);

    // Wire the event bus: a producer drains the transactional outbox, and a
    // consumer dispatches PaymentVerified/WithdrawalRequested/
    // RefundDisbursementRequested events to the Goals Coordinator and
    // Disbursement Adapter (§4.4). Both degrade gracefully when Kafka is
    // unavailable, same as the rest of startup.
    if kafka_client.is_some() {
        let producer_config = ProducerConfig {
            brokers: vec![settings.kafka.brokers.clone()],
            default_topic: format!("{}.ledger", settings.kafka.topic_prefix),
            ..ProducerConfig::default()
        };
        let mut producer = EventProducer::new(producer_config);
        match producer.connect().await {
            Ok(()) => {
                let producer = Arc::new(producer);
                let outbox_pump = OutboxPump::new(
                    OutboxRepository::new(pool.clone()),
                    producer,
                    100,
                    Duration::from_secs(2),
                );
                tokio::spawn(async move {
                    outbox_pump.run().await;
                });
                info!("outbox pump started");
            }
            Err(e) => {
                tracing::warn!("failed to connect event producer: {}. Outbox pump disabled.", e);
            }
        }

        let consumer_config = ConsumerConfig {
            brokers: vec![settings.kafka.brokers.clone()],
            topics: vec![
                topics::PAYMENTS.to_string(),
                topics::WITHDRAWALS.to_string(),
                topics::REFUNDS.to_string(),
            ],
            group_id: "goalfund-event-dispatcher".to_string(),
            ..ConsumerConfig::default()
        };
        let mut consumer = EventConsumer::new(consumer_config);
        match consumer.connect().await {
            Ok(()) => {
                let idempotency = Arc::new(IdempotencyHandler::new(
                    pool.clone(),
                    redis_client.clone(),
                    IdempotencyHandlerConfig::default(),
                ));
                let dispatcher = Arc::new(EventDispatcher::new(
                    state.goals_service.clone(),
                    state.disbursement_service.clone(),
                    idempotency,
                ));
                tokio::spawn(async move {
                    if let Err(e) = consumer.start(dispatcher).await {
                        tracing::error!("event consumer stopped: {}", e);
                    }
                });
                info!("event consumer started");
            }
            Err(e) => {
                tracing::warn!("failed to connect event consumer: {}. Event dispatch disabled.", e);
            }
        }
    }

    // Create API router
    let app = create_router(state);

    // Start HTTP server
    let addr = format!("0.0.0.0:{}", settings.application.port);
    info!("Starting HTTP server on {}", addr);
    
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
