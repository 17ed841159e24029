//! Redis event consumer binary entry point.
//!
//! Usage: redis-event-consumer
//!
//! Configuration is read from the environment: `REDIS_URL`,
//! `DATABASE_PATH`, `CONSUMER_FAILURE_POLICY`, `CONSUMER_LOG_LEVEL` and
//! `CONSUMER_LOG_PATH`.

use allocation::{MessageBus, RedisPublisher, SqliteUnitOfWork};
use redis_event_consumer::{
    Channel, ConsumerConfig, ConsumerError, ConsumerResult, Dispatcher, RedisTransport,
    Subscription,
};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ConsumerResult<()> {
    let config = match ConsumerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            observability::init("redis-event-consumer");
            error!(error = %e, "Invalid configuration");
            return Err(e);
        }
    };

    observability::init_with_config(observability::LogConfig {
        service_name: "redis-event-consumer".into(),
        default_level: config.log_level.clone(),
        log_path: config.log_path.clone(),
        also_stderr: true,
    });

    info!(
        redis_url = %config.redis_url,
        database = %config.database_path.display(),
        policy = %config.failure_policy,
        "Starting Redis event consumer"
    );

    if let Err(e) = run(config).await {
        error!(kind = e.kind(), error = %e, "Redis event consumer stopped");
        return Err(e);
    }
    Ok(())
}

async fn run(config: ConsumerConfig) -> ConsumerResult<()> {
    allocation::init_schema_at(&config.database_path).map_err(ConsumerError::Persistence)?;

    let client = redis::Client::open(config.redis_url.as_str())?;
    let publish_conn = client.get_multiplexed_async_connection().await?;
    let bus = MessageBus::new(RedisPublisher::from_connection(publish_conn));

    let transport = RedisTransport::connect(&client).await?;
    let subscription = Subscription::open(transport, &Channel::ALL).await?;

    let database_path = config.database_path;
    let dispatcher = Dispatcher::new(
        bus,
        move || SqliteUnitOfWork::begin(&database_path),
        config.failure_policy,
    );

    dispatcher.run(subscription).await
}
