use std::time::Duration;

use jobscout_db::{Database, DatabaseConfig};
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Start a throwaway PostgreSQL and return a migrated [`Database`].
///
/// Keep the container alive for the whole test; dropping it stops Postgres.
pub async fn setup_test_db() -> (Database, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "scout")
        .with_env_var("POSTGRES_DB", "jobscout_test")
        .start()
        .await
        .expect("postgres container should start");

    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("mapped postgres port");

    let mut config =
        DatabaseConfig::new(format!("postgresql://postgres:scout@{host}:{port}/jobscout_test"));
    config.acquire_timeout = Duration::from_secs(2);

    // The ready message can precede the final server restart during init.
    let mut attempts = 0;
    let db = loop {
        match Database::connect(&config).await {
            Ok(db) => break db,
            Err(e) if attempts < 30 => {
                attempts += 1;
                tracing::debug!(attempts, error = %e, "Postgres not ready yet");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Err(e) => panic!("could not connect to test postgres: {e}"),
        }
    };

    db.migrate().await.expect("migrations should apply");
    (db, container)
}
