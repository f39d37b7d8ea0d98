use actix_web::web;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use order_aggregates::api::{self, AppState};
use order_aggregates::config::AppConfig;
use order_aggregates::domain::catalog::Item;
use order_aggregates::domain::member::{Address, Member};
use order_aggregates::domain::order::OrderLine;
use order_aggregates::metrics::{self, Metrics};
use order_aggregates::service::OrderService;
use order_aggregates::store::{InMemoryStore, PgStore, Store};

/// Members with the items each of them orders in the demo data
struct DemoData {
    orders: Vec<(Uuid, Vec<OrderLine>)>,
}

fn seed_in_memory(store: &InMemoryStore) -> anyhow::Result<DemoData> {
    let user_a = Member::new("userA", Address::new("Seoul", "1", "1111"));
    let user_b = Member::new("userB", Address::new("Busan", "2", "2222"));
    let jpa1 = Item::book("JPA1 BOOK", 10_000, 100);
    let jpa2 = Item::book("JPA2 BOOK", 20_000, 100);
    let spring1 = Item::book("SPRING1 BOOK", 20_000, 200);
    let spring2 = Item::book("SPRING2 BOOK", 40_000, 300);

    for member in [&user_a, &user_b] {
        store.insert_member(member)?;
    }
    for item in [&jpa1, &jpa2, &spring1, &spring2] {
        store.insert_item(item)?;
    }

    Ok(DemoData {
        orders: vec![
            (user_a.id, vec![OrderLine::new(jpa1.id, 1), OrderLine::new(jpa2.id, 2)]),
            (user_b.id, vec![OrderLine::new(spring1.id, 3), OrderLine::new(spring2.id, 4)]),
        ],
    })
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_aggregates=debug"))
        )
        .init();

    tracing::info!("🚀 Starting order aggregates service");

    let config = AppConfig::from_env()?;
    tracing::info!(
        batch_size = config.loader.batch_size,
        default_page_limit = config.default_page_limit,
        "Configuration loaded"
    );

    // === 1. Initialize Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 2. Select the store ===
    let mut demo = None;
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to Postgres...");
            let store = PgStore::connect(url, config.db_max_connections).await?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory store with demo data");
            let store = InMemoryStore::new();
            demo = Some(seed_in_memory(&store)?);
            Arc::new(store)
        }
    };

    let service = Arc::new(OrderService::new(store, config.loader).with_metrics(metrics.clone()));

    // === 3. Place the demo orders ===
    if let Some(demo) = demo {
        for (member_id, lines) in demo.orders {
            let order_id = service.place_order_lines(member_id, lines).await?;
            tracing::info!("✅ Demo order placed: {}", order_id);
        }
    }

    // === 4. Serve the API and the metrics endpoint ===
    let state = web::Data::new(AppState {
        service,
        default_page_limit: config.default_page_limit,
    });
    let registry = metrics.registry().clone();

    tokio::try_join!(
        api::start_api_server(state, &config.http_bind),
        metrics::start_metrics_server(registry, config.metrics_port),
    )?;

    Ok(())
}
