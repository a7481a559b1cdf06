//! Wiring: configuration → database → engine components.

use anyhow::Context;
use hearth_db::{Database, DbConfig};
use hearth_schedule::{
    OrderIntake, ScheduleConfig, SequenceAllocator, StandingOrderMaterializer,
    StandingOrderService,
};
use std::sync::Arc;
use tracing::info;

/// Everything a subcommand may need, built once per invocation.
pub struct App {
    pub config: ScheduleConfig,
    pub db: Database,
    pub sequence: Arc<SequenceAllocator>,
    pub materializer: Arc<StandingOrderMaterializer>,
    pub service: StandingOrderService,
    pub intake: OrderIntake,
}

impl App {
    /// Opens the configured database (running migrations) and builds the
    /// engine on top of it.
    pub async fn open(config: ScheduleConfig) -> anyhow::Result<Self> {
        let path = config.database_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }

        let db = Database::new(DbConfig::new(&path))
            .await
            .with_context(|| format!("opening database at {}", path.display()))?;

        let resolver = config.resolver()?;
        let templates = Arc::new(db.templates());
        let orders = Arc::new(db.orders());
        let sequence = Arc::new(SequenceAllocator::from_settings(
            Arc::new(db.counters()),
            &config.sequence,
        ));

        let materializer = Arc::new(StandingOrderMaterializer::new(
            templates.clone(),
            orders.clone(),
            sequence.clone(),
            resolver,
        ));
        let service = StandingOrderService::new(
            templates,
            orders.clone(),
            materializer.clone(),
            config.horizon_days(),
        );
        let intake = OrderIntake::new(orders, sequence.clone(), resolver);

        info!(
            database = %path.display(),
            timezone = %config.delivery.timezone,
            cutoff_hour = config.delivery.cutoff_hour,
            horizon_days = config.horizon_days(),
            "Scheduler ready"
        );

        Ok(App {
            config,
            db,
            sequence,
            materializer,
            service,
            intake,
        })
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
