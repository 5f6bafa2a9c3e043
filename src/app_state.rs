use crate::{
    config::Config,
    infrastructure::database::{connect_database, Database},
    services::SchoolService,
};

#[derive(Clone)]
pub struct AppState {
    pub school: SchoolService,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize database (schema is created on connect)
        let database = connect_database(&config.database).await?;
        Ok(Self::with_database(database, config))
    }

    pub fn with_database(database: Database, config: Config) -> Self {
        let school = SchoolService::new(database, &config.ids);
        Self { school, config }
    }
}
