use crate::{
    config::RuntimeConfiguration,
    error::{CohortToolsResult, StoreSnafu},
    store::{DataStore, memory::MemoryStore, postgres::PostgresStore},
};
use snafu::ResultExt;
use sqlx::postgres::PgPoolOptions;
use std::{ops::Deref, sync::Arc};

#[derive(Clone, Debug)]
pub struct CohortToolsState {
    store: Arc<dyn DataStore>,
    config: RuntimeConfiguration,
}

impl CohortToolsState {
    pub fn new(store: Arc<dyn DataStore>, config: RuntimeConfiguration) -> Self {
        Self { store, config }
    }

    ///connects to whichever store the config asks for
    ///
    ///postgres is never waited on: the first connection and the migrations happen in the
    ///background, a failure there is only logged and each request fails on its own until the
    ///database is reachable. only a url that can't be parsed at all is an error.
    pub fn connect(
        options: PgPoolOptions,
        config: RuntimeConfiguration,
    ) -> CohortToolsResult<Self> {
        let db_config = config.db_config();

        let store: Arc<dyn DataStore> = if db_config.is_in_memory() {
            warn!("Using the in-memory store, nothing will be persisted");
            Arc::new(MemoryStore::new())
        } else {
            let store = PostgresStore::connect_lazy(options, db_config.get_db_url()).context(
                StoreSnafu {
                    action: "open the database",
                },
            )?;

            let warm_up = store.clone();
            tokio::spawn(async move {
                match warm_up.ensure_collections().await {
                    Ok(()) => info!("Connected to database"),
                    Err(e) => error!(?e, "Error connecting to database"),
                }
            });

            Arc::new(store)
        };

        Ok(Self::new(store, config))
    }

    pub const fn config(&self) -> &RuntimeConfiguration {
        &self.config
    }

    pub async fn sensible_shutdown(&self) {
        self.store.close().await;
    }
}

impl Deref for CohortToolsState {
    type Target = dyn DataStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::router;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::time::Duration;
    use tower::ServiceExt;

    fn config_for(database_url: &str) -> RuntimeConfiguration {
        let database_url = database_url.to_string();
        RuntimeConfiguration::from_lookup(|name| {
            Ok((name == "DATABASE_URL").then(|| database_url.clone()))
        })
        .unwrap()
    }

    #[tokio::test]
    async fn unreachable_database_does_not_hold_up_startup() {
        //nothing listens on port 1
        let config = config_for("postgres://127.0.0.1:1/cohort-tools-api");
        let options = PgPoolOptions::new().acquire_timeout(Duration::from_millis(200));

        let state = CohortToolsState::connect(options, config).unwrap();

        let request = Request::builder()
            .uri("/api/students")
            .body(Body::empty())
            .unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unparsable_database_url_is_an_error() {
        let config = config_for("not a url at all");
        assert!(CohortToolsState::connect(PgPoolOptions::new(), config).is_err());
    }

    #[tokio::test]
    async fn memory_url_uses_the_in_memory_store() {
        let state = CohortToolsState::connect(PgPoolOptions::new(), config_for("memory")).unwrap();
        assert!(state.get_all_students().await.unwrap().is_empty());
    }
}
