mod cors;

use std::{sync::Arc, time::Duration};

use actix_web::{
    App, HttpServer,
    web::{self},
};
use billing::{Notifiers, SpendMonitor};
use common::{cache::TtlCache, env_config::Config};
use db::{PgStore, Store};
use gateway::{AdmissionGate, SimulatedProvider};
use logger::{Auditor, GeoLocator};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();

    // init logger
    logger::setup(&config.log_level, &config.log_file).expect("Failed to set up logger");

    // init db connection
    let pool = db::setup(&config.database_url, config.is_production())
        .await
        .expect("Failed to set up database");
    let store = Arc::new(PgStore::new(pool));

    // geolocation of audit entries, when a lookup service is configured
    let geo = config.geoip_url.as_ref().map(|url| {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(config.geoip_cache_ttl_secs)));
        spawn_cache_purge(cache.clone());
        GeoLocator::new(url.clone(), cache)
    });

    let auditor = Arc::new(Auditor::new(store.clone(), geo));
    let notifiers = Notifiers::from_config(&config.alerts);
    if notifiers.is_empty() {
        log::warn!("No budget alert sink configured, alerts are only stored");
    }
    let monitor = Arc::new(SpendMonitor::new(
        store.clone(),
        notifiers,
        auditor.clone(),
    ));
    let gate = Arc::new(
        AdmissionGate::new(
            store.clone(),
            Arc::new(SimulatedProvider::new(config.simulated_failure_rate)),
            auditor.clone(),
            config.markup_percent,
        )
        .with_spend_monitor(monitor),
    );
    let store: Arc<dyn Store> = store;

    log::info!(
        "Listening on {}:{} with {}% markup",
        config.server_host,
        config.server_port,
        config.markup_percent
    );

    let config_data = config.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(auditor.clone()))
            .app_data(web::Data::new(gate.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .wrap(logger::middleware(config_data.console_logging_enabled)) // 2nd
            .wrap(cors::middleware(&config_data.cors_allowed_origin)) // 1st
            .service(
                web::scope("/api/dashboard")
                    .wrap(extractor::middleware(config_data.jwt_config.secret.clone()))
                    .service(api_keys::mount_keys())
                    .service(api_keys::mount_projects()),
            )
            .service(
                web::scope("/v1")
                    .wrap(limiter::client_middleware(config_data.requests_per_second))
                    .service(gateway::mount_completions()),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}

fn spawn_cache_purge<K, V>(cache: Arc<TtlCache<K, V>>)
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let period = cache.ttl().max(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                log::debug!("Purged {} expired geolocation entries", purged);
            }
        }
    });
}
