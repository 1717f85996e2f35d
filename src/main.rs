// A local service that nudges the user, at random moments of the day, to check
// their jaw for clenching (bruxism) and keeps their answers on this device.
mod clock;
mod generator;
mod models;
mod notify;
mod routes;
mod schedule;
mod stats;
mod store;
mod timing;
mod types;
mod util;

use actix_web::{HttpResponse, HttpServer, App, web::{self, Data}, error};
use dotenv::dotenv;
use log::{info, error};
use std::{sync::Arc, process::exit};

use clock::SystemClock;
use notify::{LogNotifier, Notifier, WebhookNotifier};
use store::{FileStore, KeyValueStore};
use types::AppState;
use util::{ServiceConfig, VAR_DATA_DIR, VAR_NOTIFY_WEBHOOK_URL, VAR_POLL_INTERVAL_S, VAR_NOTIFY_TIMEOUT_S, HOST, PORT};

pub const LOG_CONFIG_PATH: &str = "log4rs.yaml";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            eprintln!("Optional environment variables: {HOST} {PORT} {VAR_DATA_DIR} {VAR_NOTIFY_WEBHOOK_URL} {VAR_POLL_INTERVAL_S} {VAR_NOTIFY_TIMEOUT_S}");
            exit(1)
        }
    };
    util::init_logging();

    let store: Arc<dyn KeyValueStore> = match FileStore::open(&config.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Cannot open data directory {}: {e}", config.data_dir.display());
            exit(1)
        }
    };
    info!("Storing data in {}", config.data_dir.display());

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => {
            match WebhookNotifier::new(url.clone(), config.notify_timeout) {
                Ok(webhook) => {
                    info!("Delivering notifications to {} (timeout {:?})", url, config.notify_timeout);
                    Arc::new(webhook)
                }
                Err(e) => {
                    error!("Cannot build webhook client, reminders fall back to in-app messages: {e}");
                    Arc::new(LogNotifier)
                }
            }
        }
        None => {
            info!("No {VAR_NOTIFY_WEBHOOK_URL} set, reminders fall back to in-app messages");
            Arc::new(LogNotifier)
        }
    };

    let state = AppState::new(Arc::clone(&store), Arc::new(SystemClock), notifier, config.poll_interval);
    let settings = store::load_settings(store.as_ref());
    state.poller.lock().await.arm(settings).await;

    let state_data = Data::new(state.clone());
    let server_handle = HttpServer::new(move || {
        let json_cfg = web::JsonConfig::default()
            .error_handler(|err, _req| {
                error!("Json config error: {}", err);
                error::InternalError::from_response(err, HttpResponse::BadRequest().into()).into()
            });
        App::new()
            .app_data(Data::clone(&state_data))
            .app_data(json_cfg)
            .configure(routes::configure)
    })
        .bind((config.host.as_str(), config.port))?
        .run();

    let result = server_handle.await;
    state.poller.lock().await.stop().await;
    info!("Shut down");
    result
}
