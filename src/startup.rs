use actix_web::dev::Server;
use actix_web::http::Method;
use actix_web::{web, App, HttpServer};
use reqwest::Client;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::config::{GoogleSheetsSettings, Settings, StoreKind};
use crate::routes::{
    cors_headers, handle_create_subscription, handle_subscription_method_not_allowed,
    handle_subscription_preflight, health_check,
};
use crate::store::{GoogleSheetsStore, InMemoryStore, ServiceAccountAuthenticator, SpreadsheetStore};

/// Paths the subscription endpoint answers on. The second one is where the
/// signup page posts to.
pub const SUBSCRIPTION_PATHS: [&str; 2] = ["/subscribe", "/.netlify/functions/subscribe"];

/// Largest subscription body read; anything above gets a 413.
pub const SUBSCRIPTION_BODY_LIMIT: usize = 16 * 1024;

/// Title of the worksheet holding one row per subscriber.
pub struct WorksheetTitle(pub String);

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let store = build_store(&config)?;

        Self::build_with_store(config, store).await
    }

    /// Same as [`Application::build`] but with an already constructed store.
    pub async fn build_with_store(
        config: Settings,
        store: Arc<dyn SpreadsheetStore>,
    ) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, store, config.get_worksheet_title())?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn build_store(config: &Settings) -> Result<Arc<dyn SpreadsheetStore>, std::io::Error> {
    match config.get_store_kind() {
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store, subscribers are lost on restart");
            Ok(Arc::new(InMemoryStore::default()))
        }
        StoreKind::GoogleSheets => Ok(Arc::new(get_google_sheets_store(&config.google_sheets)?)),
    }
}

pub fn get_google_sheets_store(
    config: &GoogleSheetsSettings,
) -> Result<GoogleSheetsStore, std::io::Error> {
    let http_client = Client::builder()
        .timeout(config.get_timeout())
        .build()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    let authenticator = ServiceAccountAuthenticator::new(
        http_client.clone(),
        config.token_url.clone(),
        config.service_account_email.clone(),
        config.get_private_key(),
    );

    Ok(GoogleSheetsStore::new(
        http_client,
        config.base_url.clone(),
        config.spreadsheet_id.clone(),
        authenticator,
    ))
}

fn subscription_routes(cfg: &mut web::ServiceConfig) {
    for path in SUBSCRIPTION_PATHS {
        cfg.service(
            web::resource(path)
                .app_data(web::PayloadConfig::new(SUBSCRIPTION_BODY_LIMIT))
                .route(web::post().to(handle_create_subscription))
                .route(web::method(Method::OPTIONS).to(handle_subscription_preflight))
                .default_service(web::to(handle_subscription_method_not_allowed))
                .wrap(cors_headers()),
        );
    }
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn SpreadsheetStore>,
    worksheet_title: String,
) -> Result<Server, std::io::Error> {
    let store: web::Data<dyn SpreadsheetStore> = web::Data::from(store);
    let worksheet_title = web::Data::new(WorksheetTitle(worksheet_title));

    let server = HttpServer::new(move || {
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .configure(subscription_routes)
            .app_data(store.clone())
            .app_data(worksheet_title.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
