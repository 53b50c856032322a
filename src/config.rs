use config::{Config, ConfigError, File};
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub store: StoreSettings,
    pub google_sheets: GoogleSheetsSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    GoogleSheets,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct StoreSettings {
    pub kind: StoreKind,
    pub worksheet_title: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct GoogleSheetsSettings {
    pub base_url: String,
    pub token_url: String,
    pub service_account_email: String,
    // secrecy protects secret information and prevents them to be exposed (eg: via logs)
    pub private_key: Secret<String>,
    pub spreadsheet_id: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!(
            "{}:{}",
            self.application.get_host(),
            self.application.get_port()
        )
    }

    pub fn get_store_kind(&self) -> StoreKind {
        self.store.kind
    }

    pub fn get_worksheet_title(&self) -> String {
        self.store.worksheet_title.clone()
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }

    pub fn set_store_kind(&mut self, kind: StoreKind) {
        self.store.kind = kind;
    }

    pub fn set_google_sheets_base_url(&mut self, new_base_url: String) {
        self.google_sheets.base_url = new_base_url
    }

    pub fn set_google_token_url(&mut self, new_token_url: String) {
        self.google_sheets.token_url = new_token_url
    }
}

impl ApplicationSettings {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_host(&self) -> String {
        self.host.clone()
    }
}

impl GoogleSheetsSettings {
    /// PEM key with the `\n` escapes of single-line environment values expanded.
    pub fn get_private_key(&self) -> Secret<String> {
        Secret::new(self.private_key.expose_secret().replace("\\n", "\n"))
    }

    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

/// Unprefixed variable names accepted next to the `APP_` ones.
const LEGACY_ENV_OVERRIDES: [(&str, &str); 3] = [
    ("GOOGLE_SERVICE_ACCOUNT_EMAIL", "google_sheets.service_account_email"),
    ("GOOGLE_PRIVATE_KEY", "google_sheets.private_key"),
    ("GOOGLE_SHEET_ID", "google_sheets.spreadsheet_id"),
];

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir().map_err(|err| {
        ConfigError::Message(format!("Failed to determine the current directory: {}", err))
    })?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let enviroment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(enviroment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let mut builder = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_APPLICATION__PORT would set Settings.application.port
        .add_source(config::Environment::with_prefix("app").separator("__"));

    for (variable, key) in LEGACY_ENV_OVERRIDES {
        if let Ok(value) = std::env::var(variable) {
            builder = builder.set_override(key, value)?;
        }
    }

    let settings = builder.build()?;

    tracing::info!("Application environment = {:?}", enviroment);

    // Try to convert the value from the configuration file into a Settings type
    settings.try_deserialize()
}
