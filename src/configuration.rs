use config::{Config, ConfigError, Environment as ConfigEnvironment};
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;

/// Runtime settings, sourced from the process environment (a `.env` file is
/// loaded by `main` before this runs).
///
/// Required: `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `DEEPSEEK_API_KEY`.
/// Optional: `SUPABASE_SERVICE_ROLE_KEY` (server-side operations fall back to
/// the anon key without it), `DEEPSEEK_API_URL`, `DEEPSEEK_MODEL`, `HOST`,
/// `PORT`.
#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub supabase_url: String,
    pub supabase_anon_key: Secret<String>,
    pub supabase_service_role_key: Option<Secret<String>>,
    pub deepseek_api_key: Secret<String>,
    #[serde(default = "default_deepseek_api_url")]
    pub deepseek_api_url: String,
    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,
}

impl Settings {
    /// Key used for server-side persistence calls: the service-role key when
    /// configured, otherwise the anon key. An empty value counts as unset,
    /// which is what a blank line in a `.env` file produces.
    pub fn supabase_server_key(&self) -> &Secret<String> {
        match &self.supabase_service_role_key {
            Some(key) if !key.expose_secret().is_empty() => key,
            _ => &self.supabase_anon_key,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_deepseek_api_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .set_default("port", 8000)?
        .add_source(ConfigEnvironment::default())
        .build()?;

    settings.try_deserialize::<Settings>()
}
