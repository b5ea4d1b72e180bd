//! Shared state handed to every API handler.

use crate::cli::globals::GlobalArgs;
use crate::supabase::{auth::AuthClient, rest::RestClient};
use anyhow::Result;
use reqwest::Client;
use secrecy::SecretString;
use std::time::Duration;

/// Timeout for the third-party weather/geocoding providers.
const PROXY_TIMEOUT: Duration = Duration::from_secs(15);

pub struct AppState {
    pub auth: AuthClient,
    pub rest: RestClient,
    pub http: Client,
    pub openweather_key: Option<SecretString>,
    pub amap_key: Option<SecretString>,
}

impl AppState {
    /// Build the state from CLI/environment configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the HTTP clients cannot be constructed.
    pub fn from_globals(globals: &GlobalArgs) -> Result<Self> {
        Ok(Self {
            auth: AuthClient::new(&globals.supabase_url, &globals.supabase_anon_key)?,
            rest: RestClient::new(&globals.supabase_url, globals.supabase_service_key.clone())?,
            http: Client::builder()
                .user_agent(crate::APP_USER_AGENT)
                .timeout(PROXY_TIMEOUT)
                .build()?,
            openweather_key: globals.openweathermap_api_key.clone(),
            amap_key: globals.amap_api_key.clone(),
        })
    }
}
