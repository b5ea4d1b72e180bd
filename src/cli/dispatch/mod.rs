use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{name}"))
    };

    let globals = GlobalArgs {
        supabase_url: required("supabase-url")?,
        supabase_anon_key: required("supabase-anon-key")?,
        supabase_service_key: SecretString::from(required("supabase-service-key")?),
        openweathermap_api_key: matches
            .get_one::<String>("openweathermap-api-key")
            .map(|s| SecretString::from(s.to_string())),
        amap_api_key: matches
            .get_one::<String>("amap-api-key")
            .map(|s| SecretString::from(s.to_string())),
    };

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        globals,
    })
}
