use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: SecretString,
    pub openweathermap_api_key: Option<SecretString>,
    pub amap_api_key: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(supabase_url: String, supabase_anon_key: String) -> Self {
        Self {
            supabase_url,
            supabase_anon_key,
            supabase_service_key: SecretString::default(),
            openweathermap_api_key: None,
            amap_api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            "https://qnwmhygv.supabase.co".to_string(),
            "anon-key".to_string(),
        );
        assert_eq!(args.supabase_url, "https://qnwmhygv.supabase.co");
        assert_eq!(args.supabase_anon_key, "anon-key");
        assert_eq!(args.supabase_service_key.expose_secret(), "");
        assert!(args.openweathermap_api_key.is_none());
        assert!(args.amap_api_key.is_none());
    }
}
