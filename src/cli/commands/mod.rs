use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("littlejoys")
        .about("Social journal API gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("LITTLEJOYS_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("supabase-url")
                .long("supabase-url")
                .help("Supabase project URL, example: https://<project-ref>.supabase.co")
                .env("LITTLEJOYS_SUPABASE_URL")
                .required(true),
        )
        .arg(
            Arg::new("supabase-anon-key")
                .long("supabase-anon-key")
                .help("Supabase anonymous API key used for auth endpoints")
                .env("LITTLEJOYS_SUPABASE_ANON_KEY")
                .required(true),
        )
        .arg(
            Arg::new("supabase-service-key")
                .long("supabase-service-key")
                .help("Supabase service role key used for row access and counts")
                .env("LITTLEJOYS_SUPABASE_SERVICE_KEY")
                .required(true),
        )
        .arg(
            Arg::new("openweathermap-api-key")
                .long("openweathermap-api-key")
                .help("OpenWeatherMap API key for the weather proxy")
                .env("OPENWEATHERMAP_API_KEY"),
        )
        .arg(
            Arg::new("amap-api-key")
                .long("amap-api-key")
                .help("AMap API key for the reverse geocoding proxy")
                .env("AMAP_API_KEY"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("LITTLEJOYS_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "littlejoys");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Social journal API gateway"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_check_port_and_keys() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "littlejoys",
            "--port",
            "8080",
            "--supabase-url",
            "https://qnwmhygv.supabase.co",
            "--supabase-anon-key",
            "anon-key",
            "--supabase-service-key",
            "service-key",
        ]);

        assert_eq!(matches.get_one::<u16>("port").map(|s| *s), Some(8080));
        assert_eq!(
            matches
                .get_one::<String>("supabase-url")
                .map(|s| s.to_string()),
            Some("https://qnwmhygv.supabase.co".to_string())
        );
        assert_eq!(
            matches
                .get_one::<String>("supabase-anon-key")
                .map(|s| s.to_string()),
            Some("anon-key".to_string())
        );
        assert_eq!(
            matches
                .get_one::<String>("supabase-service-key")
                .map(|s| s.to_string()),
            Some("service-key".to_string())
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("LITTLEJOYS_SUPABASE_URL", Some("https://qnwmhygv.supabase.co")),
                ("LITTLEJOYS_SUPABASE_ANON_KEY", Some("anon-key")),
                ("LITTLEJOYS_SUPABASE_SERVICE_KEY", Some("service-key")),
                ("LITTLEJOYS_PORT", Some("443")),
                ("LITTLEJOYS_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["littlejoys"]);
                assert_eq!(matches.get_one::<u16>("port").map(|s| *s), Some(443));
                assert_eq!(
                    matches
                        .get_one::<String>("supabase-url")
                        .map(|s| s.to_string()),
                    Some("https://qnwmhygv.supabase.co".to_string())
                );
                assert_eq!(matches.get_one::<u8>("verbosity").map(|s| *s), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("LITTLEJOYS_LOG_LEVEL", Some(level)),
                    ("LITTLEJOYS_SUPABASE_URL", Some("https://qnwmhygv.supabase.co")),
                    ("LITTLEJOYS_SUPABASE_ANON_KEY", Some("anon-key")),
                    ("LITTLEJOYS_SUPABASE_SERVICE_KEY", Some("service-key")),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["littlejoys"]);
                    assert_eq!(
                        matches.get_one::<u8>("verbosity").map(|s| *s),
                        Some(index as u8)
                    );
                },
            );
        }
    }
}
