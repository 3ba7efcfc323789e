use serde::Deserialize;
use std::env;

use crate::services::mastery_service::MasteryPolicy;
use crate::services::selection_service::SelectionPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub log_format: LogFormat,
    pub mastery: MasteryPolicy,
    pub selection: SelectionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            log_format: LogFormat::Text,
            mastery: MasteryPolicy::default(),
            selection: SelectionPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, then local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + ENV overrides (APP__SECTION__KEY)
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let log_format = match settings.get_string("log.format") {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            Ok(value) if value.eq_ignore_ascii_case("text") => LogFormat::Text,
            Ok(other) => {
                return Err(config::ConfigError::Message(format!(
                    "unsupported log.format {}",
                    other
                )))
            }
            Err(_) => defaults.log_format,
        };

        let mastery = MasteryPolicy {
            initial: float_or(&settings, "mastery.initial", defaults.mastery.initial),
            correct_delta: float_or(
                &settings,
                "mastery.correct_delta",
                defaults.mastery.correct_delta,
            ),
            incorrect_delta: float_or(
                &settings,
                "mastery.incorrect_delta",
                defaults.mastery.incorrect_delta,
            ),
            weak_threshold: float_or(
                &settings,
                "mastery.weak_threshold",
                defaults.mastery.weak_threshold,
            ),
        };

        let selection = SelectionPolicy {
            weight_offset: float_or(
                &settings,
                "selection.weight_offset",
                defaults.selection.weight_offset,
            ),
            weight_floor: float_or(
                &settings,
                "selection.weight_floor",
                defaults.selection.weight_floor,
            ),
            default_batch_size: usize_or(
                &settings,
                "selection.default_batch_size",
                defaults.selection.default_batch_size,
            ),
            max_batch_size: usize_or(
                &settings,
                "selection.max_batch_size",
                defaults.selection.max_batch_size,
            ),
            default_exclude_recent: usize_or(
                &settings,
                "selection.default_exclude_recent",
                defaults.selection.default_exclude_recent,
            ),
            cold_start_max_difficulty: settings
                .get_int("selection.cold_start_max_difficulty")
                .ok()
                .and_then(|v| u8::try_from(v).ok())
                .unwrap_or(defaults.selection.cold_start_max_difficulty),
            cold_start_penalty: float_or(
                &settings,
                "selection.cold_start_penalty",
                defaults.selection.cold_start_penalty,
            ),
            seed: settings
                .get_int("selection.seed")
                .ok()
                .and_then(|v| u64::try_from(v).ok()),
        };

        mastery.check().map_err(config::ConfigError::Message)?;
        selection.check().map_err(config::ConfigError::Message)?;

        tracing::debug!(?mastery, ?selection, "engine policy resolved");

        Ok(Config {
            bind_addr,
            log_format,
            mastery,
            selection,
        })
    }
}

fn float_or(settings: &config::Config, key: &str, default: f64) -> f64 {
    settings.get_float(key).unwrap_or(default)
}

fn usize_or(settings: &config::Config, key: &str, default: usize) -> usize {
    settings
        .get_int(key)
        .ok()
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}
