use crate::models::stages::StageKind;
use crate::utils::{env_default, env_optional, env_var};
use once_cell::sync::Lazy;

const DATABASE_URL_VAR: &str = "DATABASE_URL";
const SWEEP_TICK_SECS_VAR: &str = "SWEEP_TICK_SECS";
const LOCK_WINDOW_MINUTES_VAR: &str = "LOCK_WINDOW_MINUTES";
const GATED_STAGE_VAR: &str = "GATED_STAGE";
const ADMIN_USER_IDS_VAR: &str = "ADMIN_USER_IDS";
const RESET_CONFIRMATION_TOKEN_VAR: &str = "RESET_CONFIRMATION_TOKEN";

pub const LOG4RS_CONF_FILE_VAR: &str = "LOG4RS_CONFIG_FILE";

pub static CONFIG: Lazy<Config> = Lazy::new(|| Config::new_from_env());

pub struct Config {
    pub database_url: String,
    pub log4rs_config_file: String,

    pub sweep_tick_secs: u64,
    /// the sweep locks existing predictions this many minutes before kickoff. It only
    /// freezes rows that already exist: new predictions are still accepted until kickoff.
    pub lock_window_minutes: i64,

    pub gated_stage: Option<StageKind>,

    pub admin_user_ids: Vec<String>,
    /// the bulk reset refuses to run if this is unset
    pub reset_confirmation_token: Option<String>,
}

fn parse_gated_stage(raw: Option<String>) -> Option<StageKind> {
    let slug = raw?;
    match StageKind::from_slug(slug.trim()) {
        Some(k) => Some(k),
        None => {
            panic!("Failed to parse value of {GATED_STAGE_VAR}: unknown stage {slug}")
        }
    }
}

fn parse_id_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

impl Config {
    fn new_from_env() -> Self {
        Self {
            database_url: env_var(DATABASE_URL_VAR),
            log4rs_config_file: env_default(LOG4RS_CONF_FILE_VAR, "log4rs.yml".to_string()),
            sweep_tick_secs: env_default(SWEEP_TICK_SECS_VAR, 60),
            lock_window_minutes: env_default(LOCK_WINDOW_MINUTES_VAR, 0),
            gated_stage: parse_gated_stage(env_optional(GATED_STAGE_VAR)),
            admin_user_ids: parse_id_list(env_optional(ADMIN_USER_IDS_VAR)),
            reset_confirmation_token: env_optional(RESET_CONFIRMATION_TOKEN_VAR),
        }
    }
}
