// src/config.rs

use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct Config {
    // API keys
    pub gemini_api_key: Option<String>,
    pub search_api_key: Option<String>,

    // Server
    #[serde(default = "default_port")]
    pub port: u16,

    // Models
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_followup_model")]
    pub followup_model: String,
    #[serde(default = "default_timeline_model")]
    pub timeline_model: String,

    // Timeline refinement loop
    #[serde(default = "default_refinement_max_iterations")]
    pub refinement_max_iterations: u32,
    #[serde(default = "default_refinement_score_threshold")]
    pub refinement_score_threshold: f32,

    // Tool API base URLs (overridable so tests can point at a local server)
    #[serde(default = "default_search_api_base_url")]
    pub search_api_base_url: String,
    #[serde(default = "default_weather_api_base_url")]
    pub weather_api_base_url: String,
    #[serde(default = "default_crypto_api_base_url")]
    pub crypto_api_base_url: String,
}

impl Config {
    /// Load config from environment variables.
    pub fn load() -> Result<Self, anyhow::Error> {
        envy::from_env::<Self>().map_err(anyhow::Error::from)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            search_api_key: None,
            port: default_port(),
            chat_model: default_chat_model(),
            followup_model: default_followup_model(),
            timeline_model: default_timeline_model(),
            refinement_max_iterations: default_refinement_max_iterations(),
            refinement_score_threshold: default_refinement_score_threshold(),
            search_api_base_url: default_search_api_base_url(),
            weather_api_base_url: default_weather_api_base_url(),
            crypto_api_base_url: default_crypto_api_base_url(),
        }
    }
}

const fn default_port() -> u16 {
    8000
}

fn default_chat_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_followup_model() -> String {
    "gemini-2.5-flash-lite-preview-06-17".to_string()
}

fn default_timeline_model() -> String {
    "gemini-2.5-flash".to_string()
}

const fn default_refinement_max_iterations() -> u32 {
    4
}

fn default_refinement_score_threshold() -> f32 {
    0.8
}

fn default_search_api_base_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_weather_api_base_url() -> String {
    "https://wttr.in".to_string()
}

fn default_crypto_api_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_refinement_bounds() {
        let config = Config::default();
        assert!(config.refinement_max_iterations >= 1);
        assert!(config.refinement_score_threshold > 0.0);
        assert!(config.refinement_score_threshold <= 1.0);
    }

    #[test]
    fn default_models_are_gemini_family() {
        let config = Config::default();
        assert!(config.chat_model.starts_with("gemini"));
        assert!(config.timeline_model.starts_with("gemini"));
    }
}
