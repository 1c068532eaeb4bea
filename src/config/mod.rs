use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone)]
pub struct AssessConfig {
    pub common: CommonConfig,
    pub gemini: GeminiSettings,
    pub classifier: ClassifierSettings,
    pub static_files: StaticSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommonConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    5001
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiSettings {
    pub api_key: String,
    /// Model for recommendation text (e.g., gemini-1.5-flash)
    pub text_model: String,
    /// Model for the low-confidence vision fallback
    pub vision_model: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifierSettings {
    /// Path to the exported ONNX crop classifier.
    pub model_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticSettings {
    /// Directory the heatmap overlay is written to and served from.
    pub dir: String,
}

impl AssessConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let common = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize::<CommonConfig>()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(AssessConfig {
            common,
            gemini: GeminiSettings {
                // Empty in dev means the Gemini-backed endpoints degrade
                // instead of the process refusing to start.
                api_key: get_env("GEMINI_API_KEY", Some(""), is_prod)?,
                text_model: get_env("GEMINI_TEXT_MODEL", Some("gemini-1.5-flash"), is_prod)?,
                vision_model: get_env("GEMINI_VISION_MODEL", Some("gemini-1.5-flash"), is_prod)?,
            },
            classifier: ClassifierSettings {
                model_path: get_env(
                    "CROP_MODEL_PATH",
                    Some("models/crop_classifier.onnx"),
                    is_prod,
                )?,
            },
            static_files: StaticSettings {
                dir: get_env("STATIC_DIR", Some("static"), is_prod)?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
