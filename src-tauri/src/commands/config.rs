use crate::config::{self, AppConfig};
use crate::types::error::SparkError;

#[tauri::command]
pub fn get_app_config() -> AppConfig {
    config::get_config()
}

#[tauri::command]
pub fn save_app_config(config: AppConfig) -> Result<(), SparkError> {
    config::save_config(&config)
}
