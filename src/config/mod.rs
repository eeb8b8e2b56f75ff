use std::env;
use std::path::PathBuf;

use crate::narrative::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

const DEFAULT_MODEL_FILE: &str = "universal_churn_model.json";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_EMAIL_FROM: &str = "ChurnLens <reports@churnlens.local>";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    // Model artifact
    pub service_root: PathBuf,
    pub model_path: PathBuf,
    pub preload_model: bool,

    // Uploads
    pub max_upload_bytes: usize,

    // LLM narrative backend; fallbacks are served without a key
    pub genai_api_key: Option<String>,
    pub genai_model: String,
    pub genai_base_url: String,

    // Report email delivery
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_starttls: bool,
    pub email_from: String,
    pub email_outbox_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let service_root = env::var("SERVICE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()?,

            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_FILE)),
            service_root,
            preload_model: env::var("PRELOAD_MODEL")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),

            genai_api_key: env::var("GENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            genai_model: env::var("GENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            genai_base_url: env::var("GENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),

            smtp_host: env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".into())
                .parse()?,
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            smtp_starttls: env::var("SMTP_STARTTLS")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            email_from: env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_EMAIL_FROM.into()),
            email_outbox_dir: env::var("EMAIL_OUTBOX_DIR").ok().map(PathBuf::from),
        })
    }

    /// Artifact location; relative paths resolve against the service root.
    pub fn resolved_model_path(&self) -> PathBuf {
        if self.model_path.is_absolute() {
            self.model_path.clone()
        } else {
            self.service_root.join(&self.model_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &str, model: &str) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            service_root: PathBuf::from(root),
            model_path: PathBuf::from(model),
            preload_model: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            genai_api_key: None,
            genai_model: DEFAULT_MODEL.into(),
            genai_base_url: DEFAULT_BASE_URL.into(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_starttls: true,
            email_from: DEFAULT_EMAIL_FROM.into(),
            email_outbox_dir: None,
        }
    }

    #[test]
    fn test_relative_model_path_joins_root() {
        let c = config("/srv/churn", "universal_churn_model.json");
        assert_eq!(
            c.resolved_model_path(),
            PathBuf::from("/srv/churn/universal_churn_model.json")
        );
    }

    #[test]
    fn test_absolute_model_path_kept() {
        let c = config("/srv/churn", "/models/m.json");
        assert_eq!(c.resolved_model_path(), PathBuf::from("/models/m.json"));
    }

    #[test]
    fn test_no_email_transport_means_no_mailer() {
        let c = config("/srv/churn", "m.json");
        assert!(crate::delivery::ReportMailer::from_config(&c).unwrap().is_none());
    }

    #[test]
    fn test_outbox_dir_selects_outbox_mailer() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = config("/srv/churn", "m.json");
        c.email_outbox_dir = Some(dir.path().join("outbox"));

        let mailer = crate::delivery::ReportMailer::from_config(&c).unwrap().unwrap();
        assert_eq!(mailer.describe(), "outbox");
        assert!(dir.path().join("outbox").is_dir());
    }
}
