//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::events::model::DEFAULT_EXPERIMENT_VARIANT;
use crate::tiering::TieringPolicy;

/// Default outbound WhatsApp destination.
pub const DEFAULT_WHATSAPP_NUMBER: &str = "56912345678";

/// Scroll ratio at which `view_content` fires.
pub const SCROLL_THRESHOLD: f64 = 0.5;

/// Dwell time after which `view_content` fires.
pub const DEFAULT_DWELL: Duration = Duration::from_secs(15);

/// The service a deployment qualifies leads for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Aesthetic,
    Implants,
}

impl Default for ServiceType {
    fn default() -> Self {
        Self::Implants
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aesthetic => write!(f, "aesthetic"),
            Self::Implants => write!(f, "implants"),
        }
    }
}

impl std::str::FromStr for ServiceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "aesthetic" => Ok(Self::Aesthetic),
            "implants" => Ok(Self::Implants),
            other => Err(ConfigError::UnknownService(other.to_string())),
        }
    }
}

impl ServiceType {
    /// Static per-service settings.
    pub fn config(self) -> ServiceConfig {
        match self {
            Self::Aesthetic => ServiceConfig {
                service: self,
                display_name: "Diseño de Sonrisa Digital Personalizada",
                policy: TieringPolicy::Aesthetic,
                result_message: "Eres candidato(a) para la evaluación. Continúa por WhatsApp.",
            },
            Self::Implants => ServiceConfig {
                service: self,
                display_name: "Implantes y Rehabilitación Oral",
                policy: TieringPolicy::Implants,
                result_message: "Tu caso parece candidato(a) para evaluación funcional. \
                    En WhatsApp coordinamos la evaluación y resolvemos dudas de etapas/tiempos.",
            },
        }
    }
}

/// Display name, tiering policy, and qualified-result copy for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub service: ServiceType,
    pub display_name: &'static str,
    pub policy: TieringPolicy,
    pub result_message: &'static str,
}

/// Funnel configuration.
#[derive(Debug, Clone)]
pub struct FunnelConfig {
    /// Active service; fixes the tiering policy for the deployment.
    pub service: ServiceType,
    /// Outbound deep-link destination.
    pub whatsapp_number: String,
    /// Experiment variant tag attached to every event.
    pub experiment_variant: String,
    /// Dwell time before `view_content` fires.
    pub dwell: Duration,
    /// Durable store file used by the binary.
    pub store_path: PathBuf,
    /// Raw query string carrying UTM parameters.
    pub utm_query: String,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            service: ServiceType::default(),
            whatsapp_number: DEFAULT_WHATSAPP_NUMBER.to_string(),
            experiment_variant: DEFAULT_EXPERIMENT_VARIANT.to_string(),
            dwell: DEFAULT_DWELL,
            store_path: PathBuf::from("./data/lead-funnel.db"),
            utm_query: String::new(),
        }
    }
}

impl FunnelConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let service = match lookup("FUNNEL_SERVICE_TYPE") {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => defaults.service,
        };

        let dwell = match lookup("FUNNEL_DWELL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::InvalidValue {
                    key: "FUNNEL_DWELL_SECS".to_string(),
                    message: e.to_string(),
                })?,
            None => defaults.dwell,
        };

        Ok(Self {
            service,
            whatsapp_number: lookup("FUNNEL_WHATSAPP_NUMBER").unwrap_or(defaults.whatsapp_number),
            experiment_variant: lookup("FUNNEL_EXPERIMENT_VARIANT")
                .unwrap_or(defaults.experiment_variant),
            dwell,
            store_path: lookup("FUNNEL_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            utm_query: lookup("FUNNEL_UTM_QUERY").unwrap_or_default(),
        })
    }

    pub fn service_config(&self) -> ServiceConfig {
        self.service.config()
    }
}
