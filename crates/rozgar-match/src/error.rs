use crate::config::ConfigError;
use crate::matching::{
    LocalizationError, RegistryError, SchedulerError, StoreError, SweepError,
};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Registry(RegistryError),
    Store(StoreError),
    Localization(LocalizationError),
    Sweep(SweepError),
    Scheduler(SchedulerError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Registry(err) => write!(f, "registry error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Localization(err) => write!(f, "template error: {}", err),
            AppError::Sweep(err) => write!(f, "sweep error: {}", err),
            AppError::Scheduler(err) => write!(f, "scheduler error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Registry(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Localization(err) => Some(err),
            AppError::Sweep(err) => Some(err),
            AppError::Scheduler(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Scheduler(SchedulerError::Busy) => StatusCode::CONFLICT,
            AppError::Store(StoreError::DuplicateKey { .. }) => StatusCode::CONFLICT,
            AppError::Registry(_) | AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Localization(_)
            | AppError::Sweep(_)
            | AppError::Scheduler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

macro_rules! app_error_from {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for AppError {
                fn from(value: $source) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

app_error_from!(
    ConfigError => Config,
    TelemetryError => Telemetry,
    std::io::Error => Io,
    axum::Error => Server,
    RegistryError => Registry,
    StoreError => Store,
    LocalizationError => Localization,
    SweepError => Sweep,
    SchedulerError => Scheduler,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_scheduler_maps_to_conflict() {
        let response = AppError::from(SchedulerError::Busy).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unavailable_store_maps_to_service_unavailable() {
        let error = AppError::from(StoreError::Unavailable("disk full".to_string()));
        assert_eq!(error.to_string(), "store error: store unavailable: disk full");
        assert_eq!(error.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
