//! Hand-off to the platform maps app for turn-by-turn directions.

use futures_util::future::BoxFuture;
use reqwest::Url;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::shared::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    #[error("No app can open {0}")]
    Unsupported(String),
    #[error("Failed to open url: {0}")]
    Failed(String),
}

/// Host capability that opens a url in another app.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: String) -> BoxFuture<'static, Result<(), OpenError>>;
}

/// Maps deep link for navigating to `destination`.
pub fn directions_url(platform: Platform, destination: Coordinate, label: &str) -> Option<Url> {
    let target = format!("{},{}", destination.latitude, destination.longitude);
    let url = match platform {
        Platform::Ios => {
            Url::parse_with_params("maps://", [("daddr", target.as_str()), ("q", label)])
        }
        Platform::Android => Url::parse_with_params(&format!("geo:{target}"), [("q", label)]),
    };
    match url {
        Ok(url) => Some(url),
        Err(err) => {
            error!("Could not build directions url for {label}: {err}");
            None
        }
    }
}

/// Opens directions without waiting for the result; failures are only logged.
pub fn open_directions(
    opener: &dyn UrlOpener,
    platform: Platform,
    destination: Coordinate,
    label: &str,
) -> Option<JoinHandle<()>> {
    let url = directions_url(platform, destination, label)?;
    info!("Opening directions to {label}");
    let request = opener.open(url.to_string());
    Some(tokio::spawn(async move {
        if let Err(err) = request.await {
            error!("Error opening maps: {err}");
        }
    }))
}
