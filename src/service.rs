//! The remote pin service the dashboard talks to.

use anyhow::Result;

use crate::models::{LogEntry, PinDescriptor, PinValueRequest, PinValueResponse};

/// `GET /all_pins`, `POST /pin_value` and `GET /logs`. Futures need not be
/// `Send`; the dashboard drives them from a single thread.
#[allow(async_fn_in_trait)]
pub trait PinService {
    async fn all_pins(&self) -> Result<Vec<PinDescriptor>>;
    async fn pin_value(&self, request: &PinValueRequest) -> Result<PinValueResponse>;
    /// Server log entries stamped at or after `since` (ms since the epoch).
    async fn logs(&self, since: u64) -> Result<Vec<LogEntry>>;
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::HttpPinService;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::time::Duration;

    use anyhow::{anyhow, Context, Result};
    use url::Url;

    use super::PinService;
    use crate::options::ClientConfig;
    use crate::models::{LogEntry, PinDescriptor, PinValueRequest, PinValueResponse};

    #[derive(Clone)]
    pub struct HttpPinService {
        client: reqwest::Client,
        all_pins_url: Url,
        pin_value_url: Url,
        logs_url: Url,
    }

    impl HttpPinService {
        pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
            let mut base = Url::parse(base_url)
                .with_context(|| format!("Invalid pin server URL {}", base_url))?;
            if !base.path().ends_with('/') {
                let path = format!("{}/", base.path());
                base.set_path(&path);
            }
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build pin service client")?;
            Ok(Self {
                client,
                all_pins_url: base.join("all_pins").context("Invalid all_pins URL")?,
                pin_value_url: base.join("pin_value").context("Invalid pin_value URL")?,
                logs_url: base.join("logs").context("Invalid logs URL")?,
            })
        }

        pub fn from_config(config: &ClientConfig) -> Result<Self> {
            Self::new(&config.base_url, config.request_timeout)
        }

        pub fn all_pins_url(&self) -> &Url {
            &self.all_pins_url
        }
    }

    impl PinService for HttpPinService {
        async fn all_pins(&self) -> Result<Vec<PinDescriptor>> {
            let response = self
                .client
                .get(self.all_pins_url.clone())
                .send()
                .await
                .context("all_pins request failed")?;
            if !response.status().is_success() {
                return Err(anyhow!("all_pins failed ({})", response.status()));
            }
            response.json().await.context("Invalid all_pins response")
        }

        async fn pin_value(&self, request: &PinValueRequest) -> Result<PinValueResponse> {
            let response = self
                .client
                .post(self.pin_value_url.clone())
                .json(request)
                .send()
                .await
                .context("pin_value request failed")?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(anyhow!("pin_value failed ({}): {}", status, message));
            }
            response.json().await.context("Invalid pin_value response")
        }

        async fn logs(&self, since: u64) -> Result<Vec<LogEntry>> {
            let response = self
                .client
                .get(self.logs_url.clone())
                .query(&[("timestamp", since)])
                .send()
                .await
                .context("logs request failed")?;
            if !response.status().is_success() {
                return Err(anyhow!("logs failed ({})", response.status()));
            }
            response.json().await.context("Invalid logs response")
        }
    }

}
