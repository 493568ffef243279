//! Metering sink integration
//!
//! Controller values are pushed to a Volkszaehler middleware as
//! `POST {base}/data/{channel}.json?operation=add&value={v}`. The HTTP sink is
//! only available with the `metering` feature; otherwise a no-op sink is used.

use std::sync::Arc;

use crate::config::MeteringConfig;
use crate::error::Result;
use crate::logging::get_logger;

/// Receiver of metered values
#[async_trait::async_trait]
pub trait MeteringSink: Send + Sync {
    async fn report(&self, channel_id: &str, value: &str) -> Result<()>;
}

/// Sink that discards every value
#[derive(Debug, Default, Clone)]
pub struct NullSink;

#[async_trait::async_trait]
impl MeteringSink for NullSink {
    async fn report(&self, _channel_id: &str, _value: &str) -> Result<()> {
        Ok(())
    }
}

/// Build the configured sink
pub fn build_sink(config: &MeteringConfig) -> Result<Arc<dyn MeteringSink>> {
    let logger = get_logger("metering");
    if !config.enabled {
        logger.info("Metering disabled");
        return Ok(Arc::new(NullSink));
    }
    http_sink(config)
}

#[cfg(feature = "metering")]
fn http_sink(config: &MeteringConfig) -> Result<Arc<dyn MeteringSink>> {
    get_logger("metering").info(&format!("Metering to {}", config.base_url));
    Ok(Arc::new(VolkszaehlerSink::new(config)?))
}

#[cfg(not(feature = "metering"))]
fn http_sink(_config: &MeteringConfig) -> Result<Arc<dyn MeteringSink>> {
    get_logger("metering")
        .warn("Metering enabled but built without the metering feature; values are discarded");
    Ok(Arc::new(NullSink))
}

/// Request URL for one value on a channel
pub fn channel_url(base_url: &str, channel_id: &str, value: &str) -> String {
    format!(
        "{}/data/{}.json?operation=add&value={}",
        base_url.trim_end_matches('/'),
        channel_id,
        value
    )
}

/// Volkszaehler middleware client
#[cfg(feature = "metering")]
pub struct VolkszaehlerSink {
    client: reqwest::Client,
    base_url: String,
    logger: crate::logging::StructuredLogger,
}

#[cfg(feature = "metering")]
impl VolkszaehlerSink {
    pub fn new(config: &MeteringConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            logger: get_logger("metering"),
        })
    }
}

#[cfg(feature = "metering")]
#[async_trait::async_trait]
impl MeteringSink for VolkszaehlerSink {
    async fn report(&self, channel_id: &str, value: &str) -> Result<()> {
        let url = channel_url(&self.base_url, channel_id, value);
        let resp = self.client.post(&url).send().await?;
        if !resp.status().is_success() {
            return Err(crate::error::HeliosError::metering(format!(
                "Middleware returned {} for channel {}",
                resp.status(),
                channel_id
            )));
        }
        self.logger
            .debug(&format!("Metered {} on channel {}", value, channel_id));
        Ok(())
    }
}
