use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use bytes::Bytes;
use tokio::sync::RwLock;

use pin_scanner::render_index;

use crate::background::register_demo_pins;
use crate::config::Config;
use crate::logbuf::LogBuffer;
use crate::store::PinStore;
use crate::util::now_ms;

pub(crate) struct AppState {
    pub(crate) pins: RwLock<PinStore>,
    pub(crate) logs: Arc<LogBuffer>,
    pub(crate) index_html: Bytes,
    pub(crate) started_at: Instant,
    pub(crate) config: Config,
}

impl AppState {
    pub(crate) fn new(config: Config, logs: Arc<LogBuffer>) -> Result<Arc<Self>> {
        let cache_bust = now_ms().to_string();
        let index_html = render_index(&config.title, &cache_bust, config.refresh_ms);

        let mut pins = PinStore::new(config.history_limit);
        register_demo_pins(&mut pins)?;

        Ok(Arc::new(Self {
            pins: RwLock::new(pins),
            logs,
            index_html: Bytes::from(index_html),
            started_at: Instant::now(),
            config,
        }))
    }
}
