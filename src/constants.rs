pub(crate) const DEFAULT_PORT: u16 = 8080;
pub(crate) const DEFAULT_STATIC_DIR: &str = "static";
pub(crate) const DEFAULT_TITLE: &str = "Pin Scanner";
pub(crate) const DEFAULT_DEMO_TICK_MS: u64 = 5_000;
pub(crate) const DEFAULT_LOG_BUFFER_LIMIT: usize = 1_000;
pub(crate) const DEFAULT_HISTORY_LIMIT: usize = 100;

pub(crate) const DEMO_NAMESPACE: &str = "demo";
pub(crate) const DEMO_COUNTER_MODULUS: f64 = 10.0;
