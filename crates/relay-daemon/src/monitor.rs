//! Log-backed Monitor Sink

use bms_relay::MonitorSink;
use tracing::debug;

/// Logs monitored bytes as hex at debug level
#[derive(Debug, Clone, Copy)]
pub struct TracingMonitor {
    kind: &'static str,
}

impl TracingMonitor {
    pub fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

impl MonitorSink for TracingMonitor {
    fn push(&mut self, data: &[u8]) {
        debug!(target: "bms_relay::monitor", kind = self.kind, len = data.len(), "{}", hex::encode(data));
    }
}
