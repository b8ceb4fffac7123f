//! Telemetry uplink over the cloud transport.

use std::sync::Arc;

use log::info;

use crate::app::events::TelemetryRecord;
use crate::app::ports::Uplink;
use crate::error::CommsError;
use crate::rpc::codec::encode_telemetry;
use crate::rpc::transport::CloudTransport;

pub struct TransportUplink {
    transport: Arc<dyn CloudTransport>,
}

impl TransportUplink {
    pub fn new(transport: Arc<dyn CloudTransport>) -> Self {
        Self { transport }
    }
}

impl Uplink for TransportUplink {
    fn publish(&self, record: &TelemetryRecord) -> Result<(), CommsError> {
        let message = encode_telemetry(record)?;
        info!("[{}] {}", record.sequence, message.body_str());
        self.transport.send_event(message)
    }
}
