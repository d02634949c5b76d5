//! Batch-ready notification delivery
//!
//! There is no mail transport; messages are written to the log.

use async_trait::async_trait;
use tracing::{debug, info};

use core_kernel::{DomainPort, PortError};
use domain_batching::{BatchNotification, NotificationSender};

/// Sends batch-ready notifications as structured log records
#[derive(Debug, Clone)]
pub struct TracingNotificationSender {
    enabled: bool,
}

impl TracingNotificationSender {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl DomainPort for TracingNotificationSender {}

#[async_trait]
impl NotificationSender for TracingNotificationSender {
    async fn send_batch_ready(
        &self,
        notification: &BatchNotification,
        recipient: &str,
    ) -> Result<(), PortError> {
        if !self.enabled {
            debug!(batch_id = %notification.batch_id, "Notifications disabled, dropping message");
            return Ok(());
        }
        info!(
            recipient = %recipient,
            batch_id = %notification.batch_id,
            insurer_id = %notification.insurer_id,
            subject = %notification.subject,
            body = %notification.body,
            "Batch notification sent"
        );
        Ok(())
    }
}
