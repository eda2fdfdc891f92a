use crate::core::Notifier;
use crate::error::NotificationError;

//Used when no chat channel is configured
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotificationError> {
        tracing::info!(target: "powerwatch::notification", "{}", text);
        Ok(())
    }
}
