use infrastructure::meter;

use crate::core::Notifier;
use crate::core::time::{DateTime, Duration};

use super::{Alert, ControlState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Suppressed,
    Failed,
}

pub struct NotificationGateway<N: Notifier> {
    notifier: N,
    cooldown: Duration,
}

impl<N: Notifier> NotificationGateway<N> {
    pub fn new(notifier: N, cooldown: Duration) -> Self {
        Self { notifier, cooldown }
    }

    //Best effort. Failures are logged and never reach the caller.
    #[tracing::instrument(skip_all, fields(alert = %alert.kind()))]
    pub async fn notify(&self, alert: &Alert, now: DateTime, state: &mut ControlState) -> Delivery {
        let kind = alert.kind();
        let kind_label = kind.to_string();

        if self.is_suppressed(alert, now, state) {
            tracing::info!("Alert {} suppressed by cooldown of {}", kind, self.cooldown);
            meter::increment("alerts", &[("kind", &kind_label), ("outcome", "suppressed")]);
            return Delivery::Suppressed;
        }

        match self.notifier.send(&alert.to_string()).await {
            Ok(()) => {
                tracing::info!("Alert delivered: {}", alert);
                meter::increment("alerts", &[("kind", &kind_label), ("outcome", "delivered")]);

                if kind.is_transition() {
                    state.last_transition.insert(kind, (alert.key(), now));
                }
                if !kind.is_lifecycle() {
                    state.last_alert_at = Some(now);
                }

                Delivery::Delivered
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error delivering alert {}", kind);
                meter::increment("alerts", &[("kind", &kind_label), ("outcome", "failed")]);
                Delivery::Failed
            }
        }
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    //A transition is only held back by the same state change announced last,
    //all other alerts share the global cooldown
    fn is_suppressed(&self, alert: &Alert, now: DateTime, state: &ControlState) -> bool {
        let kind = alert.kind();
        if kind.is_lifecycle() {
            return false;
        }

        let last_delivery = if kind.is_transition() {
            match state.last_transition.get(&kind) {
                Some((key, at)) if *key == alert.key() => Some(*at),
                _ => None,
            }
        } else {
            state.last_alert_at
        };

        last_delivery.is_some_and(|at| now.elapsed_since(at) < self.cooldown)
    }
}
