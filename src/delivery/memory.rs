use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::Deliverer;
use crate::error::{AppResult, DeliveryError};

/// Recording deliverer for tests. Captures every message and can be told to
/// reject specific recipients.
#[derive(Default)]
pub struct RecordingDeliverer {
    sent: Mutex<Vec<(i64, String)>>,
    rejected: Mutex<HashSet<i64>>,
}

impl RecordingDeliverer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_for(&self, user_id: i64) {
        self.rejected.lock().insert(user_id);
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, user_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Deliverer for RecordingDeliverer {
    async fn deliver(&self, user_id: i64, text: &str) -> AppResult<()> {
        if self.rejected.lock().contains(&user_id) {
            return Err(DeliveryError::Rejected {
                status: 403,
                description: "blocked by recipient".to_string(),
            }
            .into());
        }
        self.sent.lock().push((user_id, text.to_string()));
        Ok(())
    }
}
