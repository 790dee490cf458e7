// In-process group broadcaster over tokio broadcast channels
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::application::publisher::{line_group, UpdatePublisher};
use crate::domain::update::StreamMessage;

// A subscriber that falls this far behind skips intermediate updates; it
// catches up with the next message it receives
const GROUP_CAPACITY: usize = 64;

/// One broadcast channel per line group, created lazily on first use.
/// Publishing to a group with no subscribers is a successful no-op.
pub struct GroupBroadcaster {
    groups: Mutex<HashMap<String, broadcast::Sender<StreamMessage>>>,
}

impl GroupBroadcaster {
    pub fn new() -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// Join a line's subscriber group
    pub fn subscribe(&self, line_id: i64) -> broadcast::Receiver<StreamMessage> {
        self.sender_for(&line_group(line_id)).subscribe()
    }

    pub fn subscriber_count(&self, line_id: i64) -> usize {
        let groups = self.groups.lock().unwrap();
        groups
            .get(&line_group(line_id))
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    fn sender_for(&self, group: &str) -> broadcast::Sender<StreamMessage> {
        let mut groups = self.groups.lock().unwrap();
        groups
            .entry(group.to_string())
            .or_insert_with(|| broadcast::channel(GROUP_CAPACITY).0)
            .clone()
    }
}

impl Default for GroupBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdatePublisher for GroupBroadcaster {
    async fn publish(&self, line_id: i64, message: StreamMessage) -> anyhow::Result<()> {
        let sender = self.sender_for(&line_group(line_id));
        tracing::trace!(
            "Publishing message stamped {} to {}",
            message.timestamp(),
            line_group(line_id)
        );
        // A send error only means there is no subscriber right now
        let _ = sender.send(message);
        Ok(())
    }
}
