// Publisher trait for delivering stream messages to a line's subscriber group
use async_trait::async_trait;

use crate::domain::update::StreamMessage;

/// Group key for one line's subscriber group
pub fn line_group(line_id: i64) -> String {
    format!("line-{}", line_id)
}

/// Fire-and-forget delivery to all current subscribers of a line.
///
/// Implementations must not block on slow subscribers; a subscriber that
/// disconnects mid-publish simply misses the message. No retry, no queue.
#[async_trait]
pub trait UpdatePublisher: Send + Sync {
    async fn publish(&self, line_id: i64, message: StreamMessage) -> anyhow::Result<()>;
}
