use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::prompts::PromptId;

/// Emitted after the store reconciles local state with a confirmed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptChange {
    pub change_type: ChangeType,
    /// `None` for a full reload.
    pub prompt_id: Option<PromptId>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl PromptChange {
    pub fn new(change_type: ChangeType, prompt_id: Option<PromptId>) -> Self {
        Self {
            change_type,
            prompt_id,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Reloaded,
    Created,
    Updated,
    Deleted,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Reloaded => "reloaded",
            ChangeType::Created => "created",
            ChangeType::Updated => "updated",
            ChangeType::Deleted => "deleted",
        }
    }
}

/// Turn a broadcast receiver into a stream that skips ahead when lagging
/// and ends once the sender is gone.
pub fn into_stream(mut rx: broadcast::Receiver<PromptChange>) -> impl Stream<Item = PromptChange> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => yield event,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "prompt change subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn change_type_serializes_snake_case() {
        let event = PromptChange::new(ChangeType::Created, Some(3));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["change_type"], "created");
        assert_eq!(json["prompt_id"], 3);
    }

    #[tokio::test]
    async fn stream_ends_when_sender_dropped() {
        let (tx, rx) = broadcast::channel(4);
        tx.send(PromptChange::new(ChangeType::Reloaded, None)).unwrap();
        drop(tx);

        let events: Vec<_> = into_stream(rx).collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change_type, ChangeType::Reloaded);
    }

    #[tokio::test]
    async fn stream_skips_lagged_events() {
        let (tx, rx) = broadcast::channel(2);
        for id in 1..=4 {
            tx.send(PromptChange::new(ChangeType::Deleted, Some(id))).unwrap();
        }
        drop(tx);

        let ids: Vec<_> = into_stream(rx)
            .map(|e| e.prompt_id.unwrap())
            .collect()
            .await;
        assert_eq!(ids, vec![3, 4]);
    }
}
