use async_trait::async_trait;

use crate::error::Result;
use crate::event::FileEvent;

/// A consumer of raw watch events, registered with `WatchManager`.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: FileEvent) -> Result<()>;

    fn name(&self) -> &'static str;

    fn can_handle(&self, event: &FileEvent) -> bool {
        let _ = event;
        true
    }
}
