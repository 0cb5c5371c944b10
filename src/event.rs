use crossterm::event::KeyEvent;
use std::future::Future;
use tokio::sync::mpsc;

use crate::error::{FatalUiError, ParseError};
use crate::model::ResourceReference;
use crate::view::DetailMode;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Tick,
    RefsLoaded {
        cycle: u64,
        namespace: String,
        refs: Vec<ResourceReference>,
    },
    CycleFailed {
        cycle: u64,
        error: ParseError,
    },
    StatusLoaded {
        cycle: u64,
        namespace: String,
        refs: Vec<ResourceReference>,
        failed: usize,
    },
    DetailLoaded {
        mode: DetailMode,
        title: String,
        text: String,
    },
    DetailFailed {
        message: String,
    },
    Key(KeyEvent),
    Resize,
    Fatal(FatalUiError),
}

/// Runs `work` on its own task and delivers its event. A panicking worker is
/// reported as [`AppEvent::Fatal`] instead of being lost.
pub fn spawn_worker<F>(tx: mpsc::UnboundedSender<AppEvent>, work: F)
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let event = match tokio::spawn(work).await {
            Ok(event) => event,
            Err(error) => AppEvent::Fatal(FatalUiError::Task(error.to_string())),
        };
        let _ = tx.send(event);
    });
}
