//! Progress notifications for UI consumers (toasts, banners).
//!
//! Events are informational only; the state snapshot stays authoritative.

use crate::catalog::ItemKind;
use crate::zones::{SpecialFlag, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::mpsc::{channel, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    XpGained {
        amount: u64,
        source: String,
        new_total_xp: u64,
    },
    LeveledUp {
        from: u32,
        to: u32,
    },
    ZonesUnlocked {
        zones: BTreeSet<ZoneId>,
    },
    ItemUnlocked {
        kind: ItemKind,
        id: String,
    },
    FlagChanged {
        flag: SpecialFlag,
        value: bool,
    },
    Reset,
    /// State could not be written; in-memory progress is still current
    PersistFailed {
        message: String,
    },
}

impl ProgressEvent {
    /// One-line text suitable for a toast
    pub fn format_toast(&self) -> String {
        match self {
            ProgressEvent::XpGained { amount, source, .. } => format!("+{} XP ({})", amount, source),
            ProgressEvent::LeveledUp { to, .. } => format!("Level up! Now level {}", to),
            ProgressEvent::ZonesUnlocked { zones } => {
                let names: Vec<&str> = zones.iter().map(|z| z.as_str()).collect();
                format!("New zones unlocked: {}", names.join(", "))
            }
            ProgressEvent::ItemUnlocked { kind, id } => format!("Unlocked {} '{}'", kind, id),
            ProgressEvent::FlagChanged { flag, value } => format!("{} = {}", flag, value),
            ProgressEvent::Reset => "All progress reset".to_string(),
            ProgressEvent::PersistFailed { message } => {
                format!("Progress not saved: {}", message)
            }
        }
    }
}

/// Fan-out of events to channel subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<ProgressEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ProgressEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to every live subscriber, dropping those that hung up
    pub fn emit(&mut self, event: ProgressEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
