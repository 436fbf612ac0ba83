//! Human-readable events surfaced on descriptors and status records

use crate::domain::{DescriptorRef, GroupName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Object an event is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTarget {
    Descriptor(DescriptorRef),
    Status(GroupName),
}

impl fmt::Display for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTarget::Descriptor(r) => write!(f, "descriptor/{}", r),
            EventTarget::Status(group) => write!(f, "status/{}", group),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Normal,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub target: EventTarget,
    pub kind: EventKind,
    pub reason: String,
    pub message: String,
}

impl Event {
    pub fn normal(target: EventTarget, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self { target, kind: EventKind::Normal, reason: reason.into(), message: message.into() }
    }

    pub fn warning(
        target: EventTarget,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { target, kind: EventKind::Warning, reason: reason.into(), message: message.into() }
    }
}
