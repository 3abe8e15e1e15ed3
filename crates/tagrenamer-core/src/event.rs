//! Event dispatch between the node tree and its observers.
//!
//! Every node carries an immutable [`Callbacks`] table, shared between the
//! nodes of one scan. The tree fires events through it; reporting, shell
//! script collection and layout decisions live entirely in the handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::node::Node;

/// Error type handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A registered event handler.
pub type Handler = Arc<dyn Fn(&Event<'_>) -> Result<(), HandlerError> + Send + Sync>;

/// Names of the events a node can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A node joined the tree.
    Init,
    /// A node was removed and is now inert.
    Remove,
    /// A node was re-parented.
    Move,
    /// The shell equivalent of a physical action.
    ShellCollect,
    /// A music file finished sanitizing.
    Sanitize,
}

impl EventKind {
    /// The event name as used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Remove => "remove",
            Self::Move => "move",
            Self::ShellCollect => "shell_collect",
            Self::Sanitize => "sanitize",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event together with its arguments.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Init(&'a Node),
    Remove(&'a Node),
    Move {
        node: &'a Node,
        destination: &'a Node,
    },
    ShellCollect(&'a str),
    Sanitize(&'a Node),
}

impl Event<'_> {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Init(_) => EventKind::Init,
            Event::Remove(_) => EventKind::Remove,
            Event::Move { .. } => EventKind::Move,
            Event::ShellCollect(_) => EventKind::ShellCollect,
            Event::Sanitize(_) => EventKind::Sanitize,
        }
    }
}

/// Table of handlers keyed by event kind.
///
/// Built once and then frozen behind an `Arc`; nodes never mutate it.
#[derive(Clone, Default)]
pub struct Callbacks {
    handlers: HashMap<EventKind, Handler>,
}

impl Callbacks {
    /// Create an empty table. Every event is a no-op.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any previous handler.
    pub fn on<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&Event<'_>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Check whether a handler is registered for `kind`.
    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Check whether no handler is registered at all.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Freeze the table for sharing between nodes.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Call the handler registered for the event, if any.
    ///
    /// Returns `Ok(false)` when nothing is registered for it.
    pub fn invoke(&self, event: &Event<'_>) -> Result<bool, TreeError> {
        let kind = event.kind();
        match self.handlers.get(&kind) {
            Some(handler) => {
                handler(event).map_err(|source| TreeError::Callback { event: kind, source })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().map(EventKind::name).collect();
        kinds.sort_unstable();
        f.debug_struct("Callbacks").field("registered", &kinds).finish()
    }
}
