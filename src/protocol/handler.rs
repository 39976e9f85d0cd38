//! Action handler seam and the command route table.
//!
//! The daemon's real work (injecting a Home press, running a task) lives
//! outside this crate behind [`ActionHandler`]. The [`RouteTable`] maps each
//! recognized [`CommandKind`] to the handler method that serves it; adding a
//! command kind means adding one route here.

use std::collections::HashMap;

use crate::models::command::{Command, CommandKind};
use crate::Result;

/// Domain logic invoked after a command is decoded.
///
/// Called synchronously and one request at a time by the dispatcher.
/// Long-running work should be handed off by the implementation rather than
/// performed inline, since the client is waiting with a bounded timeout.
pub trait ActionHandler: Send + Sync {
    /// Perform the built-in Home action.
    ///
    /// # Errors
    ///
    /// Any error is reported to the client as a `handler_failure` reply.
    fn handle_home(&self) -> Result<()>;

    /// Run a daemon-interpreted task and optionally return result bytes.
    ///
    /// # Errors
    ///
    /// Any error is reported to the client as a `handler_failure` reply.
    fn handle_task(&self, payload: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Route from a command payload to a handler call.
pub type Route = fn(&dyn ActionHandler, &[u8]) -> Result<Option<Vec<u8>>>;

fn route_home(handler: &dyn ActionHandler, _payload: &[u8]) -> Result<Option<Vec<u8>>> {
    handler.handle_home().map(|()| None)
}

fn route_task(handler: &dyn ActionHandler, payload: &[u8]) -> Result<Option<Vec<u8>>> {
    handler.handle_task(payload)
}

/// Mapping of command tags to handler routes.
///
/// `CommandKind::Unknown` never has a route.
#[derive(Clone)]
pub struct RouteTable {
    routes: HashMap<CommandKind, Route>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.routes.keys()).finish()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RouteTable {
    /// Routes for every recognized command kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut routes: HashMap<CommandKind, Route> = HashMap::new();
        routes.insert(CommandKind::Home, route_home);
        routes.insert(CommandKind::Task, route_task);
        Self { routes }
    }

    /// Route for a decoded command, or `None` if the command is not routable.
    #[must_use]
    pub fn route_for(&self, command: &Command) -> Option<Route> {
        self.routes.get(&command.kind()).copied()
    }

    /// Whether `kind` has a route.
    #[must_use]
    pub fn handles(&self, kind: CommandKind) -> bool {
        self.routes.contains_key(&kind)
    }
}
