//! Node runtime: executes state-machine actions against an endpoint.
//!
//! Keeps the state machine pure: [`Node`] decides, [`Runtime`] does. The
//! same node logic runs under a production endpoint and the simulation
//! harness; only the endpoint differs.

use forklore_proto::Message;

use crate::config::{GroupConfig, PeerId};
use crate::endpoint::Endpoint;
use crate::error::NodeError;
use crate::node::{Node, NodeAction};

/// Drives one [`Node`], executing its actions against an [`Endpoint`].
///
/// Entry points mirror the node's and must be called serially (one inbound
/// queue per node, drained by exactly one caller). The runtime adds no
/// locking or queueing of its own.
#[derive(Debug)]
pub struct Runtime<E> {
    node: Node,
    endpoint: E,
}

impl<E: Endpoint> Runtime<E> {
    /// Create a runtime driving a fresh node.
    pub fn new(config: GroupConfig, endpoint: E) -> Self {
        Self { node: Node::new(config), endpoint }
    }

    /// The driven node, for state inspection.
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Local request to enter the critical section.
    ///
    /// # Errors
    ///
    /// Propagates [`NodeError`] from the node unchanged; no actions are
    /// executed on the error path.
    pub fn request_lock(&mut self) -> Result<(), NodeError> {
        let actions = self.node.request_lock()?;
        self.execute(actions);
        Ok(())
    }

    /// Local request to leave the critical section.
    ///
    /// # Errors
    ///
    /// Propagates [`NodeError`] from the node unchanged; no actions are
    /// executed on the error path.
    pub fn release_lock(&mut self) -> Result<(), NodeError> {
        let actions = self.node.release_lock()?;
        self.execute(actions);
        Ok(())
    }

    /// Inbound protocol message from `from`.
    ///
    /// # Errors
    ///
    /// Propagates [`NodeError`] from the node unchanged. Fatal errors
    /// ([`NodeError::is_fatal`]) mean the host must stop driving this node.
    pub fn handle_message(&mut self, from: PeerId, message: Message) -> Result<(), NodeError> {
        let actions = self.node.handle_message(from, message)?;
        self.execute(actions);
        Ok(())
    }

    fn execute(&mut self, actions: Vec<NodeAction>) {
        let self_id = self.node.config().self_id();
        for action in actions {
            match action {
                NodeAction::Send { to, message } => {
                    tracing::trace!(self_id, to, ?message, "send");
                    self.endpoint.send(to, message);
                },
                NodeAction::Locked => {
                    tracing::debug!(self_id, "critical section acquired");
                    self.endpoint.notify_locked();
                },
                NodeAction::Unlocked => {
                    tracing::debug!(self_id, "critical section released");
                    self.endpoint.notify_unlocked();
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use forklore_proto::Message;

    use super::*;
    use crate::node::LockState;

    /// Endpoint that journals every effect in call order.
    #[derive(Debug, Default)]
    struct RecordingEndpoint {
        events: Vec<Event>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Sent(PeerId, Message),
        Locked,
        Unlocked,
    }

    impl Endpoint for RecordingEndpoint {
        fn send(&mut self, to: PeerId, message: Message) {
            self.events.push(Event::Sent(to, message));
        }

        fn notify_locked(&mut self) {
            self.events.push(Event::Locked);
        }

        fn notify_unlocked(&mut self) {
            self.events.push(Event::Unlocked);
        }
    }

    fn runtime(group_size: u32, self_id: PeerId) -> Runtime<RecordingEndpoint> {
        let config = GroupConfig::new(group_size, self_id).unwrap();
        Runtime::new(config, RecordingEndpoint::default())
    }

    #[test]
    fn uncontended_cycle_notifies_once_each_way() {
        let mut rt = runtime(2, 1);

        rt.request_lock().unwrap();
        rt.release_lock().unwrap();

        assert_eq!(rt.endpoint.events, vec![Event::Locked, Event::Unlocked]);
    }

    #[test]
    fn unlocked_precedes_release_time_grants() {
        let mut rt = runtime(2, 1);
        rt.request_lock().unwrap();
        rt.handle_message(2, Message::Request).unwrap();

        rt.release_lock().unwrap();

        assert_eq!(
            rt.endpoint.events,
            vec![Event::Locked, Event::Unlocked, Event::Sent(2, Message::Grant)]
        );
    }

    #[test]
    fn errors_execute_no_actions() {
        let mut rt = runtime(2, 2);
        rt.request_lock().unwrap();
        let sent_so_far = rt.endpoint.events.len();

        assert!(rt.request_lock().is_err());
        assert!(rt.handle_message(7, Message::Grant).is_err());
        assert_eq!(rt.endpoint.events.len(), sent_so_far);
        assert_eq!(rt.node().lock_state(), LockState::AwaitingTokens);
    }
}
