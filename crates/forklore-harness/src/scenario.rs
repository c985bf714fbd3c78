//! Scenario builder API.
//!
//! Declarative construction of protocol scenarios that enforce the Oracle
//! Pattern: a scenario cannot run without a verification function, so every
//! scripted interleaving ends in an explicit global-consistency check.

use forklore_core::config::PeerId;

use crate::world::World;

/// Verification function run against the final world state.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    RequestLock(PeerId),
    ReleaseLock(PeerId),
    DeliverOne { from: PeerId, to: PeerId },
    DeliverAll,
}

/// Scenario builder.
///
/// Construct a scenario by scripting lock requests, releases, and message
/// deliveries. Must call `.oracle()` to get a [`RunnableScenario`] that can
/// be executed.
pub struct Scenario {
    name: String,
    group_size: u32,
    steps: Vec<Step>,
}

impl Scenario {
    /// Create a new scenario over a group of `group_size` nodes.
    pub fn new(name: impl Into<String>, group_size: u32) -> Self {
        Self { name: name.into(), group_size, steps: Vec::new() }
    }

    /// Node `id` asks to enter the critical section.
    #[must_use]
    pub fn request_lock(mut self, id: PeerId) -> Self {
        self.steps.push(Step::RequestLock(id));
        self
    }

    /// Node `id` leaves the critical section.
    #[must_use]
    pub fn release_lock(mut self, id: PeerId) -> Self {
        self.steps.push(Step::ReleaseLock(id));
        self
    }

    /// Deliver the oldest message on the `from → to` link.
    ///
    /// The step fails at run time if that link is empty: a scripted
    /// delivery that finds nothing is a bug in the scenario.
    #[must_use]
    pub fn deliver_one(mut self, from: PeerId, to: PeerId) -> Self {
        self.steps.push(Step::DeliverOne { from, to });
        self
    }

    /// Deliver every in-flight message until the world is quiescent.
    #[must_use]
    pub fn deliver_all(mut self) -> Self {
        self.steps.push(Step::DeliverAll);
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    #[must_use]
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// Every scripted step must succeed; the oracle then verifies the final
    /// world state.
    ///
    /// # Errors
    ///
    /// Returns the failing step or the oracle's complaint, prefixed with
    /// the scenario name.
    pub fn run(self) -> Result<(), String> {
        let name = &self.scenario.name;
        let mut world = World::new(self.scenario.group_size)
            .map_err(|error| format!("scenario '{name}': {error}"))?;

        for (index, step) in self.scenario.steps.iter().enumerate() {
            let result = match *step {
                Step::RequestLock(id) => world.request_lock(id),
                Step::ReleaseLock(id) => world.release_lock(id),
                Step::DeliverOne { from, to } => match world.deliver_one(from, to) {
                    Ok(true) => Ok(()),
                    Ok(false) => {
                        return Err(format!(
                            "scenario '{name}', step {index}: no message in flight from {from} to {to}"
                        ));
                    },
                    Err(error) => Err(error),
                },
                Step::DeliverAll => world.deliver_all().map(|_| ()),
            };
            result
                .map_err(|error| format!("scenario '{name}', step {index} ({step:?}): {error}"))?;
        }

        (self.oracle)(&world)
    }
}

/// Composable oracle helpers.
pub mod oracle {
    use forklore_core::config::PeerId;
    use forklore_core::node::LockState;

    use super::OracleFn;

    /// Run every oracle in order; the first failure wins.
    #[must_use]
    pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
        Box::new(move |world| {
            for oracle in &oracles {
                oracle(world)?;
            }
            Ok(())
        })
    }

    /// At most one node reports `Holding`.
    #[must_use]
    pub fn mutual_exclusion() -> OracleFn {
        Box::new(|world| {
            let holders = world.holders();
            if holders.len() > 1 {
                return Err(format!("mutual exclusion violated: holders {holders:?}"));
            }
            Ok(())
        })
    }

    /// Every pairwise token has exactly one owner, counting in-flight
    /// Grants.
    #[must_use]
    pub fn token_conservation() -> OracleFn {
        Box::new(|world| {
            if world.token_conservation_ok() {
                Ok(())
            } else {
                Err("token conservation violated".to_string())
            }
        })
    }

    /// No messages remain in flight.
    #[must_use]
    pub fn quiescent() -> OracleFn {
        Box::new(|world| {
            let in_flight = world.in_flight();
            if in_flight == 0 {
                Ok(())
            } else {
                Err(format!("{in_flight} messages still in flight"))
            }
        })
    }

    /// Node `id` is currently `Holding`.
    #[must_use]
    pub fn holding(id: PeerId) -> OracleFn {
        Box::new(move |world| {
            let node = world.node(id).ok_or_else(|| format!("node {id} should exist"))?;
            if node.lock_state() == LockState::Holding {
                Ok(())
            } else {
                Err(format!("node {id} should be Holding, got {:?}", node.lock_state()))
            }
        })
    }

    /// Node `id` is currently `Idle`.
    #[must_use]
    pub fn idle(id: PeerId) -> OracleFn {
        Box::new(move |world| {
            let node = world.node(id).ok_or_else(|| format!("node {id} should exist"))?;
            if node.lock_state() == LockState::Idle {
                Ok(())
            } else {
                Err(format!("node {id} should be Idle, got {:?}", node.lock_state()))
            }
        })
    }
}
