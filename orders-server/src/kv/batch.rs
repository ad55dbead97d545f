//! Atomic command batches
//!
//! A [`Batch`] collects commands that a backend applies all-or-nothing.
//! Conditional commands double as guards: when the condition of any one of
//! them does not hold at commit time, the whole batch is aborted and none of
//! its commands take effect.
//!
//! | Command | Condition | Result when applied |
//! |---------|-----------|---------------------|
//! | `SetIfAbsent` | key absent | `true` |
//! | `SetIfPresent` | key present | `true` |
//! | `Delete` | key present | `true` |
//! | `AddToSet` | none | member was newly added |
//! | `RemoveFromSet` | none | member was present |

/// A single backend mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetIfAbsent { key: String, value: Vec<u8> },
    SetIfPresent { key: String, value: Vec<u8> },
    Delete { key: String },
    AddToSet { set: String, member: String },
    RemoveFromSet { set: String, member: String },
}

impl Command {
    /// Whether a failed condition on this command aborts its batch
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            Command::SetIfAbsent { .. } | Command::SetIfPresent { .. } | Command::Delete { .. }
        )
    }

    /// Short command name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetIfAbsent { .. } => "set_if_absent",
            Command::SetIfPresent { .. } => "set_if_present",
            Command::Delete { .. } => "delete",
            Command::AddToSet { .. } => "add_to_set",
            Command::RemoveFromSet { .. } => "remove_from_set",
        }
    }
}

/// Commands queued for one atomic commit
///
/// Obtained from `KvBackend::begin_batch`, then handed to either
/// `KvBackend::commit` or `KvBackend::discard`.
#[derive(Debug, Default)]
#[must_use = "a batch must be committed or discarded"]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_if_absent(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.push(Command::SetIfAbsent {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::Delete { key: key.into() })
    }

    pub fn add_to_set(&mut self, set: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.push(Command::AddToSet {
            set: set.into(),
            member: member.into(),
        })
    }

    pub fn remove_from_set(
        &mut self,
        set: impl Into<String>,
        member: impl Into<String>,
    ) -> &mut Self {
        self.push(Command::RemoveFromSet {
            set: set.into(),
            member: member.into(),
        })
    }

    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Drop the queued commands without submitting them
    pub fn discard(self) {
        tracing::debug!(commands = self.commands.len(), "batch discarded");
    }
}

/// Outcome of committing a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every command was applied; one result per command, in order
    Committed(Vec<bool>),
    /// The conditional command at `index` failed; nothing was applied
    Aborted { index: usize },
}

impl BatchOutcome {
    /// Collapse the outcome of a one-command batch into that command's result
    pub(crate) fn into_single(self) -> bool {
        match self {
            BatchOutcome::Committed(results) => results.first().copied().unwrap_or(false),
            BatchOutcome::Aborted { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let mut batch = Batch::new();
        batch
            .set_if_absent("order:1", b"{}".to_vec())
            .add_to_set("orders", "order:1");

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.commands()[0].name(), "set_if_absent");
        assert_eq!(batch.commands()[1].name(), "add_to_set");
        batch.discard();
    }

    #[test]
    fn test_conditional_commands() {
        assert!(Command::Delete { key: "k".into() }.is_conditional());
        assert!(
            !Command::AddToSet {
                set: "s".into(),
                member: "m".into()
            }
            .is_conditional()
        );
    }

    #[test]
    fn test_into_single() {
        assert!(BatchOutcome::Committed(vec![true]).into_single());
        assert!(!BatchOutcome::Committed(vec![false]).into_single());
        assert!(!BatchOutcome::Aborted { index: 0 }.into_single());
    }
}
