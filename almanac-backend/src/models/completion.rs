//! Derived completion state for entries that carry child items.
//!
//! Tasks and projects hold a recursive list of sub-items. Once children
//! exist, the stored `completed` flag is no longer authoritative: the entry
//! counts as completed only when every child reports completed, recursively.

use serde::{Deserialize, Serialize};

/// A child item embedded in a task or project document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub name: String,
    pub completed: bool,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Subtask {
    pub fn new(name: &str) -> Self {
        Subtask {
            name: name.to_string(),
            completed: false,
            subtasks: Vec::new(),
        }
    }

    pub fn done(name: &str) -> Self {
        Subtask {
            name: name.to_string(),
            completed: true,
            subtasks: Vec::new(),
        }
    }
}

/// Completion state derived from children.
///
/// No children: the stored flag decides. Children present: completed iff
/// all children report completed (recursively).
pub trait Completable {
    fn stored_completed(&self) -> bool;
    fn children(&self) -> &[Subtask];

    fn completion_status(&self) -> bool {
        let children = self.children();
        if children.is_empty() {
            self.stored_completed()
        } else {
            children.iter().all(|c| c.completion_status())
        }
    }
}

impl Completable for Subtask {
    fn stored_completed(&self) -> bool {
        self.completed
    }

    fn children(&self) -> &[Subtask] {
        &self.subtasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_uses_stored_flag() {
        assert!(!Subtask::new("a").completion_status());
        assert!(Subtask::done("a").completion_status());
    }

    #[test]
    fn test_children_override_stored_flag() {
        let mut parent = Subtask::done("parent");
        parent.subtasks = vec![Subtask::done("x"), Subtask::new("y")];
        // Stored flag says done, but one child is open.
        assert!(!parent.completion_status());

        parent.subtasks[1].completed = true;
        assert!(parent.completion_status());
    }

    #[test]
    fn test_recursive_completion() {
        let mut inner = Subtask::new("inner");
        inner.subtasks = vec![Subtask::done("deep")];
        let mut parent = Subtask::new("parent");
        parent.subtasks = vec![inner];
        assert!(parent.completion_status());
    }
}
