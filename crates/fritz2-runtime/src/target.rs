#![forbid(unsafe_code)]

//! Capability traits for the things mount points render into.
//!
//! A target knows nothing about reactivity: mount points translate
//! emissions and patch batches into these calls. Index arguments follow the
//! sequential semantics of [`Patch`](fritz2_core::Patch): each call sees the
//! children as left by the previous call.

use crate::error::RenderError;

/// A slot whose content is replaced wholesale.
pub trait ContentTarget {
    type Content;

    fn replace_content(&mut self, content: Self::Content) -> Result<(), RenderError>;

    fn clear_content(&mut self);
}

/// An ordered list of children.
pub trait ChildTarget {
    type Child;

    fn insert_child(&mut self, index: usize, child: Self::Child) -> Result<(), RenderError>;

    fn remove_child(&mut self, index: usize) -> Result<Self::Child, RenderError>;

    /// Remove at `from`, then insert at `to`.
    fn move_child(&mut self, from: usize, to: usize) -> Result<(), RenderError>;

    fn child_count(&self) -> usize;
}

impl<C> ContentTarget for Option<C> {
    type Content = C;

    fn replace_content(&mut self, content: C) -> Result<(), RenderError> {
        *self = Some(content);
        Ok(())
    }

    fn clear_content(&mut self) {
        *self = None;
    }
}

impl<C> ChildTarget for Vec<C> {
    type Child = C;

    fn insert_child(&mut self, index: usize, child: C) -> Result<(), RenderError> {
        if index > self.len() {
            return Err(out_of_range("insert", index, self.len()));
        }
        self.insert(index, child);
        Ok(())
    }

    fn remove_child(&mut self, index: usize) -> Result<C, RenderError> {
        if index >= self.len() {
            return Err(out_of_range("remove", index, self.len()));
        }
        Ok(self.remove(index))
    }

    fn move_child(&mut self, from: usize, to: usize) -> Result<(), RenderError> {
        let len = self.len();
        if from >= len || to >= len {
            return Err(out_of_range("move", from.max(to), len));
        }
        let child = self.remove(from);
        self.insert(to, child);
        Ok(())
    }

    fn child_count(&self) -> usize {
        self.len()
    }
}

pub(crate) fn out_of_range(op: &'static str, index: usize, len: usize) -> RenderError {
    RenderError::Target { op, index, len }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_children_follow_sequential_indices() {
        let mut children = Vec::new();
        children.insert_child(0, "a").unwrap();
        children.insert_child(1, "c").unwrap();
        children.insert_child(1, "b").unwrap();
        children.move_child(2, 0).unwrap();
        assert_eq!(children, vec!["c", "a", "b"]);
        assert_eq!(children.remove_child(1).unwrap(), "a");
        assert_eq!(children.child_count(), 2);
    }

    #[test]
    fn vec_rejects_out_of_range() {
        let mut children = vec![1];
        assert_eq!(
            children.insert_child(3, 2).unwrap_err(),
            RenderError::Target {
                op: "insert",
                index: 3,
                len: 1
            }
        );
        assert!(children.remove_child(1).is_err());
        assert!(children.move_child(0, 1).is_err());
    }

    #[test]
    fn option_content_replaces_and_clears() {
        let mut slot: Option<String> = None;
        slot.replace_content("hello".into()).unwrap();
        assert_eq!(slot.as_deref(), Some("hello"));
        slot.clear_content();
        assert!(slot.is_none());
    }
}
