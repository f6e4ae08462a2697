//! Linear undo history of whole-image snapshots.
//!
//! Snapshots are [`RasterImage`] values, which share their payload, so a
//! push costs one reference count. There is no redo.

use std::collections::VecDeque;

use crate::types::RasterImage;

/// LIFO stack of prior images, optionally capped.
///
/// With a cap, pushing onto a full stack evicts the oldest snapshot and
/// hands it back so a caller that has to roll the push back can restore
/// it with [`rollback`](Self::rollback).
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    entries: VecDeque<RasterImage>,
    limit: Option<usize>,
}

impl EditHistory {
    /// An empty history. `limit` of `None` keeps every snapshot.
    #[must_use]
    pub const fn new(limit: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Append a snapshot. Returns the evicted oldest snapshot, if the cap
    /// was reached.
    pub fn push(&mut self, image: RasterImage) -> Option<RasterImage> {
        self.entries.push_back(image);
        match self.limit {
            Some(limit) if self.entries.len() > limit => self.entries.pop_front(),
            _ => None,
        }
    }

    /// Remove and return the most recent snapshot.
    pub fn pop(&mut self) -> Option<RasterImage> {
        self.entries.pop_back()
    }

    /// Undo a [`push`](Self::push): drop the newest snapshot and put
    /// back whatever that push evicted.
    pub fn rollback(&mut self, evicted: Option<RasterImage>) {
        self.entries.pop_back();
        if let Some(oldest) = evicted {
            self.entries.push_front(oldest);
        }
    }

    /// The most recent snapshot without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&RasterImage> {
        self.entries.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(tag: u8) -> RasterImage {
        RasterImage::new(vec![tag], "image/png")
    }

    #[test]
    fn lifo_order() {
        let (a, b, c) = (image(1), image(2), image(3));
        let mut h = EditHistory::default();
        h.push(a.clone());
        h.push(b.clone());
        h.push(c.clone());
        assert_eq!(h.len(), 3);
        assert_eq!(h.pop().map(|i| i.id()), Some(c.id()));
        assert_eq!(h.pop().map(|i| i.id()), Some(b.id()));
        assert_eq!(h.pop().map(|i| i.id()), Some(a.id()));
        assert!(h.pop().is_none());
        assert!(h.is_empty());
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut h = EditHistory::new(Some(2));
        let first = image(1);
        assert!(h.push(first.clone()).is_none());
        assert!(h.push(image(2)).is_none());
        let evicted = h.push(image(3));
        assert_eq!(evicted.as_ref().map(RasterImage::id), Some(first.id()));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn rollback_restores_evicted() {
        let mut h = EditHistory::new(Some(2));
        let (a, b) = (image(1), image(2));
        h.push(a.clone());
        h.push(b.clone());
        let evicted = h.push(image(3));
        h.rollback(evicted);
        assert_eq!(h.len(), 2);
        assert_eq!(h.pop().map(|i| i.id()), Some(b.id()));
        assert_eq!(h.pop().map(|i| i.id()), Some(a.id()));
    }

    #[test]
    fn peek_and_clear() {
        let mut h = EditHistory::default();
        assert!(h.peek().is_none());
        let a = image(7);
        h.push(a.clone());
        assert_eq!(h.peek().map(RasterImage::id), Some(a.id()));
        h.clear();
        assert!(h.is_empty());
    }
}
