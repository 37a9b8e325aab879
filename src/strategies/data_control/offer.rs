//! Selection offer tracking
//!
//! Offers are announced by the compositor, collect MIME types, and then
//! either become the current selection or go stale. The tracker owns every
//! offer, so releasing one is just dropping it.

use std::fmt;

/// An offer object with a stable identity
pub trait TrackedOffer {
    /// Identity used to match later protocol events
    type Id: PartialEq + fmt::Debug;

    /// Identity of this offer
    fn offer_id(&self) -> Self::Id;
}

struct Entry<O> {
    offer: O,
    mime_types: Vec<String>,
}

/// Owner of all live offers of one data device
pub struct OfferTracker<O: TrackedOffer> {
    pending: Vec<Entry<O>>,
    current: Option<Entry<O>>,
}

impl<O: TrackedOffer> Default for OfferTracker<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: TrackedOffer> OfferTracker<O> {
    /// Empty tracker
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            current: None,
        }
    }

    /// Start tracking a newly announced offer
    pub fn announce(&mut self, offer: O) {
        self.pending.push(Entry {
            offer,
            mime_types: Vec::new(),
        });
    }

    /// Record a MIME type announced for an offer.
    ///
    /// Returns `false` if the offer is unknown.
    pub fn add_mime_type(&mut self, id: &O::Id, mime_type: String) -> bool {
        let entry = self
            .pending
            .iter_mut()
            .chain(self.current.iter_mut())
            .find(|entry| entry.offer.offer_id() == *id);

        match entry {
            Some(entry) => {
                entry.mime_types.push(mime_type);
                true
            }
            None => false,
        }
    }

    /// Adopt the offer with `id` as current selection.
    ///
    /// The previous current offer and every other pending offer are released.
    /// `None` clears the selection. Returns `true` if a tracked offer became
    /// current.
    pub fn select(&mut self, id: Option<&O::Id>) -> bool {
        let selected = id.and_then(|id| {
            self.pending
                .iter()
                .position(|entry| entry.offer.offer_id() == *id)
                .map(|index| self.pending.swap_remove(index))
        });

        self.current = selected;
        self.pending.clear();
        self.current.is_some()
    }

    /// Release a pending offer that will never become current
    pub fn discard(&mut self, id: &O::Id) -> bool {
        let before = self.pending.len();
        self.pending.retain(|entry| entry.offer.offer_id() != *id);
        self.pending.len() != before
    }

    /// Current selection and its MIME types
    pub fn current(&self) -> Option<(&O, &[String])> {
        self.current
            .as_ref()
            .map(|entry| (&entry.offer, entry.mime_types.as_slice()))
    }

    /// Number of offers not yet selected
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Release every offer
    pub fn clear(&mut self) {
        self.current = None;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeOffer {
        id: u32,
        released: Rc<RefCell<Vec<u32>>>,
    }

    impl TrackedOffer for FakeOffer {
        type Id = u32;

        fn offer_id(&self) -> u32 {
            self.id
        }
    }

    impl Drop for FakeOffer {
        fn drop(&mut self) {
            self.released.borrow_mut().push(self.id);
        }
    }

    fn tracker() -> (OfferTracker<FakeOffer>, Rc<RefCell<Vec<u32>>>) {
        (OfferTracker::new(), Rc::new(RefCell::new(Vec::new())))
    }

    fn offer(id: u32, released: &Rc<RefCell<Vec<u32>>>) -> FakeOffer {
        FakeOffer {
            id,
            released: released.clone(),
        }
    }

    #[test]
    fn test_select_adopts_offer_with_mime_types() {
        let (mut tracker, released) = tracker();
        tracker.announce(offer(1, &released));
        assert!(tracker.add_mime_type(&1, "text/plain".to_string()));
        assert!(tracker.add_mime_type(&1, "UTF8_STRING".to_string()));
        assert!(!tracker.add_mime_type(&9, "image/png".to_string()));

        assert!(tracker.select(Some(&1)));
        let (current, mimes) = tracker.current().unwrap();
        assert_eq!(current.id, 1);
        assert_eq!(mimes, ["text/plain", "UTF8_STRING"]);
        assert!(released.borrow().is_empty());
    }

    #[test]
    fn test_supersession_releases_previous() {
        let (mut tracker, released) = tracker();
        tracker.announce(offer(1, &released));
        tracker.select(Some(&1));

        tracker.announce(offer(2, &released));
        tracker.announce(offer(3, &released));
        tracker.select(Some(&3));

        let mut released = released.borrow().clone();
        released.sort_unstable();
        assert_eq!(released, vec![1, 2]);
        assert_eq!(tracker.current().map(|(o, _)| o.id), Some(3));
        assert_eq!(tracker.pending_len(), 0);
    }

    #[test]
    fn test_clear_selection() {
        let (mut tracker, released) = tracker();
        tracker.announce(offer(1, &released));
        tracker.select(Some(&1));

        assert!(!tracker.select(None));
        assert!(tracker.current().is_none());
        assert_eq!(*released.borrow(), vec![1]);
    }

    #[test]
    fn test_discard_primary_offer() {
        let (mut tracker, released) = tracker();
        tracker.announce(offer(1, &released));
        tracker.announce(offer(2, &released));

        assert!(tracker.discard(&2));
        assert!(!tracker.discard(&2));
        assert_eq!(*released.borrow(), vec![2]);

        tracker.select(Some(&1));
        assert_eq!(tracker.current().map(|(o, _)| o.id), Some(1));
    }

    #[test]
    fn test_clear_releases_everything() {
        let (mut tracker, released) = tracker();
        tracker.announce(offer(1, &released));
        tracker.select(Some(&1));
        tracker.announce(offer(2, &released));

        tracker.clear();
        let mut released = released.borrow().clone();
        released.sort_unstable();
        assert_eq!(released, vec![1, 2]);
    }
}
