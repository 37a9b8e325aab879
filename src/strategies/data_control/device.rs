//! Data device state
//!
//! Protocol-independent side of a data-control device: the events both
//! protocol families emit, the offers they create, and turning the current
//! selection into a delivery.

use std::fs::File;
use std::io::Read;
use std::os::fd::OwnedFd;
use tracing::{debug, trace, warn};

use super::offer::{OfferTracker, TrackedOffer};
use crate::clipboard::{classify, receive_value, ContentSource, Result};
use crate::session::{Delivery, DeliveryOutcome};

/// Device events common to both protocol families
#[derive(Debug)]
pub enum DeviceEvent<O: TrackedOffer> {
    /// New offer; MIME types follow
    DataOffer(O),
    /// Clipboard selection changed; `None` clears it
    Selection(Option<O::Id>),
    /// Primary selection changed; not monitored
    PrimarySelection(Option<O::Id>),
    /// Device withdrawn by the compositor
    Finished,
}

/// Offers and flags of one data device
pub struct DeviceState<O: TrackedOffer> {
    offers: OfferTracker<O>,
    selection_changed: bool,
    finished: bool,
}

impl<O: TrackedOffer> Default for DeviceState<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: TrackedOffer> DeviceState<O> {
    /// State of a freshly created device
    pub fn new() -> Self {
        Self {
            offers: OfferTracker::new(),
            selection_changed: false,
            finished: false,
        }
    }

    /// Apply one device event
    pub fn handle_event(&mut self, event: DeviceEvent<O>) {
        match event {
            DeviceEvent::DataOffer(offer) => {
                trace!("New data offer {:?}", offer.offer_id());
                self.offers.announce(offer);
            }
            DeviceEvent::Selection(id) => {
                let stale = self.offers.pending_len();
                if !self.offers.select(id.as_ref()) && id.is_some() {
                    warn!("Selection names an unknown offer {:?}", id);
                }
                trace!("Selection {:?} ({} offers were pending)", id, stale);
                self.selection_changed = true;
            }
            DeviceEvent::PrimarySelection(id) => {
                if let Some(id) = id {
                    self.offers.discard(&id);
                }
            }
            DeviceEvent::Finished => {
                warn!("Data-control device finished (compositor restarted or seat removed?)");
                self.finished = true;
            }
        }
    }

    /// Record a MIME type announced by an offer
    pub fn handle_offer_mime(&mut self, id: &O::Id, mime_type: String) {
        trace!("Offer {:?} advertises {}", id, mime_type);
        self.offers.add_mime_type(id, mime_type);
    }

    /// Consume the selection-changed flag
    pub fn take_selection_changed(&mut self) -> bool {
        std::mem::take(&mut self.selection_changed)
    }

    /// Whether the device was withdrawn
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Current selection and its MIME types
    pub fn current(&self) -> Option<(&O, &[String])> {
        self.offers.current()
    }

    /// Release every offer
    pub fn clear(&mut self) {
        self.offers.clear();
    }
}

/// Read the current selection's payload from `source` and deliver it.
///
/// Returns `None` when nothing was handed to `delivery`.
pub fn deliver_selection<S: ContentSource + ?Sized>(
    source: &mut S,
    mime_types: &[String],
    delivery: &mut Delivery,
) -> Option<DeliveryOutcome> {
    let kind = classify(mime_types);
    if !delivery.options().accepts(kind) {
        trace!("Ignoring {} selection ({} MIME types)", kind, mime_types.len());
        return None;
    }

    match receive_value(source, kind, mime_types) {
        Ok(Some(value)) => Some(delivery.deliver(value)),
        Ok(None) => {
            debug!("Selection offered no {} data", kind);
            None
        }
        Err(e) => {
            delivery.report_error(&format!("Failed to receive {kind} content"), &e);
            None
        }
    }
}

/// Read a payload pipe until end-of-stream.
///
/// Zero bytes means no data. The read end is closed on every path.
pub fn read_payload(read_end: OwnedFd) -> Result<Option<Vec<u8>>> {
    let mut file = File::from(read_end);
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok((!data.is_empty()).then_some(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClipboardValue, ContentKind, MonitorError};
    use crate::session::{MonitorOptions, SessionShared, UpdateCallback};
    use nix::unistd::pipe;
    use parking_lot::Mutex;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Write;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

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

    /// Answers `receive` from a table, like a selection owner would
    struct FakeSource(HashMap<&'static str, Vec<u8>>);

    impl ContentSource for FakeSource {
        fn receive(&mut self, mime_type: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.0.get(mime_type).cloned().filter(|d| !d.is_empty()))
        }
    }

    type Received = Arc<Mutex<Vec<(ContentKind, ClipboardValue)>>>;

    fn delivery(options: MonitorOptions) -> (Delivery, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let callback: UpdateCallback = Arc::new(move |kind, value| sink.lock().push((kind, value)));
        (Delivery::new(SessionShared::new(options, callback)), received)
    }

    fn announce(
        state: &mut DeviceState<FakeOffer>,
        id: u32,
        mime_types: &[&str],
        released: &Rc<RefCell<Vec<u32>>>,
    ) {
        state.handle_event(DeviceEvent::DataOffer(FakeOffer {
            id,
            released: released.clone(),
        }));
        for mime in mime_types {
            state.handle_offer_mime(&id, mime.to_string());
        }
    }

    #[test]
    fn test_selection_becomes_current() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut state = DeviceState::new();
        announce(&mut state, 1, &["text/plain;charset=utf-8", "text/plain"], &released);

        assert!(!state.take_selection_changed());
        state.handle_event(DeviceEvent::Selection(Some(1)));
        assert!(state.take_selection_changed());
        assert!(!state.take_selection_changed());

        let (offer, mimes) = state.current().unwrap();
        assert_eq!(offer.id, 1);
        assert_eq!(mimes, ["text/plain;charset=utf-8", "text/plain"]);
    }

    #[test]
    fn test_primary_selection_released_and_not_current() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut state = DeviceState::new();
        announce(&mut state, 7, &["text/plain"], &released);

        state.handle_event(DeviceEvent::PrimarySelection(Some(7)));
        assert_eq!(*released.borrow(), vec![7]);
        assert!(!state.take_selection_changed());
        assert!(state.current().is_none());
    }

    #[test]
    fn test_superseded_selection_released() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut state = DeviceState::new();
        announce(&mut state, 1, &["text/plain"], &released);
        state.handle_event(DeviceEvent::Selection(Some(1)));
        announce(&mut state, 2, &["image/png"], &released);
        state.handle_event(DeviceEvent::Selection(Some(2)));

        assert_eq!(*released.borrow(), vec![1]);
        state.handle_event(DeviceEvent::Selection(None));
        assert!(state.current().is_none());
        assert_eq!(*released.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_finished_flag() {
        let mut state: DeviceState<FakeOffer> = DeviceState::new();
        assert!(!state.is_finished());
        state.handle_event(DeviceEvent::Finished);
        assert!(state.is_finished());
    }

    #[test]
    fn test_clear_releases_offers() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut state = DeviceState::new();
        announce(&mut state, 1, &["text/plain"], &released);
        state.handle_event(DeviceEvent::Selection(Some(1)));
        announce(&mut state, 2, &["text/plain"], &released);

        state.clear();
        let mut released = released.borrow().clone();
        released.sort_unstable();
        assert_eq!(released, vec![1, 2]);
    }

    #[test]
    fn test_deliver_selection_text_once() {
        let (mut delivery, received) = delivery(MonitorOptions::default());
        let mimes = vec![
            "text/plain;charset=utf-8".to_string(),
            "text/plain".to_string(),
        ];
        let mut source = FakeSource(HashMap::from([
            ("text/plain;charset=utf-8", b"hello".to_vec()),
            ("text/plain", b"ignored".to_vec()),
        ]));

        assert_eq!(
            deliver_selection(&mut source, &mimes, &mut delivery),
            Some(DeliveryOutcome::Delivered)
        );
        assert_eq!(
            deliver_selection(&mut source, &mimes, &mut delivery),
            Some(DeliveryOutcome::Duplicate)
        );
        assert_eq!(
            *received.lock(),
            vec![(ContentKind::Text, ClipboardValue::Text("hello".to_string()))]
        );
    }

    #[test]
    fn test_deliver_selection_respects_flags() {
        let (mut delivery, received) = delivery(MonitorOptions::default());
        let mimes = vec!["image/png".to_string()];
        let mut source = FakeSource(HashMap::from([("image/png", b"png".to_vec())]));

        assert_eq!(deliver_selection(&mut source, &mimes, &mut delivery), None);
        assert!(received.lock().is_empty());
    }

    #[test]
    fn test_deliver_selection_invalid_utf8_reported() {
        let (mut delivery, received) = delivery(MonitorOptions::default());
        let mimes = vec!["text/plain".to_string()];
        let mut source = FakeSource(HashMap::from([("text/plain", vec![0xff, 0xfe])]));

        assert_eq!(deliver_selection(&mut source, &mimes, &mut delivery), None);
        assert!(received.lock().is_empty());
    }

    #[test]
    fn test_read_payload_empty_is_none() {
        let (read_end, write_end) = pipe().unwrap();
        drop(write_end);
        assert_eq!(read_payload(read_end).unwrap(), None);
    }

    #[test]
    fn test_read_payload_reads_until_eof() {
        let (read_end, write_end) = pipe().unwrap();
        let writer = thread::spawn(move || {
            let mut file = File::from(write_end);
            for chunk in [&b"first "[..], b"second ", b"third"] {
                file.write_all(chunk).unwrap();
                file.flush().unwrap();
                thread::sleep(Duration::from_millis(10));
            }
        });

        let data = read_payload(read_end).unwrap();
        writer.join().unwrap();
        assert_eq!(data.as_deref(), Some(&b"first second third"[..]));
    }

    #[test]
    fn test_read_payload_larger_than_pipe_buffer() {
        let (read_end, write_end) = pipe().unwrap();
        let payload = vec![0x5a_u8; 256 * 1024];
        let expected = payload.clone();
        let writer = thread::spawn(move || File::from(write_end).write_all(&payload));

        let data = read_payload(read_end).unwrap();
        writer.join().unwrap().unwrap();
        assert_eq!(data, Some(expected));
    }

    #[test]
    fn test_read_payload_closes_fd_on_error() {
        let (read_end, write_end) = pipe().unwrap();

        // Reading from the write end fails with EBADF
        let err = read_payload(write_end).unwrap_err();
        assert!(matches!(err, MonitorError::Io(_)));

        // The only write end is gone, so the reader sees EOF at once
        let mut rest = Vec::new();
        File::from(read_end).read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
    }
}
