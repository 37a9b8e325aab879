//! Per-run delivery state
//!
//! Every strategy run gets a fresh [`Delivery`], so deduplication and
//! error-log suppression are scoped to one strategy instance.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};

use super::{MonitorOptions, SessionShared, Waker};
use crate::clipboard::{ClipboardValue, ContentKind, MonitorError};

/// What happened to a value handed to [`Delivery::deliver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Callback was invoked
    Delivered,
    /// Same as the last delivered value
    Duplicate,
    /// Image consumed by one-shot suppression
    Suppressed,
    /// Session stopped or no callback registered
    Stopped,
}

/// How a reported error was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Empty-clipboard message, not logged as an error
    Benign,
    /// Same message as the previous error, not logged again
    Repeated,
    /// Logged at error level
    Logged,
}

/// Delivery state of one strategy run
pub struct Delivery {
    shared: Arc<SessionShared>,
    last_delivered: Option<ClipboardValue>,
    last_error: Option<String>,
}

impl Delivery {
    /// Start a delivery scope for a new strategy run
    pub fn new(shared: Arc<SessionShared>) -> Self {
        Self {
            shared,
            last_delivered: None,
            last_error: None,
        }
    }

    /// Enable flags of the session
    pub fn options(&self) -> MonitorOptions {
        self.shared.options()
    }

    /// Whether the session is still running
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Session this delivery belongs to
    pub fn session(&self) -> &Arc<SessionShared> {
        &self.shared
    }

    /// Install the hook that interrupts this strategy on stop
    pub fn set_waker(&self, waker: Waker) {
        self.shared.set_waker(Some(waker));
    }

    /// Forward a value to the consumer.
    ///
    /// Values equal to the last delivered one are dropped. An image arriving
    /// while suppression is armed is recorded as delivered but not forwarded.
    pub fn deliver(&mut self, value: ClipboardValue) -> DeliveryOutcome {
        if !self.shared.is_running() {
            return DeliveryOutcome::Stopped;
        }

        if self.last_delivered.as_ref() == Some(&value) {
            trace!("Duplicate {} ignored", value.summary());
            return DeliveryOutcome::Duplicate;
        }

        let kind = value.kind();
        if kind == ContentKind::Image && self.shared.take_image_block() {
            debug!("Suppressed {} (block-image-once)", value.summary());
            self.last_delivered = Some(value);
            return DeliveryOutcome::Suppressed;
        }

        let Some(callback) = self.shared.callback() else {
            return DeliveryOutcome::Stopped;
        };

        debug!("Delivering {}", value.summary());
        self.last_delivered = Some(value.clone());
        callback(kind, value);
        DeliveryOutcome::Delivered
    }

    /// Consume one-shot image suppression before reading an image.
    ///
    /// Used by strategies where producing the image is itself costly.
    pub fn take_image_block(&self) -> bool {
        self.shared.take_image_block()
    }

    /// Forget the last delivered value
    pub fn reset(&mut self) {
        self.last_delivered = None;
    }

    /// Record a transient failure.
    ///
    /// An empty-clipboard message resets deduplication so the next successful
    /// read is delivered; it is never logged at error level. Any other message
    /// keeps the last delivered value and is logged at error level only when
    /// it differs from the previously reported one.
    pub fn report_error(&mut self, context: &str, err: &MonitorError) -> ErrorDisposition {
        let message = format!("{context}: {err}");
        if err.is_benign() {
            self.reset();
            trace!("{}", message);
            self.last_error = Some(message);
            return ErrorDisposition::Benign;
        }

        if self.last_error.as_deref() == Some(message.as_str()) {
            trace!("{}", message);
            return ErrorDisposition::Repeated;
        }

        error!("{}", message);
        self.last_error = Some(message);
        ErrorDisposition::Logged
    }

    /// Sleep for `interval` unless the session stops first.
    ///
    /// Returns `true` if the session is still running afterwards.
    pub fn sleep(&self, interval: Duration) -> bool {
        self.shared.sleep(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UpdateCallback;
    use parking_lot::Mutex;
    use std::time::Instant;

    type Received = Arc<Mutex<Vec<(ContentKind, ClipboardValue)>>>;

    fn recording_delivery(options: MonitorOptions) -> (Delivery, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let callback: UpdateCallback = Arc::new(move |kind, value| sink.lock().push((kind, value)));
        let shared = SessionShared::new(options, callback);
        (Delivery::new(shared), received)
    }

    fn image(bytes: &[u8]) -> ClipboardValue {
        ClipboardValue::Image {
            data: bytes.to_vec(),
            mime_type: "image/png".to_string(),
        }
    }

    #[test]
    fn test_duplicate_delivered_once() {
        let (mut delivery, received) = recording_delivery(MonitorOptions::default());
        let value = ClipboardValue::Text("hello".to_string());

        assert_eq!(delivery.deliver(value.clone()), DeliveryOutcome::Delivered);
        assert_eq!(delivery.deliver(value.clone()), DeliveryOutcome::Duplicate);
        assert_eq!(received.lock().len(), 1);

        assert_eq!(
            delivery.deliver(ClipboardValue::Text("world".to_string())),
            DeliveryOutcome::Delivered
        );
        assert_eq!(delivery.deliver(value), DeliveryOutcome::Delivered);
        assert_eq!(received.lock().len(), 3);
    }

    #[test]
    fn test_image_suppressed_exactly_once() {
        let (mut delivery, received) = recording_delivery(MonitorOptions::new(true, true));
        delivery.session().arm_image_block();

        // Text and files pass through while armed
        assert_eq!(
            delivery.deliver(ClipboardValue::Text("t".to_string())),
            DeliveryOutcome::Delivered
        );
        assert_eq!(
            delivery.deliver(ClipboardValue::Files(vec!["file:///a".to_string()])),
            DeliveryOutcome::Delivered
        );

        assert_eq!(delivery.deliver(image(b"one")), DeliveryOutcome::Suppressed);
        assert_eq!(delivery.deliver(image(b"two")), DeliveryOutcome::Delivered);

        let kinds: Vec<ContentKind> = received.lock().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![ContentKind::Text, ContentKind::Files, ContentKind::Image]
        );
    }

    #[test]
    fn test_suppressed_image_counts_as_previous() {
        let (mut delivery, received) = recording_delivery(MonitorOptions::new(true, false));
        delivery.session().arm_image_block();

        assert_eq!(delivery.deliver(image(b"own")), DeliveryOutcome::Suppressed);
        assert_eq!(delivery.deliver(image(b"own")), DeliveryOutcome::Duplicate);
        assert!(received.lock().is_empty());
    }

    #[test]
    fn test_benign_error_resets_dedup() {
        let (mut delivery, received) = recording_delivery(MonitorOptions::default());
        let value = ClipboardValue::Text("same".to_string());
        delivery.deliver(value.clone());

        let err = MonitorError::CommandFailed {
            program: "xclip".to_string(),
            stderr: "Error: target STRING not available".to_string(),
        };
        assert_eq!(
            delivery.report_error("Failed to read text", &err),
            ErrorDisposition::Benign
        );
        assert_eq!(delivery.deliver(value), DeliveryOutcome::Delivered);
        assert_eq!(received.lock().len(), 2);
    }

    #[test]
    fn test_failure_keeps_dedup() {
        let (mut delivery, received) = recording_delivery(MonitorOptions::default());
        let value = ClipboardValue::Text("unchanged".to_string());
        assert_eq!(delivery.deliver(value.clone()), DeliveryOutcome::Delivered);

        let err = MonitorError::CommandFailed {
            program: "xclip".to_string(),
            stderr: "Error: Can't open display: :0".to_string(),
        };
        assert_eq!(
            delivery.report_error("Failed to retrieve MIME types", &err),
            ErrorDisposition::Logged
        );
        assert_eq!(delivery.deliver(value), DeliveryOutcome::Duplicate);
        assert_eq!(received.lock().len(), 1);
    }

    #[test]
    fn test_repeated_error_logged_once() {
        let (mut delivery, _received) = recording_delivery(MonitorOptions::default());
        let err = MonitorError::CommandFailed {
            program: "wl-paste".to_string(),
            stderr: "Failed to connect to a Wayland server".to_string(),
        };

        assert_eq!(delivery.report_error("list", &err), ErrorDisposition::Logged);
        assert_eq!(delivery.report_error("list", &err), ErrorDisposition::Repeated);

        let other = MonitorError::Protocol("broken pipe".to_string());
        assert_eq!(delivery.report_error("list", &other), ErrorDisposition::Logged);
        assert_eq!(delivery.report_error("list", &err), ErrorDisposition::Logged);
    }

    #[test]
    fn test_no_delivery_after_stop() {
        let (mut delivery, received) = recording_delivery(MonitorOptions::default());
        delivery.session().request_stop();
        assert_eq!(
            delivery.deliver(ClipboardValue::Text("late".to_string())),
            DeliveryOutcome::Stopped
        );
        assert!(received.lock().is_empty());
    }

    #[test]
    fn test_sleep_wakes_on_stop() {
        let (delivery, _received) = recording_delivery(MonitorOptions::default());
        let shared = delivery.session().clone();

        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            shared.request_stop();
        });

        let start = Instant::now();
        assert!(!delivery.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        stopper.join().unwrap();
    }

    #[test]
    fn test_sleep_times_out_while_running() {
        let (delivery, _received) = recording_delivery(MonitorOptions::default());
        assert!(delivery.sleep(Duration::from_millis(10)));
    }
}
