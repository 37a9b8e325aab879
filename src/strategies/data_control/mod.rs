//! Data-Control Strategy
//!
//! Native Wayland clipboard observation through the data-control protocol
//! (ext-data-control-v1, or wlr-data-control-unstable-v1 on older
//! compositors). No window is needed; the compositor announces every
//! selection change and the payload is streamed over a pipe.
//!
//! # Event Flow
//!
//! ```text
//! Compositor                          DataControlState
//! ━━━━━━━━━━                          ━━━━━━━━━━━━━━━━
//!
//! data_offer(id) ──────────────────> DeviceState: OfferTracker::announce
//! offer(mime_type) ×N ─────────────> OfferTracker::add_mime_type
//! selection(id) ───────────────────> OfferTracker::select (previous released)
//! primary_selection(id) ───────────> OfferTracker::discard
//! finished ────────────────────────> run() returns Protocol error
//!
//! run loop: selection changed ─> deliver_selection ─> read_payload ─> Delivery
//! ```
//!
//! Requires the `wayland` feature; without it the probe always reports the
//! strategy as unavailable.

mod device;
mod offer;
#[cfg(feature = "wayland")]
mod protocol;

pub use device::{deliver_selection, read_payload, DeviceEvent, DeviceState};
pub use offer::{OfferTracker, TrackedOffer};

use std::time::Duration;

use super::{Availability, StrategyKind, StrategyProbe};
use crate::session::MonitorOptions;

/// Default time the event loop waits for protocol events before re-checking
/// the running flag
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_millis(250);

/// Probe for the data-control strategy
#[derive(Debug, Clone, Copy)]
pub struct DataControlProbe {
    dispatch_timeout: Duration,
}

impl Default for DataControlProbe {
    fn default() -> Self {
        Self::new(DEFAULT_DISPATCH_TIMEOUT)
    }
}

impl DataControlProbe {
    /// Probe whose strategy waits at most `dispatch_timeout` per dispatch
    pub fn new(dispatch_timeout: Duration) -> Self {
        Self { dispatch_timeout }
    }
}

impl StrategyProbe for DataControlProbe {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DataControl
    }

    #[cfg(feature = "wayland")]
    fn probe(&self, _options: &MonitorOptions) -> Availability {
        match protocol::DataControlSession::open() {
            Ok(session) => Availability::Ready(Box::new(DataControlStrategy {
                session,
                dispatch_timeout: self.dispatch_timeout,
            })),
            Err(e) => Availability::unavailable(StrategyKind::DataControl, e.to_string()),
        }
    }

    #[cfg(not(feature = "wayland"))]
    fn probe(&self, _options: &MonitorOptions) -> Availability {
        let _ = self.dispatch_timeout;
        Availability::unavailable(
            StrategyKind::DataControl,
            "built without the `wayland` feature",
        )
    }
}

#[cfg(feature = "wayland")]
pub use strategy::DataControlStrategy;

#[cfg(feature = "wayland")]
mod strategy {
    use std::time::Duration;
    use tracing::{debug, info};

    use super::protocol::DataControlSession;
    use crate::clipboard::{MonitorError, Result};
    use crate::session::Delivery;
    use crate::strategies::{ClipboardStrategy, StrategyKind};

    /// Event loop over a bound data-control device
    pub struct DataControlStrategy {
        pub(super) session: DataControlSession,
        pub(super) dispatch_timeout: Duration,
    }

    impl ClipboardStrategy for DataControlStrategy {
        fn kind(&self) -> StrategyKind {
            StrategyKind::DataControl
        }

        fn run(self: Box<Self>, mut delivery: Delivery) -> Result<()> {
            let DataControlStrategy {
                mut session,
                dispatch_timeout,
            } = *self;

            session.roundtrip()?;
            info!(
                "Data-control clipboard monitor running ({})",
                session.protocol_name()
            );

            while delivery.is_running() {
                if session.is_finished() {
                    return Err(MonitorError::Protocol(
                        "data-control device finished".to_string(),
                    ));
                }

                if session.take_selection_changed() {
                    session.process_selection(&mut delivery);
                }

                session.dispatch_with_timeout(dispatch_timeout)?;
            }

            debug!("Data-control monitor stopped");
            Ok(())
        }
    }

}
