//! Strategy Selector
//!
//! Walks an ordered list of capability probes on the worker thread and runs
//! the first strategy that reports itself available.
//!
//! Default priority:
//! 1. Data-control (Wayland compositors with ext/wlr data-control)
//! 2. Toolkit owner-change listener (GTK on X11)
//! 3. CLI polling (always available)
//!
//! A strategy that fails with a transient error is restarted a few times
//! with a growing delay. Protocol faults, missing prerequisites and
//! exhausted retries hand over to the next probe in the list.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    Availability, DataControlProbe, PollingProbe, StrategyKind, StrategyProbe, ToolkitProbe,
};
use crate::clipboard::{classify_error, recovery_action, RecoveryAction, MAX_STRATEGY_RETRIES};
use crate::config::MonitorConfig;
use crate::monitor::MonitorState;
use crate::session::{Delivery, SessionShared};

/// Build the probe list described by `config`, in its configured order
pub fn default_probes(config: &MonitorConfig) -> Vec<Arc<dyn StrategyProbe>> {
    config
        .strategies
        .iter()
        .map(|kind| -> Arc<dyn StrategyProbe> {
            match kind {
                StrategyKind::DataControl => {
                    Arc::new(DataControlProbe::new(config.data_control.dispatch_timeout()))
                }
                StrategyKind::Toolkit => Arc::new(ToolkitProbe),
                StrategyKind::Polling => Arc::new(PollingProbe::new(config.polling.settings())),
            }
        })
        .collect()
}

/// Run strategies in probe order until the session stops.
///
/// Returns the last strategy that ran, or `None` if none could start.
pub fn run_strategies(
    probes: &[Arc<dyn StrategyProbe>],
    shared: &Arc<SessionShared>,
) -> Option<StrategyKind> {
    info!("Selecting clipboard monitoring strategy...");
    let mut last_run = None;

    'probes: for probe in probes {
        let kind = probe.kind();
        let mut attempt = 0;

        loop {
            if !shared.is_running() {
                break 'probes;
            }

            debug!("Probing {} strategy", kind);
            let strategy = match probe.probe(&shared.options()) {
                Availability::Ready(strategy) => strategy,
                Availability::Unavailable(err) => {
                    warn!("{}", err);
                    break;
                }
            };

            if attempt == 0 {
                info!("✅ Selected: {} strategy", kind);
            }
            shared.set_state(MonitorState::Active(kind));
            last_run = Some(kind);

            let result = strategy.run(Delivery::new(shared.clone()));
            shared.set_waker(None);

            if !shared.is_running() {
                if let Err(e) = result {
                    debug!("{} strategy ended during stop: {}", kind, e);
                }
                break 'probes;
            }

            let err = match result {
                Ok(()) => {
                    warn!("{} strategy returned while still running", kind);
                    break;
                }
                Err(e) => e,
            };

            shared.set_state(MonitorState::Starting);
            match recovery_action(&err, attempt) {
                RecoveryAction::Retry { delay } => {
                    attempt += 1;
                    warn!(
                        "{} strategy failed ({}): {}; restarting in {:?} ({}/{})",
                        kind,
                        classify_error(&err),
                        err,
                        delay,
                        attempt,
                        MAX_STRATEGY_RETRIES
                    );
                    if !shared.sleep(delay) {
                        break 'probes;
                    }
                }
                RecoveryAction::FallBack => {
                    error!("{} strategy failed ({}): {}", kind, classify_error(&err), err);
                    break;
                }
            }
        }

        warn!("Falling back to next available strategy");
        shared.set_state(MonitorState::Starting);
    }

    if last_run.is_none() && shared.is_running() {
        error!("No clipboard monitoring strategy could be started");
    }
    last_run
}
