//! Wayland data-control session
//!
//! Binds `ext_data_control_manager_v1`, falling back to
//! `zwlr_data_control_manager_v1`, and keeps the offers of one data device
//! in a [`DeviceState`]. Both protocol families are translated into the
//! same [`DeviceEvent`] before touching state.

use std::os::fd::{AsFd, BorrowedFd};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{debug, info, trace};
use wayland_client::{
    backend::ObjectId,
    event_created_child,
    globals::{registry_queue_init, GlobalList, GlobalListContents},
    protocol::{wl_registry::WlRegistry, wl_seat::WlSeat},
    Connection, Dispatch, EventQueue, Proxy, QueueHandle,
};
use wayland_protocols::ext::data_control::v1::client::{
    ext_data_control_device_v1::{self, ExtDataControlDeviceV1},
    ext_data_control_manager_v1::ExtDataControlManagerV1,
    ext_data_control_offer_v1::{self, ExtDataControlOfferV1},
};
use wayland_protocols_wlr::data_control::v1::client::{
    zwlr_data_control_device_v1::{self, ZwlrDataControlDeviceV1},
    zwlr_data_control_manager_v1::ZwlrDataControlManagerV1,
    zwlr_data_control_offer_v1::{self, ZwlrDataControlOfferV1},
};

use super::device::{deliver_selection, read_payload, DeviceEvent, DeviceState};
use super::offer::TrackedOffer;
use crate::clipboard::{ContentSource, MonitorError, Result};
use crate::session::Delivery;

/// Data-control offer of either protocol family.
///
/// Dropping it destroys the protocol object.
pub(super) enum Offer {
    Ext(ExtDataControlOfferV1),
    Wlr(ZwlrDataControlOfferV1),
}

impl Offer {
    fn receive(&self, mime_type: String, fd: BorrowedFd<'_>) {
        match self {
            Offer::Ext(offer) => offer.receive(mime_type, fd),
            Offer::Wlr(offer) => offer.receive(mime_type, fd),
        }
    }
}

impl TrackedOffer for Offer {
    type Id = ObjectId;

    fn offer_id(&self) -> ObjectId {
        match self {
            Offer::Ext(offer) => offer.id(),
            Offer::Wlr(offer) => offer.id(),
        }
    }
}

impl Drop for Offer {
    fn drop(&mut self) {
        match self {
            Offer::Ext(offer) => offer.destroy(),
            Offer::Wlr(offer) => offer.destroy(),
        }
    }
}

enum Manager {
    Ext(ExtDataControlManagerV1),
    Wlr(ZwlrDataControlManagerV1),
}

impl Manager {
    /// Bind the newest available data-control manager
    fn bind(globals: &GlobalList, qh: &QueueHandle<DataControlState>) -> Result<Self> {
        if let Ok(manager) = globals.bind::<ExtDataControlManagerV1, _, _>(qh, 1..=1, ()) {
            return Ok(Manager::Ext(manager));
        }
        debug!("ext_data_control_manager_v1 not advertised, trying wlr-data-control");

        globals
            .bind::<ZwlrDataControlManagerV1, _, _>(qh, 1..=2, ())
            .map(Manager::Wlr)
            .map_err(|_| {
                MonitorError::Protocol(
                    "compositor advertises neither ext-data-control-v1 nor wlr-data-control-unstable-v1"
                        .to_string(),
                )
            })
    }

    fn protocol_name(&self) -> &'static str {
        match self {
            Manager::Ext(_) => "ext-data-control-v1",
            Manager::Wlr(_) => "wlr-data-control-unstable-v1",
        }
    }

    fn get_data_device(&self, seat: &WlSeat, qh: &QueueHandle<DataControlState>) -> Device {
        match self {
            Manager::Ext(manager) => Device::Ext(manager.get_data_device(seat, qh, ())),
            Manager::Wlr(manager) => Device::Wlr(manager.get_data_device(seat, qh, ())),
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        match self {
            Manager::Ext(manager) => manager.destroy(),
            Manager::Wlr(manager) => manager.destroy(),
        }
    }
}

enum Device {
    Ext(ExtDataControlDeviceV1),
    Wlr(ZwlrDataControlDeviceV1),
}

impl Drop for Device {
    fn drop(&mut self) {
        match self {
            Device::Ext(device) => device.destroy(),
            Device::Wlr(device) => device.destroy(),
        }
    }
}

/// Dispatch state of the data-control event queue
pub(super) struct DataControlState {
    device: DeviceState<Offer>,
}

impl DataControlState {
    fn new() -> Self {
        Self {
            device: DeviceState::new(),
        }
    }

    fn handle_device_event(&mut self, event: DeviceEvent<Offer>) {
        self.device.handle_event(event);
    }

    fn handle_offer_mime(&mut self, id: ObjectId, mime_type: String) {
        self.device.handle_offer_mime(&id, mime_type);
    }
}

impl Dispatch<WlRegistry, GlobalListContents> for DataControlState {
    fn event(
        _state: &mut Self,
        _proxy: &WlRegistry,
        _event: <WlRegistry as Proxy>::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<WlSeat, ()> for DataControlState {
    fn event(
        _state: &mut Self,
        _proxy: &WlSeat,
        _event: <WlSeat as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ExtDataControlManagerV1, ()> for DataControlState {
    fn event(
        _state: &mut Self,
        _proxy: &ExtDataControlManagerV1,
        _event: <ExtDataControlManagerV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwlrDataControlManagerV1, ()> for DataControlState {
    fn event(
        _state: &mut Self,
        _proxy: &ZwlrDataControlManagerV1,
        _event: <ZwlrDataControlManagerV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ExtDataControlDeviceV1, ()> for DataControlState {
    fn event(
        state: &mut Self,
        _proxy: &ExtDataControlDeviceV1,
        event: ext_data_control_device_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let event = match event {
            ext_data_control_device_v1::Event::DataOffer { id } => {
                DeviceEvent::DataOffer(Offer::Ext(id))
            }
            ext_data_control_device_v1::Event::Selection { id } => {
                DeviceEvent::Selection(id.map(|offer| offer.id()))
            }
            ext_data_control_device_v1::Event::PrimarySelection { id } => {
                DeviceEvent::PrimarySelection(id.map(|offer| offer.id()))
            }
            ext_data_control_device_v1::Event::Finished => DeviceEvent::Finished,
            _ => return,
        };
        state.handle_device_event(event);
    }

    event_created_child!(DataControlState, ExtDataControlDeviceV1, [
        ext_data_control_device_v1::EVT_DATA_OFFER_OPCODE => (ExtDataControlOfferV1, ()),
    ]);
}

impl Dispatch<ZwlrDataControlDeviceV1, ()> for DataControlState {
    fn event(
        state: &mut Self,
        _proxy: &ZwlrDataControlDeviceV1,
        event: zwlr_data_control_device_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let event = match event {
            zwlr_data_control_device_v1::Event::DataOffer { id } => {
                DeviceEvent::DataOffer(Offer::Wlr(id))
            }
            zwlr_data_control_device_v1::Event::Selection { id } => {
                DeviceEvent::Selection(id.map(|offer| offer.id()))
            }
            zwlr_data_control_device_v1::Event::PrimarySelection { id } => {
                DeviceEvent::PrimarySelection(id.map(|offer| offer.id()))
            }
            zwlr_data_control_device_v1::Event::Finished => DeviceEvent::Finished,
            _ => return,
        };
        state.handle_device_event(event);
    }

    event_created_child!(DataControlState, ZwlrDataControlDeviceV1, [
        zwlr_data_control_device_v1::EVT_DATA_OFFER_OPCODE => (ZwlrDataControlOfferV1, ()),
    ]);
}

impl Dispatch<ExtDataControlOfferV1, ()> for DataControlState {
    fn event(
        state: &mut Self,
        proxy: &ExtDataControlOfferV1,
        event: ext_data_control_offer_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let ext_data_control_offer_v1::Event::Offer { mime_type } = event {
            state.handle_offer_mime(proxy.id(), mime_type);
        }
    }
}

impl Dispatch<ZwlrDataControlOfferV1, ()> for DataControlState {
    fn event(
        state: &mut Self,
        proxy: &ZwlrDataControlOfferV1,
        event: zwlr_data_control_offer_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let zwlr_data_control_offer_v1::Event::Offer { mime_type } = event {
            state.handle_offer_mime(proxy.id(), mime_type);
        }
    }
}

/// Live connection to the compositor's data-control extension
pub(super) struct DataControlSession {
    conn: Connection,
    queue: EventQueue<DataControlState>,
    state: DataControlState,
    device: Option<Device>,
    manager: Option<Manager>,
    protocol: &'static str,
}

impl DataControlSession {
    /// Connect, bind the manager and a seat, and create the data device
    pub(super) fn open() -> Result<Self> {
        let conn = Connection::connect_to_env()
            .map_err(|e| MonitorError::Protocol(format!("Wayland connection failed: {e}")))?;

        let (globals, queue) = registry_queue_init::<DataControlState>(&conn)
            .map_err(|e| MonitorError::Protocol(format!("registry init failed: {e}")))?;
        let qh = queue.handle();

        let manager = Manager::bind(&globals, &qh)?;
        let seat: WlSeat = globals
            .bind(&qh, 1..=2, ())
            .map_err(|e| MonitorError::Protocol(format!("no wl_seat available: {e}")))?;

        let device = manager.get_data_device(&seat, &qh);
        let protocol = manager.protocol_name();
        info!("Bound {} data device", protocol);

        Ok(Self {
            conn,
            queue,
            state: DataControlState::new(),
            device: Some(device),
            manager: Some(manager),
            protocol,
        })
    }

    /// Protocol family in use
    pub(super) fn protocol_name(&self) -> &'static str {
        self.protocol
    }

    /// Block until the compositor has processed all requests so far
    pub(super) fn roundtrip(&mut self) -> Result<()> {
        self.queue
            .roundtrip(&mut self.state)
            .map(|_| ())
            .map_err(|e| MonitorError::Protocol(format!("roundtrip failed: {e}")))
    }

    /// Whether the device was withdrawn by the compositor
    pub(super) fn is_finished(&self) -> bool {
        self.state.device.is_finished()
    }

    /// Consume the selection-changed flag
    pub(super) fn take_selection_changed(&mut self) -> bool {
        self.state.device.take_selection_changed()
    }

    /// Dispatch events, waiting at most `timeout` for new ones
    pub(super) fn dispatch_with_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.dispatch_pending()?;
        self.queue
            .flush()
            .map_err(|e| MonitorError::Protocol(format!("flush failed: {e}")))?;

        let Some(guard) = self.queue.prepare_read() else {
            return self.dispatch_pending();
        };

        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let readable = {
            let mut fds = [PollFd::new(guard.connection_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(millis)) {
                Ok(n) => n > 0,
                Err(Errno::EINTR) => false,
                Err(e) => return Err(MonitorError::Io(e.into())),
            }
        };

        if readable {
            match guard.read() {
                Ok(_) => {}
                Err(wayland_client::backend::WaylandError::Io(e))
                    if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(MonitorError::Protocol(format!("read failed: {e}"))),
            }
        }

        self.dispatch_pending()
    }

    fn dispatch_pending(&mut self) -> Result<()> {
        self.queue
            .dispatch_pending(&mut self.state)
            .map(|_| ())
            .map_err(|e| MonitorError::Protocol(format!("dispatch failed: {e}")))
    }

    /// Read the current selection and hand it to `delivery`
    pub(super) fn process_selection(&mut self, delivery: &mut Delivery) {
        let Some((offer, mime_types)) = self.state.device.current() else {
            debug!("Selection cleared");
            return;
        };

        let mut source = OfferSource {
            conn: &self.conn,
            offer,
        };
        deliver_selection(&mut source, mime_types, delivery);
    }
}

impl Drop for DataControlSession {
    fn drop(&mut self) {
        self.state.device.clear();
        self.device.take();
        self.manager.take();
        if let Err(e) = self.conn.flush() {
            debug!("Flush during data-control teardown failed: {}", e);
        }
    }
}

/// Streams one offer representation through a pipe
struct OfferSource<'a> {
    conn: &'a Connection,
    offer: &'a Offer,
}

impl ContentSource for OfferSource<'_> {
    fn receive(&mut self, mime_type: &str) -> Result<Option<Vec<u8>>> {
        let (read_fd, write_fd) = nix::unistd::pipe().map_err(std::io::Error::from)?;

        self.offer.receive(mime_type.to_string(), write_fd.as_fd());
        drop(write_fd);

        self.conn
            .roundtrip()
            .map_err(|e| MonitorError::Protocol(format!("roundtrip failed: {e}")))?;

        let data = read_payload(read_fd)?;
        trace!(
            "Received {} bytes as {}",
            data.as_ref().map_or(0, Vec::len),
            mime_type
        );
        Ok(data)
    }
}
