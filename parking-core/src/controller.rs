//! Turns user gestures into grid transitions, with the backend's blessing.
//!
//! The controller is single-threaded but re-entrant: every operation is an
//! `async fn` on `&self`, grid borrows never live across an `.await`, and a
//! per-cell claim keeps two gestures from racing on the same spot.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashSet;
use std::future::Future;

use tracing::{debug, error, info, warn};

use crate::config::{HistoryPolicy, ParkingConfig};
use crate::error::{ControllerError, GatewayError, GridError};
use crate::event::{Command, Notice, NoticeLevel, Observer, Outcome};
use crate::gateway::{Gateway, HistoryEntry, HistoryStatus, Transport, endpoint};
use crate::grid::{CellState, Grid, Position};
use crate::image::{UploadedImage, jpeg_data_url};
use crate::label::position_label;
use crate::layout::Layout;
use crate::status::{LotStatus, compute_status};

/// Plate recorded when the detector found a plate but returned no text.
const UNKNOWN_PLATE: &str = "UNKNOWN";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectivityMode {
    #[default]
    Online,
    /// Backend calls are skipped and every transition commits locally.
    Offline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationSource {
    Backend,
    Offline,
}

/// A spot handed out for a detected vehicle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub pos: Position,
    pub label: String,
    pub plate: String,
    /// Data URL of the annotated (or, offline, the uploaded) image.
    pub result_image: Option<String>,
    pub source: AllocationSource,
}

/// Releases a cell claim when the operation that took it finishes.
struct CellClaim<'a> {
    claims: &'a RefCell<HashSet<Position>>,
    observer: &'a dyn Observer,
    pos: Position,
}

impl Drop for CellClaim<'_> {
    fn drop(&mut self) {
        self.claims.borrow_mut().remove(&self.pos);
        self.observer.in_flight_changed(self.pos, false);
    }
}

struct DetectionGuard<'a> {
    running: &'a Cell<bool>,
    observer: &'a dyn Observer,
}

impl Drop for DetectionGuard<'_> {
    fn drop(&mut self) {
        self.running.set(false);
        self.observer.detection_changed(false);
    }
}

pub struct Controller<T, O> {
    config: ParkingConfig,
    gateway: Gateway<T>,
    observer: O,
    grid: RefCell<Grid>,
    in_flight: RefCell<HashSet<Position>>,
    detecting: Cell<bool>,
    mode: Cell<ConnectivityMode>,
}

impl<T: Transport, O: Observer> Controller<T, O> {
    /// Seeds the grid from `layout` and paints the initial view.
    pub fn new(config: ParkingConfig, layout: &Layout, transport: T, observer: O) -> Self {
        let mode = if config.start_offline {
            ConnectivityMode::Offline
        } else {
            ConnectivityMode::Online
        };
        let ctrl = Controller {
            config,
            gateway: Gateway::new(transport),
            observer,
            grid: RefCell::new(Grid::new(layout)),
            in_flight: RefCell::new(HashSet::new()),
            detecting: Cell::new(false),
            mode: Cell::new(mode),
        };
        {
            let grid = ctrl.grid.borrow();
            ctrl.observer.render_grid(&grid);
            ctrl.observer.status_changed(&compute_status(&grid));
        }
        ctrl.observer.connectivity_changed(mode);
        ctrl
    }

    pub fn config(&self) -> &ParkingConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn grid(&self) -> Ref<'_, Grid> {
        self.grid.borrow()
    }

    pub fn status(&self) -> LotStatus {
        compute_status(&self.grid.borrow())
    }

    pub fn mode(&self) -> ConnectivityMode {
        self.mode.get()
    }

    pub fn set_mode(&self, mode: ConnectivityMode) {
        if self.mode.replace(mode) != mode {
            info!(?mode, "connectivity changed");
            self.observer.connectivity_changed(mode);
        }
    }

    pub fn is_in_flight(&self, pos: Position) -> bool {
        self.in_flight.borrow().contains(&pos)
    }

    pub fn is_detecting(&self) -> bool {
        self.detecting.get()
    }

    /// Single entry point for UI gestures. Results are also reported to the
    /// observer as notices.
    pub async fn dispatch(&self, command: Command) -> Result<Outcome, ControllerError> {
        let failure = match &command {
            Command::CellClicked { .. } => "Failed to park vehicle",
            Command::RemoveRequested { .. } => "Failed to remove vehicle",
            Command::ImageUploaded(_) => "Something went wrong. Please try again.",
            Command::ProbeBackend => "Backend health check failed",
        };
        let result = match command {
            Command::CellClicked { pos, plate } => self.cell_clicked(pos, plate.as_deref()).await,
            Command::RemoveRequested { pos } => self
                .remove(pos)
                .await
                .map(|plate| Outcome::Removed { pos, plate }),
            Command::ImageUploaded(image) => self
                .allocate_from_detection(&image)
                .await
                .map(Outcome::Allocated),
            Command::ProbeBackend => Ok(Outcome::Probed(self.probe().await)),
        };
        match &result {
            Ok(outcome) => {
                if let Some(notice) = success_notice(outcome) {
                    self.observer.notify(&notice);
                }
            }
            Err(e) => {
                if e.is_invariant_violation() {
                    error!(error = %e, "grid invariant violated");
                } else {
                    debug!(error = %e, "command failed");
                }
                self.observer.notify(&failure_notice(e, failure));
            }
        }
        result
    }

    async fn cell_clicked(
        &self,
        pos: Position,
        plate: Option<&str>,
    ) -> Result<Outcome, ControllerError> {
        let state = self.grid.borrow().state_at(pos)?;
        match (state, plate.map(str::trim)) {
            (CellState::Empty, Some(plate)) if !plate.is_empty() => {
                let plate = self.park(pos, plate).await?;
                Ok(Outcome::Parked { pos, plate })
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    /// Parks `plate` on an empty cell once the backend agrees (or is
    /// unreachable). Returns the trimmed plate.
    pub async fn park(&self, pos: Position, plate: &str) -> Result<String, ControllerError> {
        let plate = plate.trim();
        if plate.is_empty() {
            return Err(ControllerError::MissingPlate);
        }
        self.expect_state(pos, CellState::Empty, CellState::Occupied)?;
        let _claim = self.claim(pos)?;

        self.attempt(endpoint::PARK_VEHICLE, move || {
            self.gateway.park_vehicle(pos, plate)
        })
        .await
        .map_err(rejected)?;

        self.commit_park(pos, plate).await?;
        Ok(plate.to_string())
    }

    /// Frees an occupied cell. Returns the plate that was parked there.
    pub async fn remove(&self, pos: Position) -> Result<String, ControllerError> {
        self.expect_state(pos, CellState::Occupied, CellState::Empty)?;
        let _claim = self.claim(pos)?;

        self.attempt(endpoint::REMOVE_VEHICLE, move || {
            self.gateway.remove_vehicle(pos)
        })
        .await
        .map_err(rejected)?;

        let policy = self.config.history_policy;
        if policy == HistoryPolicy::Required {
            let plate = self
                .grid
                .borrow()
                .plate_at(pos)?
                .unwrap_or(UNKNOWN_PLATE)
                .to_string();
            self.record(pos, &plate, HistoryStatus::Unparked)
                .await
                .map_err(ControllerError::HistoryFailed)?;
        }
        let mut plate = self.grid.borrow_mut().clear(pos)?;
        if plate.is_empty() {
            plate = UNKNOWN_PLATE.to_string();
        }
        debug!(%pos, %plate, "vehicle removed");
        self.publish(pos);
        if policy == HistoryPolicy::BestEffort {
            self.record_best_effort(pos, &plate, HistoryStatus::Unparked)
                .await;
        }
        Ok(plate)
    }

    /// Detects a plate in `image` and parks it on the nearest free spot.
    pub async fn allocate_from_detection(
        &self,
        image: &UploadedImage,
    ) -> Result<Allocation, ControllerError> {
        if !image.is_image() {
            return Err(ControllerError::UnsupportedImage(image.mime.clone()));
        }
        if image.len() > self.config.max_upload_bytes {
            return Err(ControllerError::ImageTooLarge {
                size: image.len(),
                limit: self.config.max_upload_bytes,
            });
        }
        let _running = self.begin_detection()?;
        let data_url = image.to_data_url();

        let allocation = match self.allocate_online(&data_url).await? {
            Some(allocation) => allocation,
            None => self.allocate_offline(&data_url)?,
        };

        let pos = allocation.pos;
        let free = matches!(self.grid.borrow().state_at(pos), Ok(CellState::Empty));
        if !free {
            warn!(%pos, "allocated spot is no longer empty");
            return Err(ControllerError::NoAvailableSpot);
        }
        let _claim = self
            .claim(pos)
            .map_err(|_| ControllerError::NoAvailableSpot)?;
        self.commit_park(pos, &allocation.plate).await?;

        if let Some(image) = &allocation.result_image {
            self.observer.detection_result(image);
        }
        Ok(allocation)
    }

    async fn allocate_online(&self, data_url: &str) -> Result<Option<Allocation>, ControllerError> {
        let detection = self
            .attempt(endpoint::DETECT_PLATES, move || {
                self.gateway.detect_plates(data_url)
            })
            .await
            .map_err(rejected)?;
        let Some(detection) = detection else {
            return Ok(None);
        };
        if !detection.found_plate() {
            return Err(ControllerError::NoPlateDetected);
        }

        let spot = match self
            .attempt(endpoint::NEAREST_SPOT, move || self.gateway.find_nearest_spot())
            .await
        {
            Ok(Some(spot)) => spot,
            Ok(None) => return Ok(None),
            Err(GatewayError::Rejected { status: 404, .. }) => {
                return Err(ControllerError::NoAvailableSpot);
            }
            Err(e) => return Err(rejected(e)),
        };

        let plate = detection
            .plate_texts
            .first()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .unwrap_or(UNKNOWN_PLATE)
            .to_string();
        Ok(Some(Allocation {
            pos: spot.location,
            label: position_label(spot.location),
            plate,
            result_image: detection.result_images.first().map(|s| jpeg_data_url(s)),
            source: AllocationSource::Backend,
        }))
    }

    fn allocate_offline(&self, data_url: &str) -> Result<Allocation, ControllerError> {
        let pos = {
            let grid = self.grid.borrow();
            let in_flight = self.in_flight.borrow();
            grid.cells()
                .find(|(p, c)| c.state == CellState::Empty && !in_flight.contains(p))
                .map(|(p, _)| p)
        };
        let pos = pos.ok_or(ControllerError::NoAvailableSpot)?;
        debug!(%pos, "offline allocation picked first empty cell");
        Ok(Allocation {
            pos,
            label: position_label(pos),
            plate: self.config.mock_plate.clone(),
            result_image: Some(data_url.to_string()),
            source: AllocationSource::Offline,
        })
    }

    /// Checks whether the backend answers. Any HTTP reply counts as online.
    pub async fn probe(&self) -> ConnectivityMode {
        match self.gateway.health().await {
            Ok(()) => self.set_mode(ConnectivityMode::Online),
            Err(e) if e.is_network() => self.go_offline(endpoint::HEALTH, &e),
            Err(e) => {
                warn!(error = %e, "backend reachable but unhealthy");
                self.set_mode(ConnectivityMode::Online);
            }
        }
        self.mode()
    }

    async fn commit_park(&self, pos: Position, plate: &str) -> Result<(), ControllerError> {
        let policy = self.config.history_policy;
        if policy == HistoryPolicy::Required {
            self.record(pos, plate, HistoryStatus::Parked)
                .await
                .map_err(ControllerError::HistoryFailed)?;
        }
        self.grid.borrow_mut().set_occupied(pos, plate)?;
        debug!(%pos, %plate, "vehicle parked");
        self.publish(pos);
        if policy == HistoryPolicy::BestEffort {
            self.record_best_effort(pos, plate, HistoryStatus::Parked)
                .await;
        }
        Ok(())
    }

    async fn record(
        &self,
        pos: Position,
        plate: &str,
        status: HistoryStatus,
    ) -> Result<(), GatewayError> {
        let entry = HistoryEntry {
            position: position_label(pos),
            number_plate: plate.to_string(),
            status,
        };
        let entry = &entry;
        match self
            .attempt(endpoint::HISTORY, move || self.gateway.log_history(entry))
            .await?
        {
            Some(()) => Ok(()),
            None => {
                debug!(position = %entry.position, "history skipped while offline");
                Ok(())
            }
        }
    }

    async fn record_best_effort(&self, pos: Position, plate: &str, status: HistoryStatus) {
        if let Err(e) = self.record(pos, plate, status).await {
            warn!(error = %e, %pos, "history entry not recorded");
        }
    }

    /// Runs a backend call under the connectivity policy. `Ok(None)` means
    /// the call was skipped or the backend could not be reached, and the
    /// caller should carry on offline.
    async fn attempt<R, F, Fut>(
        &self,
        what: &'static str,
        mut call: F,
    ) -> Result<Option<R>, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, GatewayError>>,
    {
        if self.mode() == ConnectivityMode::Offline {
            debug!(endpoint = what, "offline, backend call skipped");
            return Ok(None);
        }
        let mut retries = self.config.retry_budget;
        loop {
            match call().await {
                Ok(reply) => return Ok(Some(reply)),
                Err(e) if e.is_network() && retries > 0 && may_resend(what, &e) => {
                    retries -= 1;
                    warn!(endpoint = what, error = %e, retries_left = retries, "retrying backend call");
                }
                Err(e) if e.is_network() => {
                    self.go_offline(what, &e);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn go_offline(&self, what: &'static str, cause: &GatewayError) {
        warn!(endpoint = what, error = %cause, "backend not available, working offline");
        if self.mode() == ConnectivityMode::Online {
            self.set_mode(ConnectivityMode::Offline);
            self.observer.notify(&Notice::new(
                NoticeLevel::Warning,
                "Backend not available, working offline",
            ));
        }
    }

    fn expect_state(
        &self,
        pos: Position,
        expected: CellState,
        target: CellState,
    ) -> Result<(), ControllerError> {
        let from = self.grid.borrow().state_at(pos)?;
        if from != expected {
            return Err(GridError::InvalidTransition {
                pos,
                from,
                to: target,
            }
            .into());
        }
        Ok(())
    }

    fn claim(&self, pos: Position) -> Result<CellClaim<'_>, ControllerError> {
        if !self.in_flight.borrow_mut().insert(pos) {
            return Err(ControllerError::Busy(pos));
        }
        self.observer.in_flight_changed(pos, true);
        Ok(CellClaim {
            claims: &self.in_flight,
            observer: &self.observer,
            pos,
        })
    }

    fn begin_detection(&self) -> Result<DetectionGuard<'_>, ControllerError> {
        if self.detecting.replace(true) {
            return Err(ControllerError::DetectionInProgress);
        }
        self.observer.detection_changed(true);
        Ok(DetectionGuard {
            running: &self.detecting,
            observer: &self.observer,
        })
    }

    fn publish(&self, pos: Position) {
        let grid = self.grid.borrow();
        self.observer.render_grid(&grid);
        if let Ok(state) = grid.state_at(pos) {
            self.observer.cell_toggled(pos, state);
        }
        self.observer.status_changed(&compute_status(&grid));
    }
}

// A timed-out request may have reached the backend, so only calls that are
// safe to repeat go out again. Unreachable means nothing was sent.
fn may_resend(what: &'static str, cause: &GatewayError) -> bool {
    match cause {
        GatewayError::Timeout(_) => endpoint::is_replay_safe(what),
        _ => true,
    }
}

fn rejected(e: GatewayError) -> ControllerError {
    match e {
        GatewayError::Rejected { endpoint, status } => {
            ControllerError::BackendRejected { endpoint, status }
        }
        other => ControllerError::BackendMalformed(other),
    }
}

fn success_notice(outcome: &Outcome) -> Option<Notice> {
    let notice = match outcome {
        Outcome::Parked { plate, .. } => Notice::new(
            NoticeLevel::Success,
            format!("Vehicle {plate} parked successfully!"),
        ),
        Outcome::Removed { .. } => Notice::new(NoticeLevel::Success, "Vehicle removed successfully!"),
        Outcome::Allocated(a) => Notice::new(
            NoticeLevel::Success,
            format!("Parking spot {} allocated to {}.", a.label, a.plate),
        ),
        Outcome::Probed(ConnectivityMode::Online) => {
            Notice::new(NoticeLevel::Info, "Backend connected")
        }
        Outcome::Probed(ConnectivityMode::Offline) | Outcome::Ignored => return None,
    };
    Some(notice)
}

fn failure_notice(e: &ControllerError, fallback: &str) -> Notice {
    match e {
        ControllerError::NoAvailableSpot
        | ControllerError::Busy(_)
        | ControllerError::DetectionInProgress => Notice::new(NoticeLevel::Warning, e.to_string()),
        ControllerError::BackendRejected { .. }
        | ControllerError::BackendMalformed(_)
        | ControllerError::HistoryFailed(_) => Notice::new(NoticeLevel::Error, fallback),
        _ => Notice::new(NoticeLevel::Error, e.to_string()),
    }
}
