use std::rc::Rc;

use crate::controller::{Allocation, ConnectivityMode};
use crate::grid::{CellState, Grid, Position};
use crate::image::UploadedImage;
use crate::status::LotStatus;

/// User gestures, decoupled from whatever produced them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// A click on a cell. `plate` is what the user typed, if they were asked.
    CellClicked {
        pos: Position,
        plate: Option<String>,
    },
    RemoveRequested {
        pos: Position,
    },
    ImageUploaded(UploadedImage),
    ProbeBackend,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Parked { pos: Position, plate: String },
    Removed { pos: Position, plate: String },
    Allocated(Allocation),
    Probed(ConnectivityMode),
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// Transient, user-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Notice {
            level,
            message: message.into(),
        }
    }
}

/// Presentation hooks fired by the controller after state changes.
///
/// Every method defaults to a no-op so a view only implements what it draws.
/// Implementations must not call back into the controller.
pub trait Observer {
    fn render_grid(&self, _grid: &Grid) {}
    fn cell_toggled(&self, _pos: Position, _state: CellState) {}
    fn status_changed(&self, _status: &LotStatus) {}
    fn connectivity_changed(&self, _mode: ConnectivityMode) {}
    fn in_flight_changed(&self, _pos: Position, _busy: bool) {}
    fn detection_changed(&self, _running: bool) {}
    /// Data URL of the annotated detection image.
    fn detection_result(&self, _image: &str) {}
    fn notify(&self, _notice: &Notice) {}
}

impl Observer for () {}

impl<O: Observer + ?Sized> Observer for Rc<O> {
    fn render_grid(&self, grid: &Grid) {
        (**self).render_grid(grid)
    }
    fn cell_toggled(&self, pos: Position, state: CellState) {
        (**self).cell_toggled(pos, state)
    }
    fn status_changed(&self, status: &LotStatus) {
        (**self).status_changed(status)
    }
    fn connectivity_changed(&self, mode: ConnectivityMode) {
        (**self).connectivity_changed(mode)
    }
    fn in_flight_changed(&self, pos: Position, busy: bool) {
        (**self).in_flight_changed(pos, busy)
    }
    fn detection_changed(&self, running: bool) {
        (**self).detection_changed(running)
    }
    fn detection_result(&self, image: &str) {
        (**self).detection_result(image)
    }
    fn notify(&self, notice: &Notice) {
        (**self).notify(notice)
    }
}
