//! Grid model and interaction logic for the smart parking lot.
//!
//! Nothing in this crate touches the DOM or the network directly. The
//! browser front-end supplies a [`gateway::Transport`] and an
//! [`event::Observer`] and drives everything through
//! [`controller::Controller::dispatch`].

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod gateway;
pub mod grid;
pub mod image;
pub mod label;
pub mod layout;
pub mod status;

pub use config::{HistoryPolicy, ParkingConfig};
pub use controller::{Allocation, AllocationSource, ConnectivityMode, Controller};
pub use error::{ConfigError, ControllerError, GatewayError, GridError};
pub use event::{Command, Notice, NoticeLevel, Observer, Outcome};
pub use gateway::{Gateway, HttpReply, HttpRequest, Method, Transport};
pub use grid::{COLS, Cell, CellState, Grid, Position, ROWS};
pub use image::UploadedImage;
pub use label::{column_label, position_label};
pub use layout::Layout;
pub use status::{LotStatus, OccupancyLevel, compute_status};
