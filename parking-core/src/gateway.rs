//! Typed client for the parking backend.
//!
//! The backend itself (plate OCR, nearest-spot search, history storage) is an
//! external service. [`Gateway`] only knows its endpoints and JSON shapes; the
//! bytes travel over whatever [`Transport`] the host provides.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::grid::Position;

pub mod endpoint {
    pub const PARK_VEHICLE: &str = "/park_vehicle";
    pub const REMOVE_VEHICLE: &str = "/removed_parked_position";
    pub const HISTORY: &str = "/history";
    pub const DETECT_PLATES: &str = "/predict/base64/";
    pub const NEAREST_SPOT: &str = "/find_shortest_parking_lot";
    pub const HEALTH: &str = "/health";

    /// Whether sending the same request twice leaves the backend as one send
    /// would. The spot lookup reserves a spot and history appends a row.
    pub fn is_replay_safe(path: &str) -> bool {
        !matches!(path, NEAREST_SPOT | HISTORY)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: &'static str,
    /// JSON body, if any.
    pub body: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Carries one request to the backend. Network-level failures must come back
/// as [`GatewayError::Unreachable`] or [`GatewayError::Timeout`]; any HTTP
/// answer, successful or not, is a reply.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, GatewayError>;
}

#[derive(Serialize)]
struct ParkBody<'a> {
    position: Position,
    plate: &'a str,
}

#[derive(Serialize)]
struct RemoveBody {
    position: Position,
}

#[derive(Serialize)]
struct DetectBody<'a> {
    image: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryStatus {
    Parked,
    Unparked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Spot label such as `B3`.
    pub position: String,
    pub number_plate: String,
    pub status: HistoryStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub num_plates_detected: usize,
    #[serde(default)]
    pub plate_texts: Vec<String>,
    /// Annotated crops as bare base64 JPEG.
    #[serde(default)]
    pub result_images: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Detection {
    pub fn found_plate(&self) -> bool {
        self.success && self.num_plates_detected > 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotAllocation {
    pub location: Position,
    #[serde(default)]
    pub message: Option<String>,
}

pub struct Gateway<T> {
    transport: T,
}

impl<T: Transport> Gateway<T> {
    pub fn new(transport: T) -> Self {
        Gateway { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(
        &self,
        method: Method,
        path: &'static str,
        body: Option<String>,
    ) -> Result<String, GatewayError> {
        let reply = self
            .transport
            .send(HttpRequest { method, path, body })
            .await?;
        if !reply.ok() {
            return Err(GatewayError::Rejected {
                endpoint: path,
                status: reply.status,
            });
        }
        Ok(reply.body)
    }

    pub async fn park_vehicle(&self, position: Position, plate: &str) -> Result<(), GatewayError> {
        let body = serde_json::to_string(&ParkBody { position, plate })?;
        self.call(Method::Post, endpoint::PARK_VEHICLE, Some(body))
            .await
            .map(drop)
    }

    pub async fn remove_vehicle(&self, position: Position) -> Result<(), GatewayError> {
        let body = serde_json::to_string(&RemoveBody { position })?;
        self.call(Method::Post, endpoint::REMOVE_VEHICLE, Some(body))
            .await
            .map(drop)
    }

    pub async fn log_history(&self, entry: &HistoryEntry) -> Result<(), GatewayError> {
        let body = serde_json::to_string(entry)?;
        self.call(Method::Post, endpoint::HISTORY, Some(body))
            .await
            .map(drop)
    }

    pub async fn detect_plates(&self, data_url: &str) -> Result<Detection, GatewayError> {
        let body = serde_json::to_string(&DetectBody { image: data_url })?;
        let text = self
            .call(Method::Post, endpoint::DETECT_PLATES, Some(body))
            .await?;
        parse(endpoint::DETECT_PLATES, &text)
    }

    pub async fn find_nearest_spot(&self) -> Result<SpotAllocation, GatewayError> {
        let text = self.call(Method::Post, endpoint::NEAREST_SPOT, None).await?;
        parse(endpoint::NEAREST_SPOT, &text)
    }

    pub async fn health(&self) -> Result<(), GatewayError> {
        self.call(Method::Get, endpoint::HEALTH, None).await.map(drop)
    }
}

fn parse<R: for<'de> Deserialize<'de>>(endpoint: &'static str, text: &str) -> Result<R, GatewayError> {
    serde_json::from_str(text).map_err(|e| GatewayError::Malformed {
        endpoint,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures_lite::future::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    struct Canned {
        reply: Result<HttpReply, fn() -> GatewayError>,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl Canned {
        fn status(status: u16, body: &str) -> Self {
            Canned {
                reply: Ok(HttpReply {
                    status,
                    body: body.to_string(),
                }),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for Canned {
        async fn send(&self, request: HttpRequest) -> Result<HttpReply, GatewayError> {
            self.seen.borrow_mut().push(request);
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    #[test]
    fn park_body_shape() {
        let gw = Gateway::new(Canned::status(200, "{}"));
        block_on(gw.park_vehicle(Position::new(3, 4), "XYZ111")).unwrap();
        let seen = gw.transport().seen.borrow();
        assert_eq!(
            seen[0],
            HttpRequest {
                method: Method::Post,
                path: endpoint::PARK_VEHICLE,
                body: Some(r#"{"position":[3,4],"plate":"XYZ111"}"#.to_string()),
            }
        );
    }

    #[test]
    fn history_body_shape() {
        let gw = Gateway::new(Canned::status(200, "{}"));
        let entry = HistoryEntry {
            position: "B3".into(),
            number_plate: "XYZ111".into(),
            status: HistoryStatus::Unparked,
        };
        block_on(gw.log_history(&entry)).unwrap();
        let body = gw.transport().seen.borrow()[0].body.clone().unwrap();
        assert_eq!(
            body,
            r#"{"position":"B3","number_plate":"XYZ111","status":"Unparked"}"#
        );
    }

    #[test]
    fn non_success_status_is_rejection() {
        let gw = Gateway::new(Canned::status(500, "boom"));
        let err = block_on(gw.remove_vehicle(Position::new(1, 1))).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Rejected {
                endpoint: endpoint::REMOVE_VEHICLE,
                status: 500
            }
        ));
        assert!(!err.is_network());
    }

    #[test]
    fn detection_reply_is_parsed() {
        let gw = Gateway::new(Canned::status(
            200,
            r#"{"success":true,"plate_texts":["51F-12345"],"message":"ok","num_plates_detected":1,"result_images":["QUJD"]}"#,
        ));
        let det = block_on(gw.detect_plates("data:image/png;base64,AA==")).unwrap();
        assert!(det.found_plate());
        assert_eq!(det.plate_texts, vec!["51F-12345".to_string()]);
        let sent = gw.transport().seen.borrow()[0].body.clone().unwrap();
        assert_eq!(sent, r#"{"image":"data:image/png;base64,AA=="}"#);
    }

    #[test]
    fn missing_success_reads_as_no_plate() {
        let gw = Gateway::new(Canned::status(200, r#"{"num_plates_detected":1,"plate_texts":["X"]}"#));
        let det = block_on(gw.detect_plates("data:image/png;base64,AA==")).unwrap();
        assert!(!det.success);
        assert!(!det.found_plate());
    }

    #[test]
    fn only_reservations_and_history_are_unsafe_to_resend() {
        assert!(endpoint::is_replay_safe(endpoint::PARK_VEHICLE));
        assert!(endpoint::is_replay_safe(endpoint::DETECT_PLATES));
        assert!(endpoint::is_replay_safe(endpoint::HEALTH));
        assert!(!endpoint::is_replay_safe(endpoint::NEAREST_SPOT));
        assert!(!endpoint::is_replay_safe(endpoint::HISTORY));
    }

    #[test]
    fn garbage_reply_is_malformed() {
        let gw = Gateway::new(Canned::status(200, "<html>"));
        assert!(matches!(
            block_on(gw.find_nearest_spot()),
            Err(GatewayError::Malformed { .. })
        ));
    }

    #[test]
    fn spot_reply_is_parsed() {
        let gw = Gateway::new(Canned::status(
            200,
            r#"{"message":"Vehicle successfully parked at (2, 3)","location":[2,3]}"#,
        ));
        let spot = block_on(gw.find_nearest_spot()).unwrap();
        assert_eq!(spot.location, Position::new(2, 3));
        assert_eq!(gw.transport().seen.borrow()[0].body, None);
    }

    #[test]
    fn network_errors_pass_through() {
        let gw = Gateway::new(Canned {
            reply: Err(|| GatewayError::Timeout(10)),
            seen: RefCell::new(Vec::new()),
        });
        let err = block_on(gw.health()).unwrap_err();
        assert!(err.is_network());
        assert_eq!(gw.transport().seen.borrow()[0].method, Method::Get);
    }
}
