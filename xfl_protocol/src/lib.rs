pub mod codec;

use serde::{Deserialize, Serialize};

pub use rmpv::Value;

/// Application pane of the host. Travels as a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    #[default]
    None,
    XFoilAnalysis,
    DirectDesign,
    InverseDesign,
    Miarex,
}

impl AppMode {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(AppMode::None),
            1 => Some(AppMode::XFoilAnalysis),
            2 => Some(AppMode::DirectDesign),
            3 => Some(AppMode::InverseDesign),
            4 => Some(AppMode::Miarex),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            AppMode::None => 0,
            AppMode::XFoilAnalysis => 1,
            AppMode::DirectDesign => 2,
            AppMode::InverseDesign => 3,
            AppMode::Miarex => 4,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StateSnapshot {
    pub project_path: String,
    pub project_name: String,
    pub app: i32,
    pub saved: bool,
    pub display: bool,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            project_path: String::new(),
            project_name: String::new(),
            app: AppMode::None.as_i32(),
            saved: true,
            display: true,
        }
    }
}

/// Scalar description of a foil. `n` is the number of boundary points.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct FoilSnapshot {
    pub name: String,
    pub camber: f64,
    pub camber_x: f64,
    pub thickness: f64,
    pub thickness_x: f64,
    pub n: i32,
}

/// One boundary point, encoded as `[x, y]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Coord> for (f64, f64) {
    fn from(c: Coord) -> Self {
        (c.x, c.y)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LineStyleSnapshot {
    pub visible: bool,
    pub stipple: i32,
    pub point_style: i32,
    pub width: i32,
    /// `[r, g, b, a]`; a three-component color is read as opaque.
    pub color: Vec<u8>,
    pub tag: String,
}

impl Default for LineStyleSnapshot {
    fn default() -> Self {
        Self {
            visible: true,
            stipple: 0,
            point_style: 0,
            width: 1,
            color: vec![0, 0, 0, 255],
            tag: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PolarSpecSnapshot {
    pub polar_type: i32,
    #[serde(rename = "Re_type")]
    pub re_type: i32,
    pub ma_type: i32,
    pub aoa: f64,
    pub mach: f64,
    pub ncrit: f64,
    pub xtop: f64,
    pub xbot: f64,
    pub reynolds: f64,
}

impl Default for PolarSpecSnapshot {
    fn default() -> Self {
        Self {
            polar_type: 0,
            re_type: 1,
            ma_type: 1,
            aoa: 0.0,
            mach: 0.0,
            ncrit: 9.0,
            xtop: 1.0,
            xbot: 1.0,
            reynolds: 100_000.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PolarResultSnapshot {
    pub alpha: Vec<f64>,
    #[serde(rename = "Cl")]
    pub cl: Vec<f64>,
    #[serde(rename = "XCp")]
    pub xcp: Vec<f64>,
    #[serde(rename = "Cd")]
    pub cd: Vec<f64>,
    #[serde(rename = "Cdp")]
    pub cdp: Vec<f64>,
    #[serde(rename = "Cm")]
    pub cm: Vec<f64>,
    #[serde(rename = "XTr1")]
    pub xtr1: Vec<f64>,
    #[serde(rename = "XTr2")]
    pub xtr2: Vec<f64>,
    #[serde(rename = "HMom")]
    pub hmom: Vec<f64>,
    #[serde(rename = "Cpmn")]
    pub cpmn: Vec<f64>,
    #[serde(rename = "ClCd")]
    pub cl_cd: Vec<f64>,
    #[serde(rename = "Cl32Cd")]
    pub cl32_cd: Vec<f64>,
    #[serde(rename = "RtCl")]
    pub rt_cl: Vec<f64>,
    #[serde(rename = "Re")]
    pub re: Vec<f64>,
}

/// Column selector for `analyzeCurPolar` result lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultColumn {
    Alpha,
    Cl,
    XCp,
    Cd,
    Cdp,
    Cm,
    XTr1,
    XTr2,
    HMom,
    Cpmn,
    ClCd,
    Cl32Cd,
    RtCl,
    Re,
}

impl ResultColumn {
    pub const ALL: [ResultColumn; 14] = [
        ResultColumn::Alpha,
        ResultColumn::Cl,
        ResultColumn::XCp,
        ResultColumn::Cd,
        ResultColumn::Cdp,
        ResultColumn::Cm,
        ResultColumn::XTr1,
        ResultColumn::XTr2,
        ResultColumn::HMom,
        ResultColumn::Cpmn,
        ResultColumn::ClCd,
        ResultColumn::Cl32Cd,
        ResultColumn::RtCl,
        ResultColumn::Re,
    ];

    pub fn from_i32(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PolarSnapshot {
    pub name: String,
    pub foil_name: String,
    pub spec: PolarSpecSnapshot,
    pub result: PolarResultSnapshot,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisSettingsSnapshot {
    pub sequence_type: i32,
    /// `(start, end, delta)`
    pub sequence: (f64, f64, f64),
    pub is_sequence: bool,
    #[serde(rename = "init_BL")]
    pub init_bl: bool,
    pub store_opp: bool,
    pub viscous: bool,
    pub keep_open_on_error: bool,
}

impl Default for AnalysisSettingsSnapshot {
    fn default() -> Self {
        Self {
            sequence_type: 0,
            sequence: (0.0, 0.0, 0.0),
            is_sequence: false,
            init_bl: true,
            store_opp: true,
            viscous: true,
            keep_open_on_error: false,
        }
    }
}

/// Error category; written on the wire as its snake_case name.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(into = "String", try_from = "String")]
pub enum ErrorKind {
    DecodeError,
    UnknownProcedure,
    InvalidArgument,
    NotFound,
    CapacityExceeded,
    OperationFailed,
    ServerStopping,
    EncodeError,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::UnknownProcedure => "unknown_procedure",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::CapacityExceeded => "capacity_exceeded",
            ErrorKind::OperationFailed => "operation_failed",
            ErrorKind::ServerStopping => "server_stopping",
            ErrorKind::EncodeError => "encode_error",
            ErrorKind::InternalError => "internal_error",
        }
    }
}

impl From<ErrorKind> for String {
    fn from(kind: ErrorKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for ErrorKind {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        let kind = match name.as_str() {
            "decode_error" => ErrorKind::DecodeError,
            "unknown_procedure" => ErrorKind::UnknownProcedure,
            "invalid_argument" => ErrorKind::InvalidArgument,
            "not_found" => ErrorKind::NotFound,
            "capacity_exceeded" => ErrorKind::CapacityExceeded,
            "operation_failed" => ErrorKind::OperationFailed,
            "server_stopping" => ErrorKind::ServerStopping,
            "encode_error" => ErrorKind::EncodeError,
            "internal_error" => ErrorKind::InternalError,
            _ => return Err(format!("unknown error kind: {name}")),
        };
        Ok(kind)
    }
}

/// Structured error carried in the error slot of a response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for RpcError {}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub call_id: u32,
    pub procedure: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub call_id: u32,
    pub outcome: Result<Value, RpcError>,
}
