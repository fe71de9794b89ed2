pub const INBOUND_CAP: usize = 256;

pub use xfl_protocol::codec::{self, CodecError};
pub use xfl_protocol::{
    AnalysisSettingsSnapshot, AppMode, Coord, ErrorKind, FoilSnapshot, LineStyleSnapshot,
    PolarResultSnapshot, PolarSnapshot, PolarSpecSnapshot, RequestEnvelope, ResponseEnvelope,
    ResultColumn, RpcError, StateSnapshot, Value,
};
