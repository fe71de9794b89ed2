//! Live application objects. These are owned by the `XflApi` implementation
//! and are only ever touched from the owner thread.

use crate::protocol::AppMode;

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub file_name: String,
    pub project_name: String,
    pub app: AppMode,
    pub saved: bool,
    pub display: bool,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            file_name: String::new(),
            project_name: String::new(),
            app: AppMode::None,
            saved: true,
            display: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStipple {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
    NoLine,
}

impl LineStipple {
    const ALL: [LineStipple; 6] = [
        LineStipple::Solid,
        LineStipple::Dash,
        LineStipple::Dot,
        LineStipple::DashDot,
        LineStipple::DashDotDot,
        LineStipple::NoLine,
    ];

    pub fn from_i32(value: i32) -> Option<Self> {
        usize::try_from(value).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_i32(self) -> i32 {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointStyle {
    #[default]
    NoSymbol,
    LittleCircle,
    BigCircle,
    LittleSquare,
    BigSquare,
    Triangle,
    TriangleInv,
    LittleCircleFilled,
    BigCircleFilled,
    LittleSquareFilled,
    BigSquareFilled,
    TriangleFilled,
    TriangleInvFilled,
    LittleCross,
    BigCross,
}

impl PointStyle {
    const ALL: [PointStyle; 15] = [
        PointStyle::NoSymbol,
        PointStyle::LittleCircle,
        PointStyle::BigCircle,
        PointStyle::LittleSquare,
        PointStyle::BigSquare,
        PointStyle::Triangle,
        PointStyle::TriangleInv,
        PointStyle::LittleCircleFilled,
        PointStyle::BigCircleFilled,
        PointStyle::LittleSquareFilled,
        PointStyle::BigSquareFilled,
        PointStyle::TriangleFilled,
        PointStyle::TriangleInvFilled,
        PointStyle::LittleCross,
        PointStyle::BigCross,
    ];

    pub fn from_i32(value: i32) -> Option<Self> {
        usize::try_from(value).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_i32(self) -> i32 {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 255,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub visible: bool,
    pub stipple: LineStipple,
    pub point_style: PointStyle,
    pub width: i32,
    pub color: Color,
    pub tag: String,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            visible: true,
            stipple: LineStipple::Solid,
            point_style: PointStyle::NoSymbol,
            width: 1,
            color: Color::default(),
            tag: String::new(),
        }
    }
}

/// An airfoil with fixed-size coordinate buffers.
///
/// `xb`/`yb` hold the base geometry, `x`/`y` the current (possibly
/// modified) geometry. Only the first `n` entries of each buffer are
/// meaningful; the buffer length is the foil's capacity and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Foil {
    pub name: String,
    pub camber: f64,
    pub x_camber: f64,
    pub thickness: f64,
    pub x_thickness: f64,
    pub xb: Box<[f64]>,
    pub yb: Box<[f64]>,
    pub x: Box<[f64]>,
    pub y: Box<[f64]>,
    pub n: usize,
    pub style: LineStyle,
}

impl Foil {
    pub const CAPACITY: usize = 604;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            camber: 0.0,
            x_camber: 0.0,
            thickness: 0.0,
            x_thickness: 0.0,
            xb: vec![0.0; Self::CAPACITY].into_boxed_slice(),
            yb: vec![0.0; Self::CAPACITY].into_boxed_slice(),
            x: vec![0.0; Self::CAPACITY].into_boxed_slice(),
            y: vec![0.0; Self::CAPACITY].into_boxed_slice(),
            n: 0,
            style: LineStyle::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.x.len()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x[..self.n].iter().copied().zip(self.y[..self.n].iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolarType {
    #[default]
    FixedSpeed,
    FixedLift,
    RubberChord,
    FixedAoa,
    Stability,
    Beta,
}

impl PolarType {
    const ALL: [PolarType; 6] = [
        PolarType::FixedSpeed,
        PolarType::FixedLift,
        PolarType::RubberChord,
        PolarType::FixedAoa,
        PolarType::Stability,
        PolarType::Beta,
    ];

    pub fn from_i32(value: i32) -> Option<Self> {
        usize::try_from(value).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_i32(self) -> i32 {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0) as i32
    }
}

/// Operating-point columns accumulated by an analysis run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolarResults {
    pub alpha: Vec<f64>,
    pub cl: Vec<f64>,
    pub xcp: Vec<f64>,
    pub cd: Vec<f64>,
    pub cdp: Vec<f64>,
    pub cm: Vec<f64>,
    pub xtr1: Vec<f64>,
    pub xtr2: Vec<f64>,
    pub hmom: Vec<f64>,
    pub cpmn: Vec<f64>,
    pub cl_cd: Vec<f64>,
    pub cl32_cd: Vec<f64>,
    pub rt_cl: Vec<f64>,
    pub re: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polar {
    pub name: String,
    pub foil_name: String,
    pub polar_type: PolarType,
    pub re_type: i32,
    pub ma_type: i32,
    pub aoa: f64,
    pub mach: f64,
    pub ncrit: f64,
    pub xtop: f64,
    pub xbot: f64,
    pub reynolds: f64,
    pub results: PolarResults,
}

impl Polar {
    pub fn new(name: impl Into<String>, foil_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            foil_name: foil_name.into(),
            polar_type: PolarType::FixedSpeed,
            re_type: 1,
            ma_type: 1,
            aoa: 0.0,
            mach: 0.0,
            ncrit: 9.0,
            xtop: 1.0,
            xbot: 1.0,
            reynolds: 100_000.0,
            results: PolarResults::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceType {
    #[default]
    Alpha,
    Cl,
    Reynolds,
}

impl SequenceType {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(SequenceType::Alpha),
            1 => Some(SequenceType::Cl),
            2 => Some(SequenceType::Reynolds),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            SequenceType::Alpha => 0,
            SequenceType::Cl => 1,
            SequenceType::Reynolds => 2,
        }
    }
}

/// Settings for the next `analyze_cur_polar` run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub sequence_type: SequenceType,
    pub start: f64,
    pub end: f64,
    pub delta: f64,
    pub is_sequence: bool,
    pub init_bl: bool,
    pub store_opp: bool,
    pub viscous: bool,
    pub keep_open_on_error: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            sequence_type: SequenceType::Alpha,
            start: 0.0,
            end: 0.0,
            delta: 0.0,
            is_sequence: false,
            init_bl: true,
            store_opp: true,
            viscous: true,
            keep_open_on_error: false,
        }
    }
}
