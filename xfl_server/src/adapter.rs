//! Field-by-field conversions between live objects and wire snapshots.

use crate::domain::{
    AnalysisSettings, Color, Foil, LineStipple, LineStyle, PointStyle, Polar, PolarResults,
    PolarType, Project, SequenceType,
};
use crate::error::CallError;
use crate::protocol::{
    AnalysisSettingsSnapshot, Coord, FoilSnapshot, LineStyleSnapshot, PolarResultSnapshot,
    PolarSnapshot, PolarSpecSnapshot, ResultColumn, StateSnapshot,
};
use crate::resolver::FoilRef;

pub fn state_snapshot(project: &Project) -> StateSnapshot {
    StateSnapshot {
        project_path: project.file_name.clone(),
        project_name: project.project_name.clone(),
        app: project.app.as_i32(),
        saved: project.saved,
        display: project.display,
    }
}

/// The placeholder shape maps to the all-zero snapshot.
pub fn foil_snapshot(foil: FoilRef<'_>) -> FoilSnapshot {
    match foil {
        FoilRef::Live(foil) => FoilSnapshot {
            name: foil.name.clone(),
            camber: foil.camber,
            camber_x: foil.x_camber,
            thickness: foil.thickness,
            thickness_x: foil.x_thickness,
            n: i32::try_from(foil.n).unwrap_or(i32::MAX),
        },
        FoilRef::Placeholder => FoilSnapshot::default(),
    }
}

pub fn foil_coords(foil: &Foil) -> Vec<Coord> {
    foil.points().map(|(x, y)| Coord::new(x, y)).collect()
}

/// Copies `coords` into both the base and the current buffers.
///
/// Nothing is written when `coords` does not fit.
pub fn apply_coords(foil: &mut Foil, coords: &[Coord]) -> Result<(), CallError> {
    if coords.len() > foil.capacity() {
        return Err(CallError::CapacityExceeded {
            requested: coords.len(),
            capacity: foil.capacity(),
        });
    }
    for (i, c) in coords.iter().enumerate() {
        foil.xb[i] = c.x;
        foil.yb[i] = c.y;
        foil.x[i] = c.x;
        foil.y[i] = c.y;
    }
    foil.n = coords.len();
    Ok(())
}

/// Geometry parameters for `setGeom`. A value of exactly `0.0` means
/// "leave unchanged", so a parameter can never be set to zero this way.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeomUpdate {
    pub camber: f64,
    pub camber_x: f64,
    pub thickness: f64,
    pub thickness_x: f64,
}

pub fn apply_geom(foil: &mut Foil, geom: GeomUpdate) {
    if geom.camber != 0.0 {
        foil.camber = geom.camber;
    }
    if geom.camber_x != 0.0 {
        foil.x_camber = geom.camber_x;
    }
    if geom.thickness != 0.0 {
        foil.thickness = geom.thickness;
    }
    if geom.thickness_x != 0.0 {
        foil.x_thickness = geom.thickness_x;
    }
}

pub fn line_style_snapshot(style: &LineStyle) -> LineStyleSnapshot {
    let Color { r, g, b, a } = style.color;
    LineStyleSnapshot {
        visible: style.visible,
        stipple: style.stipple.as_i32(),
        point_style: style.point_style.as_i32(),
        width: style.width,
        color: vec![r, g, b, a],
        tag: style.tag.clone(),
    }
}

/// Validates every field before touching `style`.
pub fn apply_line_style(style: &mut LineStyle, snap: &LineStyleSnapshot) -> Result<(), CallError> {
    let stipple = LineStipple::from_i32(snap.stipple)
        .ok_or_else(|| CallError::InvalidArgument(format!("stipple {}", snap.stipple)))?;
    let point_style = PointStyle::from_i32(snap.point_style)
        .ok_or_else(|| CallError::InvalidArgument(format!("point style {}", snap.point_style)))?;
    let color = match snap.color.as_slice() {
        [r, g, b] => Color { r: *r, g: *g, b: *b, a: 255 },
        [r, g, b, a] => Color { r: *r, g: *g, b: *b, a: *a },
        other => {
            return Err(CallError::InvalidArgument(format!(
                "color needs 3 or 4 components, got {}",
                other.len()
            )))
        }
    };

    style.visible = snap.visible;
    style.stipple = stipple;
    style.point_style = point_style;
    style.width = snap.width;
    style.color = color;
    style.tag = snap.tag.clone();
    Ok(())
}

pub fn polar_spec_snapshot(polar: &Polar) -> PolarSpecSnapshot {
    PolarSpecSnapshot {
        polar_type: polar.polar_type.as_i32(),
        re_type: polar.re_type,
        ma_type: polar.ma_type,
        aoa: polar.aoa,
        mach: polar.mach,
        ncrit: polar.ncrit,
        xtop: polar.xtop,
        xbot: polar.xbot,
        reynolds: polar.reynolds,
    }
}

pub fn apply_polar_spec(polar: &mut Polar, spec: &PolarSpecSnapshot) -> Result<(), CallError> {
    let polar_type = PolarType::from_i32(spec.polar_type)
        .ok_or_else(|| CallError::InvalidArgument(format!("polar type {}", spec.polar_type)))?;
    polar.polar_type = polar_type;
    polar.re_type = spec.re_type;
    polar.ma_type = spec.ma_type;
    polar.aoa = spec.aoa;
    polar.mach = spec.mach;
    polar.ncrit = spec.ncrit;
    polar.xtop = spec.xtop;
    polar.xbot = spec.xbot;
    polar.reynolds = spec.reynolds;
    Ok(())
}

pub fn polar_result_snapshot(results: &PolarResults) -> PolarResultSnapshot {
    PolarResultSnapshot {
        alpha: results.alpha.clone(),
        cl: results.cl.clone(),
        xcp: results.xcp.clone(),
        cd: results.cd.clone(),
        cdp: results.cdp.clone(),
        cm: results.cm.clone(),
        xtr1: results.xtr1.clone(),
        xtr2: results.xtr2.clone(),
        hmom: results.hmom.clone(),
        cpmn: results.cpmn.clone(),
        cl_cd: results.cl_cd.clone(),
        cl32_cd: results.cl32_cd.clone(),
        rt_cl: results.rt_cl.clone(),
        re: results.re.clone(),
    }
}

pub fn apply_polar_results(results: &mut PolarResults, snap: &PolarResultSnapshot) {
    results.alpha = snap.alpha.clone();
    results.cl = snap.cl.clone();
    results.xcp = snap.xcp.clone();
    results.cd = snap.cd.clone();
    results.cdp = snap.cdp.clone();
    results.cm = snap.cm.clone();
    results.xtr1 = snap.xtr1.clone();
    results.xtr2 = snap.xtr2.clone();
    results.hmom = snap.hmom.clone();
    results.cpmn = snap.cpmn.clone();
    results.cl_cd = snap.cl_cd.clone();
    results.cl32_cd = snap.cl32_cd.clone();
    results.rt_cl = snap.rt_cl.clone();
    results.re = snap.re.clone();
}

/// Keeps only the listed columns; every other column is sent empty.
pub fn select_columns(snap: &mut PolarResultSnapshot, keep: &[ResultColumn]) {
    for column in ResultColumn::ALL {
        if keep.contains(&column) {
            continue;
        }
        let values = match column {
            ResultColumn::Alpha => &mut snap.alpha,
            ResultColumn::Cl => &mut snap.cl,
            ResultColumn::XCp => &mut snap.xcp,
            ResultColumn::Cd => &mut snap.cd,
            ResultColumn::Cdp => &mut snap.cdp,
            ResultColumn::Cm => &mut snap.cm,
            ResultColumn::XTr1 => &mut snap.xtr1,
            ResultColumn::XTr2 => &mut snap.xtr2,
            ResultColumn::HMom => &mut snap.hmom,
            ResultColumn::Cpmn => &mut snap.cpmn,
            ResultColumn::ClCd => &mut snap.cl_cd,
            ResultColumn::Cl32Cd => &mut snap.cl32_cd,
            ResultColumn::RtCl => &mut snap.rt_cl,
            ResultColumn::Re => &mut snap.re,
        };
        values.clear();
    }
}

pub fn polar_snapshot(polar: &Polar) -> PolarSnapshot {
    PolarSnapshot {
        name: polar.name.clone(),
        foil_name: polar.foil_name.clone(),
        spec: polar_spec_snapshot(polar),
        result: polar_result_snapshot(&polar.results),
    }
}

pub fn apply_polar(polar: &mut Polar, snap: &PolarSnapshot) -> Result<(), CallError> {
    apply_polar_spec(polar, &snap.spec)?;
    polar.name = snap.name.clone();
    polar.foil_name = snap.foil_name.clone();
    apply_polar_results(&mut polar.results, &snap.result);
    Ok(())
}

pub fn analysis_settings_snapshot(settings: &AnalysisSettings) -> AnalysisSettingsSnapshot {
    AnalysisSettingsSnapshot {
        sequence_type: settings.sequence_type.as_i32(),
        sequence: (settings.start, settings.end, settings.delta),
        is_sequence: settings.is_sequence,
        init_bl: settings.init_bl,
        store_opp: settings.store_opp,
        viscous: settings.viscous,
        keep_open_on_error: settings.keep_open_on_error,
    }
}

pub fn apply_analysis_settings(
    settings: &mut AnalysisSettings,
    snap: &AnalysisSettingsSnapshot,
) -> Result<(), CallError> {
    let sequence_type = SequenceType::from_i32(snap.sequence_type).ok_or_else(|| {
        CallError::InvalidArgument(format!("sequence type {}", snap.sequence_type))
    })?;
    let (start, end, delta) = snap.sequence;
    settings.sequence_type = sequence_type;
    settings.start = start;
    settings.end = end;
    settings.delta = delta;
    settings.is_sequence = snap.is_sequence;
    settings.init_bl = snap.init_bl;
    settings.store_opp = snap.store_opp;
    settings.viscous = snap.viscous;
    settings.keep_open_on_error = snap.keep_open_on_error;
    Ok(())
}
