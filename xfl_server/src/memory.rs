//! In-memory host used by the headless binary and the tests.
//!
//! Geometry and analysis here are deliberately simple (NACA 4-digit
//! outlines, unit-chord normalization, thin-airfoil coefficients); they stand
//! in for the real design and panel-method code of a full host.

use crate::domain::{AnalysisSettings, Foil, LineStyle, Polar, Project, SequenceType};
use crate::protocol::AppMode;
use crate::xfl_api::XflApi;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

const NACA_HALF_POINTS: usize = 50;
const MAX_SEQUENCE_POINTS: usize = 10_000;

#[derive(Debug, Default)]
pub struct MemoryXfl {
    project: Project,
    foils: Vec<Foil>,
    polars: Vec<Polar>,
    cur_foil: Option<String>,
    cur_polar: Option<(String, String)>,
    settings: AnalysisSettings,
    closed: bool,
    view_updates: u64,
}

impl MemoryXfl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `foil`, replacing any foil with the same name.
    pub fn insert_foil(&mut self, foil: Foil) {
        match self.foils.iter_mut().find(|f| f.name == foil.name) {
            Some(existing) => *existing = foil,
            None => self.foils.push(foil),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn view_updates(&self) -> u64 {
        self.view_updates
    }

    fn load_dat(&mut self, path: &str) -> Result<(), String> {
        let text = fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))?;
        let foil = parse_dat(&text).ok_or_else(|| format!("{path} is not a foil file"))?;
        let name = foil.name.clone();
        self.insert_foil(foil);
        self.cur_foil = Some(name);
        Ok(())
    }
}

impl XflApi for MemoryXfl {
    fn project(&self) -> &Project {
        &self.project
    }

    fn new_project(&mut self) {
        let app = self.project.app;
        self.project = Project {
            app,
            ..Project::default()
        };
        self.foils.clear();
        self.polars.clear();
        self.cur_foil = None;
        self.cur_polar = None;
    }

    fn save_project(&mut self) -> Result<(), String> {
        if self.project.file_name.is_empty() {
            return Err("project has no file name".to_string());
        }
        self.project.saved = true;
        Ok(())
    }

    fn load_project(&mut self, files: &[String]) -> Result<(), String> {
        if files.is_empty() {
            return Err("no files to load".to_string());
        }
        for file in files {
            if file.to_ascii_lowercase().ends_with(".dat") {
                self.load_dat(file)?;
            } else {
                self.set_project_name(file);
                self.project.saved = true;
            }
        }
        Ok(())
    }

    fn set_project_name(&mut self, path: &str) {
        self.project.file_name = path.to_string();
        self.project.project_name = Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
    }

    fn set_app(&mut self, app: AppMode) {
        self.project.app = app;
    }

    fn update_view(&mut self) {
        self.view_updates += 1;
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn foil_names(&self) -> Vec<String> {
        self.foils.iter().map(|f| f.name.clone()).collect()
    }

    fn foil(&self, name: &str) -> Option<&Foil> {
        self.foils.iter().find(|f| f.name == name)
    }

    fn foil_mut(&mut self, name: &str) -> Option<&mut Foil> {
        self.foils.iter_mut().find(|f| f.name == name)
    }

    fn cur_foil_name(&self) -> Option<String> {
        self.cur_foil.clone()
    }

    fn select_foil(&mut self, name: &str) {
        if self.foil(name).is_some() {
            self.cur_foil = Some(name.to_string());
        }
    }

    fn foil_geom(&mut self, name: &str) {
        let Some(foil) = self.foil_mut(name) else { return };
        let points = naca4_points(foil.camber, foil.x_camber, foil.thickness, NACA_HALF_POINTS);
        write_points(foil, &points);
        self.project.saved = false;
    }

    fn normalize_geometry(&mut self, name: &str) {
        let Some(foil) = self.foil_mut(name) else { return };
        normalize(foil);
    }

    fn create_naca_foil(&mut self, digits: u32, name: &str) -> Result<(), String> {
        if digits > 9999 {
            return Err(format!("only 4-digit sections are supported, got {digits}"));
        }
        if self.foil(name).is_some() {
            return Err(format!("a foil named {name} already exists"));
        }
        let mut foil = Foil::new(name);
        foil.camber = f64::from(digits / 1000) / 100.0;
        foil.x_camber = f64::from((digits / 100) % 10) / 10.0;
        foil.thickness = f64::from(digits % 100) / 100.0;
        foil.x_thickness = 0.3;
        let points = naca4_points(foil.camber, foil.x_camber, foil.thickness, NACA_HALF_POINTS);
        write_points(&mut foil, &points);
        self.foils.push(foil);
        self.cur_foil = Some(name.to_string());
        self.project.saved = false;
        Ok(())
    }

    fn duplicate_foil(&mut self, from: &str, to: &str) -> Result<(), String> {
        if self.foil(to).is_some() {
            return Err(format!("a foil named {to} already exists"));
        }
        let mut copy = self
            .foil(from)
            .cloned()
            .ok_or_else(|| format!("no foil named {from}"))?;
        copy.name = to.to_string();
        self.foils.push(copy);
        self.project.saved = false;
        Ok(())
    }

    fn rename_foil(&mut self, name: &str, new_name: &str) -> Result<(), String> {
        if name == new_name {
            return Ok(());
        }
        if self.foil(new_name).is_some() {
            return Err(format!("a foil named {new_name} already exists"));
        }
        let foil = self
            .foil_mut(name)
            .ok_or_else(|| format!("no foil named {name}"))?;
        foil.name = new_name.to_string();
        for polar in self.polars.iter_mut().filter(|p| p.foil_name == name) {
            polar.foil_name = new_name.to_string();
        }
        if self.cur_foil.as_deref() == Some(name) {
            self.cur_foil = Some(new_name.to_string());
        }
        if let Some((foil_name, _)) = self.cur_polar.as_mut() {
            if foil_name == name {
                *foil_name = new_name.to_string();
            }
        }
        self.project.saved = false;
        Ok(())
    }

    fn delete_foil(&mut self, name: &str) {
        self.foils.retain(|f| f.name != name);
        self.polars.retain(|p| p.foil_name != name);
        if self.cur_foil.as_deref() == Some(name) {
            self.cur_foil = None;
        }
        if self.cur_polar.as_ref().is_some_and(|(f, _)| f == name) {
            self.cur_polar = None;
        }
        self.project.saved = false;
    }

    fn show_foil(&mut self, name: &str, visible: bool) {
        if let Some(foil) = self.foil_mut(name) {
            foil.style.visible = visible;
        }
    }

    fn normalize_cur_foil(&mut self) {
        let Some(name) = self.cur_foil.clone() else { return };
        self.normalize_geometry(&name);
    }

    fn derotate_cur_foil(&mut self) {
        let Some(name) = self.cur_foil.clone() else { return };
        if let Some(foil) = self.foil_mut(&name) {
            derotate(foil);
        }
    }

    fn set_foil_style(&mut self, name: &str, style: LineStyle) {
        if let Some(foil) = self.foil_mut(name) {
            foil.style = style;
        }
    }

    fn export_foil(&self, name: &str, path: &Path) -> Result<(), String> {
        let foil = self.foil(name).ok_or_else(|| format!("no foil named {name}"))?;
        fs::write(path, format_dat(foil)).map_err(|e| format!("cannot write {}: {e}", path.display()))
    }

    fn polar_names(&self, foil_name: &str) -> Vec<String> {
        self.polars
            .iter()
            .filter(|p| p.foil_name == foil_name)
            .map(|p| p.name.clone())
            .collect()
    }

    fn polar(&self, foil_name: &str, polar_name: &str) -> Option<&Polar> {
        self.polars
            .iter()
            .find(|p| p.foil_name == foil_name && p.name == polar_name)
    }

    fn cur_polar(&self) -> Option<(String, String)> {
        self.cur_polar.clone()
    }

    fn define_polar(&mut self, polar: Polar) -> Result<(), String> {
        if self.foil(&polar.foil_name).is_none() {
            return Err(format!("no foil named {}", polar.foil_name));
        }
        if polar.name.is_empty() {
            return Err("polar name is empty".to_string());
        }
        let key = (polar.foil_name.clone(), polar.name.clone());
        match self
            .polars
            .iter_mut()
            .find(|p| p.foil_name == polar.foil_name && p.name == polar.name)
        {
            Some(existing) => *existing = polar,
            None => self.polars.push(polar),
        }
        self.cur_foil = Some(key.0.clone());
        self.cur_polar = Some(key);
        self.project.saved = false;
        Ok(())
    }

    fn set_cur_polar(&mut self, foil_name: &str, polar_name: &str) {
        if self.polar(foil_name, polar_name).is_some() {
            self.cur_foil = Some(foil_name.to_string());
            self.cur_polar = Some((foil_name.to_string(), polar_name.to_string()));
        }
    }

    fn analysis_settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    fn set_analysis_settings(&mut self, settings: AnalysisSettings) {
        self.settings = settings;
    }

    fn analyze_cur_polar(&mut self) -> Result<(), String> {
        let (foil_name, polar_name) = self
            .cur_polar
            .clone()
            .ok_or_else(|| "no current polar".to_string())?;
        let (camber, thickness) = self
            .foil(&foil_name)
            .map(|f| (f.camber, f.thickness))
            .ok_or_else(|| format!("no foil named {foil_name}"))?;
        let settings = self.settings.clone();
        let polar = self
            .polars
            .iter_mut()
            .find(|p| p.foil_name == foil_name && p.name == polar_name)
            .ok_or_else(|| format!("no polar named {polar_name}"))?;

        for value in sequence(&settings) {
            let (alpha, reynolds) = match settings.sequence_type {
                SequenceType::Alpha => (value, polar.reynolds),
                SequenceType::Cl => (alpha_for_cl(value, camber), polar.reynolds),
                SequenceType::Reynolds => (polar.aoa, value),
            };
            append_point(polar, alpha, reynolds, camber, thickness, settings.viscous);
        }
        self.project.saved = false;
        Ok(())
    }
}

fn sequence(settings: &AnalysisSettings) -> Vec<f64> {
    if !settings.is_sequence || settings.delta == 0.0 {
        return vec![settings.start];
    }
    let span = settings.end - settings.start;
    if span / settings.delta < 0.0 {
        return vec![settings.start];
    }
    let steps = ((span / settings.delta).floor() as usize).min(MAX_SEQUENCE_POINTS);
    (0..=steps)
        .map(|i| settings.start + settings.delta * i as f64)
        .collect()
}

fn zero_lift_alpha(camber: f64) -> f64 {
    -105.0 * camber
}

fn alpha_for_cl(cl: f64, camber: f64) -> f64 {
    (cl / (2.0 * PI)).to_degrees() + zero_lift_alpha(camber)
}

fn append_point(polar: &mut Polar, alpha: f64, reynolds: f64, camber: f64, thickness: f64, viscous: bool) {
    let cl = 2.0 * PI * (alpha - zero_lift_alpha(camber)).to_radians();
    let cdp = if viscous { 0.004 + 0.02 * thickness } else { 0.0 };
    let cd = cdp + 0.01 * cl * cl;
    let cm = -0.25 * PI * camber * 2.0;
    let xcp = if cl.abs() > 1e-9 { 0.25 - cm / cl } else { 0.25 };

    let r = &mut polar.results;
    // A point is identified by its operating condition; rerunning one replaces it.
    let existing = r
        .alpha
        .iter()
        .zip(&r.re)
        .position(|(a, re)| (*a - alpha).abs() < 1e-9 && (*re - reynolds).abs() < 1e-6);
    if let Some(i) = existing {
        for col in [
            &mut r.alpha, &mut r.cl, &mut r.xcp, &mut r.cd, &mut r.cdp, &mut r.cm, &mut r.xtr1,
            &mut r.xtr2, &mut r.hmom, &mut r.cpmn, &mut r.cl_cd, &mut r.cl32_cd, &mut r.rt_cl,
            &mut r.re,
        ] {
            col.remove(i);
        }
    }
    r.alpha.push(alpha);
    r.cl.push(cl);
    r.xcp.push(xcp);
    r.cd.push(cd);
    r.cdp.push(cdp);
    r.cm.push(cm);
    r.xtr1.push(polar.xtop);
    r.xtr2.push(polar.xbot);
    r.hmom.push(0.0);
    r.cpmn.push(-(1.0 + cl.abs()));
    r.cl_cd.push(if cd > 0.0 { cl / cd } else { 0.0 });
    r.cl32_cd.push(if cd > 0.0 { cl.signum() * cl.abs().powf(1.5) / cd } else { 0.0 });
    r.rt_cl.push(if cl.abs() > 1e-9 { 1.0 / cl.abs().sqrt() } else { 0.0 });
    r.re.push(reynolds);
}

/// NACA 4-digit outline, upper surface from the trailing edge to the leading
/// edge, then lower surface back to the trailing edge.
pub fn naca4_points(camber: f64, x_camber: f64, thickness: f64, half: usize) -> Vec<(f64, f64)> {
    let station = |i: usize| 0.5 * (1.0 - (PI * i as f64 / half as f64).cos());
    let surface = |x: f64, upper: bool| {
        let yt = 5.0
            * thickness
            * (0.2969 * x.sqrt() - 0.1260 * x - 0.3516 * x * x + 0.2843 * x.powi(3)
                - 0.1015 * x.powi(4));
        let (yc, slope) = if camber == 0.0 || x_camber <= 0.0 || x_camber >= 1.0 {
            (0.0, 0.0)
        } else if x < x_camber {
            let p = x_camber;
            (
                camber / (p * p) * (2.0 * p * x - x * x),
                2.0 * camber / (p * p) * (p - x),
            )
        } else {
            let q = 1.0 - x_camber;
            let p = x_camber;
            (
                camber / (q * q) * ((1.0 - 2.0 * p) + 2.0 * p * x - x * x),
                2.0 * camber / (q * q) * (p - x),
            )
        };
        let theta = slope.atan();
        if upper {
            (x - yt * theta.sin(), yc + yt * theta.cos())
        } else {
            (x + yt * theta.sin(), yc - yt * theta.cos())
        }
    };

    let mut points = Vec::with_capacity(2 * half + 1);
    for i in (0..=half).rev() {
        points.push(surface(station(i), true));
    }
    for i in 1..=half {
        points.push(surface(station(i), false));
    }
    points
}

fn write_points(foil: &mut Foil, points: &[(f64, f64)]) {
    let n = points.len().min(foil.capacity());
    for (i, (x, y)) in points.iter().take(n).enumerate() {
        foil.xb[i] = *x;
        foil.yb[i] = *y;
        foil.x[i] = *x;
        foil.y[i] = *y;
    }
    foil.n = n;
}

fn normalize(foil: &mut Foil) {
    let n = foil.n;
    if n < 2 {
        return;
    }
    let (mut x_min, mut x_max) = (f64::MAX, f64::MIN);
    let mut le = 0;
    for i in 0..n {
        if foil.x[i] < x_min {
            x_min = foil.x[i];
            le = i;
        }
        x_max = x_max.max(foil.x[i]);
    }
    let chord = x_max - x_min;
    if chord <= 0.0 {
        return;
    }
    let y_le = foil.y[le];
    for i in 0..n {
        foil.x[i] = (foil.x[i] - x_min) / chord;
        foil.y[i] = (foil.y[i] - y_le) / chord;
        foil.xb[i] = foil.x[i];
        foil.yb[i] = foil.y[i];
    }
}

fn derotate(foil: &mut Foil) {
    let n = foil.n;
    if n < 3 {
        return;
    }
    let le = (0..n)
        .min_by(|a, b| foil.x[*a].total_cmp(&foil.x[*b]))
        .unwrap_or(0);
    let te = (
        0.5 * (foil.x[0] + foil.x[n - 1]),
        0.5 * (foil.y[0] + foil.y[n - 1]),
    );
    let (lx, ly) = (foil.x[le], foil.y[le]);
    let angle = (te.1 - ly).atan2(te.0 - lx);
    let (sin, cos) = (-angle).sin_cos();
    for i in 0..n {
        let (dx, dy) = (foil.x[i] - lx, foil.y[i] - ly);
        foil.x[i] = lx + dx * cos - dy * sin;
        foil.y[i] = ly + dx * sin + dy * cos;
    }
}

fn format_dat(foil: &Foil) -> String {
    let mut out = format!("{}\n", foil.name);
    for (x, y) in foil.points() {
        out.push_str(&format!("{x} {y}\n"));
    }
    out
}

fn parse_dat(text: &str) -> Option<Foil> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let name = lines.next()?;
    let points: Vec<(f64, f64)> = lines
        .filter_map(|line| {
            let mut it = line.split_whitespace().map(|v| v.parse::<f64>());
            match (it.next(), it.next()) {
                (Some(Ok(x)), Some(Ok(y))) => Some((x, y)),
                _ => None,
            }
        })
        .collect();
    if points.len() < 3 {
        return None;
    }
    let mut foil = Foil::new(name);
    write_points(&mut foil, &points);
    Some(foil)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naca_foil_is_created_and_selected() {
        let mut xfl = MemoryXfl::new();
        xfl.create_naca_foil(2412, "NACA 2412").unwrap();
        let foil = xfl.foil("NACA 2412").unwrap();
        assert_eq!(foil.n, 2 * NACA_HALF_POINTS + 1);
        assert!((foil.camber - 0.02).abs() < 1e-12);
        assert!((foil.x_camber - 0.4).abs() < 1e-12);
        assert!((foil.thickness - 0.12).abs() < 1e-12);
        assert_eq!(xfl.cur_foil_name().as_deref(), Some("NACA 2412"));
        assert!(xfl.create_naca_foil(12, "NACA 2412").is_err());
    }

    #[test]
    fn symmetric_section_is_symmetric() {
        let points = naca4_points(0.0, 0.0, 0.12, 20);
        let n = points.len();
        for i in 0..n / 2 {
            let (xu, yu) = points[i];
            let (xl, yl) = points[n - 1 - i];
            assert!((xu - xl).abs() < 1e-12);
            assert!((yu + yl).abs() < 1e-12);
        }
    }

    #[test]
    fn normalize_yields_unit_chord_from_origin() {
        let mut foil = Foil::new("scaled");
        let points: Vec<(f64, f64)> = naca4_points(0.0, 0.0, 0.1, 10)
            .into_iter()
            .map(|(x, y)| (2.0 * x + 1.0, 2.0 * y))
            .collect();
        write_points(&mut foil, &points);
        normalize(&mut foil);
        let xs: Vec<f64> = foil.points().map(|(x, _)| x).collect();
        let min = xs.iter().cloned().fold(f64::MAX, f64::min);
        let max = xs.iter().cloned().fold(f64::MIN, f64::max);
        assert!(min.abs() < 1e-12);
        assert!((max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn derotate_levels_the_chord_line() {
        let mut foil = Foil::new("tilted");
        let angle = 5f64.to_radians();
        let points: Vec<(f64, f64)> = naca4_points(0.0, 0.0, 0.12, 20)
            .into_iter()
            .map(|(x, y)| (x * angle.cos() - y * angle.sin(), x * angle.sin() + y * angle.cos()))
            .collect();
        write_points(&mut foil, &points);
        derotate(&mut foil);
        let n = foil.n;
        let te_y = 0.5 * (foil.y[0] + foil.y[n - 1]);
        assert!(te_y.abs() < 1e-9);
    }

    #[test]
    fn rename_carries_polars_and_selection() {
        let mut xfl = MemoryXfl::new();
        xfl.create_naca_foil(12, "NACA 0012").unwrap();
        xfl.define_polar(Polar::new("T1", "NACA 0012")).unwrap();
        xfl.rename_foil("NACA 0012", "root").unwrap();
        assert!(xfl.polar("root", "T1").is_some());
        assert_eq!(xfl.cur_foil_name().as_deref(), Some("root"));
        assert_eq!(xfl.cur_polar(), Some(("root".to_string(), "T1".to_string())));
    }

    #[test]
    fn analysis_sweep_fills_one_point_per_step() {
        let mut xfl = MemoryXfl::new();
        xfl.create_naca_foil(12, "NACA 0012").unwrap();
        xfl.define_polar(Polar::new("T1", "NACA 0012")).unwrap();
        xfl.set_analysis_settings(AnalysisSettings {
            start: 0.0,
            end: 4.0,
            delta: 1.0,
            is_sequence: true,
            ..AnalysisSettings::default()
        });
        xfl.analyze_cur_polar().unwrap();
        xfl.analyze_cur_polar().unwrap();
        let polar = xfl.polar("NACA 0012", "T1").unwrap();
        assert_eq!(polar.results.alpha, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(polar.results.cl[0].abs() < 1e-12);
        assert!(polar.results.cl[4] > polar.results.cl[1]);
    }

    #[test]
    fn reynolds_sweep_keeps_every_point() {
        let mut xfl = MemoryXfl::new();
        xfl.create_naca_foil(12, "NACA 0012").unwrap();
        let mut polar = Polar::new("T2", "NACA 0012");
        polar.aoa = 2.0;
        xfl.define_polar(polar).unwrap();
        xfl.set_analysis_settings(AnalysisSettings {
            sequence_type: SequenceType::Reynolds,
            start: 100_000.0,
            end: 400_000.0,
            delta: 100_000.0,
            is_sequence: true,
            ..AnalysisSettings::default()
        });
        xfl.analyze_cur_polar().unwrap();
        xfl.analyze_cur_polar().unwrap();
        let polar = xfl.polar("NACA 0012", "T2").unwrap();
        assert_eq!(polar.results.re, vec![100_000.0, 200_000.0, 300_000.0, 400_000.0]);
        assert!(polar.results.alpha.iter().all(|a| (*a - 2.0).abs() < 1e-12));
    }

    #[test]
    fn exported_dat_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("naca4412.dat");
        let mut xfl = MemoryXfl::new();
        xfl.create_naca_foil(4412, "NACA 4412").unwrap();
        xfl.export_foil("NACA 4412", &path).unwrap();
        let original: Vec<(f64, f64)> = xfl.foil("NACA 4412").unwrap().points().collect();

        let mut other = MemoryXfl::new();
        other
            .load_project(&[path.to_string_lossy().to_string()])
            .unwrap();
        let loaded: Vec<(f64, f64)> = other.foil("NACA 4412").unwrap().points().collect();
        assert_eq!(loaded, original);
    }
}
