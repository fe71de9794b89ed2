//! Surface of the host application that owns all live state.
//!
//! Every method is called on the owner thread only. Methods returning
//! `Result<_, String>` report a refusal by the host (bad file, duplicate name,
//! ...); the bridge turns those into `operation_failed` replies.

use crate::domain::{AnalysisSettings, Foil, LineStyle, Polar, Project};
use crate::protocol::AppMode;
use std::path::Path;

pub trait XflApi {
    fn project(&self) -> &Project;
    fn new_project(&mut self);
    fn save_project(&mut self) -> Result<(), String>;
    fn load_project(&mut self, files: &[String]) -> Result<(), String>;
    fn set_project_name(&mut self, path: &str);
    fn set_app(&mut self, app: AppMode);
    fn update_view(&mut self);
    fn close(&mut self);

    /// Foil names in registry order.
    fn foil_names(&self) -> Vec<String>;
    fn foil(&self, name: &str) -> Option<&Foil>;
    fn foil_mut(&mut self, name: &str) -> Option<&mut Foil>;
    /// `None` while the default placeholder shape is active.
    fn cur_foil_name(&self) -> Option<String>;
    fn select_foil(&mut self, name: &str);
    /// Regenerates the foil outline from its camber/thickness parameters.
    fn foil_geom(&mut self, name: &str);
    fn normalize_geometry(&mut self, name: &str);
    fn create_naca_foil(&mut self, digits: u32, name: &str) -> Result<(), String>;
    fn duplicate_foil(&mut self, from: &str, to: &str) -> Result<(), String>;
    fn rename_foil(&mut self, name: &str, new_name: &str) -> Result<(), String>;
    fn delete_foil(&mut self, name: &str);
    fn show_foil(&mut self, name: &str, visible: bool);
    /// Operates on the current foil.
    fn normalize_cur_foil(&mut self);
    /// Operates on the current foil.
    fn derotate_cur_foil(&mut self);
    fn set_foil_style(&mut self, name: &str, style: LineStyle);
    fn export_foil(&self, name: &str, path: &Path) -> Result<(), String>;

    fn polar_names(&self, foil_name: &str) -> Vec<String>;
    fn polar(&self, foil_name: &str, polar_name: &str) -> Option<&Polar>;
    /// `(foil name, polar name)` of the current polar.
    fn cur_polar(&self) -> Option<(String, String)>;
    fn define_polar(&mut self, polar: Polar) -> Result<(), String>;
    fn set_cur_polar(&mut self, foil_name: &str, polar_name: &str);
    fn analysis_settings(&self) -> &AnalysisSettings;
    fn set_analysis_settings(&mut self, settings: AnalysisSettings);
    fn analyze_cur_polar(&mut self) -> Result<(), String>;
}
