//! Name lookup of live foils and polars.
//!
//! An empty name stands for the host's current selection. Reads of the
//! current foil while the default placeholder shape is active resolve to
//! [`FoilRef::Placeholder`]; writes need a real foil and fail instead.

use crate::domain::{Foil, Polar};
use crate::error::CallError;
use crate::xfl_api::XflApi;

const CURRENT_FOIL: &str = "current foil";
const CURRENT_POLAR: &str = "current polar";

#[derive(Debug, Clone, Copy)]
pub enum FoilRef<'a> {
    Live(&'a Foil),
    Placeholder,
}

pub fn resolve_foil<'a>(api: &'a dyn XflApi, name: &str) -> Result<FoilRef<'a>, CallError> {
    if name.is_empty() {
        let Some(current) = api.cur_foil_name() else {
            return Ok(FoilRef::Placeholder);
        };
        return api
            .foil(&current)
            .map(FoilRef::Live)
            .ok_or(CallError::NotFound(current));
    }
    api.foil(name)
        .map(FoilRef::Live)
        .ok_or_else(|| CallError::NotFound(name.to_string()))
}

/// Registry name of the foil a write should target.
pub fn resolve_foil_name(api: &dyn XflApi, name: &str) -> Result<String, CallError> {
    if name.is_empty() {
        return api
            .cur_foil_name()
            .filter(|current| api.foil(current).is_some())
            .ok_or_else(|| CallError::NotFound(CURRENT_FOIL.to_string()));
    }
    if api.foil(name).is_none() {
        return Err(CallError::NotFound(name.to_string()));
    }
    Ok(name.to_string())
}

pub fn resolve_foil_mut<'a>(api: &'a mut dyn XflApi, name: &str) -> Result<&'a mut Foil, CallError> {
    let key = resolve_foil_name(api, name)?;
    match api.foil_mut(&key) {
        Some(foil) => Ok(foil),
        None => Err(CallError::NotFound(key)),
    }
}

/// `(foil name, polar name)` of an existing polar.
pub fn resolve_polar_key(
    api: &dyn XflApi,
    foil_name: &str,
    polar_name: &str,
) -> Result<(String, String), CallError> {
    if polar_name.is_empty() {
        let foil = if foil_name.is_empty() {
            None
        } else {
            Some(resolve_foil_name(api, foil_name)?)
        };
        return api
            .cur_polar()
            .filter(|(f, _)| foil.as_deref().map_or(true, |want| want == f.as_str()))
            .filter(|(f, p)| api.polar(f, p).is_some())
            .ok_or_else(|| CallError::NotFound(CURRENT_POLAR.to_string()));
    }

    let foil = resolve_foil_name(api, foil_name)?;
    if api.polar(&foil, polar_name).is_none() {
        return Err(CallError::NotFound(format!("{polar_name} ({foil})")));
    }
    Ok((foil, polar_name.to_string()))
}

pub fn resolve_polar<'a>(
    api: &'a dyn XflApi,
    foil_name: &str,
    polar_name: &str,
) -> Result<&'a Polar, CallError> {
    let (foil, polar) = resolve_polar_key(api, foil_name, polar_name)?;
    api.polar(&foil, &polar)
        .ok_or_else(|| CallError::NotFound(format!("{polar} ({foil})")))
}
