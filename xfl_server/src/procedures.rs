//! The remote procedure surface.
//!
//! Arguments are decoded here on the session thread; every read or write
//! of live state happens inside a closure handed to the bridge.

use crate::adapter::{self, GeomUpdate};
use crate::bridge::Bridge;
use crate::dispatcher::{Args, Dispatcher};
use crate::domain::{LineStyle, Polar};
use crate::error::CallError;
use crate::net::StopHandle;
use crate::protocol::{
    codec, AnalysisSettingsSnapshot, AppMode, Coord, FoilSnapshot, LineStyleSnapshot,
    PolarSnapshot, ResultColumn, Value,
};
use crate::resolver::{self, FoilRef};
use crate::xfl_api::XflApi;
use serde::Serialize;
use std::path::PathBuf;

/// Runs `op` on the owner and encodes what it returns.
fn bridged<T, F>(bridge: &Bridge, op: F) -> Result<Value, CallError>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&mut dyn XflApi) -> Result<T, CallError> + Send + 'static,
{
    let out = bridge.invoke(op)?;
    Ok(codec::to_value(&out)?)
}

fn failed(msg: String) -> CallError {
    CallError::OperationFailed(msg)
}

/// Binds every procedure onto `dispatcher`. `exit` uses `stop` to shut the
/// server down after it has replied.
pub fn register_all(dispatcher: &Dispatcher, bridge: &Bridge, stop: StopHandle) {
    register_project(dispatcher, bridge, stop);
    register_foils(dispatcher, bridge);
    register_polars(dispatcher, bridge);
}

fn register_project(dispatcher: &Dispatcher, bridge: &Bridge, stop: StopHandle) {
    dispatcher.bind("ping", |_: &Args<'_>| Ok(Value::Boolean(true)));

    let b = bridge.clone();
    dispatcher.bind("newProject", move |_: &Args<'_>| {
        bridged(&b, |api| {
            api.new_project();
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("saveProject", move |_: &Args<'_>| {
        bridged(&b, |api| api.save_project().map_err(failed))
    });

    let b = bridge.clone();
    dispatcher.bind("loadProject", move |args: &Args<'_>| {
        let files: Vec<String> = args.get(0)?;
        bridged(&b, move |api| api.load_project(&files).map_err(failed))
    });

    let b = bridge.clone();
    dispatcher.bind("getState", move |_: &Args<'_>| {
        bridged(&b, |api| Ok(adapter::state_snapshot(api.project())))
    });

    let b = bridge.clone();
    dispatcher.bind("setProjectPath", move |args: &Args<'_>| {
        let path: String = args.get(0)?;
        bridged(&b, move |api| {
            api.set_project_name(&path);
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("setApp", move |args: &Args<'_>| {
        let mode: i32 = args.get(0)?;
        // Unknown modes and `None` leave the current pane alone.
        let Some(app) = AppMode::from_i32(mode).filter(|m| *m != AppMode::None) else {
            return Ok(Value::Nil);
        };
        bridged(&b, move |api| {
            api.set_app(app);
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("exit", move |_: &Args<'_>| {
        let out = bridged(&b, |api| {
            api.close();
            Ok(())
        })?;
        stop.request();
        Ok(out)
    });
}

fn register_foils(dispatcher: &Dispatcher, bridge: &Bridge) {
    let b = bridge.clone();
    dispatcher.bind("foilExists", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        bridged(&b, move |api| Ok(api.foil(&name).is_some()))
    });

    let b = bridge.clone();
    dispatcher.bind("getFoil", move |args: &Args<'_>| {
        let name: String = args.opt(0)?.unwrap_or_default();
        bridged(&b, move |api| {
            resolver::resolve_foil(api, &name).map(adapter::foil_snapshot)
        })
    });

    let b = bridge.clone();
    dispatcher.bind("foilList", move |_: &Args<'_>| {
        bridged(&b, |api| {
            let foils: Vec<FoilSnapshot> = api
                .foil_names()
                .iter()
                .filter_map(|name| api.foil(name))
                .map(|foil| adapter::foil_snapshot(FoilRef::Live(foil)))
                .collect();
            Ok(foils)
        })
    });

    let b = bridge.clone();
    dispatcher.bind("getFoilCoords", move |args: &Args<'_>| {
        let name: String = args.opt(0)?.unwrap_or_default();
        bridged(&b, move |api| {
            Ok(match resolver::resolve_foil(api, &name)? {
                FoilRef::Live(foil) => adapter::foil_coords(foil),
                FoilRef::Placeholder => Vec::new(),
            })
        })
    });

    let b = bridge.clone();
    dispatcher.bind("setFoilCoords", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        let coords: Vec<Coord> = args.get(1)?;
        bridged(&b, move |api| {
            let foil = resolver::resolve_foil_mut(api, &name)?;
            adapter::apply_coords(foil, &coords)?;
            api.update_view();
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("setGeom", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        let geom = GeomUpdate {
            camber: args.get(1)?,
            camber_x: args.get(2)?,
            thickness: args.get(3)?,
            thickness_x: args.get(4)?,
        };
        bridged(&b, move |api| {
            let key = resolver::resolve_foil_name(api, &name)?;
            let foil = resolver::resolve_foil_mut(api, &key)?;
            adapter::apply_geom(foil, geom);
            api.foil_geom(&key);
            api.normalize_geometry(&key);
            api.update_view();
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("createNACAFoil", move |args: &Args<'_>| {
        let digits: u32 = args.get(0)?;
        let name: String = args.get(1)?;
        if name.is_empty() {
            return Err(CallError::InvalidArgument("foil name is empty".to_string()));
        }
        bridged(&b, move |api| {
            api.create_naca_foil(digits, &name).map_err(failed)?;
            api.update_view();
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("renameFoil", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        let new_name: String = args.get(1)?;
        bridged(&b, move |api| {
            let key = resolver::resolve_foil_name(api, &name)?;
            api.rename_foil(&key, &new_name).map_err(failed)
        })
    });

    let b = bridge.clone();
    dispatcher.bind("selectFoil", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        bridged(&b, move |api| {
            let key = resolver::resolve_foil_name(api, &name)?;
            api.select_foil(&key);
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("duplicateFoil", move |args: &Args<'_>| {
        let from: String = args.get(0)?;
        let to: String = args.get(1)?;
        bridged(&b, move |api| {
            let key = resolver::resolve_foil_name(api, &from)?;
            api.duplicate_foil(&key, &to).map_err(failed)?;
            resolver::resolve_foil(api, &to).map(adapter::foil_snapshot)
        })
    });

    let b = bridge.clone();
    dispatcher.bind("showFoil", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        let visible: bool = args.get(1)?;
        bridged(&b, move |api| {
            let key = resolver::resolve_foil_name(api, &name)?;
            api.show_foil(&key, visible);
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("normalizeFoil", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        bridged(&b, move |api| {
            let key = resolver::resolve_foil_name(api, &name)?;
            api.select_foil(&key);
            api.normalize_cur_foil();
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("derotateFoil", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        bridged(&b, move |api| {
            let key = resolver::resolve_foil_name(api, &name)?;
            api.select_foil(&key);
            api.derotate_cur_foil();
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("exportFoil", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        let path: PathBuf = args.get::<String>(1)?.into();
        bridged(&b, move |api| {
            let key = resolver::resolve_foil_name(api, &name)?;
            api.export_foil(&key, &path).map_err(failed)
        })
    });

    let b = bridge.clone();
    dispatcher.bind("getLineStyle", move |args: &Args<'_>| {
        let name: String = args.opt(0)?.unwrap_or_default();
        bridged(&b, move |api| {
            Ok(match resolver::resolve_foil(api, &name)? {
                FoilRef::Live(foil) => adapter::line_style_snapshot(&foil.style),
                FoilRef::Placeholder => adapter::line_style_snapshot(&LineStyle::default()),
            })
        })
    });

    let b = bridge.clone();
    dispatcher.bind("setLineStyle", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        let snap: LineStyleSnapshot = args.get(1)?;
        bridged(&b, move |api| {
            let foil = resolver::resolve_foil_mut(api, &name)?;
            let key = foil.name.clone();
            let mut style = foil.style.clone();
            adapter::apply_line_style(&mut style, &snap)?;
            api.set_foil_style(&key, style);
            api.update_view();
            Ok(())
        })
    });

    let b = bridge.clone();
    dispatcher.bind("deleteFoil", move |args: &Args<'_>| {
        let name: String = args.get(0)?;
        bridged(&b, move |api| {
            let key = resolver::resolve_foil_name(api, &name)?;
            api.delete_foil(&key);
            api.update_view();
            Ok(())
        })
    });
}

fn register_polars(dispatcher: &Dispatcher, bridge: &Bridge) {
    let b = bridge.clone();
    dispatcher.bind("defineAnalysis", move |args: &Args<'_>| {
        let snap: PolarSnapshot = args.get(0)?;
        if snap.name.is_empty() {
            return Err(CallError::InvalidArgument("polar name is empty".to_string()));
        }
        bridged(&b, move |api| {
            let foil_name = resolver::resolve_foil_name(api, &snap.foil_name)?;
            let mut polar = Polar::new(snap.name.clone(), foil_name.clone());
            adapter::apply_polar_spec(&mut polar, &snap.spec)?;
            api.define_polar(polar).map_err(failed)?;
            resolver::resolve_polar(api, &foil_name, &snap.name).map(adapter::polar_snapshot)
        })
    });

    let b = bridge.clone();
    dispatcher.bind("analyzeCurPolar", move |args: &Args<'_>| {
        let snap: AnalysisSettingsSnapshot = args.get(0)?;
        let columns = match args.opt::<Vec<i32>>(1)? {
            Some(ids) => Some(parse_columns(&ids)?),
            None => None,
        };
        bridged(&b, move |api| {
            let mut settings = api.analysis_settings().clone();
            adapter::apply_analysis_settings(&mut settings, &snap)?;
            api.set_analysis_settings(settings);
            api.analyze_cur_polar().map_err(failed)?;

            let mut out = resolver::resolve_polar(api, "", "").map(adapter::polar_snapshot)?;
            if let Some(columns) = &columns {
                adapter::select_columns(&mut out.result, columns);
            }
            Ok(out)
        })
    });

    let b = bridge.clone();
    dispatcher.bind("setCurPolar", move |args: &Args<'_>| {
        let polar_name: String = args.get(0)?;
        let foil_name: String = args.opt(1)?.unwrap_or_default();
        bridged(&b, move |api| {
            let (foil, polar) = resolver::resolve_polar_key(api, &foil_name, &polar_name)?;
            api.set_cur_polar(&foil, &polar);
            resolver::resolve_polar(api, &foil, &polar).map(adapter::polar_snapshot)
        })
    });

    let b = bridge.clone();
    dispatcher.bind("getPolar", move |args: &Args<'_>| {
        let foil_name: String = args.opt(0)?.unwrap_or_default();
        let polar_name: String = args.opt(1)?.unwrap_or_default();
        bridged(&b, move |api| {
            resolver::resolve_polar(api, &foil_name, &polar_name).map(adapter::polar_snapshot)
        })
    });

    let b = bridge.clone();
    dispatcher.bind("polarList", move |args: &Args<'_>| {
        let foil_name: String = args.opt(0)?.unwrap_or_default();
        bridged(&b, move |api| {
            let foil = resolver::resolve_foil_name(api, &foil_name)?;
            let polars: Vec<PolarSnapshot> = api
                .polar_names(&foil)
                .iter()
                .filter_map(|name| api.polar(&foil, name))
                .map(adapter::polar_snapshot)
                .collect();
            Ok(polars)
        })
    });
}

fn parse_columns(ids: &[i32]) -> Result<Vec<ResultColumn>, CallError> {
    ids.iter()
        .map(|&id| {
            ResultColumn::from_i32(id)
                .ok_or_else(|| CallError::InvalidArgument(format!("result column {id}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryXfl;
    use crate::protocol::{ErrorKind, RequestEnvelope, StateSnapshot};
    use std::thread;

    struct Harness {
        dispatcher: Dispatcher,
        bridge: Bridge,
        stop: StopHandle,
        owner: Option<thread::JoinHandle<MemoryXfl>>,
        next_id: u32,
    }

    impl Harness {
        fn new() -> Self {
            let (bridge, mut owner) = Bridge::channel(16);
            let owner = thread::spawn(move || {
                let mut xfl = MemoryXfl::new();
                owner.run(&mut xfl);
                xfl
            });
            let dispatcher = Dispatcher::new();
            let stop = StopHandle::default();
            register_all(&dispatcher, &bridge, stop.clone());
            Self {
                dispatcher,
                bridge,
                stop,
                owner: Some(owner),
                next_id: 0,
            }
        }

        fn call(&mut self, procedure: &str, args: Vec<Value>) -> Result<Value, crate::protocol::RpcError> {
            self.next_id += 1;
            let req = RequestEnvelope {
                call_id: self.next_id,
                procedure: procedure.to_string(),
                args,
            };
            let resp = self.dispatcher.dispatch(&req);
            assert_eq!(resp.call_id, self.next_id);
            resp.outcome
        }

        fn finish(mut self) -> MemoryXfl {
            self.bridge.stop();
            self.owner.take().unwrap().join().unwrap()
        }
    }

    fn kind(outcome: Result<Value, crate::protocol::RpcError>) -> ErrorKind {
        outcome.unwrap_err().kind
    }

    #[test]
    fn every_listed_procedure_is_bound() {
        let h = Harness::new();
        for name in [
            "ping", "newProject", "saveProject", "loadProject", "getState", "setProjectPath",
            "setApp", "foilExists", "getFoil", "foilList", "getFoilCoords", "setFoilCoords",
            "setGeom", "renameFoil", "selectFoil", "duplicateFoil", "showFoil", "normalizeFoil",
            "derotateFoil", "exportFoil", "getLineStyle", "setLineStyle", "defineAnalysis",
            "analyzeCurPolar", "setCurPolar", "getPolar", "deleteFoil", "exit",
            "createNACAFoil", "polarList",
        ] {
            assert!(h.dispatcher.is_bound(name), "{name} is not bound");
        }
        h.finish();
    }

    #[test]
    fn set_app_ignores_none_and_unknown_modes() {
        let mut h = Harness::new();
        h.call("setApp", vec![Value::from(2)]).unwrap();
        h.call("setApp", vec![Value::from(0)]).unwrap();
        h.call("setApp", vec![Value::from(99)]).unwrap();
        let state: StateSnapshot = codec::from_value(&h.call("getState", vec![]).unwrap()).unwrap();
        assert_eq!(state.app, AppMode::DirectDesign.as_i32());
        h.finish();
    }

    #[test]
    fn set_geom_treats_zero_as_unchanged() {
        let mut h = Harness::new();
        h.call("createNACAFoil", vec![Value::from(2412), Value::from("F")]).unwrap();
        h.call(
            "setGeom",
            vec![
                Value::from("F"),
                Value::from(0.0),
                Value::from(0.0),
                Value::from(0.15),
                Value::from(0.0),
            ],
        )
        .unwrap();

        let foil: FoilSnapshot =
            codec::from_value(&h.call("getFoil", vec![Value::from("F")]).unwrap()).unwrap();
        assert!((foil.camber - 0.02).abs() < 1e-12);
        assert!((foil.camber_x - 0.4).abs() < 1e-12);
        assert!((foil.thickness - 0.15).abs() < 1e-12);
        assert!(foil.n > 0);

        let xfl = h.finish();
        let coords = adapter::foil_coords(xfl.foil("F").unwrap());
        let xmax = coords.iter().map(|c| c.x).fold(f64::MIN, f64::max);
        let xmin = coords.iter().map(|c| c.x).fold(f64::MAX, f64::min);
        assert!((xmax - 1.0).abs() < 1e-9);
        assert!(xmin.abs() < 1e-9);
    }

    #[test]
    fn set_foil_coords_updates_the_view_and_respects_capacity() {
        let mut h = Harness::new();
        h.call("createNACAFoil", vec![Value::from(12), Value::from("F")]).unwrap();
        let square = codec::to_value(&vec![
            Coord::new(1.0, 0.0),
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
        ])
        .unwrap();
        h.call("setFoilCoords", vec![Value::from("F"), square.clone()]).unwrap();
        assert_eq!(h.call("getFoilCoords", vec![Value::from("F")]).unwrap(), square);

        let too_many: Vec<Coord> = (0..605).map(|i| Coord::new(i as f64, 0.0)).collect();
        let err = h.call(
            "setFoilCoords",
            vec![Value::from("F"), codec::to_value(&too_many).unwrap()],
        );
        assert_eq!(kind(err), ErrorKind::CapacityExceeded);
        assert_eq!(h.call("getFoilCoords", vec![Value::from("F")]).unwrap(), square);

        let xfl = h.finish();
        assert!(xfl.view_updates() >= 1);
    }

    #[test]
    fn polar_definition_and_analysis() {
        let mut h = Harness::new();
        h.call("createNACAFoil", vec![Value::from(2412), Value::from("F")]).unwrap();

        let spec = PolarSnapshot {
            name: "T1 Re 200k".to_string(),
            ..PolarSnapshot::default()
        };
        let defined: PolarSnapshot = codec::from_value(
            &h.call("defineAnalysis", vec![codec::to_value(&spec).unwrap()]).unwrap(),
        )
        .unwrap();
        assert_eq!(defined.foil_name, "F");
        assert!(defined.result.alpha.is_empty());

        let settings = AnalysisSettingsSnapshot {
            sequence: (0.0, 4.0, 1.0),
            is_sequence: true,
            ..AnalysisSettingsSnapshot::default()
        };
        let analyzed: PolarSnapshot = codec::from_value(
            &h.call(
                "analyzeCurPolar",
                vec![
                    codec::to_value(&settings).unwrap(),
                    Value::Array(vec![Value::from(0), Value::from(1)]),
                ],
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(analyzed.result.alpha.len(), 5);
        assert_eq!(analyzed.result.cl.len(), 5);
        assert!(analyzed.result.cd.is_empty());

        let full: PolarSnapshot = codec::from_value(
            &h.call("getPolar", vec![Value::from("F"), Value::from("T1 Re 200k")]).unwrap(),
        )
        .unwrap();
        assert_eq!(full.result.cd.len(), 5);

        let list = h.call("polarList", vec![]).unwrap();
        assert_eq!(list.as_array().map(Vec::len), Some(1));

        assert_eq!(
            kind(h.call("getPolar", vec![Value::from("F"), Value::from("nope")])),
            ErrorKind::NotFound
        );
        assert_eq!(
            kind(h.call(
                "analyzeCurPolar",
                vec![codec::to_value(&settings).unwrap(), Value::Array(vec![Value::from(40)])],
            )),
            ErrorKind::InvalidArgument
        );
        h.finish();
    }

    #[test]
    fn line_style_round_trips_through_calls() {
        let mut h = Harness::new();
        h.call("createNACAFoil", vec![Value::from(12), Value::from("F")]).unwrap();
        let style = LineStyleSnapshot {
            visible: false,
            stipple: 2,
            point_style: 5,
            width: 3,
            color: vec![10, 20, 30, 40],
            tag: "wing root".to_string(),
        };
        h.call("setLineStyle", vec![Value::from("F"), codec::to_value(&style).unwrap()])
            .unwrap();
        let back: LineStyleSnapshot =
            codec::from_value(&h.call("getLineStyle", vec![Value::from("F")]).unwrap()).unwrap();
        assert_eq!(back, style);
        h.finish();
    }

    #[test]
    fn missing_names_and_bad_arguments() {
        let mut h = Harness::new();
        assert_eq!(kind(h.call("getFoil", vec![Value::from("missing")])), ErrorKind::NotFound);
        assert_eq!(kind(h.call("renameFoil", vec![Value::from("missing"), Value::from("x")])), ErrorKind::NotFound);
        assert_eq!(kind(h.call("deleteFoil", vec![Value::from("")])), ErrorKind::NotFound);
        assert_eq!(kind(h.call("setGeom", vec![Value::from("x")])), ErrorKind::InvalidArgument);
        assert_eq!(kind(h.call("saveProject", vec![])), ErrorKind::OperationFailed);
        assert_eq!(h.call("foilExists", vec![Value::from("missing")]).unwrap(), Value::Boolean(false));
        h.finish();
    }

    #[test]
    fn exit_closes_the_owner_then_requests_stop() {
        let mut h = Harness::new();
        assert!(!h.stop.is_requested());
        assert_eq!(h.call("exit", vec![]).unwrap(), Value::Nil);
        assert!(h.stop.is_requested());
        let xfl = h.finish();
        assert!(xfl.is_closed());
    }
}
