//! Procedure registry.
//!
//! Handlers run on the session thread that read the request. They decode
//! their own arguments and reach owner state only through a
//! [`Bridge`](crate::bridge::Bridge) they captured at bind time.

use crate::error::CallError;
use crate::protocol::{codec, RequestEnvelope, ResponseEnvelope, Value};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub type Handler = Arc<dyn Fn(&Args<'_>) -> Result<Value, CallError> + Send + Sync>;

/// Positional arguments of one request.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Required argument `index`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, CallError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| CallError::InvalidArgument(format!("missing argument {index}")))?;
        decode_arg(index, value)
    }

    /// Optional argument `index`; absent and nil both read as `None`.
    pub fn opt<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, CallError> {
        match self.values.get(index) {
            None | Some(Value::Nil) => Ok(None),
            Some(value) => decode_arg(index, value).map(Some),
        }
    }
}

fn decode_arg<T: DeserializeOwned>(index: usize, value: &Value) -> Result<T, CallError> {
    codec::from_value(value)
        .map_err(|e| CallError::InvalidArgument(format!("argument {index}: {e}")))
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<String, Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`. Binding a name again replaces the
    /// previous handler.
    pub fn bind<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Args<'_>) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        let name = name.into();
        let Ok(mut handlers) = self.handlers.write() else {
            tracing::error!(procedure = %name, "handler table poisoned, bind ignored");
            return;
        };
        if handlers.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::debug!(procedure = %name, "handler replaced");
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(name))
            .unwrap_or(false)
    }

    pub fn procedures(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .map(|handlers| handlers.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Runs the handler for `req` and correlates the outcome with its call id.
    pub fn dispatch(&self, req: &RequestEnvelope) -> ResponseEnvelope {
        let outcome = self.call(req).map_err(|e| {
            tracing::warn!(procedure = %req.procedure, call_id = req.call_id, error = %e, "call failed");
            e.to_wire()
        });
        ResponseEnvelope {
            call_id: req.call_id,
            outcome,
        }
    }

    fn call(&self, req: &RequestEnvelope) -> Result<Value, CallError> {
        // The lock is released before the handler runs so a slow call never
        // blocks `bind`.
        let handler = self
            .handlers
            .read()
            .map_err(|_| CallError::Internal("handler table poisoned".to_string()))?
            .get(&req.procedure)
            .cloned()
            .ok_or_else(|| CallError::UnknownProcedure(req.procedure.clone()))?;
        handler(&Args::new(&req.args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorKind;

    fn request(call_id: u32, procedure: &str, args: Vec<Value>) -> RequestEnvelope {
        RequestEnvelope {
            call_id,
            procedure: procedure.to_string(),
            args,
        }
    }

    #[test]
    fn response_carries_the_call_id() {
        let dispatcher = Dispatcher::new();
        dispatcher.bind("ping", |_| Ok(Value::Boolean(true)));

        let resp = dispatcher.dispatch(&request(41, "ping", vec![]));
        assert_eq!(resp.call_id, 41);
        assert_eq!(resp.outcome, Ok(Value::Boolean(true)));
    }

    #[test]
    fn rebinding_replaces_the_handler() {
        let dispatcher = Dispatcher::new();
        dispatcher.bind("ping", |_| Ok(Value::from("first")));
        dispatcher.bind("ping", |_| Ok(Value::from("second")));

        for call_id in 0..3 {
            let resp = dispatcher.dispatch(&request(call_id, "ping", vec![]));
            assert_eq!(resp.outcome, Ok(Value::from("second")));
        }
        assert_eq!(dispatcher.procedures(), vec!["ping".to_string()]);
    }

    #[test]
    fn unknown_procedure_is_a_per_call_error() {
        let dispatcher = Dispatcher::new();
        let resp = dispatcher.dispatch(&request(5, "fly", vec![]));
        assert_eq!(resp.call_id, 5);
        let err = resp.outcome.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownProcedure);
        assert!(err.message.contains("fly"));
    }

    #[test]
    fn arguments_are_positional() {
        let values = vec![Value::from("NACA 0012"), Value::from(0.5), Value::Nil];
        let args = Args::new(&values);

        assert_eq!(args.get::<String>(0).unwrap(), "NACA 0012");
        assert_eq!(args.get::<f64>(1).unwrap(), 0.5);
        assert_eq!(args.opt::<String>(2).unwrap(), None);
        assert_eq!(args.opt::<String>(3).unwrap(), None);
        assert!(matches!(args.get::<f64>(3), Err(CallError::InvalidArgument(_))));
        assert!(matches!(args.get::<bool>(0), Err(CallError::InvalidArgument(_))));
    }

    #[test]
    fn handler_errors_become_wire_errors() {
        let dispatcher = Dispatcher::new();
        dispatcher.bind("getFoil", |args| {
            let name: String = args.get(0)?;
            Err(CallError::NotFound(name))
        });

        let err = dispatcher
            .dispatch(&request(1, "getFoil", vec![Value::from("missing")]))
            .outcome
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = dispatcher
            .dispatch(&request(2, "getFoil", vec![]))
            .outcome
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }
}
