//! Blocking client for the RPC server. One call is outstanding at a time.

use crate::error::ServerError;
use crate::protocol::{codec, RequestEnvelope, ResponseEnvelope, Value};
use serde::de::DeserializeOwned;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

pub struct RpcClient {
    ws: WebSocket<TcpStream>,
    next_id: u32,
}

impl RpcClient {
    pub fn connect(addr: SocketAddr) -> Result<Self, ServerError> {
        let stream = TcpStream::connect(addr)?;
        let _ = stream.set_nodelay(true);
        let (ws, _) = tungstenite::client(format!("ws://{addr}"), stream)
            .map_err(|e| ServerError::Handshake(e.to_string()))?;
        Ok(Self { ws, next_id: 0 })
    }

    /// Bounds every read; `None` blocks until the server answers.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ServerError> {
        self.ws.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Calls `procedure` and decodes its result as `T`.
    pub fn call<T: DeserializeOwned>(
        &mut self,
        procedure: &str,
        args: Vec<Value>,
    ) -> Result<T, ServerError> {
        let resp = self.call_raw(procedure, args)?;
        match resp.outcome {
            Ok(value) => Ok(codec::from_value(&value)?),
            Err(err) => Err(ServerError::Call(err)),
        }
    }

    pub fn call_raw(
        &mut self,
        procedure: &str,
        args: Vec<Value>,
    ) -> Result<ResponseEnvelope, ServerError> {
        self.next_id = self.next_id.wrapping_add(1);
        let call_id = self.next_id;
        let req = RequestEnvelope {
            call_id,
            procedure: procedure.to_string(),
            args,
        };
        self.send_bytes(codec::encode_request(&req)?)?;

        loop {
            let resp = self.read_response()?;
            if resp.call_id == call_id {
                return Ok(resp);
            }
            tracing::debug!(expected = call_id, got = resp.call_id, "stale response skipped");
        }
    }

    /// Sends one binary frame as is.
    pub fn send_bytes(&mut self, payload: Vec<u8>) -> Result<(), ServerError> {
        self.ws.send(Message::binary(payload))?;
        Ok(())
    }

    pub fn read_response(&mut self) -> Result<ResponseEnvelope, ServerError> {
        loop {
            match self.ws.read()? {
                Message::Binary(bytes) => return Ok(codec::decode_response(&bytes)?),
                Message::Close(_) => return Err(tungstenite::Error::ConnectionClosed.into()),
                _ => continue,
            }
        }
    }

    pub fn close(mut self) -> Result<(), ServerError> {
        self.ws.close(None)?;
        loop {
            match self.ws.read() {
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(())
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
