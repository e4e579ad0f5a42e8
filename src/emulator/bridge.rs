//! Line-delimited JSON link to an external emulator process.
//!
//! Each request is one JSON object per line; each reply is one JSON object
//! per line with `"ok": true|false`.
//!
//! ```text
//! -> {"op":"read","start":49152,"len":8192}
//! <- {"ok":true,"bytes":[0,0,...]}
//! -> {"op":"press","button":"up"}
//! <- {"ok":true}
//! ```

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use serde_json::{json, Value};

use crate::core::error::{PilotError, Result};
use crate::emulator::{Button, Emulator};

pub struct BridgeEmulator {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl BridgeEmulator {
    pub fn connect(addr: &str, io_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| PilotError::Bridge(format!("connect {addr}: {e}")))?;
        stream.set_read_timeout(Some(io_timeout))?;
        stream.set_write_timeout(Some(io_timeout))?;
        stream.set_nodelay(true)?;
        let writer = stream.try_clone()?;
        tracing::info!(addr, "Connected to emulator bridge");
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    fn request(&mut self, req: Value) -> Result<Value> {
        let line = format!("{req}\n");
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;

        let mut resp_line = String::new();
        let n = self.reader.read_line(&mut resp_line)?;
        if n == 0 {
            return Err(PilotError::Bridge("bridge connection closed".into()));
        }
        let v: Value = serde_json::from_str(resp_line.trim())?;
        check_ok(&v)?;
        Ok(v)
    }
}

fn check_ok(v: &Value) -> Result<()> {
    if v.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    let reason = v
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("bridge reported failure");
    Err(PilotError::Emulator(reason.to_string()))
}

fn decode_bytes(v: &Value, expected: u16) -> Result<Vec<u8>> {
    let arr = v
        .get("bytes")
        .and_then(Value::as_array)
        .ok_or_else(|| PilotError::Bridge("missing bytes in read response".into()))?;
    let bytes = arr
        .iter()
        .map(|b| {
            b.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| PilotError::Bridge(format!("non-byte value in read response: {b}")))
        })
        .collect::<Result<Vec<u8>>>()?;
    if bytes.len() != expected as usize {
        return Err(PilotError::Bridge(format!(
            "read returned {} bytes, expected {expected}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

impl Emulator for BridgeEmulator {
    fn read_range(&mut self, start: u16, len: u16) -> Result<Vec<u8>> {
        let v = self.request(json!({ "op": "read", "start": start, "len": len }))?;
        decode_bytes(&v, len)
    }

    fn press(&mut self, button: Button) -> Result<()> {
        self.request(json!({ "op": "press", "button": button.as_str() }))?;
        Ok(())
    }

    fn release(&mut self, button: Button) -> Result<()> {
        self.request(json!({ "op": "release", "button": button.as_str() }))?;
        Ok(())
    }

    fn advance(&mut self, frames: u32) -> Result<()> {
        self.request(json!({ "op": "advance", "frames": frames }))?;
        Ok(())
    }
}
