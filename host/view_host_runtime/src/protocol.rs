use crate::model::Model;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::sync::mpsc::Receiver;

pub const HOST_TO_REMOTE_CAP: usize = 65_536;
pub const REMOTE_TO_HOST_CAP: usize = 1_048_576;

/// Messages the host sends to the remote process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum HostEnvelope {
    #[serde(rename = "ready")]
    Ready { sid: String, capabilities: Value },
    #[serde(rename = "layout-event")]
    LayoutEvent { target: String, data: Vec<Value> },
}

/// Messages the remote process sends to the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum RemoteEnvelope {
    #[serde(rename = "layout-update")]
    LayoutUpdate(LayoutUpdate),
}

impl RemoteEnvelope {
    pub fn event_name(&self) -> &'static str {
        match self {
            RemoteEnvelope::LayoutUpdate(_) => LAYOUT_UPDATE,
        }
    }
}

pub const LAYOUT_UPDATE: &str = "layout-update";

/// A patch: merge `model` into the node found at `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutUpdate {
    #[serde(default)]
    pub path: String,
    pub model: Model,
}

impl LayoutUpdate {
    pub fn new(path: impl Into<String>, model: Model) -> Self {
        Self {
            path: path.into(),
            model,
        }
    }
}

pub fn ready_envelope(sid: String) -> HostEnvelope {
    HostEnvelope::Ready {
        sid,
        capabilities: serde_json::json!({
            "layout": true,
            "transport": "stdio-packet-4"
        }),
    }
}

pub fn event_envelope(target: impl Into<String>, data: Vec<Value>) -> HostEnvelope {
    HostEnvelope::LayoutEvent {
        target: target.into(),
        data,
    }
}

pub fn writer_loop(rx: Receiver<HostEnvelope>) -> io::Result<()> {
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    for envelope in rx {
        let payload = encode_host_envelope(&envelope)?;
        write_frame(&mut writer, &payload, HOST_TO_REMOTE_CAP)?;
        writer.flush()?;
    }

    Ok(())
}

/// Reads frames from stdin until EOF. Undecodable payloads are logged and
/// skipped so a single bad message does not end the session.
pub fn reader_loop<F>(mut on_envelope: F) -> io::Result<()>
where
    F: FnMut(RemoteEnvelope),
{
    let stdin = io::stdin();
    let mut reader = stdin.lock();

    loop {
        match read_frame(&mut reader, REMOTE_TO_HOST_CAP) {
            Ok(payload) => match decode_remote_envelope(&payload) {
                Ok(envelope) => on_envelope(envelope),
                Err(err) => log::warn!("dropping undecodable envelope: {err}"),
            },
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

pub fn encode_host_envelope(envelope: &HostEnvelope) -> io::Result<Vec<u8>> {
    serde_json::to_vec(envelope).map_err(json_error)
}

pub fn decode_remote_envelope(payload: &[u8]) -> io::Result<RemoteEnvelope> {
    serde_json::from_slice(payload).map_err(json_error)
}

pub fn read_frame(reader: &mut impl Read, max_payload: usize) -> io::Result<Vec<u8>> {
    let mut len_buf = [0_u8; 4];
    reader.read_exact(&mut len_buf)?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_payload {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} > {max_payload}"),
        ));
    }

    let mut payload = vec![0_u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

pub fn write_frame(writer: &mut impl Write, payload: &[u8], max_payload: usize) -> io::Result<()> {
    if payload.len() > max_payload {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {} > {}", payload.len(), max_payload),
        ));
    }

    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "payload exceeds u32"))?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

fn json_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
