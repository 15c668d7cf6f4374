// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use recad_core::{ModelState, RecadError};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

/// Checkpoint schema version; readers accept only this one.
pub const CURRENT_CHECKPOINT_SCHEMA_VERSION: u32 = 1;
/// File name of the best checkpoint inside a setting directory.
pub const CHECKPOINT_FILE_NAME: &str = "checkpoint.json";

/// On-disk checkpoint: metadata plus a CRC-protected JSON model state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEnvelope {
    pub model_tag: String,
    pub state_schema_version: u32,
    pub engine_fingerprint: String,
    pub created_at_ns: u64,
    /// Epoch (1-based) whose weights are stored.
    pub epoch: usize,
    pub validation_loss: f64,
    pub payload_crc32: u32,
    pub payload: String,
}

impl CheckpointEnvelope {
    fn validate_metadata(&self) -> Result<(), RecadError> {
        if self.state_schema_version != CURRENT_CHECKPOINT_SCHEMA_VERSION {
            return Err(RecadError::checkpoint_load(format!(
                "checkpoint state_schema_version={} is unsupported; expected {}",
                self.state_schema_version, CURRENT_CHECKPOINT_SCHEMA_VERSION
            )));
        }
        if self.model_tag.trim().is_empty() {
            return Err(RecadError::checkpoint_load(
                "checkpoint model_tag must be non-empty",
            ));
        }
        if !self.validation_loss.is_finite() {
            return Err(RecadError::checkpoint_load(format!(
                "checkpoint validation_loss must be finite; got {}",
                self.validation_loss
            )));
        }
        Ok(())
    }

    fn verify_payload_crc32(&self) -> Result<(), RecadError> {
        let observed = crc32fast::hash(self.payload.as_bytes());
        if observed != self.payload_crc32 {
            return Err(RecadError::checkpoint_load(format!(
                "checkpoint payload crc32 mismatch: expected=0x{:08x}, observed=0x{:08x}",
                self.payload_crc32, observed
            )));
        }
        Ok(())
    }
}

fn checkpoint_engine_fingerprint() -> String {
    format!(
        "recad-train/{}/{}-{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Nanoseconds since the UNIX epoch, or 0 when the clock cannot say.
fn now_unix_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| u64::try_from(elapsed.as_nanos()).ok())
        .unwrap_or_default()
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> RecadError {
    RecadError::io(format!("{action} '{}': {err}", path.display()))
}

fn write_checkpoint_file_atomic(path: &Path, encoded: &[u8]) -> Result<(), RecadError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            RecadError::invalid_input(format!(
                "checkpoint path '{}' must include a file name",
                path.display()
            ))
        })?;

    let temp_path = parent.join(format!(
        "{file_name}.tmp-{}-{}",
        process::id(),
        now_unix_ns()
    ));

    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp_path)
        .map_err(|err| io_error("failed creating checkpoint temp file", &temp_path, err))?;

    let written = file
        .write_all(encoded)
        .map_err(|err| io_error("failed writing checkpoint temp file", &temp_path, err))
        .and_then(|()| {
            file.sync_all()
                .map_err(|err| io_error("failed fsync on checkpoint temp file", &temp_path, err))
        })
        .and_then(|()| {
            std::fs::rename(&temp_path, path)
                .map_err(|err| io_error("failed renaming checkpoint temp file", path, err))
        });
    if written.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    written
}

/// Wraps a model state into a checksummed envelope.
pub fn checkpoint_envelope(
    state: &ModelState,
    epoch: usize,
    validation_loss: f64,
) -> Result<CheckpointEnvelope, RecadError> {
    if state.tag.trim().is_empty() {
        return Err(RecadError::invalid_input(
            "checkpoint model_tag must be non-empty",
        ));
    }
    if !validation_loss.is_finite() {
        return Err(RecadError::invalid_input(format!(
            "checkpoint validation_loss must be finite; got {validation_loss}"
        )));
    }
    let payload = serde_json::to_string(state).map_err(|err| {
        RecadError::invalid_input(format!("checkpoint payload serialization failed: {err}"))
    })?;
    Ok(CheckpointEnvelope {
        model_tag: state.tag.clone(),
        state_schema_version: CURRENT_CHECKPOINT_SCHEMA_VERSION,
        engine_fingerprint: checkpoint_engine_fingerprint(),
        created_at_ns: now_unix_ns(),
        epoch,
        validation_loss,
        payload_crc32: crc32fast::hash(payload.as_bytes()),
        payload,
    })
}

pub fn encode_checkpoint_envelope(envelope: &CheckpointEnvelope) -> Result<Vec<u8>, RecadError> {
    serde_json::to_vec_pretty(envelope).map_err(|err| {
        RecadError::invalid_input(format!("checkpoint envelope serialization failed: {err}"))
    })
}

/// Parses envelope bytes and verifies metadata and payload checksum.
pub fn decode_checkpoint_envelope(encoded: &[u8]) -> Result<CheckpointEnvelope, RecadError> {
    let envelope: CheckpointEnvelope = serde_json::from_slice(encoded).map_err(|err| {
        RecadError::checkpoint_load(format!("checkpoint envelope JSON parse failed: {err}"))
    })?;
    envelope.validate_metadata()?;
    envelope.verify_payload_crc32()?;
    Ok(envelope)
}

/// Extracts the model state after checking it belongs to `expected_tag`.
pub fn state_from_envelope(
    envelope: &CheckpointEnvelope,
    expected_tag: &str,
) -> Result<ModelState, RecadError> {
    envelope.validate_metadata()?;
    envelope.verify_payload_crc32()?;
    if envelope.model_tag != expected_tag {
        return Err(RecadError::checkpoint_load(format!(
            "checkpoint model mismatch: expected='{expected_tag}', found='{}'",
            envelope.model_tag
        )));
    }
    let state: ModelState = serde_json::from_str(&envelope.payload).map_err(|err| {
        RecadError::checkpoint_load(format!("checkpoint payload deserialization failed: {err}"))
    })?;
    if state.tag != envelope.model_tag {
        return Err(RecadError::checkpoint_load(format!(
            "checkpoint payload tag '{}' disagrees with envelope tag '{}'",
            state.tag, envelope.model_tag
        )));
    }
    Ok(state)
}

/// Writes a checkpoint to `path` atomically (tmp + fsync + rename).
pub fn save_checkpoint(
    path: impl AsRef<Path>,
    state: &ModelState,
    epoch: usize,
    validation_loss: f64,
) -> Result<CheckpointEnvelope, RecadError> {
    let path = path.as_ref();
    let envelope = checkpoint_envelope(state, epoch, validation_loss)?;
    let encoded = encode_checkpoint_envelope(&envelope)?;
    write_checkpoint_file_atomic(path, &encoded)?;
    tracing::debug!(
        path = %path.display(),
        epoch,
        validation_loss,
        "saved checkpoint"
    );
    Ok(envelope)
}

/// Reads and verifies the checkpoint at `path`.
pub fn read_checkpoint(path: impl AsRef<Path>) -> Result<CheckpointEnvelope, RecadError> {
    let path = path.as_ref();
    let encoded = std::fs::read(path).map_err(|err| {
        RecadError::checkpoint_load(format!(
            "failed reading checkpoint file '{}': {err}",
            path.display()
        ))
    })?;
    decode_checkpoint_envelope(&encoded)
}

/// Loads the model state stored at `path` for a model tagged `expected_tag`.
pub fn load_checkpoint(
    path: impl AsRef<Path>,
    expected_tag: &str,
) -> Result<ModelState, RecadError> {
    let envelope = read_checkpoint(path)?;
    state_from_envelope(&envelope, expected_tag)
}
