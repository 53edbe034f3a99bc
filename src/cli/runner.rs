use crate::codec::CompressionCodec;
use crate::config::DataLayerConfig;
use crate::errors::DataError;
use crate::mirror::{FileMirror, LocalMirror};
use std::io::Write;
use std::sync::Arc;

use super::command::Command;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
}

fn open_mirror(config: &DataLayerConfig) -> Result<LocalMirror, DataError> {
    let dir = config.mirror.dir.clone().unwrap_or_else(FileMirror::default_dir);
    Ok(LocalMirror::new(Arc::new(FileMirror::open(dir)?), &config.mirror))
}

fn json_line<T: serde::Serialize>(out: &mut dyn Write, value: &T) -> Result<(), DataError> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Runs `cmd` with human-readable output on stdout.
///
/// # Errors
/// Propagates configuration, mirror and I/O errors.
pub fn run(config: &DataLayerConfig, cmd: Command) -> Result<(), DataError> {
    run_with_format(config, cmd, OutputMode::Human, &mut std::io::stdout().lock())
}

/// # Errors
/// Propagates configuration, mirror and I/O errors.
pub fn run_with_format(
    config: &DataLayerConfig,
    cmd: Command,
    mode: OutputMode,
    out: &mut dyn Write,
) -> Result<(), DataError> {
    match cmd {
        Command::ShowConfig => match mode {
            OutputMode::Json => json_line(out, config),
            OutputMode::Human => {
                write!(out, "{}", config.to_toml_string()?)?;
                Ok(())
            }
        },
        Command::MirrorConversations { user_id } => {
            let list = open_mirror(config)?.conversations(&user_id)?.unwrap_or_default();
            match mode {
                OutputMode::Json => json_line(out, &list),
                OutputMode::Human => {
                    for c in &list {
                        writeln!(
                            out,
                            "{}\t{}\tmessages={}\tupdated={}",
                            c.id,
                            c.title,
                            c.message_count,
                            c.updated_at.to_rfc3339()
                        )?;
                    }
                    writeln!(out, "{} conversation(s) mirrored for {user_id}", list.len())?;
                    Ok(())
                }
            }
        }
        Command::MirrorMessages { conversation_id } => {
            let messages = open_mirror(config)?.messages(&conversation_id)?.unwrap_or_default();
            match mode {
                OutputMode::Json => json_line(out, &messages),
                OutputMode::Human => {
                    for m in &messages {
                        let role = serde_json::to_value(m.role)?;
                        writeln!(out, "{} [{}] {}", m.created_at.to_rfc3339(), role.as_str().unwrap_or("?"), m.content)?;
                    }
                    writeln!(out, "{} message(s) mirrored for {conversation_id}", messages.len())?;
                    Ok(())
                }
            }
        }
        Command::MirrorClear { user_id } => {
            let removed = open_mirror(config)?.clear_user(&user_id)?;
            match mode {
                OutputMode::Json => json_line(out, &serde_json::json!({"action": "cleared", "user": user_id, "conversations": removed})),
                OutputMode::Human => {
                    writeln!(out, "cleared {removed} conversation(s) for {user_id}")?;
                    Ok(())
                }
            }
        }
        Command::Codec { file } => {
            let bytes = std::fs::read(&file)?;
            let text = String::from_utf8_lossy(&bytes);
            let codec = CompressionCodec::new(config.codec.clone());
            let payload = codec.encode(&text);
            let round_trip = codec.decode(&payload)? == text;
            let report = serde_json::json!({
                "file": file.display().to_string(),
                "algorithm": payload.algorithm,
                "originalBytes": payload.original_size_bytes,
                "storedBytes": payload.compressed_size_bytes,
                "ratio": payload.ratio(),
                "roundTrip": round_trip,
            });
            match mode {
                OutputMode::Json => json_line(out, &report),
                OutputMode::Human => {
                    writeln!(
                        out,
                        "{}: {:?} {} -> {} bytes (ratio {:.3}, round trip {})",
                        file.display(),
                        payload.algorithm,
                        payload.original_size_bytes,
                        payload.compressed_size_bytes,
                        payload.ratio(),
                        if round_trip { "ok" } else { "MISMATCH" }
                    )?;
                    Ok(())
                }
            }
        }
    }
}
