//! A `Write` adapter that tracks generated line/column as bytes pass through
//! it and records mappings back to original source positions, producing a
//! JSON source map (v3) via `oxc_sourcemap`.
//!
//! Mirrors the line/column-aware bookkeeping the teacher's `Flattener` keeps
//! in its `Updates` map while concatenating sources (`flatten.rs`), adapted
//! here to drive an actual source-map emitter rather than in-place text
//! edits.

use crate::error::{Error, Result};
use oxc_sourcemap::SourceMapBuilder;
use std::io::Write;

/// Wraps an underlying writer, recording a source-map token at the start of each
/// `record_position` call for whatever bytes are written next, until the following call.
pub struct MappingWriter<W> {
    inner: W,
    builder: Option<SourceMapBuilder>,
    generated_line: u32,
    generated_column: u32,
    source_ids: std::collections::HashMap<String, u32>,
}

impl<W: Write> MappingWriter<W> {
    /// `emit_source_map` toggles whether mappings are actually recorded; when `false`
    /// this is a pass-through writer with negligible overhead.
    pub fn new(inner: W, emit_source_map: bool) -> Self {
        Self {
            inner,
            builder: emit_source_map.then(SourceMapBuilder::default),
            generated_line: 0,
            generated_column: 0,
            source_ids: std::collections::HashMap::new(),
        }
    }

    /// Records that the next bytes written correspond to `original_line`:`original_column`
    /// in `original_file` (already relativized per spec §4.4's callback rules).
    pub fn record_position(&mut self, original_file: &str, original_line: u32, original_column: u32) {
        let Some(builder) = self.builder.as_mut() else { return };
        let source_id = *self
            .source_ids
            .entry(original_file.to_string())
            .or_insert_with(|| builder.add_source(original_file));
        builder.add_token(
            self.generated_line,
            self.generated_column,
            original_line.saturating_sub(1),
            original_column.saturating_sub(1),
            Some(source_id),
            None,
        );
    }

    /// Finalizes the map (if source-map emission was requested) and hands back the
    /// wrapped writer so the caller can append the trailing
    /// `//# sourceMappingURL=...` comment itself.
    pub fn finish(self) -> (W, Option<String>) {
        let json = self.builder.map(|builder| builder.into_sourcemap().to_json_string());
        (self.inner, json)
    }
}

impl<W: Write> Write for MappingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        for &byte in &buf[..written] {
            if byte == b'\n' {
                self.generated_line += 1;
                self.generated_column = 0;
            } else {
                self.generated_column += 1;
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Writes `map_json` to `map_path` and returns the trailing comment line referencing it
/// by base name, per spec §4.4/§6.
pub fn write_map_file(map_path: &std::path::Path, map_json: &str) -> Result<String> {
    crate::utils::create_parent_dir_all(map_path)?;
    std::fs::write(map_path, map_json).map_err(|err| Error::io(err, map_path))?;
    let base_name = map_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    Ok(format!("//# sourceMappingURL={base_name}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through_tracks_line_and_column() {
        let mut writer = MappingWriter::new(Vec::new(), false);
        writer.write_all(b"abc\ndef").unwrap();
        assert_eq!(writer.generated_line, 1);
        assert_eq!(writer.generated_column, 3);
    }

    #[test]
    fn disabled_source_map_finishes_to_none() {
        let writer = MappingWriter::new(Vec::new(), false);
        let (_inner, json) = writer.finish();
        assert!(json.is_none());
    }
}
