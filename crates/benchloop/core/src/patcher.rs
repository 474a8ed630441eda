//! Replaces the marked program region of a design source file.
//!
//! The file is read as `prefix START region END suffix`, where `START` is
//! the first occurrence of the start marker and `END` the first occurrence
//! of the end marker after it. Only `region` changes. Writes go through a
//! temp file in the same directory and a rename, so a failure at any point
//! leaves the original bytes in place.

use std::io::Write;
use std::ops::Range;
use std::path::Path;

use benchloop_types::PatchTarget;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Marker, PatchError, PatchResult};

/// Indentation of each entry inside the region.
pub const ENTRY_INDENT: &str = "    ";
/// Indentation of the end marker's line.
pub const CLOSING_INDENT: &str = "  ";

/// Byte ranges of a parsed source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkedRegion {
    /// Start marker, including the marker text.
    pub start: Range<usize>,
    /// Text between the markers.
    pub region: Range<usize>,
    /// End marker, including the marker text.
    pub end: Range<usize>,
}

impl MarkedRegion {
    pub fn prefix<'a>(&self, content: &'a str) -> &'a str {
        &content[..self.start.end]
    }

    pub fn body<'a>(&self, content: &'a str) -> &'a str {
        &content[self.region.clone()]
    }

    pub fn suffix<'a>(&self, content: &'a str) -> &'a str {
        &content[self.end.start..]
    }
}

/// What a successful patch did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchOutcome {
    /// False when the file already held exactly this content.
    pub changed: bool,
    pub entries: usize,
    pub bytes_written: usize,
}

/// Locate the marker pair in `content`.
pub fn parse_region(
    content: &str,
    start_marker: &str,
    end_marker: &str,
    path: &Path,
) -> PatchResult<MarkedRegion> {
    let missing = |marker, text: &str| PatchError::MarkerNotFound {
        marker,
        text: text.to_string(),
        path: path.to_path_buf(),
    };

    let start_at = content
        .find(start_marker)
        .ok_or_else(|| missing(Marker::Start, start_marker))?;
    let region_at = start_at + start_marker.len();
    let end_at = content[region_at..]
        .find(end_marker)
        .map(|offset| region_at + offset)
        .ok_or_else(|| missing(Marker::End, end_marker))?;

    Ok(MarkedRegion {
        start: start_at..region_at,
        region: region_at..end_at,
        end: end_at..end_at + end_marker.len(),
    })
}

/// The region text for a list of entries.
pub fn render_region(lines: &[String]) -> String {
    let separator = format!(",\n{}", ENTRY_INDENT);
    format!(
        "\n{}{}\n{}",
        ENTRY_INDENT,
        lines.join(&separator),
        CLOSING_INDENT
    )
}

/// Rewrite `content` with the region replaced.
pub fn splice(content: &str, region: &MarkedRegion, lines: &[String]) -> String {
    let body = render_region(lines);
    let mut out = String::with_capacity(content.len() + body.len());
    out.push_str(region.prefix(content));
    out.push_str(&body);
    out.push_str(region.suffix(content));
    out
}

/// Reject entries whose rendered region would contain `end_marker`.
///
/// The next parse would otherwise stop inside the injected program.
pub fn validate_entries(lines: &[String], end_marker: &str) -> PatchResult<()> {
    let body = render_region(lines);
    let closed = format!("{}{}", body, end_marker);
    if closed.find(end_marker) == Some(body.len()) {
        return Ok(());
    }
    Err(PatchError::EndMarkerInEntries {
        marker: end_marker.to_string(),
        entry: lines.iter().position(|line| line.contains(end_marker)),
    })
}

/// Replace the marked region of `target` with `lines`.
pub fn patch(target: &PatchTarget, lines: &[String]) -> PatchResult<PatchOutcome> {
    validate_entries(lines, &target.end_marker)?;
    let path = target.path.as_path();
    let content = std::fs::read_to_string(path).map_err(|source| PatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let region = parse_region(&content, &target.start_marker, &target.end_marker, path)?;
    let updated = splice(&content, &region, lines);

    if updated == content {
        debug!(path = %path.display(), "Program region already up to date");
        return Ok(PatchOutcome {
            changed: false,
            entries: lines.len(),
            bytes_written: 0,
        });
    }

    write_atomic(path, updated.as_bytes())?;
    info!(
        path = %path.display(),
        entries = lines.len(),
        "Injected program into source"
    );
    Ok(PatchOutcome {
        changed: true,
        entries: lines.len(),
        bytes_written: updated.len(),
    })
}

/// Check that `target` can be patched without touching it.
pub fn check(target: &PatchTarget) -> PatchResult<MarkedRegion> {
    let path = target.path.as_path();
    let content = std::fs::read_to_string(path).map_err(|source| PatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_region(&content, &target.start_marker, &target.end_marker, path)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> PatchResult<()> {
    let write_err = |source| PatchError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(write_err)?;
    }
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const START: &str = "val program = VecInit(Seq(";
    const END: &str = "))";

    const MEMORY_SCALA: &str = r#"package cpu

import chisel3._

class Memory extends Module {
  val io = IO(new Bundle {
    val addr = Input(UInt(32.W))
    val data = Output(UInt(32.W))
  })

  val program = VecInit(Seq(
    "h00000013".U(32.W)
  ))

  io.data := program(io.addr >> 2)
}
"#;

    fn fixture(content: &str) -> (tempfile::TempDir, PatchTarget) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Memory.scala");
        std::fs::write(&path, content).unwrap();
        (dir, PatchTarget::new(path, START, END))
    }

    fn lines(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn replaces_region_only() {
        let (_dir, target) = fixture(MEMORY_SCALA);
        let entries = lines(&["\"h200001B7\".U(32.W)", "\"h0000006F\".U(32.W)"]);
        let outcome = patch(&target, &entries).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.entries, 2);

        let after = std::fs::read_to_string(&target.path).unwrap();
        assert!(after.contains(
            "val program = VecInit(Seq(\n    \"h200001B7\".U(32.W),\n    \"h0000006F\".U(32.W)\n  ))"
        ));
        assert!(!after.contains("h00000013"));
        assert!(after.starts_with("package cpu\n"));
        assert!(after.ends_with("io.data := program(io.addr >> 2)\n}\n"));
    }

    #[test]
    fn missing_start_marker_leaves_file_unchanged() {
        let original = "class Memory {\n  val rom = Seq(1, 2)\n}\n";
        let (_dir, target) = fixture(original);
        let err = patch(&target, &lines(&["x"])).unwrap_err();
        assert!(matches!(
            err,
            PatchError::MarkerNotFound {
                marker: Marker::Start,
                ..
            }
        ));
        assert_eq!(std::fs::read_to_string(&target.path).unwrap(), original);
    }

    #[test]
    fn end_marker_must_follow_start() {
        let original = "))\nval program = VecInit(Seq(\n  1\n";
        let (_dir, target) = fixture(original);
        let err = patch(&target, &lines(&["x"])).unwrap_err();
        assert!(matches!(
            err,
            PatchError::MarkerNotFound {
                marker: Marker::End,
                ..
            }
        ));
        assert_eq!(std::fs::read_to_string(&target.path).unwrap(), original);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = PatchTarget::new(dir.path().join("absent.scala"), START, END);
        assert!(matches!(
            patch(&target, &lines(&["x"])).unwrap_err(),
            PatchError::Read { .. }
        ));
    }

    #[test]
    fn second_patch_is_idempotent() {
        let (_dir, target) = fixture(MEMORY_SCALA);
        let entries = lines(&["\"h0000006F\".U(32.W)"]);
        assert!(patch(&target, &entries).unwrap().changed);
        let first = std::fs::read_to_string(&target.path).unwrap();

        let again = patch(&target, &entries).unwrap();
        assert!(!again.changed);
        assert_eq!(std::fs::read_to_string(&target.path).unwrap(), first);
    }

    #[test]
    fn repatch_with_different_program() {
        let (_dir, target) = fixture(MEMORY_SCALA);
        patch(&target, &lines(&["\"h00000001\".U(32.W)", "\"h00000002\".U(32.W)"])).unwrap();
        patch(&target, &lines(&["\"h0000006F\".U(32.W)"])).unwrap();
        let after = std::fs::read_to_string(&target.path).unwrap();
        assert!(after.contains("VecInit(Seq(\n    \"h0000006F\".U(32.W)\n  ))"));
        assert!(!after.contains("h00000002"));
    }

    #[test]
    fn entry_holding_end_marker_is_rejected() {
        let (_dir, target) = fixture(MEMORY_SCALA);
        let entries = lines(&[
            "\"h0000006F\".U(32.W) /* jal(x0, f(0)) */",
        ]);
        let err = patch(&target, &entries).unwrap_err();
        assert!(matches!(
            err,
            PatchError::EndMarkerInEntries { entry: Some(0), .. }
        ));
        assert_eq!(std::fs::read_to_string(&target.path).unwrap(), MEMORY_SCALA);
    }

    #[test]
    fn annotated_entries_repatch_cleanly() {
        let (_dir, target) = fixture(MEMORY_SCALA);
        let entries = lines(&[
            "\"h00000013\".U(32.W) /* addi x0, x0, 0 */",
            "\"h0000006F\".U(32.W) /* jal x0, 0 */",
        ]);
        assert!(patch(&target, &entries).unwrap().changed);
        assert!(!patch(&target, &entries).unwrap().changed);
    }

    #[test]
    fn check_reports_region_without_writing() {
        let (_dir, target) = fixture(MEMORY_SCALA);
        let region = check(&target).unwrap();
        let content = std::fs::read_to_string(&target.path).unwrap();
        assert_eq!(region.body(&content), "\n    \"h00000013\".U(32.W)\n  ");
        assert_eq!(content, MEMORY_SCALA);
    }

    #[test]
    fn parse_uses_first_end_after_start() {
        let content = "a START b END c END d";
        let r = parse_region(content, "START", "END", Path::new("x")).unwrap();
        assert_eq!(r.body(content), " b ");
        assert_eq!(r.suffix(content), "END c END d");
    }

    proptest! {
        #[test]
        fn outside_region_is_preserved(
            prefix in "[a-z \n]{0,40}",
            body in "[a-z0-9 \n]{0,40}",
            suffix in "[a-z \n()]{0,40}",
            entries in prop::collection::vec("[A-Za-z0-9\".()]{1,20}", 1..8),
        ) {
            let content = format!("{}<<{}>>{}", prefix, body, suffix);
            let r = parse_region(&content, "<<", ">>", Path::new("x")).unwrap();
            let out = splice(&content, &r, &entries);

            let r2 = parse_region(&out, "<<", ">>", Path::new("x")).unwrap();
            prop_assert_eq!(r2.prefix(&out), format!("{}<<", prefix));
            prop_assert_eq!(r2.suffix(&out), format!(">>{}", suffix));
            prop_assert_eq!(r2.body(&out), render_region(&entries));
        }
    }
}
