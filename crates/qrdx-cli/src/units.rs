//! Transfer units on disk
//!
//! One unit per file when encoding (`<name>.qrdx.txt` or
//! `<name>.part-NN-of-MM.txt`), one unit per non-empty line when reading.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use qrdx_codec::Encoded;
use qrdx_core::PartInfo;

/// File names for an encoded transfer, in part order.
pub fn unit_file_names(stem: &str, encoded: &Encoded) -> Vec<String> {
    match encoded {
        Encoded::Single(_) => vec![format!("{stem}.qrdx.txt")],
        Encoded::Multi(units) => {
            let total = units.len();
            let width = total.to_string().len().max(2);
            (1..=total)
                .map(|n| format!("{stem}.part-{n:0width$}-of-{total:0width$}.txt"))
                .collect()
        }
    }
}

/// Write each unit to its own file under `dir`, creating `dir` if needed.
pub fn write_units(dir: &Path, stem: &str, encoded: &Encoded) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut written = Vec::with_capacity(encoded.len());
    for (name, unit) in unit_file_names(stem, encoded).into_iter().zip(encoded.units()) {
        let path = dir.join(name);
        std::fs::write(&path, format!("{unit}\n"))
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Collect every non-empty line of `paths` as one transfer unit.
pub fn read_units(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut units = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        units.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned),
        );
    }
    Ok(units)
}

/// The file name without its extension, used to name encoded units.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "payload".to_string())
}

/// What can be learned about a unit without the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSummary {
    pub kind: UnitKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<PartInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Single,
    Part,
    Invalid,
}

pub fn summarize(unit: &str) -> UnitSummary {
    let (kind, part, error) = match qrdx_codec::part_info(unit) {
        Ok(Some(info)) => (UnitKind::Part, Some(info), None),
        Ok(None) => (UnitKind::Single, None, None),
        Err(e) => (UnitKind::Invalid, None, Some(e.to_string())),
    };
    UnitSummary {
        kind,
        part,
        error,
        len: unit.len(),
    }
}
