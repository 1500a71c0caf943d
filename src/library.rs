//! Footprint library resolution
//!
//! Footprint definitions are stored as JSON templates, one file per
//! footprint, inside a directory per library nickname. The nickname map can
//! be filled from configuration or from a KiCad-style `fp-lib-table`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Footprint, Graphic, Pad};
use crate::geometry::Rect;

/// Errors raised while resolving a footprint definition
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Footprint spec is not of the form `lib:name`
    #[error("invalid footprint spec '{spec}', expected 'library:name'")]
    InvalidSpec { spec: String },

    /// No directory registered for the library nickname
    #[error("unknown footprint library '{library}'")]
    UnknownLibrary { library: String },

    /// Library exists but has no such footprint
    #[error("footprint '{name}' not found in library '{library}'")]
    FootprintNotFound { library: String, name: String },

    /// Template file exists but could not be decoded
    #[error("invalid footprint template {path}: {message}")]
    InvalidTemplate { path: PathBuf, message: String },

    /// Error reading a library file
    #[error("error reading {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Geometry of a footprint definition, in footprint-local coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootprintTemplate {
    #[serde(default)]
    pub pads: Vec<Pad>,
    #[serde(default)]
    pub graphics: Vec<Graphic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courtyard: Option<Rect>,
}

impl FootprintTemplate {
    /// Create a new board footprint from this template
    pub fn instantiate(&self, uuid: &str, fpid: &str, reference: &str) -> Footprint {
        let mut footprint = Footprint::new(uuid, fpid, reference);
        footprint.pads = self.pads.clone();
        footprint.graphics = self.graphics.clone();
        footprint.courtyard = self.courtyard;
        footprint
    }
}

/// Split a `lib:name` footprint spec
pub fn split_footprint_spec(spec: &str) -> Result<(&str, &str), ResolutionError> {
    match spec.split_once(':') {
        Some((lib, name)) if !lib.is_empty() && !name.is_empty() => Ok((lib, name)),
        _ => Err(ResolutionError::InvalidSpec {
            spec: spec.to_string(),
        }),
    }
}

/// Source of footprint definitions
pub trait FootprintResolver {
    fn resolve(&self, library: &str, name: &str) -> Result<FootprintTemplate, ResolutionError>;

    /// Resolve a `lib:name` spec
    fn resolve_spec(&self, spec: &str) -> Result<FootprintTemplate, ResolutionError> {
        let (library, name) = split_footprint_spec(spec)?;
        self.resolve(library, name)
    }
}

// ============================================
// Directory-backed library table
// ============================================

/// Library nickname to directory map
#[derive(Debug, Clone, Default)]
pub struct LibraryTable {
    libraries: BTreeMap<String, PathBuf>,
}

impl LibraryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library directory, replacing any previous entry
    pub fn insert(&mut self, nickname: impl Into<String>, dir: impl Into<PathBuf>) {
        let nickname = nickname.into();
        let dir = dir.into();
        if let Some(previous) = self.libraries.get(&nickname) {
            tracing::info!(
                "overwriting {}:{} with {}:{}",
                nickname,
                previous.display(),
                nickname,
                dir.display()
            );
        }
        self.libraries.insert(nickname, dir);
    }

    pub fn with_library(mut self, nickname: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.insert(nickname, dir);
        self
    }

    pub fn get(&self, nickname: &str) -> Option<&Path> {
        self.libraries.get(nickname).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Merge entries from an `fp-lib-table` file; a missing file is ignored
    pub fn load_fp_lib_table(&mut self, path: &Path) -> Result<usize, ResolutionError> {
        if !path.exists() {
            return Ok(0);
        }
        let content = std::fs::read_to_string(path).map_err(|e| ResolutionError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let entries = parse_fp_lib_table(&content);
        let count = entries.len();
        for (nickname, uri) in entries {
            self.insert(nickname, expand_path(&uri));
        }
        tracing::debug!("loaded {} libraries from {}", count, path.display());
        Ok(count)
    }
}

impl FootprintResolver for LibraryTable {
    fn resolve(&self, library: &str, name: &str) -> Result<FootprintTemplate, ResolutionError> {
        let dir = self
            .get(library)
            .ok_or_else(|| ResolutionError::UnknownLibrary {
                library: library.to_string(),
            })?;
        // Windows extended path prefix
        let dir_str = dir.to_string_lossy().replace(r"\\?\", "");
        let path = Path::new(&dir_str).join(format!("{}.json", name));
        if !path.is_file() {
            return Err(ResolutionError::FootprintNotFound {
                library: library.to_string(),
                name: name.to_string(),
            });
        }

        tracing::info!("loading footprint {} from {}", name, dir_str);
        let content = std::fs::read_to_string(&path).map_err(|e| ResolutionError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ResolutionError::InvalidTemplate {
            path,
            message: e.to_string(),
        })
    }
}

fn lib_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)\(\s*lib\s*.*?\)\)").expect("lib entry regex"))
}

fn disabled_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(\s*disabled\s*\)").expect("disabled regex"))
}

fn entry_field(entry: &str, key: &str) -> Option<String> {
    let pattern = format!(r#"(?i)\(\s*{}\s*("[^"]*?"|[^)]*?)\s*\)"#, key);
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(entry)?;
    let raw = caps.get(1)?.as_str().trim();
    Some(raw.trim_matches('"').to_string())
}

/// Extract `(nickname, uri)` pairs of enabled KiCad libraries from the text
/// of an `fp-lib-table`.
pub fn parse_fp_lib_table(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for entry in lib_entry_re().find_iter(content) {
        let entry = entry.as_str();
        if disabled_re().is_match(entry) {
            continue;
        }
        let Some(kind) = entry_field(entry, "type") else {
            continue;
        };
        if !kind.to_lowercase().contains("kicad") {
            continue;
        }
        let (Some(name), Some(uri)) = (entry_field(entry, "name"), entry_field(entry, "uri"))
        else {
            continue;
        };
        out.push((name, uri));
    }
    out
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references.
///
/// Unknown variables are left untouched.
pub fn expand_path(raw: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .expect("env var regex")
    });

    let with_home = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match std::env::var("HOME") {
            Ok(home) => format!("{}{}", home, rest),
            Err(_) => raw.to_string(),
        },
        _ => raw.to_string(),
    };

    re.replace_all(&with_home, |caps: &regex::Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

// ============================================
// In-memory library
// ============================================

/// Footprint templates held in memory, keyed by `(library, name)`
#[derive(Debug, Clone, Default)]
pub struct StaticLibrary {
    templates: HashMap<(String, String), FootprintTemplate>,
}

impl StaticLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, library: &str, name: &str, template: FootprintTemplate) {
        self.templates
            .insert((library.to_string(), name.to_string()), template);
    }

    pub fn with(mut self, spec: &str, template: FootprintTemplate) -> Self {
        if let Ok((library, name)) = split_footprint_spec(spec) {
            self.insert(library, name, template);
        }
        self
    }
}

impl FootprintResolver for StaticLibrary {
    fn resolve(&self, library: &str, name: &str) -> Result<FootprintTemplate, ResolutionError> {
        if let Some(t) = self
            .templates
            .get(&(library.to_string(), name.to_string()))
        {
            return Ok(t.clone());
        }
        if self.templates.keys().any(|(lib, _)| lib == library) {
            Err(ResolutionError::FootprintNotFound {
                library: library.to_string(),
                name: name.to_string(),
            })
        } else {
            Err(ResolutionError::UnknownLibrary {
                library: library.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::geometry::Point;

    fn template() -> FootprintTemplate {
        FootprintTemplate {
            pads: vec![Pad {
                number: "1".into(),
                offset: Point::new(0, 0),
                size: Point::new(100, 100),
                layer: "F.Cu".into(),
                net: None,
            }],
            graphics: Vec::new(),
            courtyard: Some(Rect::new(-200, -200, 400, 400)),
        }
    }

    #[test]
    fn test_parse_fp_lib_table() {
        let table = r#"(fp_lib_table
  (version 7)
  (lib (name "Resistor_SMD")(type "KiCad")(uri "${KICAD9_FOOTPRINT_DIR}/Resistor_SMD.pretty")(options "")(descr ""))
  (lib (name Old)(type KiCad)(uri /tmp/old.pretty)(options "")(descr "")(disabled))
  (lib (name "Remote")(type "Github")(uri "https://example.com/lib")(options "")(descr ""))
  (lib (name local)(type KiCad)(uri /opt/local.pretty)(options "")(descr ""))
)"#;
        assert_eq!(
            parse_fp_lib_table(table),
            vec![
                (
                    "Resistor_SMD".to_string(),
                    "${KICAD9_FOOTPRINT_DIR}/Resistor_SMD.pretty".to_string()
                ),
                ("local".to_string(), "/opt/local.pretty".to_string()),
            ]
        );
    }

    #[test]
    fn test_expand_path_leaves_unknown_vars() {
        assert_eq!(
            expand_path("$LAYOUT_SYNC_SURELY_UNSET_VAR/x"),
            "$LAYOUT_SYNC_SURELY_UNSET_VAR/x"
        );
        assert_eq!(expand_path("/plain/path"), "/plain/path");
    }

    #[test]
    fn test_library_table_resolves_json_template() {
        let dir = tempfile::tempdir().unwrap();
        let lib_dir = dir.path().join("Passives");
        std::fs::create_dir(&lib_dir).unwrap();
        std::fs::write(
            lib_dir.join("R_0603.json"),
            serde_json::to_string(&template()).unwrap(),
        )
        .unwrap();
        std::fs::write(lib_dir.join("Broken.json"), "{ nope").unwrap();

        let table = LibraryTable::new().with_library("Passives", &lib_dir);
        assert_eq!(table.resolve_spec("Passives:R_0603").unwrap(), template());
        assert!(matches!(
            table.resolve("Passives", "Missing"),
            Err(ResolutionError::FootprintNotFound { .. })
        ));
        assert!(matches!(
            table.resolve("Nope", "R_0603"),
            Err(ResolutionError::UnknownLibrary { .. })
        ));
        assert!(matches!(
            table.resolve("Passives", "Broken"),
            Err(ResolutionError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_load_fp_lib_table_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp-lib-table");
        std::fs::write(
            &path,
            "(fp_lib_table (lib (name A)(type KiCad)(uri /a)(options \"\")(descr \"\")))",
        )
        .unwrap();
        let mut table = LibraryTable::new().with_library("A", "/old");
        assert_eq!(table.load_fp_lib_table(&path).unwrap(), 1);
        assert_eq!(table.get("A"), Some(Path::new("/a")));
        assert_eq!(
            table.load_fp_lib_table(&dir.path().join("missing")).unwrap(),
            0
        );
    }

    #[test]
    fn test_static_library() {
        let lib = StaticLibrary::new().with("Lib:R", template());
        assert!(lib.resolve_spec("Lib:R").is_ok());
        assert!(matches!(
            lib.resolve("Lib", "C"),
            Err(ResolutionError::FootprintNotFound { .. })
        ));
        assert!(matches!(
            lib.resolve_spec("no-colon"),
            Err(ResolutionError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn test_instantiate_copies_geometry() {
        let fp = template().instantiate("id", "Lib:R", "R1");
        assert_eq!(fp.pads.len(), 1);
        assert_eq!(fp.courtyard, Some(Rect::new(-200, -200, 400, 400)));
        assert_eq!(fp.reference, "R1");
    }
}
