// ABOUTME: Model of the server-published library manifest.
// ABOUTME: Entries are bare paths or objects with a path/file/name field; other shapes are skipped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One element of the manifest's `files` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    Path(String),
    Object {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Other(Value),
}

impl ManifestEntry {
    /// The source path this entry names, if any. Object fields are tried in
    /// the order `path`, `file`, `name`; blank strings count as absent.
    pub fn source_path(&self) -> Option<&str> {
        match self {
            ManifestEntry::Path(p) => non_blank(p),
            ManifestEntry::Object { path, file, name } => [path, file, name]
                .into_iter()
                .find_map(|field| field.as_deref().and_then(non_blank)),
            ManifestEntry::Other(_) => None,
        }
    }

    /// Short human-readable label for logs and failure reports.
    pub fn label(&self) -> String {
        match self.source_path() {
            Some(p) => p.to_string(),
            None => match self {
                ManifestEntry::Other(v) => v.to_string(),
                _ => "<no path>".to_string(),
            },
        }
    }
}

fn non_blank(s: &str) -> Option<&str> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// A parsed manifest. Unknown top-level fields are ignored; a missing or
/// non-array `files` field yields an empty manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse manifest JSON. Fails only when the bytes are not valid JSON.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_value(value))
    }

    /// Build a manifest from an already parsed JSON document.
    pub fn from_value(value: Value) -> Self {
        let files = match value {
            Value::Object(mut map) => match map.remove("files") {
                Some(Value::Array(items)) => items.into_iter().map(entry_from_value).collect(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Self { files }
    }

    /// Number of entries, including ones that will be skipped.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn entry_from_value(value: Value) -> ManifestEntry {
    serde_json::from_value(value.clone()).unwrap_or(ManifestEntry::Other(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strings_and_objects() {
        let manifest = Manifest::parse(
            br#"{"version": 3, "files": [
                "miku/No_47.data",
                {"path": "a.data"},
                {"file": "b.data", "size": 10},
                {"name": "c.data"},
                {"path": "", "file": "d.data"}
            ]}"#,
        )
        .unwrap();

        let paths: Vec<_> = manifest.files.iter().filter_map(|e| e.source_path()).collect();
        assert_eq!(paths, vec!["miku/No_47.data", "a.data", "b.data", "c.data", "d.data"]);
    }

    #[test]
    fn odd_shapes_are_kept_but_have_no_path() {
        let manifest =
            Manifest::parse(br#"{"files": [42, null, {"title": "x"}, {"path": 7}, ""]}"#).unwrap();
        assert_eq!(manifest.len(), 5);
        assert!(manifest.files.iter().all(|e| e.source_path().is_none()));
    }

    #[test]
    fn missing_files_field_is_empty() {
        assert!(Manifest::parse(br#"{"other": []}"#).unwrap().is_empty());
        assert!(Manifest::parse(br#"{"files": "nope"}"#).unwrap().is_empty());
        assert!(Manifest::parse(br#"[1, 2]"#).unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Manifest::parse(b"{not json").is_err());
    }

    #[test]
    fn object_field_priority_is_path_file_name() {
        let entry: ManifestEntry =
            serde_json::from_str(r#"{"name": "n.data", "file": "f.data", "path": "p.data"}"#)
                .unwrap();
        assert_eq!(entry.source_path(), Some("p.data"));
    }
}
