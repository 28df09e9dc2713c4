//! Vault Discovery
//!
//! Walks a vault directory, reads every markdown file and parses its YAML
//! frontmatter into a [`Document`]. A file whose frontmatter does not parse still
//! becomes a document, marked unparsable, so one bad file never aborts a scan.

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::Document;
use crate::error::Result;

/// Configuration for vault discovery
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Skip paths starting with these vault-relative prefixes
    pub exclude_prefixes: Vec<String>,
    /// Skip dot-directories such as `.obsidian` and `.git`
    pub skip_hidden: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            exclude_prefixes: vec![
                "_templates/".to_string(),
                "node_modules/".to_string(),
            ],
            skip_hidden: true,
        }
    }
}

/// Split `---` delimited frontmatter from the body.
///
/// Returns `None` when the file does not start with a frontmatter block.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

/// Parse a markdown file's content into a document
pub fn parse_document(relative: &Path, content: &str) -> Document {
    let Some((yaml, _body)) = split_frontmatter(content) else {
        return Document::new(relative, Map::new());
    };
    if yaml.trim().is_empty() {
        return Document::new(relative, Map::new());
    }
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Object(map)) => Document::new(relative, map),
        Ok(Value::Null) => Document::new(relative, Map::new()),
        Ok(_) => Document::unparsable(relative, "frontmatter is not a mapping"),
        Err(e) => Document::unparsable(relative, e.to_string()),
    }
}

/// Discover every markdown document under `root`, sorted by path
pub fn discover(root: &Path, options: &DiscoveryOptions) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        !(options.skip_hidden
            && e.depth() > 0
            && e.file_name().to_string_lossy().starts_with('.'))
    });

    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != "md").unwrap_or(true) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        let relative_str = super::slash_path(&relative);
        if options
            .exclude_prefixes
            .iter()
            .any(|p| relative_str.starts_with(p.as_str()))
        {
            continue;
        }

        match fs::read_to_string(path) {
            Ok(content) => documents.push(parse_document(&relative, &content)),
            Err(e) => {
                warn!(path = %relative_str, error = %e, "failed to read document");
                documents.push(Document::unparsable(relative, e.to_string()));
            }
        }
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(count = documents.len(), root = %root.display(), "documents discovered");
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_frontmatter() {
        let content = "---\ntype: task\nstatus: done\n---\n# Body\n";
        let (yaml, body) = split_frontmatter(content).unwrap();
        assert_eq!(yaml, "type: task\nstatus: done\n");
        assert_eq!(body, "# Body\n");
        assert!(split_frontmatter("# No frontmatter").is_none());
    }

    #[test]
    fn test_parse_document() {
        let doc = parse_document(Path::new("tasks/A.md"), "---\ntype: task\nrelated: [[B]]\n---\n");
        assert_eq!(doc.type_name("type"), Some("task"));
        assert!(doc.get("related").unwrap().is_array());

        let broken = parse_document(Path::new("tasks/B.md"), "---\ntype: [unclosed\n---\n");
        assert!(broken.parse_error.is_some());
    }

    #[test]
    fn test_discover_skips_hidden_and_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("tasks")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::create_dir_all(root.join("_templates")).unwrap();
        fs::write(root.join("tasks/B.md"), "---\ntype: task\n---\n").unwrap();
        fs::write(root.join("tasks/A.md"), "---\ntype: task\n---\n").unwrap();
        fs::write(root.join(".obsidian/C.md"), "---\ntype: task\n---\n").unwrap();
        fs::write(root.join("_templates/T.md"), "---\ntype: task\n---\n").unwrap();
        fs::write(root.join("tasks/notes.txt"), "ignored").unwrap();

        let docs = discover(root, &DiscoveryOptions::default()).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
