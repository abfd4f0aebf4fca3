//! `applications.properties` reader and writer.
//!
//! One entry per application. A value starting with `http://` or `https://`
//! is a comma-separated list of base URLs; any other value is a
//! comma-separated list of member application names.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use pulse_config::properties;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::model::Registry;
use crate::reconcile::reconcile;
use crate::url_builder::UrlBuilder;
use crate::RegistryResult;

pub const FILE_HEADER: &str = "urls of the applications to monitor";

/// Loads the registry file. A missing file is an empty registry.
///
/// Unparseable URL entries are skipped with a warning so that one bad line
/// does not hide every other application.
pub fn read_registry(path: &Path, url_builder: &UrlBuilder) -> RegistryResult<Registry> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Registry file not found, starting empty");
            return Ok(Registry::default());
        }
        Err(e) => {
            return Err(RegistryError::persistence(
                path,
                "failed to read registry file",
                e,
            ))
        }
    };
    Ok(parse_registry(&text, url_builder))
}

pub(crate) fn parse_registry(text: &str, url_builder: &UrlBuilder) -> Registry {
    let mut registry = Registry::default();
    for (name, value) in properties::parse(text) {
        if name.is_empty() {
            continue;
        }
        if is_url_list(&value) {
            match url_builder.parse_urls(&value) {
                Ok(urls) => {
                    registry.aggregations.remove(&name);
                    registry.direct.insert(name, urls);
                }
                Err(e) => {
                    warn!(application = %name, error = %e, "Skipping unparseable registry entry");
                }
            }
        } else {
            let members: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            registry.direct.remove(&name);
            registry.aggregations.insert(name, members);
        }
    }

    let report = reconcile(&registry.direct, &mut registry.aggregations);
    if !report.is_empty() {
        debug!(
            pruned = report.pruned_members.len(),
            removed = report.removed_aggregations.len(),
            "Dropped dangling aggregation members on load"
        );
    }
    registry
}

/// Whether a stored value holds node URLs rather than member names.
/// Application names that look like URLs are refused at registration, so
/// an aggregation value never matches.
pub fn is_url_list(value: &str) -> bool {
    let value = value.trim_start().as_bytes();
    ["http://", "https://"].iter().any(|scheme| {
        value.len() >= scheme.len() && value[..scheme.len()].eq_ignore_ascii_case(scheme.as_bytes())
    })
}

/// Properties text for `registry`, keys sorted across both maps.
pub fn render_registry(registry: &Registry, url_builder: &UrlBuilder) -> RegistryResult<String> {
    let mut values: BTreeMap<&str, String> = BTreeMap::new();
    for (name, urls) in &registry.direct {
        let bases = urls
            .iter()
            .map(|url| url_builder.base_url(url))
            .collect::<RegistryResult<Vec<_>>>()?;
        values.insert(name, bases.join(","));
    }
    for (name, members) in &registry.aggregations {
        values.insert(name, members.join(","));
    }
    Ok(properties::render(
        FILE_HEADER,
        values.iter().map(|(k, v)| (*k, v.as_str())),
    ))
}

/// Replaces the file at `path` with `contents`. Readers see either the old
/// file or the new one, never a partial write.
pub fn write_atomically(path: &Path, contents: &str) -> RegistryResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| {
        RegistryError::persistence(dir, "failed to create storage directory", e)
    })?;

    let mut file = NamedTempFile::new_in(dir)
        .map_err(|e| RegistryError::persistence(dir, "failed to create temporary file", e))?;
    file.write_all(contents.as_bytes())
        .and_then(|_| file.as_file().sync_all())
        .map_err(|e| RegistryError::persistence(path, "failed to write registry file", e))?;
    file.persist(path)
        .map_err(|e| RegistryError::persistence(path, "failed to replace registry file", e.error))?;
    Ok(())
}

pub fn write_registry(
    path: &Path,
    registry: &Registry,
    url_builder: &UrlBuilder,
) -> RegistryResult<()> {
    let contents = render_registry(registry, url_builder)?;
    write_atomically(path, &contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_models::TransportFormat;
    use tempfile::TempDir;

    fn builder() -> UrlBuilder {
        UrlBuilder::new("/monitoring", TransportFormat::Json)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = read_registry(&dir.path().join("applications.properties"), &builder()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_parse_classifies_by_http_prefix() {
        let text = "#comment\nappA=http://h1/a,http://h2/a\ngroup1=appA, appB ,\n";
        let registry = parse_registry(text, &builder());
        assert_eq!(registry.direct["appA"].len(), 2);
        assert_eq!(registry.aggregations["group1"], vec!["appA"]);
    }

    #[test]
    fn test_members_named_like_schemes_stay_members() {
        let text = "httpd=http://h1/httpd\nweb=httpd\nHTTPS_gw=HTTPS://h2/gw\n";
        let registry = parse_registry(text, &builder());
        assert_eq!(registry.aggregations["web"], vec!["httpd"]);
        assert!(registry.direct.contains_key("HTTPS_gw"));
        assert!(is_url_list("  http://h1/a"));
        assert!(!is_url_list("http-api,httpd"));
    }

    #[test]
    fn test_bad_url_line_is_skipped() {
        let text = "good=http://h1/a\nbad=http://h1/a,http://[broken\n";
        let registry = parse_registry(text, &builder());
        assert!(registry.direct.contains_key("good"));
        assert!(!registry.contains("bad"));
    }

    #[test]
    fn test_last_duplicate_wins_across_kinds() {
        let text = "app=http://h1/a\napp=other\nother=http://h2/o\n";
        let registry = parse_registry(text, &builder());
        assert!(!registry.direct.contains_key("app"));
        assert_eq!(registry.aggregations["app"], vec!["other"]);
    }

    #[test]
    fn test_render_sorts_keys_and_strips_suffix() {
        let registry = parse_registry("zeta=http://h1/z\nalpha=zeta\n", &builder());
        let text = render_registry(&registry, &builder()).unwrap();
        assert_eq!(
            text,
            "# urls of the applications to monitor\nalpha=zeta\nzeta=http://h1/z\n"
        );
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/store/applications.properties");
        let registry = parse_registry("app=http://h1/a\n", &builder());
        write_registry(&path, &registry, &builder()).unwrap();
        let reread = read_registry(&path, &builder()).unwrap();
        assert_eq!(reread, registry);
    }
}
