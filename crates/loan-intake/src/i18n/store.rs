use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Failure while reading bundles from disk at start-up.
#[derive(Debug, thiserror::Error)]
pub enum TranslationLoadError {
    #[error("unable to read translations at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("translation bundle {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("translation bundle {path} must contain a JSON object")]
    NotAnObject { path: PathBuf },
}

/// Immutable table of bundles, keyed by locale then namespace.
///
/// Built once at start-up and shared behind an `Arc`; nothing mutates it afterwards.
#[derive(Debug, Clone, Default)]
pub struct TranslationStore {
    default_locale: String,
    bundles: HashMap<String, HashMap<String, Value>>,
}

impl TranslationStore {
    /// Load `<dir>/<locale>/<namespace>.json` for every locale directory under `dir`.
    pub fn load(
        dir: impl AsRef<Path>,
        default_locale: impl Into<String>,
    ) -> Result<Self, TranslationLoadError> {
        let dir = dir.as_ref();
        let mut store = Self {
            default_locale: default_locale.into(),
            bundles: HashMap::new(),
        };

        for locale_entry in read_dir(dir)? {
            let locale_path = locale_entry.path();
            if !locale_path.is_dir() {
                continue;
            }
            let Some(locale) = file_name(&locale_path) else {
                continue;
            };

            for namespace_entry in read_dir(&locale_path)? {
                let path = namespace_entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }
                let Some(namespace) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
                else {
                    continue;
                };

                let raw = fs::read_to_string(&path).map_err(|source| TranslationLoadError::Io {
                    path: path.clone(),
                    source,
                })?;
                let bundle: Value = serde_json::from_str(&raw).map_err(|source| {
                    TranslationLoadError::Parse {
                        path: path.clone(),
                        source,
                    }
                })?;
                if !bundle.is_object() {
                    return Err(TranslationLoadError::NotAnObject { path });
                }

                store.insert(&locale, &namespace, bundle);
            }
        }

        tracing::info!(
            locales = store.bundles.len(),
            default_locale = %store.default_locale,
            "translation bundles loaded"
        );
        Ok(store)
    }

    /// Build a store from in-memory bundles: `(locale, namespace, tree)`.
    pub fn from_bundles<I, L, N>(default_locale: impl Into<String>, bundles: I) -> Self
    where
        I: IntoIterator<Item = (L, N, Value)>,
        L: AsRef<str>,
        N: AsRef<str>,
    {
        let mut store = Self {
            default_locale: default_locale.into(),
            bundles: HashMap::new(),
        };
        for (locale, namespace, tree) in bundles {
            store.insert(locale.as_ref(), namespace.as_ref(), tree);
        }
        store
    }

    fn insert(&mut self, locale: &str, namespace: &str, tree: Value) {
        self.bundles
            .entry(locale.to_string())
            .or_default()
            .insert(namespace.to_string(), tree);
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.bundles.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    /// Bundle for `locale`, or the default locale's bundle when `locale` has none.
    pub fn bundle(&self, locale: &str, namespace: &str) -> Option<&Value> {
        self.bundles
            .get(locale)
            .and_then(|namespaces| namespaces.get(namespace))
            .or_else(|| {
                self.bundles
                    .get(&self.default_locale)
                    .and_then(|namespaces| namespaces.get(namespace))
            })
    }

    /// Resolve a dotted key to its string leaf, if present.
    pub fn lookup(&self, locale: &str, namespace: &str, key: &str) -> Option<&str> {
        let mut node = self.bundle(locale, namespace)?;
        for segment in key.split('.') {
            node = node.as_object()?.get(segment)?;
        }
        node.as_str()
    }

    /// Resolve and interpolate. A missing key comes back unchanged so callers can detect it.
    pub fn translate(
        &self,
        locale: &str,
        namespace: &str,
        key: &str,
        params: &[(&str, &str)],
    ) -> String {
        match self.lookup(locale, namespace, key) {
            Some(template) if params.is_empty() => template.to_string(),
            Some(template) => interpolate(template, params),
            None => key.to_string(),
        }
    }
}

/// Replace each `{{name}}` token with its parameter value.
///
/// Single pass: substituted values are never re-scanned, unknown tokens stay verbatim.
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            output.push_str(&rest[start..]);
            return output;
        };

        let name = &after_open[..end];
        match params.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => output.push_str(value),
            None => output.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    output.push_str(rest);
    output
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>, TranslationLoadError> {
    let io_error = |source| TranslationLoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(io_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
