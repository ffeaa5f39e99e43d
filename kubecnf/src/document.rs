use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::ShapeError;

const API_VERSION: &str = "apiVersion";
const KIND: &str = "kind";
const CLUSTERS: &str = "clusters";
const CONTEXTS: &str = "contexts";
const USERS: &str = "users";
const CURRENT_CONTEXT: &str = "current-context";
const NAME: &str = "name";

/// Canonical order for known keys that were not present in the source file.
const KNOWN_KEYS: [&str; 6] = [API_VERSION, KIND, CLUSTERS, CONTEXTS, USERS, CURRENT_CONTEXT];

/// How to treat a known field with the wrong shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Reject it. Used for the main config.
    Strict,
    /// Treat it as empty. Used for hand-written merge inputs.
    Lenient,
}

fn describe(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
    }
}

// region: Entry

/// One named record in `clusters`, `contexts` or `users`.
///
/// Everything except `name` is kept as-is in `fields`. The position `name` had
/// among the keys is remembered so that writing the entry back keeps its layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// `None` when the source had no `name`, or a non-string one (kept in `fields`).
    pub name: Option<String>,
    pub fields: Mapping,
    name_index: usize,
}

impl Entry {
    pub fn new(name: impl Into<String>) -> Self {
        Entry {
            name: Some(name.into()),
            fields: Mapping::new(),
            name_index: 0,
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<YamlValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    fn from_mapping(mapping: Mapping) -> Self {
        let mut name = None;
        let mut name_index = 0;
        let mut fields = Mapping::with_capacity(mapping.len());
        for (index, (key, value)) in mapping.into_iter().enumerate() {
            match value {
                YamlValue::String(s) if key.as_str() == Some(NAME) => {
                    name = Some(s);
                    name_index = index;
                }
                value => {
                    fields.insert(key, value);
                }
            }
        }
        Entry {
            name,
            fields,
            name_index,
        }
    }

    pub fn to_mapping(&self) -> Mapping {
        let mut out = Mapping::with_capacity(self.fields.len() + 1);
        let mut name = self.name.as_ref();
        for (index, (key, value)) in self.fields.iter().enumerate() {
            if index == self.name_index {
                if let Some(name) = name.take() {
                    out.insert(NAME.into(), name.as_str().into());
                }
            }
            out.insert(key.clone(), value.clone());
        }
        if let Some(name) = name {
            out.insert(NAME.into(), name.as_str().into());
        }
        out
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_mapping().serialize(serializer)
    }
}

fn entries(key: &str, value: YamlValue, strictness: Strictness) -> Result<Vec<Entry>, ShapeError> {
    let items = match value {
        YamlValue::Null => return Ok(Vec::new()),
        YamlValue::Sequence(items) => items,
        _ if strictness == Strictness::Lenient => return Ok(Vec::new()),
        other => {
            return Err(ShapeError(format!(
                "{key} must be a sequence, found {}",
                describe(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            YamlValue::Mapping(mapping) => Some(Ok(Entry::from_mapping(mapping))),
            _ if strictness == Strictness::Lenient => None,
            other => Some(Err(ShapeError(format!(
                "{key}[{index}] must be a mapping, found {}",
                describe(&other)
            )))),
        })
        .collect()
}

fn entries_value(entries: &[Entry], present: bool) -> Option<YamlValue> {
    if entries.is_empty() && !present {
        return None;
    }
    Some(YamlValue::Sequence(
        entries
            .iter()
            .map(|entry| YamlValue::Mapping(entry.to_mapping()))
            .collect(),
    ))
}
// endregion

// region: Document

/// The three named-entry collections of a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Clusters,
    Contexts,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Clusters,
        Collection::Contexts,
        Collection::Users,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Collection::Clusters => CLUSTERS,
            Collection::Contexts => CONTEXTS,
            Collection::Users => USERS,
        }
    }
}

/// In-memory kubeconfig.
///
/// Top-level keys this type does not know about live in `extra`. The key order of
/// the source is kept in `layout` and reproduced by [`Document::to_mapping`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub api_version: Option<YamlValue>,
    pub kind: Option<YamlValue>,
    pub clusters: Vec<Entry>,
    pub contexts: Vec<Entry>,
    pub users: Vec<Entry>,
    pub current_context: Option<String>,
    pub extra: Mapping,
    layout: Vec<YamlValue>,
}

impl Document {
    /// `apiVersion: v1`, `kind: Config` and empty collections.
    pub fn skeleton() -> Self {
        Document {
            api_version: Some("v1".into()),
            kind: Some("Config".into()),
            layout: [API_VERSION, KIND, CLUSTERS, CONTEXTS, USERS]
                .iter()
                .map(|&key| YamlValue::from(key))
                .collect(),
            ..Document::default()
        }
    }

    pub fn collection(&self, collection: Collection) -> &Vec<Entry> {
        match collection {
            Collection::Clusters => &self.clusters,
            Collection::Contexts => &self.contexts,
            Collection::Users => &self.users,
        }
    }

    pub fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Entry> {
        match collection {
            Collection::Clusters => &mut self.clusters,
            Collection::Contexts => &mut self.contexts,
            Collection::Users => &mut self.users,
        }
    }

    /// True for a document read from an empty file or a `null` document.
    pub fn is_blank(&self) -> bool {
        *self == Document::default()
    }

    /// Names of all clusters, sorted. Unnamed entries are skipped.
    pub fn cluster_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .clusters
            .iter()
            .filter_map(|cluster| cluster.name.clone())
            .collect();
        names.sort();
        names
    }

    /// A YAML `null` document is an empty config.
    pub fn from_value(value: YamlValue, strictness: Strictness) -> Result<Self, ShapeError> {
        match value {
            YamlValue::Null => Ok(Document::default()),
            YamlValue::Mapping(mapping) => Document::from_mapping(mapping, strictness),
            other => Err(ShapeError(format!(
                "expected a mapping at the top level, found {}",
                describe(&other)
            ))),
        }
    }

    pub fn from_mapping(mapping: Mapping, strictness: Strictness) -> Result<Self, ShapeError> {
        let mut doc = Document::default();
        for (key, value) in mapping {
            doc.layout.push(key.clone());
            match key.as_str() {
                Some(API_VERSION) => doc.api_version = Some(value),
                Some(KIND) => doc.kind = Some(value),
                Some(CLUSTERS) => doc.clusters = entries(CLUSTERS, value, strictness)?,
                Some(CONTEXTS) => doc.contexts = entries(CONTEXTS, value, strictness)?,
                Some(USERS) => doc.users = entries(USERS, value, strictness)?,
                Some(CURRENT_CONTEXT) => {
                    doc.current_context = match value {
                        YamlValue::Null => None,
                        YamlValue::String(name) => Some(name),
                        _ if strictness == Strictness::Lenient => None,
                        other => {
                            return Err(ShapeError(format!(
                                "{CURRENT_CONTEXT} must be a string, found {}",
                                describe(&other)
                            )))
                        }
                    }
                }
                _ => {
                    doc.extra.insert(key, value);
                }
            }
        }
        Ok(doc)
    }

    pub fn to_mapping(&self) -> Mapping {
        let mut out = Mapping::new();
        for key in &self.layout {
            self.emit(key, true, &mut out);
        }
        for &key in &KNOWN_KEYS {
            let key = YamlValue::from(key);
            if !self.layout.contains(&key) {
                self.emit(&key, false, &mut out);
            }
        }
        for (key, value) in &self.extra {
            if !out.contains_key(key) {
                out.insert(key.clone(), value.clone());
            }
        }
        out
    }

    fn emit(&self, key: &YamlValue, present: bool, out: &mut Mapping) {
        let value = match key.as_str() {
            Some(API_VERSION) => self.api_version.clone(),
            Some(KIND) => self.kind.clone(),
            Some(CLUSTERS) => entries_value(&self.clusters, present),
            Some(CONTEXTS) => entries_value(&self.contexts, present),
            Some(USERS) => entries_value(&self.users, present),
            Some(CURRENT_CONTEXT) => match &self.current_context {
                Some(name) => Some(name.as_str().into()),
                None if present => Some(YamlValue::Null),
                None => None,
            },
            _ => self.extra.get(key).cloned(),
        };
        if let Some(value) = value {
            out.insert(key.clone(), value);
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_mapping().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = YamlValue::deserialize(deserializer)?;
        Document::from_value(value, Strictness::Strict).map_err(de::Error::custom)
    }
}
// endregion
