//! Cached state documents and the fingerprint used to detect changes.

use serde_json::Value;

/// A state bag: property name → JSON value.
///
/// A missing key and a key holding `null` are different things. The
/// first means "never set", the second is a stored value.
pub type StateDocument = serde_json::Map<String, Value>;

/// Canonical serialization of a document.
///
/// Object keys are emitted in sorted order at every depth, so two
/// documents with equal content always produce equal fingerprints no
/// matter how their maps were built or which `serde_json` features are
/// enabled elsewhere in the build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a document.
    pub fn of(document: &StateDocument) -> Self {
        let mut out = String::new();
        write_object(document, &mut out);
        Self(out)
    }

    /// The canonical serialized form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn write_object(map: &StateDocument, out: &mut String) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        // Display on a Value::String yields the escaped, quoted form.
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_value(value, out);
    }
    out.push('}');
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_object(map, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// A document loaded for one scope in one turn, plus the fingerprint it
/// had when it was loaded and the storage version it was read at.
///
/// There is no per-field dirty tracking: [`CachedState::is_changed`]
/// re-fingerprints the whole document and compares. The version token is
/// metadata, not part of the document, so it never affects the
/// fingerprint and is not reachable through properties.
#[derive(Debug, Clone)]
pub struct CachedState {
    document: StateDocument,
    fingerprint: Fingerprint,
    e_tag: Option<String>,
}

impl CachedState {
    /// Wrap a freshly loaded document, fingerprinting it as-is.
    pub fn new(document: StateDocument) -> Self {
        let fingerprint = Fingerprint::of(&document);
        Self {
            document,
            fingerprint,
            e_tag: None,
        }
    }

    /// Attach the storage version the document was read at.
    pub fn with_e_tag(mut self, e_tag: Option<String>) -> Self {
        self.e_tag = e_tag;
        self
    }

    /// The storage version the document was read at, if the backend
    /// reported one.
    pub fn e_tag(&self) -> Option<&str> {
        self.e_tag.as_deref()
    }

    /// Replace the document with an empty one while keeping the
    /// fingerprint and version of what was originally loaded.
    ///
    /// A cleared non-empty document therefore reads as changed, and a
    /// cleared empty one does not.
    pub fn cleared(&self) -> Self {
        Self {
            document: StateDocument::new(),
            fingerprint: self.fingerprint.clone(),
            e_tag: self.e_tag.clone(),
        }
    }

    /// The current document.
    pub fn document(&self) -> &StateDocument {
        &self.document
    }

    /// Mutable access to the current document.
    pub fn document_mut(&mut self) -> &mut StateDocument {
        &mut self.document
    }

    /// Consume the cache entry, returning the current document.
    pub fn into_document(self) -> StateDocument {
        self.document
    }

    /// The fingerprint captured at load time.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Whether the document differs from what was loaded.
    pub fn is_changed(&self) -> bool {
        self.fingerprint != Fingerprint::of(&self.document)
    }
}

impl Default for CachedState {
    fn default() -> Self {
        Self::new(StateDocument::new())
    }
}
