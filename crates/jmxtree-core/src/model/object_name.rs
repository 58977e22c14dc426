// ── Identifier parsing ──
//
// `domain:k1=v1,k2=v2` → domain + ordered property list. Parsing never
// fails: malformed input degrades to an empty domain or to key == value.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Escape `<` and `>` only; everything else passes through untouched.
pub fn escape_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

/// Split one `key=value` segment on its first `=`.
///
/// A segment without `=`, or starting with one, yields the raw segment as
/// both key and value.
pub fn split_property(segment: &str) -> (String, String) {
    match segment.find('=') {
        Some(pos) if pos > 0 => (
            segment[..pos].to_string(),
            segment[pos + 1..].to_string(),
        ),
        _ => (segment.to_string(), segment.to_string()),
    }
}

/// Strip one matching pair of surrounding `"` or `'` quotes.
pub fn trim_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() > 1 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

// ── Property ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// Ordered property list as declared in the identifier.
///
/// Duplicate keys are kept; lookups return the last occurrence, matching
/// how a map built from the list would resolve them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyList {
    properties: Vec<Property>,
}

impl PropertyList {
    /// Parse the part after `domain:`.
    ///
    /// Splits naively on `,`; quoted values containing commas are not
    /// honoured. Empty segments are skipped. An empty value falls back to
    /// the key.
    pub fn parse(text: &str) -> Self {
        let properties = text
            .split(',')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (key, value) = split_property(segment);
                let value = if value.is_empty() { key.clone() } else { value };
                Property {
                    key,
                    value: escape_tags(&value),
                }
            })
            .collect();
        Self { properties }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Property values in declaration order.
    pub fn values(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.value.clone()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .rev()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .rev()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .map(|p| p.value.as_str())
    }

    /// Value of the case-insensitive `type` key.
    pub fn type_name(&self) -> Option<&str> {
        self.get_ignore_case("type")
    }

    /// Value of the case-insensitive `service` key.
    pub fn service_name(&self) -> Option<&str> {
        self.get_ignore_case("service")
    }

    /// Collapse into a key → value map (later duplicates win).
    pub fn to_entries(&self) -> IndexMap<String, String> {
        self.properties
            .iter()
            .map(|p| (p.key.clone(), p.value.clone()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a PropertyList {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

// ── ObjectName ───────────────────────────────────────────────────────

/// A parsed `domain:properties` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectName {
    pub domain: String,
    pub properties: PropertyList,
}

impl ObjectName {
    /// Parse a full identifier. A missing `:` yields an empty domain with
    /// the whole text as the property list.
    pub fn parse(text: &str) -> Self {
        let (domain, props) = text.split_once(':').unwrap_or(("", text));
        Self {
            domain: domain.to_string(),
            properties: PropertyList::parse(props),
        }
    }

    /// Properties as borrowed `(key, value)` pairs, for structural queries.
    pub fn property_pairs(&self) -> Vec<(&str, &str)> {
        self.properties
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect()
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, p) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", p.key, p.value)?;
        }
        Ok(())
    }
}
