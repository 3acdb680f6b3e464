use std::collections::BTreeMap;
use std::fmt::{self, Display, Write as _};

use serde::Serialize;

use crate::types::Severity;

pub const SOURCE_TAG: &str = "source";
pub const SOURCE_VALUE: &str = "container-runtime";

/// A normalized runtime event ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub timestamp: u64,
    pub title: String,
    pub body: String,
    pub scope: String,
    pub tags: BTreeMap<String, String>,
    pub severity: Severity,
}

impl Notification {
    pub fn source_tags() -> BTreeMap<String, String> {
        BTreeMap::from([(SOURCE_TAG.to_string(), SOURCE_VALUE.to_string())])
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timestamp: {}", self.timestamp)?;
        writeln!(f, "name: \"{}\"", Escaped(&self.title))?;
        writeln!(f, "description: \"{}\"", Escaped(&self.body))?;
        writeln!(f, "scope: \"{}\"", Escaped(&self.scope))?;
        write!(f, "priority: {}", self.severity)?;
        if !self.tags.is_empty() {
            f.write_str("\ntags:")?;
            for (key, value) in &self.tags {
                write!(f, "\n  \"{}\": \"{}\"", Escaped(key), Escaped(value))?;
            }
        }
        Ok(())
    }
}

struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            if matches!(ch, '"' | '\\') {
                f.write_char('\\')?;
            }
            f.write_char(ch)?;
        }
        Ok(())
    }
}
