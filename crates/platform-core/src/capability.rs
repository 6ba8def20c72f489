//! Host capability records.

use serde::{Deserialize, Serialize};

/// A host feature the recorder may need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Label shown in the capability report.
    pub name: String,
    /// Whether the host provides it.
    pub available: bool,
    /// Recording is impossible without it.
    pub required: bool,
}

impl Capability {
    pub fn new(name: impl Into<String>, available: bool, required: bool) -> Self {
        Self {
            name: name.into(),
            available,
            required,
        }
    }

    /// One report line, e.g. `getDisplayMedia: ✅`.
    pub fn report_line(&self) -> String {
        format!("{}: {}", self.name, status_mark(self.available))
    }
}

/// The check/cross mark used in capability reports.
pub fn status_mark(available: bool) -> &'static str {
    if available {
        "✅"
    } else {
        "❌"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_line_uses_marks() {
        assert_eq!(
            Capability::new("MediaRecorder", true, true).report_line(),
            "MediaRecorder: ✅"
        );
        assert_eq!(
            Capability::new("supports video/mp4", false, false).report_line(),
            "supports video/mp4: ❌"
        );
    }
}
