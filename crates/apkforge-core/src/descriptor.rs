//! Step descriptor: one configured pipeline instruction

/// A single parsed pipeline step line: a dotted name plus the raw text
/// of an optional parenthesized literal-argument list.
///
/// Immutable once parsed. List order in the configuration is execution
/// order; there is no other ordering invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    /// The original configuration line, untouched
    pub raw: String,
    /// The dotted or undotted step name, trimmed
    pub name: String,
    /// Text between the first `(` and the final `)`, if present
    pub args_text: Option<String>,
}

impl StepDescriptor {
    /// Name shown in progress lines and reports
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// Number of dot separators in the name
    pub fn depth(&self) -> usize {
        self.name.matches('.').count()
    }
}
