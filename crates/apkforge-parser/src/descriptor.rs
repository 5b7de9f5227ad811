//! Splitting a step line into its name and raw argument text

use crate::error::{ParseError, Result};
use apkforge_core::StepDescriptor;

/// Parse one pipeline line into a [`StepDescriptor`].
///
/// The name is everything before the first `(`; the argument text is
/// everything between that `(` and the final `)`. A line containing a
/// `(` must end with `)`.
pub fn parse_descriptor(raw: &str) -> Result<StepDescriptor> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyDescriptor);
    }

    match trimmed.find('(') {
        None => Ok(StepDescriptor {
            raw: raw.to_string(),
            name: trimmed.to_string(),
            args_text: None,
        }),
        Some(open) => {
            if !trimmed.ends_with(')') {
                return Err(ParseError::MalformedDescriptor(trimmed.to_string()));
            }
            let name = trimmed[..open].trim();
            if name.is_empty() {
                return Err(ParseError::MalformedDescriptor(trimmed.to_string()));
            }
            let body = &trimmed[open + 1..trimmed.len() - 1];
            Ok(StepDescriptor {
                raw: raw.to_string(),
                name: name.to_string(),
                args_text: Some(body.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name() {
        let step = parse_descriptor("  sign_apk  ").unwrap();
        assert_eq!(step.name, "sign_apk");
        assert_eq!(step.args_text, None);
    }

    #[test]
    fn test_name_with_args() {
        let step = parse_descriptor("zipalign_apk('unsigned.apk')").unwrap();
        assert_eq!(step.name, "zipalign_apk");
        assert_eq!(step.args_text.as_deref(), Some("'unsigned.apk'"));
    }

    #[test]
    fn test_dotted_name() {
        let step = parse_descriptor("decompiler.Decompiler.decompile").unwrap();
        assert_eq!(step.depth(), 2);
    }

    #[test]
    fn test_inner_parens_kept_in_body() {
        // greedy match up to the final closing paren
        let step = parse_descriptor("run(['a', 'b'], label='x(y)')").unwrap();
        assert_eq!(step.args_text.as_deref(), Some("['a', 'b'], label='x(y)'"));
    }

    #[test]
    fn test_unclosed_paren_rejected() {
        assert!(matches!(
            parse_descriptor("sign_apk('x'"),
            Err(ParseError::MalformedDescriptor(_))
        ));
    }

    #[test]
    fn test_empty_line_rejected() {
        assert!(matches!(parse_descriptor("   "), Err(ParseError::EmptyDescriptor)));
    }
}
