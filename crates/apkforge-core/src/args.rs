//! Parsed call arguments for a pipeline step

use crate::error::{CoreError, Result};
use crate::value::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Positional and keyword arguments attached to a step descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: HashMap<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    /// Positional string argument, erroring on a non-string value
    pub fn get_str(&self, index: usize) -> Result<Option<&str>> {
        match self.positional.get(index) {
            None => Ok(None),
            Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(CoreError::TypeError(format!(
                "argument {} must be a string, got {}",
                index + 1,
                other.type_name()
            ))),
        }
    }

    /// Positional path argument (a string interpreted as a path)
    pub fn get_path(&self, index: usize) -> Result<Option<PathBuf>> {
        Ok(self.get_str(index)?.map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_args() {
        let args = CallArgs::new();
        assert!(args.is_empty());
        assert_eq!(args.get(0), None);
        assert_eq!(args.keyword("x"), None);
    }

    #[test]
    fn test_typed_accessors() {
        let args = CallArgs {
            positional: vec![Value::String("out.apk".to_string()), Value::Int(4)],
            keyword: HashMap::new(),
        };

        assert_eq!(args.get_str(0).unwrap(), Some("out.apk"));
        assert_eq!(args.get_path(0).unwrap(), Some(PathBuf::from("out.apk")));
        assert!(args.get_str(1).is_err());
        assert_eq!(args.get_str(2).unwrap(), None);
    }

    #[test]
    fn test_null_reads_as_absent() {
        let args = CallArgs {
            positional: vec![Value::Null],
            keyword: HashMap::new(),
        };
        assert_eq!(args.get_str(0).unwrap(), None);
    }
}
