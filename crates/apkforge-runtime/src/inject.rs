//! Dependency injection for auto-constructed helpers
//!
//! A fixed table mapping recognized constructor parameter names to
//! provider functions over the host. Helpers declare which parameters
//! they require; a required name outside the table is a hard error,
//! never a guess.

use crate::error::ResolveError;
use apkforge_core::{PathTable, ProjectConfig};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// One resolved dependency value handed to a helper constructor
#[derive(Debug, Clone)]
pub enum Dep {
    /// Recognized but currently absent (e.g. a tool not yet located)
    Null,
    Path(PathBuf),
    Paths(PathTable),
    Config(Arc<ProjectConfig>),
}

impl Dep {
    fn kind(&self) -> &'static str {
        match self {
            Dep::Null => "null",
            Dep::Path(_) => "path",
            Dep::Paths(_) => "path table",
            Dep::Config(_) => "config",
        }
    }
}

type Provider<H> = Box<dyn Fn(&H) -> Dep + Send + Sync>;

/// The recognized-parameter table for one pipeline run
pub struct Injector<H> {
    providers: BTreeMap<&'static str, Provider<H>>,
}

impl<H> Injector<H> {
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// Register a provider for a recognized parameter name
    pub fn provider(
        mut self,
        name: &'static str,
        f: impl Fn(&H) -> Dep + Send + Sync + 'static,
    ) -> Self {
        self.providers.insert(name, Box::new(f));
        self
    }

    /// Resolve every required parameter for `class`, failing fast on
    /// the first unrecognized name.
    pub fn resolve(
        &self,
        class: &str,
        requires: &[&'static str],
        host: &H,
    ) -> Result<Deps, ResolveError> {
        let mut map = BTreeMap::new();
        for &param in requires {
            let provider = self
                .providers
                .get(param)
                .ok_or_else(|| ResolveError::UnknownParameter {
                    class: class.to_string(),
                    param: param.to_string(),
                })?;
            map.insert(param, provider(host));
        }
        Ok(Deps {
            class: class.to_string(),
            map,
        })
    }
}

impl<H> Default for Injector<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolved dependency values, keyed by parameter name
#[derive(Debug)]
pub struct Deps {
    class: String,
    map: BTreeMap<&'static str, Dep>,
}

impl Deps {
    fn get(&self, param: &'static str) -> Result<&Dep, ResolveError> {
        self.map
            .get(param)
            .ok_or_else(|| ResolveError::UnknownParameter {
                class: self.class.clone(),
                param: param.to_string(),
            })
    }

    fn bad(&self, param: &'static str, expected: &'static str, actual: &Dep) -> ResolveError {
        ResolveError::BadDependency {
            class: self.class.clone(),
            param: param.to_string(),
            expected,
            actual: actual.kind(),
        }
    }

    /// A path that must be present
    pub fn path(&self, param: &'static str) -> Result<PathBuf, ResolveError> {
        match self.get(param)? {
            Dep::Path(p) => Ok(p.clone()),
            other => Err(self.bad(param, "path", other)),
        }
    }

    /// A path that may legitimately be absent
    pub fn opt_path(&self, param: &'static str) -> Result<Option<PathBuf>, ResolveError> {
        match self.get(param)? {
            Dep::Path(p) => Ok(Some(p.clone())),
            Dep::Null => Ok(None),
            other => Err(self.bad(param, "path", other)),
        }
    }

    pub fn paths(&self, param: &'static str) -> Result<PathTable, ResolveError> {
        match self.get(param)? {
            Dep::Paths(t) => Ok(t.clone()),
            other => Err(self.bad(param, "path table", other)),
        }
    }

    pub fn config(&self, param: &'static str) -> Result<Arc<ProjectConfig>, ResolveError> {
        match self.get(param)? {
            Dep::Config(c) => Ok(Arc::clone(c)),
            other => Err(self.bad(param, "config", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHost {
        jar: PathBuf,
    }

    fn injector() -> Injector<FakeHost> {
        Injector::new()
            .provider("apktool_jar", |h: &FakeHost| Dep::Path(h.jar.clone()))
            .provider("logger", |_| Dep::Null)
    }

    #[test]
    fn test_resolve_known_parameters() {
        let host = FakeHost {
            jar: PathBuf::from("/tools/apktool.jar"),
        };
        let deps = injector()
            .resolve("decompiler.Decompiler", &["apktool_jar", "logger"], &host)
            .unwrap();
        assert_eq!(deps.path("apktool_jar").unwrap(), host.jar);
        assert_eq!(deps.opt_path("logger").unwrap(), None);
    }

    #[test]
    fn test_unknown_parameter_fails_fast() {
        let host = FakeHost {
            jar: PathBuf::new(),
        };
        let err = injector()
            .resolve("cpp_builder.NativeBuilder", &["cmakelists_path"], &host)
            .unwrap_err();
        match err {
            ResolveError::UnknownParameter { class, param } => {
                assert_eq!(class, "cpp_builder.NativeBuilder");
                assert_eq!(param, "cmakelists_path");
            }
            other => panic!("expected UnknownParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_dependency_kind() {
        let host = FakeHost {
            jar: PathBuf::new(),
        };
        let deps = injector().resolve("x.Y", &["logger"], &host).unwrap();
        assert!(matches!(
            deps.path("logger"),
            Err(ResolveError::BadDependency { .. })
        ));
    }
}
