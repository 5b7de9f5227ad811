//! The step registry: every name the pipeline can call
//!
//! Built once at startup from the collaborators the application
//! exposes, instead of reflecting over live objects at run time. A
//! step name resolves to one of three targets:
//!
//! - undotted `name`            → a host method
//! - `module.function`          → a free function
//! - `module.Class.method`      → a method on a lazily-constructed,
//!                                per-run cached helper instance

use crate::error::{ResolveError, StepError};
use crate::inject::Deps;
use apkforge_core::{CallArgs, Diagnostics};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};

pub type HostFn<H> = Box<dyn Fn(&mut H, &CallArgs) -> Result<(), StepError> + Send + Sync>;
pub type FreeFn = Box<dyn Fn(&CallArgs) -> Result<(), StepError> + Send + Sync>;
pub type HelperFn =
    Box<dyn Fn(&mut dyn Any, &CallArgs, &mut Diagnostics) -> Result<(), StepError> + Send + Sync>;
type HelperCtor = Box<dyn Fn(&Deps) -> Result<Box<dyn Any>, ResolveError> + Send + Sync>;

/// Auto-construction descriptor for one helper class
pub struct HelperSpec {
    requires: Vec<&'static str>,
    construct: HelperCtor,
    methods: BTreeMap<&'static str, HelperFn>,
}

impl HelperSpec {
    /// Describe a helper with its required constructor parameters and a
    /// typed constructor.
    pub fn new<T, F>(requires: &[&'static str], construct: F) -> Self
    where
        T: 'static,
        F: Fn(&Deps) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self {
            requires: requires.to_vec(),
            construct: Box::new(move |deps| Ok(Box::new(construct(deps)?) as Box<dyn Any>)),
            methods: BTreeMap::new(),
        }
    }

    /// Register a method with a typed receiver
    pub fn method<T, F>(mut self, name: &'static str, f: F) -> Self
    where
        T: 'static,
        F: Fn(&mut T, &CallArgs, &mut Diagnostics) -> Result<(), StepError>
            + Send
            + Sync
            + 'static,
    {
        self.methods.insert(
            name,
            Box::new(move |instance, args, diagnostics| {
                let typed = instance.downcast_mut::<T>().ok_or_else(|| {
                    StepError::execution(format!("helper instance type mismatch for '{}'", name))
                })?;
                f(typed, args, diagnostics)
            }),
        );
        self
    }

    pub fn requires(&self) -> &[&'static str] {
        &self.requires
    }

    pub fn construct(&self, deps: &Deps) -> Result<Box<dyn Any>, ResolveError> {
        (self.construct)(deps)
    }
}

/// Resolution result: a reference into the registry, no execution yet
pub enum Target<'r, H> {
    Host(&'r HostFn<H>),
    Function(&'r FreeFn),
    Helper {
        class: &'r str,
        spec: &'r HelperSpec,
        method: &'r HelperFn,
    },
}

impl<'r, H> std::fmt::Debug for Target<'r, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Host(_) => write!(f, "Target::Host(..)"),
            Target::Function(_) => write!(f, "Target::Function(..)"),
            Target::Helper { class, .. } => f
                .debug_struct("Target::Helper")
                .field("class", class)
                .finish_non_exhaustive(),
        }
    }
}

/// Per-run cache of constructed helper instances, keyed by class path.
/// Discarded when the run ends; steps referencing the same helper
/// within one run observe shared instance state.
#[derive(Default)]
pub struct HelperCache {
    instances: HashMap<String, Box<dyn Any>>,
}

impl HelperCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.instances.contains_key(class)
    }

    pub fn insert(&mut self, class: &str, instance: Box<dyn Any>) {
        self.instances.insert(class.to_string(), instance);
    }

    pub fn get_mut(&mut self, class: &str) -> Option<&mut Box<dyn Any>> {
        self.instances.get_mut(class)
    }
}

/// The full step name space for one application
pub struct Registry<H> {
    host_methods: BTreeMap<String, HostFn<H>>,
    functions: BTreeMap<String, FreeFn>,
    helpers: BTreeMap<String, HelperSpec>,
}

impl<H> Registry<H> {
    pub fn new() -> Self {
        Self {
            host_methods: BTreeMap::new(),
            functions: BTreeMap::new(),
            helpers: BTreeMap::new(),
        }
    }

    /// Register a build-phase method on the host object
    pub fn host_method(
        &mut self,
        name: &str,
        f: impl Fn(&mut H, &CallArgs) -> Result<(), StepError> + Send + Sync + 'static,
    ) {
        self.host_methods.insert(name.to_string(), Box::new(f));
    }

    /// Register a free function under `module.function`
    pub fn function(
        &mut self,
        name: &str,
        f: impl Fn(&CallArgs) -> Result<(), StepError> + Send + Sync + 'static,
    ) {
        self.functions.insert(name.to_string(), Box::new(f));
    }

    /// Register a helper class under `module.Class`
    pub fn helper(&mut self, class: &str, spec: HelperSpec) {
        self.helpers.insert(class.to_string(), spec);
    }

    /// Sorted names invocable as plain host steps, for diagnostics and
    /// hint generation. The registry only ever holds public step names,
    /// so nothing needs excluding here.
    pub fn host_names(&self) -> Vec<&str> {
        self.host_methods.keys().map(String::as_str).collect()
    }

    /// Case-insensitive substring matches against the host methods
    fn near_matches(&self, name: &str) -> Vec<&str> {
        let needle = name.to_lowercase();
        self.host_methods
            .keys()
            .filter(|candidate| candidate.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    fn module_known(&self, module: &str) -> bool {
        let prefix = format!("{}.", module);
        self.functions.keys().any(|n| n.starts_with(&prefix))
            || self.helpers.keys().any(|n| n.starts_with(&prefix))
    }

    /// Resolve a step name to a target. Produces a reference only;
    /// helper construction happens at the call site against the
    /// per-run cache.
    pub fn resolve<'r>(&'r self, name: &str) -> Result<Target<'r, H>, ResolveError> {
        let segments: Vec<&str> = name.split('.').collect();

        match segments.as_slice() {
            [plain] => match self.host_methods.get(*plain) {
                Some(f) => Ok(Target::Host(f)),
                None => {
                    let similar = self.near_matches(plain);
                    let hint = if similar.is_empty() {
                        String::new()
                    } else {
                        format!(
                            "\n  Did you mean one of: {}",
                            similar[..similar.len().min(5)].join(", ")
                        )
                    };
                    Err(ResolveError::UnknownHostMethod {
                        name: name.to_string(),
                        hint,
                    })
                }
            },

            [module, attr] => {
                if let Some(f) = self.functions.get(name) {
                    return Ok(Target::Function(f));
                }
                if self.helpers.contains_key(name) {
                    return Err(ResolveError::ClassNotCallable {
                        name: name.to_string(),
                    });
                }
                if self.module_known(module) {
                    Err(ResolveError::UnknownAttribute {
                        owner: module.to_string(),
                        attr: attr.to_string(),
                    })
                } else {
                    Err(ResolveError::UnknownModule {
                        module: module.to_string(),
                        name: name.to_string(),
                    })
                }
            }

            [module, class, method] => {
                let class_path = format!("{}.{}", module, class);
                let (key, spec) = match self.helpers.get_key_value(&class_path) {
                    Some(entry) => entry,
                    None => {
                        return if self.module_known(module) {
                            Err(ResolveError::UnknownAttribute {
                                owner: module.to_string(),
                                attr: class.to_string(),
                            })
                        } else {
                            Err(ResolveError::UnknownModule {
                                module: module.to_string(),
                                name: name.to_string(),
                            })
                        };
                    }
                };

                let method_fn =
                    spec.methods
                        .get(*method)
                        .ok_or_else(|| ResolveError::UnknownAttribute {
                            owner: class_path.clone(),
                            attr: method.to_string(),
                        })?;

                Ok(Target::Helper {
                    class: key,
                    spec,
                    method: method_fn,
                })
            }

            _ => Err(ResolveError::TooManyDots {
                name: name.to_string(),
            }),
        }
    }
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}
