use std::{
    any::type_name,
    collections::{HashMap, hash_map},
    fmt,
    sync::Arc,
};

use parse_display::Display;
use tracing::debug;

use super::{Error, RegistrationError, Result, Service};

/// Lower-cased `name` or `name/version` used to address a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{0}")]
pub struct ServiceKey(String);

impl ServiceKey {
    pub fn new(name: &str, version: &str) -> Self {
        let mut key = name.to_lowercase();
        if !version.is_empty() {
            key.push('/');
            key.push_str(&version.to_lowercase());
        }
        Self(key)
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The `(name, version)` a service type declares itself under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceName {
    pub name: String,
    pub version: String,
}
impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
        }
    }
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(&self.name, &self.version)
    }
}

/// A service type that declares the name it is registered under.
pub trait DeclareService: Service + Sized {
    fn declarations() -> Vec<ServiceName>;
    fn create() -> Self;
}

/// A candidate for registration: the declarations of a service type and a
/// factory for its instance.
pub struct ServiceDescriptor {
    type_name: &'static str,
    declarations: Vec<ServiceName>,
    factory: Box<dyn FnOnce() -> Arc<dyn Service>>,
}
impl ServiceDescriptor {
    pub fn of<S: DeclareService>() -> Self {
        Self::new(type_name::<S>(), S::declarations(), || {
            Arc::new(S::create()) as Arc<dyn Service>
        })
    }
    pub fn new(
        type_name: &'static str,
        declarations: Vec<ServiceName>,
        factory: impl FnOnce() -> Arc<dyn Service> + 'static,
    ) -> Self {
        Self {
            type_name,
            declarations,
            factory: Box::new(factory),
        }
    }
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
    pub fn declarations(&self) -> &[ServiceName] {
        &self.declarations
    }
}
impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("type_name", &self.type_name)
            .field("declarations", &self.declarations)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ServiceRegistryBuilder {
    services: HashMap<ServiceKey, Arc<dyn Service>>,
}

impl ServiceRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates and registers the service a descriptor declares.
    ///
    /// A descriptor without a name is skipped.
    pub fn register(
        mut self,
        descriptor: ServiceDescriptor,
    ) -> Result<Self, RegistrationError> {
        let name = match descriptor.declarations.as_slice() {
            [] => return Ok(self),
            [name] => name,
            names => {
                return Err(RegistrationError::MultipleDeclarations {
                    type_name: descriptor.type_name,
                    count: names.len(),
                });
            }
        };
        if name.name.is_empty() {
            debug!(type_name = descriptor.type_name, "skipping unnamed service");
            return Ok(self);
        }
        let key = name.key();
        if self.services.contains_key(&key) {
            return Err(RegistrationError::DuplicateService(key));
        }
        let service = (descriptor.factory)();
        self.insert_key(key, service)?;
        Ok(self)
    }

    /// Registers an already constructed service.
    pub fn insert(
        mut self,
        name: &str,
        version: &str,
        service: Arc<dyn Service>,
    ) -> Result<Self, RegistrationError> {
        self.insert_key(ServiceKey::new(name, version), service)?;
        Ok(self)
    }

    fn insert_key(
        &mut self,
        key: ServiceKey,
        service: Arc<dyn Service>,
    ) -> Result<(), RegistrationError> {
        match self.services.entry(key) {
            hash_map::Entry::Occupied(e) => {
                Err(RegistrationError::DuplicateService(e.key().clone()))
            }
            hash_map::Entry::Vacant(e) => {
                debug!(key = %e.key(), "registered service");
                e.insert(service);
                Ok(())
            }
        }
    }

    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            services: self.services,
        }
    }
}

/// Immutable table of services keyed by [`ServiceKey`].
pub struct ServiceRegistry {
    services: HashMap<ServiceKey, Arc<dyn Service>>,
}

impl ServiceRegistry {
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::new()
    }
    pub fn lookup(&self, name: &str, version: &str) -> Result<&Arc<dyn Service>> {
        let key = ServiceKey::new(name, version);
        match self.services.get(&key) {
            Some(service) => Ok(service),
            None => Err(Error::ServiceNotFound(key)),
        }
    }
    pub fn contains(&self, name: &str, version: &str) -> bool {
        self.services.contains_key(&ServiceKey::new(name, version))
    }
    pub fn keys(&self) -> impl Iterator<Item = &ServiceKey> {
        self.services.keys()
    }
    pub fn len(&self) -> usize {
        self.services.len()
    }
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.services.keys().collect();
        keys.sort();
        f.debug_struct("ServiceRegistry")
            .field("services", &keys)
            .finish()
    }
}
