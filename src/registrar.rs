//! Registrars: applying middlewares to a whole router at once.
//!
//! A [`MiddlewareRegistrar`] decorates every router endpoint that passes its
//! filters with one [`MultipleMiddleware`]. Registrars are either built in
//! code or from [`RegistrarSettings`], usually loaded from TOML:
//!
//! ```toml
//! global_middlewares = ["trace"]
//! middlewares = ["errors"]
//!
//! [environments.admin]
//! middlewares = ["session"]
//! use_for_blueprint = true
//! ```
//!
//! Settings name middlewares; a [`MiddlewareCatalog`] resolves the names to
//! instances.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Error;
use crate::middleware::{MultipleMiddleware, SharedMiddleware};
use crate::router::Router;
use crate::tools::BinarySet;

/// Something that installs middlewares into a router.
pub trait Registrar {
    fn init_app(&self, router: &mut Router);
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Registrar settings, as found in a settings file.
///
/// Every field is optional. An environment is a nested `RegistrarSettings`
/// whose values replace the root ones for that environment's registrar,
/// except `global_middlewares`, which are merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrarSettings {
    pub middlewares: Vec<String>,
    pub global_middlewares: Vec<String>,
    /// Environment sections, in the order the settings declare them.
    pub environments: IndexMap<String, RegistrarSettings>,
    /// Whether global middlewares are added at all. Defaults to `true`.
    pub use_global_middlewares: Option<bool>,
    /// Whether global middlewares wrap the local ones. Defaults to `true`.
    pub is_global_middlewares_higher: Option<bool>,
    /// Whether an environment's global middlewares wrap the root ones.
    /// Defaults to `false`.
    pub is_environment_middlewares_higher: Option<bool>,
    pub view_names: Option<BinarySet<String>>,
    pub blueprints: Option<BinarySet<String>>,
    pub use_for_blueprint: Option<BlueprintTarget>,
    pub is_apply_static: Option<bool>,
    pub is_apply_root_views: Option<bool>,
}

/// The blueprint a registrar is dedicated to.
///
/// `true` means "the blueprint named like the current environment"; `false`
/// means no dedicated blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BlueprintTarget {
    Implicit(bool),
    Named(String),
}

impl RegistrarSettings {
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let source = tokio::fs::read_to_string(path.as_ref()).await?;
        debug!(path = %path.as_ref().display(), "registrar settings loaded");
        Self::from_toml(&source)
    }
}

/// Values that take precedence over [`RegistrarSettings`] when building a
/// registrar, plus the environment to build it for.
#[derive(Debug, Clone, Default)]
pub struct RegistrarOptions {
    pub environment: Option<String>,
    pub view_names: Option<BinarySet<String>>,
    pub blueprints: Option<BinarySet<String>>,
    pub use_global_middlewares: Option<bool>,
    pub use_for_blueprint: Option<BlueprintTarget>,
    pub is_global_middlewares_higher: Option<bool>,
    pub is_environment_middlewares_higher: Option<bool>,
    pub is_apply_static: Option<bool>,
    pub is_apply_root_views: Option<bool>,
}

impl RegistrarOptions {
    pub fn for_environment(environment: impl Into<String>) -> Self {
        Self { environment: Some(environment.into()), ..Self::default() }
    }
}

/// Named middlewares that settings can refer to.
#[derive(Clone, Default)]
pub struct MiddlewareCatalog {
    middlewares: HashMap<String, SharedMiddleware>,
}

impl MiddlewareCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, middleware: SharedMiddleware) -> Self {
        self.insert(name, middleware);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, middleware: SharedMiddleware) {
        self.middlewares.insert(name.into(), middleware);
    }

    pub fn get(&self, name: &str) -> Option<&SharedMiddleware> {
        self.middlewares.get(name)
    }

    fn resolve(&self, names: &[String]) -> Result<Vec<SharedMiddleware>, Error> {
        names.iter()
            .map(|name| {
                self.get(name)
                    .cloned()
                    .ok_or_else(|| Error::Config(format!("unknown middleware \"{name}\"")))
            })
            .collect()
    }
}

// ── MiddlewareRegistrar ───────────────────────────────────────────────────────

/// Decorates the router endpoints it selects with a [`MultipleMiddleware`].
///
/// An endpoint is selected when all of these hold:
///
/// - its name is not `static`, unless `is_apply_static` is set;
/// - its name is in `view_names`;
/// - it belongs to no blueprint and `is_apply_root_views` is set, or one of
///   its blueprint segments is in `blueprints`.
///
/// Blueprint segments are the dot-separated parts of an endpoint name before
/// the last one: `admin.users.list` belongs to `admin` and `users`.
pub struct MiddlewareRegistrar {
    proxy: MultipleMiddleware,
    view_names: BinarySet<String>,
    blueprints: BinarySet<String>,
    is_apply_static: bool,
    is_apply_root_views: bool,
}

impl MiddlewareRegistrar {
    /// A registrar for every endpoint except `static`.
    pub fn new(middlewares: impl IntoIterator<Item = SharedMiddleware>) -> Self {
        Self {
            proxy: MultipleMiddleware::new(middlewares),
            view_names: BinarySet::default(),
            blueprints: BinarySet::default(),
            is_apply_static: false,
            is_apply_root_views: true,
        }
    }

    pub fn with_view_names(mut self, view_names: BinarySet<String>) -> Self {
        self.view_names = view_names;
        self
    }

    pub fn with_blueprints(mut self, blueprints: BinarySet<String>) -> Self {
        self.blueprints = blueprints;
        self
    }

    pub fn apply_static(mut self, is_apply_static: bool) -> Self {
        self.is_apply_static = is_apply_static;
        self
    }

    pub fn apply_root_views(mut self, is_apply_root_views: bool) -> Self {
        self.is_apply_root_views = is_apply_root_views;
        self
    }

    pub fn middlewares(&self) -> &[SharedMiddleware] {
        self.proxy.middlewares()
    }

    pub fn set_middlewares(&mut self, middlewares: impl IntoIterator<Item = SharedMiddleware>) {
        self.proxy.set_middlewares(middlewares);
    }

    pub fn view_names(&self) -> &BinarySet<String> {
        &self.view_names
    }

    pub fn blueprints(&self) -> &BinarySet<String> {
        &self.blueprints
    }

    pub fn is_apply_static(&self) -> bool {
        self.is_apply_static
    }

    pub fn is_apply_root_views(&self) -> bool {
        self.is_apply_root_views
    }

    /// Whether endpoint `name` gets decorated by this registrar.
    pub fn is_selected(&self, name: &str) -> bool {
        (name != "static" || self.is_apply_static)
            && self.view_names.contains(name)
            && self.is_selected_by_blueprint(name)
    }

    fn is_selected_by_blueprint(&self, name: &str) -> bool {
        let mut segments = name.split('.').collect::<Vec<_>>();
        segments.pop();

        (segments.is_empty() && self.is_apply_root_views)
            || segments.iter().any(|segment| self.blueprints.contains(*segment))
    }

    /// Builds a registrar from settings.
    ///
    /// Middlewares are the global ones followed by the local ones, with the
    /// order and presence of the global ones controlled by
    /// `is_global_middlewares_higher` and `use_global_middlewares`. For an
    /// environment, the root global middlewares are merged with the
    /// environment's own (after them, or before them with
    /// `is_environment_middlewares_higher`) and every other value is read
    /// from the environment section.
    ///
    /// `use_for_blueprint` adds its blueprint to `blueprints` and turns
    /// `is_apply_root_views` off unless that is set explicitly.
    ///
    /// Every value in `options` overrides its settings counterpart.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the environment does not exist, when no
    /// middlewares are configured at all, when `use_for_blueprint = true` is
    /// used without an environment or when a middleware name is not in
    /// `catalog`.
    pub fn from_settings(
        settings: &RegistrarSettings,
        catalog: &MiddlewareCatalog,
        options: RegistrarOptions,
    ) -> Result<Self, Error> {
        let environment = options.environment.as_deref();
        let mut global_middlewares = settings.global_middlewares.clone();

        let config = match environment {
            None => settings,
            Some(name) => {
                let config = settings.environments.get(name)
                    .ok_or_else(|| Error::Config(format!("environment \"{name}\" missing")))?;

                let is_environment_higher = options.is_environment_middlewares_higher
                    .or(config.is_environment_middlewares_higher)
                    .unwrap_or(false);

                if is_environment_higher {
                    global_middlewares.splice(0..0, config.global_middlewares.iter().cloned());
                } else {
                    global_middlewares.extend(config.global_middlewares.iter().cloned());
                }
                config
            }
        };

        if config.middlewares.is_empty() && global_middlewares.is_empty() {
            let owner = match environment {
                None => "the settings".to_owned(),
                Some(name) => format!("environment \"{name}\""),
            };
            return Err(Error::Config(format!("{owner} doesn't have any available middlewares")));
        }

        let use_global = options.use_global_middlewares
            .or(config.use_global_middlewares)
            .unwrap_or(true);
        let is_global_higher = options.is_global_middlewares_higher
            .or(config.is_global_middlewares_higher)
            .unwrap_or(true);

        let names = match (use_global, is_global_higher) {
            (false, _) => config.middlewares.clone(),
            (true, true) => [global_middlewares, config.middlewares.clone()].concat(),
            (true, false) => [config.middlewares.clone(), global_middlewares].concat(),
        };

        let view_names = options.view_names.or_else(|| config.view_names.clone());
        let mut blueprints = options.blueprints.or_else(|| config.blueprints.clone());
        let mut is_apply_root_views = options.is_apply_root_views.or(config.is_apply_root_views);
        let is_apply_static = options.is_apply_static.or(config.is_apply_static);

        let target = match options.use_for_blueprint.or_else(|| config.use_for_blueprint.clone()) {
            Some(BlueprintTarget::Named(name)) => Some(name),
            Some(BlueprintTarget::Implicit(true)) => match environment {
                Some(name) => Some(name.to_owned()),
                None => {
                    return Err(Error::Config("there is no implicit reference to the blueprint".to_owned()));
                }
            },
            Some(BlueprintTarget::Implicit(false)) | None => None,
        };

        if let Some(target) = target {
            blueprints.get_or_insert_with(BinarySet::default).include(target);
            is_apply_root_views.get_or_insert(false);
        }

        let registrar = Self::new(catalog.resolve(&names)?)
            .with_view_names(view_names.unwrap_or_default())
            .with_blueprints(blueprints.unwrap_or_default())
            .apply_static(is_apply_static.unwrap_or(false))
            .apply_root_views(is_apply_root_views.unwrap_or(true));

        debug!(environment, middlewares = ?names, "middleware registrar built");
        Ok(registrar)
    }
}

impl Registrar for MiddlewareRegistrar {
    fn init_app(&self, router: &mut Router) {
        let mut decorated = 0;

        for endpoint in router.endpoints_mut() {
            if !self.is_selected(endpoint.name()) {
                continue;
            }
            let route = self.proxy.chain(endpoint.route().clone());
            endpoint.set_route(route);
            decorated += 1;
            debug!(endpoint = endpoint.name(), "middlewares applied");
        }

        info!(decorated, middlewares = self.proxy.middlewares().len(), "middleware registrar initialized");
    }
}

// ── MultipleMiddlewareRegistrar ───────────────────────────────────────────────

/// Several registrars applied to one router, in order.
pub struct MultipleMiddlewareRegistrar {
    registrars: Vec<Box<dyn Registrar>>,
}

impl MultipleMiddlewareRegistrar {
    pub fn new(registrars: impl IntoIterator<Item = Box<dyn Registrar>>) -> Self {
        Self { registrars: registrars.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.registrars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrars.is_empty()
    }

    /// One [`MiddlewareRegistrar`] per environment, in declaration order,
    /// followed by the root registrar when `is_root_registrar_creating` is set.
    ///
    /// `options.environment` is replaced for each registrar; its other values
    /// apply to all of them.
    pub fn from_settings(
        settings: &RegistrarSettings,
        catalog: &MiddlewareCatalog,
        options: RegistrarOptions,
        is_root_registrar_creating: bool,
    ) -> Result<Self, Error> {
        let mut environments = settings.environments.keys().cloned().map(Some).collect::<Vec<_>>();
        if is_root_registrar_creating {
            environments.push(None);
        }

        let registrars = environments.into_iter()
            .map(|environment| {
                let options = RegistrarOptions { environment, ..options.clone() };
                MiddlewareRegistrar::from_settings(settings, catalog, options)
                    .map(|registrar| Box::new(registrar) as Box<dyn Registrar>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { registrars })
    }
}

impl Registrar for MultipleMiddlewareRegistrar {
    fn init_app(&self, router: &mut Router) {
        for registrar in &self.registrars {
            registrar.init_app(router);
        }
    }
}
