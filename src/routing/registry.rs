//! Route registry.
//!
//! # Responsibilities
//! - Own the mapping from route name to handler chain and per-route config
//! - Bake middleware/afterware into chains at registration time
//! - Compose registries (`merge`) and mount sub-trees (`namespace`)
//! - Update per-route metadata (`describe`)
//!
//! # Design Decisions
//! - The registry is a plain owned value; no global state
//! - Chains are copied into the destination on merge/namespace, never aliased
//! - Composition checks every name before inserting anything
//! - A route timeout left unset falls back to the dispatching registry's default

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::routing::handler::{handler, BoxedHandler, HandlerChain, HandlerResult};
use crate::routing::validate::{validate_route_name, RouteNameError};
use crate::dispatch::context::Context;

/// Route timeout used when neither the route nor the registry sets one.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    InvalidRoute(#[from] RouteNameError),

    #[error("Route already exists: {0}")]
    DuplicateRoute(String),

    #[error("Route has no handlers: {0}")]
    EmptyChain(String),

    #[error("Route does not exist: {0}")]
    UnknownRoute(String),

    #[error("No routes to merge")]
    NothingToMerge,

    #[error("Cannot merge duplicate routes: {0}")]
    MergeConflict(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Router construction options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Timeout in milliseconds stamped on every route registered here.
    /// Unset means [`DEFAULT_TIMEOUT_MS`] at dispatch time.
    pub timeout: Option<u64>,

    /// Initial `visible` flag of registered routes.
    pub introspection: bool,

    /// Attach error source chains to item errors. Unset means "outside production".
    pub expose_stack: Option<bool>,
}

impl RouterOptions {
    /// Options with an explicit route timeout.
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout: Some(timeout_ms),
            ..Self::default()
        }
    }

    /// Read options from a loosely typed JSON object.
    ///
    /// `timeout` must be a positive integer and `introspection` a boolean.
    /// Other keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let Value::Object(fields) = value else {
            return Err(RegistryError::InvalidConfig("Options should be an object".into()));
        };

        let mut options = Self::default();
        match fields.get("timeout") {
            None | Some(Value::Null) => {}
            Some(timeout) => options.timeout = Some(positive_int(timeout)?),
        }
        match fields.get("introspection") {
            None | Some(Value::Null) => {}
            Some(Value::Bool(flag)) => options.introspection = *flag,
            Some(_) => return Err(RegistryError::InvalidConfig("Introspection should be true or false".into())),
        }
        Ok(options)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.timeout == Some(0) {
            return Err(RegistryError::InvalidConfig("Timeout should be a positive integer".into()));
        }
        Ok(())
    }
}

fn positive_int(value: &Value) -> Result<u64, RegistryError> {
    value
        .as_u64()
        .filter(|&n| n > 0)
        .ok_or_else(|| RegistryError::InvalidConfig("Timeout should be a positive integer".into()))
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    pub(crate) chain: HandlerChain,
    pub description: Option<String>,
    pub schema: Option<Map<String, Value>>,
    pub visible: bool,
    pub validate: bool,
    pub timeout: Option<Duration>,
}

impl Route {
    /// Number of handlers in the chain, middleware and afterware included.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }
}

/// Metadata update for [`Router::describe`].
///
/// The outer `None` leaves a field unchanged. For the clearable fields,
/// `Some(None)` resets the field to its unset state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDescription {
    pub description: Option<Option<String>>,
    pub schema: Option<Option<Map<String, Value>>>,
    /// `Some(false)` hides the route.
    pub visible: Option<bool>,
    pub validate: Option<bool>,
    /// Milliseconds; must be positive. `Some(None)` falls back to the registry default.
    pub timeout: Option<Option<u64>>,
}

impl RouteDescription {
    /// Type-check a loosely typed JSON config.
    ///
    /// `parameters` is accepted as an alias of `schema`.
    pub fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let Value::Object(fields) = value else {
            return Err(RegistryError::InvalidConfig("Configuration should be an object".into()));
        };
        let invalid = |message: &str| RegistryError::InvalidConfig(message.to_string());

        let mut update = Self::default();
        match fields.get("description") {
            None => {}
            Some(Value::Null) => update.description = Some(None),
            Some(Value::String(text)) => update.description = Some(Some(text.clone())),
            Some(_) => return Err(invalid("Description should be a string")),
        }
        match fields.get("schema").or_else(|| fields.get("parameters")) {
            None => {}
            Some(Value::Null) => update.schema = Some(None),
            Some(Value::Object(schema)) => update.schema = Some(Some(schema.clone())),
            Some(_) => return Err(invalid("Schema should be an object")),
        }
        match fields.get("visible") {
            None => {}
            Some(Value::Null) => update.visible = Some(false),
            Some(Value::Bool(flag)) => update.visible = Some(*flag),
            Some(_) => return Err(invalid("Visible should be true or false")),
        }
        match fields.get("validate") {
            None => {}
            Some(Value::Null) => update.validate = Some(false),
            Some(Value::Bool(flag)) => update.validate = Some(*flag),
            Some(_) => return Err(invalid("Validate should be true or false")),
        }
        match fields.get("timeout") {
            None => {}
            Some(Value::Null) => update.timeout = Some(None),
            Some(timeout) => update.timeout = Some(Some(positive_int(timeout)?)),
        }
        Ok(update)
    }
}

/// Registry of named routes.
#[derive(Clone, Default)]
pub struct Router {
    pub(crate) options: RouterOptions,
    middleware: Vec<BoxedHandler>,
    afterware: Vec<BoxedHandler>,
    pub(crate) routes: BTreeMap<String, Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("options", &self.options)
            .field("middleware", &self.middleware.len())
            .field("afterware", &self.afterware.len())
            .field("routes", &self.routes)
            .finish()
    }
}

impl Router {
    /// Create an empty registry.
    pub fn new(options: RouterOptions) -> Result<Self, RegistryError> {
        options.validate()?;
        Ok(Self {
            options,
            ..Self::default()
        })
    }

    /// Build a registry from a name → chain table.
    pub fn from_routes<I, N, C>(routes: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: Into<HandlerChain>,
    {
        let mut router = Self::default();
        for (name, chain) in routes {
            router.register(name.as_ref(), chain)?;
        }
        Ok(router)
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Timeout applied to routes that do not set their own.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.options.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Register `chain` under `name`.
    ///
    /// The stored chain is the currently registered middleware, then `chain`,
    /// then the currently registered afterware.
    pub fn register(&mut self, name: &str, chain: impl Into<HandlerChain>) -> Result<(), RegistryError> {
        validate_route_name(name, false)?;
        if self.routes.contains_key(name) {
            return Err(RegistryError::DuplicateRoute(name.to_string()));
        }
        let chain = chain.into();
        if chain.is_empty() {
            return Err(RegistryError::EmptyChain(name.to_string()));
        }

        let route = Route {
            chain: chain.wrapped(&self.middleware, &self.afterware),
            description: None,
            schema: None,
            visible: self.options.introspection,
            validate: false,
            timeout: self.options.timeout.map(Duration::from_millis),
        };
        tracing::debug!(route = %name, handlers = route.chain.len(), "Route registered");
        self.routes.insert(name.to_string(), route);
        Ok(())
    }

    /// Register a single closure under `name`.
    pub fn route<F, Fut>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Value, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(name, handler(f))
    }

    /// Add middleware that runs before the handlers of routes registered from now on.
    pub fn before<F, Fut>(&mut self, f: F)
    where
        F: Fn(Value, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.middleware.push(handler(f));
    }

    /// Add afterware that runs after the handlers of routes registered from now on.
    pub fn after<F, Fut>(&mut self, f: F)
    where
        F: Fn(Value, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.afterware.push(handler(f));
    }

    /// Update metadata of a registered route.
    pub fn describe(&mut self, name: &str, update: RouteDescription) -> Result<(), RegistryError> {
        if update.timeout == Some(Some(0)) {
            return Err(RegistryError::InvalidConfig("Timeout should be a positive integer".into()));
        }
        let route = self
            .routes
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownRoute(name.to_string()))?;

        if let Some(description) = update.description {
            route.description = description;
        }
        if let Some(schema) = update.schema {
            route.schema = schema;
        }
        if let Some(visible) = update.visible {
            route.visible = visible;
        }
        if let Some(validate) = update.validate {
            route.validate = validate;
        }
        if let Some(timeout) = update.timeout {
            route.timeout = timeout.map(Duration::from_millis);
        }
        Ok(())
    }

    /// Copy every route of `other` into this registry.
    pub fn merge(&mut self, other: &Router) -> Result<(), RegistryError> {
        self.adopt(other, |name| name.to_string())
    }

    /// Copy every route of `other` into this registry under `prefix/`.
    pub fn namespace(&mut self, prefix: &str, other: &Router) -> Result<(), RegistryError> {
        validate_route_name(prefix, false)?;
        self.adopt(other, |name| format!("{prefix}/{name}"))
    }

    fn adopt(&mut self, other: &Router, rename: impl Fn(&str) -> String) -> Result<(), RegistryError> {
        if other.routes.is_empty() {
            return Err(RegistryError::NothingToMerge);
        }

        let renamed: Vec<(String, &Route)> = other.routes.iter().map(|(name, route)| (rename(name), route)).collect();
        if let Some((name, _)) = renamed.iter().find(|(name, _)| self.routes.contains_key(name)) {
            return Err(RegistryError::MergeConflict(name.clone()));
        }

        let inherited = self.options.timeout.map(Duration::from_millis);
        for (name, route) in renamed {
            let copy = Route {
                chain: route.chain.wrapped(&self.middleware, &self.afterware),
                timeout: route.timeout.or(inherited),
                ..route.clone()
            };
            tracing::debug!(route = %name, handlers = copy.chain.len(), "Route adopted");
            self.routes.insert(name, copy);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Registered routes, ordered by name.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &Route)> {
        self.routes.iter().map(|(name, route)| (name.as_str(), route))
    }

    pub fn route_names(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_route(router: &mut Router, name: &str) {
        router.route(name, |_, _| async { Ok(Some(json!({}))) }).unwrap();
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let mut router = Router::default();
        ok_route(&mut router, "users");

        assert_eq!(
            router.route("users", |_, _| async { Ok(None) }),
            Err(RegistryError::DuplicateRoute("users".into()))
        );
        assert_eq!(
            router.register("a", handler(|_, _| async { Ok(None) })),
            Err(RegistryError::InvalidRoute(RouteNameError::TooShort))
        );
        assert_eq!(
            router.register("empty", HandlerChain::default()),
            Err(RegistryError::EmptyChain("empty".into()))
        );
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_middleware_is_baked_in_at_registration() {
        let mut router = Router::default();
        ok_route(&mut router, "early");
        router.before(|_, _| async { Ok(None) });
        router.after(|_, _| async { Ok(None) });
        ok_route(&mut router, "late");

        assert_eq!(router.get("early").unwrap().chain_len(), 1);
        assert_eq!(router.get("late").unwrap().chain_len(), 3);
    }

    #[test]
    fn test_register_multi_handler_chain() {
        let mut router = Router::default();
        router.before(|_, _| async { Ok(None) });
        let chain = vec![handler(|_, _| async { Ok(None) }), handler(|_, _| async { Ok(Some(json!({}))) })];
        router.register("pair", chain).unwrap();
        assert_eq!(router.get("pair").unwrap().chain_len(), 3);
    }

    #[test]
    fn test_registered_routes_take_router_settings() {
        let mut router = Router::new(RouterOptions {
            timeout: Some(250),
            introspection: true,
            expose_stack: None,
        })
        .unwrap();
        ok_route(&mut router, "users");

        let route = router.get("users").unwrap();
        assert_eq!(route.timeout, Some(Duration::from_millis(250)));
        assert!(route.visible);
        assert!(!route.validate);

        let plain = Router::default();
        assert_eq!(plain.default_timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(matches!(
            Router::new(RouterOptions::with_timeout(0)),
            Err(RegistryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_merge_copies_and_wraps() {
        let mut source = Router::new(RouterOptions::with_timeout(10)).unwrap();
        ok_route(&mut source, "slow");
        let mut untimed = Router::default();
        ok_route(&mut untimed, "plain");

        let mut target = Router::new(RouterOptions::with_timeout(1000)).unwrap();
        target.before(|_, _| async { Ok(None) });
        target.merge(&source).unwrap();
        target.merge(&untimed).unwrap();

        let slow = target.get("slow").unwrap();
        assert_eq!(slow.chain_len(), 2);
        assert_eq!(slow.timeout, Some(Duration::from_millis(10)));
        assert_eq!(target.get("plain").unwrap().timeout, Some(Duration::from_millis(1000)));

        // The source keeps its own, unwrapped chain.
        assert_eq!(source.get("slow").unwrap().chain_len(), 1);
    }

    #[test]
    fn test_merge_rejects_empty_and_duplicates_atomically() {
        let mut target = Router::default();
        ok_route(&mut target, "shared");
        assert_eq!(target.merge(&Router::default()), Err(RegistryError::NothingToMerge));

        let mut other = Router::default();
        ok_route(&mut other, "aaFirst");
        ok_route(&mut other, "shared");
        assert_eq!(target.merge(&other), Err(RegistryError::MergeConflict("shared".into())));
        assert!(!target.contains("aaFirst"));
    }

    #[test]
    fn test_namespace() {
        let mut users = Router::default();
        ok_route(&mut users, "list");
        ok_route(&mut users, "profile/get");

        let mut api = Router::default();
        api.namespace("users", &users).unwrap();
        assert_eq!(api.route_names(), vec!["users/list", "users/profile/get"]);

        assert_eq!(api.namespace("users", &users), Err(RegistryError::MergeConflict("users/list".into())));
        assert_eq!(
            api.namespace("0bad", &users),
            Err(RegistryError::InvalidRoute(RouteNameError::LeadingCharacter))
        );
        assert_eq!(api.namespace("other", &Router::default()), Err(RegistryError::NothingToMerge));
    }

    #[test]
    fn test_describe() {
        let mut router = Router::default();
        ok_route(&mut router, "users");

        let update = RouteDescription::from_value(&json!({
            "description": "List users",
            "parameters": {"type": "object"},
            "visible": true,
            "timeout": 50
        }))
        .unwrap();
        router.describe("users", update).unwrap();

        let route = router.get("users").unwrap();
        assert_eq!(route.description.as_deref(), Some("List users"));
        assert_eq!(route.schema.as_ref().unwrap()["type"], json!("object"));
        assert!(route.visible);
        assert!(!route.validate);
        assert_eq!(route.timeout, Some(Duration::from_millis(50)));

        assert_eq!(
            router.describe("ghost", RouteDescription::default()),
            Err(RegistryError::UnknownRoute("ghost".into()))
        );
        assert!(router
            .describe("users", RouteDescription { timeout: Some(Some(0)), ..Default::default() })
            .is_err());
    }

    #[test]
    fn test_describe_null_clears_fields() {
        let mut router = Router::default();
        ok_route(&mut router, "users");
        let set = RouteDescription::from_value(&json!({
            "description": "List users",
            "schema": {"type": "object"},
            "visible": true,
            "validate": true,
            "timeout": 50
        }))
        .unwrap();
        router.describe("users", set).unwrap();

        let untouched = RouteDescription::from_value(&json!({})).unwrap();
        router.describe("users", untouched).unwrap();
        assert_eq!(router.get("users").unwrap().description.as_deref(), Some("List users"));

        let clear = RouteDescription::from_value(&json!({
            "description": null,
            "schema": null,
            "visible": null,
            "validate": null,
            "timeout": null
        }))
        .unwrap();
        router.describe("users", clear).unwrap();

        let route = router.get("users").unwrap();
        assert!(route.description.is_none());
        assert!(route.schema.is_none());
        assert!(!route.visible);
        assert!(!route.validate);
        assert_eq!(route.timeout, None);
    }

    #[test]
    fn test_describe_type_checks() {
        for config in [
            json!({"timeout": -1}),
            json!({"timeout": 1.5}),
            json!({"timeout": "10"}),
            json!({"visible": "yes"}),
            json!({"validate": 1}),
            json!({"description": 5}),
            json!({"schema": []}),
            json!([]),
        ] {
            assert!(RouteDescription::from_value(&config).is_err(), "{config} should be rejected");
        }
    }

    #[test]
    fn test_options_from_value() {
        let options = RouterOptions::from_value(&json!({"timeout": 100, "introspection": true})).unwrap();
        assert_eq!(options.timeout, Some(100));
        assert!(options.introspection);

        assert_eq!(RouterOptions::from_value(&json!({})).unwrap(), RouterOptions::default());
        assert!(RouterOptions::from_value(&json!({"timeout": 0})).is_err());
        assert!(RouterOptions::from_value(&json!({"introspection": "no"})).is_err());
        assert!(RouterOptions::from_value(&json!(5)).is_err());
    }

    #[test]
    fn test_from_routes() {
        let router = Router::from_routes([
            ("alpha", handler(|_, _| async { Ok(Some(json!({}))) })),
            ("beta", handler(|_, _| async { Ok(Some(json!({}))) })),
        ])
        .unwrap();
        assert_eq!(router.route_names(), vec!["alpha", "beta"]);
    }
}
