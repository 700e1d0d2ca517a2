//! Controller contract and registry.
//!
//! # How controllers are stored
//!
//! The dispatcher needs to create controllers of *different* types from
//! route descriptors that only carry a name. There is no reflection to
//! lean on, so the registry stores **factory closures** behind a common
//! trait-object interface: you register `"users"` together with a
//! `Fn() -> Box<dyn Controller>`, and dispatch builds a fresh instance per
//! request. Action names are resolved the same explicit way, by a `match`
//! inside [`Controller::action`].
//!
//! The lifecycle per dispatched request is fixed:
//!
//! ```text
//! factory()            ← fresh controller instance
//! initialize()         ← setup callback, default no-op
//! action(name, params) ← your code
//! finalize()           ← teardown callback, default no-op
//! ```

use std::collections::HashMap;

use crate::error::Error;
use crate::response::Response;

/// What an action returns: a response, or a failure the dispatcher logs and
/// renders as a 500.
pub type ActionResult = Result<Response, Error>;

/// A business-logic unit bound to one or more routes.
///
/// ```rust
/// use plinth::{ActionResult, Controller, Params, Response};
///
/// struct UsersController;
///
/// impl Controller for UsersController {
///     fn action(&mut self, name: &str, params: &Params) -> ActionResult {
///         match name {
///             "list" => Ok(Response::html("<ul>…</ul>")),
///             "edit" => Ok(Response::html(format!("editing {}", params.get(0)))),
///             other  => self.unknown_action("users", other),
///         }
///     }
/// }
/// ```
pub trait Controller {
    /// Called before the action.
    fn initialize(&mut self) {}

    /// Dispatch `name` to the matching action.
    ///
    /// Unknown names should return [`Controller::unknown_action`].
    fn action(&mut self, name: &str, params: &Params) -> ActionResult;

    /// Called after the action, even when it failed.
    fn finalize(&mut self) {}

    /// The standard rejection for an unrecognized action name.
    fn unknown_action(&self, controller: &str, action: &str) -> ActionResult {
        Err(Error::UnknownAction {
            controller: controller.to_owned(),
            action: action.to_owned(),
        })
    }
}

// ── Params ────────────────────────────────────────────────────────────────────

/// Positional params captured from a route's placeholders, in pattern order.
///
/// Exactly the captured substrings: no decoding, no type coercion. Reading
/// past the end yields the empty string, so actions can take "up to N"
/// params without caring how many the route actually captured.
#[derive(Debug, Clone, Default)]
pub struct Params(Vec<String>);

impl Params {
    pub(crate) fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    /// The `idx`-th captured param, or `""` when the route captured fewer.
    pub fn get(&self, idx: usize) -> &str {
        self.0.get(idx).map_or("", String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

type ControllerFactory = Box<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// Maps controller names to factory closures, populated at startup.
///
/// ```rust
/// # use plinth::{ActionResult, Controller, ControllerRegistry, Params};
/// # struct UsersController;
/// # impl Controller for UsersController {
/// #     fn action(&mut self, n: &str, _: &Params) -> ActionResult { self.unknown_action("users", n) }
/// # }
/// let registry = ControllerRegistry::new()
///     .register("users", || Box::new(UsersController));
/// ```
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under `name`. Returns `self` for chaining.
    /// Registering the same name twice replaces the earlier factory.
    pub fn register(
        mut self,
        name: &str,
        factory: impl Fn() -> Box<dyn Controller> + Send + Sync + 'static,
    ) -> Self {
        self.factories.insert(name.to_owned(), Box::new(factory));
        self
    }

    /// Build a fresh controller instance, or `None` for an unknown name.
    pub(crate) fn create(&self, name: &str) -> Option<Box<dyn Controller>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
