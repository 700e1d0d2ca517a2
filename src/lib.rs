//! # plinth
//!
//! A minimal MVC web framework. Routes go in, rendered pages come out.
//!
//! ## The contract
//!
//! plinth owns the three things that change between small database-backed
//! web applications, and nothing else:
//!
//! - **Dispatch**: an ordered route table with `{id}` / `{slug}`
//!   placeholders, scanned first-match-wins, resolving to controllers
//!   registered as plain factory closures
//! - **Views**: a two-pass renderer: template first, then a layout wrapped
//!   around its output
//! - **Persistence**: a repository over a single SQLite handle that builds
//!   its own SQL and repairs its own schema: a write that fails because a
//!   column or table is missing triggers the matching `ALTER TABLE` /
//!   `CREATE TABLE` and one retry
//!
//! Everything a reverse proxy or the platform already does (TLS, rate
//! limiting, body-size limits, caching) is intentionally absent.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use plinth::{
//!     ActionResult, Controller, ControllerRegistry, Dispatcher, Params,
//!     Response, RouteTable, Server,
//! };
//!
//! struct PagesController;
//!
//! impl Controller for PagesController {
//!     fn action(&mut self, name: &str, params: &Params) -> ActionResult {
//!         match name {
//!             "index" => Ok(Response::html("<h1>hello</h1>")),
//!             "show"  => Ok(Response::html(format!("page {}", params.get(0)))),
//!             other   => self.unknown_action("pages", other),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let routes = RouteTable::new()
//!         .route("/", "pages", "index")
//!         .route("/pages/{id}", "pages", "show");
//!
//!     let controllers = ControllerRegistry::new()
//!         .register("pages", || Box::new(PagesController));
//!
//!     let app = Dispatcher::new(routes, controllers);
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```

mod config;
mod controller;
mod db;
mod dispatcher;
mod error;
mod response;
mod router;
mod server;
mod status;
mod view;

pub use config::{AppConfig, DatabaseConfig, ServerConfig, ViewConfig};
pub use controller::{ActionResult, Controller, ControllerRegistry, Params};
pub use db::{
    ColumnChange, Connection, DbError, Entity, Hooks, Limit, Repository, Row, TableDef, Value,
};
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use response::Response;
pub use router::{RouteMatch, RouteTable, RouteTarget};
pub use server::Server;
pub use status::Status;
pub use view::View;
