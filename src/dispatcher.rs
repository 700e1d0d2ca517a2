//! Front controller.
//!
//! One dispatch is one synchronous pass: detect the route, build the
//! controller, run its lifecycle, hand back the response. A path that
//! matches nothing is not an error: it renders the literal 404 page.
//! Failures underneath (missing controller registration, unknown action,
//! database errors an action chose to propagate) are logged and rendered
//! as a 500.

use std::fs;

use tracing::{debug, error};

use crate::controller::{ControllerRegistry, Params};
use crate::response::Response;
use crate::router::{RouteTable, RouteTarget};
use crate::status::Status;

/// The literal body of a missed route.
const NOT_FOUND_BODY: &str = "404 - Page not found";

/// The front controller: a route table plus a controller registry.
pub struct Dispatcher {
    routes: RouteTable,
    controllers: ControllerRegistry,
}

impl Dispatcher {
    pub fn new(routes: RouteTable, controllers: ControllerRegistry) -> Self {
        Self { routes, controllers }
    }

    /// Dispatch one request path to a response.
    pub fn execute(&self, path: &str) -> Response {
        let Some(matched) = self.routes.detect(path) else {
            debug!(%path, "no route matched");
            return Response::builder()
                .status(Status::NotFound)
                .text(NOT_FOUND_BODY);
        };

        match matched.target {
            RouteTarget::Controller { controller, action } => {
                self.run_controller(controller, action, matched.params)
            }
            RouteTarget::File { path: file } => {
                // A registered file that has gone missing renders empty, not 404.
                if !file.is_file() {
                    return Response::builder().status(Status::Ok).no_body();
                }
                match fs::read_to_string(file) {
                    Ok(content) => Response::html(content),
                    Err(e) => {
                        error!(file = %file.display(), "file route read failed: {e}");
                        server_error()
                    }
                }
            }
        }
    }

    /// Build the named controller and run initialize → action → finalize.
    ///
    /// `finalize` runs even when the action fails; the teardown callback is
    /// part of the lifecycle, not a success hook.
    fn run_controller(&self, controller: &str, action: &str, params: Params) -> Response {
        let Some(mut instance) = self.controllers.create(controller) else {
            error!(%controller, "controller not registered");
            return server_error();
        };

        instance.initialize();
        let result = instance.action(action, &params);
        instance.finalize();

        match result {
            Ok(response) => response,
            Err(e) => {
                error!(%controller, %action, "action failed: {e}");
                server_error()
            }
        }
    }
}

fn server_error() -> Response {
    Response::builder()
        .status(Status::InternalServerError)
        .text("500 - Internal server error")
}
