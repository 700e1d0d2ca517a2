//! Minimal plinth example: the classic users application.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/users
//!   curl http://localhost:3000/users/save
//!   curl http://localhost:3000/users/edit/1
//!
//! The users table is never created up front. The first save trips over the
//! missing table, the repository creates it from the definition and retries,
//! and the request succeeds anyway. Watch the log.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use plinth::{
    ActionResult, AppConfig, Connection, Controller, ControllerRegistry, Dispatcher, Entity,
    Hooks, Params, Repository, Response, RouteTable, Server, TableDef, View,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AppConfig::load("demos/plinth.toml").unwrap_or_default();

    let db = Arc::new(Connection::open(&config.database.path).expect("open database"));
    let users = Arc::new(
        Repository::new(Arc::clone(&db), users_table()).with_hooks(
            Hooks::new().before_save(|user| {
                let now = unix_now();
                if !user.has_id() {
                    user.set("created", now);
                }
                user.set("changed", now);
            }),
        ),
    );
    let view = Arc::new(View::from_config(&config.views));

    let routes = RouteTable::new()
        .route("/", "users", "home")
        .route("/users", "users", "list")
        .route("/users/create", "users", "create")
        .route("/users/edit/{id}", "users", "edit")
        .route("/users/save", "users", "save");

    let controllers = ControllerRegistry::new().register("users", move || {
        Box::new(UsersController {
            users: Arc::clone(&users),
            view: Arc::clone(&view),
        })
    });

    let app = Dispatcher::new(routes, controllers);
    Server::bind(&config.server.addr)
        .serve(app)
        .await
        .expect("server error");
}

fn users_table() -> TableDef {
    TableDef::new("users")
        .column("firstname", "TEXT")
        .column("lastname", "TEXT")
        .column("email", "TEXT")
        .column("changed", "INTEGER")
        .column("created", "INTEGER")
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

struct UsersController {
    users: Arc<Repository>,
    view: Arc<View>,
}

impl Controller for UsersController {
    fn action(&mut self, name: &str, params: &Params) -> ActionResult {
        match name {
            "home" => self.home(),
            "list" => self.list(),
            "create" => self.create(),
            "edit" => self.edit(params.get(0)),
            "save" => self.save(),
            other => self.unknown_action("users", other),
        }
    }
}

impl UsersController {
    fn home(&self) -> ActionResult {
        let body = self.view.render("index.html", &[("title", "plinth".to_owned())])?;
        Ok(Response::html(body))
    }

    fn list(&self) -> ActionResult {
        let users = self.users.find_all(None, Some("lastname"), None)?;
        let rows: String = users
            .iter()
            .map(|user| {
                format!(
                    "<tr><td>{}</td><td>{} {}</td><td>{}</td><td><a href=\"/users/edit/{}\">edit</a></td></tr>",
                    user.id().unwrap_or(0),
                    user.get_str("firstname").unwrap_or(""),
                    user.get_str("lastname").unwrap_or(""),
                    user.get_str("email").unwrap_or(""),
                    user.id().unwrap_or(0),
                )
            })
            .collect();
        let body = self.view.render(
            "users/list.html",
            &[("title", "Users".to_owned()), ("rows", rows)],
        )?;
        Ok(Response::html(body))
    }

    fn create(&self) -> ActionResult {
        let body = self
            .view
            .render("users/create.html", &[("title", "New user".to_owned())])?;
        Ok(Response::html(body))
    }

    fn edit(&self, id: &str) -> ActionResult {
        let id: i64 = id.parse().unwrap_or(0);
        let Some(user) = self.users.find_by_id(id)? else {
            return Ok(Response::redirect("/users"));
        };
        let body = self.view.render(
            "users/edit.html",
            &[
                ("title", "Edit user".to_owned()),
                ("id", user.id().unwrap_or(0).to_string()),
                ("firstname", user.get_str("firstname").unwrap_or("").to_owned()),
                ("lastname", user.get_str("lastname").unwrap_or("").to_owned()),
                ("email", user.get_str("email").unwrap_or("").to_owned()),
            ],
        )?;
        Ok(Response::html(body))
    }

    // Stores a sample record; a real application would read a form body here.
    fn save(&self) -> ActionResult {
        let n = self.users.count(None).unwrap_or(0) + 1;
        let mut user = Entity::new();
        user.set("firstname", "Sample".to_owned())
            .set("lastname", format!("User{n}"))
            .set("email", format!("user{n}@example.com"));
        self.users.save(&mut user)?;
        Ok(Response::redirect("/users"))
    }
}
