//! End-to-end dispatch: route table → registry → controller → view →
//! repository, over an in-memory database and on-disk templates.

use std::fs;
use std::sync::Arc;

use plinth::{
    ActionResult, Connection, Controller, ControllerRegistry, Dispatcher, Entity, Hooks, Params,
    Repository, Response, RouteTable, TableDef, View,
};

struct UsersController {
    users: Arc<Repository>,
    view: Arc<View>,
}

impl Controller for UsersController {
    fn action(&mut self, name: &str, params: &Params) -> ActionResult {
        match name {
            "list" => {
                let users = self.users.find_all(None, Some("lastname"), None)?;
                let names: Vec<&str> = users
                    .iter()
                    .filter_map(|u| u.get_str("lastname"))
                    .collect();
                let body = self.view.render(
                    "users/list.html",
                    &[("title", "Users".to_owned()), ("names", names.join(", "))],
                )?;
                Ok(Response::html(body))
            }
            "edit" => {
                let id: i64 = params.get(0).parse().unwrap_or(0);
                let Some(user) = self.users.find_by_id(id)? else {
                    return Ok(Response::redirect("/users"));
                };
                Ok(Response::html(format!(
                    "editing {}",
                    user.get_str("lastname").unwrap_or(""),
                )))
            }
            "save" => {
                let mut user = Entity::new();
                user.set("firstname", "Ada".to_owned())
                    .set("lastname", "Lovelace".to_owned());
                self.users.save(&mut user)?;
                Ok(Response::redirect("/users"))
            }
            other => self.unknown_action("users", other),
        }
    }
}

struct App {
    dispatcher: Dispatcher,
    db: Arc<Connection>,
    _templates: tempfile::TempDir,
}

fn app() -> App {
    let templates = tempfile::tempdir().unwrap();
    fs::create_dir_all(templates.path().join("layouts")).unwrap();
    fs::create_dir_all(templates.path().join("users")).unwrap();
    fs::write(
        templates.path().join("layouts/main.html"),
        "<html><title>{{ title }}</title><body>{{ content }}</body></html>",
    )
    .unwrap();
    fs::write(
        templates.path().join("users/list.html"),
        "<ul>{{ names }}</ul>",
    )
    .unwrap();

    let db = Arc::new(Connection::open_in_memory().unwrap());
    let users = Arc::new(
        Repository::new(
            Arc::clone(&db),
            TableDef::new("users")
                .column("firstname", "TEXT")
                .column("lastname", "TEXT"),
        )
        .with_hooks(Hooks::new().before_save(|user| {
            user.set("firstname", "Augusta".to_owned());
        })),
    );
    let view = Arc::new(View::new(templates.path()));

    let routes = RouteTable::new()
        .route("/users", "users", "list")
        .route("/users/edit/{id}", "users", "edit")
        .route("/users/save", "users", "save");

    let controllers = ControllerRegistry::new().register("users", move || {
        Box::new(UsersController {
            users: Arc::clone(&users),
            view: Arc::clone(&view),
        })
    });

    App {
        dispatcher: Dispatcher::new(routes, controllers),
        db,
        _templates: templates,
    }
}

#[test]
fn missed_routes_render_the_literal_404_page() {
    let app = app();
    let res = app.dispatcher.execute("/nothing");
    assert_eq!(res.status_code(), 404);
    assert_eq!(res.body_str(), "404 - Page not found");

    // An {id} segment only matches digits, so this is a miss too.
    let res = app.dispatcher.execute("/users/edit/abc");
    assert_eq!(res.status_code(), 404);
}

#[test]
fn listing_before_any_save_renders_empty_without_creating_the_table() {
    let app = app();
    let res = app.dispatcher.execute("/users");
    assert_eq!(res.status_code(), 200);
    assert_eq!(
        res.body_str(),
        "<html><title>Users</title><body><ul></ul></body></html>",
    );
    assert!(app.db.get_tables().unwrap().is_empty());
}

#[test]
fn save_creates_the_schema_on_demand_and_the_list_shows_the_row() {
    let app = app();

    let res = app.dispatcher.execute("/users/save");
    assert_eq!(res.status_code(), 301);
    assert_eq!(res.header("location"), Some("/users"));
    assert_eq!(app.db.get_tables().unwrap(), vec!["users"]);

    let res = app.dispatcher.execute("/users");
    assert_eq!(
        res.body_str(),
        "<html><title>Users</title><body><ul>Lovelace</ul></body></html>",
    );
}

#[test]
fn edit_finds_the_saved_row_and_hooks_ran_before_the_insert() {
    let app = app();
    app.dispatcher.execute("/users/save");

    let res = app.dispatcher.execute("/users/edit/1");
    assert_eq!(res.body_str(), "editing Lovelace");

    // The before_save hook rewrote the first name on the way in.
    let row = app
        .db
        .get_row_where("users", Some("id = 1"), &[], None)
        .unwrap()
        .expect("row");
    assert!(row.contains(&(
        "firstname".to_owned(),
        plinth::Value::Text("Augusta".to_owned()),
    )));
}

#[test]
fn edit_of_a_missing_row_redirects_to_the_list() {
    let app = app();
    app.dispatcher.execute("/users/save");

    let res = app.dispatcher.execute("/users/edit/999");
    assert_eq!(res.status_code(), 301);
    assert_eq!(res.header("location"), Some("/users"));
}
