use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use tera::Context;

use super::RouteState;
use crate::error::AppError;
use crate::helpers::{Id, SplitValidation};
use crate::models::user::UserForm;
use crate::pages::Pages;
use crate::rules::fields;
use crate::services::BlogStore;

async fn list_users<S: BlogStore>(
    State((usersvc, pages)): State<RouteState<S>>,
) -> Result<Html<String>, AppError> {
    let users = usersvc.list_users().await?;

    let mut ctx = Context::new();
    ctx.insert("users", &users);
    pages.render("list_users.html", &ctx)
}

async fn new_user_form<S: BlogStore>(
    State((_, pages)): State<RouteState<S>>,
) -> Result<Html<String>, AppError> {
    let mut ctx = Context::new();
    ctx.insert("form", &UserForm::default());
    pages.render("create_user.html", &ctx)
}

async fn create_user<S: BlogStore>(
    State((usersvc, pages)): State<RouteState<S>>,
    Form(form): Form<UserForm>,
) -> Result<Response, AppError> {
    let created = match fields::new_user(&form) {
        Ok(new) => usersvc.create_user(new).await,
        Err(e) => Err(e),
    };

    match created.split_validation()? {
        Ok(user) => Ok(Redirect::to(&format!("/users/{}", user.id)).into_response()),
        Err(message) => {
            let mut ctx = Context::new();
            ctx.insert("form", &form);
            ctx.insert("message", &message);
            Ok(pages.render("create_user.html", &ctx)?.into_response())
        }
    }
}

/// The user's page with their posts, optionally topped by `message`.
pub(super) async fn render_user<S: BlogStore>(
    usersvc: &S,
    pages: &Pages,
    id: i32,
    message: Option<&str>,
) -> Result<Html<String>, AppError> {
    let user = usersvc.get_user(id).await?;
    let posts = usersvc.posts_for_user(id).await?;

    let mut ctx = Context::new();
    ctx.insert("user", &user);
    ctx.insert("posts", &posts);
    if let Some(message) = message {
        ctx.insert("message", message);
    }
    pages.render("user_details.html", &ctx)
}

async fn show_user<S: BlogStore>(
    State((usersvc, pages)): State<RouteState<S>>,
    Id(id): Id,
) -> Result<Html<String>, AppError> {
    render_user(&usersvc, &pages, id, None).await
}

async fn edit_user_form<S: BlogStore>(
    State((usersvc, pages)): State<RouteState<S>>,
    Id(id): Id,
) -> Result<Html<String>, AppError> {
    let user = usersvc.get_user(id).await?;

    let mut ctx = Context::new();
    ctx.insert("user", &user);
    pages.render("edit_user.html", &ctx)
}

async fn edit_user<S: BlogStore>(
    State((usersvc, pages)): State<RouteState<S>>,
    Id(id): Id,
    Form(form): Form<UserForm>,
) -> Result<Response, AppError> {
    match usersvc.update_user(id, &form).await.split_validation()? {
        Ok(user) => Ok(Redirect::to(&format!("/users/{}", user.id)).into_response()),
        Err(message) => {
            let user = usersvc.get_user(id).await?;
            let mut ctx = Context::new();
            ctx.insert("user", &user);
            ctx.insert("message", &message);
            Ok(pages.render("edit_user.html", &ctx)?.into_response())
        }
    }
}

async fn delete_user<S: BlogStore>(
    State((usersvc, _)): State<RouteState<S>>,
    Id(id): Id,
) -> Result<Redirect, AppError> {
    usersvc.delete_user(id).await?;
    Ok(Redirect::to("/users"))
}

pub fn router<S: BlogStore>() -> Router<RouteState<S>> {
    Router::new()
        .route("/users", get(list_users::<S>))
        .route("/users/new", get(new_user_form::<S>).post(create_user::<S>))
        .route("/users/:id", get(show_user::<S>))
        .route("/users/:id/edit", get(edit_user_form::<S>).post(edit_user::<S>))
        .route("/users/:id/delete", post(delete_user::<S>))
}
