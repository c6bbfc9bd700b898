use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use tera::Context;

use super::RouteState;
use crate::error::AppError;
use crate::helpers::{Id, SplitValidation};
use crate::models::tag::TagForm;
use crate::pages::Pages;
use crate::rules::names;
use crate::services::{BlogStore, RenameOutcome};

async fn render_list<S: BlogStore>(
    tagsvc: &S,
    pages: &Pages,
    message: Option<&str>,
) -> Result<Html<String>, AppError> {
    let tags = tagsvc.list_tags().await?;

    let mut ctx = Context::new();
    ctx.insert("tags", &tags);
    if let Some(message) = message {
        ctx.insert("message", message);
    }
    pages.render("list_tags.html", &ctx)
}

async fn list_tags<S: BlogStore>(
    State((tagsvc, pages)): State<RouteState<S>>,
) -> Result<Html<String>, AppError> {
    render_list(&tagsvc, &pages, None).await
}

async fn show_tag<S: BlogStore>(
    State((tagsvc, pages)): State<RouteState<S>>,
    Id(id): Id,
) -> Result<Html<String>, AppError> {
    let tag = tagsvc.get_tag(id).await?;
    let posts = tagsvc.posts_for_tag(id).await?;

    let mut ctx = Context::new();
    ctx.insert("tag", &tag);
    ctx.insert("posts", &posts);
    pages.render("tag_posts.html", &ctx)
}

async fn new_tag_form<S: BlogStore>(
    State((_, pages)): State<RouteState<S>>,
) -> Result<Html<String>, AppError> {
    pages.render("create_tag.html", &Context::new())
}

async fn create_tag<S: BlogStore>(
    State((tagsvc, pages)): State<RouteState<S>>,
    Form(form): Form<TagForm>,
) -> Result<Response, AppError> {
    match tagsvc.create_tag(&form.tag_name).await.split_validation()? {
        Ok(_) => Ok(Redirect::to("/tags").into_response()),
        Err(message) => {
            let mut ctx = Context::new();
            ctx.insert("tag_name", &form.tag_name);
            ctx.insert("message", &message);
            Ok(pages.render("create_tag.html", &ctx)?.into_response())
        }
    }
}

async fn edit_tag_form<S: BlogStore>(
    State((tagsvc, pages)): State<RouteState<S>>,
    Id(id): Id,
) -> Result<Html<String>, AppError> {
    let tag = tagsvc.get_tag(id).await?;

    let mut ctx = Context::new();
    ctx.insert("tag", &tag);
    pages.render("edit_tag.html", &ctx)
}

async fn edit_tag<S: BlogStore>(
    State((tagsvc, pages)): State<RouteState<S>>,
    Id(id): Id,
    Form(form): Form<TagForm>,
) -> Result<Response, AppError> {
    match tagsvc.rename_tag(id, &form.tag_name).await.split_validation()? {
        Ok(RenameOutcome::Renamed(_)) => Ok(Redirect::to("/tags").into_response()),
        Ok(RenameOutcome::Unchanged(tag)) => {
            let notice = names::tag_unchanged_notice(&tag.name);
            Ok(render_list(&tagsvc, &pages, Some(&notice)).await?.into_response())
        }
        Err(message) => {
            let tag = tagsvc.get_tag(id).await?;
            let mut ctx = Context::new();
            ctx.insert("tag", &tag);
            ctx.insert("message", &message);
            Ok(pages.render("edit_tag.html", &ctx)?.into_response())
        }
    }
}

async fn delete_tag<S: BlogStore>(
    State((tagsvc, _)): State<RouteState<S>>,
    Id(id): Id,
) -> Result<Redirect, AppError> {
    tagsvc.delete_tag(id).await?;
    Ok(Redirect::to("/tags"))
}

pub fn router<S: BlogStore>() -> Router<RouteState<S>> {
    Router::new()
        .route("/tags", get(list_tags::<S>))
        .route("/tags/new", get(new_tag_form::<S>).post(create_tag::<S>))
        .route("/tags/:id", get(show_tag::<S>))
        .route("/tags/:id/edit", get(edit_tag_form::<S>).post(edit_tag::<S>))
        .route("/tags/:id/delete", post(delete_tag::<S>))
}
