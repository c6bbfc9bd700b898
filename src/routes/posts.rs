use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::Form;
use tera::Context;

use super::{users, RouteState};
use crate::error::AppError;
use crate::helpers::{Id, SplitValidation};
use crate::models::post::{Post, PostForm};
use crate::models::user::User;
use crate::pages::Pages;
use crate::rules::fields::PostDraft;
use crate::rules::names;
use crate::services::BlogStore;

async fn new_post_form<S: BlogStore>(
    State((svc, pages)): State<RouteState<S>>,
    Id(user_id): Id,
) -> Result<Html<String>, AppError> {
    let user = svc.get_user(user_id).await?;
    let tags = svc.list_tags().await?;

    let mut ctx = Context::new();
    ctx.insert("user", &user);
    ctx.insert("tags", &tags);
    ctx.insert("form", &PostForm::default());
    pages.render("create_post.html", &ctx)
}

#[tracing::instrument(skip_all)]
async fn create_post<S: BlogStore>(
    State((svc, pages)): State<RouteState<S>>,
    Id(user_id): Id,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let user = svc.get_user(user_id).await?;
    let created = match PostDraft::new(&form.title, &form.content) {
        Ok(draft) => svc.create_post(user.id, draft, &form.tags).await,
        Err(e) => Err(e),
    };

    match created.split_validation()? {
        Ok(_) => Ok(Redirect::to(&format!("/users/{}", user.id)).into_response()),
        Err(message) => {
            let tags = svc.list_tags().await?;
            let mut ctx = Context::new();
            ctx.insert("user", &user);
            ctx.insert("tags", &tags);
            ctx.insert("form", &form);
            ctx.insert("message", &message);
            Ok(pages.render("create_post.html", &ctx)?.into_response())
        }
    }
}

async fn show_post<S: BlogStore>(
    State((svc, pages)): State<RouteState<S>>,
    Id(id): Id,
) -> Result<Html<String>, AppError> {
    let post = svc.get_post(id).await?;
    let user = svc.get_user(post.user_id).await?;
    let tags = svc.tags_for_post(id).await?;

    let mut ctx = Context::new();
    ctx.insert("post", &post);
    ctx.insert("user", &user);
    ctx.insert("tags", &tags);
    pages.render("show_post.html", &ctx)
}

async fn render_edit<S: BlogStore>(
    svc: &S,
    pages: &Pages,
    post: &Post,
    user: &User,
    selected: &[String],
    message: Option<&str>,
) -> Result<Html<String>, AppError> {
    let tags = svc.list_tags().await?;

    let mut ctx = Context::new();
    ctx.insert("post", post);
    ctx.insert("user", user);
    ctx.insert("tags", &tags);
    ctx.insert("selected", selected);
    if let Some(message) = message {
        ctx.insert("message", message);
    }
    pages.render("edit_post.html", &ctx)
}

async fn edit_post_form<S: BlogStore>(
    State((svc, pages)): State<RouteState<S>>,
    Id(id): Id,
) -> Result<Html<String>, AppError> {
    let post = svc.get_post(id).await?;
    let user = svc.get_user(post.user_id).await?;
    let selected: Vec<String> = svc
        .tags_for_post(id)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();

    render_edit(&svc, &pages, &post, &user, &selected, None).await
}

#[tracing::instrument(skip_all)]
async fn edit_post<S: BlogStore>(
    State((svc, pages)): State<RouteState<S>>,
    Id(id): Id,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    match svc.update_post(id, &form).await.split_validation()? {
        Ok(post) if names::case_only_change(&post.title, &form.title) => {
            let notice = names::title_unchanged_notice(&post.title);
            let page = users::render_user(&svc, &pages, post.user_id, Some(&notice)).await?;
            Ok(page.into_response())
        }
        Ok(post) => Ok(Redirect::to(&format!("/users/{}", post.user_id)).into_response()),
        Err(message) => {
            let post = svc.get_post(id).await?;
            let user = svc.get_user(post.user_id).await?;
            let page = render_edit(&svc, &pages, &post, &user, &form.tags, Some(&message)).await?;
            Ok(page.into_response())
        }
    }
}

async fn delete_post<S: BlogStore>(
    State((svc, _)): State<RouteState<S>>,
    Id(id): Id,
) -> Result<Redirect, AppError> {
    let post = svc.delete_post(id).await?;
    Ok(Redirect::to(&format!("/users/{}", post.user_id)))
}

pub fn router<S: BlogStore>() -> Router<RouteState<S>> {
    Router::new()
        .route(
            "/users/:id/posts/new",
            get(new_post_form::<S>).post(create_post::<S>),
        )
        .route("/posts/:id", get(show_post::<S>))
        .route("/posts/:id/edit", get(edit_post_form::<S>).post(edit_post::<S>))
        .route("/posts/:id/delete", post(delete_post::<S>))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::Router;

    use crate::routes::testing::*;
    use crate::services::{MemoryStore, PostService, TagService};

    async fn with_user() -> (MemoryStore, Router) {
        let store = MemoryStore::new();
        let app = app_over(&store);
        post(
            &app,
            "/users/new",
            "first_name=TestFirstName&last_name=TestLastName&image_url=",
        )
        .await;
        (store, app)
    }

    fn tag_names(ts: &[crate::models::tag::Tag]) -> Vec<&str> {
        ts.iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn create_post_shows_on_user_page() {
        let (_, app) = with_user().await;

        let form = get(&app, "/users/1/posts/new").await;
        assert_eq!(form.status, StatusCode::OK);
        assert!(form.body.contains("TestFirstName TestLastName"));
        assert!(form.body.contains("Title"));
        assert!(form.body.contains("Content"));

        let reply = post(&app, "/users/1/posts/new", "title=The+Title&content=The+Content").await;
        assert_eq!(reply.location.as_deref(), Some("/users/1"));

        let detail = get(&app, "/users/1").await;
        assert!(detail.body.contains("The Title"));
    }

    #[tokio::test]
    async fn empty_title_and_content_share_one_message() {
        let (store, app) = with_user().await;

        let reply = post(&app, "/users/1/posts/new", "title=&content=").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("Please add a title and some content"));
        assert!(store.posts_for_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_title_differing_in_case_is_rejected() {
        let (store, app) = with_user().await;

        post(&app, "/users/1/posts/new", "title=Hello&content=one").await;
        let reply = post(&app, "/users/1/posts/new", "title=HELLO&content=two").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("This title has already been used"));
        assert_eq!(store.posts_for_user(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn edited_title_clashing_with_a_sibling_is_rejected() {
        let (store, app) = with_user().await;
        post(&app, "/users/1/posts/new", "title=Hello&content=one").await;
        post(&app, "/users/1/posts/new", "title=Other&content=two").await;

        let reply = post(&app, "/posts/2/edit", "title=HELLO&content=").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("This title has already been used"));
        assert!(reply.body.contains("placeholder=\"Other\""));
        assert_eq!(store.get_post(2).await.unwrap().title, "Other");

        let renamed = post(&app, "/posts/2/edit", "title=Goodbye&content=").await;
        assert_eq!(renamed.location.as_deref(), Some("/users/1"));
        assert_eq!(store.get_post(2).await.unwrap().title, "Goodbye");
    }

    #[tokio::test]
    async fn case_only_title_edit_keeps_title_and_says_so() {
        let (store, app) = with_user().await;
        post(&app, "/users/1/posts/new", "title=Hello&content=one").await;

        let reply = post(&app, "/posts/1/edit", "title=HELLO&content=two").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("was re-entered, no changes were made to the title"));

        let kept = store.get_post(1).await.unwrap();
        assert_eq!((kept.title.as_str(), kept.content.as_str()), ("Hello", "two"));
    }

    #[tokio::test]
    async fn post_detail_names_the_author() {
        let (_, app) = with_user().await;
        post(&app, "/users/1/posts/new", "title=TestTitle&content=TestContent").await;

        let reply = get(&app, "/posts/1").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("<h1>TestTitle</h1>"));
        assert!(reply.body.contains("<b><i>TestFirstName TestLastName</i></b>"));
    }

    #[tokio::test]
    async fn editing_tags_swaps_links() {
        let (store, app) = with_user().await;
        for name in ["A", "B", "C"] {
            store.create_tag(name).await.unwrap();
        }
        post(&app, "/users/1/posts/new", "title=T&content=c&tags=A&tags=B").await;
        assert_eq!(tag_names(&store.tags_for_post(1).await.unwrap()), vec!["A", "B"]);

        let reply = post(&app, "/posts/1/edit", "title=&content=&tags=B&tags=C").await;
        assert_eq!(reply.location.as_deref(), Some("/users/1"));
        assert_eq!(tag_names(&store.tags_for_post(1).await.unwrap()), vec!["B", "C"]);

        post(&app, "/posts/1/edit", "title=&content=&tags=B&tags=C").await;
        assert_eq!(tag_names(&store.tags_for_post(1).await.unwrap()), vec!["B", "C"]);

        let kept = store.get_post(1).await.unwrap();
        assert_eq!((kept.title.as_str(), kept.content.as_str()), ("T", "c"));

        post(&app, "/posts/1/edit", "title=&content=").await;
        assert!(store.tags_for_post(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tag_is_404() {
        let (_, app) = with_user().await;
        post(&app, "/users/1/posts/new", "title=T&content=c").await;

        let reply = post(&app, "/posts/1/edit", "title=&content=&tags=Ghost").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn edit_form_checks_current_tags() {
        let (store, app) = with_user().await;
        store.create_tag("Rust").await.unwrap();
        post(&app, "/users/1/posts/new", "title=T&content=c&tags=Rust").await;

        let reply = get(&app, "/posts/1/edit").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("value=\"Rust\" checked"));
    }

    #[tokio::test]
    async fn delete_post_returns_to_owner() {
        let (store, app) = with_user().await;
        post(&app, "/users/1/posts/new", "title=T&content=c").await;

        let reply = post(&app, "/posts/1/delete", "").await;
        assert_eq!(reply.location.as_deref(), Some("/users/1"));
        assert!(store.posts_for_user(1).await.unwrap().is_empty());
    }
}
