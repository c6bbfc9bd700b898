use axum::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::error::ServiceError;
use crate::models::post::{NewPost, Post, PostForm};
use crate::models::tag::{PostTag, Tag};
use crate::rules::fields::{self, PostDraft};
use crate::rules::names;
use crate::rules::tags::{reconcile, TagPlan};
use crate::schema::{posts, posts_tags, tags};

use super::users::find_user;
use super::{lower, on_unique_violation, PgStore, Svc};

#[async_trait]
pub trait PostService: Svc {
    async fn posts_for_user(&self, user_id: i32) -> Result<Vec<Post>, ServiceError>;
    async fn get_post(&self, id: i32) -> Result<Post, ServiceError>;
    async fn tags_for_post(&self, post_id: i32) -> Result<Vec<Tag>, ServiceError>;
    /// Creates a post for `user_id` linked to the tags named in `tags`.
    async fn create_post(
        &self,
        user_id: i32,
        draft: PostDraft,
        tags: &[String],
    ) -> Result<Post, ServiceError>;
    /// Applies an edit form. Blank title or content keep their stored values,
    /// and the post's tag links are reconciled against `form.tags`.
    async fn update_post(&self, id: i32, form: &PostForm) -> Result<Post, ServiceError>;
    /// Deletes the post and its tag links, returning what was deleted.
    async fn delete_post(&self, id: i32) -> Result<Post, ServiceError>;
}

async fn find_post(conn: &mut AsyncPgConnection, id: i32) -> Result<Post, ServiceError> {
    posts::table
        .find(id)
        .select(Post::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ServiceError::not_found("post", id))
}

async fn linked_tags(conn: &mut AsyncPgConnection, post_id: i32) -> Result<Vec<Tag>, ServiceError> {
    let ts = posts_tags::table
        .inner_join(tags::table)
        .filter(posts_tags::post_id.eq(post_id))
        .order(tags::name.asc())
        .select(Tag::as_select())
        .load(conn)
        .await?;
    Ok(ts)
}

async fn tags_named(conn: &mut AsyncPgConnection, names: &[String]) -> Result<Vec<Tag>, ServiceError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let ts = tags::table
        .filter(tags::name.eq_any(names))
        .select(Tag::as_select())
        .load(conn)
        .await?;
    Ok(ts)
}

/// Whether another of `owner`'s posts already uses `title`, ignoring case.
async fn title_taken(
    conn: &mut AsyncPgConnection,
    owner: i32,
    title: &str,
    except: Option<i32>,
) -> Result<bool, ServiceError> {
    let ids = posts::table
        .filter(posts::user_id.eq(owner))
        .filter(lower(posts::title).eq(lower(title)))
        .select(posts::id)
        .load::<i32>(conn)
        .await?;
    Ok(ids.into_iter().any(|id| Some(id) != except))
}

async fn apply_plan(
    conn: &mut AsyncPgConnection,
    post_id: i32,
    plan: &TagPlan,
) -> Result<(), ServiceError> {
    if !plan.remove.is_empty() {
        diesel::delete(
            posts_tags::table
                .filter(posts_tags::post_id.eq(post_id))
                .filter(posts_tags::tag_id.eq_any(&plan.remove)),
        )
        .execute(conn)
        .await?;
    }
    if !plan.add.is_empty() {
        let links: Vec<PostTag> = plan
            .add
            .iter()
            .map(|&tag_id| PostTag { post_id, tag_id })
            .collect();
        diesel::insert_into(posts_tags::table)
            .values(&links)
            .execute(conn)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl PostService for PgStore {
    #[tracing::instrument(skip(self))]
    async fn posts_for_user(&self, user_id: i32) -> Result<Vec<Post>, ServiceError> {
        let mut conn = self.conn().await?;
        let ps = posts::table
            .filter(posts::user_id.eq(user_id))
            .order(posts::id.asc())
            .select(Post::as_select())
            .load(&mut *conn)
            .await?;
        Ok(ps)
    }

    #[tracing::instrument(skip(self))]
    async fn get_post(&self, id: i32) -> Result<Post, ServiceError> {
        let mut conn = self.conn().await?;
        find_post(&mut conn, id).await
    }

    #[tracing::instrument(skip(self))]
    async fn tags_for_post(&self, post_id: i32) -> Result<Vec<Tag>, ServiceError> {
        let mut conn = self.conn().await?;
        linked_tags(&mut conn, post_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn create_post(
        &self,
        user_id: i32,
        draft: PostDraft,
        tags: &[String],
    ) -> Result<Post, ServiceError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let tags = tags.to_vec();

        conn.transaction::<_, ServiceError, _>(|conn| {
            async move {
                find_user(conn, user_id).await?;
                if title_taken(conn, user_id, draft.title(), None).await? {
                    return Err(names::duplicate_title());
                }
                let known = tags_named(conn, &tags).await?;
                let plan = reconcile(&[], &tags, &known)?;

                let post = diesel::insert_into(posts::table)
                    .values(NewPost {
                        title: draft.title().to_string(),
                        content: draft.content().to_string(),
                        created_at: fields::created_now(),
                        user_id,
                    })
                    .returning(Post::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|e| on_unique_violation(e, names::duplicate_title))?;
                apply_plan(conn, post.id, &plan).await?;

                tracing::info!(post_id = post.id, tags = plan.add.len(), "post created");
                Ok(post)
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_post(&self, id: i32, form: &PostForm) -> Result<Post, ServiceError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let form = form.clone();

        conn.transaction::<_, ServiceError, _>(|conn| {
            async move {
                let stored = find_post(conn, id).await?;
                let title = match fields::title_change(&stored.title, &form.title)? {
                    Some(t) => {
                        if title_taken(conn, stored.user_id, &t, Some(id)).await? {
                            return Err(names::duplicate_title());
                        }
                        t
                    }
                    None => stored.title.clone(),
                };
                let content = fields::keep_if_blank(&stored.content, &form.content);

                let current = linked_tags(conn, id).await?;
                let known = tags_named(conn, &form.tags).await?;
                let plan = reconcile(&current, &form.tags, &known)?;

                let post = diesel::update(posts::table.find(id))
                    .set((posts::title.eq(&title), posts::content.eq(&content)))
                    .returning(Post::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|e| on_unique_violation(e, names::duplicate_title))?;
                if plan.is_empty() {
                    tracing::debug!("post tags unchanged");
                } else {
                    apply_plan(conn, id, &plan).await?;
                    tracing::info!(
                        removed = plan.remove.len(),
                        added = plan.add.len(),
                        "post tags reconciled"
                    );
                }
                Ok(post)
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_post(&self, id: i32) -> Result<Post, ServiceError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, ServiceError, _>(|conn| {
            async move {
                let post = find_post(conn, id).await?;
                diesel::delete(posts_tags::table.filter(posts_tags::post_id.eq(id)))
                    .execute(conn)
                    .await?;
                diesel::delete(posts::table.find(id)).execute(conn).await?;
                Ok(post)
            }
            .scope_boxed()
        })
        .await
    }
}
