use axum::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::error::ServiceError;
use crate::models::post::Post;
use crate::models::tag::{NewTag, Tag};
use crate::rules::names::{self, Rename};
use crate::schema::{posts, posts_tags, tags};

use super::{lower, on_unique_violation, PgStore, Svc};

#[derive(Debug, Clone, PartialEq)]
pub enum RenameOutcome {
    /// The submitted name matched the stored one modulo case; nothing was written.
    Unchanged(Tag),
    Renamed(Tag),
}

#[async_trait]
pub trait TagService: Svc {
    async fn list_tags(&self) -> Result<Vec<Tag>, ServiceError>;
    async fn get_tag(&self, id: i32) -> Result<Tag, ServiceError>;
    async fn posts_for_tag(&self, tag_id: i32) -> Result<Vec<Post>, ServiceError>;
    async fn create_tag(&self, name: &str) -> Result<Tag, ServiceError>;
    async fn rename_tag(&self, id: i32, name: &str) -> Result<RenameOutcome, ServiceError>;
    /// Deletes the tag and unlinks it from every post. The posts stay.
    async fn delete_tag(&self, id: i32) -> Result<(), ServiceError>;
}

async fn find_tag(conn: &mut AsyncPgConnection, id: i32) -> Result<Tag, ServiceError> {
    tags::table
        .find(id)
        .select(Tag::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ServiceError::not_found("tag", id))
}

/// Id of a tag other than `except` whose name matches `name` ignoring case.
async fn name_owner(
    conn: &mut AsyncPgConnection,
    name: &str,
    except: Option<i32>,
) -> Result<Option<i32>, ServiceError> {
    let ids = tags::table
        .filter(lower(tags::name).eq(lower(name)))
        .select(tags::id)
        .load::<i32>(conn)
        .await?;
    Ok(ids.into_iter().find(|id| Some(*id) != except))
}

#[async_trait]
impl TagService for PgStore {
    #[tracing::instrument(skip(self))]
    async fn list_tags(&self) -> Result<Vec<Tag>, ServiceError> {
        let mut conn = self.conn().await?;
        let ts = tags::table
            .order(tags::name.asc())
            .select(Tag::as_select())
            .load(&mut *conn)
            .await?;
        Ok(ts)
    }

    #[tracing::instrument(skip(self))]
    async fn get_tag(&self, id: i32) -> Result<Tag, ServiceError> {
        let mut conn = self.conn().await?;
        find_tag(&mut conn, id).await
    }

    #[tracing::instrument(skip(self))]
    async fn posts_for_tag(&self, tag_id: i32) -> Result<Vec<Post>, ServiceError> {
        let mut conn = self.conn().await?;
        let ps = posts_tags::table
            .inner_join(posts::table)
            .filter(posts_tags::tag_id.eq(tag_id))
            .order(posts::id.asc())
            .select(Post::as_select())
            .load(&mut *conn)
            .await?;
        Ok(ps)
    }

    #[tracing::instrument(skip(self))]
    async fn create_tag(&self, name: &str) -> Result<Tag, ServiceError> {
        let name = names::require_tag_name(name)?;
        let mut conn = self.conn().await?;

        if name_owner(&mut conn, name, None).await?.is_some() {
            return Err(names::duplicate_tag(name));
        }
        let tag = diesel::insert_into(tags::table)
            .values(NewTag {
                name: name.to_string(),
            })
            .returning(Tag::as_returning())
            .get_result(&mut *conn)
            .await
            .map_err(|e| on_unique_violation(e, || names::duplicate_tag(name)))?;

        tracing::info!(tag_id = tag.id, "tag created");
        Ok(tag)
    }

    #[tracing::instrument(skip(self))]
    async fn rename_tag(&self, id: i32, name: &str) -> Result<RenameOutcome, ServiceError> {
        let name = names::require_tag_name(name)?;
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let name = name.to_string();

        conn.transaction::<_, ServiceError, _>(|conn| {
            async move {
                let stored = find_tag(conn, id).await?;
                if names::classify_rename(&stored.name, &name) == Rename::Unchanged {
                    return Ok(RenameOutcome::Unchanged(stored));
                }
                if name_owner(conn, &name, Some(id)).await?.is_some() {
                    return Err(names::duplicate_tag(&name));
                }

                let tag = diesel::update(tags::table.find(id))
                    .set(tags::name.eq(&name))
                    .returning(Tag::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|e| on_unique_violation(e, || names::duplicate_tag(&name)))?;
                Ok(RenameOutcome::Renamed(tag))
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_tag(&self, id: i32) -> Result<(), ServiceError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, ServiceError, _>(|conn| {
            async move {
                find_tag(conn, id).await?;
                let unlinked = diesel::delete(posts_tags::table.filter(posts_tags::tag_id.eq(id)))
                    .execute(conn)
                    .await?;
                diesel::delete(tags::table.find(id)).execute(conn).await?;

                tracing::info!(unlinked, "tag deleted");
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}
