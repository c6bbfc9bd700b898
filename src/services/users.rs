use axum::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::error::ServiceError;
use crate::models::user::*;
use crate::rules::fields;
use crate::schema::{posts, posts_tags, users};

use super::{PgStore, Svc};

#[async_trait]
pub trait UserService: Svc {
    async fn list_users(&self) -> Result<Vec<User>, ServiceError>;
    async fn get_user(&self, id: i32) -> Result<User, ServiceError>;
    async fn create_user(&self, user: NewUser) -> Result<User, ServiceError>;
    /// Applies an edit form; blank fields keep their stored values.
    async fn update_user(&self, id: i32, form: &UserForm) -> Result<User, ServiceError>;
    /// Deletes the user together with their posts and those posts' tag links.
    async fn delete_user(&self, id: i32) -> Result<(), ServiceError>;
}

pub(super) async fn find_user(conn: &mut AsyncPgConnection, id: i32) -> Result<User, ServiceError> {
    users::table
        .find(id)
        .select(User::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ServiceError::not_found("user", id))
}

#[async_trait]
impl UserService for PgStore {
    #[tracing::instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        let mut conn = self.conn().await?;
        let us = users::table
            .order(users::id.asc())
            .select(User::as_select())
            .load(&mut *conn)
            .await?;
        Ok(us)
    }

    #[tracing::instrument(skip(self))]
    async fn get_user(&self, id: i32) -> Result<User, ServiceError> {
        let mut conn = self.conn().await?;
        find_user(&mut conn, id).await
    }

    #[tracing::instrument(skip(self))]
    async fn create_user(&self, u: NewUser) -> Result<User, ServiceError> {
        let mut conn = self.conn().await?;

        let user = diesel::insert_into(users::table)
            .values(&u)
            .returning(User::as_returning())
            .get_result(&mut *conn)
            .await?;

        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    async fn update_user(&self, id: i32, form: &UserForm) -> Result<User, ServiceError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let form = form.clone();

        conn.transaction::<_, ServiceError, _>(|conn| {
            async move {
                let stored = find_user(conn, id).await?;
                let edited = fields::edited_user(&stored, &form)?;

                let user = diesel::update(users::table.find(id))
                    .set((
                        users::first_name.eq(&edited.first_name),
                        users::last_name.eq(&edited.last_name),
                        users::image_url.eq(&edited.image_url),
                    ))
                    .returning(User::as_returning())
                    .get_result(conn)
                    .await?;
                Ok(user)
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, id: i32) -> Result<(), ServiceError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, ServiceError, _>(|conn| {
            async move {
                find_user(conn, id).await?;

                let owned = posts::table
                    .filter(posts::user_id.eq(id))
                    .select(posts::id)
                    .load::<i32>(conn)
                    .await?;
                diesel::delete(posts_tags::table.filter(posts_tags::post_id.eq_any(&owned)))
                    .execute(conn)
                    .await?;
                let removed = diesel::delete(posts::table.filter(posts::user_id.eq(id)))
                    .execute(conn)
                    .await?;
                diesel::delete(users::table.find(id)).execute(conn).await?;

                tracing::info!(removed_posts = removed, "user deleted");
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}
