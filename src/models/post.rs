use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Form body for creating or editing a post. `tags` repeats once per checked
/// box, so it has to be parsed with `axum_extra::extract::Form`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::posts)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub user_id: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub user_id: i32,
}
