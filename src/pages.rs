use std::sync::Arc;

use axum::response::Html;
use tera::{Context, Tera};

use crate::error::AppError;

macro_rules! templates {
    ($($name:literal),* $(,)?) => {
        [$(($name, include_str!(concat!("templates/", $name)))),*]
    };
}

/// Compiled page templates, shared by every handler.
#[derive(Clone)]
pub struct Pages {
    tera: Arc<Tera>,
}

impl Pages {
    /// Compiles the templates embedded from `src/templates/`.
    pub fn load() -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates![
            "base.html",
            "list_users.html",
            "create_user.html",
            "user_details.html",
            "edit_user.html",
            "create_post.html",
            "show_post.html",
            "edit_post.html",
            "list_tags.html",
            "create_tag.html",
            "edit_tag.html",
            "tag_posts.html",
        ])?;
        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    pub fn render(&self, name: &str, ctx: &Context) -> Result<Html<String>, AppError> {
        Ok(Html(self.tera.render(name, ctx)?))
    }
}
