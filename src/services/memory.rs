//! In-process store used when no database URL is configured.
//!
//! Every operation takes the table lock once and checks everything before it
//! mutates anything, so a rejected request leaves the tables untouched.
//! Data is lost on process restart.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::async_trait;
use tokio::sync::RwLock;

use crate::error::ServiceError;
use crate::models::post::{Post, PostForm};
use crate::models::tag::{PostTag, Tag};
use crate::models::user::{NewUser, User, UserForm};
use crate::rules::fields::{self, PostDraft};
use crate::rules::names::{self, Rename};
use crate::rules::tags::{reconcile, TagPlan};

use super::{PostService, RenameOutcome, Svc, TagService, UserService};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    posts: BTreeMap<i32, Post>,
    tags: BTreeMap<i32, Tag>,
    links: BTreeSet<PostTag>,
    user_seq: i32,
    post_seq: i32,
    tag_seq: i32,
}

fn next(seq: &mut i32) -> i32 {
    *seq += 1;
    *seq
}

impl Tables {
    fn user(&self, id: i32) -> Result<&User, ServiceError> {
        self.users
            .get(&id)
            .ok_or_else(|| ServiceError::not_found("user", id))
    }

    fn post(&self, id: i32) -> Result<&Post, ServiceError> {
        self.posts
            .get(&id)
            .ok_or_else(|| ServiceError::not_found("post", id))
    }

    fn tag(&self, id: i32) -> Result<&Tag, ServiceError> {
        self.tags
            .get(&id)
            .ok_or_else(|| ServiceError::not_found("tag", id))
    }

    fn linked_tags(&self, post_id: i32) -> Vec<Tag> {
        let mut ts: Vec<Tag> = self
            .links
            .iter()
            .filter(|l| l.post_id == post_id)
            .filter_map(|l| self.tags.get(&l.tag_id).cloned())
            .collect();
        ts.sort_by(|a, b| a.name.cmp(&b.name));
        ts
    }

    fn catalog(&self) -> Vec<Tag> {
        self.tags.values().cloned().collect()
    }

    fn titles_of(&self, owner: i32, except: Option<i32>) -> impl Iterator<Item = &str> {
        self.posts
            .values()
            .filter(move |p| p.user_id == owner && Some(p.id) != except)
            .map(|p| p.title.as_str())
    }

    fn apply_plan(&mut self, post_id: i32, plan: &TagPlan) {
        for tag_id in &plan.remove {
            self.links.remove(&PostTag {
                post_id,
                tag_id: *tag_id,
            });
        }
        for tag_id in &plan.add {
            self.links.insert(PostTag {
                post_id,
                tag_id: *tag_id,
            });
        }
    }

    fn unlink_post(&mut self, post_id: i32) {
        self.links.retain(|l| l.post_id != post_id);
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl Svc for MemoryStore {}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserService for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, id: i32) -> Result<User, ServiceError> {
        self.tables.read().await.user(id).cloned()
    }

    async fn create_user(&self, u: NewUser) -> Result<User, ServiceError> {
        let mut t = self.tables.write().await;
        let user = User {
            id: next(&mut t.user_seq),
            first_name: u.first_name,
            last_name: u.last_name,
            image_url: u.image_url,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: i32, form: &UserForm) -> Result<User, ServiceError> {
        let mut t = self.tables.write().await;
        let edited = fields::edited_user(t.user(id)?, form)?;
        t.users.insert(id, edited.clone());
        Ok(edited)
    }

    async fn delete_user(&self, id: i32) -> Result<(), ServiceError> {
        let mut t = self.tables.write().await;
        t.user(id)?;
        let owned: Vec<i32> = t
            .posts
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in owned {
            t.unlink_post(post_id);
            t.posts.remove(&post_id);
        }
        t.users.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PostService for MemoryStore {
    async fn posts_for_user(&self, user_id: i32) -> Result<Vec<Post>, ServiceError> {
        let t = self.tables.read().await;
        Ok(t.posts
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_post(&self, id: i32) -> Result<Post, ServiceError> {
        self.tables.read().await.post(id).cloned()
    }

    async fn tags_for_post(&self, post_id: i32) -> Result<Vec<Tag>, ServiceError> {
        Ok(self.tables.read().await.linked_tags(post_id))
    }

    async fn create_post(
        &self,
        user_id: i32,
        draft: PostDraft,
        tags: &[String],
    ) -> Result<Post, ServiceError> {
        let mut t = self.tables.write().await;
        t.user(user_id)?;
        names::ensure_unique(draft.title(), t.titles_of(user_id, None), names::duplicate_title)?;
        let plan = reconcile(&[], tags, &t.catalog())?;

        let post = Post {
            id: next(&mut t.post_seq),
            title: draft.title().to_string(),
            content: draft.content().to_string(),
            created_at: fields::created_now(),
            user_id,
        };
        t.posts.insert(post.id, post.clone());
        t.apply_plan(post.id, &plan);
        Ok(post)
    }

    async fn update_post(&self, id: i32, form: &PostForm) -> Result<Post, ServiceError> {
        let mut t = self.tables.write().await;
        let stored = t.post(id)?.clone();
        let title = match fields::title_change(&stored.title, &form.title)? {
            Some(title) => {
                names::ensure_unique(
                    &title,
                    t.titles_of(stored.user_id, Some(id)),
                    names::duplicate_title,
                )?;
                title
            }
            None => stored.title.clone(),
        };
        let plan = reconcile(&t.linked_tags(id), &form.tags, &t.catalog())?;

        let post = Post {
            title,
            content: fields::keep_if_blank(&stored.content, &form.content),
            ..stored
        };
        t.posts.insert(id, post.clone());
        t.apply_plan(id, &plan);
        Ok(post)
    }

    async fn delete_post(&self, id: i32) -> Result<Post, ServiceError> {
        let mut t = self.tables.write().await;
        let post = t.post(id)?.clone();
        t.unlink_post(id);
        t.posts.remove(&id);
        Ok(post)
    }
}

#[async_trait]
impl TagService for MemoryStore {
    async fn list_tags(&self) -> Result<Vec<Tag>, ServiceError> {
        let mut ts = self.tables.read().await.catalog();
        ts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ts)
    }

    async fn get_tag(&self, id: i32) -> Result<Tag, ServiceError> {
        self.tables.read().await.tag(id).cloned()
    }

    async fn posts_for_tag(&self, tag_id: i32) -> Result<Vec<Post>, ServiceError> {
        let t = self.tables.read().await;
        Ok(t.links
            .iter()
            .filter(|l| l.tag_id == tag_id)
            .filter_map(|l| t.posts.get(&l.post_id).cloned())
            .collect())
    }

    async fn create_tag(&self, name: &str) -> Result<Tag, ServiceError> {
        let name = names::require_tag_name(name)?;
        let mut t = self.tables.write().await;
        names::ensure_unique(name, t.tags.values().map(|tag| tag.name.as_str()), || {
            names::duplicate_tag(name)
        })?;

        let tag = Tag {
            id: next(&mut t.tag_seq),
            name: name.to_string(),
        };
        t.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn rename_tag(&self, id: i32, name: &str) -> Result<RenameOutcome, ServiceError> {
        let name = names::require_tag_name(name)?;
        let mut t = self.tables.write().await;
        let stored = t.tag(id)?.clone();
        if names::classify_rename(&stored.name, name) == Rename::Unchanged {
            return Ok(RenameOutcome::Unchanged(stored));
        }
        names::ensure_unique(
            name,
            t.tags
                .values()
                .filter(|tag| tag.id != id)
                .map(|tag| tag.name.as_str()),
            || names::duplicate_tag(name),
        )?;

        let tag = Tag {
            id,
            name: name.to_string(),
        };
        t.tags.insert(id, tag.clone());
        Ok(RenameOutcome::Renamed(tag))
    }

    async fn delete_tag(&self, id: i32) -> Result<(), ServiceError> {
        let mut t = self.tables.write().await;
        t.tag(id)?;
        t.links.retain(|l| l.tag_id != id);
        t.tags.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_form(first: &str, last: &str, image: &str) -> UserForm {
        UserForm {
            first_name: first.into(),
            last_name: last.into(),
            image_url: image.into(),
        }
    }

    fn post_form(title: &str, content: &str, tags: &[&str]) -> PostForm {
        PostForm {
            title: title.into(),
            content: content.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    async fn seeded() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let form = user_form("Ada", "Lovelace", "https://tinyurl.com/y77znsdx");
        let user = store
            .create_user(fields::new_user(&form).unwrap())
            .await
            .unwrap();
        (store, user)
    }

    fn tag_names(ts: &[Tag]) -> Vec<&str> {
        ts.iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn deleting_a_user_removes_their_posts() {
        let (store, user) = seeded().await;
        store.create_tag("A").await.unwrap();
        let draft = PostDraft::new("One", "first").unwrap();
        let post = store
            .create_post(user.id, draft, &["A".to_string()])
            .await
            .unwrap();

        store.delete_user(user.id).await.unwrap();

        assert!(store.get_user(user.id).await.unwrap_err().is_not_found());
        assert!(store.get_post(post.id).await.unwrap_err().is_not_found());
        assert!(store.tables.read().await.links.is_empty());
    }

    #[tokio::test]
    async fn titles_are_unique_per_owner_ignoring_case() {
        let (store, user) = seeded().await;
        let other = store
            .create_user(fields::new_user(&user_form("Grace", "Hopper", "")).unwrap())
            .await
            .unwrap();

        store
            .create_post(user.id, PostDraft::new("Hello", "x").unwrap(), &[])
            .await
            .unwrap();
        let err = store
            .create_post(user.id, PostDraft::new("HELLO", "y").unwrap(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        store
            .create_post(other.id, PostDraft::new("HELLO", "y").unwrap(), &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn tag_names_are_unique_ignoring_case() {
        let store = MemoryStore::new();
        store.create_tag("Fun").await.unwrap();
        let err = store.create_tag("fun").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "The tag \"fun\" already exists, please create one with a different name"
        );
        assert_eq!(store.list_tags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn editing_tags_reconciles_links() {
        let (store, user) = seeded().await;
        for name in ["A", "B", "C"] {
            store.create_tag(name).await.unwrap();
        }
        let post = store
            .create_post(
                user.id,
                PostDraft::new("Tagged", "body").unwrap(),
                &["A".to_string(), "B".to_string()],
            )
            .await
            .unwrap();

        let edit = post_form("", "", &["B", "C"]);
        store.update_post(post.id, &edit).await.unwrap();
        let after = store.tags_for_post(post.id).await.unwrap();
        assert_eq!(tag_names(&after), vec!["B", "C"]);

        let links_before = store.tables.read().await.links.clone();
        store.update_post(post.id, &edit).await.unwrap();
        assert_eq!(store.tables.read().await.links, links_before);

        let kept = store.get_post(post.id).await.unwrap();
        assert_eq!(kept.title, "Tagged");
        assert_eq!(kept.content, "body");
    }

    #[tokio::test]
    async fn unknown_tag_leaves_post_untouched() {
        let (store, user) = seeded().await;
        store.create_tag("A").await.unwrap();
        let post = store
            .create_post(user.id, PostDraft::new("T", "c").unwrap(), &["A".to_string()])
            .await
            .unwrap();

        let err = store
            .update_post(post.id, &post_form("New", "", &["Missing"]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(store.get_post(post.id).await.unwrap().title, "T");
        assert_eq!(tag_names(&store.tags_for_post(post.id).await.unwrap()), vec!["A"]);
    }

    #[tokio::test]
    async fn deleting_a_tag_keeps_posts() {
        let (store, user) = seeded().await;
        let tag = store.create_tag("A").await.unwrap();
        let post = store
            .create_post(user.id, PostDraft::new("T", "c").unwrap(), &["A".to_string()])
            .await
            .unwrap();

        store.delete_tag(tag.id).await.unwrap();

        assert!(store.tags_for_post(post.id).await.unwrap().is_empty());
        assert_eq!(store.get_post(post.id).await.unwrap(), post);
    }

    #[tokio::test]
    async fn renaming_to_own_name_is_a_no_op() {
        let store = MemoryStore::new();
        let tag = store.create_tag("Rust").await.unwrap();
        store.create_tag("Go").await.unwrap();

        let outcome = store.rename_tag(tag.id, "RUST").await.unwrap();
        assert_eq!(outcome, RenameOutcome::Unchanged(tag.clone()));
        assert_eq!(store.get_tag(tag.id).await.unwrap().name, "Rust");

        assert!(store.rename_tag(tag.id, "go").await.is_err());

        let outcome = store.rename_tag(tag.id, "Rustlang").await.unwrap();
        assert!(matches!(outcome, RenameOutcome::Renamed(ref t) if t.name == "Rustlang"));
    }
}
