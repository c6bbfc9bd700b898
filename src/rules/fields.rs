//! Required fields, blank-means-unchanged edits and derived values.

use chrono::{DateTime, TimeZone};

use super::names::same_name;
use crate::error::ServiceError;
use crate::models::user::{NewUser, User, UserForm};

pub const DEFAULT_IMAGE_URL: &str = "https://merriam-webster.com/assets/mw/images/article/art-wap-landing-mp-lg/egg-3442-4c317615ec1fd800728672f2c168aca5@1x.jpg";

/// Image URLs shorter than this are taken to be junk and replaced.
const MIN_IMAGE_URL_LEN: usize = 20;
const MAX_NAME_LEN: usize = 50;
const MAX_TITLE_LEN: usize = 75;

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Returns `submitted` unless it is blank, in which case `stored` is kept.
pub fn keep_if_blank(stored: &str, submitted: &str) -> String {
    if is_blank(submitted) {
        stored.to_string()
    } else {
        submitted.to_string()
    }
}

pub fn image_or_default(url: &str) -> String {
    if url.chars().count() < MIN_IMAGE_URL_LEN {
        DEFAULT_IMAGE_URL.to_string()
    } else {
        url.to_string()
    }
}

fn check_name_len(names: &[&str]) -> Result<(), ServiceError> {
    if names.iter().any(|n| n.chars().count() > MAX_NAME_LEN) {
        return Err(ServiceError::Validation(format!(
            "Names must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn check_title_len(title: &str) -> Result<(), ServiceError> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::Validation(format!(
            "Titles must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

pub fn new_user(form: &UserForm) -> Result<NewUser, ServiceError> {
    let (first_name, last_name) = (form.first_name.trim(), form.last_name.trim());
    if first_name.is_empty() || last_name.is_empty() {
        return Err(ServiceError::Validation(
            "Please add a first and last name".into(),
        ));
    }
    check_name_len(&[first_name, last_name])?;
    Ok(NewUser {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        image_url: Some(image_or_default(form.image_url.trim())),
    })
}

/// Applies an edit form to `user`. Blank fields keep what is stored.
pub fn edited_user(user: &User, form: &UserForm) -> Result<User, ServiceError> {
    let first_name = keep_if_blank(&user.first_name, form.first_name.trim());
    let last_name = keep_if_blank(&user.last_name, form.last_name.trim());
    check_name_len(&[&first_name, &last_name])?;
    let image_url = if is_blank(&form.image_url) {
        user.image_url.clone()
    } else {
        Some(form.image_url.trim().to_string())
    };
    Ok(User {
        id: user.id,
        first_name,
        last_name,
        image_url,
    })
}

/// A title and content that passed the required-field checks.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    title: String,
    content: String,
}

impl PostDraft {
    /// The title is kept without surrounding whitespace.
    pub fn new(title: &str, content: &str) -> Result<Self, ServiceError> {
        let title = title.trim();
        let message = match (is_blank(title), is_blank(content)) {
            (true, true) => Some("Please add a title and some content"),
            (true, false) => Some("Please add a title"),
            (false, true) => Some("Please add some content"),
            (false, false) => None,
        };
        if let Some(message) = message {
            return Err(ServiceError::Validation(message.into()));
        }
        check_title_len(title)?;
        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Title to store after an edit, or `None` when the stored one stays: either
/// nothing was submitted or it only differs in case. A `Some` title still has
/// to be checked against the owner's other posts.
pub fn title_change(stored: &str, submitted: &str) -> Result<Option<String>, ServiceError> {
    let submitted = submitted.trim();
    if submitted.is_empty() || same_name(stored, submitted) {
        return Ok(None);
    }
    check_title_len(submitted)?;
    Ok(Some(submitted.to_string()))
}

/// Creation stamp in the format shown on post pages, e.g. `Mar 05 2024 3:07:09 PM`.
pub fn created_at<Tz>(now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    now.format("%b %d %Y %-I:%M:%S %p").to_string()
}

pub fn created_now() -> String {
    created_at(chrono::Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn form(first: &str, last: &str, image: &str) -> UserForm {
        UserForm {
            first_name: first.into(),
            last_name: last.into(),
            image_url: image.into(),
        }
    }

    #[test]
    fn plausible_image_url_is_kept() {
        let url = "https://tinyurl.com/y77znsdx";
        let user = new_user(&form("Ada", "Lovelace", url)).unwrap();
        assert_eq!(user.image_url.as_deref(), Some(url));
    }

    #[test]
    fn short_image_url_becomes_placeholder() {
        let user = new_user(&form("Ada", "Lovelace", "x.png")).unwrap();
        assert_eq!(user.image_url.as_deref(), Some(DEFAULT_IMAGE_URL));
    }

    #[test]
    fn names_and_titles_are_stored_trimmed() {
        let user = new_user(&form(" Ada ", "Lovelace\t", "")).unwrap();
        assert_eq!((user.first_name.as_str(), user.last_name.as_str()), ("Ada", "Lovelace"));

        let draft = PostDraft::new("  Hello ", "body").unwrap();
        assert_eq!(draft.title(), "Hello");
        assert_eq!(title_change("Hello", " Goodbye ").unwrap().as_deref(), Some("Goodbye"));
        assert_eq!(title_change("Hello", " hello ").unwrap(), None);
    }

    #[test]
    fn blank_edit_fields_keep_stored_values() {
        let user = User {
            id: 1,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            image_url: Some("https://example.com/ada.png".into()),
        };
        let edited = edited_user(&user, &form("Augusta", "", " ")).unwrap();
        assert_eq!(edited.first_name, "Augusta");
        assert_eq!(edited.last_name, "Lovelace");
        assert_eq!(edited.image_url, user.image_url);
    }

    #[rstest]
    #[case("", "", "Please add a title and some content")]
    #[case("", "body", "Please add a title")]
    #[case("Title", "  ", "Please add some content")]
    fn missing_post_fields(#[case] title: &str, #[case] content: &str, #[case] expected: &str) {
        let err = PostDraft::new(title, content).unwrap_err();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn overlong_title_is_rejected() {
        let title = "t".repeat(76);
        assert!(PostDraft::new(&title, "body").is_err());
        assert!(PostDraft::new(&title[..75], "body").is_ok());
    }

    #[test]
    fn title_edit_ignores_blank_and_case_only_changes() {
        assert_eq!(title_change("Hello", "").unwrap(), None);
        assert_eq!(title_change("Hello", "HELLO").unwrap(), None);
        assert_eq!(
            title_change("Hello", "Goodbye").unwrap().as_deref(),
            Some("Goodbye")
        );
    }

    #[test]
    fn timestamp_is_human_readable() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 15, 7, 9).unwrap();
        assert_eq!(created_at(at), "Mar 05 2024 3:07:09 PM");
    }
}
