//! Path builders for every named route.

use url::form_urlencoded;

fn segment(value: &str) -> String {
    url::Url::parse("http://localhost/")
        .ok()
        .and_then(|mut base| {
            base.path_segments_mut().ok()?.clear().push(value);
            Some(base.path().trim_start_matches('/').to_string())
        })
        .unwrap_or_else(|| value.to_string())
}

pub fn index() -> String {
    "/".to_string()
}

pub fn post_detail(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

pub fn category_posts(slug: &str) -> String {
    format!("/category/{}/", segment(slug))
}

pub fn profile(username: &str) -> String {
    format!("/profile/{}/", segment(username))
}

pub fn edit_profile() -> String {
    "/profile/edit/".to_string()
}

pub fn create_post() -> String {
    "/posts/create/".to_string()
}

pub fn edit_post(post_id: i64) -> String {
    format!("/posts/{post_id}/edit/")
}

pub fn delete_post(post_id: i64) -> String {
    format!("/posts/{post_id}/delete/")
}

pub fn add_comment(post_id: i64) -> String {
    format!("/posts/{post_id}/comment/")
}

pub fn edit_comment(post_id: i64, comment_id: i64) -> String {
    format!("/posts/{post_id}/edit_comment/{comment_id}/")
}

pub fn delete_comment(post_id: i64, comment_id: i64) -> String {
    format!("/posts/{post_id}/delete_comment/{comment_id}/")
}

pub fn registration() -> String {
    "/auth/registration/".to_string()
}

pub fn login() -> String {
    "/auth/login/".to_string()
}

/// Login page that returns to `next` afterwards.
pub fn login_with_next(next: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("/auth/login/?{query}")
}

pub fn logout() -> String {
    "/auth/logout/".to_string()
}

/// Append a pagination cursor to a listing path.
pub fn with_cursor(path: &str, cursor: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("cursor", cursor)
        .finish();
    format!("{path}?{query}")
}

/// Accept only same-site absolute paths as redirect targets.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    let is_local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.contains(['\r', '\n']);
    is_local.then(|| next.to_string())
}
