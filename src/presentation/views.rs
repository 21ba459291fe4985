use crate::application::error::{ErrorReport, HttpError};
use crate::application::forms::FormErrors;
use crate::domain::entities::UserRecord;
use crate::presentation::urls;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

pub const SITE_TITLE: &str = "Blogicum";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub profile_href: String,
}

/// Page frame shared by every template: brand, navigation and who is signed in.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: Vec<NavigationLinkView>,
    pub viewer: Option<ViewerView>,
    pub logout_action: String,
}

impl LayoutChrome {
    pub fn for_viewer(viewer: Option<&UserRecord>) -> Self {
        let mut navigation = vec![NavigationLinkView {
            label: "Home".to_string(),
            href: urls::index(),
        }];

        match viewer {
            Some(_) => navigation.push(NavigationLinkView {
                label: "New post".to_string(),
                href: urls::create_post(),
            }),
            None => {
                navigation.push(NavigationLinkView {
                    label: "Log in".to_string(),
                    href: urls::login(),
                });
                navigation.push(NavigationLinkView {
                    label: "Sign up".to_string(),
                    href: urls::registration(),
                });
            }
        }

        Self {
            brand: BrandView {
                title: SITE_TITLE.to_string(),
                href: urls::index(),
            },
            navigation,
            viewer: viewer.map(|user| ViewerView {
                username: user.username.clone(),
                profile_href: urls::profile(&user.username),
            }),
            logout_action: urls::logout(),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: Vec<NavigationLinkView>,
    pub viewer: Option<ViewerView>,
    pub logout_action: String,
    pub page_title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, page_title: impl Into<String>, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            viewer: chrome.viewer,
            logout_action: chrome.logout_action,
            page_title: page_title.into(),
            content,
        }
    }
}

/// One input of a rendered form with its submitted value and messages.
#[derive(Clone, Debug, Default)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub errors: Vec<String>,
}

impl FieldView {
    pub fn new(
        name: &'static str,
        label: &'static str,
        value: impl Into<String>,
        errors: &FormErrors,
    ) -> Self {
        Self {
            name,
            label,
            value: value.into(),
            errors: errors.get(name).to_vec(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Clone, Debug)]
pub struct SelectView {
    pub field: FieldView,
    pub options: Vec<OptionView>,
    pub required: bool,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: urls::index(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn user() -> UserRecord {
        UserRecord {
            id: 1,
            username: "testuser".into(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            date_joined: datetime!(2024-12-01 00:00 UTC),
        }
    }

    #[test]
    fn anonymous_chrome_offers_login_and_sign_up() {
        let chrome = LayoutChrome::for_viewer(None);
        let labels: Vec<_> = chrome.navigation.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, ["Home", "Log in", "Sign up"]);
        assert!(chrome.viewer.is_none());
    }

    #[test]
    fn signed_in_chrome_links_profile() {
        let user = user();
        let chrome = LayoutChrome::for_viewer(Some(&user));
        let viewer = chrome.viewer.expect("viewer");
        assert_eq!(viewer.profile_href, "/profile/testuser/");
        assert!(chrome.navigation.iter().any(|l| l.href == "/posts/create/"));
    }

    #[test]
    fn not_found_page_renders_with_report() {
        let response = render_not_found_response(LayoutChrome::for_viewer(None));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }

    #[test]
    fn field_view_collects_its_own_errors() {
        let errors = FormErrors::single("title", "This field is required.");
        let field = FieldView::new("title", "Title", "", &errors);
        assert!(field.has_errors());
        let other = FieldView::new("text", "Text", "body", &errors);
        assert!(!other.has_errors());
    }
}
