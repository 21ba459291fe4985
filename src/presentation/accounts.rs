//! Sign-up, log-in and profile editing pages.

use askama::Template;

use crate::application::forms::{FormErrors, LoginForm, ProfileForm, RegistrationForm};
use crate::presentation::urls;
use crate::presentation::views::{FieldView, LayoutContext};

pub struct LoginView {
    pub action: String,
    pub username: FieldView,
    pub password: FieldView,
    pub next: Option<String>,
    pub non_field_errors: Vec<String>,
    pub registration_href: String,
}

impl LoginView {
    pub fn new(form: &LoginForm, errors: &FormErrors) -> Self {
        Self {
            action: urls::login(),
            username: FieldView::new("username", "Username", form.username.clone(), errors),
            // Passwords are never echoed back.
            password: FieldView::new("password", "Password", String::new(), errors),
            next: urls::safe_next(form.next.as_deref()),
            non_field_errors: errors.non_field().to_vec(),
            registration_href: urls::registration(),
        }
    }
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

pub struct RegistrationView {
    pub action: String,
    pub username: FieldView,
    pub email: FieldView,
    pub password1: FieldView,
    pub password2: FieldView,
    pub login_href: String,
}

impl RegistrationView {
    pub fn new(form: &RegistrationForm, errors: &FormErrors) -> Self {
        Self {
            action: urls::registration(),
            username: FieldView::new("username", "Username", form.username.clone(), errors),
            email: FieldView::new("email", "Email", form.email.clone(), errors),
            password1: FieldView::new("password1", "Password", String::new(), errors),
            password2: FieldView::new(
                "password2",
                "Password confirmation",
                String::new(),
                errors,
            ),
            login_href: urls::login(),
        }
    }
}

#[derive(Template)]
#[template(path = "auth/registration.html")]
pub struct RegistrationTemplate {
    pub view: LayoutContext<RegistrationView>,
}

pub struct ProfileFormView {
    pub action: String,
    pub username: FieldView,
    pub first_name: FieldView,
    pub last_name: FieldView,
    pub email: FieldView,
    pub cancel_href: String,
}

impl ProfileFormView {
    pub fn new(current_username: &str, form: &ProfileForm, errors: &FormErrors) -> Self {
        Self {
            action: urls::edit_profile(),
            username: FieldView::new("username", "Username", form.username.clone(), errors),
            first_name: FieldView::new("first_name", "First name", form.first_name.clone(), errors),
            last_name: FieldView::new("last_name", "Last name", form.last_name.clone(), errors),
            email: FieldView::new("email", "Email", form.email.clone(), errors),
            cancel_href: urls::profile(current_username),
        }
    }
}

#[derive(Template)]
#[template(path = "blog/profile_form.html")]
pub struct ProfileFormTemplate {
    pub view: LayoutContext<ProfileFormView>,
}
