use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    application::{
        accounts::{AccountError, AccountService},
        blog::{BlogError, BlogService},
        comments::{CommentError, CommentService},
        error::HttpError,
        forms::{
            CommentForm, FormErrors, LoginForm, PostForm, ProfileForm, RegistrationForm,
        },
        posts::{PostError, PostService},
        repos::HealthProbe,
    },
    domain::entities::UserRecord,
    presentation::{
        accounts::{
            LoginTemplate, LoginView, ProfileFormTemplate, ProfileFormView, RegistrationTemplate,
            RegistrationView,
        },
        blog::{
            CommentDeleteTemplate, CommentDeleteView, CommentFormTemplate, CommentFormView,
            FeedTemplate, FeedView, PostDeleteTemplate, PostDeleteView, PostDetailTemplate,
            PostDetailView, PostFormTemplate, PostFormView, ProfileTemplate, ProfileView,
        },
        urls,
        views::{
            LayoutChrome, LayoutContext, SITE_TITLE, render_not_found_response,
            render_template_response,
        },
    },
    util::datetime::format_input,
};

use super::{
    auth::{
        CurrentUser, RequireUser, SESSION_COOKIE, SessionUser, expired_session_cookie,
        resolve_session, session_cookie,
    },
    db_health_response, found,
    middleware::{log_responses, set_request_context},
    repo_error_to_http,
};

/// Typed path parameters. Segments that do not parse name no resource, so
/// they get the 404 page rather than a 400.
struct ResourcePath<T>(T);

impl<S, T> FromRequestParts<S> for ResourcePath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(
                    target = "blogicum::http::public",
                    path = %parts.uri.path(),
                    error = %rejection,
                    "unparseable path parameters"
                );
                let viewer = parts.extensions.get::<SessionUser>().map(|session| &session.0);
                Err(render_not_found_response(LayoutChrome::for_viewer(viewer)))
            }
        }
    }
}

#[derive(Clone)]
pub struct HttpState {
    pub blog: Arc<BlogService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn HealthProbe>,
    pub secure_cookies: bool,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/posts/create/", get(create_post_form).post(create_post))
        .route("/posts/{id}/", get(post_detail))
        .route("/posts/{id}/edit/", get(edit_post_form).post(edit_post))
        .route("/posts/{id}/delete/", get(delete_post_confirm).post(delete_post))
        .route("/posts/{id}/comment/", post(add_comment))
        .route(
            "/posts/{id}/edit_comment/{comment_id}/",
            get(edit_comment_form).post(edit_comment),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}/",
            get(delete_comment_confirm).post(delete_comment),
        )
        .route("/category/{slug}/", get(category_posts))
        .route("/profile/edit/", get(edit_profile_form).post(edit_profile))
        .route("/profile/{username}/", get(profile))
        .route("/auth/registration/", get(registration_form).post(register))
        .route("/auth/login/", get(login_form).post(login))
        .route("/auth/logout/", post(logout))
        .route("/_health/db", get(public_health))
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CursorQuery {
    cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextQuery {
    next: Option<String>,
}

fn chrome_for(viewer: Option<&UserRecord>) -> LayoutChrome {
    LayoutChrome::for_viewer(viewer)
}

fn blog_error_to_response(err: BlogError, chrome: LayoutChrome) -> Response {
    match err {
        BlogError::NotFound(_) => render_not_found_response(chrome),
        BlogError::InvalidCursor(message) => HttpError::new(
            "infra::http::public::blog",
            StatusCode::BAD_REQUEST,
            "Invalid cursor",
            message,
        )
        .into_response(),
        BlogError::Repo(err) => repo_error_to_http("infra::http::public::blog", err).into_response(),
    }
}

/// Non-authors are sent back to the post page.
fn post_error_to_response(err: PostError, chrome: LayoutChrome) -> Response {
    match err {
        PostError::NotFound => render_not_found_response(chrome),
        PostError::Forbidden { post_id } => found(&urls::post_detail(post_id)),
        PostError::Invalid(errors) => HttpError::new(
            "infra::http::public::posts",
            StatusCode::BAD_REQUEST,
            "Invalid post",
            format!("{errors:?}"),
        )
        .into_response(),
        PostError::Repo(err) => {
            repo_error_to_http("infra::http::public::posts", err).into_response()
        }
    }
}

fn comment_error_to_response(err: CommentError, chrome: LayoutChrome) -> Response {
    match err {
        CommentError::PostNotFound | CommentError::NotFound => render_not_found_response(chrome),
        CommentError::Invalid(errors) => HttpError::new(
            "infra::http::public::comments",
            StatusCode::BAD_REQUEST,
            "Invalid comment",
            format!("{errors:?}"),
        )
        .into_response(),
        CommentError::Repo(err) => {
            repo_error_to_http("infra::http::public::comments", err).into_response()
        }
    }
}

fn account_error_to_response(err: AccountError) -> Response {
    match err {
        AccountError::Repo(err) => {
            repo_error_to_http("infra::http::public::accounts", err).into_response()
        }
        other => HttpError::from_error(
            "infra::http::public::accounts",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Account operation failed",
            &other,
        )
        .into_response(),
    }
}

async fn index(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    Query(query): Query<CursorQuery>,
) -> Response {
    let chrome = chrome_for(viewer.as_ref());
    match state.blog.index(query.cursor.as_deref()).await {
        Ok(feed) => {
            let view = LayoutContext::new(chrome, SITE_TITLE, FeedView::index(&feed));
            render_template_response(FeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => blog_error_to_response(err, chrome),
    }
}

async fn category_posts(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    Path(slug): Path<String>,
    Query(query): Query<CursorQuery>,
) -> Response {
    let chrome = chrome_for(viewer.as_ref());
    match state
        .blog
        .category_posts(&slug, query.cursor.as_deref())
        .await
    {
        Ok(feed) => {
            let title = feed.category.title.clone();
            let view = LayoutContext::new(chrome, title, FeedView::category(&feed));
            render_template_response(FeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => blog_error_to_response(err, chrome),
    }
}

async fn profile(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    Path(username): Path<String>,
    Query(query): Query<CursorQuery>,
) -> Response {
    let chrome = chrome_for(viewer.as_ref());
    match state
        .blog
        .profile(&username, viewer.as_ref(), query.cursor.as_deref())
        .await
    {
        Ok(profile) => {
            let title = format!("Profile of {}", profile.user.username);
            let view = LayoutContext::new(chrome, title, ProfileView::from_profile(&profile));
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => blog_error_to_response(err, chrome),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    ResourcePath(id): ResourcePath<i64>,
) -> Response {
    let chrome = chrome_for(viewer.as_ref());
    match state
        .blog
        .post_detail(id, viewer.as_ref().map(|viewer| viewer.id))
        .await
    {
        Ok(detail) => {
            let title = detail.post.post.title.clone();
            let view = LayoutContext::new(
                chrome,
                title,
                PostDetailView::from_detail(&detail, viewer.as_ref()),
            );
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => blog_error_to_response(err, chrome),
    }
}

async fn render_post_form(
    state: &HttpState,
    user: &UserRecord,
    post_id: Option<i64>,
    form: &PostForm,
    errors: &FormErrors,
) -> Response {
    let chrome = chrome_for(Some(user));
    let options = match state.posts.form_options().await {
        Ok(options) => options,
        Err(err) => return post_error_to_response(err, chrome),
    };
    let (title, content) = match post_id {
        Some(id) => ("Edit post", PostFormView::edit(id, form, &options, errors)),
        None => ("New post", PostFormView::create(form, &options, errors)),
    };
    let view = LayoutContext::new(chrome, title, content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

async fn create_post_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
) -> Response {
    let form = PostForm {
        pub_date: Some(format_input(time::OffsetDateTime::now_utc())),
        ..PostForm::default()
    };
    render_post_form(&state, &user, None, &form, &FormErrors::new()).await
}

async fn create_post(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Form(form): Form<PostForm>,
) -> Response {
    match state.posts.create_post(&user, &form).await {
        Ok(_) => found(&urls::profile(&user.username)),
        Err(PostError::Invalid(errors)) => {
            render_post_form(&state, &user, None, &form, &errors).await
        }
        Err(err) => post_error_to_response(err, chrome_for(Some(&user))),
    }
}

async fn edit_post_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    ResourcePath(id): ResourcePath<i64>,
) -> Response {
    match state.posts.load_owned(id, &user).await {
        Ok(post) => {
            let form = PostForm::from_record(&post);
            render_post_form(&state, &user, Some(id), &form, &FormErrors::new()).await
        }
        Err(err) => post_error_to_response(err, chrome_for(Some(&user))),
    }
}

async fn edit_post(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    ResourcePath(id): ResourcePath<i64>,
    Form(form): Form<PostForm>,
) -> Response {
    match state.posts.edit_post(id, &user, &form).await {
        Ok(post) => found(&urls::post_detail(post.id)),
        Err(PostError::Invalid(errors)) => {
            render_post_form(&state, &user, Some(id), &form, &errors).await
        }
        Err(err) => post_error_to_response(err, chrome_for(Some(&user))),
    }
}

async fn delete_post_confirm(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    ResourcePath(id): ResourcePath<i64>,
) -> Response {
    let chrome = chrome_for(Some(&user));
    if let Err(err) = state.posts.load_owned(id, &user).await {
        return post_error_to_response(err, chrome);
    }
    match state.blog.post_detail(id, Some(user.id)).await {
        Ok(detail) => {
            let view = LayoutContext::new(
                chrome,
                "Delete post",
                PostDeleteView::from_listing(&detail.post),
            );
            render_template_response(PostDeleteTemplate { view }, StatusCode::OK)
        }
        Err(err) => blog_error_to_response(err, chrome),
    }
}

async fn delete_post(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    ResourcePath(id): ResourcePath<i64>,
) -> Response {
    match state.posts.delete_post(id, &user).await {
        Ok(()) => found(&urls::index()),
        Err(err) => post_error_to_response(err, chrome_for(Some(&user))),
    }
}

/// Empty comments are dropped and the reader lands back on the post.
async fn add_comment(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    ResourcePath(id): ResourcePath<i64>,
    Form(form): Form<CommentForm>,
) -> Response {
    match state.comments.add_comment(id, &user, &form).await {
        Ok(_) | Err(CommentError::Invalid(_)) => found(&urls::post_detail(id)),
        Err(err) => comment_error_to_response(err, chrome_for(Some(&user))),
    }
}

async fn edit_comment_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    ResourcePath((post_id, comment_id)): ResourcePath<(i64, i64)>,
) -> Response {
    let chrome = chrome_for(Some(&user));
    match state.comments.load_owned(post_id, comment_id, &user).await {
        Ok(comment) => {
            let form = CommentForm {
                text: comment.text.clone(),
            };
            let view = LayoutContext::new(
                chrome,
                "Edit comment",
                CommentFormView::edit(&comment, &form, &FormErrors::new()),
            );
            render_template_response(CommentFormTemplate { view }, StatusCode::OK)
        }
        Err(err) => comment_error_to_response(err, chrome),
    }
}

async fn edit_comment(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    ResourcePath((post_id, comment_id)): ResourcePath<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> Response {
    let chrome = chrome_for(Some(&user));
    match state
        .comments
        .edit_comment(post_id, comment_id, &user, &form)
        .await
    {
        Ok(comment) => found(&urls::post_detail(comment.post_id)),
        Err(CommentError::Invalid(errors)) => {
            match state.comments.load_owned(post_id, comment_id, &user).await {
                Ok(comment) => {
                    let view = LayoutContext::new(
                        chrome,
                        "Edit comment",
                        CommentFormView::edit(&comment, &form, &errors),
                    );
                    render_template_response(CommentFormTemplate { view }, StatusCode::OK)
                }
                Err(err) => comment_error_to_response(err, chrome),
            }
        }
        Err(err) => comment_error_to_response(err, chrome),
    }
}

async fn delete_comment_confirm(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    ResourcePath((post_id, comment_id)): ResourcePath<(i64, i64)>,
) -> Response {
    let chrome = chrome_for(Some(&user));
    match state.comments.load_owned(post_id, comment_id, &user).await {
        Ok(comment) => {
            let view = LayoutContext::new(
                chrome,
                "Delete comment",
                CommentDeleteView::from_record(&comment),
            );
            render_template_response(CommentDeleteTemplate { view }, StatusCode::OK)
        }
        Err(err) => comment_error_to_response(err, chrome),
    }
}

async fn delete_comment(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    ResourcePath((post_id, comment_id)): ResourcePath<(i64, i64)>,
) -> Response {
    match state
        .comments
        .delete_comment(post_id, comment_id, &user)
        .await
    {
        Ok(()) => found(&urls::post_detail(post_id)),
        Err(err) => comment_error_to_response(err, chrome_for(Some(&user))),
    }
}

fn render_profile_form(user: &UserRecord, form: &ProfileForm, errors: &FormErrors) -> Response {
    let view = LayoutContext::new(
        chrome_for(Some(user)),
        "Edit profile",
        ProfileFormView::new(&user.username, form, errors),
    );
    render_template_response(ProfileFormTemplate { view }, StatusCode::OK)
}

async fn edit_profile_form(RequireUser(user): RequireUser) -> Response {
    render_profile_form(&user, &ProfileForm::from_user(&user), &FormErrors::new())
}

async fn edit_profile(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Form(form): Form<ProfileForm>,
) -> Response {
    match state.accounts.update_profile(&user, &form).await {
        Ok(updated) => found(&urls::profile(&updated.username)),
        Err(AccountError::Invalid(errors)) => render_profile_form(&user, &form, &errors),
        Err(err) => account_error_to_response(err),
    }
}

fn render_registration(
    viewer: Option<&UserRecord>,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> Response {
    let view = LayoutContext::new(
        chrome_for(viewer),
        "Sign up",
        RegistrationView::new(form, errors),
    );
    render_template_response(RegistrationTemplate { view }, StatusCode::OK)
}

async fn registration_form(CurrentUser(viewer): CurrentUser) -> Response {
    render_registration(
        viewer.as_ref(),
        &RegistrationForm::default(),
        &FormErrors::new(),
    )
}

async fn register(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    Form(form): Form<RegistrationForm>,
) -> Response {
    match state.accounts.register(&form).await {
        Ok(_) => found(&urls::login()),
        Err(AccountError::Invalid(errors)) => render_registration(viewer.as_ref(), &form, &errors),
        Err(err) => account_error_to_response(err),
    }
}

fn render_login(viewer: Option<&UserRecord>, form: &LoginForm, errors: &FormErrors) -> Response {
    let view = LayoutContext::new(chrome_for(viewer), "Log in", LoginView::new(form, errors));
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

async fn login_form(
    CurrentUser(viewer): CurrentUser,
    Query(query): Query<NextQuery>,
) -> Response {
    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };
    render_login(viewer.as_ref(), &form, &FormErrors::new())
}

async fn login(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.accounts.login(&form).await {
        Ok(session) => {
            let target = urls::safe_next(form.next.as_deref())
                .unwrap_or_else(|| urls::profile(&session.user.username));
            let jar = jar.add(session_cookie(
                session.token,
                session.expires_at,
                state.secure_cookies,
            ));
            (jar, found(&target)).into_response()
        }
        Err(AccountError::Invalid(errors)) => render_login(viewer.as_ref(), &form, &errors),
        Err(err) => account_error_to_response(err),
    }
}

async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.accounts.logout(cookie.value()).await
    {
        warn!(
            target = "blogicum::http::session",
            error = %err,
            "failed to drop session on logout"
        );
    }
    let jar = jar.remove(expired_session_cookie());
    (jar, found(&urls::index())).into_response()
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn fallback(CurrentUser(viewer): CurrentUser) -> Response {
    render_not_found_response(chrome_for(viewer.as_ref()))
}
