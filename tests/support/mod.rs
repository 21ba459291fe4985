//! In-memory repositories and request helpers for router tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use blogicum::application::{
    accounts::AccountService,
    blog::BlogService,
    comments::CommentService,
    pagination::{CursorPage, PageRequest, PostCursor},
    posts::PostService,
    repos::{
        CategoriesRepo, CommentsRepo, CreateCategoryParams, CreateCommentParams,
        CreateLocationParams, CreatePostParams, CreateUserParams, HealthProbe, LocationsRepo,
        PostListScope, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo, UpdatePostParams,
        UpdateProfileParams, UsersRepo,
    },
};
use blogicum::domain::entities::{
    CategoryRecord, CommentListRecord, CommentRecord, LocationRecord, PostListRecord, PostRecord,
    SessionRecord, UserRecord,
};
use blogicum::domain::posts::is_publicly_visible;
use blogicum::infra::http::{HttpState, build_router};

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<UserRecord>,
    sessions: Vec<SessionRecord>,
    categories: Vec<CategoryRecord>,
    locations: Vec<LocationRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn listing(&self, post: &PostRecord) -> PostListRecord {
        PostListRecord {
            post: post.clone(),
            author_username: self
                .users
                .iter()
                .find(|user| user.id == post.author_id)
                .map(|user| user.username.clone())
                .unwrap_or_default(),
            category: post
                .category_id
                .and_then(|id| self.categories.iter().find(|c| c.id == id).cloned()),
            location: post
                .location_id
                .and_then(|id| self.locations.iter().find(|l| l.id == id).cloned()),
            comment_count: self
                .comments
                .iter()
                .filter(|comment| comment.post_id == post.id)
                .count() as u64,
        }
    }

    fn in_scope(&self, post: &PostRecord, scope: PostListScope, now: OffsetDateTime) -> bool {
        let category = post
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id));
        let visible = is_publicly_visible(post, category, now);
        match scope {
            PostListScope::Public => visible,
            PostListScope::Category { category_id } => {
                post.category_id == Some(category_id) && visible
            }
            PostListScope::Author {
                author_id,
                include_hidden,
            } => post.author_id == author_id && (include_hidden || visible),
        }
    }
}

/// Process-local stand-in for the Postgres adapters.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store lock")
    }

    pub fn post_count(&self) -> usize {
        self.lock().posts.len()
    }

    pub fn comment_count(&self, post_id: i64) -> usize {
        self.lock()
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .count()
    }

    pub fn post(&self, id: i64) -> Option<PostRecord> {
        self.lock().posts.iter().find(|post| post.id == id).cloned()
    }

    pub fn posts(&self) -> Vec<PostRecord> {
        self.lock().posts.clone()
    }

    pub fn comment(&self, id: i64) -> Option<CommentRecord> {
        self.lock()
            .comments
            .iter()
            .find(|comment| comment.id == id)
            .cloned()
    }

    pub fn user(&self, username: &str) -> Option<UserRecord> {
        self.lock()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned()
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Insert a user whose password hash is not usable for logging in.
    pub fn insert_user(&self, username: &str) -> UserRecord {
        let mut state = self.lock();
        let user = UserRecord {
            id: state.next_id(),
            username: username.to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            date_joined: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        user
    }

    pub fn insert_category(&self, title: &str, slug: &str, is_published: bool) -> CategoryRecord {
        let mut state = self.lock();
        let category = CategoryRecord {
            id: state.next_id(),
            title: title.to_string(),
            description: "Test Description".to_string(),
            slug: slug.to_string(),
            is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        state.categories.push(category.clone());
        category
    }

    pub fn insert_location(&self, name: &str, is_published: bool) -> LocationRecord {
        let mut state = self.lock();
        let location = LocationRecord {
            id: state.next_id(),
            name: name.to_string(),
            is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        state.locations.push(location.clone());
        location
    }

    pub fn insert_post(&self, post: NewTestPost<'_>) -> PostRecord {
        let mut state = self.lock();
        let record = PostRecord {
            id: state.next_id(),
            title: post.title.to_string(),
            text: post.text.to_string(),
            author_id: post.author.id,
            pub_date: post.pub_date,
            category_id: post.category.map(|c| c.id),
            location_id: post.location.map(|l| l.id),
            is_published: post.is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        state.posts.push(record.clone());
        record
    }

    pub fn insert_comment(&self, post: &PostRecord, author: &UserRecord, text: &str) -> CommentRecord {
        let mut state = self.lock();
        let comment = CommentRecord {
            id: state.next_id(),
            text: text.to_string(),
            post_id: post.id,
            author_id: author.id,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.push(comment.clone());
        comment
    }
}

pub struct NewTestPost<'a> {
    pub title: &'a str,
    pub text: &'a str,
    pub author: &'a UserRecord,
    pub pub_date: OffsetDateTime,
    pub category: Option<&'a CategoryRecord>,
    pub location: Option<&'a LocationRecord>,
    pub is_published: bool,
}

impl<'a> NewTestPost<'a> {
    /// A published post dated one day back.
    pub fn published(author: &'a UserRecord, category: &'a CategoryRecord) -> Self {
        Self {
            title: "Test Post",
            text: "This is a test post",
            author,
            pub_date: OffsetDateTime::now_utc() - Duration::days(1),
            category: Some(category),
            location: None,
            is_published: true,
        }
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.lock();
        if state.users.iter().any(|u| u.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".into(),
            });
        }
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            password_hash: params.password_hash,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            date_joined: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let mut state = self.lock();
        if state
            .users
            .iter()
            .any(|u| u.username == params.username && u.id != params.id)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".into(),
            });
        }
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == params.id)
            .ok_or(RepoError::NotFound)?;
        user.username = params.username;
        user.first_name = params.first_name;
        user.last_name = params.last_name;
        user.email = params.email;
        Ok(user.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.user(username))
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(&self, session: SessionRecord) -> Result<(), RepoError> {
        self.lock().sessions.push(session);
        Ok(())
    }

    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), RepoError> {
        self.lock().sessions.retain(|s| s.token_hash != token_hash);
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|s| s.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.lock();
        if state.categories.iter().any(|c| c.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "categories_slug_key".into(),
            });
        }
        let category = CategoryRecord {
            id: state.next_id(),
            title: params.title,
            description: params.description,
            slug: params.slug,
            is_published: params.is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.lock().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(self.lock().categories.clone())
    }
}

#[async_trait]
impl LocationsRepo for MemoryStore {
    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError> {
        let mut state = self.lock();
        let location = LocationRecord {
            id: state.next_id(),
            name: params.name,
            is_published: params.is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        state.locations.push(location.clone());
        Ok(location)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LocationRecord>, RepoError> {
        Ok(self.lock().locations.iter().find(|l| l.id == id).cloned())
    }

    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError> {
        Ok(self.lock().locations.clone())
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostListRecord>, RepoError> {
        let state = self.lock();
        let mut posts: Vec<&PostRecord> = state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope, now))
            .filter(|post| {
                page.cursor
                    .is_none_or(|cursor| cursor.precedes(post.pub_date, post.id))
            })
            .collect();
        posts.sort_by(|a, b| (b.pub_date, b.id).cmp(&(a.pub_date, a.id)));

        let rows = posts
            .into_iter()
            .take(page.fetch_limit() as usize)
            .map(|post| state.listing(post))
            .collect();
        Ok(CursorPage::from_overfetch(rows, page.limit, |row| {
            PostCursor::new(row.post.pub_date, row.post.id).encode()
        }))
    }

    async fn count_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let state = self.lock();
        Ok(state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope, now))
            .count() as u64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.post(id))
    }

    async fn find_listing(&self, id: i64) -> Result<Option<PostListRecord>, RepoError> {
        let state = self.lock();
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| state.listing(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.lock();
        let post = PostRecord {
            id: state.next_id(),
            title: params.title,
            text: params.text,
            author_id: params.author_id,
            pub_date: params.pub_date,
            category_id: params.category_id,
            location_id: params.location_id,
            is_published: params.is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.lock();
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.text = params.text;
        post.pub_date = params.pub_date;
        post.category_id = params.category_id;
        post.location_id = params.location_id;
        post.is_published = params.is_published;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.lock();
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentListRecord>, RepoError> {
        let state = self.lock();
        let mut comments: Vec<CommentListRecord> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| CommentListRecord {
                comment: comment.clone(),
                author_username: state
                    .users
                    .iter()
                    .find(|u| u.id == comment.author_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
            })
            .collect();
        comments.sort_by_key(|c| (c.comment.created_at, c.comment.id));
        Ok(comments)
    }

    async fn find_comment(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self
            .comment(comment_id)
            .filter(|comment| comment.post_id == post_id))
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.lock();
        let comment = CommentRecord {
            id: state.next_id(),
            text: params.text,
            post_id: params.post_id,
            author_id: params.author_id,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, text: String) -> Result<CommentRecord, RepoError> {
        let mut state = self.lock();
        let comment = state
            .comments
            .iter_mut()
            .find(|comment| comment.id == id)
            .ok_or(RepoError::NotFound)?;
        comment.text = text;
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.lock();
        let before = state.comments.len();
        state.comments.retain(|comment| comment.id != id);
        if state.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub accounts: Arc<AccountService>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let blog = Arc::new(BlogService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let posts = Arc::new(PostService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let comments = Arc::new(CommentService::new(store.clone(), store.clone()));
        let accounts = Arc::new(AccountService::new(store.clone(), store.clone()));

        let router = build_router(HttpState {
            blog,
            posts,
            comments,
            accounts: accounts.clone(),
            health: store.clone(),
            secure_cookies: false,
        });

        Self {
            router,
            store,
            accounts,
        }
    }

    /// Open a session for `user` and return the `Cookie` header value.
    pub async fn session_for(&self, user: &UserRecord) -> String {
        let session = self
            .accounts
            .open_session(user.clone())
            .await
            .expect("session opened");
        format!("sessionid={}", session.token)
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Method::GET, path, cookie, None).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.send(Method::POST, path, cookie, Some(body)).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        cookie: Option<&str>,
        body: Option<String>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collected")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("redirect location")
}

pub fn assert_redirect(response: &Response<Body>, expected: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(response), expected);
}
