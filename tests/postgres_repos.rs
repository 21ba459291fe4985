//! Repository SQL against a live database; run with `--ignored` and `DATABASE_URL`.

use std::collections::HashSet;

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};

use blogicum::application::pagination::{PageRequest, PostCursor};
use blogicum::application::repos::{
    CategoriesRepo, CommentsRepo, CreateCategoryParams, CreateCommentParams, CreatePostParams,
    CreateUserParams, PostListScope, PostsRepo, PostsWriteRepo, RepoError, UsersRepo,
};
use blogicum::domain::entities::{CategoryRecord, UserRecord};
use blogicum::infra::db::PostgresRepositories;

async fn seed_user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            password_hash: "unused".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
        })
        .await
        .expect("user created")
}

async fn seed_category(
    repos: &PostgresRepositories,
    slug: &str,
    is_published: bool,
) -> CategoryRecord {
    repos
        .create_category(CreateCategoryParams {
            title: format!("Category {slug}"),
            description: String::new(),
            slug: slug.to_string(),
            is_published,
        })
        .await
        .expect("category created")
}

fn post_params(author: &UserRecord, category: &CategoryRecord, title: &str) -> CreatePostParams {
    CreatePostParams {
        title: title.to_string(),
        text: "This is a test post".to_string(),
        author_id: author.id,
        pub_date: OffsetDateTime::now_utc() - Duration::days(1),
        category_id: Some(category.id),
        location_id: None,
        is_published: true,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn post_indexes_exist(pool: PgPool) {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public' AND tablename = 'posts'",
    )
    .fetch_all(&pool)
    .await
    .expect("fetch post indexes");

    let indexes: HashSet<String> = rows.into_iter().collect();
    assert!(indexes.contains("posts_pub_date_idx"), "missing posts_pub_date_idx");
    assert!(indexes.contains("posts_author_idx"), "missing posts_author_idx");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn public_listing_hides_drafts_and_hidden_categories(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = seed_user(&repos, "testuser").await;
    let open = seed_category(&repos, "open", true).await;
    let closed = seed_category(&repos, "closed", false).await;

    repos
        .create_post(post_params(&author, &open, "Visible"))
        .await
        .expect("visible post");
    repos
        .create_post(CreatePostParams {
            is_published: false,
            ..post_params(&author, &open, "Draft")
        })
        .await
        .expect("draft post");
    repos
        .create_post(post_params(&author, &closed, "In hidden category"))
        .await
        .expect("hidden category post");

    let now = OffsetDateTime::now_utc();
    let page = repos
        .list_posts(PostListScope::Public, now, PageRequest::new(10, None))
        .await
        .expect("public listing");
    let titles: Vec<_> = page.items.iter().map(|p| p.post.title.as_str()).collect();
    assert_eq!(titles, vec!["Visible"]);
    assert_eq!(
        repos
            .count_posts(PostListScope::Public, now)
            .await
            .expect("count"),
        1
    );

    let own = repos
        .count_posts(
            PostListScope::Author {
                author_id: author.id,
                include_hidden: true,
            },
            now,
        )
        .await
        .expect("author count");
    assert_eq!(own, 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cursor_pages_do_not_overlap(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = seed_user(&repos, "testuser").await;
    let category = seed_category(&repos, "travel", true).await;
    for n in 0..5 {
        repos
            .create_post(post_params(&author, &category, &format!("Post {n}")))
            .await
            .expect("post created");
    }

    let now = OffsetDateTime::now_utc();
    let first = repos
        .list_posts(PostListScope::Public, now, PageRequest::new(3, None))
        .await
        .expect("first page");
    assert_eq!(first.items.len(), 3);
    let cursor = PostCursor::decode(first.next_cursor.as_deref().expect("next cursor"))
        .expect("cursor decodes");

    let second = repos
        .list_posts(PostListScope::Public, now, PageRequest::new(3, Some(cursor)))
        .await
        .expect("second page");
    assert_eq!(second.items.len(), 2);
    assert!(second.next_cursor.is_none());

    let first_ids: HashSet<i64> = first.items.iter().map(|p| p.post.id).collect();
    assert!(second.items.iter().all(|p| !first_ids.contains(&p.post.id)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleting_post_removes_comments(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = seed_user(&repos, "testuser").await;
    let category = seed_category(&repos, "travel", true).await;
    let post = repos
        .create_post(post_params(&author, &category, "Test Post"))
        .await
        .expect("post created");
    repos
        .create_comment(CreateCommentParams {
            post_id: post.id,
            author_id: author.id,
            text: "Comment to delete".into(),
        })
        .await
        .expect("comment created");

    let listing = repos
        .find_listing(post.id)
        .await
        .expect("listing")
        .expect("post exists");
    assert_eq!(listing.comment_count, 1);
    assert_eq!(listing.author_username, "testuser");

    repos.delete_post(post.id).await.expect("post deleted");
    assert!(repos.list_for_post(post.id).await.expect("comments").is_empty());
    assert!(PostsRepo::find_by_id(&repos, post.id)
        .await
        .expect("lookup")
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_username_maps_to_duplicate(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    seed_user(&repos, "testuser").await;

    let err = repos
        .create_user(CreateUserParams {
            username: "testuser".into(),
            password_hash: "unused".into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
        })
        .await
        .expect_err("duplicate rejected");
    assert!(matches!(err, RepoError::Duplicate { .. }));
}
