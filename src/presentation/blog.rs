//! View models for listings, post pages and the post and comment editors.

use askama::Template;

use crate::application::blog::{CategoryFeed, PostDetail, PostFeed, ProfileFeed};
use crate::application::forms::{CommentForm, FormErrors, PostForm};
use crate::application::posts::PostFormOptions;
use crate::domain::entities::{CommentListRecord, CommentRecord, PostListRecord, UserRecord};
use crate::presentation::urls;
use crate::presentation::views::{FieldView, LayoutContext, OptionView, SelectView};
use crate::util::datetime::{format_display, format_iso};

const EXCERPT_CHARS: usize = 280;

#[derive(Clone)]
pub struct LinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub href: String,
    pub author: LinkView,
    pub published: String,
    pub iso_date: String,
    pub category: Option<LinkView>,
    pub location: Option<String>,
    pub comment_count: u64,
    /// Shown to the author only: not yet visible to readers.
    pub is_hidden: bool,
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head.trim_end())
    } else {
        head
    }
}

impl PostCard {
    pub fn from_record(record: &PostListRecord, now: time::OffsetDateTime) -> Self {
        let post = &record.post;
        Self {
            id: post.id,
            title: post.title.clone(),
            excerpt: excerpt(&post.text),
            href: urls::post_detail(post.id),
            author: LinkView {
                label: format!("@{}", record.author_username),
                href: urls::profile(&record.author_username),
            },
            published: format_display(post.pub_date),
            iso_date: format_iso(post.pub_date),
            category: record
                .category
                .as_ref()
                .filter(|category| category.is_published)
                .map(|category| LinkView {
                    label: category.title.clone(),
                    href: urls::category_posts(&category.slug),
                }),
            location: record
                .location
                .as_ref()
                .filter(|location| location.is_published)
                .map(|location| location.name.clone()),
            comment_count: record.comment_count,
            is_hidden: !record.is_publicly_visible(now),
        }
    }
}

pub struct FeedView {
    pub heading: String,
    pub description: Option<String>,
    pub posts: Vec<PostCard>,
    pub total: u64,
    pub next_href: Option<String>,
    pub empty_message: String,
}

impl FeedView {
    fn build(heading: String, base_path: &str, feed: &PostFeed) -> Self {
        let now = time::OffsetDateTime::now_utc();
        Self {
            heading,
            description: None,
            posts: feed
                .posts
                .iter()
                .map(|post| PostCard::from_record(post, now))
                .collect(),
            total: feed.total,
            next_href: feed
                .next_cursor
                .as_deref()
                .map(|cursor| urls::with_cursor(base_path, cursor)),
            empty_message: "No posts yet.".to_string(),
        }
    }

    pub fn index(feed: &PostFeed) -> Self {
        Self::build("Latest posts".to_string(), &urls::index(), feed)
    }

    pub fn category(feed: &CategoryFeed) -> Self {
        let mut view = Self::build(
            feed.category.title.clone(),
            &urls::category_posts(&feed.category.slug),
            &feed.feed,
        );
        view.description = Some(feed.category.description.clone()).filter(|d| !d.is_empty());
        view.empty_message = "No posts in this category yet.".to_string();
        view
    }
}

#[derive(Template)]
#[template(path = "blog/feed.html")]
pub struct FeedTemplate {
    pub view: LayoutContext<FeedView>,
}

pub struct ProfileView {
    pub username: String,
    pub full_name: String,
    pub date_joined: String,
    pub is_owner: bool,
    pub edit_href: String,
    pub feed: FeedView,
}

impl ProfileView {
    pub fn from_profile(profile: &ProfileFeed) -> Self {
        let user = &profile.user;
        let mut feed = FeedView::build(
            format!("Posts by {}", user.username),
            &urls::profile(&user.username),
            &profile.feed,
        );
        feed.empty_message = "This user has not published anything yet.".to_string();

        Self {
            username: user.username.clone(),
            full_name: user.display_name(),
            date_joined: format_display(user.date_joined),
            is_owner: profile.is_owner,
            edit_href: urls::edit_profile(),
            feed,
        }
    }
}

#[derive(Template)]
#[template(path = "blog/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

pub struct CommentView {
    pub id: i64,
    pub author: LinkView,
    pub created: String,
    pub text: String,
    pub can_edit: bool,
    pub edit_href: String,
    pub delete_href: String,
}

impl CommentView {
    fn from_record(record: &CommentListRecord, viewer: Option<&UserRecord>) -> Self {
        let comment = &record.comment;
        Self {
            id: comment.id,
            author: LinkView {
                label: format!("@{}", record.author_username),
                href: urls::profile(&record.author_username),
            },
            created: format_display(comment.created_at),
            text: comment.text.clone(),
            can_edit: viewer.is_some_and(|viewer| viewer.id == comment.author_id),
            edit_href: urls::edit_comment(comment.post_id, comment.id),
            delete_href: urls::delete_comment(comment.post_id, comment.id),
        }
    }
}

pub struct PostDetailView {
    pub card: PostCard,
    pub text: String,
    pub is_author: bool,
    pub edit_href: String,
    pub delete_href: String,
    pub comments: Vec<CommentView>,
    pub comment_form: Option<CommentFormView>,
    pub login_href: String,
}

impl PostDetailView {
    pub fn from_detail(detail: &PostDetail, viewer: Option<&UserRecord>) -> Self {
        let post = &detail.post.post;
        let comment_form = viewer.map(|_| {
            CommentFormView::new(
                post.id,
                urls::add_comment(post.id),
                &CommentForm::default(),
                &FormErrors::new(),
            )
        });

        Self {
            card: PostCard::from_record(&detail.post, time::OffsetDateTime::now_utc()),
            text: post.text.clone(),
            is_author: viewer.is_some_and(|viewer| viewer.id == post.author_id),
            edit_href: urls::edit_post(post.id),
            delete_href: urls::delete_post(post.id),
            comments: detail
                .comments
                .iter()
                .map(|comment| CommentView::from_record(comment, viewer))
                .collect(),
            comment_form,
            login_href: urls::login_with_next(&urls::post_detail(post.id)),
        }
    }
}

#[derive(Template)]
#[template(path = "blog/detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct PostFormView {
    pub heading: String,
    pub action: String,
    pub submit_label: String,
    pub title: FieldView,
    pub text: FieldView,
    pub pub_date: FieldView,
    pub category: SelectView,
    pub location: SelectView,
    pub is_published: bool,
    pub non_field_errors: Vec<String>,
}

impl PostFormView {
    pub fn create(form: &PostForm, options: &PostFormOptions, errors: &FormErrors) -> Self {
        Self::build(
            "New post",
            urls::create_post(),
            "Publish",
            form,
            options,
            errors,
        )
    }

    pub fn edit(
        post_id: i64,
        form: &PostForm,
        options: &PostFormOptions,
        errors: &FormErrors,
    ) -> Self {
        Self::build(
            "Edit post",
            urls::edit_post(post_id),
            "Save",
            form,
            options,
            errors,
        )
    }

    fn build(
        heading: &str,
        action: String,
        submit_label: &str,
        form: &PostForm,
        options: &PostFormOptions,
        errors: &FormErrors,
    ) -> Self {
        let location = form.location.clone().unwrap_or_default();
        let is_published = match form.is_published.as_deref() {
            None => true,
            Some(raw) => matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "on" | "true" | "1" | "yes"
            ),
        };

        Self {
            heading: heading.to_string(),
            action,
            submit_label: submit_label.to_string(),
            title: FieldView::new("title", "Title", form.title.clone(), errors),
            text: FieldView::new("text", "Text", form.text.clone(), errors),
            pub_date: FieldView::new(
                "pub_date",
                "Publication date",
                form.pub_date.clone().unwrap_or_default(),
                errors,
            ),
            category: SelectView {
                options: options
                    .categories
                    .iter()
                    .map(|category| OptionView {
                        value: category.id.to_string(),
                        label: category.title.clone(),
                        selected: form.category.trim() == category.id.to_string(),
                    })
                    .collect(),
                field: FieldView::new("category", "Category", form.category.clone(), errors),
                required: true,
            },
            location: SelectView {
                options: options
                    .locations
                    .iter()
                    .map(|loc| OptionView {
                        value: loc.id.to_string(),
                        label: loc.name.clone(),
                        selected: location.trim() == loc.id.to_string(),
                    })
                    .collect(),
                field: FieldView::new("location", "Location", location, errors),
                required: false,
            },
            is_published,
            non_field_errors: errors.non_field().to_vec(),
        }
    }
}

#[derive(Template)]
#[template(path = "blog/post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct PostDeleteView {
    pub card: PostCard,
    pub action: String,
    pub cancel_href: String,
}

impl PostDeleteView {
    pub fn from_listing(record: &PostListRecord) -> Self {
        Self {
            card: PostCard::from_record(record, time::OffsetDateTime::now_utc()),
            action: urls::delete_post(record.post.id),
            cancel_href: urls::post_detail(record.post.id),
        }
    }
}

#[derive(Template)]
#[template(path = "blog/post_delete.html")]
pub struct PostDeleteTemplate {
    pub view: LayoutContext<PostDeleteView>,
}

pub struct CommentFormView {
    pub action: String,
    pub text: FieldView,
    pub cancel_href: String,
}

impl CommentFormView {
    pub fn new(post_id: i64, action: String, form: &CommentForm, errors: &FormErrors) -> Self {
        Self {
            action,
            text: FieldView::new("text", "Comment", form.text.clone(), errors),
            cancel_href: urls::post_detail(post_id),
        }
    }

    pub fn edit(comment: &CommentRecord, form: &CommentForm, errors: &FormErrors) -> Self {
        Self::new(
            comment.post_id,
            urls::edit_comment(comment.post_id, comment.id),
            form,
            errors,
        )
    }
}

#[derive(Template)]
#[template(path = "blog/comment_form.html")]
pub struct CommentFormTemplate {
    pub view: LayoutContext<CommentFormView>,
}

pub struct CommentDeleteView {
    pub text: String,
    pub action: String,
    pub cancel_href: String,
}

impl CommentDeleteView {
    pub fn from_record(comment: &CommentRecord) -> Self {
        Self {
            text: comment.text.clone(),
            action: urls::delete_comment(comment.post_id, comment.id),
            cancel_href: urls::post_detail(comment.post_id),
        }
    }
}

#[derive(Template)]
#[template(path = "blog/comment_delete.html")]
pub struct CommentDeleteTemplate {
    pub view: LayoutContext<CommentDeleteView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CategoryRecord, LocationRecord, PostRecord};
    use crate::presentation::views::LayoutChrome;
    use time::macros::datetime;

    fn listing() -> PostListRecord {
        PostListRecord {
            post: PostRecord {
                id: 3,
                title: "Test Post".into(),
                text: "This is a test post".into(),
                author_id: 1,
                pub_date: datetime!(2024-12-01 12:00 UTC),
                category_id: Some(1),
                location_id: Some(2),
                is_published: true,
                created_at: datetime!(2024-12-01 12:00 UTC),
            },
            author_username: "testuser".into(),
            category: Some(CategoryRecord {
                id: 1,
                title: "Test Category".into(),
                description: "Test Description".into(),
                slug: "test-category".into(),
                is_published: true,
                created_at: datetime!(2024-12-01 00:00 UTC),
            }),
            location: Some(LocationRecord {
                id: 2,
                name: "Hidden Place".into(),
                is_published: false,
                created_at: datetime!(2024-12-01 00:00 UTC),
            }),
            comment_count: 2,
        }
    }

    #[test]
    fn card_hides_unpublished_location() {
        let card = PostCard::from_record(&listing(), datetime!(2025-01-01 00:00 UTC));
        assert_eq!(card.href, "/posts/3/");
        assert_eq!(card.published, "1 December 2024, 12:00");
        assert_eq!(
            card.category.map(|c| c.href).as_deref(),
            Some("/category/test-category/")
        );
        assert!(card.location.is_none());
        assert!(!card.is_hidden);
    }

    #[test]
    fn long_text_is_shortened_in_cards() {
        let mut record = listing();
        record.post.text = "word ".repeat(200);
        let card = PostCard::from_record(&record, datetime!(2025-01-01 00:00 UTC));
        assert!(card.excerpt.ends_with('…'));
        assert!(card.excerpt.chars().count() <= EXCERPT_CHARS + 1);
    }

    #[test]
    fn feed_template_lists_post_titles() {
        let feed = PostFeed {
            posts: vec![listing()],
            next_cursor: Some("abc".into()),
            total: 11,
        };
        let view = LayoutContext::new(
            LayoutChrome::for_viewer(None),
            "Blogicum",
            FeedView::index(&feed),
        );
        let html = FeedTemplate { view }.render().expect("rendered feed");

        assert!(html.contains("Test Post"));
        assert!(html.contains("/category/test-category/"));
        assert!(html.contains("/?cursor=abc"));
    }

    #[test]
    fn post_form_marks_selected_category_and_errors() {
        let options = PostFormOptions {
            categories: vec![listing().category.expect("category")],
            locations: Vec::new(),
        };
        let form = PostForm {
            category: "1".into(),
            ..Default::default()
        };
        let errors = FormErrors::single("title", "This field is required.");
        let view = PostFormView::create(&form, &options, &errors);

        assert!(view.category.options[0].selected);
        assert!(view.title.has_errors());
        assert!(view.is_published);

        let html = PostFormTemplate {
            view: LayoutContext::new(LayoutChrome::for_viewer(None), "New post", view),
        }
        .render()
        .expect("rendered form");
        assert!(html.contains("This field is required."));
        assert!(html.contains(r#"action="/posts/create/""#));
    }
}
