use std::{process, sync::Arc, time::Duration};

use blogicum::{
    application::{
        accounts::{AccountError, AccountService},
        blog::BlogService,
        catalog::{CatalogError, CatalogService, NewCategory, NewLocation},
        comments::CommentService,
        error::AppError,
        forms::{FormErrors, RegistrationForm},
        posts::PostService,
        repos::{
            CategoriesRepo, CommentsRepo, HealthProbe, LocationsRepo, PostsRepo, PostsWriteRepo,
            SessionsRepo, UsersRepo,
        },
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Category(args) => run_category(settings, args.command).await,
        config::Command::Location(args) => run_location(settings, args.command).await,
        config::Command::User(args) => run_user(settings, args.command).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

struct ApplicationContext {
    http_state: HttpState,
    accounts: Arc<AccountService>,
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> ApplicationContext {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let locations_repo: Arc<dyn LocationsRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();
    let health: Arc<dyn HealthProbe> = repositories;

    let blog = Arc::new(
        BlogService::new(
            posts_repo.clone(),
            comments_repo.clone(),
            categories_repo.clone(),
            users_repo.clone(),
        )
        .with_page_size(settings.blog.page_size.get()),
    );
    let posts = Arc::new(PostService::new(
        posts_repo.clone(),
        posts_write_repo,
        categories_repo,
        locations_repo,
    ));
    let comments = Arc::new(CommentService::new(posts_repo, comments_repo));
    let accounts = Arc::new(
        AccountService::new(users_repo, sessions_repo)
            .with_session_ttl_hours(settings.auth.session_ttl_hours.get()),
    );

    ApplicationContext {
        http_state: HttpState {
            blog,
            posts,
            comments,
            accounts: accounts.clone(),
            health,
            secure_cookies: settings.auth.secure_cookies,
        },
        accounts,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings);

    let purge_handle = spawn_session_purge(app.accounts.clone());
    let result = serve_http(&settings, app.http_state).await;

    purge_handle.abort();
    let _ = purge_handle.await;

    result
}

fn spawn_session_purge(accounts: Arc<AccountService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match accounts.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => info!(
                    target = "blogicum::sessions",
                    removed, "Purged expired sessions"
                ),
                Err(err) => warn!(
                    target = "blogicum::sessions",
                    error = %err,
                    "Failed to purge expired sessions"
                ),
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "blogicum::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "blogicum::serve", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = "blogicum::serve",
            error = %err,
            "Failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "blogicum::migrate", "Database schema is up to date");
    Ok(())
}

fn catalog_service(repositories: Arc<PostgresRepositories>) -> CatalogService {
    let categories: Arc<dyn CategoriesRepo> = repositories.clone();
    let locations: Arc<dyn LocationsRepo> = repositories;
    CatalogService::new(categories, locations)
}

fn catalog_error(err: CatalogError) -> AppError {
    match err {
        CatalogError::Repo(err) => AppError::unexpected(err.to_string()),
        other => AppError::validation(other.to_string()),
    }
}

async fn run_category(
    settings: config::Settings,
    command: config::CategoryCommand,
) -> Result<(), AppError> {
    let catalog = catalog_service(init_repositories(&settings).await?);

    match command {
        config::CategoryCommand::Add(args) => {
            let category = catalog
                .add_category(NewCategory {
                    title: args.title,
                    description: args.description,
                    slug: args.slug,
                    is_published: !args.unpublished,
                })
                .await
                .map_err(catalog_error)?;
            info!(
                target = "blogicum::catalog",
                id = category.id,
                slug = %category.slug,
                "Category created"
            );
        }
        config::CategoryCommand::List(_) => {
            for category in catalog.categories().await.map_err(catalog_error)? {
                println!(
                    "{}\t{}\t{}\t{}",
                    category.id,
                    category.slug,
                    if category.is_published { "published" } else { "hidden" },
                    category.title
                );
            }
        }
    }
    Ok(())
}

async fn run_location(
    settings: config::Settings,
    command: config::LocationCommand,
) -> Result<(), AppError> {
    let catalog = catalog_service(init_repositories(&settings).await?);

    match command {
        config::LocationCommand::Add(args) => {
            let location = catalog
                .add_location(NewLocation {
                    name: args.name,
                    is_published: !args.unpublished,
                })
                .await
                .map_err(catalog_error)?;
            info!(
                target = "blogicum::catalog",
                id = location.id,
                "Location created"
            );
        }
        config::LocationCommand::List(_) => {
            for location in catalog.locations().await.map_err(catalog_error)? {
                println!(
                    "{}\t{}\t{}",
                    location.id,
                    if location.is_published { "published" } else { "hidden" },
                    location.name
                );
            }
        }
    }
    Ok(())
}

fn describe_form_errors(errors: &FormErrors) -> String {
    errors
        .fields()
        .flat_map(|field| {
            errors
                .get(field)
                .iter()
                .map(move |message| format!("{field}: {message}"))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

async fn run_user(settings: config::Settings, command: config::UserCommand) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings);

    match command {
        config::UserCommand::Add(args) => {
            let form = RegistrationForm {
                username: args.username,
                email: args.email,
                password1: args.password.clone(),
                password2: args.password,
            };
            let user = app.accounts.register(&form).await.map_err(|err| match err {
                AccountError::Invalid(errors) => {
                    AppError::validation(describe_form_errors(&errors))
                }
                other => AppError::unexpected(other.to_string()),
            })?;
            info!(
                target = "blogicum::accounts",
                id = user.id,
                username = %user.username,
                "User created"
            );
        }
    }
    Ok(())
}
