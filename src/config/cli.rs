use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Blogicum binary.
#[derive(Debug, Parser)]
#[command(name = "blogicum", version, about = "Blogicum blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BLOGICUM_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations.
    Migrate(MigrateArgs),
    /// Manage post categories.
    Category(CategoryArgs),
    /// Manage post locations.
    Location(LocationArgs),
    /// Manage user accounts.
    User(UserArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the session lifetime.
    #[arg(long = "session-ttl-hours", value_name = "HOURS")]
    pub session_ttl_hours: Option<u32>,

    /// Mark the session cookie `Secure`.
    #[arg(
        long = "secure-cookies",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub secure_cookies: Option<bool>,

    /// Override the number of posts per page.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CategoryCommand {
    /// Create a category.
    Add(CategoryAddArgs),
    /// List categories.
    List(ListArgs),
}

#[derive(Debug, Args, Clone)]
pub struct CategoryAddArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Category title.
    #[arg(value_name = "TITLE")]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Explicit slug; derived from the title when omitted.
    #[arg(long)]
    pub slug: Option<String>,

    /// Create the category hidden from readers.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub unpublished: bool,
}

#[derive(Debug, Args, Clone)]
pub struct LocationArgs {
    #[command(subcommand)]
    pub command: LocationCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum LocationCommand {
    /// Create a location.
    Add(LocationAddArgs),
    /// List locations.
    List(ListArgs),
}

#[derive(Debug, Args, Clone)]
pub struct LocationAddArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Location name.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Create the location hidden from readers.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub unpublished: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Clone)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum UserCommand {
    /// Create a user account.
    Add(UserAddArgs),
}

#[derive(Debug, Args, Clone)]
pub struct UserAddArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(value_name = "USERNAME")]
    pub username: String,

    /// Initial password. Falls back to `BLOGICUM_USER_PASSWORD`.
    #[arg(long, env = "BLOGICUM_USER_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long, default_value = "")]
    pub email: String,
}
