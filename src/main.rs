mod apireq;
mod backends;
mod classify;
mod cli;
mod color;
mod config;
mod deploy;
mod dispatch;
mod hub;
mod hyperparameters;
mod registry;
mod tasks;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cli::{
    list::list_cmd, parse_key_value, plan::plan_cmd, query::query_cmd, register::register_cmd,
    show::show_cmd, ColorMode,
};
use registry::ModelSource;

#[derive(
    Parser, Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "model-manager")]
#[command(
    about = "Records deployed model endpoints and queries them according to their task",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Read the configuration from this file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a deployed endpoint
    Query(QueryArgs),
    /// List deployments or tasks
    List(ListArgs),
    /// Print the record of an endpoint
    Show(ShowArgs),
    /// Record a deployed endpoint
    Register(RegisterArgs),
    /// Print the container environment of a recorded endpoint
    Plan(PlanArgs),
}

#[derive(Parser)]
pub(crate) struct QueryArgs {
    /// The endpoint to query
    endpoint: String,
    /// The query. Read from stdin if absent
    query: Option<String>,
    /// A passage, comparison sentence, or comma separated labels, depending
    /// on the task of the endpoint
    #[arg(short, long)]
    context: Option<String>,
    /// A generation parameter, e.g. `temperature=0.2`
    #[arg(short, long = "param", value_parser = parse_key_value)]
    params: Vec<(String, String)>,
    /// Fail instead of asking for missing inputs
    #[arg(long)]
    no_input: bool,
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Recorded deployments
    Deployments(ListDeploymentArgs),
    /// Known tasks and how queries are encoded for them
    Tasks(ListTaskArgs),
}

/// Output formats
#[derive(
    Parser, ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

#[derive(Parser, Default)]
pub(crate) struct ListDeploymentArgs {
    /// Limit listing to deployments serving the specified model
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Parser, Default)]
pub(crate) struct ListTaskArgs {
    /// Limit listing to the vocabulary of the specified source
    #[arg(short, long)]
    source: Option<ModelSource>,
}

#[derive(Parser)]
pub(crate) struct ShowArgs {
    endpoint: String,
}

#[derive(Parser)]
pub(crate) struct RegisterArgs {
    /// The model id, as known to its source
    #[arg(short, long)]
    model: String,
    /// Where the model comes from
    #[arg(short, long)]
    source: ModelSource,
    /// The instance type serving the endpoint
    #[arg(short, long)]
    instance_type: String,
    /// Use this endpoint name instead of generating one
    #[arg(short, long)]
    endpoint_name: Option<String>,
    /// The inference task. Looked up on the hub for hub models
    #[arg(short, long)]
    task: Option<String>,
    #[arg(long)]
    version: Option<String>,
    /// Where the weights of a custom model are stored
    #[arg(short, long)]
    location: Option<String>,
    #[arg(long, default_value_t = 1)]
    instance_count: u32,
    #[arg(long)]
    num_gpus: Option<u32>,
    #[arg(long)]
    quantization: Option<String>,
    /// A default generation parameter, e.g. `max_new_tokens=250`
    #[arg(short, long, value_parser = parse_key_value)]
    predict: Vec<(String, String)>,
}

#[derive(Parser)]
pub(crate) struct PlanArgs {
    endpoint: String,
    /// Output the environment with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// Print the hub token instead of redacting it
    #[arg(long)]
    show_secrets: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    color::configure_color(ColorMode::resolve_auto(cli.color));

    let config = config::read_config(cli.config.clone());

    match &cli.command {
        Commands::Query(args) => query_cmd(&config, args).await,
        Commands::List(args) => list_cmd(&config, args),
        Commands::Show(args) => show_cmd(&config, args),
        Commands::Register(args) => register_cmd(&config, args).await,
        Commands::Plan(args) => plan_cmd(&config, args),
    }
}
