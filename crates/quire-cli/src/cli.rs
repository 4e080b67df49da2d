use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "quire",
    about = "quire: a flat-file blog content store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the blog's properties file
    #[arg(short, long, global = true, default_value = "blog.properties")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a blog home and write its properties file
    Init(InitArgs),
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage entries
    Entry {
        #[command(subcommand)]
        action: EntryAction,
    },
    /// Submit or list comments
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },
    /// Bulk moderation of comments, trackbacks and pingbacks
    Moderate {
        #[command(subcommand)]
        action: ModerateAction,
    },
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory that will hold all content
    pub home: PathBuf,
    /// Minutes between accepted comments from one address
    #[arg(long)]
    pub throttle: Option<u32>,
    /// Days after which entries stop taking comments
    #[arg(long)]
    pub expire_days: Option<u32>,
    /// Turn newlines in comments into line breaks
    #[arg(long)]
    pub autoformat: bool,
    /// Overwrite an existing properties file
    #[arg(long)]
    pub force: bool,
}

#[derive(Subcommand)]
pub enum CategoryAction {
    Add {
        path: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        path: String,
    },
    List,
}

#[derive(Subcommand)]
pub enum EntryAction {
    Add(EntryAddArgs),
    Show {
        category: String,
        permalink: String,
    },
    Delete {
        category: String,
        permalink: String,
    },
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[derive(Args)]
pub struct EntryAddArgs {
    #[arg(long, default_value = "/")]
    pub category: String,
    #[arg(long, default_value = "")]
    pub title: String,
    #[arg(long, conflicts_with = "body_file")]
    pub body: Option<String>,
    #[arg(long)]
    pub body_file: Option<PathBuf>,
    /// Extra metadata as key=value
    #[arg(long = "meta")]
    pub metadata: Vec<String>,
}

#[derive(Subcommand)]
pub enum CommentAction {
    Submit(CommentSubmitArgs),
    List {
        category: String,
        permalink: String,
    },
}

#[derive(Args)]
pub struct CommentSubmitArgs {
    #[arg(long, default_value = "/")]
    pub category: String,
    #[arg(long)]
    pub permalink: String,
    #[arg(long)]
    pub author: String,
    #[arg(long)]
    pub body: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "")]
    pub url: String,
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,
}

#[derive(Subcommand)]
pub enum ModerateAction {
    /// Mark responses approved
    Approve { ids: Vec<String> },
    /// Mark responses as spam
    Spam { ids: Vec<String> },
    /// Return responses to the moderation queue
    Reset { ids: Vec<String> },
    /// Delete responses
    Delete { ids: Vec<String> },
    /// List responses awaiting moderation
    Pending,
}
