use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use plume::forest;
use plume::logging::{self, LogConfig};
use plume::settings::Settings;
use plume::{HttpGateway, PostStore};
use plume_types::{Comment, Forest, Post, PostDraft, ReactionType, Viewer, Visibility};
use uuid::Uuid;

/// Plume - a terminal front door to a social feed
#[derive(Parser)]
#[command(name = "plume")]
#[command(about = "Browse and act on a social feed from the command line")]
#[command(version)]
struct Cli {
    /// Server URL to connect to
    #[arg(long, short, env = "PLUME_SERVER_URL")]
    server: Option<String>,

    /// Id of the acting user, stamped onto created content
    #[arg(long, env = "PLUME_VIEWER_ID")]
    viewer_id: Option<Uuid>,

    /// Display name of the acting user
    #[arg(long, env = "PLUME_VIEWER_NAME", default_value = "me")]
    viewer_name: String,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the feed, following pagination for a number of pages
    Feed {
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Only posts by this author
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// Show one post with its comments
    Show { id: Uuid },
    /// Publish a post
    Post {
        content: String,
        #[arg(long, default_value = "PUBLIC")]
        visibility: String,
    },
    /// Toggle a reaction on a post
    React {
        id: Uuid,
        #[arg(long, default_value = "LIKE")]
        kind: String,
    },
    /// Comment on a post, or reply to a comment with --parent
    Comment {
        id: Uuid,
        content: String,
        #[arg(long)]
        parent: Option<Uuid>,
    },
    /// Search posts
    Search {
        query: String,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
}

// Load environment variables from .env file
fn load_env() {
    let _ = dotenv::dotenv();
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    logging::init_logging(&log_config)?;

    let mut settings = Settings::new().context("Failed to load settings")?;
    if let Some(url) = cli.server.clone() {
        settings.server.url = url;
    }
    log::info!("Using server {}", settings.server.url);

    let mut gateway = HttpGateway::with_timeout(&settings.server.url, settings.server.timeout())?;
    gateway.set_session_token(settings.server.session_token.clone());

    let viewer = Viewer::new(cli.viewer_id.unwrap_or_else(Uuid::nil), cli.viewer_name.clone());
    let store = Arc::new(
        PostStore::new(Arc::new(gateway), viewer)
            .with_options(settings.store_options())
            .with_log_config(log_config),
    );

    run(cli.command, &store).await
}

async fn run(command: Command, store: &PostStore) -> Result<()> {
    match command {
        Command::Feed { pages, user } => {
            store.load_posts(user).await;
            for _ in 1..pages {
                let snapshot = store.snapshot();
                if !snapshot.has_more() || snapshot.error.is_some() {
                    break;
                }
                store.load_more_posts().await;
            }

            let snapshot = store.snapshot();
            if let Some(error) = snapshot.error {
                return Err(anyhow!(error));
            }
            for post in snapshot.posts.iter() {
                print_post(post);
            }
            if !snapshot.has_more() {
                println!("-- end of feed --");
            }
        }
        Command::Show { id } => {
            let post = store.get_post_by_id(id).await?;
            print_post(&post);
            print_forest(&post.comments, 1);
            let loaded = forest::count_nodes(&post.comments);
            if loaded < post.comments_count as usize {
                println!("    ({} of {} comments loaded)", loaded, post.comments_count);
            }
        }
        Command::Post {
            content,
            visibility,
        } => {
            let visibility = Visibility::parse(&visibility)
                .ok_or_else(|| anyhow!("Unknown visibility: {}", visibility))?;
            let post = store
                .create_post(PostDraft {
                    content: Some(content),
                    media: Vec::new(),
                    visibility,
                })
                .await?;
            println!("Created post {}", post.id);
        }
        Command::React { id, kind } => {
            let reaction = ReactionType::parse(&kind)
                .ok_or_else(|| anyhow!("Unknown reaction: {}", kind))?;
            // Pull the post in so the toggle has a local entry to reconcile
            let post = store.get_post_by_id(id).await?;
            store.open_modal(plume::ModalKind::Reactions, Some(post))?;
            store.toggle_reaction(id, reaction).await;
            if let Some(post) = store.snapshot().selected_post {
                println!(
                    "{} {} ({} reactions)",
                    if post.liked { "Reacted" } else { "Removed reaction" },
                    post.current_reaction.unwrap_or(reaction).as_str(),
                    post.likes_count
                );
            }
        }
        Command::Comment {
            id,
            content,
            parent,
        } => {
            let comment = store.add_comment(id, content, parent).await?;
            println!("Added comment {}", comment.id);
        }
        Command::Search { query, page } => {
            let results = store.search_posts(&query, page).await?;
            for post in &results.posts {
                print_post(post);
            }
            if results.has_more {
                println!("-- more results on page {} --", page + 1);
            }
        }
    }
    Ok(())
}

fn print_post(post: &Post) {
    println!(
        "{}  {}  [{}]  likes:{} comments:{}{}",
        post.id,
        post.author.display_name,
        post.visibility.as_str(),
        post.likes_count,
        post.comments_count,
        if post.liked { " (liked)" } else { "" }
    );
    if let Some(content) = &post.content {
        println!("    {}", content);
    }
}

fn print_forest(forest: &Forest, depth: usize) {
    for comment in forest.iter() {
        print_comment(comment, depth);
        print_forest(&comment.replies, depth + 1);
    }
}

fn print_comment(comment: &Comment, depth: usize) {
    println!(
        "{}{}: {}",
        "    ".repeat(depth),
        comment.author.display_name,
        comment.content
    );
}
