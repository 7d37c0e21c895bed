use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use content_store::models::CommunitySelection;
use content_store::telemetry::init_tracing;
use content_store::{
    CommunityContext, Config, ContentError, ContextOptions, FeedScope, FileInput, Identity,
};
use kv_store::{FileStore, KeyValueStore, SharedProfile};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid_utils::parse_entity_id;

#[derive(Parser)]
#[command(name = "community-store", version, about = "Local community posts, comments and likes")]
struct Args {
    /// Act as this display name instead of the saved profile
    #[arg(long = "as", global = true)]
    acting_as: Option<String>,

    /// Act with moderator rights
    #[arg(long, global = true)]
    moderator: bool,

    /// Profile directory (overrides COMMUNITY_PROFILE_DIR)
    #[arg(long, global = true)]
    profile_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish a post in the active community
    Post {
        #[arg(long, default_value = "")]
        text: String,
        #[arg(long)]
        title: Option<String>,
        /// Image or video to attach (repeatable)
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },
    /// Like a post
    Like { post_id: String },
    /// Delete a post and its comments
    DeletePost { post_id: String },
    /// Comment on a post
    Comment { post_id: String, text: String },
    /// Delete one of your comments
    DeleteComment { comment_id: String },
    /// List the feed
    Feed {
        #[arg(long)]
        query: Option<String>,
        /// local or global; defaults to the saved preference
        #[arg(long)]
        scope: Option<FeedScope>,
    },
    /// Pick the active community
    SetCommunity {
        #[arg(long, default_value = "")]
        country: String,
        #[arg(long, default_value = "")]
        region: String,
        #[arg(long, default_value = "")]
        city: String,
        /// Coarse picker: community id (use with --area-id)
        #[arg(long, requires = "area_id")]
        community_id: Option<String>,
        #[arg(long, requires = "community_id")]
        area_id: Option<String>,
    },
    /// Set the display name and avatar
    SetProfile {
        display_name: String,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Show one post with its comments
    Show { post_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env().map_err(anyhow::Error::msg)?;
    init_tracing(&config.logging);

    let profile_dir = args
        .profile_dir
        .clone()
        .unwrap_or_else(|| config.storage.profile_dir.clone());
    let mut store = FileStore::open(&profile_dir)
        .with_context(|| format!("Failed to open profile at {}", profile_dir.display()))?;
    if config.storage.quota_bytes > 0 {
        store = store.with_quota(config.storage.quota_bytes);
    }
    let backend: Arc<dyn KeyValueStore> = Arc::new(store);
    let shared = SharedProfile::new(backend);

    let options = ContextOptions::from_config(&config)?;
    let ctx = CommunityContext::open(&shared, options, Identity::guest());
    ctx.set_identity(resolve_identity(&args, &ctx));

    tracing::debug!(
        env = %config.app.env,
        profile = %profile_dir.display(),
        context = %ctx.id(),
        "community-store starting"
    );

    let outcome = run(args.command, &ctx).await;
    ctx.close();
    if let Err(err) = &outcome {
        if let Some(rejected) = rejection(err) {
            // Input problems are reported plainly, without an error chain.
            eprintln!("Rejected: {}", rejected);
            std::process::exit(2);
        }
    }
    outcome
}

/// The user-input error behind `err`, if that is what failed
fn rejection(err: &anyhow::Error) -> Option<&ContentError> {
    err.downcast_ref::<ContentError>()
        .filter(|content| content.is_validation())
}

fn resolve_identity(args: &Args, ctx: &CommunityContext) -> Identity {
    let name = args
        .acting_as
        .clone()
        .unwrap_or_else(|| ctx.profile().display_name);
    if name.trim().is_empty() {
        return Identity::guest();
    }
    if args.moderator {
        Identity::moderator(name)
    } else {
        Identity::member(name)
    }
}

async fn run(command: Command, ctx: &CommunityContext) -> Result<()> {
    match command {
        Command::Post { text, title, files } => {
            let mut draft = ctx.new_draft();
            draft.set_text(text);
            draft.set_title(title);

            let mut inputs = Vec::with_capacity(files.len());
            for path in files {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                inputs.push(FileInput::guess(name, bytes));
            }
            let offered = inputs.len();
            let added = draft.add_files(inputs).await?;
            if added < offered {
                eprintln!("Only the first {} attachments were kept", added);
            }

            let post = ctx.publish(&mut draft)?;
            print_json(&post)
        }
        Command::Like { post_id } => {
            let post_id = parse_entity_id(&post_id, "post_id")?;
            match ctx.like(&post_id)? {
                Some(likes) => {
                    print_json(&serde_json::json!({ "postId": post_id, "likes": likes }))
                }
                None => anyhow::bail!("post not found: {}", post_id),
            }
        }
        Command::DeletePost { post_id } => {
            let post_id = parse_entity_id(&post_id, "post_id")?;
            let deleted = ctx.delete_post(&post_id)?;
            print_json(&serde_json::json!({ "postId": post_id, "deleted": deleted }))
        }
        Command::Comment { post_id, text } => {
            let post_id = parse_entity_id(&post_id, "post_id")?;
            let comment = ctx.comment(&post_id, &text)?;
            print_json(&comment)
        }
        Command::DeleteComment { comment_id } => {
            let comment_id = parse_entity_id(&comment_id, "comment_id")?;
            let deleted = ctx.delete_comment(&comment_id)?;
            print_json(&serde_json::json!({ "commentId": comment_id, "deleted": deleted }))
        }
        Command::Feed { query, scope } => {
            let view = ctx.feed(query.as_deref(), scope);
            print_json(&view)
        }
        Command::SetCommunity {
            country,
            region,
            city,
            community_id,
            area_id,
        } => {
            let selection = match (community_id, area_id) {
                (Some(community_id), Some(area_id)) => {
                    CommunitySelection::area(community_id, area_id)
                }
                _ => CommunitySelection::place(country, region, city),
            };
            let label = ctx.set_community(&selection)?;
            print_json(&serde_json::json!({ "communityLabel": label }))
        }
        Command::SetProfile {
            display_name,
            avatar_url,
        } => {
            let identity = ctx.identity();
            if !identity.authenticated {
                // First run: the name being saved is the identity.
                ctx.set_identity(Identity::member(display_name.clone()));
            }
            let profile = ctx.update_profile(&display_name, avatar_url)?;
            print_json(&profile)
        }
        Command::Show { post_id } => {
            let post_id = parse_entity_id(&post_id, "post_id")?;
            match ctx.content().post(&post_id) {
                Some(post) => print_json(&post),
                None => anyhow::bail!("post not found: {}", post_id),
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", out);
    Ok(())
}
