use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use forgebot::agent::tools::filesystem::{
    DescribeWorkspaceTool, ListFilesTool, ReadFileTool, WriteFileTool,
};
use forgebot::agent::tools::shell::RunShellTool;
use forgebot::agent::tools::ToolRegistry;
use forgebot::agent::{ConversationController, Session, Workspace};
use forgebot::config::loader::load_config;
use forgebot::config::schema::Config;
use forgebot::providers::base::LLMProvider;
use forgebot::providers::openai_compat::OpenAiCompatProvider;

#[derive(Parser)]
#[command(name = "forgebot", version, about = "Tool-calling agent for sandboxed coding tasks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task in its own workspace and print the final answer.
    Run {
        /// Task description handed to the model.
        #[arg(long)]
        task: String,
        /// Workspace name; derived from the task text when omitted.
        #[arg(long)]
        name: Option<String>,
        /// Path to a JSON config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the directory tree of an existing task workspace.
    Describe {
        /// Workspace name under the configured workspace root.
        #[arg(long)]
        name: String,
        /// Path to a JSON config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { task, name, config } => run_command(task, name, config).await,
        Commands::Describe { name, config } => describe_command(name, config),
    }
}

async fn run_command(
    task: String,
    name: Option<String>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(config_path.as_deref());
    let slug = name.unwrap_or_else(|| slugify(&task));

    let workspace = Arc::new(Workspace::new(config.workspace_root.join(&slug))?);
    info!(
        workspace = %workspace.root().display(),
        model = %config.model,
        "starting task"
    );

    let provider: Arc<dyn LLMProvider> = Arc::new(OpenAiCompatProvider::new(
        &config.base_url,
        &config.api_key,
        &config.model,
    ));
    let registry = Arc::new(build_registry(&workspace, &config)?);

    let mut controller = ConversationController::new(provider, registry, &config);
    let mut session = Session::new(workspace);
    let outcome = controller.run_task(&mut session, &task).await?;

    info!(
        state = ?outcome.state,
        iterations = outcome.iterations_used,
        "task finished"
    );
    println!("{}", outcome.text);
    Ok(())
}

fn describe_command(name: String, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path.as_deref());
    let root = config.workspace_root.join(&name);
    if !root.is_dir() {
        anyhow::bail!(
            "no workspace named '{}' under {}",
            name,
            config.workspace_root.display()
        );
    }
    let workspace = Workspace::new(&root)?;
    println!("{}", workspace.describe(200)?);
    Ok(())
}

fn build_registry(workspace: &Arc<Workspace>, config: &Config) -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(WriteFileTool::new(workspace.clone())))?;
    registry.register(Box::new(ReadFileTool::new(workspace.clone())))?;
    registry.register(Box::new(ListFilesTool::new(workspace.clone())))?;
    registry.register(Box::new(DescribeWorkspaceTool::new(workspace.clone())))?;
    registry.register(Box::new(RunShellTool::new(
        workspace.clone(),
        config.shell_timeout_sec,
    )))?;
    Ok(registry)
}

/// Filesystem-safe workspace name derived from the task text.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if slug.len() >= 40 {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "task".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Build a TODO app!"), "build-a-todo-app");
        assert_eq!(slugify("  ??? "), "task");
        assert!(slugify(&"x".repeat(100)).len() <= 40);
    }
}
