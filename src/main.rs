//! Chat Sync Client
//!
//! Terminal renderer: reads commands from stdin, drives the
//! synchronization controller, and prints a snapshot after every step.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use chat_sync_client::{
    ConversationId, HttpBackend, JsonFileStore, KeyValueStore, MemoryStore, Role, SessionStore,
    Snapshot, SyncController, View, config::ClientConfig,
};
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
commands:
  login <email> <password>          sign in
  register <email> <password> <confirm>
  forgot <email>                    request a password reset link
  reset <token> <password> <confirm>
  logout                            sign out and clear stored state
  list                              refresh conversations
  new                               start a new conversation
  open <id>                         switch to a conversation
  delete <id>                       delete a conversation
  theme                             toggle light/dark
  help                              show this text
  quit                              exit
anything else is sent as a message";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with the rendered view.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Load .env (if present)
    let _ = dotenv();

    let config = ClientConfig::load().context("failed to load configuration")?;
    info!(
        name: "client.config.loaded",
        base_url = %config.api.base_url,
        state_file = %config.storage.path.display(),
        ephemeral = config.storage.ephemeral,
        "Configuration loaded"
    );

    let backend = Arc::new(HttpBackend::from_config(&config.api).context("invalid API base URL")?);
    let storage: Arc<dyn KeyValueStore> = if config.storage.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(JsonFileStore::open(&config.storage.path))
    };
    let controller = SyncController::new(SessionStore::new(backend, storage));

    if controller.session().is_authenticated() {
        controller.refresh_conversations().await;
    }
    render(&controller.snapshot());
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        dispatch(&controller, line).await;
        controller.settle().await;
        render(&controller.snapshot());
    }

    Ok(())
}

/// Run one command. Failures land in the controller's error slot.
async fn dispatch(controller: &SyncController, line: &str) {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match (command, args.as_slice()) {
        ("help", []) => println!("{HELP}"),
        ("login", [email, password]) => {
            let _ = controller.login(email, password).await;
        }
        ("register", [email, password, confirm]) => {
            if controller.register(email, password, confirm).await.is_ok() {
                println!("registered; you can now log in");
            }
        }
        ("forgot", [email]) => {
            if let Ok(message) = controller.forgot_password(email).await {
                println!("{message}");
            }
        }
        ("reset", [token, password, confirm]) => {
            if let Ok(message) = controller.reset_password(token, password, confirm).await {
                println!("{message}");
            }
        }
        ("logout", []) => controller.logout(),
        ("list", []) => {
            controller.refresh_conversations().await;
        }
        ("new", []) => {
            let _ = controller.new_conversation().await;
        }
        ("open", [id]) => {
            let _ = controller
                .select_conversation(&ConversationId::new(*id))
                .await;
        }
        ("delete", [id]) => {
            let _ = controller
                .delete_conversation(&ConversationId::new(*id))
                .await;
        }
        ("theme", []) => {
            controller.toggle_theme();
        }
        _ => {
            let _ = controller.send_message(line).await;
        }
    }
}

fn render(snapshot: &Snapshot) {
    println!();
    match snapshot.view {
        View::SignIn => println!("== signed out (theme: {}) ==", snapshot.theme.as_str()),
        View::Chat => {
            println!(
                "== {} | {} (theme: {}) ==",
                snapshot.heading(),
                snapshot.identity.as_deref().unwrap_or_default(),
                snapshot.theme.as_str()
            );
            if snapshot.conversations.is_empty() {
                println!("  (no conversations)");
            }
            for conversation in &snapshot.conversations {
                let marker = if snapshot.active.as_ref() == Some(&conversation.id) {
                    '*'
                } else {
                    ' '
                };
                println!(" {marker} [{}] {}", conversation.id, conversation.title);
            }
            println!("--");
            for message in &snapshot.messages {
                let who = match message.role {
                    Role::User => "you",
                    Role::Assistant => "ai",
                    Role::Other => "--",
                };
                let status = if message.is_pending() { " …" } else { "" };
                println!("{who}: {}{status}", message.content);
            }
            if snapshot.sending {
                println!("ai: …");
            }
        }
    }
    if let Some(error) = &snapshot.error {
        println!("! {error}");
    }
}
