use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use carepoint_core::config::Config;
use carepoint_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use carepoint_core::navigation::{self, admin_sidebar, public_links, resolve};
use carepoint_core::notification::NotificationInbox;
use carepoint_core::provider::InMemoryIdentityProvider;
use carepoint_core::{compose, Metadata, NavAction, Route, SessionState, SessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const DEMO_ADMIN_EMAIL: &str = "chief@carepoint.local";
const DEMO_ADMIN_PASSWORD: &str = "clinic-admin";
const DEMO_PASSWORD: &str = "secret1";

#[derive(Parser, Debug)]
#[command(name = "carepoint")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error); overrides the config
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging; overrides the config
    #[arg(long)]
    json_logs: bool,

    /// Configuration file (TOML); environment overrides still apply
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the portal route table
    Routes,

    /// Show navigation for a session kind
    Nav {
        /// Simulate a signed-in member
        #[arg(long)]
        signed_in: bool,

        /// Simulate a signed-in administrator (implies --signed-in)
        #[arg(long)]
        admin: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check which route a path resolves to for each session kind
    Guard {
        /// Request path, e.g. /admin/staff
        path: String,
    },

    /// Run a registration, promotion and sign-out walkthrough in memory
    Demo {
        /// Email for the registering user
        #[arg(long, default_value = "a@b.com")]
        email: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Logging comes from the `[logging]` section (and `CAREPOINT_LOG_*`);
/// command-line flags win when given.
fn log_config(args: &Args, config: &Config) -> Result<LogConfig> {
    let mut logging = LogConfig::try_from(&config.logging)?;

    if let Some(raw) = &args.log_level {
        match LogLevel::parse(raw) {
            Some(level) => logging.level = level,
            None => eprintln!("Invalid log level '{}', using '{}'", raw, logging.level),
        }
    }
    if args.json_logs {
        logging = logging.json_format(true);
    }
    Ok(logging)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    init_logging_with_config(log_config(&args, &config)?)?;
    carepoint_core::metrics::init_metrics();

    match args.command {
        Some(Command::Routes) => print_routes(),
        Some(Command::Nav { signed_in, admin, json }) => {
            let state = simulated_state(&config, signed_in || admin, admin).await?;
            print_nav(&state, json)?;
        }
        Some(Command::Guard { path }) => print_guard(&config, &path).await?,
        Some(Command::Demo { email }) => run_demo(&config, &email).await?,
        Some(Command::Config) => print!("{}", config.to_toml()?),
        None => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}

fn print_routes() {
    for route in Route::ALL {
        let access = if route.is_admin_only() {
            "admin"
        } else if route.is_guest_only() {
            "guest"
        } else {
            "public"
        };
        println!("{:<22} {:<18} {}", route.path(), format!("{:?}", route), access);
    }
}

/// Drive a real store through the in-memory provider to the requested state.
async fn simulated_state(config: &Config, signed_in: bool, admin: bool) -> Result<SessionState> {
    let provider = Arc::new(InMemoryIdentityProvider::new(&config.provider));
    let store = SessionStore::new(provider.clone(), config);
    store.initialize().await;

    if signed_in {
        let email = if admin { "admin@carepoint.local" } else { "member@carepoint.local" };
        let metadata = if admin {
            Metadata::new().with("isAdmin", true)
        } else {
            Metadata::new()
        };
        provider.seed_account(email, DEMO_PASSWORD, metadata)?;
        store.sign_in(email, DEMO_PASSWORD).await?;
    }

    let state = store.state();
    store.shutdown();
    Ok(state)
}

fn print_nav(state: &SessionState, json: bool) -> Result<()> {
    let actions = compose(state);
    let sidebar = admin_sidebar(state);
    let links = public_links();

    if json {
        let out = serde_json::json!({
            "role": state.role().to_string(),
            "links": links,
            "actions": actions,
            "adminSidebar": sidebar,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Role: {}", state.role());
    println!("Links:");
    for link in &links {
        println!("  {:<14} {}", link.title, link.route);
    }
    println!("Actions:");
    for action in &actions {
        println!("  {:<16} {}", action.label(), action.destination());
    }
    if !sidebar.is_empty() {
        println!("Admin sidebar:");
        for link in &sidebar {
            println!("  {:<14} {}", link.title, link.route);
        }
    }
    Ok(())
}

async fn print_guard(config: &Config, path: &str) -> Result<()> {
    let route = Route::parse(path);
    println!("{} -> {:?}", path, route);

    let cases = [
        ("loading", SessionState::Loading),
        ("signed out", SessionState::SignedOut),
        ("member", simulated_state(config, true, false).await?),
        ("admin", simulated_state(config, true, true).await?),
    ];
    for (label, state) in cases.iter() {
        let (target, decision) = resolve(route, state);
        println!("  {:<11} {:?} at {}", label, decision, target);
    }
    Ok(())
}

async fn run_demo(config: &Config, email: &str) -> Result<()> {
    let provider = Arc::new(InMemoryIdentityProvider::new(&config.provider));
    let inbox = Arc::new(NotificationInbox::new(provider.clone()));
    let admin = provider.seed_account(
        DEMO_ADMIN_EMAIL,
        DEMO_ADMIN_PASSWORD,
        Metadata::new().with("isAdmin", true).with("firstName", "Chief"),
    )?;

    let store = SessionStore::new(provider.clone(), config).with_notifier(inbox.clone());
    let mut toasts = store.toaster().subscribe();
    let toast_printer = tokio::spawn(async move {
        while let Ok(toast) = toasts.recv().await {
            println!("[toast] {}: {}", toast.title, toast.description);
        }
    });

    store.initialize().await;
    println!("Initial state: {:?}", compose(&store.state()));

    let member = store
        .sign_up(email, DEMO_PASSWORD, Metadata::new().with("firstName", "A"))
        .await?;
    println!("Registered {} ({})", member.email, member.id);
    println!("Navigation: {:?}", compose(&store.state()));
    navigation::activate(NavAction::SignOut, &store).await;

    store.sign_in(DEMO_ADMIN_EMAIL, DEMO_ADMIN_PASSWORD).await?;
    println!("Admin {} navigation: {:?}", admin.email, compose(&store.state()));

    // The notifier runs on its own task; give it a moment to land.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    for record in inbox.list().await {
        println!("[inbox] {} {} (read: {})", record.kind, record.message, record.is_read);
    }
    inbox.mark_all_read().await;

    for user in store.list_users().await? {
        println!("[user] {:<28} {:<18} admin={}", user.email, user.full_name, user.is_admin);
    }
    store.set_admin_status(&member.id, true).await?;

    let landing = navigation::activate(NavAction::SignOut, &store).await;
    println!("Signed out, landing on {}", landing);

    store.sign_in(email, DEMO_PASSWORD).await?;
    println!("{} navigation: {:?}", email, compose(&store.state()));
    if !store.is_admin() {
        warn!("promotion did not take effect");
    }

    store.shutdown();
    drop(store);
    toast_printer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nav_flags() {
        let args = Args::try_parse_from(["carepoint", "nav", "--admin", "--json"]).unwrap();
        assert_eq!(
            args.command,
            Some(Command::Nav {
                signed_in: false,
                admin: true,
                json: true
            })
        );
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn test_parse_guard_requires_path() {
        assert!(Args::try_parse_from(["carepoint", "guard"]).is_err());
        let args = Args::try_parse_from(["carepoint", "-l", "debug", "guard", "/admin"]).unwrap();
        assert_eq!(args.command, Some(Command::Guard { path: "/admin".into() }));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.auth.min_password_len, 6);
    }

    #[test]
    fn test_log_level_from_config_unless_flag_given() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| (key == "CAREPOINT_LOG_LEVEL").then(|| "debug".to_string()))
            .unwrap();

        let args = Args::try_parse_from(["carepoint", "routes"]).unwrap();
        let logging = log_config(&args, &config).unwrap();
        assert_eq!(logging.level, LogLevel::Debug);
        assert!(!logging.json_format);

        let args = Args::try_parse_from(["carepoint", "-l", "warn", "--json-logs", "routes"]).unwrap();
        let logging = log_config(&args, &config).unwrap();
        assert_eq!(logging.level, LogLevel::Warn);
        assert!(logging.json_format);

        let args = Args::try_parse_from(["carepoint", "-l", "loud", "routes"]).unwrap();
        assert_eq!(log_config(&args, &config).unwrap().level, LogLevel::Debug);
    }

    #[tokio::test]
    async fn test_simulated_admin_state() {
        let config = Config::default();
        let state = simulated_state(&config, true, true).await.unwrap();
        assert!(state.is_admin());
        assert!(compose(&state).contains(&NavAction::AdminDashboard));
    }
}
