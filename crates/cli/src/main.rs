use clap::{Parser, Subcommand};
use lib::channels::{OutboundSender, WhatsAppClient};
use lib::config::Settings;
use lib::console::Console;
use lib::gateway::{self, GatewayState};
use lib::store::EventStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "wa-relay")]
#[command(about = "WhatsApp webhook relay with an operator console", long_about = None)]
struct Cli {
    /// Settings file path (default: WA_RELAY_CONFIG_PATH or ~/.wa-relay/settings.json)
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a settings template (never overwrites an existing file).
    Init,

    /// Run the webhook receiver in the background and the operator console in the foreground (default).
    Run {
        /// Listen port (default from PORT, settings, or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Run only the webhook receiver until Ctrl+C.
    Serve {
        /// Listen port (default from PORT, settings, or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one text message and exit.
    Send {
        /// Recipient phone number (international format, digits only)
        #[arg(long)]
        to: String,

        /// Message body
        #[arg(long)]
        text: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("wa-relay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init) => run_init(config),
        Some(Commands::Serve { port }) => run_serve(config, port).await,
        Some(Commands::Send { to, text }) => run_send(config, to, text).await,
        Some(Commands::Run { port }) => run_console(config, port).await,
        None => run_console(config, None).await,
    };
    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    if lib::init::init_settings_file(&path)? {
        println!("wrote settings template to {}", path.display());
    } else {
        println!("settings file already exists at {}", path.display());
    }
    Ok(())
}

/// Load and validate settings; any missing secret aborts before anything is served.
fn load_settings(
    config_path: Option<PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<Arc<Settings>> {
    let (config, path) = lib::config::load_config(config_path)?;
    let mut settings = Settings::resolve(&config)
        .map_err(|e| anyhow::anyhow!("{} (settings file: {})", e, path.display()))?;
    if let Some(p) = port {
        settings.port = p;
    }
    Ok(Arc::new(settings))
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let settings = load_settings(config_path, port)?;
    log::info!("starting webhook receiver on {}", settings.listen_addr());
    gateway::run_gateway(settings, Arc::new(EventStore::new())).await
}

async fn run_send(config_path: Option<PathBuf>, to: String, text: String) -> anyhow::Result<()> {
    let settings = load_settings(config_path, None)?;
    let client = WhatsAppClient::new(&settings)?;
    let receipt = client.send_text(&to, &text).await?;
    match receipt.message_id {
        Some(id) => println!("message sent to {} (id {})", receipt.recipient, id),
        None => println!("message sent to {}", receipt.recipient),
    }
    Ok(())
}

/// Receiver on the runtime, console on a blocking thread; they share only the store.
/// Returns when the operator exits; the server task is dropped with the runtime.
async fn run_console(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let settings = load_settings(config_path, port)?;
    let store = Arc::new(EventStore::new());
    let sender: Arc<dyn OutboundSender> = Arc::new(WhatsAppClient::new(&settings)?);

    let listener = gateway::bind_listener(&settings).await?;
    let state = GatewayState {
        settings: settings.clone(),
        store: store.clone(),
    };
    let server = tokio::spawn(gateway::serve(
        listener,
        state,
        std::future::pending::<()>(),
    ));
    println!(
        "🚀 Webhook receiver listening on http://{}{}",
        settings.listen_addr(),
        gateway::WEBHOOK_PATH
    );
    println!("\n--- wa-relay: WhatsApp Business console ---");

    let runtime = tokio::runtime::Handle::current();
    let test_recipient = settings.test_recipient.clone();
    let console = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let mut console = Console::new(
            store,
            sender,
            test_recipient,
            runtime,
            stdin.lock(),
            std::io::stdout(),
        );
        console.run()
    });

    tokio::select! {
        res = console => res??,
        res = server => {
            res??;
            anyhow::bail!("webhook server stopped unexpectedly");
        }
    }
    Ok(())
}
