use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use flexi_logger::{Logger, LoggerHandle};
use log::{debug, info};
use serde::Serialize;

use dbpilot::backup::{BackupFind, BackupSettingUpsert, BackupStore};
use dbpilot::config::Config;
use dbpilot::db::Database;
use dbpilot::error::DbPilotError;
use dbpilot::webhook::{WebhookContext, WebhookMeta, WebhookRegistry};

/// Principal recorded as the updater of settings changed from the command line
const SYSTEM_BOT_ID: i64 = 1;

#[derive(Parser)]
#[command(
    name = "dbpilot",
    version,
    about = "dbpilot: versioned schema migrations, scheduled backups and webhook notifications"
)]
pub struct Cli {
    /// Configuration file (default: dbpilot.toml in the data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage automatic backup settings
    #[command(name = "backup-setting", subcommand)]
    BackupSetting(BackupSettingCommand),

    /// Inspect backups
    #[command(subcommand)]
    Backup(BackupCommand),

    /// Webhook receivers
    #[command(subcommand)]
    Webhook(WebhookCommand),
}

#[derive(Subcommand)]
pub enum BackupSettingCommand {
    /// Create or replace the backup setting of a database
    Set(SetArgs),

    /// Show the backup setting of a database
    Show {
        #[arg(long)]
        database_id: i64,
    },

    /// List enabled settings that fire at the given hour and day of week
    Match {
        #[arg(long, allow_negative_numbers = true)]
        hour: i32,

        /// 0-6, Sunday is 0
        #[arg(long, allow_negative_numbers = true)]
        day_of_week: i32,
    },
}

#[derive(Args)]
pub struct SetArgs {
    #[arg(long)]
    pub database_id: i64,

    /// 0-23, or -1 for every hour
    #[arg(long, allow_negative_numbers = true)]
    pub hour: i32,

    /// 0-6 with Sunday as 0, or -1 for every day
    #[arg(long, allow_negative_numbers = true)]
    pub day_of_week: i32,

    /// Store the setting disabled
    #[arg(long, default_value_t = false)]
    pub disabled: bool,
}

#[derive(Subcommand)]
pub enum BackupCommand {
    /// List the backups of a database
    List {
        #[arg(long)]
        database_id: i64,
    },
}

#[derive(Subcommand)]
pub enum WebhookCommand {
    /// Post a sample message through a receiver
    Test {
        /// Receiver key, e.g. bb.plugin.webhook.dingtalk
        #[arg(long)]
        receiver: String,

        /// Webhook URL of the target channel
        #[arg(long)]
        url: String,
    },

    /// List the registered receiver keys
    Receivers,
}

impl Cli {
    pub fn handle_command_line() -> Result<(), DbPilotError> {
        let args = Cli::parse();
        let config = Config::load_config(args.config.as_deref());
        let _logger = Self::start_logger(&config.logging.level)?;
        debug!("Loaded configuration: {:?}", config);

        args.command.run(&config)
    }

    fn start_logger(level: &str) -> Result<LoggerHandle, DbPilotError> {
        Logger::try_with_str(level)
            .and_then(|logger| logger.log_to_stderr().start())
            .map_err(|e| DbPilotError::Error(format!("Failed to start logger: {}", e)))
    }
}

impl Command {
    pub fn run(self, config: &Config) -> Result<(), DbPilotError> {
        match self {
            Command::BackupSetting(command) => {
                let store = open_store(Path::new(&config.store.path))?;
                command.run(&store)
            }
            Command::Backup(BackupCommand::List { database_id }) => {
                let store = open_store(Path::new(&config.store.path))?;
                let backups = store.find_backup_list(&BackupFind {
                    database_id: Some(database_id),
                    ..Default::default()
                })?;
                print_json(&backups)
            }
            Command::Webhook(command) => command.run(config),
        }
    }
}

impl BackupSettingCommand {
    fn run(self, store: &BackupStore) -> Result<(), DbPilotError> {
        match self {
            BackupSettingCommand::Set(args) => {
                let setting = store.upsert_backup_setting(&BackupSettingUpsert {
                    updater_id: SYSTEM_BOT_ID,
                    database_id: args.database_id,
                    enabled: !args.disabled,
                    hour: args.hour,
                    day_of_week: args.day_of_week,
                })?;
                print_json(&setting)
            }
            BackupSettingCommand::Show { database_id } => {
                print_json(&store.find_backup_setting(database_id)?)
            }
            BackupSettingCommand::Match { hour, day_of_week } => {
                print_json(&store.find_backup_settings_match(hour, day_of_week)?)
            }
        }
    }
}

impl WebhookCommand {
    fn run(self, config: &Config) -> Result<(), DbPilotError> {
        let registry = WebhookRegistry::with_builtin_receivers(config.webhook.timeout())?;

        match self {
            WebhookCommand::Receivers => {
                for key in registry.receiver_keys() {
                    println!("{}", key);
                }
                Ok(())
            }
            WebhookCommand::Test { receiver, url } => {
                let context = sample_context(url, &receiver, &config.webhook.external_url);

                let rt = tokio::runtime::Runtime::new()
                    .map_err(|e| DbPilotError::Error(format!("Failed to create runtime: {}", e)))?;
                rt.block_on(registry.dispatch(&receiver, &context))?;

                info!("Test webhook posted via {}", receiver);
                println!("Test webhook posted via {}", receiver);
                Ok(())
            }
        }
    }
}

fn sample_context(url: String, receiver: &str, external_url: &str) -> WebhookContext {
    WebhookContext {
        url,
        title: "Test webhook".to_string(),
        description: "This is a test message from dbpilot.".to_string(),
        link: external_url.to_string(),
        created_ts: Utc::now().timestamp(),
        creator_name: "dbpilot".to_string(),
        creator_email: "dbpilot@localhost".to_string(),
        meta_list: vec![WebhookMeta::new("Receiver", receiver)],
    }
}

fn open_store(path: &Path) -> Result<BackupStore, DbPilotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BackupStore::new(Database::open(path)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), DbPilotError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
