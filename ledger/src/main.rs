use clap::{Parser, Subcommand};
use ledger::{
    config::{self, DatabaseConfig},
    database::{self, Account, AccountStatus},
    usage::UsageClient,
};

#[derive(Parser)]
#[command(name = "ledger", about = "Account store and usage lookups")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the account tables if they are missing
    InitDb,
    /// Store a new account
    AddAccount {
        #[arg(long)]
        email: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// List accounts with the given status
    Accounts {
        #[arg(long, default_value = "active")]
        status: String,
    },
    /// Requests left on the tracked model
    Balance {
        #[arg(long)]
        user: String,
        #[arg(long)]
        token: String,
    },
    /// Days left on the trial
    TrialDays {
        #[arg(long)]
        user: String,
        #[arg(long)]
        token: String,
    },
}

fn show(value: Option<i64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::InitDb => database::init_db(&DatabaseConfig::from_env()?).await?,
        Command::AddAccount { email, user, token, password } => {
            let mut account = Account::new(email, user, token);
            if let Some(password) = password {
                account = account.with_password(password);
            }
            database::add_account(&DatabaseConfig::from_env()?, account).await?;
        }
        Command::Accounts { status } => {
            let status: AccountStatus = status.parse()?;
            for account in database::accounts_by_status(&DatabaseConfig::from_env()?, status).await? {
                println!("{}\t{}\t{}", account.email, account.id, account.created_at.unwrap_or_default());
            }
        }
        Command::Balance { user, token } => {
            let client = UsageClient::new().with_base_url(config::usage_api_base());
            println!("{}", show(client.get_remaining_balance(&user, &token).await?));
        }
        Command::TrialDays { user, token } => {
            let client = UsageClient::new().with_base_url(config::usage_api_base());
            println!("{}", show(client.get_trial_remaining_days(&user, &token).await?));
        }
    }

    Ok(())
}
