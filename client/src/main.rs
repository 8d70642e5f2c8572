mod api;
mod handlers;

use clap::{Parser, Subcommand};
use simchain_common::{TokenType, FAUCET_ADDRESS};

use api::NodeClient;
use handlers::{
    BalanceHandler, ChainHandler, Handler, NewWalletHandler, PeersHandler, PendingHandler,
    RegisterHandler, ResolveHandler, SendHandler,
};

#[derive(Parser, Debug)]
#[command(name = "simchain-client", version, about = "Talk to a simchain node")]
struct ClientArgs {
    /// Node to talk to, as host:port or a URL
    #[arg(short, long, default_value = "127.0.0.1:5000", global = true)]
    node: String,

    /// Log level for request tracing
    #[arg(
        short,
        long,
        default_value = "warn",
        global = true,
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new wallet address
    Wallet,
    /// Submit a transaction
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value_t = TokenType::Main)]
        token: TokenType,
    },
    /// Mint tokens from the faucet
    Mint {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value_t = TokenType::Main)]
        token: TokenType,
    },
    /// Show the balances of an address
    Balance { address: String },
    /// Print the node's chain
    Chain {
        #[arg(long)]
        json: bool,
    },
    /// List pending transactions
    Pending,
    /// Register peers with the node
    Register {
        #[arg(required = true, value_delimiter = ',')]
        nodes: Vec<String>,
    },
    /// List the node's peers
    Peers,
    /// Ask the node to resolve conflicts with its peers
    Resolve,
}

impl Command {
    fn into_handler(self) -> Box<dyn Handler + Send> {
        match self {
            Command::Wallet => Box::new(NewWalletHandler),
            Command::Send {
                from,
                to,
                amount,
                token,
            } => Box::new(SendHandler::new(from, to, amount, token)),
            Command::Mint { to, amount, token } => Box::new(SendHandler::new(
                FAUCET_ADDRESS.to_string(),
                to,
                amount,
                token,
            )),
            Command::Balance { address } => Box::new(BalanceHandler::new(address)),
            Command::Chain { json } => Box::new(ChainHandler::new(json)),
            Command::Pending => Box::new(PendingHandler),
            Command::Register { nodes } => Box::new(RegisterHandler::new(nodes)),
            Command::Peers => Box::new(PeersHandler),
            Command::Resolve => Box::new(ResolveHandler),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ClientArgs::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level.parse::<tracing::Level>()?)
        .with_target(true)
        .init();

    let client = NodeClient::new(&args.node);
    let mut handler = args.command.into_handler();
    handler.handle(&client).await?;
    Ok(())
}
