use chord_core::dht::Did;
use chord_node::client::Client;
use chord_node::config::Bootstrap;
use chord_node::config::Config;
use chord_node::config::DEFAULT_CONFIG_PATH;
use chord_node::logging::init_logging;
use chord_node::logging::LogLevel;
use chord_node::processor::Processor;
use chord_node::util::build_version;
use chord_node::util::expand_home;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value_t = LogLevel::Info, value_enum, env)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    #[command(about = "Writes a default configuration file.")]
    Init(InitCommand),
    #[command(about = "Starts a long-running node daemon.")]
    Run(RunCommand),
    #[command(about = "Shows the identity of a running node.")]
    Info(ClientArgs),
    #[command(about = "Asks a running node to start a new ring.")]
    Create(ClientArgs),
    #[command(about = "Asks a running node to join the ring of another node.")]
    Join(JoinCommand),
    #[command(about = "Resolves the node owning an identifier.")]
    Lookup(LookupCommand),
    #[command(about = "Shows successor, predecessor and finger table of a running node.")]
    Inspect(ClientArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(
        long,
        short = 'c',
        env,
        default_value = DEFAULT_CONFIG_PATH,
        help = "Config file location"
    )]
    pub config: String,
}

impl ConfigArgs {
    /// Config from file, or the defaults when the file does not exist.
    fn load(&self) -> anyhow::Result<Config> {
        let path = expand_home(&self.config)?;
        if path.exists() {
            Ok(Config::read_fs(path)?)
        } else {
            tracing::debug!("config {:?} not found, use defaults", path);
            Ok(Config::default())
        }
    }
}

#[derive(Args, Debug)]
struct InitCommand {
    #[arg(
        long,
        default_value = DEFAULT_CONFIG_PATH,
        help = "The location of config file"
    )]
    pub location: String,

    #[arg(long, help = "Identifier of the node", default_value_t = 0)]
    pub did: u64,
}

#[derive(Args, Debug)]
struct RunCommand {
    #[arg(
        long,
        short = 'b',
        help = "Listen address. If not provided, use bind_addr in config file or 127.0.0.1:50000",
        env
    )]
    pub bind: Option<String>,

    #[arg(
        long,
        help = "Host other nodes use to reach this node. If not provided, use the host of the listen address",
        env
    )]
    pub host: Option<String>,

    #[arg(long, help = "Identifier of the node. If not provided, use did in config file", env)]
    pub did: Option<u64>,

    #[arg(long, help = "Start a new ring", conflicts_with = "join")]
    pub create: bool,

    #[arg(long, help = "Join the ring of the node listening at this address")]
    pub join: Option<String>,

    #[command(flatten)]
    config_args: ConfigArgs,
}

#[derive(Args, Debug)]
struct ClientArgs {
    #[arg(
        long,
        short = 'e',
        help = "Address of the node. If not provided, use bind_addr in config file",
        env = "CHORD_ENDPOINT"
    )]
    pub endpoint: Option<String>,

    #[command(flatten)]
    config_args: ConfigArgs,
}

impl ClientArgs {
    fn new_client(&self) -> anyhow::Result<Client> {
        let c = self.config_args.load()?;
        let endpoint = self.endpoint.clone().unwrap_or_else(|| c.bind_addr.clone());
        Ok(Client::new(&endpoint, c.params()?, c.rpc_timeout()))
    }
}

#[derive(Args, Debug)]
struct JoinCommand {
    #[arg(long, short = 'i', help = "Address of a node already in the ring")]
    pub introducer: String,

    #[command(flatten)]
    client_args: ClientArgs,
}

#[derive(Args, Debug)]
struct LookupCommand {
    #[arg(help = "Identifier to resolve")]
    pub did: u64,

    #[command(flatten)]
    client_args: ClientArgs,
}

async fn daemon_run(args: RunCommand) -> anyhow::Result<()> {
    let mut c = args.config_args.load()?;
    if let Some(bind) = args.bind {
        c.bind_addr = bind;
    }
    if args.host.is_some() {
        c.host = args.host;
    }
    if let Some(did) = args.did {
        c.did = did;
    }
    if args.create {
        c.bootstrap = Some(Bootstrap::Create);
    }
    if let Some(introducer) = args.join {
        c.bootstrap = Some(Bootstrap::Join(introducer));
    }

    tracing::info!("chord {}", build_version());
    let processor = Processor::bind(&c).await?;
    println!("Node: {}", processor.swarm().node());
    processor.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Command::Init(args) => {
            let config = Config {
                did: args.did,
                ..Default::default()
            };
            config.validate()?;
            let p = config.write_fs(args.location.as_str())?;
            println!("Your config file has saved to: {}", p);
            Ok(())
        }
        Command::Run(args) => daemon_run(args).await,
        Command::Info(args) => {
            println!("{}", args.new_client()?.get_info().await?);
            Ok(())
        }
        Command::Create(args) => {
            args.new_client()?.create().await?;
            println!("Done.");
            Ok(())
        }
        Command::Join(args) => {
            args.client_args
                .new_client()?
                .join(args.introducer.as_str())
                .await?;
            println!("Done.");
            Ok(())
        }
        Command::Lookup(args) => {
            let owner = args
                .client_args
                .new_client()?
                .find_successor(Did::from(args.did))
                .await?;
            println!("{}", owner);
            Ok(())
        }
        Command::Inspect(args) => {
            let info = args.new_client()?.inspect().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
    }
}
