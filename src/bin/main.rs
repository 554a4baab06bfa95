use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vodclient_rs::images::ImageSize;

#[derive(Parser, Debug)]
#[command(name = "vodclient")]
#[command(about = "Inspect catalog payloads, resume points and posters", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "vodclient.yaml")]
    config: String,

    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a payload and print one line per record
    Show { payload: String },
    /// Store a resume point for a record
    Resume {
        payload: String,
        id: String,
        seconds: i64,
    },
    /// Fetch a poster and write it to a file
    Poster {
        payload: String,
        id: String,
        #[arg(long)]
        large: bool,
        #[arg(long, requires = "height")]
        width: Option<u32>,
        #[arg(long, requires = "width")]
        height: Option<u32>,
        #[arg(short, long, default_value = "poster.png")]
        out: String,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.debug {
        "vodclient_rs=debug,vodclient=debug"
    } else {
        "vodclient_rs=info,vodclient=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), vodclient_rs::ClientError> {
    let config = vodclient_rs::load_config(&args.config, args.debug)?;

    match args.command {
        Command::Show { payload } => {
            for line in vodclient_rs::show(&config, &payload).await? {
                println!("{}", line);
            }
        }
        Command::Resume {
            payload,
            id,
            seconds,
        } => {
            let stored = vodclient_rs::resume(&config, &payload, &id, seconds).await?;
            println!("{}: {}s", id, stored);
        }
        Command::Poster {
            payload,
            id,
            large,
            width,
            height,
            out,
        } => {
            let size = width.zip(height).map(|(w, h)| ImageSize::new(w, h));
            vodclient_rs::poster(&config, &payload, &id, large, size, &out).await?;
        }
    }

    Ok(())
}
