use clap::Parser;
use client::bot::Bot;
use client::network::GameClient;
use log::{info, warn};
use rand::Rng;
use shared::WireCommand;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Character id to play as (random if omitted)
    #[arg(short = 'i', long)]
    id: Option<String>,

    /// Number of snapshots to act on before disconnecting
    #[arg(short = 'n', long, default_value = "100")]
    steps: u32,

    /// Seed for the bot's random walk
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let id = args
        .id
        .unwrap_or_else(|| format!("bot-{:04}", rand::thread_rng().gen_range(0..10_000)));

    info!("Connecting to {} as {}", args.server, id);
    let mut client = GameClient::connect(&args.server).await?;
    let mut bot = Bot::new(id, args.seed);

    client.send(&WireCommand::spawn(bot.id())).await?;

    for step in 0..args.steps {
        let snapshot = client.next_snapshot().await?;
        if let Some(me) = snapshot.get(bot.id()) {
            info!(
                "step {}: {} {:?} hp {:.0} at ({:.1}, {:.1}), {} in arena",
                step,
                me.class.as_str(),
                me.state,
                me.health,
                me.x,
                me.y,
                snapshot.len()
            );
        }

        match bot.next_command(&snapshot) {
            Some(command) => client.send(&command).await?,
            None => warn!("{} is dying, waiting for respawn", bot.id()),
        }
    }

    client.send(&WireCommand::disconnect(bot.id())).await?;
    client.close().await?;
    info!("Done");

    Ok(())
}
