use clap::Parser;
use client::config::{
    ClientConfig, DEFAULT_HEIGHT, DEFAULT_PLAYER_NAME, DEFAULT_SERVER_ADDR, DEFAULT_WIDTH,
    TARGET_FPS,
};
use client::network::Client;
use log::{error, info};
use macroquad::window::Conf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Player name shown to the other players
    #[arg(default_value = DEFAULT_PLAYER_NAME)]
    name: String,

    /// Server address to connect to
    #[arg(short = 's', long, default_value = DEFAULT_SERVER_ADDR)]
    server: String,

    /// Window width
    #[arg(short = 'w', long, default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Frames per second of the input/render loop
    #[arg(long, default_value_t = TARGET_FPS)]
    fps: u32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: format!("Client - {}", args.name),
        window_width: args.width as i32,
        window_height: args.height as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = ClientConfig::new(&args.name, &args.server)
        .with_window(args.width, args.height)
        .with_fps(args.fps);

    info!("Starting client as {}", config.player_name);
    info!("Connecting to: {}", config.server_addr);
    info!("Controls: arrows to move, E/F to request an enemy/fruit");

    let client = match Client::connect(config) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    client.run().await;
    info!("Client closed");
}
