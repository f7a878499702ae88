use clap::Parser;
use rtsp::{Server, ServerConfig};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rtsp-server",
    about = "Standalone on-demand RTSP server: any file under --media-root is served at its matching path"
)]
struct Args {
    /// Bind address (host:port)
    #[arg(long, short, default_value = "0.0.0.0:8554")]
    bind: String,

    /// Directory scanned for on-demand streams.
    #[arg(long, default_value = ".")]
    media_root: PathBuf,

    /// Share one file source and packetizer across concurrent clients of
    /// the same stream instead of giving each client its own.
    #[arg(long)]
    reuse_first_source: bool,

    /// Public host advertised in SDP (defaults to inferring from the request).
    #[arg(long)]
    public_host: Option<String>,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = ServerConfig {
        public_host: args.public_host,
        media_root: args.media_root,
        reuse_first_source: args.reuse_first_source,
        ..Default::default()
    };

    let mut server = match Server::with_config(&args.bind, config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to construct server: {}", e);
            return;
        }
    };

    if let Err(e) = server.start() {
        eprintln!("Failed to start server: {}", e);
        return;
    }

    println!("RTSP server on {} — press Enter to stop", args.bind);
    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();

    server.stop();
}
