use std::env::args;
use std::process::exit;

use rustrophe::{bot, Jid, Session, SessionConfig, Stanza};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = args().collect();
    if args.len() != 3 {
        println!("Usage: {} <jid> <password>", args[0]);
        exit(1);
    }
    let jid: Jid = args[1].parse()?;
    let password = args[2].clone();

    let config = SessionConfig::new(jid, password);
    let mut session = Session::connect(config).await?;
    println!("Online as {}", session.jid());

    // tell the server we are available
    session.send(&Stanza::new("presence")).await?;

    bot::install_echo(&mut session);
    session.run().await?;

    println!("Disconnected");
    Ok(())
}
