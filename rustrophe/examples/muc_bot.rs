use std::env::args;
use std::process::exit;

use rustrophe::{bot, muc, Jid, MemoryStore, Session, SessionConfig, Stanza};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = args().collect();
    if args.len() != 5 {
        println!("Usage: {} <jid> <password> <room jid> <nick>", args[0]);
        exit(1);
    }
    let jid: Jid = args[1].parse()?;
    let password = args[2].clone();
    let room: Jid = args[3].parse()?;
    let nick = args[4].clone();

    let config = SessionConfig::new(jid, password);
    let mut session = Session::connect(config).await?;
    println!("Online as {}", session.jid());

    session.send(&Stanza::new("presence")).await?;
    muc::join_room(&mut session, &room, &nick, None).await?;

    bot::install_muc(&mut session, MemoryStore::new());
    session.run().await?;

    println!("Disconnected");
    Ok(())
}
