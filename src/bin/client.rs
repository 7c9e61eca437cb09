//! Terminal chat client: `client <room> [pseudo]`. Lines become messages,
//! `/photo <data-url>` sends an already-encoded photo, `/quit` exits.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use chat_relay::client::{ChatSocket, RoomClient, RoomsClient};
use chat_relay::models::{Category, ChatMessage, Kind};
use chat_relay::proto::ServerEvent;
use chat_relay::store::PwaStore;

fn print_msg(msg: &ChatMessage) {
    match (msg.category, msg.kind) {
        (Category::Info, _) => println!("-- {}", msg.content),
        (_, Kind::Photo)    => println!("<{}> [photo, {} chars]", msg.pseudo, msg.content.len()),
        _                   => println!("<{}> {}", msg.pseudo, msg.content),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().init();

    let mut args = std::env::args().skip(1);
    let room = args.next().unwrap_or_else(|| "lobby".into());

    let ws_url    = std::env::var("RELAY_URL").unwrap_or_else(|_| "ws://127.0.0.1:3001/ws/chat".into());
    let http_base = std::env::var("RELAY_HTTP").unwrap_or_else(|_| "http://127.0.0.1:3001".into());
    let cache_dir = std::env::var("PWA_CACHE_DIR").unwrap_or_else(|_| ".pwa-cache".into());

    let store = Arc::new(PwaStore::open(cache_dir));
    let pseudo = match args.next() {
        Some(p) => {
            store.save_user(&p, None);
            p
        }
        None => store.user().map(|u| u.pseudo).unwrap_or_else(|| "anon".into()),
    };

    let api = RoomsClient::new(&http_base);
    if let Err(e) = api.ensure_room(&room).await {
        eprintln!("ensure-room failed: {e}");
    }

    let (socket, mut events) = ChatSocket::connect(&ws_url).await?;
    let mut client = RoomClient::new(&room, &pseudo, store.clone());

    // offline view first, then join
    for msg in client.messages() {
        print_msg(msg);
    }
    client.try_join(&socket);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            ev = events.recv() => {
                let Some(ev) = ev else {
                    eprintln!("connection lost");
                    break;
                };
                match &ev {
                    ServerEvent::Joined { room_id, .. } if *room_id == room => {
                        client.handle_event(&ev);
                        println!("-- joined {room} ({} messages cached)", client.messages().len());
                    }
                    ServerEvent::MessageNew(rm) | ServerEvent::PhotoNew(rm) if rm.room_id == room => {
                        client.handle_event(&ev);
                        print_msg(&rm.msg);
                    }
                    _ => client.handle_event(&ev),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line == "/quit" {
                    break;
                }
                if let Some(data_url) = line.strip_prefix("/photo ") {
                    store.add_photo(Some(room.clone()), data_url);
                    client.send_photo(&socket, data_url);
                } else if !line.is_empty() {
                    client.send_message(&socket, line);
                }
            }
        }
    }
    Ok(())
}
