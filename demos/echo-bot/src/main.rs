use std::sync::Arc;

use cinder::prelude::*;

// ---------------------------------------------------------------------------
// Echo logic
// ---------------------------------------------------------------------------

/// What to send back for an event, if anything.
///
/// One-to-one chat lines are echoed to their sender; typing notices, room
/// chatter and everything else are ignored.
fn echo_reply(event: &Event) -> Option<(SteamId, String)> {
    match event {
        Event::ChatMessage {
            chat_room: None,
            sender,
            message,
            entry_type: ChatEntryType::ChatMsg,
        } if !message.is_empty() => Some((*sender, format!("echo: {message}"))),
        _ => None,
    }
}

async fn echo_events(client: Arc<Client>) {
    let mut events = client.subscribe();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "event stream lagged");
                continue;
            }
            Err(_) => return,
        };

        match &event {
            Event::LoggedOn(details) => {
                tracing::info!(steam_id = %details.steam_id, "logged on");
                client.social().set_persona_state(PersonaState::Online);
            }
            Event::LogOnFailed { result } => {
                tracing::error!(%result, "logon failed; set CINDER_GUARD_CODE if a code was requested");
            }
            Event::FriendsListLoaded => {
                tracing::info!(friends = client.social().friends().len(), "friends list loaded");
            }
            Event::Disconnected => return,
            _ => {}
        }

        if let Some((to, text)) = echo_reply(&event) {
            if let Err(e) = client.social().send_message(to, ChatEntryType::ChatMsg, &text) {
                tracing::warn!(%to, error = %e, "reply failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info,cinder=debug");

    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::from_json_file(path)?,
        None => ClientConfig::default(),
    };
    let username = std::env::var("CINDER_USER")?;
    let password = std::env::var("CINDER_PASS")?;
    let mut details = LogOnDetails::new(username, password);
    if let Ok(code) = std::env::var("CINDER_GUARD_CODE") {
        details = details.with_auth_code(code);
    }

    tracing::info!(url = %config.server_url, "connecting");
    let conn = WebSocketConnection::connect(&config.server_url).await?;
    let client = Arc::new(Client::builder().config(config).build());

    let echo = tokio::spawn(echo_events(Arc::clone(&client)));
    client.log_on(&details)?;
    let result = client.run(conn).await;
    let _ = echo.await;

    result?;
    Ok(())
}
