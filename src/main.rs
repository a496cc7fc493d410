//! Embed Chat - terminal front end
//!
//! Renders a chat session on stdout and reads user input from stdin.
//! `/N` picks suggestion N, `/retry` re-sends the last failed message and
//! `/quit` exits.

use embed_chat::{ChatConfig, ChatEvent, ChatSession, MessageContent, MessageOrigin, Segment};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "embed_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ChatConfig::from_env();
    if !config.is_complete() {
        tracing::error!("EMBED_CHAT_EXPERIENCE and EMBED_CHAT_ASSISTANT must be set");
        return Err("missing experience or assistant configuration".into());
    }

    tracing::info!(
        base_url = %config.base_url,
        experience_id = %config.experience_id,
        assistant = %config.assistant_name,
        "Starting chat session"
    );

    let session = ChatSession::spawn(&config)?;
    let events = session.subscribe();
    let render = tokio::spawn(render_events(events));

    session.initialize().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "/quit" => break,
            "/retry" => session.retry().await?,
            _ => {
                if let Some(index) = input.strip_prefix('/').and_then(|n| n.parse::<usize>().ok()) {
                    let snapshot = session.snapshot().await?;
                    match index.checked_sub(1).and_then(|i| snapshot.suggestions.get(i)) {
                        Some(suggestion) => session.select_suggestion(suggestion.clone()).await?,
                        None => println!("(no suggestion {index})"),
                    }
                } else {
                    session.send(input).await?;
                }
            }
        }
    }

    drop(session);
    render.abort();
    Ok(())
}

async fn render_events(mut events: broadcast::Receiver<ChatEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => render(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn render(event: &ChatEvent) {
    match event {
        ChatEvent::AssistantReady { name, video_url } => {
            println!("== {name} ==  (video: {video_url})");
        }
        ChatEvent::TypingIndicator { on: true, label } => println!("... {label}"),
        ChatEvent::TypingIndicator { on: false, .. } | ChatEvent::StateChanged { .. } => {}
        ChatEvent::MessageAppended { entry } => {
            let speaker = match entry.origin {
                MessageOrigin::User => "you",
                MessageOrigin::Assistant => "assistant",
            };
            println!("{speaker}> {}", render_content(&entry.content));
        }
        ChatEvent::SuggestionsReplaced { suggestions } => {
            for (i, suggestion) in suggestions.iter().enumerate() {
                println!("  /{} {suggestion}", i + 1);
            }
        }
        ChatEvent::ExchangeFailed {
            message,
            retry_available,
            ..
        } => {
            if *retry_available {
                println!("!! {message} (type /retry)");
            } else {
                println!("!! {message}");
            }
        }
    }
}

fn render_content(content: &MessageContent) -> String {
    match content {
        MessageContent::Plain(text) => text.clone(),
        MessageContent::Segments(segments) => segments
            .iter()
            .map(|segment| match segment {
                Segment::PlainText(text) => text.clone(),
                Segment::Link(url) => format!("{} ({url})", segment.label()),
            })
            .collect(),
    }
}
