//! A terminal client for the Luau scripting assistant.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use luau_forge::attachment::load_image;
use luau_forge::core::markup::{ParsedMessage, ScriptDescriptor, Segment};
use luau_forge::core::{SessionError, SessionEvent, Stage};
use luau_forge::plugin::connector_script;
use luau_forge::relay::{RelayClient, RelayStatus};
use luau_forge::{
    AppConfig, ConfigError, GREETING, SessionBuilder, UserIdStore,
};
use luau_forge_gemini_model::GeminiProvider;
use luau_forge_model::InlineImage;
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

const HELP: &str = "\
Commands:
  /continue      resume a reply that was cut off
  /suggest N     send suggestion N
  /view N        print script N of the last reply
  /send N        send script N to Roblox Studio
  /attach PATH   attach an image to the next message
  /connect       print the Studio connector script
  /help          show this help
  /quit          exit";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Message(&'a str),
    Continue,
    Suggest(usize),
    View(usize),
    Send(usize),
    Attach(&'a str),
    Connect,
    Help,
    Quit,
    Invalid(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Command::Message(line);
        };
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(name, arg)| (name, arg.trim()))
            .unwrap_or((command, ""));
        let index = |wrap: fn(usize) -> Self| {
            match arg.parse::<usize>() {
                Ok(n) if n > 0 => wrap(n),
                _ => Command::Invalid(line),
            }
        };
        match (name, arg) {
            ("continue", "") => Command::Continue,
            ("connect", "") => Command::Connect,
            ("help", "") => Command::Help,
            ("quit" | "exit", "") => Command::Quit,
            ("attach", path) if !path.is_empty() => Command::Attach(path),
            ("suggest", _) => index(Command::Suggest),
            ("view", _) => index(Command::View),
            ("send", _) => index(Command::Send),
            _ => Command::Invalid(line),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingApiKey) => {
            eprintln!("{}", "API Key Not Found".bright_red().bold());
            eprintln!(
                "Please make sure your Gemini API key is set in the \
                 GEMINI_API_KEY environment variable."
            );
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let user_id = match UserIdStore::new(&config.data_dir).load_or_create() {
        Ok(user_id) => user_id,
        Err(err) => {
            eprintln!("cannot load the user id: {err}");
            return;
        }
    };
    let topic = user_id.topic();
    let relay = RelayClient::new(&config.relay_url, &topic);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session =
        SessionBuilder::with_model_provider(GeminiProvider::new(config.gemini))
            .on_event(move |event| {
                event_tx.send(event).ok();
            })
            .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    print_prose(GREETING);
    println!("{}", "Type /help for commands.".dimmed());

    let mut scripts: Vec<ScriptDescriptor> = Vec::new();
    let mut suggestions: Vec<String> = Vec::new();
    let mut attachment: Option<InlineImage> = None;

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };

        let sent = match Command::parse(&line) {
            Command::Message("") => continue,
            Command::Message(text) => {
                session.send_message(text, attachment.take()).await
            }
            Command::Continue => session.continue_generation().await,
            Command::Suggest(n) => match suggestions.get(n - 1) {
                Some(suggestion) => session.send_suggestion(suggestion).await,
                None => {
                    eprintln!("there is no suggestion {n}");
                    continue;
                }
            },
            Command::View(n) => {
                match scripts.get(n - 1) {
                    Some(script) => print_script(script),
                    None => eprintln!("there is no script {n}"),
                }
                continue;
            }
            Command::Send(n) => {
                match scripts.get(n - 1) {
                    Some(script) => publish(&relay, script).await,
                    None => eprintln!("there is no script {n}"),
                }
                continue;
            }
            Command::Attach(path) => {
                match load_image(path) {
                    Ok(image) => {
                        println!("📎 {path} goes out with your next message");
                        attachment = Some(image);
                    }
                    Err(err) => eprintln!("{err}"),
                }
                continue;
            }
            Command::Connect => {
                println!("{}", connector_script(&config.relay_url, &topic));
                continue;
            }
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Quit => break,
            Command::Invalid(line) => {
                eprintln!("unknown command {line:?}, try /help");
                continue;
            }
        };

        match sent {
            Ok(()) => {}
            Err(SessionError::Closed) => break,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        }

        let Some((parsed, stage)) =
            follow_reply(&mut event_rx, &progress_style).await
        else {
            break;
        };
        scripts = render_reply(&parsed);

        suggestions = match session.snapshot().await {
            Ok(snapshot) => snapshot.suggestions,
            Err(_) => break,
        };
        for (idx, suggestion) in suggestions.iter().enumerate() {
            let label = format!("[{}]", idx + 1);
            println!("  {} {suggestion}", label.bright_magenta());
        }
        if stage == Stage::Continuable {
            println!(
                "{}",
                "The reply was cut off, /continue to resume it.".yellow()
            );
        }
    }
}

/// Shows a spinner with the elapsed time until the active stream ends.
async fn follow_reply(
    event_rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
    progress_style: &ProgressStyle,
) -> Option<(ParsedMessage, Stage)> {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style.clone());
    let started_at = Instant::now();
    let mut parsed = ParsedMessage::default();

    loop {
        let elapsed = started_at.elapsed().as_secs_f32();
        let blocks = parsed.script_blocks().count();
        progress_bar.set_message(if blocks == 0 {
            format!("🤔 Thinking... {elapsed:.1}s")
        } else {
            format!("🛠  Writing scripts ({blocks})... {elapsed:.1}s")
        });
        progress_bar.tick();

        let event = select! {
            event = event_rx.recv() => event,
            _ = sleep(Duration::from_millis(100)) => continue,
        };
        let Some(event) = event else {
            progress_bar.finish_and_clear();
            return None;
        };

        match event {
            SessionEvent::ReplyUpdated { parsed: latest, .. } => {
                parsed = latest;
            }
            SessionEvent::StageChanged(Stage::Sending)
            | SessionEvent::SuggestionsChanged(_) => {}
            SessionEvent::StageChanged(stage) => {
                progress_bar.finish_and_clear();
                return Some((parsed, stage));
            }
        }
    }
}

/// Prints the reply and returns its finished scripts, in order.
fn render_reply(parsed: &ParsedMessage) -> Vec<ScriptDescriptor> {
    let mut scripts = Vec::new();
    for segment in &parsed.segments {
        match segment {
            Segment::Prose(text) => print_prose(text),
            Segment::ScriptBlock(block) => {
                let bar = BAR_CHAR.bright_yellow();
                match block.descriptor() {
                    Some(script) => {
                        scripts.push(script);
                        let n = scripts.len();
                        println!(
                            "{bar}📜 {} {}",
                            format!("[{n}]").bright_yellow(),
                            block.title.bold()
                        );
                    }
                    None => println!(
                        "{bar}📜 {} {}",
                        block.title.bold(),
                        "(incomplete)".dimmed()
                    ),
                }
                println!("{bar}   {}", block.description.dimmed());
            }
        }
    }
    if !scripts.is_empty() {
        println!("{}", "/view N to read a script, /send N to sync it.".dimmed());
    }
    scripts
}

fn print_prose(text: &str) {
    for line in text.lines() {
        println!("{}{}", BAR_CHAR.bright_cyan(), line.bright_white());
    }
}

fn print_script(script: &ScriptDescriptor) {
    println!("{}", script.title.bold());
    println!("{}", script.description.dimmed());
    println!();
    println!("{}", script.code);
}

async fn publish(relay: &RelayClient, script: &ScriptDescriptor) {
    println!("{}", status_label(RelayStatus::Sending).dimmed());
    let result = relay.publish(script).await;
    let label = status_label(relay.status());
    match result {
        Ok(()) => println!("{}", label.bright_green()),
        Err(err) => eprintln!("{} {err}", label.bright_red()),
    }
}

fn status_label(status: RelayStatus) -> &'static str {
    match status {
        RelayStatus::Idle => "Send to Studio",
        RelayStatus::Sending => "Sending...",
        RelayStatus::Sent => "Sent!",
        RelayStatus::Failed => "Failed",
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
