use std::sync::{Arc, Mutex};
use std::time::Duration;

use luau_forge_model::{FinishReason, InlineImage, ModelMessage, UserContent};
use luau_forge_test_model::{PresetResponse, TestModelProvider};
use pretty_assertions::assert_eq;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::accumulator::{
    CONTINUE_ERROR_TRAILER, ERROR_NOTICE, ERROR_TRAILER,
};
use crate::conversation::{CONTINUE_PROMPT, suggestion_prompt};
use crate::markup::Segment;
use crate::{Role, Session, SessionBuilder, SessionError, SessionEvent, Stage};

struct Harness {
    session: Session,
    stage_rx: watch::Receiver<Stage>,
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl Harness {
    fn new(builder: SessionBuilder) -> Self {
        let (stage_tx, stage_rx) = watch::channel(Stage::Idle);
        let events = Arc::new(Mutex::new(Vec::new()));
        let session = builder
            .on_event({
                let events = Arc::clone(&events);
                move |event| {
                    if let SessionEvent::StageChanged(stage) = &event {
                        stage_tx.send_replace(*stage);
                    }
                    events.lock().unwrap().push(event);
                }
            })
            .build();
        Self {
            session,
            stage_rx,
            events,
        }
    }

    fn with_provider(provider: TestModelProvider) -> Self {
        Self::new(
            SessionBuilder::with_model_provider(provider)
                .with_system_instruction("You write Luau."),
        )
    }

    /// Waits until the active stream is over.
    async fn settle(&mut self) -> Stage {
        let stage = timeout(
            Duration::from_secs(2),
            self.stage_rx.wait_for(|stage| *stage != Stage::Sending),
        )
        .await
        .unwrap()
        .unwrap();
        *stage
    }

    async fn last_reply(&self) -> String {
        let snapshot = self.session.snapshot().await.unwrap();
        snapshot.last_reply().unwrap().text.clone()
    }

    fn suggestion_events(&self) -> Vec<Vec<String>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::SuggestionsChanged(list) => Some(list.clone()),
                _ => None,
            })
            .collect()
    }
}

#[tokio::test]
async fn test_simple_reply() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::completed([
        "Hi, ",
        "what are we building?",
    ]));

    let mut harness = Harness::with_provider(provider.clone());
    let image = InlineImage {
        data: "aGk=".to_owned(),
        mime_type: "image/png".to_owned(),
    };
    harness
        .session
        .send_message("Hello", Some(image.clone()))
        .await
        .unwrap();
    assert_eq!(harness.settle().await, Stage::Idle);

    let snapshot = harness.session.snapshot().await.unwrap();
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[0].role, Role::User);
    assert_eq!(snapshot.messages[0].text, "Hello");
    assert_eq!(snapshot.messages[1].text, "Hi, what are we building?");
    assert!(!snapshot.is_continuable());

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].system_instruction.as_deref(),
        Some("You write Luau.")
    );
    assert_eq!(
        requests[0].messages,
        vec![ModelMessage::User(UserContent {
            text: "Hello".to_owned(),
            image: Some(image),
        })]
    );

    let updates = harness
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|event| matches!(event, SessionEvent::ReplyUpdated { .. }))
        .count();
    assert_eq!(updates, 2);
}

#[tokio::test]
async fn test_greeting_is_not_sent() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::completed(["Sure."]));

    let mut harness = Harness::new(
        SessionBuilder::with_model_provider(provider.clone())
            .with_greeting("Hey! What should we build?"),
    );
    let snapshot = harness.session.snapshot().await.unwrap();
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].role, Role::Assistant);

    harness.session.send_message("A door", None).await.unwrap();
    assert_eq!(harness.settle().await, Stage::Idle);
    assert_eq!(provider.requests()[0].messages.len(), 1);
    assert_eq!(provider.requests()[0].system_instruction, None);
    assert_eq!(harness.last_reply().await, "Sure.");
}

#[tokio::test]
async fn test_continue_generation() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_texts(
        [
            "[SCRIPT_BLOCK: title=\"Door (v1.0)\", description=\"Opens\"]\n",
            "```lua\nlocal door",
        ],
        Some(FinishReason::new("MAX_TOKENS")),
    ));
    provider.add_turn(PresetResponse::completed([
        " = workspace.Door\n```\n[/SCRIPT_BLOCK]",
    ]));

    let mut harness = Harness::with_provider(provider.clone());
    harness.session.send_message("A door", None).await.unwrap();
    assert_eq!(harness.settle().await, Stage::Continuable);

    let snapshot = harness.session.snapshot().await.unwrap();
    assert!(snapshot.is_continuable());
    let parsed = snapshot.last_reply().unwrap().parse();
    let [Segment::ScriptBlock(block)] = parsed.segments.as_slice() else {
        panic!("unexpected segments: {:?}", parsed.segments);
    };
    assert!(!block.complete);
    assert_eq!(block.title, "Door (v1.0)");

    harness.session.continue_generation().await.unwrap();
    assert_eq!(harness.settle().await, Stage::Idle);

    let snapshot = harness.session.snapshot().await.unwrap();
    assert_eq!(snapshot.messages.len(), 2);
    let parsed = snapshot.last_reply().unwrap().parse();
    let [Segment::ScriptBlock(block)] = parsed.segments.as_slice() else {
        panic!("unexpected segments: {:?}", parsed.segments);
    };
    assert!(block.complete);
    assert_eq!(block.code(), "local door = workspace.Door");

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        &requests[1].messages[1..],
        [
            ModelMessage::Model(
                "[SCRIPT_BLOCK: title=\"Door (v1.0)\", description=\"Opens\"]\n\
                 ```lua\nlocal door"
                    .to_owned()
            ),
            ModelMessage::user_text(CONTINUE_PROMPT),
        ]
    );
}

#[tokio::test]
async fn test_reject_while_sending() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(100));
    provider.add_turn(PresetResponse::completed(["One ", "two"]));

    let mut harness = Harness::with_provider(provider.clone());
    harness.session.send_message("Count", None).await.unwrap();
    assert_eq!(
        harness.session.send_message("Again", None).await,
        Err(SessionError::Busy)
    );
    assert_eq!(
        harness.session.send_suggestion("Add VFX").await,
        Err(SessionError::Busy)
    );
    assert_eq!(
        harness.session.continue_generation().await,
        Err(SessionError::Busy)
    );

    assert_eq!(harness.settle().await, Stage::Idle);
    assert_eq!(provider.requests().len(), 1);
    assert_eq!(harness.session.snapshot().await.unwrap().messages.len(), 2);
}

#[tokio::test]
async fn test_reject_invalid_actions() {
    let harness = Harness::with_provider(TestModelProvider::default());
    assert_eq!(
        harness.session.continue_generation().await,
        Err(SessionError::NotContinuable)
    );
    assert_eq!(
        harness.session.send_message(" \n ", None).await,
        Err(SessionError::EmptyInput)
    );
    let snapshot = harness.session.snapshot().await.unwrap();
    assert_eq!(snapshot.stage, Stage::Idle);
    assert!(snapshot.messages.is_empty());
}

#[tokio::test]
async fn test_failure_after_text() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(
        PresetResponse::completed(["local x = 1", "\nprint(x)"])
            .failing_after(1),
    );

    let mut harness = Harness::with_provider(provider);
    harness.session.send_message("Go", None).await.unwrap();
    assert_eq!(harness.settle().await, Stage::Continuable);
    assert_eq!(
        harness.last_reply().await,
        format!("local x = 1{ERROR_TRAILER}")
    );
}

#[tokio::test]
async fn test_failure_without_text() {
    // No scripted turn: the response fails before the first chunk.
    let mut harness = Harness::with_provider(TestModelProvider::default());
    harness.session.send_message("Go", None).await.unwrap();
    assert_eq!(harness.settle().await, Stage::Continuable);
    assert_eq!(harness.last_reply().await, ERROR_NOTICE);
}

#[tokio::test]
async fn test_continue_after_failure_without_text() {
    // Every request carrying one message fails before the first chunk.
    let provider = TestModelProvider::default();
    let mut harness = Harness::with_provider(provider.clone());
    harness.session.send_message("Make a door", None).await.unwrap();
    assert_eq!(harness.settle().await, Stage::Continuable);

    harness.session.continue_generation().await.unwrap();
    assert_eq!(harness.settle().await, Stage::Continuable);

    // The original request goes out again, and the notice is not repeated.
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].messages,
        vec![ModelMessage::user_text("Make a door")]
    );
    assert_eq!(harness.last_reply().await, ERROR_NOTICE);
    assert_eq!(harness.session.snapshot().await.unwrap().messages.len(), 2);
}

#[tokio::test]
async fn test_continuation_failure() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_texts(
        ["local door"],
        Some(FinishReason::new("MAX_TOKENS")),
    ));
    provider.add_turn(
        PresetResponse::completed([" = workspace.Door", "\nprint(door)"])
            .failing_after(1),
    );

    let mut harness = Harness::with_provider(provider.clone());
    harness.session.send_message("A door", None).await.unwrap();
    assert_eq!(harness.settle().await, Stage::Continuable);

    harness.session.continue_generation().await.unwrap();
    assert_eq!(harness.settle().await, Stage::Continuable);
    assert_eq!(
        harness.last_reply().await,
        format!("local door = workspace.Door{CONTINUE_ERROR_TRAILER}")
    );
    assert_eq!(
        provider.requests()[1].messages.last(),
        Some(&ModelMessage::user_text(CONTINUE_PROMPT))
    );
}

#[tokio::test]
async fn test_suggestions() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::completed([
        "Done!\n[SUGGESTIONS]Add VFX|",
        "Add sound[/SUGGESTIONS]",
    ]));
    provider.add_turn(PresetResponse::completed(["Adding VFX."]));

    let mut harness = Harness::with_provider(provider.clone());
    harness.session.send_message("A lava brick", None).await.unwrap();
    assert_eq!(harness.settle().await, Stage::Idle);

    let snapshot = harness.session.snapshot().await.unwrap();
    assert_eq!(snapshot.suggestions, vec!["Add VFX", "Add sound"]);
    let parsed = snapshot.last_reply().unwrap().parse();
    assert_eq!(parsed.segments, vec![Segment::Prose("Done!".to_owned())]);

    harness.session.send_suggestion("Add VFX").await.unwrap();
    assert_eq!(harness.settle().await, Stage::Idle);

    let snapshot = harness.session.snapshot().await.unwrap();
    assert!(snapshot.suggestions.is_empty());
    assert_eq!(snapshot.messages[2].role, Role::User);
    assert_eq!(snapshot.messages[2].text, "Add VFX");
    assert_eq!(snapshot.messages[3].text, "Adding VFX.");
    assert_eq!(
        provider.requests()[1].messages[2],
        ModelMessage::user_text(suggestion_prompt("Add VFX"))
    );
    assert_eq!(
        harness.suggestion_events(),
        vec![
            vec!["Add VFX".to_owned(), "Add sound".to_owned()],
            vec![],
        ]
    );
}

#[tokio::test]
async fn test_interrupted_with_open_suggestions() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::completed([
        "Done!\n[SUGGESTIONS]Add VFX[/SUGGESTIONS]",
    ]));
    provider.add_turn(PresetResponse::with_texts(
        ["More\n[SUGGESTIONS]Add", " sound|Add"],
        None,
    ));

    let mut harness = Harness::with_provider(provider);
    harness.session.send_message("A lava brick", None).await.unwrap();
    assert_eq!(harness.settle().await, Stage::Idle);
    harness.session.send_message("Make it glow", None).await.unwrap();
    assert_eq!(harness.settle().await, Stage::Continuable);

    let snapshot = harness.session.snapshot().await.unwrap();
    assert!(snapshot.suggestions.is_empty());
}
