//! Conversation session tests against a local generateContent stub

use axum::http::StatusCode;
use image_chat::{ConversationSession, EncodedImage, Error, Part, Role, SendOptions};
use serde_json::json;

mod common;
use common::{
    HELLO_PNG_B64, TEST_API_KEY, image_response, spawn_upstream, spawn_upstream_raw,
    text_only_response, thinking_response,
};

#[tokio::test]
async fn test_send_message_records_both_turns() {
    let upstream = spawn_upstream(StatusCode::OK, &image_response("a cat")).await;
    let mut session = ConversationSession::new(upstream.config());

    let reply = session
        .send_message("draw a cat", &[], &SendOptions::default())
        .await
        .unwrap();

    assert_eq!(reply.text, "a cat");
    assert_eq!(reply.image_data.as_deref(), Some(HELLO_PNG_B64));
    assert!(reply.thinking_images.is_empty());

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].parts, vec![Part::text("draw a cat")]);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].parts[0].as_text(), Some("a cat"));
    assert_eq!(
        history[1].parts[1].as_image().map(|d| d.data.as_str()),
        Some(HELLO_PNG_B64)
    );
}

#[tokio::test]
async fn test_request_replays_history_in_order() {
    let upstream = spawn_upstream(StatusCode::OK, &image_response("ok")).await;
    let mut session = ConversationSession::new(upstream.config());
    let options = SendOptions::default();

    for prompt in ["first", "second", "third"] {
        session.send_message(prompt, &[], &options).await.unwrap();
    }

    assert_eq!(session.len(), 6);

    let requests = upstream.requests();
    assert_eq!(requests.len(), 3);

    for (i, request) in requests.iter().enumerate() {
        let contents = request.body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2 * i + 1);

        // Everything before the pending turn is the history at that point
        for (sent, recorded) in contents.iter().zip(session.history()) {
            assert_eq!(sent, &serde_json::to_value(recorded).unwrap());
        }
    }

    let last = &requests[2].body["contents"];
    assert_eq!(last[0]["role"], "user");
    assert_eq!(last[1]["role"], "assistant");
    assert_eq!(last[4]["parts"][0]["text"], "third");
}

#[tokio::test]
async fn test_request_carries_key_and_generation_config() {
    let upstream = spawn_upstream(StatusCode::OK, &image_response("ok")).await;
    let mut session = ConversationSession::new(upstream.config());

    let options = SendOptions::default()
        .with_aspect_ratio("16:9")
        .with_image_size("4K");
    let image = EncodedImage::new("QUJD", "image/jpeg");
    session
        .send_message("edit this", &[image], &options)
        .await
        .unwrap();

    let request = &upstream.requests()[0];
    assert_eq!(request.api_key.as_deref(), Some(TEST_API_KEY));

    let body = &request.body;
    assert_eq!(
        body["generationConfig"]["responseModalities"],
        json!(["TEXT", "IMAGE"])
    );
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
    assert_eq!(body["generationConfig"]["imageConfig"]["imageSize"], "4K");
    assert!(body.get("tools").is_none());

    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["text"], "edit this");
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[1]["inlineData"]["data"], "QUJD");
}

#[tokio::test]
async fn test_search_adds_google_search_tool() {
    let upstream = spawn_upstream(StatusCode::OK, &thinking_response()).await;
    let mut session = ConversationSession::new(upstream.config());

    let reply = session
        .send_message("weather in SF", &[], &SendOptions::search())
        .await
        .unwrap();

    let body = &upstream.requests()[0].body;
    assert_eq!(body["tools"], json!([{"google_search": {}}]));
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");

    assert_eq!(
        reply.grounding_metadata,
        Some(json!({"webSearchQueries": ["sf weather"]}))
    );
}

#[tokio::test]
async fn test_thinking_images_are_collected_on_request() {
    let upstream = spawn_upstream(StatusCode::OK, &thinking_response()).await;
    let mut session = ConversationSession::new(upstream.config());

    let options = SendOptions::default().with_thinking(true);
    let reply = session.send_message("draw", &[], &options).await.unwrap();

    assert_eq!(reply.thinking_images, vec!["ZHJhZnQ=".to_string()]);
    assert_eq!(reply.thought_signature.as_deref(), Some("sig-123"));
    assert_eq!(session.thought_signature(), Some("sig-123"));

    let assistant = &session.history()[1];
    assert_eq!(
        assistant.parts[0],
        Part::image(
            image_chat::InlineData {
                mime_type: "image/png".to_string(),
                data: "ZHJhZnQ=".to_string(),
            },
            true
        )
    );
    // The candidate's own copy of the draft stays in place, untagged
    assert_eq!(
        assistant.parts[1],
        Part::image(
            image_chat::InlineData {
                mime_type: "image/png".to_string(),
                data: "ZHJhZnQ=".to_string(),
            },
            false
        )
    );
    assert_eq!(assistant.parts[2].as_text(), Some("final"));
    assert_eq!(
        assistant.parts[3].as_image().map(|d| d.data.as_str()),
        Some(HELLO_PNG_B64)
    );
    assert_eq!(assistant.parts.len(), 4);
}

#[tokio::test]
async fn test_candidate_images_recorded_without_thinking() {
    let upstream = spawn_upstream(StatusCode::OK, &thinking_response()).await;
    let mut session = ConversationSession::new(upstream.config());

    let reply = session
        .send_message("draw", &[], &SendOptions::default())
        .await
        .unwrap();

    assert!(reply.thinking_images.is_empty());

    // Every candidate part is kept in response order, none tagged as thought
    let assistant = &session.history()[1];
    assert_eq!(assistant.parts.len(), 3);
    assert!(matches!(
        assistant.parts[0],
        Part::InlineImage { thought: false, .. }
    ));
    assert_eq!(
        assistant.parts[0].as_image().map(|d| d.data.as_str()),
        Some("ZHJhZnQ=")
    );
    assert_eq!(assistant.parts[1].as_text(), Some("final"));

    // The recorded turn is replayed as-is on the next request
    session
        .send_message("again", &[], &SendOptions::default())
        .await
        .unwrap();
    let replayed = &upstream.requests()[1].body["contents"][1]["parts"];
    assert_eq!(replayed[0]["inlineData"]["data"], "ZHJhZnQ=");
    assert_ne!(replayed[0]["thought"], true);
}

#[tokio::test]
async fn test_api_error_leaves_history_untouched() {
    let upstream = spawn_upstream(
        StatusCode::SERVICE_UNAVAILABLE,
        &json!({"error": {"message": "overloaded"}}),
    )
    .await;
    let mut session = ConversationSession::new(upstream.config());

    let err = session
        .send_message("draw", &[], &SendOptions::default())
        .await
        .unwrap_err();

    match &err {
        Error::Api { status, body } => {
            assert_eq!(*status, 503);
            assert!(body.contains("overloaded"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert_eq!(err.status(), Some(503));
    assert!(session.is_empty());
    assert!(session.thought_signature().is_none());
}

#[tokio::test]
async fn test_malformed_body_leaves_history_untouched() {
    let upstream = spawn_upstream_raw(StatusCode::OK, "not json").await;
    let mut session = ConversationSession::new(upstream.config());

    let result = session
        .send_message("draw", &[], &SendOptions::default())
        .await;

    assert!(result.is_err());
    assert!(session.is_empty());
}

#[tokio::test]
async fn test_empty_candidates_record_only_user_turn() {
    let upstream = spawn_upstream(StatusCode::OK, &json!({"candidates": []})).await;
    let mut session = ConversationSession::new(upstream.config());

    let reply = session
        .send_message("draw", &[], &SendOptions::default())
        .await
        .unwrap();

    assert!(reply.text.is_empty());
    assert!(reply.image_data.is_none());
    assert_eq!(session.len(), 1);
    assert_eq!(session.history()[0].role, Role::User);
}

#[tokio::test]
async fn test_generate_image_requires_an_image() {
    let upstream = spawn_upstream(StatusCode::OK, &text_only_response()).await;
    let mut session = ConversationSession::new(upstream.config());

    let err = session
        .generate_image("draw", &SendOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoImage));
    // The exchange itself succeeded, so it stays in history
    assert_eq!(session.len(), 2);
}

#[tokio::test]
async fn test_edit_image_writes_output() {
    let upstream = spawn_upstream(StatusCode::OK, &image_response("edited")).await;
    let mut session = ConversationSession::new(upstream.config());

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.png");
    std::fs::write(&input, b"source").unwrap();
    let output = dir.path().join("out").join("edited.png");

    let path = session
        .edit_image(&input, "make it blue", &output, &SendOptions::default())
        .await
        .unwrap();

    assert_eq!(path, output);
    assert_eq!(std::fs::read(&output).unwrap(), b"hello");

    let parts = &upstream.requests()[0].body["contents"][0]["parts"];
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[1]["inlineData"]["data"], "c291cmNl");
}

#[tokio::test]
async fn test_composite_sends_images_in_order() {
    let upstream = spawn_upstream(StatusCode::OK, &image_response("merged")).await;
    let mut session = ConversationSession::new(upstream.config());

    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.jpg");
    std::fs::write(&first, b"a").unwrap();
    std::fs::write(&second, b"b").unwrap();
    let output = dir.path().join("composite.png");

    session
        .composite_images("merge", &[&first, &second], &output, &SendOptions::composite())
        .await
        .unwrap();

    assert!(output.exists());

    let body = &upstream.requests()[0].body;
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[2]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "5:4");
}

#[tokio::test]
async fn test_composite_rejects_too_many_images_before_sending() {
    let upstream = spawn_upstream(StatusCode::OK, &image_response("merged")).await;
    let mut session = ConversationSession::new(upstream.config());

    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = (0..15).map(|i| dir.path().join(format!("{i}.png"))).collect();

    let err = session
        .composite_images(
            "merge",
            &paths,
            &dir.path().join("out.png"),
            &SendOptions::composite(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TooManyImages { count: 15, max: 14 }));
    assert!(upstream.requests().is_empty());
    assert!(session.is_empty());
}

#[tokio::test]
async fn test_continue_without_history_starts_over() {
    let upstream = spawn_upstream(StatusCode::OK, &image_response("ok")).await;
    let mut session = ConversationSession::new(upstream.config());
    let options = SendOptions::default();

    session.send_message("first", &[], &options).await.unwrap();
    session
        .continue_conversation("follow up", true, &options)
        .await
        .unwrap();
    assert_eq!(session.len(), 4);

    session
        .continue_conversation("fresh start", false, &options)
        .await
        .unwrap();
    assert_eq!(session.len(), 2);

    let requests = upstream.requests();
    assert_eq!(requests[1].body["contents"].as_array().unwrap().len(), 3);
    assert_eq!(requests[2].body["contents"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reset_sends_fresh_contents() {
    let upstream = spawn_upstream(StatusCode::OK, &image_response("ok")).await;
    let mut session = ConversationSession::new(upstream.config());
    let options = SendOptions::default();

    session.send_message("first", &[], &options).await.unwrap();
    session.reset();
    session.send_message("again", &[], &options).await.unwrap();

    let requests = upstream.requests();
    let contents = requests[1].body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0]["parts"][0]["text"], "again");
}
