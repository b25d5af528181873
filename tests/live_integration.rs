use ekko_inference::{diagnostics::Diagnostics, ChatResponse, InferenceClient, InferenceError};

fn live_client() -> Option<InferenceClient> {
    match InferenceClient::from_env() {
        Ok(client) => Some(client),
        Err(err) => {
            eprintln!("skipping live test: {err}");
            None
        }
    }
}

#[tokio::test]
async fn live_chat_roundtrip_and_diagnostics() {
    let Some(client) = live_client() else {
        return;
    };

    if !client.probe_backend().await {
        eprintln!("skipping live test: no inference backend at {client:?}");
        return;
    }

    let model = client.config().model.clone();
    match client.has_model(&model).await {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("skipping live test: model {model} is not installed");
            return;
        }
        Err(err) => panic!("model listing failed on a live backend: {err}"),
    }

    let response = client
        .chat("Reply only 'OK'", false)
        .await
        .expect("non-streaming chat must succeed");
    assert!(matches!(response, ChatResponse::Complete(_)));
    let text = response.into_text().await.expect("reply text");
    assert!(!text.trim().is_empty());

    let streamed = client
        .chat("Count to 3", true)
        .await
        .expect("streaming chat must succeed")
        .into_text()
        .await
        .expect("stream must drain");
    assert!(!streamed.trim().is_empty());

    let report = Diagnostics::new(&client).run().await;
    assert!(report.all_passed(), "{report}");
}

#[tokio::test]
async fn live_unknown_model_surfaces_backend_error() {
    let Some(client) = live_client() else {
        return;
    };
    if !client.probe_backend().await {
        eprintln!("skipping live test: no inference backend");
        return;
    }

    let mut config = client.config().clone();
    config.model = "ekko-missing-model:latest".to_owned();
    config.attempts.max_attempts = 1;
    let client = client.with_config(config);

    let err = client
        .chat("hello", false)
        .await
        .expect_err("unknown model must fail");
    assert!(matches!(err, InferenceError::Http { status: 404, .. }));
}
