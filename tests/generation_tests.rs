//! # Generation Tests
//!
//! Retry policy of the structured generator against a scripted backend, and
//! the HTTP completion client against a mock server.

mod common;

use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use common::{generator, ScriptedCompletion, QUESTION_REPLY};
use school_helper::config::{CompletionConfig, GenerationSettings};
use school_helper::errors::GenerationError;
use school_helper::generation::{
    is_valid_question, CompletionApi, CompletionRequest, ChatMessage, OpenRouterClient,
    RecommendationPair, StructuredGenerator,
};

fn paced(api: Arc<ScriptedCompletion>) -> StructuredGenerator {
    StructuredGenerator::new(api, GenerationSettings::default())
}

#[tokio::test]
async fn test_question_accepted_on_first_attempt() {
    let api = ScriptedCompletion::new([Ok(QUESTION_REPLY)]);
    let question = generator(api.clone())
        .generate_question(2, "математика")
        .await
        .unwrap();

    assert_eq!(question.text, "Сколько будет 2+2?");
    assert_eq!(question.correct_answer(), "4");
    assert_eq!(api.calls(), 1);

    let request = &api.requests()[0];
    assert_eq!(request.model, "deepseek/deepseek-chat");
    assert_eq!(request.temperature, 1.5);
    assert_eq!(request.max_tokens, 200);
    assert!(request.messages[0].content.contains("математика"));
}

#[tokio::test]
async fn test_output_is_trimmed_before_validation() {
    let api = ScriptedCompletion::new([Ok(format!("  {QUESTION_REPLY}\n"))]);
    let question = generator(api).generate_question(2, "математика").await;
    assert!(question.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_retries_pause_between_attempts_only() {
    let api = ScriptedCompletion::new([
        Ok("не по формату"),
        Err("connection reset"),
        Ok("Вопрос_1_2_3_4_7"),
        Ok(QUESTION_REPLY),
    ]);
    let started = Instant::now();

    let question = paced(api.clone())
        .generate_question(2, "математика")
        .await
        .unwrap();

    assert_eq!(question.correct_index, 1);
    assert_eq!(api.calls(), 4);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test]
async fn test_blank_answer_is_retried() {
    let api = ScriptedCompletion::new([Ok("Вопрос__2_3_4_1"), Ok(QUESTION_REPLY)]);
    let question = generator(api.clone())
        .generate_question(2, "математика")
        .await
        .unwrap();

    assert!(question.answers.iter().all(|answer| !answer.is_empty()));
    assert_eq!(api.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_question_generation_exhausts_after_five_attempts() {
    let api = ScriptedCompletion::new(vec![Ok::<_, &str>("мусор"); 10]);
    let started = Instant::now();

    let result = paced(api.clone())
        .generate_question(2, "математика")
        .await;

    assert_eq!(result, Err(GenerationError::Exhausted { attempts: 5 }));
    assert_eq!(api.calls(), 5);
    // No pause after the last attempt
    assert_eq!(started.elapsed(), Duration::from_secs(4));
}

#[tokio::test]
async fn test_generate_structured_with_custom_validator() {
    let api = ScriptedCompletion::new([Ok("a_b_c_d_e_1")]);
    let generator = generator(api);
    let request = CompletionRequest {
        model: "m".to_string(),
        messages: vec![ChatMessage::user("q")],
        temperature: 0.0,
        max_tokens: 10,
    };

    let text = generator
        .generate_structured(&request, is_valid_question, 1)
        .await
        .unwrap();
    assert_eq!(text, "a_b_c_d_e_1");
}

#[tokio::test]
async fn test_recommendations_parsed() {
    let api = ScriptedCompletion::new([Ok("Дроби_Проценты")]);
    let pair = generator(api).recommend("математика").await;
    assert_eq!(pair, RecommendationPair::new("Дроби", "Проценты"));
}

#[tokio::test]
async fn test_recommendations_fall_back_to_fixed_pair() {
    let api = ScriptedCompletion::new([Ok("один_два_три"), Err("timeout")]);
    let pair = generator(api.clone()).recommend("математика").await;

    assert_eq!(pair, RecommendationPair::fallback());
    assert_eq!(api.calls(), 2);
}

#[tokio::test]
async fn test_explanation_is_single_shot() {
    let api = ScriptedCompletion::new([Err("upstream down"), Ok("не будет запрошено")]);
    let result = generator(api.clone()).explain("дроби", Some(5)).await;

    assert_eq!(
        result,
        Err(GenerationError::ExplanationUnavailable(
            "upstream down".to_string()
        ))
    );
    assert_eq!(api.calls(), 1);
}

#[tokio::test]
async fn test_explanation_sends_system_prompt() {
    let api = ScriptedCompletion::new([Ok("Дробь это часть целого")]);
    let text = generator(api.clone()).explain("дроби", None).await.unwrap();

    assert_eq!(text, "Дробь это часть целого");
    let request = &api.requests()[0];
    assert_eq!(request.messages[0].role, "system");
    assert_eq!(request.messages[1].role, "user");
    assert_eq!(request.max_tokens, 1500);
}

fn client(url: String) -> OpenRouterClient {
    OpenRouterClient::new(&CompletionConfig {
        base_url: url,
        token: "secret-token".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn simple_request() -> CompletionRequest {
    CompletionRequest {
        model: "deepseek/deepseek-chat".to_string(),
        messages: vec![ChatMessage::user("Привет")],
        temperature: 0.7,
        max_tokens: 200,
    }
}

#[tokio::test]
async fn test_client_returns_first_choice() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer secret-token")
        .match_body(Matcher::PartialJson(json!({
            "model": "deepseek/deepseek-chat",
            "max_tokens": 200,
            "messages": [{"role": "user", "content": "Привет"}],
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [
                    {"message": {"content": "Здравствуй"}},
                    {"message": {"content": "второй"}}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let text = client(server.url()).complete(&simple_request()).await.unwrap();

    assert_eq!(text, "Здравствуй");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_fails_on_http_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .create_async()
        .await;

    let result = client(server.url()).complete(&simple_request()).await;

    assert!(result.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_fails_without_choices() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;

    let result = client(format!("{}/", server.url()))
        .complete(&simple_request())
        .await;
    assert!(result.is_err());
}
