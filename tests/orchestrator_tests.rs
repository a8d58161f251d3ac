//! # Orchestrator Tests
//!
//! Full chat turns through the orchestrator with fake services.

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;
use teloxide::types::ChatId;

use common::{orchestrator, FakeImages, RecordingTransport, ScriptedCompletion, Sent, QUESTION_REPLY};
use school_helper::dialogue::{DialogueState, ImageType, TextFormat};
use school_helper::errors::ImageError;
use school_helper::generation::RecommendationPair;
use school_helper::localization::t;

const CHAT: ChatId = ChatId(1001);

fn jpeg_payload() -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([10, 200, 10])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Jpeg(80))
        .unwrap();
    STANDARD.encode(bytes)
}

#[tokio::test]
async fn test_quiz_round_trip() {
    let api = ScriptedCompletion::new([Ok(QUESTION_REPLY), Ok("Сложение_Вычитание")]);
    let bot = orchestrator(api.clone(), FakeImages::unavailable());
    let transport = RecordingTransport::default();

    bot.handle_text(&transport, CHAT, "5 класс").await.unwrap();
    assert_eq!(bot.state(CHAT).await, DialogueState::SubjectSelect { grade: 5 });

    transport.clear();
    bot.handle_text(&transport, CHAT, "математика").await.unwrap();
    let texts = transport.texts();
    assert_eq!(texts[0], t("quiz-generating"));
    assert!(texts[1].contains("Сколько будет 2+2?"));
    assert_eq!(
        bot.state(CHAT).await,
        DialogueState::AwaitingAnswer {
            correct: "4".to_string(),
            subject: "математика".to_string(),
            grade: 5,
        }
    );

    transport.clear();
    bot.handle_text(&transport, CHAT, " 4 ").await.unwrap();
    assert_eq!(
        transport.texts(),
        vec![t("quiz-correct"), t("recommendations-prompt")]
    );
    assert_eq!(
        bot.state(CHAT).await,
        DialogueState::RecommendationChoice {
            subject: "математика".to_string(),
            grade: Some(5),
            prior: RecommendationPair::new("Сложение", "Вычитание"),
        }
    );
    assert_eq!(api.calls(), 2);
}

#[tokio::test]
async fn test_recommendation_pick_explains_then_recommends_once() {
    let api = ScriptedCompletion::new([
        Ok(QUESTION_REPLY),
        Ok("Сложение_Вычитание"),
        Ok("**Сложение** объединяет числа"),
        Ok("Умножение_Деление"),
    ]);
    let bot = orchestrator(api.clone(), FakeImages::unavailable());
    let transport = RecordingTransport::default();

    for input in ["2 класс", "математика", "4"] {
        bot.handle_text(&transport, CHAT, input).await.unwrap();
    }
    transport.clear();
    bot.handle_text(&transport, CHAT, "Сложение").await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 3);
    let Sent::Text(explanation) = &sent[1] else {
        panic!("expected explanation text");
    };
    assert_eq!(explanation.format, TextFormat::Html);
    assert_eq!(explanation.text, "<b>Сложение</b> объединяет числа");
    assert_eq!(api.calls(), 4);

    let DialogueState::RecommendationChoice { prior, grade, .. } = bot.state(CHAT).await else {
        panic!("expected the recommendation loop");
    };
    assert_eq!(prior, RecommendationPair::new("Умножение", "Деление"));
    assert_eq!(grade, Some(2));
}

#[tokio::test]
async fn test_failed_question_resets_chat() {
    // Script runs dry, every attempt fails
    let api = ScriptedCompletion::new(Vec::<Result<&str, &str>>::new());
    let bot = orchestrator(api.clone(), FakeImages::unavailable());
    let transport = RecordingTransport::default();

    bot.handle_text(&transport, CHAT, "3 класс").await.unwrap();
    bot.handle_text(&transport, CHAT, "математика").await.unwrap();

    assert_eq!(api.calls(), 5);
    assert_eq!(bot.state(CHAT).await, DialogueState::MainMenu);
    assert!(transport.texts().contains(&t("quiz-generation-failed")));
}

#[tokio::test]
async fn test_contour_image_delivered_as_png() {
    let images = FakeImages::returning(Ok(jpeg_payload()));
    let bot = orchestrator(ScriptedCompletion::new(Vec::<Result<&str, &str>>::new()), images.clone());
    let transport = RecordingTransport::default();

    bot.handle_text(&transport, CHAT, &t("menu-image")).await.unwrap();
    bot.handle_text(&transport, CHAT, &t("image-contour")).await.unwrap();
    assert!(matches!(
        bot.state(CHAT).await,
        DialogueState::AwaitingImagePrompt {
            image_type: ImageType::Contour,
            ..
        }
    ));

    transport.clear();
    bot.handle_text(&transport, CHAT, "слон").await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 4);
    let Sent::Image(png) = &sent[1] else {
        panic!("expected the image after the progress notice");
    };
    assert_eq!(image::guess_format(png).unwrap(), image::ImageFormat::Png);
    assert_eq!(
        transport.texts(),
        vec![t("image-generating"), t("image-ready"), t("image-contour-tip")]
    );

    let submitted = images.submitted();
    assert_eq!(submitted.len(), 1);
    assert!(submitted[0].prompt.contains("слон"));
    assert_eq!(bot.state(CHAT).await, DialogueState::MainMenu);
}

#[tokio::test]
async fn test_image_failure_returns_home() {
    let images = FakeImages::returning(Err(ImageError::RemoteFailure("censored".to_string())));
    let bot = orchestrator(ScriptedCompletion::new(Vec::<Result<&str, &str>>::new()), images);
    let transport = RecordingTransport::default();

    bot.handle_text(&transport, CHAT, &t("menu-image")).await.unwrap();
    bot.handle_text(&transport, CHAT, &t("image-standard")).await.unwrap();
    transport.clear();
    bot.handle_text(&transport, CHAT, "дом").await.unwrap();

    let texts = transport.texts();
    assert!(texts.last().unwrap().contains("censored"));
    assert_eq!(bot.state(CHAT).await, DialogueState::MainMenu);
}

#[tokio::test]
async fn test_undecodable_image_is_reported() {
    let images = FakeImages::returning(Ok("bm90IGFuIGltYWdl".to_string()));
    let bot = orchestrator(ScriptedCompletion::new(Vec::<Result<&str, &str>>::new()), images);
    let transport = RecordingTransport::default();

    bot.handle_text(&transport, CHAT, &t("menu-image")).await.unwrap();
    bot.handle_text(&transport, CHAT, &t("image-standard")).await.unwrap();
    bot.handle_text(&transport, CHAT, "дом").await.unwrap();

    assert!(transport
        .texts()
        .last()
        .unwrap()
        .contains(&t("image-error-decode")));
}

#[tokio::test]
async fn test_chats_do_not_share_state() {
    let bot = orchestrator(
        ScriptedCompletion::new(Vec::<Result<&str, &str>>::new()),
        FakeImages::unavailable(),
    );
    let transport = RecordingTransport::default();

    bot.handle_text(&transport, ChatId(1), &t("menu-calculator")).await.unwrap();
    bot.handle_text(&transport, ChatId(2), &t("menu-explain")).await.unwrap();

    assert!(matches!(
        bot.state(ChatId(1)).await,
        DialogueState::CalculatorInput { .. }
    ));
    assert_eq!(bot.state(ChatId(2)).await, DialogueState::TopicExplainInput);
}

#[tokio::test]
async fn test_home_clears_stored_state() {
    let bot = orchestrator(
        ScriptedCompletion::new(Vec::<Result<&str, &str>>::new()),
        FakeImages::unavailable(),
    );
    let transport = RecordingTransport::default();

    bot.handle_text(&transport, CHAT, &t("menu-calculator")).await.unwrap();
    bot.handle_text(&transport, CHAT, "/start").await.unwrap();

    assert_eq!(bot.state(CHAT).await, DialogueState::MainMenu);
    assert!(transport.texts().last().unwrap().starts_with(&t("welcome-title")));
}
