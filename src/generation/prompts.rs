//! Prompt templates sent to the completion endpoint.

pub const TUTOR_SYSTEM_PROMPT: &str =
    "Ты - учитель для школьников. Объясняй просто и понятно, с примерами.";

pub fn question_prompt(grade: u8, subject: &str) -> String {
    format!(
        r#"Сгенерируй вопрос для {grade} класса по предмету "{subject}" в формате:
"текствопроса_ответ1_ответ2_ответ3_ответ4_номерправильногоответа"

Правила:
1. Только 4 варианта ответа
2. Номер правильного ответа (1-4)
3. Разделяй части подчеркиванием
4. Без кавычек
5. Пример: Сколько будет 2+2?_4_5_6_7_1"#
    )
}

pub fn recommendation_prompt(topic: &str) -> String {
    format!(
        r#"На основе темы "{topic}" сгенерируй 2 рекомендации для дальнейшего изучения.
Формат: перваярекомендация_втораярекомендация
Без кавычек, разделяй подчеркиванием.
Пример: для темы "Дроби" ответ должен быть "Что такое знаменатель_Десятичные дроби""#
    )
}

pub fn explanation_prompt(topic: &str, grade: Option<u8>) -> String {
    match grade {
        Some(grade) => format!("Объясни тему '{topic}' для школьника {grade} класса"),
        None => format!("Объясни тему '{topic}' для школьника"),
    }
}
