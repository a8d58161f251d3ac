//! UI Builder module for creating keyboards

use teloxide::types::{KeyboardButton, KeyboardMarkup};

use crate::dialogue::ReplyKeyboard;

/// Create a resized reply keyboard from rendered button rows
pub fn reply_keyboard(keyboard: &ReplyKeyboard) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = keyboard
        .rows
        .iter()
        .map(|row| row.iter().map(KeyboardButton::new).collect())
        .collect();

    KeyboardMarkup::new(rows).resize_keyboard()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::render::{calculator_keyboard, main_menu_keyboard};

    #[test]
    fn test_reply_keyboard_keeps_layout() {
        let source = calculator_keyboard();
        let markup = reply_keyboard(&source);

        assert_eq!(markup.keyboard.len(), source.rows.len());
        assert_eq!(markup.keyboard[0].len(), 4);
        assert_eq!(markup.keyboard[0][0].text, source.rows[0][0]);
        assert!(markup.resize_keyboard);
    }

    #[test]
    fn test_main_menu_buttons() {
        let markup = reply_keyboard(&main_menu_keyboard());
        let labels: Vec<&str> = markup
            .keyboard
            .iter()
            .flatten()
            .map(|button| button.text.as_str())
            .collect();

        assert!(labels.contains(&crate::localization::t("menu-quiz").as_str()));
        assert!(labels.contains(&crate::localization::t("menu-calculator").as_str()));
    }
}
