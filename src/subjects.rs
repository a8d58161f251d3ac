//! # Subjects Module
//!
//! The fixed school curriculum used by the quiz: which subjects are offered
//! for each grade, and recognition of the grade buttons.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 11;

const GRADE_SUBJECTS: [&[&str]; 11] = [
    // 1
    &[
        "математика", "русский язык", "окружающий мир", "чтение", "рисование", "музыка",
        "технология", "физкультура",
    ],
    // 2
    &[
        "математика", "русский язык", "окружающий мир", "английский язык", "китайский язык",
        "чтение", "рисование", "музыка", "технология", "физкультура",
    ],
    // 3
    &[
        "математика", "русский язык", "окружающий мир", "литературное чтение",
        "английский язык", "китайский язык", "музыка", "ИЗО", "технология", "физкультура",
        "ОРКСЭ",
    ],
    // 4
    &[
        "математика", "русский язык", "окружающий мир", "литературное чтение",
        "английский язык", "китайский язык", "музыка", "ИЗО", "технология", "физкультура",
        "ОРКСЭ", "информатика",
    ],
    // 5
    &[
        "математика", "русский язык", "история", "биология", "литература", "английский язык",
        "география", "китайский язык", "музыка", "ИЗО", "технология", "физкультура",
        "обществознание",
    ],
    // 6
    &[
        "математика", "русский язык", "история", "биология", "литература", "английский язык",
        "география", "китайский язык", "музыка", "ИЗО", "технология", "физкультура",
        "обществознание",
    ],
    // 7
    &[
        "математика", "физика", "химия", "биология", "литература", "русский язык", "геометрия",
        "английский язык", "ОБЖ", "история", "география", "китайский язык", "информатика",
        "обществознание", "технология", "физкультура", "ИЗО",
    ],
    // 8
    &[
        "математика", "физика", "химия", "биология", "литература", "русский язык", "геометрия",
        "английский язык", "ОБЖ", "история", "география", "китайский язык", "информатика",
        "обществознание", "технология", "физкультура", "черчение",
    ],
    // 9
    &[
        "математика", "физика", "химия", "биология", "информатика", "литература",
        "русский язык", "геометрия", "английский язык", "ОБЖ", "история", "география",
        "китайский язык", "обществознание", "экономика", "право", "астрономия",
    ],
    // 10
    &[
        "математика", "физика", "химия", "биология", "информатика", "обществознание",
        "литература", "русский язык", "геометрия", "английский язык", "ОБЖ", "история",
        "география", "китайский язык", "экономика", "право", "астрономия", "естествознание",
    ],
    // 11
    &[
        "математика", "физика", "химия", "биология", "информатика", "обществознание",
        "литература", "русский язык", "геометрия", "английский язык", "ОБЖ", "история",
        "география", "китайский язык", "экономика", "право", "астрономия", "естествознание",
        "МХК",
    ],
];

lazy_static! {
    static ref GRADE_TOKEN: Regex =
        Regex::new(r"^(\d+) класс$").expect("Grade token pattern should be valid");
}

/// Result of matching a grade button text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeToken {
    /// A grade with a subject list
    Valid(u8),
    /// Looks like a grade button but names no known grade
    OutOfRange,
}

/// All grades offered by the quiz, in order
pub fn grades() -> impl Iterator<Item = u8> {
    MIN_GRADE..=MAX_GRADE
}

/// Subjects available for a grade, `None` for an unknown grade
pub fn subjects_for(grade: u8) -> Option<&'static [&'static str]> {
    if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
        return None;
    }
    Some(GRADE_SUBJECTS[(grade - MIN_GRADE) as usize])
}

pub fn is_valid_subject(grade: u8, subject: &str) -> bool {
    subjects_for(grade).is_some_and(|subjects| subjects.contains(&subject))
}

/// Match texts like "5 класс"
pub fn parse_grade_token(text: &str) -> Option<GradeToken> {
    let captures = GRADE_TOKEN.captures(text)?;
    let token = match captures[1].parse::<u8>() {
        Ok(grade) if subjects_for(grade).is_some() => GradeToken::Valid(grade),
        _ => GradeToken::OutOfRange,
    };
    debug!("Parsed grade token {text:?} as {token:?}");
    Some(token)
}
