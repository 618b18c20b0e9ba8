use super::domain::{Answer, ChoiceOption, Question, QuestionConfig};

/// Score one answered question. Pure and total: any unscorable input
/// (unknown option ids, out-of-range values, config/answer shape mismatch)
/// scores 0 rather than failing. The result never exceeds `question.points`.
pub fn score_answer(question: &Question, answer: &Answer) -> u32 {
    match (&question.config, answer) {
        (QuestionConfig::SingleChoice { options }, Answer::SingleChoice { option_id }) => {
            option_points(options, option_id).unwrap_or(0)
        }
        (QuestionConfig::MultipleChoice { options }, Answer::MultipleChoice { option_ids }) => {
            let sum: u32 = option_ids
                .iter()
                .filter_map(|id| option_points(options, id))
                .sum();
            // Cap at the question maximum so duplicate or inflated option
            // sets cannot over-score.
            sum.min(question.points)
        }
        (QuestionConfig::Likert { points_map }, Answer::Likert { value }) => {
            if !(1..=5).contains(value) {
                return 0;
            }
            match points_map {
                Some(map) => map
                    .get(usize::from(*value) - 1)
                    .copied()
                    .unwrap_or(0)
                    .min(question.points),
                None => round_half_up(f64::from(*value) / 5.0 * f64::from(question.points)),
            }
        }
        (QuestionConfig::TrueFalse { correct }, Answer::TrueFalse { value }) => {
            if value == correct {
                question.points
            } else {
                0
            }
        }
        (QuestionConfig::Rating { min, max }, Answer::Rating { value }) => {
            if max <= min {
                return 0;
            }
            // Widen before subtracting: i32 extremes would overflow.
            let span = f64::from(*max) - f64::from(*min);
            let ratio = (f64::from(*value) - f64::from(*min)) / span;
            round_half_up(ratio.clamp(0.0, 1.0) * f64::from(question.points))
        }
        (QuestionConfig::FreeText, Answer::FreeText { .. }) => 0,
        // Answer shape does not match the question type.
        _ => 0,
    }
}

fn option_points(options: &[ChoiceOption], id: &str) -> Option<u32> {
    options.iter().find(|option| option.id == id).map(|option| option.points)
}

/// Rounding happens once, at the final step of each question's score.
fn round_half_up(value: f64) -> u32 {
    value.round().max(0.0) as u32
}
