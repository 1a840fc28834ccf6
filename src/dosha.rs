//! Dosha inference
//!
//! Maps recent game metrics to three heuristic imbalance scores (Vata, Pitta,
//! Kapha), picks a dominant category, and attaches its fixed prescriptions.
//!
//! Rules are evaluated independently per log over the last
//! [`RECENT_LOG_WINDOW`] logs:
//!
//! ```text
//! Vata  += 30  if tremor_index > 60
//! Vata  += 25  if impulsivity_count > 5
//! Pitta += 25  if accuracy < 50 and time_taken < 30
//! Pitta += 20  if focus_breaks > 3
//! Kapha += 20  if time_taken > 120 and accuracy > 60
//! Kapha += 15  if completion_status == FAILED and time_taken > 60
//! ```

use crate::types::{
    CompletionStatus, DoshaAnalysis, DoshaType, GameLog, GameMetrics, GameType, Prescription,
    PrescriptionCategory, Urgency,
};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of most recent logs considered
pub const RECENT_LOG_WINDOW: usize = 5;

pub const INSIGHT_VATA_TREMOR: &str = "High Vata detected: Motor agitation and instability";
pub const INSIGHT_VATA_IMPULSIVE: &str = "Vata imbalance: Impulsive decision-making pattern";
pub const INSIGHT_PITTA_RUSHING: &str = "Pitta imbalance: Rushing without focus (Fire energy)";
pub const INSIGHT_PITTA_BREAKS: &str = "Pitta aggravation: Frequent focus interruptions";
pub const INSIGHT_KAPHA_SLOW: &str = "Kapha tendency: Slow but steady approach";
pub const INSIGHT_KAPHA_SLUGGISH: &str = "Kapha imbalance: Sluggish engagement";

/// Unnormalized rule points
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DoshaAccumulators {
    pub vata: f64,
    pub pitta: f64,
    pub kapha: f64,
}

impl DoshaAccumulators {
    /// Apply every rule to one log's metrics, appending insights in rule order
    pub fn apply(&mut self, metrics: &GameMetrics, insights: &mut Vec<String>) {
        if metrics.tremor_index > 60.0 {
            self.vata += 30.0;
            insights.push(INSIGHT_VATA_TREMOR.to_string());
        }
        if metrics.impulsivity_count > 5 {
            self.vata += 25.0;
            insights.push(INSIGHT_VATA_IMPULSIVE.to_string());
        }
        if metrics.accuracy < 50.0 && metrics.time_taken < 30.0 {
            self.pitta += 25.0;
            insights.push(INSIGHT_PITTA_RUSHING.to_string());
        }
        if metrics.focus_breaks > 3 {
            self.pitta += 20.0;
            insights.push(INSIGHT_PITTA_BREAKS.to_string());
        }
        if metrics.time_taken > 120.0 && metrics.accuracy > 60.0 {
            self.kapha += 20.0;
            insights.push(INSIGHT_KAPHA_SLOW.to_string());
        }
        if metrics.completion_status == CompletionStatus::Failed && metrics.time_taken > 60.0 {
            self.kapha += 15.0;
            insights.push(INSIGHT_KAPHA_SLUGGISH.to_string());
        }
    }

    pub fn total(&self) -> f64 {
        self.vata + self.pitta + self.kapha
    }

    /// Dominant category. Pitta is checked first, then Kapha; Vata is the fallback.
    pub fn dominant(&self) -> DoshaType {
        if self.pitta >= self.vata && self.pitta >= self.kapha {
            DoshaType::Pitta
        } else if self.kapha >= self.vata && self.kapha >= self.pitta {
            DoshaType::Kapha
        } else {
            DoshaType::Vata
        }
    }
}

/// Run the rule set over the most recent logs
pub fn accumulate(logs: &[GameLog]) -> (DoshaAccumulators, Vec<String>) {
    let recent = &logs[logs.len().saturating_sub(RECENT_LOG_WINDOW)..];
    let mut acc = DoshaAccumulators::default();
    let mut insights = Vec::new();
    for log in recent {
        acc.apply(&log.metrics, &mut insights);
    }
    (acc, insights)
}

/// Analyze a child's game logs (oldest first) into a dosha view
pub fn analyze_game_metrics(logs: &[GameLog]) -> DoshaAnalysis {
    if logs.is_empty() {
        return baseline_analysis();
    }

    let (acc, insights) = accumulate(logs);

    // All-zero accumulators normalize against 1 to avoid dividing by zero
    let total = match acc.total() {
        t if t > 0.0 => t,
        _ => 1.0,
    };
    let dominant = acc.dominant();

    debug!(
        "dosha accumulators vata={} pitta={} kapha={} over {} logs -> {}",
        acc.vata,
        acc.pitta,
        acc.kapha,
        logs.len().min(RECENT_LOG_WINDOW),
        dominant.as_str()
    );

    DoshaAnalysis {
        vata_score: (acc.vata / total * 100.0).round(),
        pitta_score: (acc.pitta / total * 100.0).round(),
        kapha_score: (acc.kapha / total * 100.0).round(),
        dominant_dosha: dominant,
        insights,
        prescriptions: prescriptions_for(dominant),
    }
}

/// Fixed analysis for a child with no recorded games
pub fn baseline_analysis() -> DoshaAnalysis {
    DoshaAnalysis {
        vata_score: 40.0,
        pitta_score: 30.0,
        kapha_score: 30.0,
        dominant_dosha: DoshaType::Vata,
        insights: vec![
            "New child profile: Default balanced state".to_string(),
            "Play games to establish baseline metrics".to_string(),
        ],
        prescriptions: vec![
            rx(
                PrescriptionCategory::Routine,
                "Maintain a consistent daily routine with regular meal and sleep times",
                None,
                Urgency::Weekly,
            ),
            rx(
                PrescriptionCategory::Activity,
                "Engage in mindful play: Games help balance the mind and body",
                Some(20),
                Urgency::Today,
            ),
        ],
    }
}

/// The fixed, ordered prescription list for a dominant category
pub fn prescriptions_for(dosha: DoshaType) -> Vec<Prescription> {
    use PrescriptionCategory::*;
    use Urgency::*;

    match dosha {
        DoshaType::Vata => vec![
            rx(Activity, "Do 10 Wall Pushes (Heavy pressure for grounding)", Some(5), Immediate),
            rx(
                Breathing,
                "Practice Deep Pressure Breathing: Wrap yourself in a heavy blanket for 5 minutes and breathe slowly",
                Some(5),
                Immediate,
            ),
            rx(
                Food,
                "Eat warm, grounding foods: Cooked vegetables, warming spices (ginger, cinnamon)",
                None,
                Today,
            ),
            rx(
                Routine,
                "Establish a consistent sleep schedule (sleep at same time daily)",
                None,
                Weekly,
            ),
        ],
        DoshaType::Pitta => vec![
            rx(
                Activity,
                "Cool down: Splash cold water on face or take a cool shower",
                Some(5),
                Immediate,
            ),
            rx(
                Breathing,
                "Practice Cooling Breath (Shitali Pranayama): Breathe in through mouth, out through nose",
                Some(5),
                Immediate,
            ),
            rx(
                Food,
                "Eat cooling foods: Coconut water, cucumber, melon, mint leaves",
                None,
                Today,
            ),
            rx(
                Routine,
                "Practice mindfulness: 5-minute meditation focusing on calm thoughts",
                Some(5),
                Today,
            ),
        ],
        DoshaType::Kapha => vec![
            rx(
                Activity,
                "Energize: Go for a brisk walk or do 20 jumping jacks",
                Some(10),
                Immediate,
            ),
            rx(
                Breathing,
                "Practice Energizing Breath: Kapalabhati (skull-shining breath) - quick powerful exhales",
                Some(5),
                Immediate,
            ),
            rx(
                Food,
                "Eat light, warming foods: Ginger tea, warm lemon water, spices (black pepper)",
                None,
                Today,
            ),
            rx(
                Routine,
                "Maintain activity: Schedule regular play time and exercise",
                None,
                Weekly,
            ),
        ],
    }
}

/// Display name of a game in Ayurvedic terms
pub fn game_ayurvedic_name(game: GameType) -> &'static str {
    match game {
        GameType::MirrorPattern => "Chakra Dhyana (Geometric Focus)",
        GameType::HiddenHerb => "Pushpa Sadhana (Flower Finding)",
        GameType::LionsBreath => "Simha Garjana (Lion's Breath)",
        GameType::SocialDetective => "Rasa Bodha (Emotional Intelligence)",
        other => other.as_str(),
    }
}

/// Name used when the child's name is unknown
pub const DEFAULT_CHILD_NAME: &str = "Child";

/// Encouragement after a won game; `{name}` is replaced with the child's name
pub const SUCCESS_STORIES: [&str; 4] = [
    "{name}, like Arjuna holding his bow steady, you maintained your focus and hit the target. Your mind is becoming a warrior's mind.",
    "Through practice, {name}, you are becoming a master archer of your own senses. The Gita teaches: \"Yoga is skill in action.\" You just showed that skill.",
    "{name}, you have the steadiness of Krishna's chariot—unwavering, focused, unstoppable. This is the path of the warrior within.",
    "Like the string on a warrior's bow, {name}, your focus is now taut and true. You are ready for greater challenges.",
];

/// Encouragement after a lost or abandoned game
pub const FAILURE_STORIES: [&str; 4] = [
    "{name}, even Arjuna doubted himself. But he took a breath, steadied his mind, and tried again. Will you?",
    "The Gita says: \"On this path, effort never goes to waste.\" {name}, this attempt taught your mind something. Try once more.",
    "{name}, the greatest warriors stumble. The difference is they rise. Your next attempt is your next victory.",
    "The mind is like wind, sometimes turbulent. Breathe deeply, {name}. The next level awaits your steady focus.",
];

/// Pick a Gita story for a finished game, addressed to `child_name`
pub fn gita_wisdom<R: Rng + ?Sized>(child_name: &str, success: bool, rng: &mut R) -> String {
    let stories = if success {
        &SUCCESS_STORIES
    } else {
        &FAILURE_STORIES
    };
    let name = match child_name.trim() {
        "" => DEFAULT_CHILD_NAME,
        name => name,
    };
    stories[rng.gen_range(0..stories.len())].replace("{name}", name)
}

fn rx(
    category: PrescriptionCategory,
    description: &str,
    duration_minutes: Option<u32>,
    urgency: Urgency,
) -> Prescription {
    Prescription {
        category,
        description: description.to_string(),
        duration_minutes,
        urgency,
    }
}
