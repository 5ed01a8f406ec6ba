//! Template Catalog
//!
//! Static daily-routine reminder templates per dominant dosha, and the
//! nearest-time lookup used to pick a canned message for an arbitrary time.

use serde::Serialize;

use crate::models::dosha::Dosha;
use crate::models::reminder::{ReminderCategory, TimeOfDay};

/// A compiled-in reminder template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderTemplate {
    pub time: TimeOfDay,
    pub title: &'static str,
    pub message: &'static str,
    pub category: ReminderCategory,
}

const fn template(
    hour: u8,
    minute: u8,
    title: &'static str,
    message: &'static str,
    category: ReminderCategory,
) -> ReminderTemplate {
    ReminderTemplate {
        time: TimeOfDay::at(hour, minute),
        title,
        message,
        category,
    }
}

const VATA: &[ReminderTemplate] = &[
    template(
        6,
        0,
        "Morning Grounding",
        "🌅 Good morning! It's 6 AM — ideal time for meditation and gentle yoga. Vata types benefit from warm oil massage (Abhyanga).",
        ReminderCategory::Meditation,
    ),
    template(
        7,
        30,
        "Warm Breakfast",
        "🍲 Breakfast time! Vata needs warm, cooked foods. Try oatmeal with ghee, cinnamon, and dates.",
        ReminderCategory::Diet,
    ),
    template(
        12,
        0,
        "Lunch Reminder",
        "🥘 Lunchtime! Eat your largest meal now. Include warm, grounding foods with healthy fats and spices.",
        ReminderCategory::Diet,
    ),
    template(
        18,
        0,
        "Evening Calm",
        "🧘 Evening wind-down time. Avoid cold drinks. Try warm herbal tea with ginger and cardamom.",
        ReminderCategory::Diet,
    ),
    template(
        21,
        0,
        "Sleep Preparation",
        "🌙 Prepare for sleep. Vata benefits from a regular sleep schedule. Try warm milk with nutmeg before bed.",
        ReminderCategory::Sleep,
    ),
];

const PITTA: &[ReminderTemplate] = &[
    template(
        6,
        0,
        "Morning Coolness",
        "🌅 Good morning! It's 6 AM — perfect for meditation and cooling yoga practices. Pitta types should avoid overheating.",
        ReminderCategory::Meditation,
    ),
    template(
        7,
        30,
        "Cooling Breakfast",
        "🥗 Breakfast time! Pitta benefits from cooling foods. Try fresh fruit, coconut, and cooling herbs like coriander.",
        ReminderCategory::Diet,
    ),
    template(
        12,
        0,
        "Balanced Lunch",
        "🍽️ Lunchtime! Eat your main meal now. Avoid excessive spicy or salty foods. Include cooling vegetables.",
        ReminderCategory::Diet,
    ),
    template(
        18,
        0,
        "Evening Balance",
        "🌿 Evening time. Avoid cold drinks after sunset to balance Pitta. Try cooling herbal teas like mint or fennel.",
        ReminderCategory::Diet,
    ),
    template(
        22,
        0,
        "Cool Down for Sleep",
        "🌙 Sleep time approaching. Pitta types need adequate rest to avoid irritability. Keep bedroom cool and dark.",
        ReminderCategory::Sleep,
    ),
];

const KAPHA: &[ReminderTemplate] = &[
    template(
        5,
        30,
        "Early Rising",
        "🌅 Rise and shine! It's 5:30 AM — Kapha types benefit from early rising. Start with vigorous exercise or brisk walking.",
        ReminderCategory::Exercise,
    ),
    template(
        7,
        0,
        "Light Breakfast",
        "☕ Light breakfast time! Kapha benefits from stimulating foods. Try warm spices like ginger, black pepper, and turmeric.",
        ReminderCategory::Diet,
    ),
    template(
        12,
        0,
        "Main Meal",
        "🍛 Lunchtime! Kapha should eat moderate portions. Include warming spices and avoid heavy, oily foods.",
        ReminderCategory::Diet,
    ),
    template(
        18,
        0,
        "Light Evening",
        "🥣 Evening meal should be light. Avoid cold drinks after sunset to balance Kapha. Try warming herbal teas.",
        ReminderCategory::Diet,
    ),
    template(
        21,
        30,
        "Active Evening",
        "🚶 Before bed, take a short walk. Kapha types should avoid excessive sleep and stay active throughout the day.",
        ReminderCategory::Exercise,
    ),
];

const GENERAL: &[ReminderTemplate] = &[
    template(
        6,
        0,
        "Morning Routine",
        "🌅 Good morning! It's 6 AM — ideal time for meditation and light yoga. Start your day mindfully.",
        ReminderCategory::Meditation,
    ),
    template(
        8,
        0,
        "Breakfast Time",
        "🍳 Breakfast time! Eat a balanced meal according to your dosha. Stay hydrated throughout the day.",
        ReminderCategory::Diet,
    ),
    template(
        12,
        0,
        "Lunch Reminder",
        "🍱 Lunchtime! Eat your main meal now when digestive fire (Agni) is strongest.",
        ReminderCategory::Diet,
    ),
    template(
        18,
        0,
        "Evening Practice",
        "🧘 Evening time. Avoid cold drinks after sunset to support digestion and balance.",
        ReminderCategory::General,
    ),
    template(
        22,
        0,
        "Sleep Time",
        "🌙 Prepare for sleep. Maintain a regular sleep schedule for optimal health and balance.",
        ReminderCategory::Sleep,
    ),
];

/// Templates for a dosha
pub fn templates_for_dosha(dosha: Dosha) -> &'static [ReminderTemplate] {
    match dosha {
        Dosha::Vata => VATA,
        Dosha::Pitta => PITTA,
        Dosha::Kapha => KAPHA,
        Dosha::General => GENERAL,
    }
}

/// Templates for a dominant label; unrecognized labels (including combined
/// labels such as `vata+pitta`) fall back to the general set.
pub fn templates_for(dominant: &str) -> &'static [ReminderTemplate] {
    templates_for_dosha(Dosha::parse_or_general(dominant))
}

/// Template closest to `time` within `templates`.
///
/// An exact time match wins outright. Otherwise the smallest absolute minute
/// distance wins, ties going to the earliest entry. `None` only for an empty
/// slice.
pub fn nearest_in(templates: &[ReminderTemplate], time: TimeOfDay) -> Option<&ReminderTemplate> {
    if let Some(exact) = templates.iter().find(|t| t.time == time) {
        return Some(exact);
    }

    let mut closest: Option<(&ReminderTemplate, u32)> = None;
    for candidate in templates {
        let distance = candidate.time.distance_minutes(&time);
        match closest {
            Some((_, best)) if distance >= best => {}
            _ => closest = Some((candidate, distance)),
        }
    }
    closest.map(|(template, _)| template)
}

/// Nearest template for a dominant label. Never fails: every catalog set is
/// non-empty.
pub fn nearest_template(time: TimeOfDay, dominant: &str) -> &'static ReminderTemplate {
    let templates = templates_for(dominant);
    nearest_in(templates, time).unwrap_or(&GENERAL[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_for_known_and_unknown_labels() {
        assert_eq!(templates_for("Vata")[0].title, "Morning Grounding");
        assert_eq!(templates_for("KAPHA")[0].time, TimeOfDay::at(5, 30));
        assert_eq!(templates_for("vata+pitta"), GENERAL);
        assert_eq!(templates_for(""), GENERAL);
    }

    #[test]
    fn test_every_set_is_non_empty_and_ordered() {
        for dosha in [Dosha::Vata, Dosha::Pitta, Dosha::Kapha, Dosha::General] {
            let templates = templates_for_dosha(dosha);
            assert_eq!(templates.len(), 5);
            assert!(templates.windows(2).all(|w| w[0].time < w[1].time));
        }
    }

    #[test]
    fn test_equidistant_times_resolve_to_first_in_catalog_order() {
        let templates = [
            template(6, 0, "Dawn", "m", ReminderCategory::Meditation),
            template(18, 0, "Dusk", "m", ReminderCategory::General),
        ];

        let nearest = nearest_in(&templates, TimeOfDay::at(12, 0)).unwrap();
        assert_eq!(nearest.title, "Dawn");
    }

    #[test]
    fn test_tie_break_within_real_catalog() {
        // 06:45 sits 45 minutes from both 06:00 and 07:30
        let nearest = nearest_template(TimeOfDay::at(6, 45), "vata");
        assert_eq!(nearest.title, "Morning Grounding");
    }

    #[test]
    fn test_exact_match_wins() {
        let nearest = nearest_template(TimeOfDay::at(7, 30), "pitta");
        assert_eq!(nearest.title, "Cooling Breakfast");
        assert_eq!(nearest.time, TimeOfDay::at(7, 30));
    }

    #[test]
    fn test_nearest_by_distance() {
        assert_eq!(nearest_template(TimeOfDay::at(9, 0), "vata").title, "Warm Breakfast");
        assert_eq!(nearest_template(TimeOfDay::at(23, 59), "kapha").title, "Active Evening");
        assert_eq!(nearest_template(TimeOfDay::at(0, 0), "unknown").title, "Morning Routine");
    }

    #[test]
    fn test_nearest_in_empty_slice() {
        assert!(nearest_in(&[], TimeOfDay::at(12, 0)).is_none());
    }
}
