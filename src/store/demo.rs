//! Canned entries seeded into local storage on demo sign-in.

use chrono::{DateTime, Days, Utc};

use crate::entry::{excerpt, EmotionProbabilities, JournalEntry};

/// Owner id of the built-in demo principal.
pub const DEMO_USER_ID: &str = "demo-user-id";

struct Seed {
    id: &'static str,
    title: &'static str,
    content: &'static str,
    mood: &'static str,
    emotion: &'static str,
    probabilities: EmotionProbabilities,
    tags: &'static [&'static str],
    days_ago: u64,
}

const SEEDS: [Seed; 3] = [
    Seed {
        id: "demo-1",
        title: "Welcome to MindfulJournal!",
        content: "This is your first demo entry. You can create, edit, and manage your journal \
                  entries here. The AI will help you track your mood and provide insights into \
                  your emotional patterns. I'm excited to start this journaling journey and see \
                  how it helps with my mental well-being.",
        mood: "excited",
        emotion: "joy",
        probabilities: EmotionProbabilities {
            anger: 0.05,
            disgust: 0.02,
            fear: 0.08,
            joy: 0.75,
            neutral: 0.08,
            sadness: 0.02,
        },
        tags: &["welcome", "demo", "getting-started"],
        days_ago: 0,
    },
    Seed {
        id: "demo-2",
        title: "Morning Reflection",
        content: "Today I woke up feeling refreshed after a good night's sleep. I'm grateful for \
                  the peaceful morning and looking forward to the day ahead. The sun is shining \
                  through my window, and I can hear birds singing outside. It's moments like \
                  these that remind me to appreciate the simple things in life.",
        mood: "grateful",
        emotion: "joy",
        probabilities: EmotionProbabilities {
            anger: 0.02,
            disgust: 0.01,
            fear: 0.03,
            joy: 0.85,
            neutral: 0.08,
            sadness: 0.01,
        },
        tags: &["morning", "gratitude", "sleep"],
        days_ago: 1,
    },
    Seed {
        id: "demo-3",
        title: "Work Challenges",
        content: "Had a difficult meeting with the team today. Feeling a bit stressed about the \
                  upcoming deadline, but I know we can work through it together. The project \
                  requirements keep changing, and it's frustrating to constantly adapt. However, \
                  I'm trying to stay positive and focus on what we can control.",
        mood: "stressed",
        emotion: "anger",
        probabilities: EmotionProbabilities {
            anger: 0.45,
            disgust: 0.15,
            fear: 0.25,
            joy: 0.05,
            neutral: 0.08,
            sadness: 0.02,
        },
        tags: &["work", "challenges", "teamwork"],
        days_ago: 2,
    },
];

/// Build the demo collection relative to `now`, newest first.
pub fn demo_entries(now: DateTime<Utc>) -> Vec<JournalEntry> {
    SEEDS
        .iter()
        .map(|seed| {
            let at = now.checked_sub_days(Days::new(seed.days_ago)).unwrap_or(now);
            JournalEntry {
                id: seed.id.to_owned(),
                title: seed.title.to_owned(),
                content: Some(seed.content.to_owned()),
                excerpt: excerpt(seed.content),
                mood: seed.mood.to_owned(),
                tags: seed.tags.iter().map(|t| (*t).to_owned()).collect(),
                date: at.date_naive(),
                emotion: Some(seed.emotion.to_owned()),
                emotion_probabilities: Some(seed.probabilities),
                ai_insights: None,
                ai_suggestions: None,
                user_id: Some(DEMO_USER_ID.to_owned()),
                created_at: at,
                updated_at: at,
            }
        })
        .collect()
}
