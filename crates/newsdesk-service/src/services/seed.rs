//! Demo data for local development.

use chrono::{DateTime, Duration, Utc};

use newsdesk_core::NewsDraft;

/// Owner identity of the demo editor.
pub const DEMO_EDITOR: &str = "dc79541b-a854-4c9d-a42f-ec09e0e36887";

/// Owner identity of a second demo editor.
pub const DEMO_REVIEWER: &str = "dc79541b-a854-4c9d-a42f-ec09e0e36888";

/// A demo record together with its owner.
#[derive(Debug, Clone)]
pub struct SeedEntry {
    pub owner: &'static str,
    pub draft: NewsDraft,
}

fn entry(
    owner: &'static str,
    title: &str,
    author: &str,
    active: bool,
    active_from: DateTime<Utc>,
    text: &str,
    tags: &[&str],
) -> SeedEntry {
    SeedEntry {
        owner,
        draft: NewsDraft {
            title: title.to_string(),
            author: author.to_string(),
            active,
            active_from: Some(active_from),
            text: text.to_string(),
            text_json: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_important: false,
            is_mailed: false,
        },
    }
}

/// Demo set: published, draft and scheduled records sharing a few tags.
pub fn demo_entries(now: DateTime<Utc>) -> Vec<SeedEntry> {
    let last_month = now - Duration::days(30);

    let mut first = entry(
        DEMO_EDITOR,
        "Новость 1",
        "Пикин А.С.",
        true,
        now,
        "<p>тестовый текст 1</p>",
        &["тег", "хэштег"],
    );
    first.draft.is_important = true;

    let mut mailed = entry(
        DEMO_EDITOR,
        "Новость 2",
        "Петров И.И.",
        true,
        last_month,
        "вася <b>тестовый</b> текст 2",
        &["вася"],
    );
    mailed.draft.is_mailed = true;

    vec![
        first,
        mailed,
        entry(
            DEMO_EDITOR,
            "Новость уникальная 2989 тест",
            "Тестерович И.И.",
            false,
            last_month,
            "вася вася уникальный текст",
            &["вася"],
        ),
        entry(
            DEMO_EDITOR,
            "Новость 3",
            "Сидоров С.И.",
            false,
            now,
            "Черновик",
            &["петя"],
        ),
        entry(
            DEMO_REVIEWER,
            "Новость 4",
            "Алексеев И.И.",
            true,
            now,
            "тестовый текст 4",
            &["тег"],
        ),
        entry(
            DEMO_REVIEWER,
            "Анонс на следующую неделю",
            "Курочкин И.В.",
            true,
            now + Duration::days(7),
            "<p>Отложенная публикация &amp; анонс</p>",
            &["анонс"],
        ),
    ]
}
