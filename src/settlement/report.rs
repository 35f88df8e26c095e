use chrono::NaiveDate;

use super::payout::UserTransactions;

/// Report locale, resolved from the user's stored language tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    Ru,
}

impl Locale {
    pub fn from_tag(tag: &str) -> Self {
        if tag.to_ascii_lowercase().starts_with("ru") {
            Locale::Ru
        } else {
            Locale::En
        }
    }
}

/// Renders one user's settlement report: title line with the reference date,
/// a "sent" section, a "received" section, and a totals line.
pub fn render_report(locale: Locale, reference_date: NaiveDate, tx: &UserTransactions) -> String {
    let mut out = String::new();

    match locale {
        Locale::En => out.push_str(&format!("📊 Stake settlement for {reference_date}\n")),
        Locale::Ru => out.push_str(&format!("📊 Итоги ставок за {reference_date}\n")),
    }

    if !tx.sent.is_empty() {
        match locale {
            Locale::En => out.push_str("\nLost stakes:\n"),
            Locale::Ru => out.push_str("\nПотерянные ставки:\n"),
        }
        for line in &tx.sent {
            out.push_str(&format!("  -{} \"{}\"\n", line.amount, line.habit_title));
        }
    }

    if !tx.received.is_empty() {
        match locale {
            Locale::En => out.push_str("\nWinnings:\n"),
            Locale::Ru => out.push_str("\nВыигрыши:\n"),
        }
        for line in &tx.received {
            match locale {
                Locale::En => out.push_str(&format!(
                    "  +{} from {} (\"{}\" -> \"{}\")\n",
                    line.amount, line.from_display, line.from_habit, line.for_habit
                )),
                Locale::Ru => out.push_str(&format!(
                    "  +{} от {} (\"{}\" -> \"{}\")\n",
                    line.amount, line.from_display, line.from_habit, line.for_habit
                )),
            }
        }
    }

    match locale {
        Locale::En => out.push_str(&format!(
            "\nTotal: sent {}, received {}",
            tx.total_sent(),
            tx.total_received()
        )),
        Locale::Ru => out.push_str(&format!(
            "\nИтого: отдано {}, получено {}",
            tx.total_sent(),
            tx.total_received()
        )),
    }

    out
}
