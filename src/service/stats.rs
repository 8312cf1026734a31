//! Learning statistics
//!
//! Days are counted in the learner's local time, a fixed offset from UTC.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::data::{Database, StudySession};
use crate::error::AppError;

/// Days searched backwards when counting the streak
const STREAK_LOOKBACK_DAYS: i64 = 366;
const WEEK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    /// Words answered today (correct + incorrect)
    pub words_learned: i64,
    /// Minutes studied today
    pub study_time: i64,
    /// Consecutive days with a session, ending today or yesterday
    pub streak: i64,
    /// Last seven days, oldest first
    pub weekly_data: Vec<DailyStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    /// "M/D"
    pub date: String,
    pub words: i64,
    /// Minutes
    pub time: i64,
}

/// Learning statistics service
pub struct StatsService {
    db: Arc<Database>,
    offset: FixedOffset,
}

impl StatsService {
    /// Create new stats service
    ///
    /// # Errors
    /// Returns `Config` if the offset is outside ±24h
    pub fn new(db: Arc<Database>, utc_offset_hours: i32) -> Result<Self, AppError> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            AppError::Config(format!("invalid UTC offset: {utc_offset_hours}h"))
        })?;
        Ok(Self { db, offset })
    }

    pub async fn learning_stats(&self, user_id: &str) -> Result<LearningStats, AppError> {
        self.learning_stats_at(user_id, Utc::now()).await
    }

    pub async fn learning_stats_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LearningStats, AppError> {
        let today = now.with_timezone(&self.offset).date_naive();
        let today_start = self.start_of(today)?;
        let tomorrow_start = today_start + Duration::days(1);
        let week_start = today_start - Duration::days(WEEK_DAYS - 1);

        let week_sessions = self
            .db
            .list_study_sessions_between(user_id, week_start, tomorrow_start)
            .await?;
        let study_times = self
            .db
            .list_study_times_since(user_id, today_start - Duration::days(STREAK_LOOKBACK_DAYS))
            .await?;

        Ok(summarize(self.offset, today, &week_sessions, &study_times))
    }

    fn start_of(&self, day: NaiveDate) -> Result<DateTime<Utc>, AppError> {
        day.and_time(NaiveTime::MIN)
            .and_local_timezone(self.offset)
            .single()
            .map(|start| start.with_timezone(&Utc))
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("ambiguous local midnight for {day}")))
    }
}

fn answered_words(session: &StudySession) -> i64 {
    (session.correct_words.0.len() + session.incorrect_words.0.len()) as i64
}

fn minutes(seconds: i64) -> i64 {
    (seconds as f64 / 60.0).round() as i64
}

/// Fold sessions of the last week and all recent completion times into stats
fn summarize(
    offset: FixedOffset,
    today: NaiveDate,
    week_sessions: &[StudySession],
    study_times: &[DateTime<Utc>],
) -> LearningStats {
    let local_day = |at: &DateTime<Utc>| at.with_timezone(&offset).date_naive();

    let mut words_learned = 0;
    let mut seconds_today = 0;
    let mut per_day: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();

    for session in week_sessions {
        let day = local_day(&session.completed_at);
        let words = answered_words(session);
        if day == today {
            words_learned += words;
            seconds_today += session.duration;
        }
        let entry = per_day.entry(day).or_default();
        entry.0 += words;
        entry.1 += minutes(session.duration);
    }

    let weekly_data = (0..WEEK_DAYS)
        .rev()
        .map(|days_ago| {
            let day = today - Duration::days(days_ago);
            let (words, time) = per_day.get(&day).copied().unwrap_or_default();
            DailyStats {
                date: format!("{}/{}", day.month(), day.day()),
                words,
                time,
            }
        })
        .collect();

    let active_days: HashSet<NaiveDate> = study_times.iter().map(local_day).collect();

    LearningStats {
        words_learned,
        study_time: minutes(seconds_today),
        streak: streak_ending(&active_days, today),
        weekly_data,
    }
}

/// Consecutive active days ending today, or yesterday if today has no session yet
fn streak_ending(active_days: &HashSet<NaiveDate>, today: NaiveDate) -> i64 {
    let mut day = if active_days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while active_days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::types::Json;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn session_at(completed_at: DateTime<Utc>, duration: i64, answered: usize) -> StudySession {
        StudySession {
            id: "s".to_string(),
            user_id: "u".to_string(),
            wordbook_id: "wb".to_string(),
            wordbook_name: "Words".to_string(),
            mode: "quiz".to_string(),
            score: 100.0,
            duration,
            correct_words: Json(vec!["w".to_string(); answered]),
            incorrect_words: Json(vec!["x".to_string()]),
            completed_at,
        }
    }

    #[test]
    fn local_day_boundary_uses_offset() {
        // 2024-03-10 16:30 UTC is 2024-03-11 01:30 in UTC+9
        let late_utc = Utc.with_ymd_and_hms(2024, 3, 10, 16, 30, 0).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();

        let stats = summarize(kst(), today, &[session_at(late_utc, 150, 4)], &[late_utc]);

        assert_eq!(stats.words_learned, 5);
        assert_eq!(stats.study_time, 3);
        assert_eq!(stats.streak, 1);
        assert_eq!(stats.weekly_data.len(), 7);
        assert_eq!(stats.weekly_data[6].date, "3/11");
        assert_eq!(stats.weekly_data[6].words, 5);
        assert_eq!(stats.weekly_data[0].date, "3/5");
    }

    #[test]
    fn weekly_time_rounds_each_session() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 11, 3, 0, 0).unwrap();
        let sessions = [session_at(at, 89, 0), session_at(at, 89, 0)];

        let stats = summarize(kst(), today, &sessions, &[at]);

        // 178s today rounds to 3 minutes; per-session rounding gives 1 + 1
        assert_eq!(stats.study_time, 3);
        assert_eq!(stats.weekly_data[6].time, 2);
    }

    #[test]
    fn streak_counts_from_yesterday_when_today_is_empty() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let days: HashSet<NaiveDate> = [8, 9, 10]
            .into_iter()
            .map(|d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap())
            .collect();
        assert_eq!(streak_ending(&days, today), 3);

        let broken: HashSet<NaiveDate> = [NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()]
            .into_iter()
            .collect();
        assert_eq!(streak_ending(&broken, today), 0);
    }
}
