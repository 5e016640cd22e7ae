// Live Backend Port (achievements, leaderboards, stats, presence)

use crate::domain::{AchievementFilter, AchievementInfo, LeaderboardEntry, StatValue, UserId};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Ranked view requested from the stats manager
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardQuery {
    pub stat: String,
    pub num_entries: u32,
    pub start_rank: u32,
    pub start_at_user: bool,
    pub ascending: bool,
    /// `Some` for social leaderboards, holding the favourites-only flag
    pub social: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LeaderboardPage {
    pub display_name: String,
    pub entries: Vec<LeaderboardEntry>,
}

/// Xbox Live title services.
///
/// Achievement calls report the platform error code directly: `0` on
/// success, `ACHIEVEMENT_ALREADY_UNLOCKED`, or a negative code.
#[async_trait]
pub trait LiveBackend: Send + Sync {
    async fn set_achievement_progress(&self, user: UserId, achievement: &str, progress: u32) -> i64;

    async fn achievement(
        &self,
        user: UserId,
        achievement: &str,
    ) -> std::result::Result<AchievementInfo, i64>;

    async fn read_player_leaderboard(
        &self,
        ident: &str,
        user: UserId,
        num_items: u32,
        filter: AchievementFilter,
    ) -> Result<Vec<LeaderboardEntry>>;

    async fn fire_event(&self, user: UserId, scid: &str, name: &str, params: &[Value]) -> Result<()>;

    async fn set_rich_presence(
        &self,
        user: UserId,
        is_active: bool,
        presence_id: &str,
        scid: &str,
    ) -> Result<()>;

    /// Push the stats manager values of one user to the service
    async fn flush_stats(&self, user: UserId, stats: &BTreeMap<String, StatValue>) -> Result<()>;

    async fn stat_leaderboard(&self, user: UserId, query: &LeaderboardQuery)
        -> Result<LeaderboardPage>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{ProgressState, ACHIEVEMENT_ALREADY_UNLOCKED};
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records calls; keeps achievement progress and flushed stats in memory
    #[derive(Default)]
    pub struct RecordingLive {
        progress: Mutex<HashMap<(UserId, String), u32>>,
        pub flushed: Mutex<HashMap<UserId, BTreeMap<String, StatValue>>>,
        pub events: Mutex<Vec<(UserId, String, Vec<Value>)>>,
        pub presence: Mutex<Vec<(UserId, bool, String)>>,
    }

    impl RecordingLive {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl LiveBackend for RecordingLive {
        async fn set_achievement_progress(&self, user: UserId, achievement: &str, progress: u32) -> i64 {
            let mut all = self.progress.lock().unwrap();
            let current = all.entry((user, achievement.to_string())).or_insert(0);
            if *current >= 100 {
                return ACHIEVEMENT_ALREADY_UNLOCKED;
            }
            if progress < *current {
                return -1;
            }
            *current = progress;
            0
        }

        async fn achievement(
            &self,
            user: UserId,
            achievement: &str,
        ) -> std::result::Result<AchievementInfo, i64> {
            let progress = *self
                .progress
                .lock()
                .unwrap()
                .get(&(user, achievement.to_string()))
                .ok_or(-1_i64)?;
            Ok(AchievementInfo {
                achievement: achievement.to_string(),
                progress,
                name: format!("Achievement {}", achievement),
                progress_state: ProgressState::from_progress(progress),
                user_id: user,
            })
        }

        async fn read_player_leaderboard(
            &self,
            _ident: &str,
            user: UserId,
            _num_items: u32,
            _filter: AchievementFilter,
        ) -> Result<Vec<LeaderboardEntry>> {
            Ok(vec![LeaderboardEntry {
                player: "Player".to_string(),
                player_id: user,
                rank: 1,
                score: 100.0,
            }])
        }

        async fn fire_event(&self, user: UserId, _scid: &str, name: &str, params: &[Value]) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push((user, name.to_string(), params.to_vec()));
            Ok(())
        }

        async fn set_rich_presence(
            &self,
            user: UserId,
            is_active: bool,
            presence_id: &str,
            _scid: &str,
        ) -> Result<()> {
            self.presence
                .lock()
                .unwrap()
                .push((user, is_active, presence_id.to_string()));
            Ok(())
        }

        async fn flush_stats(&self, user: UserId, stats: &BTreeMap<String, StatValue>) -> Result<()> {
            self.flushed.lock().unwrap().insert(user, stats.clone());
            Ok(())
        }

        async fn stat_leaderboard(
            &self,
            _user: UserId,
            query: &LeaderboardQuery,
        ) -> Result<LeaderboardPage> {
            let flushed = self.flushed.lock().unwrap();
            let mut scored: Vec<(UserId, f64)> = flushed
                .iter()
                .filter_map(|(user, stats)| match stats.get(&query.stat) {
                    Some(StatValue::Text(_)) | None => None,
                    Some(value) => Some((*user, value.as_score())),
                })
                .collect();
            if scored.is_empty() {
                return Err(AppError::NotFound(format!("stat {}", query.stat)));
            }
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            let entries = scored
                .into_iter()
                .take(query.num_entries as usize)
                .enumerate()
                .map(|(i, (user, score))| LeaderboardEntry {
                    player: format!("user{}", user),
                    player_id: user,
                    rank: i as u32 + 1,
                    score,
                })
                .collect();
            Ok(LeaderboardPage {
                display_name: query.stat.clone(),
                entries,
            })
        }
    }
}
