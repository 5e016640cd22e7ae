// Local LiveBackend - achievements, leaderboards, stats and presence kept in memory

use crate::fixture::PlatformFixture;
use async_trait::async_trait;
use gdkbridge_core::domain::{
    AchievementFilter, AchievementInfo, LeaderboardEntry, ProgressState, StatValue, UserId,
    ACHIEVEMENT_ALREADY_UNLOCKED,
};
use gdkbridge_core::error::{AppError, Result};
use gdkbridge_core::port::{LeaderboardPage, LeaderboardQuery, LiveBackend};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Platform code for an unknown achievement or a progress regression
const E_INVALIDARG: i64 = -2_147_024_809;

#[derive(Debug, Clone, PartialEq)]
pub struct Presence {
    pub is_active: bool,
    pub presence_id: String,
    pub scid: String,
}

#[derive(Default)]
struct LiveState {
    progress: HashMap<(UserId, String), u32>,
    stats: HashMap<UserId, BTreeMap<String, StatValue>>,
    events: Vec<(UserId, String, Vec<Value>)>,
    presence: HashMap<UserId, Presence>,
}

pub struct LocalLive {
    fixture: Arc<PlatformFixture>,
    state: Mutex<LiveState>,
}

impl LocalLive {
    pub fn new(fixture: Arc<PlatformFixture>) -> Self {
        Self {
            fixture,
            state: Mutex::new(LiveState::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, LiveState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("live state lock poisoned".to_string()))
    }

    /// Unknown ids are accepted when the fixture lists no achievements
    fn achievement_name(&self, achievement: &str) -> Option<String> {
        if self.fixture.achievements.is_empty() {
            return Some(format!("Achievement {}", achievement));
        }
        self.fixture.achievements.get(achievement).cloned()
    }

    fn gamertag(&self, user: UserId) -> String {
        self.fixture
            .user(user)
            .map(|p| p.gamertag.clone())
            .unwrap_or_else(|| user.to_string())
    }

    /// Events fired so far
    pub fn events(&self) -> Result<Vec<(UserId, String, Vec<Value>)>> {
        Ok(self.state()?.events.clone())
    }

    pub fn presence(&self, user: UserId) -> Result<Option<Presence>> {
        Ok(self.state()?.presence.get(&user).cloned())
    }

    /// Last flushed value of a stat
    pub fn flushed_stat(&self, user: UserId, name: &str) -> Result<Option<StatValue>> {
        Ok(self
            .state()?
            .stats
            .get(&user)
            .and_then(|stats| stats.get(name))
            .cloned())
    }
}

#[async_trait]
impl LiveBackend for LocalLive {
    async fn set_achievement_progress(&self, user: UserId, achievement: &str, progress: u32) -> i64 {
        if self.achievement_name(achievement).is_none() {
            return E_INVALIDARG;
        }
        let Ok(mut state) = self.state() else {
            return E_INVALIDARG;
        };
        let current = state
            .progress
            .entry((user, achievement.to_string()))
            .or_insert(0);
        if *current >= 100 {
            return ACHIEVEMENT_ALREADY_UNLOCKED;
        }
        if progress < *current {
            return E_INVALIDARG;
        }
        *current = progress;
        if progress >= 100 {
            info!(user = %user, achievement, "Achievement unlocked");
        }
        0
    }

    async fn achievement(
        &self,
        user: UserId,
        achievement: &str,
    ) -> std::result::Result<AchievementInfo, i64> {
        let name = self.achievement_name(achievement).ok_or(E_INVALIDARG)?;
        let progress = self
            .state()
            .map_err(|_| E_INVALIDARG)?
            .progress
            .get(&(user, achievement.to_string()))
            .copied()
            .unwrap_or(0);
        Ok(AchievementInfo {
            achievement: achievement.to_string(),
            progress,
            name,
            progress_state: ProgressState::from_progress(progress),
            user_id: user,
        })
    }

    async fn read_player_leaderboard(
        &self,
        ident: &str,
        user: UserId,
        num_items: u32,
        filter: AchievementFilter,
    ) -> Result<Vec<LeaderboardEntry>> {
        let entries = self
            .fixture
            .leaderboards
            .get(ident)
            .ok_or_else(|| AppError::NotFound(format!("leaderboard {}", ident)))?;
        debug!(leaderboard = ident, user = %user, filter = ?filter, "Reading leaderboard");
        Ok(entries.iter().take(num_items as usize).cloned().collect())
    }

    async fn fire_event(&self, user: UserId, scid: &str, name: &str, params: &[Value]) -> Result<()> {
        debug!(user = %user, scid, event = name, params = params.len(), "Event fired");
        self.state()?
            .events
            .push((user, name.to_string(), params.to_vec()));
        Ok(())
    }

    async fn set_rich_presence(
        &self,
        user: UserId,
        is_active: bool,
        presence_id: &str,
        scid: &str,
    ) -> Result<()> {
        self.state()?.presence.insert(
            user,
            Presence {
                is_active,
                presence_id: presence_id.to_string(),
                scid: scid.to_string(),
            },
        );
        Ok(())
    }

    async fn flush_stats(&self, user: UserId, stats: &BTreeMap<String, StatValue>) -> Result<()> {
        self.state()?.stats.insert(user, stats.clone());
        Ok(())
    }

    async fn stat_leaderboard(
        &self,
        user: UserId,
        query: &LeaderboardQuery,
    ) -> Result<LeaderboardPage> {
        let state = self.state()?;
        let social = query.social.is_some();
        let mut scored: Vec<(UserId, f64)> = state
            .stats
            .iter()
            // Social boards only rank signed-in users
            .filter(|(id, _)| !social || self.fixture.user(**id).is_some())
            .filter_map(|(id, stats)| match stats.get(&query.stat) {
                Some(StatValue::Text(_)) | None => None,
                Some(value) => Some((*id, value.as_score())),
            })
            .collect();
        if scored.is_empty() {
            return Err(AppError::NotFound(format!("stat {}", query.stat)));
        }

        scored.sort_by(|a, b| {
            let order = a.1.total_cmp(&b.1);
            if query.ascending {
                order
            } else {
                order.reverse()
            }
        });

        let start = if query.start_at_user {
            scored.iter().position(|(id, _)| *id == user).unwrap_or(0)
        } else {
            (query.start_rank.max(1) - 1) as usize
        };

        let entries = scored
            .into_iter()
            .enumerate()
            .skip(start)
            .take(query.num_entries as usize)
            .map(|(index, (id, score))| LeaderboardEntry {
                player: self.gamertag(id),
                player_id: id,
                rank: index as u32 + 1,
                score,
            })
            .collect();

        Ok(LeaderboardPage {
            display_name: query.stat.clone(),
            entries,
        })
    }
}
