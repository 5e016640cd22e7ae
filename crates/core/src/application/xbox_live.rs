// Xbox Live Service - achievements, privileges, leaderboards, presence and
// the stats manager

use crate::application::issuer::AsyncIssuer;
use crate::domain::{
    AchievementFilter, AchievementMessageType, AsyncChannel, Envelope, Privilege, ProgressState,
    RequestId, StatValue, UserId, UserProfile,
};
use crate::error::{AppError, Result};
use crate::port::{LeaderboardPage, LeaderboardQuery, LiveBackend, UserDirectory};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub const ACHIEVEMENT_RESULT_EVENT: &str = "achievement_result";
pub const ACHIEVEMENT_INFO_EVENT: &str = "achievement info";
pub const PRIVILEGE_RESULT_EVENT: &str = "check_privilege_result";

/// Error code reported in stat and leaderboard envelopes when the service call fails
const STATS_FAILURE: i64 = -1;

#[derive(Debug, Clone)]
struct StatsSetup {
    user: UserId,
    scid: String,
    title_id: u32,
}

#[derive(Default)]
struct StatsState {
    setup: Option<StatsSetup>,
    users: BTreeMap<UserId, BTreeMap<String, StatValue>>,
}

pub struct LiveService {
    live: Arc<dyn LiveBackend>,
    directory: Arc<dyn UserDirectory>,
    issuer: AsyncIssuer,
    stats: Mutex<StatsState>,
}

impl LiveService {
    pub fn new(
        live: Arc<dyn LiveBackend>,
        directory: Arc<dyn UserDirectory>,
        issuer: AsyncIssuer,
    ) -> Self {
        Self {
            live,
            directory,
            issuer,
            stats: Mutex::new(StatsState::default()),
        }
    }

    fn stats(&self) -> Result<MutexGuard<'_, StatsState>> {
        self.stats
            .lock()
            .map_err(|_| AppError::Internal("stats manager lock poisoned".to_string()))
    }

    fn require_user(&self, user: UserId) -> Result<UserProfile> {
        if user.is_null() {
            return Err(AppError::InvalidUser(user.to_string()));
        }
        self.directory
            .profile(user)
            .ok_or_else(|| AppError::InvalidUser(user.to_string()))
    }

    /// Signed-in user with an Xbox Live context
    fn require_live_user(&self, user: UserId) -> Result<UserProfile> {
        let profile = self.require_user(user)?;
        if !profile.live_context {
            return Err(AppError::LiveContextUnavailable(user.to_string()));
        }
        Ok(profile)
    }

    fn require_setup(&self) -> Result<StatsSetup> {
        self.stats()?
            .setup
            .clone()
            .ok_or_else(|| AppError::InvalidState("stats_setup has not been called".to_string()))
    }

    fn require_stats_user(state: &StatsState, user: UserId) -> Result<()> {
        if state.users.contains_key(&user) {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "user {} was not added to the stats manager",
                user
            )))
        }
    }

    // ------------------------------------------------------------------
    // Achievements and privileges
    // ------------------------------------------------------------------

    pub fn achievements_set_progress(
        &self,
        user: UserId,
        achievement: &str,
        progress: i64,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_live_user(user)?;
        if achievement.trim().is_empty() {
            return Err(AppError::Validation("achievement must not be empty".to_string()));
        }
        let progress = u32::try_from(progress)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| AppError::Validation("progress must be between 0 and 100".to_string()))?;

        let id = self.issuer.issue()?;
        let live = Arc::clone(&self.live);
        let achievement = achievement.to_string();
        self.issuer.complete(async move {
            let error = live.set_achievement_progress(user, &achievement, progress).await;
            Envelope::new(AsyncChannel::System)
                .with("event_type", ACHIEVEMENT_RESULT_EVENT)
                .with("requestID", id.value())
                .with("achievement", achievement)
                .with("progress", progress)
                .with("error", error)
        });
        Ok(id)
    }

    pub fn get_achievement(&self, user: UserId, achievement: &str) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_live_user(user)?;
        if achievement.trim().is_empty() {
            return Err(AppError::Validation("achievement must not be empty".to_string()));
        }

        let id = self.issuer.issue()?;
        let live = Arc::clone(&self.live);
        let achievement = achievement.to_string();
        self.issuer.complete(async move {
            let envelope = Envelope::new(AsyncChannel::System)
                .with("event_type", ACHIEVEMENT_INFO_EVENT)
                .with("requestID", id.value())
                .with("userID", user.value());
            match live.achievement(user, &achievement).await {
                Ok(info) => envelope
                    .with("achievement", info.achievement)
                    .with("progress", info.progress)
                    .with("name", info.name)
                    .with("progress_state", info.progress_state as i64)
                    .with("error", 0),
                Err(code) => envelope
                    .with("achievement", achievement)
                    .with("progress", 0)
                    .with("name", "")
                    .with("progress_state", ProgressState::Unknown as i64)
                    .with("error", code),
            }
        });
        Ok(id)
    }

    /// Resolution may wait on the user; the result arrives by tag alone
    pub fn check_privilege(
        &self,
        user: UserId,
        privilege: Privilege,
        attempt_resolution: bool,
    ) -> Result<()> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;

        let directory = Arc::clone(&self.directory);
        self.issuer.complete(async move {
            let result = directory
                .check_privilege(user, privilege, attempt_resolution)
                .await;
            Envelope::new(AsyncChannel::System)
                .with("event_type", PRIVILEGE_RESULT_EVENT)
                .with("result", result.bits())
                .with("privilege", privilege.code())
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Events, leaderboards and presence
    // ------------------------------------------------------------------

    pub fn stats_setup(&self, user: UserId, scid: &str, title_id: u32) -> Result<()> {
        self.issuer.ensure_running()?;
        self.require_live_user(user)?;
        if scid.trim().is_empty() {
            return Err(AppError::Validation("scid must not be empty".to_string()));
        }
        self.stats()?.setup = Some(StatsSetup {
            user,
            scid: scid.to_string(),
            title_id,
        });
        info!(user = %user, scid, title_id = format!("{:08X}", title_id), "Stats set up");
        Ok(())
    }

    /// Title id recorded by `stats_setup`
    pub fn stats_title_id(&self) -> Result<Option<u32>> {
        Ok(self.stats()?.setup.as_ref().map(|setup| setup.title_id))
    }

    pub fn fire_event(&self, name: &str, params: Vec<Value>) -> Result<()> {
        self.issuer.ensure_running()?;
        let setup = self.require_setup()?;
        if name.trim().is_empty() {
            return Err(AppError::Validation("event name must not be empty".to_string()));
        }

        let live = Arc::clone(&self.live);
        let name = name.to_string();
        self.issuer.handle().spawn(async move {
            if let Err(e) = live.fire_event(setup.user, &setup.scid, &name, &params).await {
                warn!(
                    event = %name,
                    title_id = format!("{:08X}", setup.title_id),
                    error = %e,
                    "Event could not be delivered"
                );
            }
        });
        Ok(())
    }

    pub fn read_player_leaderboard(
        &self,
        ident: &str,
        user: UserId,
        num_items: i64,
        filter: AchievementFilter,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_setup()?;
        self.require_live_user(user)?;
        if ident.trim().is_empty() {
            return Err(AppError::Validation("leaderboard id must not be empty".to_string()));
        }
        let num_items = positive_count(num_items, "numitems")?;

        let id = self.issuer.issue()?;
        let live = Arc::clone(&self.live);
        let ident = ident.to_string();
        self.issuer.complete(async move {
            let entries = match live
                .read_player_leaderboard(&ident, user, num_items, filter)
                .await
            {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(leaderboard = %ident, error = %e, "Leaderboard read failed");
                    Vec::new()
                }
            };
            let mut envelope = Envelope::new(AsyncChannel::Social)
                .with("id", AchievementMessageType::LeaderboardInfo.code())
                .with("requestID", id.value())
                .with("leaderboardid", ident)
                .with("numentries", entries.len() as u64);
            for (n, entry) in entries.iter().enumerate() {
                entry.write_indexed(n, &mut envelope.fields);
            }
            envelope
        });
        Ok(id)
    }

    /// `scid` may be omitted once stats are set up
    pub fn set_rich_presence(
        &self,
        user: UserId,
        is_active: bool,
        presence_id: &str,
        scid: Option<&str>,
    ) -> Result<()> {
        self.issuer.ensure_running()?;
        self.require_live_user(user)?;
        if presence_id.trim().is_empty() {
            return Err(AppError::Validation("rich presence id must not be empty".to_string()));
        }
        let scid = match scid.filter(|s| !s.trim().is_empty()) {
            Some(scid) => scid.to_string(),
            None => self
                .require_setup()
                .map_err(|_| AppError::Validation("scid required before stats_setup".to_string()))?
                .scid,
        };

        let live = Arc::clone(&self.live);
        let presence_id = presence_id.to_string();
        self.issuer.handle().spawn(async move {
            if let Err(e) = live
                .set_rich_presence(user, is_active, &presence_id, &scid)
                .await
            {
                warn!(user = %user, error = %e, "Rich presence update failed");
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stats manager
    // ------------------------------------------------------------------

    pub fn stats_add_user(&self, user: UserId) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_live_user(user)?;
        let mut state = self.stats()?;
        if state.users.contains_key(&user) {
            return Err(AppError::Conflict(format!(
                "user {} already added to the stats manager",
                user
            )));
        }
        let id = self.issuer.issue()?;
        state.users.insert(user, BTreeMap::new());
        drop(state);

        self.issuer.complete(async move { stat_event(id, user, "LocalUserAdded", Ok(())) });
        Ok(id)
    }

    /// Unregister the user, flushing its stats first
    pub fn stats_remove_user(&self, user: UserId) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        let mut state = self.stats()?;
        Self::require_stats_user(&state, user)?;
        let id = self.issuer.issue()?;
        let stats = state.users.remove(&user).unwrap_or_default();
        drop(state);

        let live = Arc::clone(&self.live);
        self.issuer.complete(async move {
            let result = live.flush_stats(user, &stats).await;
            stat_event(id, user, "LocalUserRemoved", result)
        });
        Ok(id)
    }

    pub fn stats_flush_user(&self, user: UserId, high_priority: bool) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        let state = self.stats()?;
        Self::require_stats_user(&state, user)?;
        let id = self.issuer.issue()?;
        let stats = state.users.get(&user).cloned().unwrap_or_default();
        drop(state);

        debug!(user = %user, high_priority, stats = stats.len(), "Flushing stats");
        let live = Arc::clone(&self.live);
        self.issuer.complete(async move {
            let result = live.flush_stats(user, &stats).await;
            stat_event(id, user, "StatisticUpdateComplete", result)
        });
        Ok(id)
    }

    pub fn stats_get_stat(&self, user: UserId, name: &str) -> Result<Option<StatValue>> {
        let state = self.stats()?;
        Ok(state.users.get(&user).and_then(|s| s.get(name)).cloned())
    }

    /// Empty when the user is unknown or has no stats
    pub fn stats_get_stat_names(&self, user: UserId) -> Result<Vec<String>> {
        let state = self.stats()?;
        Ok(state
            .users
            .get(&user)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default())
    }

    pub fn stats_set_stat(&self, user: UserId, name: &str, value: StatValue) -> Result<()> {
        self.issuer.ensure_running()?;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::Validation(format!(
                "stat name must be alphanumeric: {:?}",
                name
            )));
        }
        if let StatValue::Real(v) = value {
            if !v.is_finite() {
                return Err(AppError::Validation("stat value must be finite".to_string()));
            }
        }
        let mut state = self.stats()?;
        Self::require_stats_user(&state, user)?;
        if let Some(stats) = state.users.get_mut(&user) {
            stats.insert(name.to_string(), value);
        }
        Ok(())
    }

    pub fn stats_set_stat_int(&self, user: UserId, name: &str, value: i64) -> Result<()> {
        self.stats_set_stat(user, name, StatValue::Int(value))
    }

    pub fn stats_set_stat_real(&self, user: UserId, name: &str, value: f64) -> Result<()> {
        self.stats_set_stat(user, name, StatValue::Real(value))
    }

    pub fn stats_set_stat_string(&self, user: UserId, name: &str, value: &str) -> Result<()> {
        self.stats_set_stat(user, name, StatValue::Text(value.to_string()))
    }

    pub fn stats_delete_stat(&self, user: UserId, name: &str) -> Result<()> {
        self.issuer.ensure_running()?;
        let mut state = self.stats()?;
        Self::require_stats_user(&state, user)?;
        state
            .users
            .get_mut(&user)
            .and_then(|stats| stats.remove(name))
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("stat {}", name)))
    }

    #[allow(clippy::too_many_arguments)]
    fn leaderboard(
        &self,
        user: UserId,
        stat: &str,
        num_entries: i64,
        start_rank: i64,
        start_at_user: bool,
        ascending: bool,
        social: Option<bool>,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        let state = self.stats()?;
        Self::require_stats_user(&state, user)?;
        if stat.trim().is_empty() {
            return Err(AppError::Validation("stat must not be empty".to_string()));
        }
        if social.is_none() {
            if let Some(StatValue::Text(_)) = state.users.get(&user).and_then(|s| s.get(stat)) {
                return Err(AppError::Validation(
                    "global leaderboards need an int or real stat".to_string(),
                ));
            }
        }
        drop(state);

        let num_entries = positive_count(num_entries, "num_entries")?;
        let start_rank = u32::try_from(start_rank)
            .map_err(|_| AppError::Validation("start_rank must not be negative".to_string()))?;
        if start_at_user && start_rank != 0 {
            return Err(AppError::Validation(
                "start_rank must be 0 when starting at the user".to_string(),
            ));
        }

        let query = LeaderboardQuery {
            stat: stat.to_string(),
            num_entries,
            start_rank,
            start_at_user,
            ascending,
            social,
        };
        let id = self.issuer.issue()?;
        let live = Arc::clone(&self.live);
        self.issuer.complete(async move {
            let result = live.stat_leaderboard(user, &query).await;
            leaderboard_event(id, user, result)
        });
        Ok(id)
    }

    pub fn stats_get_leaderboard(
        &self,
        user: UserId,
        stat: &str,
        num_entries: i64,
        start_rank: i64,
        start_at_user: bool,
        ascending: bool,
    ) -> Result<RequestId> {
        self.leaderboard(user, stat, num_entries, start_rank, start_at_user, ascending, None)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stats_get_social_leaderboard(
        &self,
        user: UserId,
        stat: &str,
        num_entries: i64,
        start_rank: i64,
        start_at_user: bool,
        ascending: bool,
        favourites_only: bool,
    ) -> Result<RequestId> {
        self.leaderboard(
            user,
            stat,
            num_entries,
            start_rank,
            start_at_user,
            ascending,
            Some(favourites_only),
        )
    }

    /// Users currently registered with the stats manager
    pub fn stats_users(&self) -> Result<Vec<UserId>> {
        Ok(self.stats()?.users.keys().copied().collect())
    }

    /// Push every registered user's stats; returns how many flushed cleanly
    pub async fn flush_all(&self) -> Result<usize> {
        let snapshot: Vec<(UserId, BTreeMap<String, StatValue>)> = self
            .stats()?
            .users
            .iter()
            .map(|(user, stats)| (*user, stats.clone()))
            .collect();

        let mut flushed = 0;
        for (user, stats) in snapshot {
            match self.live.flush_stats(user, &stats).await {
                Ok(()) => flushed += 1,
                Err(e) => warn!(user = %user, error = %e, "Periodic stats flush failed"),
            }
        }
        Ok(flushed)
    }
}

fn positive_count(value: i64, name: &str) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| AppError::Validation(format!("{} must be at least 1", name)))
}

fn stat_event(id: RequestId, user: UserId, event: &str, result: Result<()>) -> Envelope {
    let envelope = Envelope::new(AsyncChannel::Social)
        .with("id", AchievementMessageType::StatEvent.code())
        .with("event", event)
        .with("requestID", id.value())
        .with("userid", user.value());
    match result {
        Ok(()) => envelope.with("error", 0),
        Err(e) => envelope
            .with("error", STATS_FAILURE)
            .with("errorMessage", e.to_string()),
    }
}

fn leaderboard_event(id: RequestId, user: UserId, result: Result<LeaderboardPage>) -> Envelope {
    let envelope = Envelope::new(AsyncChannel::Social)
        .with("id", AchievementMessageType::LeaderboardInfo.code())
        .with("event", "GetLeaderboardComplete")
        .with("requestID", id.value())
        .with("userid", user.value());
    match result {
        Ok(page) => {
            let mut envelope = envelope
                .with("error", 0)
                .with("displayName", page.display_name)
                .with("numentries", page.entries.len() as u64);
            for (n, entry) in page.entries.iter().enumerate() {
                entry.write_indexed(n, &mut envelope.fields);
            }
            envelope
        }
        Err(e) => envelope
            .with("error", STATS_FAILURE)
            .with("errorMessage", e.to_string())
            .with("numentries", 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::correlation::{event_queue, Inbox};
    use crate::port::live_backend::mocks::RecordingLive;
    use crate::port::user_directory::mocks::StaticUserDirectory;
    use crate::port::SequentialIdProvider;
    use tokio::runtime::Handle;

    fn player() -> UserId {
        UserId::new(3)
    }

    fn offline() -> UserId {
        UserId::new(4)
    }

    fn service() -> (LiveService, Arc<RecordingLive>, Inbox) {
        let mut online = UserProfile::new(player(), "Online");
        online.privileges = vec![Privilege::MultiplayerSessions.code()];
        let mut no_live = UserProfile::new(offline(), "Offline");
        no_live.live_context = false;

        let live = Arc::new(RecordingLive::new());
        let directory = Arc::new(StaticUserDirectory::new(vec![online, no_live]));
        let (events, inbox) = event_queue();
        let issuer = AsyncIssuer::new(
            Arc::new(SequentialIdProvider::new()),
            events,
            Handle::current(),
        );
        (LiveService::new(live.clone(), directory, issuer), live, inbox)
    }

    #[tokio::test]
    async fn test_achievement_progress_sentinels() {
        let (service, _, inbox) = service();
        let invalid = service
            .achievements_set_progress(UserId::new(99), "1", 50)
            .unwrap_err();
        assert_eq!(invalid.sentinel(), -1);
        let no_context = service
            .achievements_set_progress(offline(), "1", 50)
            .unwrap_err();
        assert_eq!(no_context.sentinel(), -2);
        assert!(service.achievements_set_progress(player(), "1", 101).is_err());
        assert_eq!(inbox.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_achievement_progress_and_info() {
        let (service, _, mut inbox) = service();
        let id = service.achievements_set_progress(player(), "7", 100).unwrap();
        let result = inbox.recv().await.unwrap();
        assert_eq!(result.get_str("event_type"), Some(ACHIEVEMENT_RESULT_EVENT));
        assert_eq!(result.request_id(), Some(id));
        assert_eq!(result.get_i64("error"), Some(0));

        service.achievements_set_progress(player(), "7", 100).unwrap();
        let again = inbox.recv().await.unwrap();
        assert_eq!(
            again.get_i64("error"),
            Some(crate::domain::ACHIEVEMENT_ALREADY_UNLOCKED)
        );

        let info_id = service.get_achievement(player(), "7").unwrap();
        let info = inbox.recv().await.unwrap();
        assert_eq!(info.get_str("event_type"), Some(ACHIEVEMENT_INFO_EVENT));
        assert_eq!(info.request_id(), Some(info_id));
        assert_eq!(info.get_i64("progress_state"), Some(ProgressState::Achieved as i64));
        assert_eq!(info.get_i64("userID"), Some(3));
    }

    #[tokio::test]
    async fn test_check_privilege() {
        let (service, _, mut inbox) = service();
        service
            .check_privilege(player(), Privilege::MultiplayerSessions, false)
            .unwrap();
        let granted = inbox.recv().await.unwrap();
        assert_eq!(granted.get_str("event_type"), Some(PRIVILEGE_RESULT_EVENT));
        assert_eq!(granted.get_i64("result"), Some(0));
        assert_eq!(granted.get_i64("privilege"), Some(254));

        service
            .check_privilege(player(), Privilege::Communications, true)
            .unwrap();
        let restricted = inbox.recv().await.unwrap();
        assert_ne!(restricted.get_i64("result"), Some(0));
    }

    #[tokio::test]
    async fn test_setup_required() {
        let (service, live, mut inbox) = service();
        assert!(service.fire_event("PlayerSessionStart", vec![]).is_err());
        assert!(service
            .read_player_leaderboard("board", player(), 10, AchievementFilter::AllPlayers)
            .is_err());
        assert!(service
            .set_rich_presence(player(), true, "Playing", None)
            .is_err());

        assert_eq!(service.stats_title_id().unwrap(), None);
        service.stats_setup(player(), "scid-1", 0xFFFF_FFFF).unwrap();
        assert_eq!(service.stats_title_id().unwrap(), Some(0xFFFF_FFFF));
        service
            .fire_event("PlayerSessionStart", vec![Value::from(1)])
            .unwrap();
        service
            .set_rich_presence(player(), true, "Playing", None)
            .unwrap();
        let id = service
            .read_player_leaderboard("board", player(), 10, AchievementFilter::AllPlayers)
            .unwrap();

        let board = inbox.recv().await.unwrap();
        assert_eq!(board.request_id(), Some(id));
        assert_eq!(board.get_i64("id"), Some(AchievementMessageType::LeaderboardInfo.code()));
        assert_eq!(board.get_str("leaderboardid"), Some("board"));
        assert_eq!(board.get_i64("numentries"), Some(1));
        assert_eq!(board.get_i64("Rank0"), Some(1));

        assert_eq!(live.events.lock().unwrap().len(), 1);
        assert_eq!(live.presence.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stats_manager_lifecycle() {
        let (service, live, mut inbox) = service();
        assert!(service.stats_set_stat_int(player(), "kills", 1).is_err());

        let added = service.stats_add_user(player()).unwrap();
        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.get_str("event"), Some("LocalUserAdded"));
        assert_eq!(envelope.request_id(), Some(added));
        assert!(matches!(
            service.stats_add_user(player()),
            Err(AppError::Conflict(_))
        ));

        service.stats_set_stat_int(player(), "kills", 12).unwrap();
        service.stats_set_stat_real(player(), "accuracy", 0.5).unwrap();
        service.stats_set_stat_string(player(), "title", "ace").unwrap();
        assert!(service.stats_set_stat_int(player(), "bad name", 1).is_err());
        assert_eq!(
            service.stats_get_stat_names(player()).unwrap(),
            vec!["accuracy", "kills", "title"]
        );
        assert_eq!(
            service.stats_get_stat(player(), "kills").unwrap(),
            Some(StatValue::Int(12))
        );

        service.stats_delete_stat(player(), "title").unwrap();
        assert!(service.stats_delete_stat(player(), "title").is_err());

        let flush = service.stats_flush_user(player(), true).unwrap();
        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.get_str("event"), Some("StatisticUpdateComplete"));
        assert_eq!(envelope.request_id(), Some(flush));
        assert_eq!(envelope.get_i64("error"), Some(0));
        assert_eq!(live.flushed.lock().unwrap()[&player()].len(), 2);

        let board = service
            .stats_get_leaderboard(player(), "kills", 5, 0, false, false)
            .unwrap();
        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.get_str("event"), Some("GetLeaderboardComplete"));
        assert_eq!(envelope.request_id(), Some(board));
        assert_eq!(envelope.get_i64("numentries"), Some(1));
        assert_eq!(envelope.get_f64("Score0"), Some(12.0));

        service.stats_remove_user(player()).unwrap();
        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.get_str("event"), Some("LocalUserRemoved"));
        assert!(service.stats_get_stat_names(player()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_leaderboard_failure_carries_message() {
        let (service, _, mut inbox) = service();
        service.stats_add_user(player()).unwrap();
        inbox.recv().await.unwrap();

        service
            .stats_get_social_leaderboard(player(), "unknown", 5, 0, false, false, true)
            .unwrap();
        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.get_i64("error"), Some(-1));
        assert!(envelope.get_str("errorMessage").is_some());
        assert!(service
            .stats_get_leaderboard(player(), "kills", 5, 3, true, false)
            .is_err());
    }

    #[tokio::test]
    async fn test_flush_all() {
        let (service, live, mut inbox) = service();
        service.stats_add_user(player()).unwrap();
        inbox.recv().await.unwrap();
        service.stats_set_stat_int(player(), "wins", 3).unwrap();

        assert_eq!(service.flush_all().await.unwrap(), 1);
        assert_eq!(
            live.flushed.lock().unwrap()[&player()].get("wins"),
            Some(&StatValue::Int(3))
        );
        assert_eq!(inbox.pending_len(), 0);
    }
}
