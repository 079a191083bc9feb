use std::{collections::HashMap, fmt::Display};

use chrono::{Datelike, NaiveDate};
use crossbeam::channel::Receiver;
use log::debug;
use queueshare_core::{
    api::StatsApi, ApiError, DayStreams, FriendComparison, Ranking, RankingKind, RankingPeriod,
};
use thiserror::Error;

use crate::{
    store::{Reducer, StateStore},
    CollabContext, Toast,
};

/// How an entry moved compared to the previous period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingChange {
    New,
    Up(u32),
    Down(u32),
    Same,
}

impl RankingChange {
    pub fn of(ranking: &Ranking) -> Self {
        match ranking.previous_position {
            None => Self::New,
            Some(previous) if previous > ranking.position => Self::Up(previous - ranking.position),
            Some(previous) if previous < ranking.position => Self::Down(ranking.position - previous),
            Some(_) => Self::Same,
        }
    }
}

impl Display for RankingChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Up(n) => write!(f, "+{}", n),
            Self::Down(n) => write!(f, "-{}", n),
            Self::Same => write!(f, "="),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub count: u32,
    /// 0 for no streams, up to 4 for the busiest day of the year
    pub intensity: u8,
}

/// A year of listening laid out as a heatmap, one column per week and Monday on top
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarGrid {
    pub year: i32,
    /// Days outside the year are `None`
    pub weeks: Vec<[Option<CalendarCell>; 7]>,
    pub max: u32,
}

impl CalendarGrid {
    pub const LEVELS: u8 = 4;

    /// Lays out the given days, ignoring those outside the year.
    /// Returns `None` if the year can't be represented.
    pub fn new(year: i32, days: &[DayStreams]) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let last = NaiveDate::from_ymd_opt(year, 12, 31)?;

        let mut counts: HashMap<NaiveDate, u32> = HashMap::new();
        for day in days.iter().filter(|d| d.date.year() == year) {
            *counts.entry(day.date).or_default() += day.count;
        }

        let max = counts.values().copied().max().unwrap_or(0);

        let mut weeks = Vec::new();
        let mut week = [None; 7];

        for date in first.iter_days().take_while(|date| *date <= last) {
            let row = date.weekday().num_days_from_monday() as usize;
            let count = counts.get(&date).copied().unwrap_or(0);

            week[row] = Some(CalendarCell {
                date,
                count,
                intensity: intensity(count, max),
            });

            if row == 6 {
                weeks.push(week);
                week = [None; 7];
            }
        }

        if week.iter().any(Option::is_some) {
            weeks.push(week);
        }

        Some(Self { year, weeks, max })
    }

    pub fn total(&self) -> u32 {
        self.cells().map(|cell| cell.count).sum()
    }

    pub fn cells(&self) -> impl Iterator<Item = &CalendarCell> {
        self.weeks.iter().flatten().flatten()
    }
}

fn intensity(count: u32, max: u32) -> u8 {
    if count == 0 || max == 0 {
        return 0;
    }

    let (count, max) = (count as u64, max as u64);
    let levels = CalendarGrid::LEVELS as u64;
    let bucket = (count * levels + max - 1) / max;

    bucket.clamp(1, levels) as u8
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("You need to be logged in to see statistics")]
    NotAuthenticated,
    #[error("{0} is not a valid year")]
    InvalidYear(i32),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The friend picked for a side by side comparison, and how far loading it got
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FriendStatsState {
    pub friend: Option<String>,
    pub comparison: Option<FriendComparison>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FriendStatsAction {
    Selected(String),
    /// Ignored unless `friend` is still the selected one
    Loaded {
        friend: String,
        comparison: FriendComparison,
    },
    Failed {
        friend: String,
        message: String,
    },
    Cleared,
}

pub struct FriendStatsReducer;

impl Reducer for FriendStatsReducer {
    type State = FriendStatsState;
    type Action = FriendStatsAction;

    fn reduce(state: FriendStatsState, action: FriendStatsAction) -> FriendStatsState {
        match action {
            FriendStatsAction::Selected(friend) => FriendStatsState {
                friend: Some(friend),
                comparison: None,
                loading: true,
                error: None,
            },
            FriendStatsAction::Loaded { friend, comparison }
                if state.friend.as_ref() == Some(&friend) =>
            {
                FriendStatsState {
                    comparison: Some(comparison),
                    loading: false,
                    error: None,
                    ..state
                }
            }
            FriendStatsAction::Failed { friend, message }
                if state.friend.as_ref() == Some(&friend) =>
            {
                FriendStatsState {
                    loading: false,
                    error: Some(message),
                    ..state
                }
            }
            FriendStatsAction::Loaded { .. } | FriendStatsAction::Failed { .. } => state,
            FriendStatsAction::Cleared => FriendStatsState::default(),
        }
    }
}

/// The personal statistics of the logged in user.
/// Failed backend calls are toasted and returned.
pub struct StatsBoard {
    context: CollabContext,
    api: StatsApi,
    friend: StateStore<FriendStatsReducer>,
}

impl StatsBoard {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            api: StatsApi::new(&context.client),
            friend: StateStore::default(),
        }
    }

    pub async fn rankings(
        &self,
        kind: RankingKind,
        period: RankingPeriod,
    ) -> Result<Vec<Ranking>, StatsError> {
        let token = self.token()?;

        self.api
            .rankings(&token, kind, period)
            .await
            .map_err(|e| self.toasted(e))
    }

    pub async fn calendar(&self, year: i32) -> Result<CalendarGrid, StatsError> {
        let token = self.token()?;

        if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
            return Err(StatsError::InvalidYear(year));
        }

        let days = self
            .api
            .calendar(&token, year)
            .await
            .map_err(|e| self.toasted(e))?;

        CalendarGrid::new(year, &days).ok_or(StatsError::InvalidYear(year))
    }

    /// Selects a friend and loads their rankings next to the user's own
    pub async fn compare(&self, username: &str) -> Result<FriendComparison, StatsError> {
        let token = self.token()?;
        let friend = username.to_string();

        self.friend
            .dispatch(FriendStatsAction::Selected(friend.clone()));

        match self.api.compare(&token, username).await {
            Ok(comparison) => {
                self.friend.dispatch(FriendStatsAction::Loaded {
                    friend,
                    comparison: comparison.clone(),
                });
                Ok(comparison)
            }
            Err(e) => {
                debug!("Comparison with {} failed: {}", username, e);
                self.friend.dispatch(FriendStatsAction::Failed {
                    friend,
                    message: e.to_string(),
                });
                Err(self.toasted(e))
            }
        }
    }

    pub fn friend(&self) -> FriendStatsState {
        self.friend.state()
    }

    pub fn subscribe_friend(&self) -> Receiver<FriendStatsState> {
        self.friend.subscribe()
    }

    pub fn clear_friend(&self) {
        self.friend.dispatch(FriendStatsAction::Cleared);
    }

    fn token(&self) -> Result<String, StatsError> {
        self.context
            .auth
            .token()
            .ok_or(StatsError::NotAuthenticated)
    }

    fn toasted(&self, error: ApiError) -> StatsError {
        self.context.toast(Toast::error(&error));
        StatsError::Api(error)
    }
}
