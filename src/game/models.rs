use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use uuid::Uuid;

use super::pairing::{self, PairingError};

/// Maximum length of a game name after trimming
pub const MAX_GAME_NAME_CHARS: usize = 100;
/// Maximum total length of one participant's wishlist
pub const MAX_WISHLIST_CHARS: usize = 2000;
/// A game cannot start with fewer participants than this
pub const MIN_PARTICIPANTS: usize = 3;
/// The start date may be at most this many days ahead of today
pub const MAX_START_DAYS_AHEAD: i64 = 7;

/// Game lifecycle status. The derived ordering is the lifecycle order;
/// transitions only ever move forward.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Creating,
    Recruiting,
    InProgress,
    Finished,
}

/// Why a submitted game date was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("start date is not in the future")]
    StartNotInFuture,

    #[error("start date is more than 7 days ahead")]
    StartTooFarAhead,

    #[error("end date is not after the start date")]
    EndNotAfterStart,

    #[error("end date is more than three months after the start date")]
    EndTooFarAfterStart,

    #[error("start date must be set before the end date")]
    StartDateMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("invalid transition from status {from}")]
    InvalidTransition { from: GameStatus },

    #[error("user {0} is not a participant")]
    NotParticipant(i64),

    #[error("wishlist would exceed the length cap")]
    WishlistTooLong,

    #[error("pairing failed: {0}")]
    Pairing(#[from] PairingError),
}

/// What a start attempt produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Pairings drawn, game is in progress
    Launched,
    /// Fewer than 3 participants: status forced to Finished with empty
    /// pairings. The caller must tear the game down, not run it.
    Aborted,
}

/// One participant row of a game: the name snapshot for this game's context
/// plus the wishlist and, once the game starts, the assigned giftee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: i64,
    pub name: String,
    pub wishlist: Option<String>,
    pub giftee_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameModel {
    pub id: String,
    pub name: String,
    pub invite_code: Option<String>,
    pub creator_id: i64,
    pub status: GameStatus,
    pub participants: HashMap<i64, Participant>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl GameModel {
    /// Creates a game in the Creating status with a generated id
    pub fn new(name: String, creator_id: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            invite_code: None,
            creator_id,
            status: GameStatus::Creating,
            participants: HashMap::new(),
            start_date: None,
            end_date: None,
        }
    }

    /// Sets the start date. Must be strictly after `today` and at most
    /// 7 days out.
    pub fn set_start_date(&mut self, date: NaiveDate, today: NaiveDate) -> Result<(), DateError> {
        if date <= today {
            return Err(DateError::StartNotInFuture);
        }
        if date > today + chrono::Duration::days(MAX_START_DAYS_AHEAD) {
            return Err(DateError::StartTooFarAhead);
        }
        self.start_date = Some(date);
        Ok(())
    }

    /// Sets the end date. Must be strictly after the start date and at most
    /// 3 months after it.
    pub fn set_end_date(&mut self, date: NaiveDate) -> Result<(), DateError> {
        let start = self.start_date.ok_or(DateError::StartDateMissing)?;
        if date <= start {
            return Err(DateError::EndNotAfterStart);
        }
        let limit = start
            .checked_add_months(Months::new(3))
            .ok_or(DateError::EndTooFarAfterStart)?;
        if date > limit {
            return Err(DateError::EndTooFarAfterStart);
        }
        self.end_date = Some(date);
        Ok(())
    }

    /// Adds a participant, or updates the name snapshot if the id is already
    /// present. Wishlist and pairing data survive a re-add.
    pub fn add_participant(&mut self, user_id: i64, name: String) {
        self.participants
            .entry(user_id)
            .and_modify(|p| p.name = name.clone())
            .or_insert(Participant {
                user_id,
                name,
                wishlist: None,
                giftee_id: None,
            });
    }

    /// Removes a participant together with their wishlist.
    /// Returns false if the user was not in the game.
    pub fn remove_participant(&mut self, user_id: i64) -> bool {
        self.participants.remove(&user_id).is_some()
    }

    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participants.contains_key(&user_id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn participant_name(&self, user_id: i64) -> Option<&str> {
        self.participants.get(&user_id).map(|p| p.name.as_str())
    }

    pub fn wishlist_of(&self, user_id: i64) -> Option<&str> {
        self.participants
            .get(&user_id)
            .and_then(|p| p.wishlist.as_deref())
    }

    /// The id of the participant this user gives a gift to, once started
    pub fn giftee_of(&self, user_id: i64) -> Option<i64> {
        self.participants.get(&user_id).and_then(|p| p.giftee_id)
    }

    /// The pairings map (giver id -> receiver id); empty until started
    pub fn pairings(&self) -> HashMap<i64, i64> {
        self.participants
            .values()
            .filter_map(|p| p.giftee_id.map(|giftee| (p.user_id, giftee)))
            .collect()
    }

    /// Appends one line to a participant's wishlist, enforcing the total cap
    pub fn append_wishlist_line(&mut self, user_id: i64, line: &str) -> Result<(), GameError> {
        let participant = self
            .participants
            .get_mut(&user_id)
            .ok_or(GameError::NotParticipant(user_id))?;

        let updated = match participant.wishlist.as_deref() {
            Some(existing) => format!("{}\n{}", existing, line),
            None => line.to_string(),
        };
        if updated.chars().count() > MAX_WISHLIST_CHARS {
            return Err(GameError::WishlistTooLong);
        }
        participant.wishlist = Some(updated);
        Ok(())
    }

    pub fn clear_wishlist(&mut self, user_id: i64) -> Result<(), GameError> {
        let participant = self
            .participants
            .get_mut(&user_id)
            .ok_or(GameError::NotParticipant(user_id))?;
        participant.wishlist = None;
        Ok(())
    }

    /// Issues the invite code and moves the game into recruiting
    pub fn open_recruiting(&mut self, invite_code: String) -> Result<(), GameError> {
        if self.status != GameStatus::Creating {
            return Err(GameError::InvalidTransition { from: self.status });
        }
        self.invite_code = Some(invite_code);
        self.status = GameStatus::Recruiting;
        Ok(())
    }

    /// Attempts to start the game.
    ///
    /// With fewer than 3 participants the game moves straight to Finished
    /// with empty pairings and `Aborted` is returned. Otherwise a fresh
    /// derangement over the participant ids is drawn and stored, and the
    /// game moves to InProgress.
    pub fn start(&mut self) -> Result<StartOutcome, GameError> {
        if self.status >= GameStatus::InProgress {
            return Err(GameError::InvalidTransition { from: self.status });
        }

        if self.participant_count() < MIN_PARTICIPANTS {
            self.status = GameStatus::Finished;
            return Ok(StartOutcome::Aborted);
        }

        let mut ids: Vec<i64> = self.participants.keys().copied().collect();
        ids.sort_unstable();
        let pairs = pairing::assign_pairs(&ids)?;

        for participant in self.participants.values_mut() {
            participant.giftee_id = pairs.get(&participant.user_id).copied();
        }
        self.status = GameStatus::InProgress;
        Ok(StartOutcome::Launched)
    }

    /// Ends a running game
    pub fn finish(&mut self) -> Result<(), GameError> {
        if self.status != GameStatus::InProgress {
            return Err(GameError::InvalidTransition { from: self.status });
        }
        self.status = GameStatus::Finished;
        Ok(())
    }
}

/// Trims a submitted game name and validates the length bound
pub fn validate_game_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_GAME_NAME_CHARS {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn game_with_participants(count: usize) -> GameModel {
        let mut game = GameModel::new("Test Game".to_string(), 1);
        for i in 0..count {
            game.add_participant(i as i64 + 1, format!("Player {}", i + 1));
        }
        game
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_ordering_matches_lifecycle() {
        assert!(GameStatus::Creating < GameStatus::Recruiting);
        assert!(GameStatus::Recruiting < GameStatus::InProgress);
        assert!(GameStatus::InProgress < GameStatus::Finished);
    }

    #[test]
    fn test_start_with_enough_participants() {
        let mut game = game_with_participants(3);
        game.open_recruiting("code".to_string()).unwrap();

        let outcome = game.start().unwrap();

        assert_eq!(outcome, StartOutcome::Launched);
        assert_eq!(game.status, GameStatus::InProgress);
        let pairings = game.pairings();
        assert_eq!(pairings.len(), 3);
        for (giver, receiver) in &pairings {
            assert_ne!(giver, receiver);
            assert!(game.has_participant(*receiver));
        }
    }

    #[test]
    fn test_start_with_too_few_participants_aborts() {
        let mut game = game_with_participants(2);
        game.open_recruiting("code".to_string()).unwrap();

        let outcome = game.start().unwrap();

        assert_eq!(outcome, StartOutcome::Aborted);
        assert_eq!(game.status, GameStatus::Finished);
        assert!(game.pairings().is_empty());
    }

    #[test]
    fn test_status_never_moves_backward() {
        let mut game = game_with_participants(3);
        game.open_recruiting("code".to_string()).unwrap();
        game.start().unwrap();
        game.finish().unwrap();

        assert!(matches!(
            game.start(),
            Err(GameError::InvalidTransition { .. })
        ));
        assert!(matches!(
            game.finish(),
            Err(GameError::InvalidTransition { .. })
        ));
        assert!(matches!(
            game.open_recruiting("other".to_string()),
            Err(GameError::InvalidTransition { .. })
        ));
        assert_eq!(game.status, GameStatus::Finished);
    }

    #[test]
    fn test_finish_requires_in_progress() {
        let mut game = game_with_participants(3);
        assert!(matches!(
            game.finish(),
            Err(GameError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_add_participant_is_idempotent() {
        let mut game = game_with_participants(0);
        game.add_participant(5, "First".to_string());
        game.append_wishlist_line(5, "socks").unwrap();
        game.add_participant(5, "Renamed".to_string());

        assert_eq!(game.participant_count(), 1);
        assert_eq!(game.participant_name(5), Some("Renamed"));
        // Wishlist survives the name update
        assert_eq!(game.wishlist_of(5), Some("socks"));
    }

    #[test]
    fn test_remove_participant_drops_wishlist() {
        let mut game = game_with_participants(1);
        game.append_wishlist_line(1, "a book").unwrap();

        assert!(game.remove_participant(1));
        assert!(!game.has_participant(1));
        assert!(!game.remove_participant(1));
    }

    #[rstest]
    #[case(date(2026, 12, 2), Ok(()))]
    #[case(date(2026, 12, 8), Ok(()))]
    #[case(date(2026, 12, 1), Err(DateError::StartNotInFuture))]
    #[case(date(2026, 11, 30), Err(DateError::StartNotInFuture))]
    #[case(date(2026, 12, 9), Err(DateError::StartTooFarAhead))]
    fn test_start_date_validation(#[case] submitted: NaiveDate, #[case] expected: Result<(), DateError>) {
        let mut game = game_with_participants(0);
        assert_eq!(game.set_start_date(submitted, today()), expected);
    }

    #[rstest]
    #[case(date(2026, 12, 6), Ok(()))]
    #[case(date(2027, 3, 5), Ok(()))]
    #[case(date(2026, 12, 5), Err(DateError::EndNotAfterStart))]
    #[case(date(2026, 12, 4), Err(DateError::EndNotAfterStart))]
    #[case(date(2027, 3, 6), Err(DateError::EndTooFarAfterStart))]
    fn test_end_date_validation(#[case] submitted: NaiveDate, #[case] expected: Result<(), DateError>) {
        let mut game = game_with_participants(0);
        game.set_start_date(date(2026, 12, 5), today()).unwrap();
        assert_eq!(game.set_end_date(submitted), expected);
    }

    #[test]
    fn test_end_date_requires_start_date() {
        let mut game = game_with_participants(0);
        assert_eq!(
            game.set_end_date(date(2026, 12, 6)),
            Err(DateError::StartDateMissing)
        );
    }

    #[test]
    fn test_wishlist_cap() {
        let mut game = game_with_participants(1);
        game.append_wishlist_line(1, &"x".repeat(1990)).unwrap();

        // 1990 + newline + 10 > 2000
        assert_eq!(
            game.append_wishlist_line(1, &"y".repeat(10)),
            Err(GameError::WishlistTooLong)
        );
        // The failed append must not have changed the wishlist
        assert_eq!(game.wishlist_of(1).unwrap().chars().count(), 1990);

        game.append_wishlist_line(1, &"y".repeat(9)).unwrap();
        assert_eq!(game.wishlist_of(1).unwrap().chars().count(), 2000);
    }

    #[test]
    fn test_wishlist_requires_membership() {
        let mut game = game_with_participants(0);
        assert_eq!(
            game.append_wishlist_line(9, "socks"),
            Err(GameError::NotParticipant(9))
        );
    }

    #[test]
    fn test_validate_game_name() {
        assert_eq!(
            validate_game_name("  Super Game  "),
            Some("Super Game".to_string())
        );
        assert_eq!(validate_game_name("   "), None);
        assert_eq!(validate_game_name(&"x".repeat(101)), None);
    }
}
