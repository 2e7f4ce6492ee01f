mod utils;

use santabot::conversation::ConversationState;
use santabot::game::models::GameStatus;
use santabot::game::repository::GameRepository;

use utils::{date_in_days, setup};

// ============================================================================
// End-to-end scenarios driven through the inbound event surface only
// ============================================================================

#[tokio::test]
async fn test_three_player_game_start_to_finish() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Super Game", "Alice", "warm socks").await;
    assert_eq!(game.status, GameStatus::Recruiting);
    let code = game.invite_code.clone().expect("no invite code issued");

    // The creator's confirmation carries the join link
    let confirmation = harness.last_text(1).await;
    assert!(confirmation.contains("Super Game"));
    assert!(confirmation.contains(&format!("https://t.me/santa_bot?start={}", code)));

    harness.join_game_flow(2, &code, "Bob", "a good book").await;
    harness.join_game_flow(3, &code, "Carol", "tea").await;

    // Creator pushes the start button
    harness.callback(1, &format!("start:{}", game.id)).await;

    let started = harness.only_game().await;
    assert_eq!(started.status, GameStatus::InProgress);

    let pairings = started.pairings();
    assert_eq!(pairings.len(), 3);
    for (giver, receiver) in &pairings {
        assert_ne!(giver, receiver);
    }

    for user_id in 1..=3 {
        assert!(
            started.wishlist_of(user_id).is_some(),
            "wishlist missing for {}",
            user_id
        );

        // Each giver's notification names their giftee
        let giftee = started.giftee_of(user_id).unwrap();
        let giftee_name = started.participant_name(giftee).unwrap();
        let notification = harness.last_text(user_id).await;
        assert!(
            notification.contains(giftee_name),
            "notification for {} lacks giftee name {}",
            user_id,
            giftee_name
        );
    }
}

#[tokio::test]
async fn test_start_now_with_two_players_is_refused() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Tiny Game", "Alice", "socks").await;
    let code = game.invite_code.clone().unwrap();
    harness.join_game_flow(2, &code, "Bob", "a mug").await;

    harness.callback(1, &format!("start:{}", game.id)).await;

    // The creator gets an alert-style answer
    let acks = harness.messenger.acks().await;
    let alert = acks.last().expect("no callback acknowledgement");
    assert!(alert.show_alert);
    assert!(alert
        .text
        .as_deref()
        .unwrap_or_default()
        .contains("At least 3 participants"));

    // No transition, no pairings
    let stored = harness.only_game().await;
    assert_eq!(stored.status, GameStatus::Recruiting);
    assert!(stored.pairings().is_empty());
}

#[tokio::test]
async fn test_start_date_rejections_keep_state() {
    let harness = setup();

    harness.text(1, "/start").await;
    harness.text(1, "Create a game").await;
    harness.text(1, "Picky Game").await;

    // Yesterday: past-date error, still awaiting the start date
    harness.text(1, &date_in_days(-1)).await;
    assert!(harness.last_text(1).await.contains("must be in the future"));
    assert!(matches!(
        harness.state_of(1).await,
        Some(ConversationState::AwaitingStartDate { .. })
    ));

    // Ten days out: too-far error, still awaiting the start date
    harness.text(1, &date_in_days(10)).await;
    assert!(harness.last_text(1).await.contains("within the next 7 days"));
    assert!(matches!(
        harness.state_of(1).await,
        Some(ConversationState::AwaitingStartDate { .. })
    ));

    // Unreadable input: format error
    harness.text(1, "soon").await;
    assert!(harness.last_text(1).await.contains("dd.mm.yyyy"));

    // A valid date finally advances the flow
    harness.text(1, &date_in_days(3)).await;
    assert!(matches!(
        harness.state_of(1).await,
        Some(ConversationState::AwaitingEndDate { .. })
    ));
}

#[tokio::test]
async fn test_cancel_mid_creation_deletes_game() {
    let harness = setup();

    harness.text(1, "/start").await;
    harness.text(1, "Create a game").await;
    harness.text(1, "Doomed Game").await;
    assert_eq!(harness.games.list_games().await.unwrap().len(), 1);

    harness.text(1, "Cancel").await;

    assert!(harness.games.list_games().await.unwrap().is_empty());
    assert!(harness.state_of(1).await.is_none());
    assert!(harness.last_text(1).await.contains("Cancelled"));
}

#[tokio::test]
async fn test_cancel_while_joining_only_removes_the_joiner() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Sturdy Game", "Alice", "socks").await;
    let code = game.invite_code.clone().unwrap();

    harness.text(2, &format!("/start {}", code)).await;
    harness.callback(2, "lang:en").await;
    harness.text(2, "Bob").await;
    let mid_join = harness.only_game().await;
    assert!(mid_join.has_participant(2));

    harness.text(2, "Cancel").await;

    let stored = harness.only_game().await;
    assert_eq!(stored.status, GameStatus::Recruiting);
    assert!(!stored.has_participant(2));
    assert!(stored.has_participant(1));
    assert!(harness.state_of(2).await.is_none());
}

#[tokio::test]
async fn test_resubmitting_a_name_does_not_duplicate_the_participant() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Stable Game", "Alice", "socks").await;

    // Put the creator back on the name question and answer again
    harness
        .states
        .set(
            1,
            ConversationState::AwaitingPlayerName {
                game_id: game.id.clone(),
                is_creator: true,
            },
        )
        .await
        .unwrap();
    harness.text(1, "Alicia").await;

    let stored = harness.only_game().await;
    assert_eq!(stored.participant_count(), 1);
    assert_eq!(stored.participant_name(1), Some("Alicia"));
}

#[tokio::test]
async fn test_unknown_invite_code() {
    let harness = setup();

    harness.text(2, "/start no-such-code").await;

    assert!(harness.last_text(2).await.contains("could not find that game"));
    assert!(harness.state_of(2).await.is_none());
}

#[tokio::test]
async fn test_joining_a_started_game_is_refused() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Prompt Game", "Alice", "socks").await;
    let code = game.invite_code.clone().unwrap();
    harness.join_game_flow(2, &code, "Bob", "a mug").await;
    harness.join_game_flow(3, &code, "Carol", "tea").await;
    harness.callback(1, &format!("start:{}", game.id)).await;

    harness.text(4, &format!("/start {}", code)).await;
    harness.callback(4, "lang:en").await;

    assert!(harness.last_text(4).await.contains("already started"));
    let stored = harness.only_game().await;
    assert!(!stored.has_participant(4));
}

#[tokio::test]
async fn test_new_joiner_picks_language_first() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Polyglot Game", "Alice", "socks").await;
    let code = game.invite_code.clone().unwrap();

    harness.text(2, &format!("/start {}", code)).await;

    // First contact: language selection precedes the join
    assert!(matches!(
        harness.state_of(2).await,
        Some(ConversationState::AwaitingLanguage { .. })
    ));
    let prompt = harness.messenger.messages_for(2).await;
    let buttons: Vec<String> = prompt
        .last()
        .unwrap()
        .options
        .buttons
        .iter()
        .flatten()
        .map(|b| b.data.clone())
        .collect();
    assert!(buttons.contains(&"lang:ru".to_string()));

    harness.callback(2, "lang:ru").await;

    // The join resumed: now awaiting the player name
    assert!(matches!(
        harness.state_of(2).await,
        Some(ConversationState::AwaitingPlayerName { is_creator: false, .. })
    ));
    // And the prompt arrived in the chosen language
    assert!(harness.last_text(2).await.contains("имя"));
}

#[tokio::test]
async fn test_deleting_a_game_notifies_everyone_else() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Short Game", "Alice", "socks").await;
    let code = game.invite_code.clone().unwrap();
    harness.join_game_flow(2, &code, "Bob", "a mug").await;

    // A non-creator cannot delete
    harness.callback(2, &format!("delete:{}", game.id)).await;
    let refusal = harness.messenger.acks().await;
    assert!(refusal.last().unwrap().show_alert);
    assert_eq!(harness.games.list_games().await.unwrap().len(), 1);

    // Leave Bob answering a wishlist prompt for the doomed game
    harness.callback(2, &format!("wishlist:{}", game.id)).await;
    assert!(harness.state_of(2).await.is_some());

    harness.callback(1, &format!("delete:{}", game.id)).await;

    assert!(harness.games.list_games().await.unwrap().is_empty());
    assert!(harness.last_text(2).await.contains("cancelled by its creator"));
    assert!(harness.last_text(1).await.contains("was deleted"));
    // Bob's stale state went with the game
    assert!(harness.state_of(2).await.is_none());
}

#[tokio::test]
async fn test_leaving_a_game() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Roomy Game", "Alice", "socks").await;
    let code = game.invite_code.clone().unwrap();
    harness.join_game_flow(2, &code, "Bob", "a mug").await;

    harness.callback(2, &format!("leave:{}", game.id)).await;

    let stored = harness.only_game().await;
    assert!(!stored.has_participant(2));
    assert!(harness.last_text(2).await.contains("You left"));
}

#[tokio::test]
async fn test_edit_wishlist_starts_blank() {
    let harness = setup();

    let game = harness.create_game_flow(1, "List Game", "Alice", "old wish").await;

    harness.callback(1, &format!("wishlist:{}", game.id)).await;
    harness.text(1, "new wish").await;
    harness.text(1, "Done").await;

    let stored = harness.only_game().await;
    assert_eq!(stored.wishlist_of(1), Some("new wish"));
}

#[tokio::test]
async fn test_anonymous_message_reaches_the_giftee_sanitized() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Chatty Game", "Alice", "socks").await;
    let code = game.invite_code.clone().unwrap();
    harness.join_game_flow(2, &code, "Bob", "a mug").await;
    harness.join_game_flow(3, &code, "Carol", "tea").await;
    harness.callback(1, &format!("start:{}", game.id)).await;

    let started = harness.only_game().await;
    let giftee = started.giftee_of(1).unwrap();

    harness.callback(1, &format!("anon:{}", game.id)).await;
    assert!(matches!(
        harness.state_of(1).await,
        Some(ConversationState::AwaitingAnonymousMessage { .. })
    ));

    harness.text(1, "ho ho <b>ho</b>").await;

    let delivered = harness.last_text(giftee).await;
    assert!(delivered.contains("Your Secret Santa says"));
    assert!(delivered.contains("ho ho &lt;b&gt;ho&lt;/b&gt;"));
    assert!(harness.last_text(1).await.contains("Delivered anonymously"));
    assert!(harness.state_of(1).await.is_none());
}

#[tokio::test]
async fn test_markup_in_names_is_escaped_before_storage() {
    let harness = setup();

    harness.text(1, "/start").await;
    harness.text(1, "Create a game").await;
    harness.text(1, "<script>Game</script>").await;

    let game = harness.only_game().await;
    assert_eq!(game.name, "&lt;script&gt;Game&lt;/script&gt;");
}

#[tokio::test]
async fn test_my_games_lists_only_unfinished_games() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Visible Game", "Alice", "socks").await;
    harness.messenger.clear().await;

    harness.text(1, "My games").await;
    let messages = harness.messenger.texts_for(1).await;
    assert!(messages.iter().any(|m| m.contains("Visible Game")));

    // Once torn down, the list is empty again
    harness.callback(1, &format!("delete:{}", game.id)).await;
    harness.messenger.clear().await;
    harness.text(1, "My games").await;
    assert!(harness.last_text(1).await.contains("not in any running games"));
}

#[tokio::test]
async fn test_view_game_card_shows_details() {
    let harness = setup();

    let game = harness.create_game_flow(1, "Detailed Game", "Alice", "socks").await;
    harness.messenger.clear().await;

    harness.callback(1, &format!("view:{}", game.id)).await;

    let card = harness.last_text(1).await;
    assert!(card.contains("Detailed Game"));
    assert!(card.contains("Alice"));
    assert!(card.contains("recruiting"));
}
