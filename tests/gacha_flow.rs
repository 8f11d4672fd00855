use rand::SeedableRng;
use rand::rngs::StdRng;

use taverna_gacha::game::catalog::{Catalog, CatalogItem, Rarity};
use taverna_gacha::game::draw::DrawOutcome;
use taverna_gacha::game::session::{Commit, LoginError, PlayerSession, login, open_profile_session};
use taverna_gacha::storage::local_state::PlayerStateBlob;
use taverna_gacha::storage::reconcile::{PersistJob, persist_balance, persist_delta};
use taverna_gacha::storage::repo::{DRINK_ITEM_TYPE, ProfileStore};
use taverna_gacha::storage::retry::RetryPolicy;
use taverna_gacha::storage::sqlite_repo::SqliteProfileStore;

const COST: u32 = 25;

fn five_item_catalog() -> Catalog {
    let items = ["x", "y", "z", "w", "v"]
        .into_iter()
        .map(|id| CatalogItem {
            id: id.into(),
            name: format!("Drink {}", id.to_uppercase()),
            image_ref: format!("drinks/{id}.png"),
            health: 10,
            thirst: 10,
            rarity: Rarity::Common,
            phrases: vec!["Cheers!".into()],
        })
        .collect();
    Catalog::new(items).unwrap()
}

fn fresh_session(catalog: &Catalog, no_reward_percent: f64) -> PlayerSession {
    PlayerSession::offline(PlayerStateBlob::fresh(100), catalog, no_reward_percent).0
}

/// First seed whose next `wins` spins all land on `target`.
fn seed_winning(catalog: &Catalog, target: &str, wins: usize) -> u64 {
    (0..10_000)
        .find(|&seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut session = fresh_session(catalog, 0.0);
            (0..wins).all(|_| {
                let (outcome, _) = session.spin(COST, catalog, &mut rng).unwrap();
                session.settle();
                outcome.item().is_some_and(|item| item.id == target)
            })
        })
        .expect("a seed with the wanted wins")
}

#[test]
fn losing_spin_debits_once_and_keeps_inventory() {
    // given
    let catalog = five_item_catalog();
    let mut session = fresh_session(&catalog, 100.0);
    let mut rng = StdRng::seed_from_u64(1);

    // when
    let (outcome, _) = session.spin(COST, &catalog, &mut rng).unwrap();
    let (_, commit) = session.settle().unwrap();

    // then
    assert_eq!(outcome, DrawOutcome::NoReward);
    assert_eq!(session.wallet().balance, 75);
    assert!(session.inventory().is_empty());
    assert!(session.inventory().collection().is_empty());
    assert_eq!(commit, Commit::Nothing);
}

#[test]
fn winning_spin_adds_single_entry() {
    let catalog = five_item_catalog();
    let seed = seed_winning(&catalog, "x", 1);
    let mut session = fresh_session(&catalog, 0.0);
    let mut rng = StdRng::seed_from_u64(seed);

    session.spin(COST, &catalog, &mut rng).unwrap();
    let (_, commit) = session.settle().unwrap();

    assert_eq!(session.wallet().balance, 75);
    assert_eq!(session.inventory().entries().len(), 1);
    assert_eq!(session.inventory().quantity_of("x"), 1);
    assert_eq!(
        session.inventory().collection().iter().collect::<Vec<_>>(),
        vec!["x"]
    );
    match commit {
        Commit::SaveLocal(blob) => {
            assert_eq!(blob.coins, 75);
            assert_eq!(blob.drinks.len(), 1);
        }
        other => panic!("expected a local save, got {other:?}"),
    }
}

#[test]
fn second_win_of_same_item_stacks() {
    let catalog = five_item_catalog();
    let seed = seed_winning(&catalog, "x", 2);
    let mut session = fresh_session(&catalog, 0.0);
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..2 {
        session.spin(COST, &catalog, &mut rng).unwrap();
        session.settle().unwrap();
    }

    assert_eq!(session.wallet().balance, 50);
    assert_eq!(session.inventory().entries().len(), 1);
    assert_eq!(session.inventory().quantity_of("x"), 2);
    assert_eq!(session.inventory().collection().len(), 1);
}

#[test]
fn offline_save_reloads_into_same_state() {
    let catalog = five_item_catalog();
    let seed = seed_winning(&catalog, "y", 1);
    let mut session = fresh_session(&catalog, 0.0);
    let mut rng = StdRng::seed_from_u64(seed);
    session.spin(COST, &catalog, &mut rng).unwrap();
    session.settle().unwrap();

    let (reloaded, misses) = PlayerSession::offline(session.to_blob(), &catalog, 40.0);

    assert!(misses.is_empty());
    assert_eq!(reloaded.wallet(), session.wallet());
    assert_eq!(reloaded.inventory(), session.inventory());
}

#[tokio::test]
async fn unknown_username_creates_no_session() {
    let store = SqliteProfileStore::in_memory().await.unwrap();

    let result = login(&store, "ghost").await;

    assert!(matches!(result, Err(LoginError::UserNotFound)));
    assert_eq!(result.unwrap_err().to_string(), "user not found");
    assert!(store.find_profile_by_username("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn profile_session_persists_through_store() {
    // given a seeded player on the sqlite store
    let catalog = five_item_catalog();
    let store = SqliteProfileStore::in_memory().await.unwrap();
    store.create_profile("wonho1919", 100).await.unwrap();
    let policy = RetryPolicy::default();
    let seed = seed_winning(&catalog, "z", 2);
    let mut rng = StdRng::seed_from_u64(seed);

    let profile = login(&store, "WonHo1919").await.unwrap();
    let (mut session, _) = open_profile_session(&store, profile.clone(), &catalog, 0.0)
        .await
        .unwrap();

    // when two spins are paid and settled, flushing every queued write
    for _ in 0..2 {
        let (_, paid) = session.spin(COST, &catalog, &mut rng).unwrap();
        let (_, won) = session.settle().unwrap();
        for commit in [paid, won] {
            let Commit::Remote(jobs) = commit else {
                panic!("profile sessions write remotely");
            };
            for job in jobs {
                match job {
                    PersistJob::Balance { owner_id, balance } => {
                        persist_balance(&store, &owner_id, balance, &policy).await.unwrap();
                    }
                    PersistJob::Item { owner_id, delta } => {
                        persist_delta(&store, &owner_id, &delta, &policy).await.unwrap();
                    }
                }
            }
        }
    }

    // then the store agrees with the session
    assert_eq!(store.get_balance(&profile.id).await.unwrap(), 50);
    let rows = store.list_items(&profile.id, DRINK_ITEM_TYPE).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].item_name, "z");
    assert_eq!(rows[0].quantity, 2);

    let (reopened, _) = open_profile_session(&store, profile, &catalog, 40.0).await.unwrap();
    assert_eq!(reopened.wallet(), session.wallet());
    assert_eq!(reopened.inventory(), session.inventory());
}
