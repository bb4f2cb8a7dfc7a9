//! Initial collection catalog.
//!
//! Registers the official collections the service launches with. Running
//! the seed against a store that already knows a mint authority skips that
//! collection, so it is safe to repeat.

use super::store::{CatalogStore, NewCollection, StoreError};

/// `(name, description, mint authority)` of every seeded collection.
pub const INITIAL_COLLECTIONS: [(&str, &str, &str); 4] = [
    (
        "Solana Ecosystem Calls",
        concat!(
            "Superteam Ecosystem Collectables - These collectibles help track attendance ",
            "to the Superteam ecosystem call."
        ),
        "5b4ZfyhVEuHEiUWzoWPrQqvhWD3WLyktPpQm2xs2CnyJ",
    ),
    (
        "dVIN Labs",
        "Collections of Digital Cork NFTs, each the digital twin for a bottle of wine.",
        "pkVjxuNte1SqdwjvP28pbcgUcmLAWay9PiuLDCKMjyb",
    ),
    (
        "Dilli Hackerhouse",
        "Solana Foundation x Jump Hacker House, New Delhi souvenir.",
        "59UiKc91dGyHy2n5N6CnGHV9SVsujBHCitEQixk5G6GK",
    ),
    (
        "$SILLY Dragon in Dubai",
        "NFT Night with SuperTeamUAE at Founders Villa.",
        "BKn45YvZfgQM6AQ3te4maGkFSMTVZibKyCxxqh6AWcUL",
    ),
];

/// Seeds [`INITIAL_COLLECTIONS`], returning how many were created.
///
/// # Errors
///
/// Returns the first store error other than an already-registered
/// mint authority.
pub async fn seed_initial_collections(store: &dyn CatalogStore) -> Result<usize, StoreError> {
    let mut created = 0;
    for (name, description, mint_authority) in INITIAL_COLLECTIONS {
        let result = store
            .create_collection(NewCollection {
                name: name.to_string(),
                description: Some(description.to_string()),
                mint_authority: Some(mint_authority.to_string()),
            })
            .await;
        match result {
            Ok(collection) => {
                created += 1;
                tracing::info!(collection_id = %collection.id, name, "seeded collection");
            }
            Err(StoreError::Conflict(_)) => {
                tracing::debug!(name, "collection already present; skipping");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(created)
}
