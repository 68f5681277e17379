//! Workshop runs and their configuration.
//!
//! Each scheduled run has its own song program and price table. The directory
//! is loaded once at startup, either from the built-in defaults or from a
//! JSON file named by `WORKSHOPS_FILE`, and validated before the server will
//! serve a single quote.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::pricing::{PricingPolicy, SongPricing, Tier};

/// One song on a workshop's program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub name: String,
    pub style: String,
    /// Display slot for the registration form, e.g. "12:00 PM - 2:00 PM".
    #[serde(default)]
    pub time_slot: Option<String>,
}

/// One scheduled workshop run, with its own registrant pool and price table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    pub id: String,
    pub title: String,
    pub choreographer: String,
    pub songs: Vec<Song>,
    pub pricing: PricingPolicy,
}

impl Workshop {
    pub fn song_ids(&self) -> Vec<String> {
        self.songs.iter().map(|song| song.id.clone()).collect()
    }

    pub fn has_song(&self, id: &str) -> bool {
        self.songs.iter().any(|song| song.id == id)
    }

    /// Checks a sub-combo selection: every id must come from this run's
    /// program and no song may be picked twice.
    pub fn check_selection(&self, selection: &[String]) -> ApiResult<()> {
        for (index, song) in selection.iter().enumerate() {
            if !self.has_song(song) {
                return Err(ApiError::BadRequest(format!(
                    "Unknown song for this workshop: {}",
                    song
                )));
            }
            if selection[..index].contains(song) {
                return Err(ApiError::BadRequest(format!(
                    "Song selected more than once: {}",
                    song
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopDirectory {
    /// The run new registrations land on when the client names none.
    pub default_workshop: String,
    pub workshops: Vec<Workshop>,
}

impl WorkshopDirectory {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("couldn't read workshop config at {}", path.display()))?;
        let directory: Self = serde_json::from_str(&raw)
            .with_context(|| format!("couldn't parse workshop config at {}", path.display()))?;

        directory.validate()?;
        Ok(directory)
    }

    /// The two observed runs, used when no `WORKSHOPS_FILE` is configured.
    pub fn builtin() -> Self {
        WorkshopDirectory {
            default_workshop: "bollywood-masala-2025".into(),
            workshops: vec![
                Workshop {
                    id: "bollywood-masala-2025".into(),
                    title: "Bollywood Masala".into(),
                    choreographer: "Vikas Paudel".into(),
                    songs: vec![
                        Song {
                            id: "sajda".into(),
                            name: "Sajda".into(),
                            style: "Hip Hop Fusion".into(),
                            time_slot: Some("12:00 PM - 2:00 PM".into()),
                        },
                        Song {
                            id: "apsara-aali".into(),
                            name: "Apsara Aali".into(),
                            style: "Contemporary".into(),
                            time_slot: Some("2:30 PM - 5:30 PM".into()),
                        },
                        Song {
                            id: "piya-ghar-aayenge".into(),
                            name: "Piya Ghar Aayenge".into(),
                            style: "Bollywood".into(),
                            time_slot: Some("6:00 PM - 8:00 PM".into()),
                        },
                    ],
                    pricing: PricingPolicy {
                        early_bird_limit: 30,
                        per_song: SongPricing::PerSong {
                            base: Tier {
                                early_bird: 1000,
                                regular: 1200,
                            },
                            premium: Tier {
                                early_bird: 1200,
                                regular: 1400,
                            },
                            premium_song: "apsara-aali".into(),
                        },
                        combo: Tier::flat(3000),
                        combo_early_bird: false,
                    },
                },
                Workshop {
                    id: "monsoon-groove-2024".into(),
                    title: "Monsoon Groove".into(),
                    choreographer: "Ritika Sahu".into(),
                    songs: vec![
                        Song {
                            id: "jhoome-jo-pathaan".into(),
                            name: "Jhoome Jo Pathaan".into(),
                            style: "Bollywood Hip Hop".into(),
                            time_slot: Some("11:00 AM - 1:00 PM".into()),
                        },
                        Song {
                            id: "kesariya".into(),
                            name: "Kesariya".into(),
                            style: "Semi-Classical".into(),
                            time_slot: Some("2:00 PM - 4:00 PM".into()),
                        },
                        Song {
                            id: "malang".into(),
                            name: "Malang".into(),
                            style: "Contemporary".into(),
                            time_slot: Some("5:00 PM - 7:00 PM".into()),
                        },
                    ],
                    pricing: PricingPolicy {
                        early_bird_limit: 30,
                        per_song: SongPricing::Flat {
                            single: Tier {
                                early_bird: 899,
                                regular: 999,
                            },
                            double: Tier {
                                early_bird: 1649,
                                regular: 1799,
                            },
                        },
                        combo: Tier {
                            early_bird: 2449,
                            regular: 2549,
                        },
                        combo_early_bird: true,
                    },
                },
            ],
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.workshops.is_empty(), "no workshops configured");

        for (index, workshop) in self.workshops.iter().enumerate() {
            anyhow::ensure!(
                !self.workshops[..index]
                    .iter()
                    .any(|other| other.id == workshop.id),
                "duplicate workshop id {}",
                workshop.id,
            );
            anyhow::ensure!(
                workshop.songs.len() == 3,
                "workshop {} must offer exactly 3 songs, found {}",
                workshop.id,
                workshop.songs.len(),
            );

            workshop
                .pricing
                .validate(&workshop.song_ids())
                .with_context(|| format!("bad price table for workshop {}", workshop.id))?;

            if let SongPricing::PerSong { premium_song, .. } = &workshop.pricing.per_song {
                anyhow::ensure!(
                    workshop.has_song(premium_song),
                    "premium song {} is not in workshop {}'s program",
                    premium_song,
                    workshop.id,
                );
            }
        }

        anyhow::ensure!(
            self.get(&self.default_workshop).is_some(),
            "default workshop {} is not configured",
            self.default_workshop,
        );

        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Workshop> {
        self.workshops.iter().find(|workshop| workshop.id == id)
    }

    /// Resolves a client-supplied workshop id, falling back to the default
    /// run when none was sent. Pricing is undefined for unknown runs, so
    /// those are rejected rather than guessed at.
    pub fn resolve(&self, id: Option<&str>) -> ApiResult<&Workshop> {
        match id {
            None => self
                .get(&self.default_workshop)
                .ok_or_else(|| ApiError::BadRequest("No default workshop configured".into())),
            Some(id) => self
                .get(id)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown workshop: {}", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_directory_is_valid() {
        WorkshopDirectory::builtin().validate().unwrap();
    }

    #[test]
    fn resolve_falls_back_to_the_default_run() {
        let directory = WorkshopDirectory::builtin();

        let resolved = directory.resolve(None).unwrap();
        assert_eq!(resolved.id, directory.default_workshop);

        let named = directory.resolve(Some("monsoon-groove-2024")).unwrap();
        assert_eq!(named.id, "monsoon-groove-2024");

        assert!(directory.resolve(Some("salsa-nights-2023")).is_err());
    }

    #[test]
    fn validate_rejects_a_premium_song_outside_the_program() {
        let mut directory = WorkshopDirectory::builtin();
        if let SongPricing::PerSong { premium_song, .. } =
            &mut directory.workshops[0].pricing.per_song
        {
            *premium_song = "not-on-the-program".into();
        }

        assert!(directory.validate().is_err());
    }

    #[test]
    fn selection_check_enforces_catalog_and_distinctness() {
        let directory = WorkshopDirectory::builtin();
        let workshop = directory.resolve(None).unwrap();

        let good = vec!["sajda".to_string(), "apsara-aali".to_string()];
        workshop.check_selection(&good).unwrap();

        let foreign = vec!["kesariya".to_string()];
        assert!(matches!(
            workshop.check_selection(&foreign).unwrap_err(),
            ApiError::BadRequest(message) if message == "Unknown song for this workshop: kesariya"
        ));

        let repeated = vec!["sajda".to_string(), "sajda".to_string()];
        assert!(matches!(
            workshop.check_selection(&repeated).unwrap_err(),
            ApiError::BadRequest(message) if message == "Song selected more than once: sajda"
        ));
    }

    #[test]
    fn directory_round_trips_through_json() {
        let directory = WorkshopDirectory::builtin();
        let raw = serde_json::to_string(&directory).unwrap();
        let parsed: WorkshopDirectory = serde_json::from_str(&raw).unwrap();

        parsed.validate().unwrap();
        assert_eq!(parsed.default_workshop, directory.default_workshop);
        assert_eq!(parsed.workshops.len(), directory.workshops.len());
    }
}
