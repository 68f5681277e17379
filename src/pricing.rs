//! Price computation for song packages.
//!
//! The price tables have changed shape with every workshop run (flat
//! per-package prices, then additive per-song prices with a premium headline
//! song), so the policy is configuration loaded per workshop rather than
//! arithmetic written into the registration path. Both the submission handler
//! and the preview endpoint go through [`quote`], which keeps the price the
//! form shows and the price that gets persisted identical by construction.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// An early-bird/regular price pair, in rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub early_bird: i64,
    pub regular: i64,
}

impl Tier {
    /// A price that ignores the early-bird window.
    pub const fn flat(price: i64) -> Self {
        Tier {
            early_bird: price,
            regular: price,
        }
    }

    pub fn at(&self, early_bird: bool) -> i64 {
        if early_bird {
            self.early_bird
        } else {
            self.regular
        }
    }
}

/// How 1- and 2-song packages are priced. Both shapes have been used by real
/// runs, so both stay supported as explicit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "camelCase")]
pub enum SongPricing {
    /// One negotiated price per package size (the 2024 run).
    #[serde(rename_all = "camelCase")]
    Flat { single: Tier, double: Tier },
    /// Per-song additive prices, where one headline song costs more than the
    /// rest of the catalog (the 2025 run).
    #[serde(rename_all = "camelCase")]
    PerSong {
        base: Tier,
        premium: Tier,
        premium_song: String,
    },
}

/// The full price table for one workshop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPolicy {
    /// Registrations created while the workshop has fewer than this many
    /// existing registrations get early-bird prices.
    #[serde(default = "default_early_bird_limit")]
    pub early_bird_limit: i64,
    pub per_song: SongPricing,
    /// The 3-song combo bundle.
    pub combo: Tier,
    /// Whether the combo follows the early-bird window (the 2024 run) or is
    /// one fixed bundle price (the 2025 run).
    #[serde(default)]
    pub combo_early_bird: bool,
}

fn default_early_bird_limit() -> i64 {
    30
}

impl PricingPolicy {
    pub fn is_early_bird(&self, prior_registrations: i64) -> bool {
        prior_registrations < self.early_bird_limit
    }

    fn combo_price(&self, early_bird: bool) -> i64 {
        if self.combo_early_bird {
            self.combo.at(early_bird)
        } else {
            self.combo.regular
        }
    }

    fn single_song_price(&self, song: &str, early_bird: bool) -> i64 {
        match &self.per_song {
            SongPricing::Flat { single, .. } => single.at(early_bird),
            SongPricing::PerSong {
                base,
                premium,
                premium_song,
            } => {
                if song == premium_song {
                    premium.at(early_bird)
                } else {
                    base.at(early_bird)
                }
            }
        }
    }

    /// The advertised combo savings must be real: at either tier, the bundle
    /// has to cost strictly less than booking every catalog song individually.
    /// Checked when a workshop directory is loaded, so a mispriced config
    /// refuses to boot instead of quietly quoting nonsense.
    pub fn validate(&self, catalog: &[String]) -> anyhow::Result<()> {
        for early_bird in [true, false] {
            let individual_total: i64 = catalog
                .iter()
                .map(|song| self.single_song_price(song, early_bird))
                .sum();
            let combo = self.combo_price(early_bird);

            anyhow::ensure!(
                combo < individual_total,
                "combo price {} is not below the {} per-song total {}",
                combo,
                if early_bird { "early-bird" } else { "regular" },
                individual_total,
            );
        }

        Ok(())
    }
}

/// Computes the price for a package. Pure apart from `prior_registrations`,
/// which the caller reads from the store for the same workshop.
pub fn quote(
    policy: &PricingPolicy,
    songs: i64,
    selected_songs: &[String],
    prior_registrations: i64,
) -> Result<i64, ApiError> {
    let early_bird = policy.is_early_bird(prior_registrations);

    match songs {
        1 | 2 => {
            if selected_songs.len() != songs as usize {
                return Err(ApiError::SongSelectionMismatch {
                    expected: songs,
                    got: selected_songs.len(),
                });
            }

            Ok(match &policy.per_song {
                SongPricing::Flat { single, double } => {
                    if songs == 1 {
                        single.at(early_bird)
                    } else {
                        double.at(early_bird)
                    }
                }
                SongPricing::PerSong { .. } => selected_songs
                    .iter()
                    .map(|song| policy.single_song_price(song, early_bird))
                    .sum(),
            })
        }
        // "3 songs" means the whole program, at the organizer's bundle price.
        3 => Ok(policy.combo_price(early_bird)),
        other => Err(ApiError::InvalidPackageSize(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::workshop::WorkshopDirectory;

    fn songs(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    /// The 2025 run: base 1000/1200, premium 1200/1400 for apsara-aali,
    /// fixed 3000 combo.
    fn per_song_policy() -> PricingPolicy {
        PricingPolicy {
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
        }
    }

    /// The 2024 run: flat package prices, combo discounted for early birds.
    fn flat_policy() -> PricingPolicy {
        PricingPolicy {
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
        }
    }

    #[test]
    fn quoting_is_deterministic() {
        let policy = per_song_policy();
        let selection = songs(&["sajda", "apsara-aali"]);

        let first = quote(&policy, 2, &selection, 12).unwrap();
        let second = quote(&policy, 2, &selection, 12).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn early_bird_is_strictly_cheaper_for_base_songs() {
        let selection = songs(&["sajda"]);

        for policy in [per_song_policy(), flat_policy()] {
            let early = quote(&policy, 1, &selection, 29).unwrap();
            let regular = quote(&policy, 1, &selection, 30).unwrap();
            assert!(early < regular);
        }
    }

    #[test]
    fn early_bird_window_closes_at_the_limit() {
        let policy = per_song_policy();
        let selection = songs(&["sajda"]);

        assert_eq!(quote(&policy, 1, &selection, 0).unwrap(), 1000);
        assert_eq!(quote(&policy, 1, &selection, 29).unwrap(), 1000);
        assert_eq!(quote(&policy, 1, &selection, 30).unwrap(), 1200);
        assert_eq!(quote(&policy, 1, &selection, 250).unwrap(), 1200);
    }

    #[test]
    fn premium_song_costs_the_premium_tier() {
        let policy = per_song_policy();

        assert_eq!(quote(&policy, 1, &songs(&["apsara-aali"]), 0).unwrap(), 1200);
        assert_eq!(quote(&policy, 1, &songs(&["apsara-aali"]), 40).unwrap(), 1400);
    }

    #[test]
    fn two_song_price_is_additive_per_selection() {
        let policy = per_song_policy();

        // Two regular songs.
        assert_eq!(
            quote(&policy, 2, &songs(&["sajda", "piya-ghar-aayenge"]), 0).unwrap(),
            2000
        );
        // Premium plus a regular song, at both tiers.
        assert_eq!(
            quote(&policy, 2, &songs(&["apsara-aali", "sajda"]), 0).unwrap(),
            2200
        );
        assert_eq!(
            quote(&policy, 2, &songs(&["apsara-aali", "sajda"]), 30).unwrap(),
            2600
        );
    }

    #[test]
    fn flat_two_song_price_ignores_the_selection() {
        let policy = flat_policy();

        let plain = quote(&policy, 2, &songs(&["a", "b"]), 0).unwrap();
        let other = quote(&policy, 2, &songs(&["b", "c"]), 0).unwrap();
        assert_eq!(plain, 1649);
        assert_eq!(plain, other);
    }

    #[test]
    fn fixed_combo_does_not_follow_the_early_bird_window() {
        let policy = per_song_policy();

        assert_eq!(quote(&policy, 3, &[], 0).unwrap(), 3000);
        assert_eq!(quote(&policy, 3, &[], 500).unwrap(), 3000);
    }

    #[test]
    fn early_bird_combo_follows_the_window_when_configured() {
        let policy = flat_policy();

        assert_eq!(quote(&policy, 3, &[], 29).unwrap(), 2449);
        assert_eq!(quote(&policy, 3, &[], 30).unwrap(), 2549);
    }

    #[test]
    fn invalid_package_sizes_are_rejected() {
        let policy = per_song_policy();

        for bad in [0, 4, -1] {
            let err = quote(&policy, bad, &[], 0).unwrap_err();
            assert!(matches!(err, ApiError::InvalidPackageSize(n) if n == bad));
        }
    }

    #[test]
    fn selection_cardinality_must_match_the_package() {
        let policy = per_song_policy();

        for (count, selection) in [
            (1, songs(&[])),
            (1, songs(&["sajda", "apsara-aali"])),
            (2, songs(&["sajda"])),
            (2, songs(&["sajda", "apsara-aali", "piya-ghar-aayenge"])),
        ] {
            let err = quote(&policy, count, &selection, 0).unwrap_err();
            assert!(matches!(
                err,
                ApiError::SongSelectionMismatch { expected, got }
                    if expected == count && got == selection.len()
            ));
        }
    }

    #[test]
    fn combo_savings_hold_for_every_configured_policy() {
        for workshop in &WorkshopDirectory::builtin().workshops {
            workshop.pricing.validate(&workshop.song_ids()).unwrap();
        }
    }

    #[test]
    fn validate_rejects_a_combo_that_saves_nothing() {
        let mut policy = per_song_policy();
        // 1000 + 1200 + 1000 at the early tier.
        policy.combo = Tier::flat(3200);

        let catalog = songs(&["sajda", "apsara-aali", "piya-ghar-aayenge"]);
        assert!(policy.validate(&catalog).is_err());
    }
}
