//! Constrained randomized schedule building
//!
//! The builder fills one day of the grid entry-by-entry: a marathon window
//! and a movie slot may be reserved up front, then a greedy loop places
//! episodes under the rotation, repeat-run, and intermission-cadence rules
//! until the running clock crosses into the next day. Randomness comes from a
//! `ChaCha8Rng` so a seeded builder produces the same grid every time.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::ChannelConfig;
use crate::error::{Error, Result};
use crate::models::{EntryTag, Episode, NewScheduleEntry, Show};
use crate::storage::{CatalogRepository, Database, ScheduleStore};

/// Seconds in a scheduling day
const DAY_SECS: i64 = 86_400;

/// Minimum total episode runtime for a show to qualify as a marathon
const MARATHON_MIN_CONTENT_SECS: i64 = 72_000;

/// Marathon window duration bounds (8h to 12h)
const MARATHON_MIN_SECS: i64 = 28_800;
const MARATHON_MAX_SECS: i64 = 43_200;

/// Fixed runtime of an intermission slot
const INTERMISSION_SECS: i64 = 180;

/// Chance that a fresh show selection becomes a repeat run
const REPEAT_CHANCE: f64 = 0.4;

/// Episodes longer than this never run four times in a row
const LONG_EPISODE_SECS: i64 = 1_800;

/// Programming options consumed by the builder
#[derive(Debug, Clone)]
pub struct BuilderOptions {
    pub marathon_chance: f64,
    pub movie_chance: f64,
    pub intermission_interval_mins: u32,
}

impl From<&ChannelConfig> for BuilderOptions {
    fn from(channel: &ChannelConfig) -> Self {
        Self {
            marathon_chance: channel.marathon_chance,
            movie_chance: channel.movie_chance,
            intermission_interval_mins: channel.intermission_interval_mins,
        }
    }
}

/// Result of a build run
#[derive(Debug)]
pub struct BuildReport {
    pub day: NaiveDate,
    pub entries: usize,
    pub last_end: Option<NaiveDateTime>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy)]
struct MarathonWindow {
    show_id: i64,
    /// Seconds after the build's start clock
    start_offset: i64,
    duration: i64,
}

#[derive(Debug, Clone)]
struct MovieSlot {
    movie: crate::models::Movie,
    start_offset: i64,
}

/// Fills a day of the schedule from the catalog
pub struct ScheduleBuilder {
    catalog: CatalogRepository,
    store: ScheduleStore,
    opts: BuilderOptions,
    rng: ChaCha8Rng,
}

impl ScheduleBuilder {
    /// Builder seeded from OS entropy
    pub fn new(db: &Database, opts: BuilderOptions) -> Self {
        Self {
            catalog: db.catalog(),
            store: db.schedule(),
            opts,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Builder with a fixed seed; identical inputs produce identical grids
    pub fn with_seed(db: &Database, opts: BuilderOptions, seed: u64) -> Self {
        Self {
            catalog: db.catalog(),
            store: db.schedule(),
            opts,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Build the grid for `day`
    ///
    /// Refused with [`Error::AlreadyScheduled`] when existing entries already
    /// extend past the end of `day` (a dry run bypasses the refusal). The
    /// clock resumes from the latest existing entry's end, or the day's
    /// midnight when the schedule is empty or ended earlier. The final placed
    /// entry may overshoot into the following day; the next build resumes
    /// from that overshoot.
    pub fn build(&mut self, day: NaiveDate, dry_run: bool) -> Result<BuildReport> {
        let day_start = day.and_time(NaiveTime::MIN);
        let day_end = day_start + Duration::seconds(DAY_SECS);

        let latest_end = self.store.latest_end_time()?;
        if let Some(end) = latest_end {
            if end >= day_end && !dry_run {
                return Err(Error::AlreadyScheduled { day });
            }
        }
        let clock_start = match latest_end {
            Some(end) if end > day_start => end,
            _ => day_start,
        };

        let window = (day_end - clock_start).num_seconds();
        if window <= 0 {
            return Ok(BuildReport {
                day,
                entries: 0,
                last_end: latest_end,
                dry_run,
            });
        }

        let mut marathon = self.reserve_marathon(window)?;
        let mut pending_movie = self.reserve_movie(window, marathon.as_ref())?;

        let interval_secs = i64::from(self.opts.intermission_interval_mins) * 60;
        let mut since_intermission = match self.store.last_intermission_end_before(clock_start)? {
            Some(end) => (clock_start - end).num_seconds(),
            None => 0,
        };

        // Seconds placed since clock_start
        let mut total: i64 = 0;
        let mut placed: usize = 0;
        let mut previous_show: Option<i64> = None;
        let mut current: Option<Show> = None;
        // Episodes placed in the current run vs. the decided run length
        let mut run_count: u32 = 0;
        let mut run_length: u32 = 0;
        let mut in_marathon = false;
        let mut marathon_timer: i64 = 0;
        // Shows found to have no episodes during this build
        let mut empty_shows: HashSet<i64> = HashSet::new();
        // Rotation positions observed during a dry run
        let mut overlay: HashMap<i64, i64> = HashMap::new();

        loop {
            // Intermission cadence, re-checked before every content placement.
            // Deferred while a marathon window is open so the window stays an
            // unbroken run of the marathon show.
            if !in_marathon && interval_secs > 0 && since_intermission > interval_secs {
                let start = clock_start + Duration::seconds(total);
                self.place(
                    &NewScheduleEntry {
                        tag: EntryTag::Intermission,
                        is_marathon: false,
                        title: String::from("Intermission"),
                        description: None,
                        path: None,
                        thumbnail: None,
                        thumbnail_width: None,
                        thumbnail_height: None,
                        start_time: start,
                        end_time: start + Duration::seconds(INTERMISSION_SECS),
                    },
                    dry_run,
                )?;
                placed += 1;
                total += INTERMISSION_SECS;
                since_intermission = 0;
                if clock_start + Duration::seconds(total) >= day_end {
                    break;
                }
                continue;
            }

            // Show selection
            if current.is_none() || (run_count >= run_length && !in_marathon) {
                run_count = 0;
                run_length = 0;
                let candidates = self.catalog.enabled_show_ids()?;
                let mut exclude = empty_shows.clone();
                if let Some(prev) = previous_show {
                    exclude.insert(prev);
                }
                if let Some(m) = marathon {
                    exclude.insert(m.show_id);
                }
                let pick = pick_show(&candidates, &exclude, &mut self.rng).or_else(|| {
                    // The previous-show exclusion can empty a one-show catalog;
                    // relax it rather than spin. The marathon show stays out.
                    let mut exclude = empty_shows.clone();
                    if let Some(m) = marathon {
                        exclude.insert(m.show_id);
                    }
                    pick_show(&candidates, &exclude, &mut self.rng)
                });
                let Some(show_id) = pick else {
                    return Err(Error::NoEnabledShows);
                };
                current = self.catalog.show(show_id)?;
                if current.is_none() {
                    continue;
                }
            } else if in_marathon {
                if let Some(m) = marathon {
                    if current.as_ref().map(|s| s.id) != Some(m.show_id) {
                        match self.catalog.show(m.show_id)? {
                            Some(show) => current = Some(show),
                            None => {
                                marathon = None;
                                in_marathon = false;
                                current = None;
                                continue;
                            }
                        }
                    }
                }
            }

            let show = match &current {
                Some(show) => show.clone(),
                None => continue,
            };

            // Rotation: the show's next episode in (season, episode) order
            let Some(episode) = self.next_episode(show.id, dry_run, &overlay)? else {
                empty_shows.insert(show.id);
                run_count = 0;
                run_length = 0;
                current = None;
                if in_marathon {
                    // The forced show ran dry; give up on the window
                    marathon = None;
                    in_marathon = false;
                }
                continue;
            };

            // Leave the marathon window once the next episode would overrun it
            if let Some(m) = marathon {
                if in_marathon && marathon_timer + episode.duration > m.duration {
                    in_marathon = false;
                    continue;
                }
            }

            // A pending movie is placed as soon as the clock would cross its slot
            if pending_movie
                .as_ref()
                .is_some_and(|slot| total + episode.duration > slot.start_offset)
            {
                if let Some(slot) = pending_movie.take() {
                    let movie = slot.movie;
                    let start = clock_start + Duration::seconds(total);
                    self.place(
                        &NewScheduleEntry {
                            tag: EntryTag::Movie,
                            is_marathon: false,
                            title: movie.title.clone(),
                            description: movie.description.clone(),
                            path: Some(movie.path.clone()),
                            thumbnail: movie.thumbnail.clone(),
                            thumbnail_width: movie.thumbnail_width,
                            thumbnail_height: movie.thumbnail_height,
                            start_time: start,
                            end_time: start + Duration::seconds(movie.duration),
                        },
                        dry_run,
                    )?;
                    placed += 1;
                    total += movie.duration;
                    since_intermission += movie.duration;
                }
                if clock_start + Duration::seconds(total) >= day_end {
                    break;
                }
                // Show rotation does not advance across a movie
                continue;
            }

            // Enter the marathon window once the clock reaches its offset
            if let Some(m) = marathon {
                if !in_marathon && marathon_timer == 0 && total + episode.duration > m.start_offset
                {
                    in_marathon = true;
                    run_count = 0;
                    run_length = 0;
                    continue;
                }
            }

            // Fresh selection: decide whether this becomes a repeat run
            if run_count >= run_length {
                run_length = if self.rng.gen::<f64>() < REPEAT_CHANCE {
                    if episode.duration > LONG_EPISODE_SECS {
                        2
                    } else {
                        [2u32, 4].choose(&mut self.rng).copied().unwrap_or(2)
                    }
                } else {
                    0
                };
            }

            let start = clock_start + Duration::seconds(total);
            let end = start + Duration::seconds(episode.duration);
            let (tag, title) = if in_marathon {
                (
                    EntryTag::TvMarathon,
                    format!(
                        "{} Marathon! S{} E{}",
                        show.title, episode.season_number, episode.episode_number
                    ),
                )
            } else {
                (
                    EntryTag::TvEpisode,
                    format!(
                        "{} S{} E{}",
                        show.title, episode.season_number, episode.episode_number
                    ),
                )
            };
            self.place(
                &NewScheduleEntry {
                    tag,
                    is_marathon: in_marathon,
                    title,
                    description: episode.description.clone(),
                    path: Some(episode.path.clone()),
                    thumbnail: show.thumbnail.clone(),
                    thumbnail_width: show.thumbnail_width,
                    thumbnail_height: show.thumbnail_height,
                    start_time: start,
                    end_time: end,
                },
                dry_run,
            )?;
            placed += 1;

            // The rotation pointer is committed per entry so later reads in
            // this build observe progress
            if dry_run {
                overlay.insert(show.id, episode.id);
            } else {
                self.catalog.set_last_played(show.id, episode.id)?;
            }

            previous_show = Some(show.id);
            run_count += 1;
            total += episode.duration;
            since_intermission += episode.duration;
            if in_marathon {
                marathon_timer += episode.duration;
            }

            if clock_start + Duration::seconds(total) >= day_end {
                break;
            }
        }

        let last_end = clock_start + Duration::seconds(total);
        tracing::info!(
            day = %day,
            entries = placed,
            last_end = %last_end,
            dry_run,
            "schedule build finished"
        );
        Ok(BuildReport {
            day,
            entries: placed,
            last_end: Some(last_end),
            dry_run,
        })
    }

    /// Maybe reserve a marathon window inside the build window
    fn reserve_marathon(&mut self, window: i64) -> Result<Option<MarathonWindow>> {
        if window < MARATHON_MIN_SECS {
            return Ok(None);
        }
        if self.rng.gen::<f64>() > self.opts.marathon_chance {
            return Ok(None);
        }

        let candidates = self.catalog.marathon_candidates(MARATHON_MIN_CONTENT_SECS)?;
        let Some(&show_id) = candidates.choose(&mut self.rng) else {
            return Ok(None);
        };

        let duration = self
            .rng
            .gen_range(MARATHON_MIN_SECS..=window.min(MARATHON_MAX_SECS));
        // The marathon begins within the first 12h of the build window
        let start_offset = self
            .rng
            .gen_range(0..=(window - duration).min(MARATHON_MAX_SECS));
        tracing::info!(
            show_id,
            start_offset,
            duration,
            "reserved a marathon window"
        );
        Ok(Some(MarathonWindow {
            show_id,
            start_offset,
            duration,
        }))
    }

    /// Maybe reserve a movie slot that avoids the marathon window
    fn reserve_movie(
        &mut self,
        window: i64,
        marathon: Option<&MarathonWindow>,
    ) -> Result<Option<MovieSlot>> {
        if self.rng.gen::<f64>() > self.opts.movie_chance {
            return Ok(None);
        }

        let movies = self.catalog.enabled_movies()?;
        let Some(movie) = movies.choose(&mut self.rng).cloned() else {
            return Ok(None);
        };

        let regions: Vec<(i64, i64)> = match marathon {
            None => vec![(0, window)],
            Some(m) => vec![(0, m.start_offset), (m.start_offset + m.duration, window)],
        };
        let fitting: Vec<(i64, i64)> = regions
            .into_iter()
            .filter(|(lo, hi)| hi - lo >= movie.duration)
            .collect();
        let Some(&(lo, hi)) = fitting.choose(&mut self.rng) else {
            tracing::debug!(title = %movie.title, "no slot fits the movie today; skipping");
            return Ok(None);
        };

        let start_offset = self.rng.gen_range(lo..=hi - movie.duration);
        tracing::info!(title = %movie.title, start_offset, "reserved a movie slot");
        Ok(Some(MovieSlot {
            movie,
            start_offset,
        }))
    }

    fn next_episode(
        &self,
        show_id: i64,
        dry_run: bool,
        overlay: &HashMap<i64, i64>,
    ) -> Result<Option<Episode>> {
        if dry_run {
            if let Some(&episode_id) = overlay.get(&show_id) {
                return self.catalog.next_episode_after(show_id, Some(episode_id));
            }
        }
        self.catalog.next_episode(show_id)
    }

    fn place(&self, entry: &NewScheduleEntry, dry_run: bool) -> Result<()> {
        if dry_run {
            tracing::debug!(
                title = %entry.title,
                start = %entry.start_time,
                "dry run: would place entry"
            );
            return Ok(());
        }
        self.store.insert(entry)?;
        tracing::debug!(title = %entry.title, start = %entry.start_time, "placed entry");
        Ok(())
    }
}

/// Pick a random show id from `candidates`, skipping everything in `exclude`
///
/// Pure over its inputs, so builder selection is reproducible under a seeded
/// generator.
pub fn pick_show<R: Rng>(candidates: &[i64], exclude: &HashSet<i64>, rng: &mut R) -> Option<i64> {
    let eligible: Vec<i64> = candidates
        .iter()
        .copied()
        .filter(|id| !exclude.contains(id))
        .collect();
    eligible.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_show_respects_exclusions() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let candidates = vec![1, 2, 3];
        let exclude: HashSet<i64> = [1, 3].into_iter().collect();
        for _ in 0..20 {
            assert_eq!(pick_show(&candidates, &exclude, &mut rng), Some(2));
        }
    }

    #[test]
    fn test_pick_show_empty_when_all_excluded() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let candidates = vec![1, 2];
        let exclude: HashSet<i64> = [1, 2].into_iter().collect();
        assert_eq!(pick_show(&candidates, &exclude, &mut rng), None);
    }

    #[test]
    fn test_pick_show_deterministic_given_seed() {
        let candidates: Vec<i64> = (1..=50).collect();
        let exclude = HashSet::new();
        let picks_a: Vec<_> = {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            (0..10)
                .map(|_| pick_show(&candidates, &exclude, &mut rng))
                .collect()
        };
        let picks_b: Vec<_> = {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            (0..10)
                .map(|_| pick_show(&candidates, &exclude, &mut rng))
                .collect()
        };
        assert_eq!(picks_a, picks_b);
    }
}
