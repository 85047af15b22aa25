use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// One entry of a ranked sound list. Rank 1 is the best match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedSound {
    pub filename: String,
    pub rank: i32,
}

/// How many ranked entries the algorithm payload carries per list.
pub const TOP_RANK_LIMIT: i32 = 3;

/// Filter to rank <= `limit`, sort ascending by rank, project to filenames.
/// Returns fewer than `limit` entries when fewer exist - never pads.
pub fn top_filenames(sounds: &[RankedSound], limit: i32) -> Vec<String> {
    let mut picked: Vec<&RankedSound> = sounds.iter().filter(|s| s.rank <= limit).collect();
    picked.sort_by_key(|s| s.rank);
    picked.into_iter().map(|s| s.filename.clone()).collect()
}

/// Ranks within one list must be unique and start at 1.
pub fn validate_ranks(sounds: &[RankedSound]) -> Result<(), ApiError> {
    if sounds.is_empty() {
        return Err(ApiError::Validation(
            "recommended sound list must not be empty".to_string(),
        ));
    }
    let mut ranks: Vec<i32> = sounds.iter().map(|s| s.rank).collect();
    ranks.sort_unstable();
    if ranks[0] != 1 {
        return Err(ApiError::Validation(
            "sound ranks must start at 1".to_string(),
        ));
    }
    if ranks.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(ApiError::Validation(
            "sound ranks must be unique".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sound(filename: &str, rank: i32) -> RankedSound {
        RankedSound {
            filename: filename.to_string(),
            rank,
        }
    }

    #[test]
    fn top_filenames_filters_sorts_and_never_pads() {
        let sounds = vec![
            sound("c.mp3", 3),
            sound("a.mp3", 1),
            sound("e.mp3", 5),
            sound("b.mp3", 2),
        ];
        assert_eq!(
            top_filenames(&sounds, TOP_RANK_LIMIT),
            vec!["a.mp3", "b.mp3", "c.mp3"]
        );

        let short = vec![sound("a.mp3", 1), sound("b.mp3", 2)];
        assert_eq!(top_filenames(&short, TOP_RANK_LIMIT), vec!["a.mp3", "b.mp3"]);

        assert!(top_filenames(&[], TOP_RANK_LIMIT).is_empty());
    }

    #[test]
    fn top_filenames_is_idempotent_under_input_order() {
        let forward = vec![sound("a.mp3", 1), sound("b.mp3", 2), sound("c.mp3", 3)];
        let backward = vec![sound("c.mp3", 3), sound("b.mp3", 2), sound("a.mp3", 1)];
        assert_eq!(
            top_filenames(&forward, TOP_RANK_LIMIT),
            top_filenames(&backward, TOP_RANK_LIMIT)
        );
    }

    #[test]
    fn validate_ranks_rejects_duplicates_and_bad_start() {
        assert!(validate_ranks(&[sound("a.mp3", 1), sound("b.mp3", 2)]).is_ok());
        assert!(validate_ranks(&[sound("x.mp3", 1), sound("y.mp3", 1)]).is_err());
        assert!(validate_ranks(&[sound("x.mp3", 2), sound("y.mp3", 3)]).is_err());
        assert!(validate_ranks(&[]).is_err());
    }
}
