//! Collision-free synthetic tokens.
//!
//! Markers and the output token must never occur in the template itself,
//! otherwise the corrected source could not be split back into chunks. The
//! defaults are tried first; on a collision a suffix drawn from a
//! [`SuffixSource`] is appended until a free token is found.

use super::error::{ExtractionError, ExtractionResult};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

pub const DEFAULT_MARKER_PREFIX: &str = "haml_lint";
pub const DEFAULT_OUTPUT_TOKEN: &str = "HL.out";
pub const DEFAULT_MAX_PREFIX_ATTEMPTS: usize = 100;

/// Supplies suffixes for prefix retries.
pub trait SuffixSource {
    fn next_suffix(&mut self) -> String;
}

/// Random hex suffixes from a generator owned by one session.
pub struct RandomSuffix {
    rng: StdRng,
}

impl RandomSuffix {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSuffix {
    fn default() -> Self {
        Self::new()
    }
}

impl SuffixSource for RandomSuffix {
    fn next_suffix(&mut self) -> String {
        let mut bytes = [0u8; 5];
        self.rng.fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Cycles through a fixed list of suffixes.
#[derive(Debug, Clone)]
pub struct FixedSuffixes {
    suffixes: Vec<String>,
    next: usize,
}

impl FixedSuffixes {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }
}

impl SuffixSource for FixedSuffixes {
    fn next_suffix(&mut self) -> String {
        if self.suffixes.is_empty() {
            return String::new();
        }
        let suffix = self.suffixes[self.next % self.suffixes.len()].clone();
        self.next += 1;
        suffix
    }
}

/// Tokens chosen for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefixes {
    /// Prefix of marker lines (`<marker>_marker_12`).
    pub marker: String,
    /// Assignment put in front of outputting scripts (`HL.out = `).
    pub output: String,
}

/// Pick marker and output tokens that do not occur anywhere in `source`.
pub fn choose_prefixes(
    source: &str,
    max_attempts: usize,
    suffixes: &mut dyn SuffixSource,
) -> ExtractionResult<Prefixes> {
    let marker = collision_free(source, DEFAULT_MARKER_PREFIX, max_attempts, suffixes)?;
    let output_token = collision_free(source, DEFAULT_OUTPUT_TOKEN, max_attempts, suffixes)?;
    Ok(Prefixes {
        marker,
        output: format!("{output_token} = "),
    })
}

fn collision_free(
    source: &str,
    default: &str,
    max_attempts: usize,
    suffixes: &mut dyn SuffixSource,
) -> ExtractionResult<String> {
    if !source.contains(default) {
        return Ok(default.to_string());
    }

    for attempt in 1..=max_attempts {
        let candidate = format!("{default}_{}", suffixes.next_suffix());
        if !source.contains(&candidate) {
            log::debug!("'{default}' occurs in the template, using '{candidate}' (attempt {attempt})");
            return Ok(candidate);
        }
    }

    Err(ExtractionError::PrefixCollisionExhausted { attempts: max_attempts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_collision() {
        let prefixes = choose_prefixes("%p= foo", 100, &mut FixedSuffixes::new(["x"])).unwrap();
        assert_eq!(prefixes.marker, "haml_lint");
        assert_eq!(prefixes.output, "HL.out = ");
    }

    #[test]
    fn test_retries_until_free() {
        let source = "- haml_lint_a = 1\n- HL.out = 2";
        let mut suffixes = FixedSuffixes::new(["a", "b"]);
        let prefixes = choose_prefixes(source, 100, &mut suffixes).unwrap();
        assert_eq!(prefixes.marker, "haml_lint_b");
        assert_eq!(prefixes.output, "HL.out_a = ");
    }

    #[test]
    fn test_exhausted() {
        let source = "- haml_lint_x";
        let err = choose_prefixes(source, 3, &mut FixedSuffixes::new(["x"])).unwrap_err();
        assert_eq!(err, ExtractionError::PrefixCollisionExhausted { attempts: 3 });
    }

    #[test]
    fn test_random_suffix_is_deterministic_when_seeded() {
        let mut a = RandomSuffix::seeded(7);
        let mut b = RandomSuffix::seeded(7);
        let first = a.next_suffix();
        assert_eq!(first.len(), 10);
        assert_eq!(first, b.next_suffix());
        assert_ne!(a.next_suffix(), first);
    }
}
