// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Resource Name Generator
//!
//! Derives a platform-safe resource name from a free-form display name and
//! makes it unique against a caller-supplied [`NameOracle`].
//!
//! The generator is stateless. Uniqueness is only as strong as the oracle:
//! two concurrent callers may both be handed the same free name, and the
//! store's uniqueness constraint settles the race at insert time.

use async_trait::async_trait;
use rand::Rng;

use crate::domain::repository::RepositoryError;

pub const MAX_RESOURCE_NAME_LENGTH: usize = 25;
pub const RANDOM_SUFFIX_LENGTH: usize = 2;
/// Base length left once `-` and the suffix are appended.
pub const VALID_CANDIDATE_LENGTH: usize = MAX_RESOURCE_NAME_LENGTH - RANDOM_SUFFIX_LENGTH - 1;
pub const MAX_NAME_GENERATION_ATTEMPTS: usize = 10;
pub const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Answers "is this name already taken in my scope?".
#[async_trait]
pub trait NameOracle: Send + Sync {
    async fn is_taken(&self, candidate: &str) -> Result<bool, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NameGenerationError {
    #[error("display name '{0}' contains no usable characters")]
    EmptyCandidate(String),

    #[error("no free name derived from '{base}' after {attempts} attempts")]
    Exhausted { base: String, attempts: usize },

    #[error("name availability check failed: {0}")]
    Oracle(#[from] RepositoryError),
}

/// Deterministic candidate for `display_name`.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, trims `-` from both ends and truncates to
/// [`MAX_RESOURCE_NAME_LENGTH`].
pub fn candidate_name(display_name: &str) -> Result<String, NameGenerationError> {
    let mut name = String::with_capacity(display_name.len());
    let mut pending_separator = false;
    for c in display_name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !name.is_empty() {
                name.push('-');
            }
            pending_separator = false;
            name.push(c);
        } else {
            pending_separator = true;
        }
    }

    let name = truncate_name(&name, MAX_RESOURCE_NAME_LENGTH);
    if name.is_empty() {
        return Err(NameGenerationError::EmptyCandidate(display_name.to_string()));
    }
    Ok(name)
}

/// Generates a name for `display_name` that `oracle` reports free.
pub async fn generate(
    display_name: &str,
    oracle: &dyn NameOracle,
) -> Result<String, NameGenerationError> {
    generate_with_suffixes(display_name, oracle, random_suffix).await
}

/// [`generate`] with an injectable suffix source.
pub async fn generate_with_suffixes<F>(
    display_name: &str,
    oracle: &dyn NameOracle,
    mut next_suffix: F,
) -> Result<String, NameGenerationError>
where
    F: FnMut() -> String + Send,
{
    let candidate = candidate_name(display_name)?;
    if !oracle.is_taken(&candidate).await? {
        return Ok(candidate);
    }

    let base = truncate_name(&candidate, VALID_CANDIDATE_LENGTH);
    for attempt in 1..=MAX_NAME_GENERATION_ATTEMPTS {
        let suffixed = format!("{}-{}", base, next_suffix());
        if !oracle.is_taken(&suffixed).await? {
            return Ok(suffixed);
        }
        tracing::debug!(candidate = %suffixed, attempt, "Generated name already taken");
    }

    Err(NameGenerationError::Exhausted {
        base: candidate,
        attempts: MAX_NAME_GENERATION_ATTEMPTS,
    })
}

fn truncate_name(name: &str, max_len: usize) -> String {
    // candidate names are ASCII so byte and char lengths agree
    let truncated = if name.len() > max_len { &name[..max_len] } else { name };
    truncated.trim_matches('-').to_string()
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..RANDOM_SUFFIX_LENGTH)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}
