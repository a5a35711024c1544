//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: CI jobs gate on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success (risk below `--fail-on`, or no threshold)   |
//! | 1    | General error (unspecified)                         |
//! | 2    | Usage error (bad flags, no amount column)           |
//! | 3    | Input file unreadable or unparseable                |
//! | 4    | Invalid scan config (TOML, unknown column)          |
//! | 5    | Output could not be written                         |
//! | 6    | Risk level at or above `--fail-on`                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, no resolvable amount column.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Scan (3-6)
// =============================================================================

/// Input file missing, unsupported, or not parseable.
pub const EXIT_INPUT: u8 = 3;

/// Scan config failed to parse, or names a column the data lacks.
pub const EXIT_CONFIG: u8 = 4;

/// JSON result, workbook or CSV export could not be written.
pub const EXIT_OUTPUT: u8 = 5;

/// Analysis completed but the risk level reached the `--fail-on` threshold.
/// Like `grep(1)` finding a match: the run succeeded, the answer is "yes".
pub const EXIT_RISK_THRESHOLD: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INPUT,
            EXIT_CONFIG,
            EXIT_OUTPUT,
            EXIT_RISK_THRESHOLD,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
