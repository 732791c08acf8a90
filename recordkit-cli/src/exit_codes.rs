/// Command completed and the checked input was acceptable.
pub const EXIT_SUCCESS: i32 = 0;
/// Validation failed or the value did not match.
pub const EXIT_INVALID: i32 = 1;
/// The command could not run.
pub const EXIT_ERROR: i32 = 2;
